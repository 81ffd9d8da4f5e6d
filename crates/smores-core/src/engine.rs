//! The per-project engine handle.
//!
//! One [`Engine`] exists per open project. It owns the repository
//! configuration, the commit buffer, the sync state and every timer, and is
//! handed to collaborators as a cheap clone instead of being reached through
//! globals.
//!
//! All gateway sequences that touch the working tree (a flush, a sync cycle,
//! tag creation, repository setup) hold the worktree lock for their
//! duration, so they never interleave.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use smores_git::GitOps;
use tokio::task::JoinHandle;

use crate::batcher::PendingCommit;
use crate::config::Settings;
use crate::sync::SyncSlot;
use crate::tagger::TagQueue;
use crate::traits::{Frontend, Workspace};

/// Where the engine's repository lives and how it reaches its remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryConfig {
    /// Directory git commands run in: the repository top level once open.
    pub base_directory: PathBuf,

    /// Part of the tree the engine manages, relative to `base_directory`.
    pub tracked_pathspec: String,

    /// Remote name synchronized with.
    pub remote_name: String,

    /// Remote URL or path, when one is configured.
    pub remote_target: Option<String>,

    /// A verified repository backs this project.
    pub is_open: bool,
}

/// A cancellable one-shot timer task.
///
/// Every arm or cancel bumps the generation. A firing task claims the
/// timer with the generation it was armed under; a stale task finds a
/// newer generation and does nothing.
#[derive(Debug, Default)]
pub(crate) struct Timer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl Timer {
    /// Arm the timer, cancelling any pending run.
    pub(crate) fn arm(&mut self, spawn: impl FnOnce(u64) -> JoinHandle<()>) {
        self.cancel();
        self.handle = Some(spawn(self.generation));
    }

    /// Cancel a pending run.
    pub(crate) fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Called from the timer task itself; true when it is still current.
    ///
    /// The handle is dropped without aborting, since the caller is the task.
    pub(crate) fn claim(&mut self, generation: u64) -> bool {
        if self.generation != generation {
            return false;
        }
        self.generation = self.generation.wrapping_add(1);
        self.handle = None;
        true
    }

    /// A run is pending.
    pub(crate) const fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct Inner<G, W, F> {
    pub(crate) git: G,
    pub(crate) workspace: W,
    pub(crate) frontend: F,
    pub(crate) settings: Settings,
    pub(crate) repo: Mutex<RepositoryConfig>,
    pub(crate) batch: Mutex<PendingCommit>,
    pub(crate) sync: Mutex<SyncSlot>,
    pub(crate) tags: Mutex<TagQueue>,
    pub(crate) worktree: tokio::sync::Mutex<()>,
    pub(crate) closed: AtomicBool,
}

/// Version-control engine for one project.
pub struct Engine<G, W, F> {
    pub(crate) inner: Arc<Inner<G, W, F>>,
}

impl<G, W, F> Clone for Engine<G, W, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G, W, F> Engine<G, W, F>
where
    G: GitOps + 'static,
    W: Workspace + 'static,
    F: Frontend + 'static,
{
    /// Create an engine for the project `workspace` describes.
    ///
    /// The repository starts closed; call [`Engine::initialise`] or
    /// [`Engine::start_repo_use`] to open it.
    pub fn new(git: G, workspace: W, frontend: F, settings: Settings) -> Self {
        let base_directory = workspace.project_dir().to_path_buf();
        git.set_workdir(&base_directory);

        let repo = RepositoryConfig {
            base_directory,
            tracked_pathspec: ".".into(),
            remote_name: settings.repository.remote_name.clone(),
            remote_target: None,
            is_open: false,
        };

        Self {
            inner: Arc::new(Inner {
                git,
                workspace,
                frontend,
                settings,
                repo: Mutex::new(repo),
                batch: Mutex::new(PendingCommit::default()),
                sync: Mutex::new(SyncSlot::default()),
                tags: Mutex::new(TagQueue::default()),
                worktree: tokio::sync::Mutex::new(()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Snapshot of the repository configuration.
    #[must_use]
    pub fn repository(&self) -> RepositoryConfig {
        lock(&self.inner.repo).clone()
    }

    /// Engine settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// The gateway.
    #[must_use]
    pub fn git(&self) -> &G {
        &self.inner.git
    }

    /// The project collaborator.
    #[must_use]
    pub fn workspace(&self) -> &W {
        &self.inner.workspace
    }

    /// The frontend collaborator.
    #[must_use]
    pub fn frontend(&self) -> &F {
        &self.inner.frontend
    }

    pub(crate) fn is_open(&self) -> bool {
        lock(&self.inner.repo).is_open
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// The `user.name` git would record, if configured.
    pub async fn configured_user_name(&self) -> Option<String> {
        match self.inner.git.config_value("user.name").await {
            Ok(name) => name.filter(|n| !n.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "could not read user.name");
                None
            }
        }
    }

    /// Flush pending commits and tags, then stop every timer.
    ///
    /// No timer re-arms after this returns.
    pub async fn shutdown(&self) {
        tracing::debug!("engine shutting down");
        self.inner.closed.store(true, Ordering::SeqCst);

        self.flush_now().await;
        self.flush_tags().await;

        lock(&self.inner.batch).timer.cancel();
        lock(&self.inner.tags).timer.cancel();
        lock(&self.inner.sync).timer.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{MockFrontend, MockGit, MockWorkspace};

    #[tokio::test]
    async fn test_new_engine_is_closed_at_project_dir() {
        let git = MockGit::new();
        let engine = Engine::new(
            git,
            MockWorkspace::new("/work/Widget", "Widget"),
            MockFrontend::new(),
            Settings::default(),
        );

        let repo = engine.repository();
        assert!(!repo.is_open);
        assert_eq!(repo.tracked_pathspec, ".");
        assert_eq!(repo.remote_name, "origin");
        assert_eq!(engine.git().workdir(), PathBuf::from("/work/Widget"));
    }

    #[tokio::test]
    async fn test_configured_user_name() {
        let git = MockGit::new();
        git.set_config("user.name", "Ada Lovelace");
        let engine = Engine::new(
            git,
            MockWorkspace::new("/work/Widget", "Widget"),
            MockFrontend::new(),
            Settings::default(),
        );

        assert_eq!(
            engine.configured_user_name().await.as_deref(),
            Some("Ada Lovelace")
        );
    }

    #[tokio::test]
    async fn test_user_name_unset() {
        let engine = Engine::new(
            MockGit::new(),
            MockWorkspace::new("/work/Widget", "Widget"),
            MockFrontend::new(),
            Settings::default(),
        );
        assert_eq!(engine.configured_user_name().await, None);
    }

    #[tokio::test]
    async fn test_timer_claim_rejects_stale_generation() {
        let mut timer = Timer::default();
        timer.arm(|_| tokio::spawn(async {}));
        let stale = timer.generation;
        timer.arm(|_| tokio::spawn(async {}));

        assert!(!timer.claim(stale));
        assert!(timer.is_armed());
        let current = timer.generation;
        assert!(timer.claim(current));
        assert!(!timer.is_armed());
    }
}
