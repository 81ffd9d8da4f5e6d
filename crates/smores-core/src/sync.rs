//! Periodic synchronization with the remote.
//!
//! One cycle runs pull, fetch-tags, push and push-tags in order, stopping at
//! the first failure. Whatever happens, the next cycle is scheduled when
//! the current one settles, so attempts never overlap and the interval is
//! measured from the end of the previous attempt.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use smores_git::GitOps;

use crate::conflict::{ConflictOutcome, classify, resolve_conflicts};
use crate::engine::{Engine, Timer, lock};
use crate::error::Result;
use crate::traits::{Frontend, Workspace};

/// Remote status, readable by the status display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncState {
    /// A remote target is configured and the remote exists.
    pub remote_configured: bool,

    /// The last attempt succeeded.
    pub remote_healthy: bool,

    /// A cycle is exchanging with the remote right now.
    pub sync_in_progress: bool,

    /// When the last network exchange started.
    pub last_attempt: Option<DateTime<Utc>>,

    /// Paths left in conflict by the last pull.
    pub conflicted_paths: Vec<String>,

    /// Failed attempts since the last success.
    pub consecutive_failures: u32,
}

#[derive(Debug, Default)]
pub(crate) struct SyncSlot {
    pub(crate) state: SyncState,
    pub(crate) timer: Timer,
}

/// Step of a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStep {
    /// Resolving the current branch.
    ResolveBranch,
    /// Listing remotes.
    ListRemotes,
    /// Pulling without rebase.
    Pull,
    /// Fetching tags.
    FetchTags,
    /// Pushing the branch.
    Push,
    /// Pushing tags.
    PushTags,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ResolveBranch => "resolve branch",
            Self::ListRemotes => "list remotes",
            Self::Pull => "pull",
            Self::FetchTags => "fetch tags",
            Self::Push => "push",
            Self::PushTags => "push tags",
        };
        f.write_str(name)
    }
}

/// How a failure affects the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Retried at the next tick without interrupting the user.
    Transient,
    /// Needs manual resolution before the engine touches those paths.
    MergeConflict,
}

/// Result of one sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// No repository is open.
    NotOpen,

    /// No remote is configured or the configured one is missing.
    RemoteUnused,

    /// Every step succeeded.
    Synced,

    /// A step failed and the rest were skipped.
    Failed {
        /// Step that failed.
        step: SyncStep,
        /// Classification.
        kind: FailureKind,
        /// What the classifier made of the output.
        conflicts: ConflictOutcome,
        /// Failure summary.
        error: String,
    },
}

impl SyncOutcome {
    /// The cycle reached the remote and every step succeeded.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced)
    }
}

impl<G, W, F> Engine<G, W, F>
where
    G: GitOps + 'static,
    W: Workspace + 'static,
    F: Frontend + 'static,
{
    /// Snapshot of the remote status.
    #[must_use]
    pub fn sync_state(&self) -> SyncState {
        lock(&self.inner.sync).state.clone()
    }

    /// Run one sync cycle now, replacing any scheduled one.
    ///
    /// The next cycle is scheduled afterwards, whatever the outcome.
    pub async fn sync_with_remote(&self) -> SyncOutcome {
        lock(&self.inner.sync).timer.cancel();
        if !self.is_open() {
            return SyncOutcome::NotOpen;
        }

        let outcome = {
            let _worktree = self.inner.worktree.lock().await;
            // A cycle that held the lock before us may have scheduled one.
            lock(&self.inner.sync).timer.cancel();
            self.run_sync_cycle().await
        };

        self.schedule_next_sync();
        outcome
    }

    /// True while a cycle is scheduled.
    #[must_use]
    pub fn sync_scheduled(&self) -> bool {
        lock(&self.inner.sync).timer.is_armed()
    }

    fn schedule_next_sync(&self) {
        if self.is_closed() {
            return;
        }
        let engine = self.clone();
        let mut slot = lock(&self.inner.sync);
        let delay = self
            .inner
            .settings
            .sync
            .next_delay(slot.state.consecutive_failures);
        tracing::debug!(?delay, "next sync scheduled");
        slot.timer.arm(move |generation| {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let current = lock(&engine.inner.sync).timer.claim(generation);
                if current {
                    engine.sync_with_remote().await;
                }
            })
        });
    }

    async fn run_sync_cycle(&self) -> SyncOutcome {
        let (remote_name, target) = {
            let repo = lock(&self.inner.repo);
            (repo.remote_name.clone(), repo.remote_target.clone())
        };
        if target.is_none() {
            self.mark_remote_use(false);
            return SyncOutcome::RemoteUnused;
        }

        let branch = match self.inner.git.current_branch().await {
            Ok(branch) => branch,
            Err(e) => return self.record_failure(SyncStep::ResolveBranch, &e).await,
        };
        let remotes = match self.inner.git.list_remotes().await {
            Ok(remotes) => remotes,
            Err(e) => return self.record_failure(SyncStep::ListRemotes, &e).await,
        };
        if !remotes.iter().any(|r| r.name == remote_name) {
            tracing::debug!(remote = %remote_name, "remote not present");
            self.mark_remote_use(false);
            return SyncOutcome::RemoteUnused;
        }

        self.mark_remote_use(true);
        {
            let mut slot = lock(&self.inner.sync);
            slot.state.sync_in_progress = true;
            slot.state.last_attempt = Some(Utc::now());
        }
        self.inner.frontend.sync_start();

        match self.exchange(&remote_name, &branch).await {
            Ok(()) => {
                {
                    let mut slot = lock(&self.inner.sync);
                    slot.state.sync_in_progress = false;
                    slot.state.remote_healthy = true;
                    slot.state.consecutive_failures = 0;
                }
                self.inner.frontend.update_healthy(true);
                tracing::info!(remote = %remote_name, %branch, "synced with remote");
                SyncOutcome::Synced
            }
            Err((step, e)) => self.record_failure(step, &e).await,
        }
    }

    async fn exchange(
        &self,
        remote: &str,
        branch: &str,
    ) -> std::result::Result<(), (SyncStep, smores_git::Error)> {
        let git = &self.inner.git;
        git.pull(remote, branch)
            .await
            .map_err(|e| (SyncStep::Pull, e))?;
        lock(&self.inner.sync).state.conflicted_paths.clear();

        git.fetch_tags(remote, branch)
            .await
            .map_err(|e| (SyncStep::FetchTags, e))?;
        git.push(remote, branch)
            .await
            .map_err(|e| (SyncStep::Push, e))?;
        git.push_tags(remote)
            .await
            .map_err(|e| (SyncStep::PushTags, e))?;
        Ok(())
    }

    async fn record_failure(&self, step: SyncStep, error: &smores_git::Error) -> SyncOutcome {
        let conflicts = resolve_conflicts(&self.inner.git, classify(&error.raw_output())).await;
        // A leftover merge with nothing unmerged only awaits its commit.
        let kind = if !conflicts.conflicted_paths.is_empty() {
            FailureKind::MergeConflict
        } else {
            FailureKind::Transient
        };

        {
            let mut slot = lock(&self.inner.sync);
            slot.state.sync_in_progress = false;
            slot.state.remote_healthy = false;
            slot.state.consecutive_failures = slot.state.consecutive_failures.saturating_add(1);
            if kind == FailureKind::MergeConflict {
                slot.state.conflicted_paths.clone_from(&conflicts.conflicted_paths);
            }
        }
        self.inner.frontend.update_healthy(false);

        match kind {
            FailureKind::MergeConflict => {
                tracing::warn!(?step, paths = ?conflicts.conflicted_paths, "merge conflict");
                self.inner.frontend.show_conflicts(&conflicts.conflicted_paths);
            }
            FailureKind::Transient => {
                tracing::warn!(?step, error = %error, "sync failed, retrying at next tick");
            }
        }

        SyncOutcome::Failed {
            step,
            kind,
            conflicts,
            error: error.to_string(),
        }
    }

    fn mark_remote_use(&self, in_use: bool) {
        lock(&self.inner.sync).state.remote_configured = in_use;
        self.inner.frontend.update_remote_use(in_use);
    }

    /// Record a new remote target (or clear it) and apply it.
    ///
    /// # Errors
    /// Returns error if the metadata can't be saved or the remote can't be
    /// reconfigured.
    pub async fn set_remote(&self, target: Option<&str>) -> Result<SyncOutcome> {
        let mut metadata = self.inner.workspace.load_metadata()?;
        metadata.repo_remote = target.map(str::to_string);
        self.inner.workspace.save_metadata(&metadata)?;
        self.update_remote().await
    }

    /// Bring the git remote in line with the persisted target, then sync.
    ///
    /// The remote is added when missing, replaced when its target differs,
    /// and removed when the target has been cleared.
    ///
    /// # Errors
    /// Returns error if the metadata can't be read or a remote command fails.
    pub async fn update_remote(&self) -> Result<SyncOutcome> {
        let desired = self
            .inner
            .workspace
            .load_metadata()?
            .repo_remote
            .filter(|t| !t.trim().is_empty());

        if !self.is_open() {
            lock(&self.inner.repo).remote_target = desired;
            return Ok(SyncOutcome::NotOpen);
        }

        {
            let _worktree = self.inner.worktree.lock().await;
            let name = lock(&self.inner.repo).remote_name.clone();
            let git = &self.inner.git;

            let remotes = git.list_remotes().await?;
            let existing = remotes.iter().find(|r| r.name == name);
            match (existing, desired.as_deref()) {
                (Some(remote), Some(target)) if remote.target == target => {}
                (Some(_), Some(target)) => {
                    git.remove_remote(&name).await?;
                    git.add_remote(&name, target).await?;
                    tracing::info!(remote = %name, target, "remote replaced");
                }
                (None, Some(target)) => {
                    git.add_remote(&name, target).await?;
                    tracing::info!(remote = %name, target, "remote added");
                }
                (Some(_), None) => {
                    git.remove_remote(&name).await?;
                    tracing::info!(remote = %name, "remote removed");
                }
                (None, None) => {}
            }

            lock(&self.inner.repo).remote_target = desired;
        }

        Ok(self.sync_with_remote().await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{FrontendEvent, MockGit, open_engine, open_engine_with_remote};

    const CONFLICT_OUTPUT: &str = "Auto-merging docs/6.smores\n\
                                   CONFLICT (content): Merge conflict in docs/5.smores\n\
                                   Automatic merge failed; fix conflicts and then commit the result.";

    #[tokio::test(start_paused = true)]
    async fn test_no_target_marks_remote_unused() {
        let engine = open_engine(MockGit::new()).await;

        assert_eq!(engine.sync_with_remote().await, SyncOutcome::RemoteUnused);
        assert!(!engine.sync_state().remote_configured);
        assert!(engine.frontend().events().contains(&FrontendEvent::RemoteUse(false)));
        assert!(engine.sync_scheduled());
        assert_eq!(engine.git().count("pull"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_remote_skips_network() {
        let engine = open_engine_with_remote(MockGit::new(), "/srv/widget.git").await;
        // Target recorded but the git remote was never added.
        assert_eq!(engine.sync_with_remote().await, SyncOutcome::RemoteUnused);
        assert_eq!(engine.git().count("list_remotes"), 1);
        assert_eq!(engine.git().count("pull"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_cycle_runs_steps_in_order() {
        let git = MockGit::new();
        git.set_remote("origin", "/srv/widget.git");
        let engine = open_engine_with_remote(git, "/srv/widget.git").await;

        assert!(engine.sync_with_remote().await.is_synced());

        let network: Vec<String> = engine
            .git()
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("pull") || c.starts_with("fetch") || c.starts_with("push"))
            .collect();
        assert_eq!(
            network,
            vec![
                "pull origin main",
                "fetch_tags origin main",
                "push origin main",
                "push_tags origin"
            ]
        );

        let state = engine.sync_state();
        assert!(state.remote_configured);
        assert!(state.remote_healthy);
        assert!(!state.sync_in_progress);
        assert!(state.last_attempt.is_some());
        assert_eq!(
            engine.frontend().events(),
            vec![
                FrontendEvent::RemoteUse(true),
                FrontendEvent::SyncStart,
                FrontendEvent::Healthy(true)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pull_conflict_is_surfaced() {
        let git = MockGit::new();
        git.set_remote("origin", "/srv/widget.git");
        git.fail("pull", CONFLICT_OUTPUT);
        let engine = open_engine_with_remote(git, "/srv/widget.git").await;

        let outcome = engine.sync_with_remote().await;
        let SyncOutcome::Failed {
            step,
            kind,
            conflicts,
            ..
        } = outcome
        else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(step, SyncStep::Pull);
        assert_eq!(kind, FailureKind::MergeConflict);
        assert_eq!(conflicts.conflicted_paths, vec!["docs/5.smores"]);
        assert!(!conflicts.has_unrecognized_lines());

        assert_eq!(engine.git().count("fetch_tags"), 0);
        assert_eq!(engine.git().count("push"), 0);
        assert_eq!(engine.sync_state().conflicted_paths, vec!["docs/5.smores"]);
        assert!(!engine.sync_state().remote_healthy);
        assert!(
            engine
                .frontend()
                .events()
                .contains(&FrontendEvent::Conflicts(vec!["docs/5.smores".into()]))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_pull_clears_conflicts() {
        let git = MockGit::new();
        git.set_remote("origin", "/srv/widget.git");
        git.fail("pull", CONFLICT_OUTPUT);
        let engine = open_engine_with_remote(git, "/srv/widget.git").await;
        engine.sync_with_remote().await;

        engine.git().clear_failure("pull");
        assert!(engine.sync_with_remote().await.is_synced());
        assert!(engine.sync_state().conflicted_paths.is_empty());
        assert_eq!(engine.sync_state().consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concluded_merge_pending_commit_is_transient() {
        let git = MockGit::new();
        git.set_remote("origin", "/srv/widget.git");
        git.fail(
            "pull",
            "error: You have not concluded your merge (MERGE_HEAD exists).\n\
             hint: Please, commit your changes before merging.\n\
             fatal: Exiting because of unfinished merge.",
        );
        let engine = open_engine_with_remote(git, "/srv/widget.git").await;

        let outcome = engine.sync_with_remote().await;
        let SyncOutcome::Failed { kind, conflicts, .. } = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(kind, FailureKind::Transient);
        assert!(conflicts.unresolved_previous);
        assert!(conflicts.conflicted_paths.is_empty());
        assert_eq!(engine.git().count("conflicted_files"), 1);
        assert!(
            !engine
                .frontend()
                .events()
                .iter()
                .any(|e| matches!(e, FrontendEvent::Conflicts(_)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_failure_is_transient() {
        let git = MockGit::new();
        git.set_remote("origin", "/srv/widget.git");
        git.fail(
            "push",
            "fatal: unable to access '/srv/widget.git/': Could not resolve host",
        );
        let engine = open_engine_with_remote(git, "/srv/widget.git").await;

        let outcome = engine.sync_with_remote().await;
        assert!(matches!(
            outcome,
            SyncOutcome::Failed {
                step: SyncStep::Push,
                kind: FailureKind::Transient,
                ..
            }
        ));
        assert_eq!(engine.git().count("push_tags"), 0);
        assert_eq!(engine.sync_state().consecutive_failures, 1);
        assert!(engine.frontend().events().contains(&FrontendEvent::Healthy(false)));
        assert!(
            !engine
                .frontend()
                .events()
                .iter()
                .any(|e| matches!(e, FrontendEvent::Conflicts(_)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_attempt_waits_full_interval() {
        let git = MockGit::new();
        git.set_remote("origin", "/srv/widget.git");
        git.fail("pull", "fatal: Could not read from remote repository.");
        let engine = open_engine_with_remote(git, "/srv/widget.git").await;

        engine.sync_with_remote().await;
        assert_eq!(engine.git().count("pull"), 1);

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(engine.git().count("pull"), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(engine.git().count("pull"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_sync_replaces_scheduled_sync() {
        let git = MockGit::new();
        git.set_remote("origin", "/srv/widget.git");
        let engine = open_engine_with_remote(git, "/srv/widget.git").await;

        engine.sync_with_remote().await;
        tokio::time::sleep(Duration::from_secs(100)).await;

        engine.git().touch("docs/1.smores");
        engine.commit_changes("edit");
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(engine.git().count("pull"), 2);

        // The original 300s tick was cancelled by the flush-triggered sync.
        tokio::time::sleep(Duration::from_secs(250)).await;
        assert_eq!(engine.git().count("pull"), 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(engine.git().count("pull"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_remote_adds_then_replaces_then_removes() {
        let engine = open_engine(MockGit::new()).await;

        engine.set_remote(Some("/srv/a.git")).await.unwrap();
        assert_eq!(engine.git().remotes()[0].target, "/srv/a.git");
        assert_eq!(
            engine.repository().remote_target.as_deref(),
            Some("/srv/a.git")
        );
        assert_eq!(engine.workspace().metadata().repo_remote.as_deref(), Some("/srv/a.git"));

        engine.set_remote(Some("/srv/b.git")).await.unwrap();
        assert_eq!(engine.git().remotes().len(), 1);
        assert_eq!(engine.git().remotes()[0].target, "/srv/b.git");
        assert_eq!(engine.git().count("remove_remote"), 1);

        let outcome = engine.set_remote(None).await.unwrap();
        assert!(engine.git().remotes().is_empty());
        assert_eq!(outcome, SyncOutcome::RemoteUnused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_remote_is_left_alone() {
        let git = MockGit::new();
        git.set_remote("origin", "/srv/a.git");
        let engine = open_engine_with_remote(git, "/srv/a.git").await;

        let outcome = engine.update_remote().await.unwrap();
        assert!(outcome.is_synced());
        assert_eq!(engine.git().count("add_remote"), 0);
        assert_eq!(engine.git().count("remove_remote"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_stretches_interval() {
        let git = MockGit::new();
        git.set_remote("origin", "/srv/widget.git");
        git.fail("pull", "fatal: Could not read from remote repository.");
        let mut settings = crate::config::Settings::default();
        settings.sync.backoff_on_failure = true;
        let engine =
            crate::testing::open_engine_with(git, Some("/srv/widget.git"), settings).await;

        engine.sync_with_remote().await;
        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(engine.git().count("pull"), 1, "one failure doubles to 600s");

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(engine.git().count("pull"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unopened_engine_does_not_sync() {
        let engine = crate::testing::unopened_engine(MockGit::new());
        assert_eq!(engine.sync_with_remote().await, SyncOutcome::NotOpen);
        assert!(!engine.sync_scheduled());
    }
}
