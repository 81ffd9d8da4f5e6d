//! Starting and reopening version control for a project.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use smores_git::GitOps;

use crate::engine::{Engine, lock};
use crate::error::{Error, Result};
use crate::traits::{Frontend, RepoChoice, Workspace};

const IGNORE_FILE: &str = ".gitignore";

/// How version control was started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StartOutcome {
    /// The enclosing repository was adopted.
    Adopted {
        /// Repository top level.
        root: PathBuf,
        /// Project folder relative to `root`.
        pathspec: String,
    },
    /// A repository was created at the project folder.
    Created {
        /// The project folder.
        root: PathBuf,
        /// It sits inside another repository.
        nested: bool,
    },
}

impl StartOutcome {
    fn root(&self) -> &Path {
        match self {
            Self::Adopted { root, .. } | Self::Created { root, .. } => root,
        }
    }

    fn pathspec(&self) -> &str {
        match self {
            Self::Adopted { pathspec, .. } => pathspec,
            Self::Created { .. } => ".",
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn same_path(a: &Path, b: &Path) -> bool {
    canonical(a) == canonical(b)
}

/// `project` relative to `root`, `/` separated; `.` when they are equal.
fn relative_pathspec(root: &Path, project: &Path) -> Option<String> {
    let relative = project.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        Some(".".into())
    } else {
        Some(parts.join("/"))
    }
}

/// Add `folder/` to the ignore file beside the project folder.
fn ignore_in_parent(project: &Path) -> Result<()> {
    let (Some(parent), Some(name)) = (project.parent(), project.file_name()) else {
        return Ok(());
    };
    let entry = format!("{}/", name.to_string_lossy());
    let path = parent.join(IGNORE_FILE);

    let existing = fs::read_to_string(&path).unwrap_or_default();
    if existing.lines().any(|l| l.trim() == entry) {
        return Ok(());
    }

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{entry}")?;
    tracing::debug!(path = %path.display(), %entry, "ignored nested repository");
    Ok(())
}

impl<G, W, F> Engine<G, W, F>
where
    G: GitOps + 'static,
    W: Workspace + 'static,
    F: Frontend + 'static,
{
    /// Put the project under version control for the first time.
    ///
    /// When the project already sits inside a repository the frontend
    /// chooses between adopting it and creating a nested one; a project
    /// folder that is itself a repository root is adopted without asking.
    /// The outcome is persisted to project metadata and committed, and the
    /// baseline tag marks the starting point.
    ///
    /// # Errors
    /// Returns [`Error::Cancelled`] if the choice was declined, or the git
    /// or IO error that stopped setup.
    pub async fn start_repo_use(&self) -> Result<StartOutcome> {
        let project_dir = canonical(self.inner.workspace.project_dir());

        let outcome = {
            let _worktree = self.inner.worktree.lock().await;
            let git = &self.inner.git;
            git.set_workdir(&project_dir);

            let outer = if git.is_repository().await {
                Some(canonical(&git.show_toplevel().await?))
            } else {
                None
            };

            let choice = match &outer {
                None => RepoChoice::CreateNested,
                Some(root) if same_path(root, &project_dir) => RepoChoice::AdoptExisting,
                Some(root) => self
                    .inner
                    .frontend
                    .choose_repository_mode(root)
                    .ok_or(Error::Cancelled)?,
            };

            match (outer, choice) {
                (Some(root), RepoChoice::AdoptExisting) => self.adopt(root, &project_dir).await?,
                (outer, _) => self.create(&project_dir, outer.is_some()).await?,
            }
        };

        let mut metadata = self.inner.workspace.load_metadata()?;
        metadata.git_in_use = true;
        metadata.repo_root = Some(outcome.root().to_path_buf());
        metadata.repo_pathspec = Some(outcome.pathspec().to_string());
        self.inner.workspace.save_metadata(&metadata)?;

        {
            let mut repo = lock(&self.inner.repo);
            repo.base_directory = outcome.root().to_path_buf();
            repo.tracked_pathspec = outcome.pathspec().to_string();
            repo.remote_target = metadata.repo_remote.filter(|t| !t.trim().is_empty());
            repo.is_open = true;
        }

        self.commit_changes("Record version control settings");
        self.flush_now().await;
        self.create_baseline_tag().await?;

        tracing::info!(?outcome, "version control started");
        Ok(outcome)
    }

    async fn adopt(&self, root: PathBuf, project_dir: &Path) -> Result<StartOutcome> {
        let pathspec = relative_pathspec(&root, project_dir).ok_or_else(|| Error::RootMismatch {
            expected: project_dir.to_path_buf(),
            found: root.clone(),
        })?;
        self.inner.git.set_workdir(&root);
        self.commit_tree(&pathspec, "Start version control").await?;
        Ok(StartOutcome::Adopted { root, pathspec })
    }

    async fn create(&self, project_dir: &Path, nested: bool) -> Result<StartOutcome> {
        self.inner.git.init().await?;
        if nested {
            ignore_in_parent(project_dir)?;
        }
        self.commit_tree(".", "Initial commit").await?;
        Ok(StartOutcome::Created {
            root: project_dir.to_path_buf(),
            nested,
        })
    }

    /// Stage and commit every non-ignored change under `pathspec`.
    async fn commit_tree(&self, pathspec: &str, message: &str) -> Result<()> {
        if let Err(e) = self.inner.workspace.export_all() {
            tracing::warn!(error = %e, "export failed before first commit");
        }
        let paths: Vec<String> = self
            .inner
            .git
            .status(pathspec)
            .await?
            .into_iter()
            .filter(|e| !e.is_ignored())
            .map(|e| e.path)
            .collect();
        if paths.is_empty() {
            tracing::debug!(pathspec, "nothing to commit at start");
            return Ok(());
        }
        self.inner.git.add(&paths).await?;
        self.inner.git.commit(message).await?;
        Ok(())
    }

    async fn create_baseline_tag(&self) -> Result<()> {
        let _worktree = self.inner.worktree.lock().await;
        let baseline = self.baseline_tag();
        if self.inner.git.list_tags().await?.contains(&baseline) {
            tracing::debug!(tag = %baseline, "baseline tag exists");
            return Ok(());
        }
        let message = format!("Baseline for {}", self.inner.workspace.project_name());
        self.inner.git.add_annotated_tag(&baseline, &message).await?;
        tracing::info!(tag = %baseline, "created baseline tag");
        Ok(())
    }

    /// Reopen version control from persisted metadata.
    ///
    /// A project that never started version control stays closed. The
    /// repository enclosing the project must be the recorded one; if it is
    /// missing or different the error is reported to the frontend and
    /// returned, and nothing is persisted.
    ///
    /// # Errors
    /// Returns [`Error::MissingRepository`] or [`Error::RootMismatch`], or
    /// the error reading metadata.
    pub async fn initialise(&self) -> Result<()> {
        let metadata = self.inner.workspace.load_metadata()?;
        let project_dir = self.inner.workspace.project_dir().to_path_buf();
        if !metadata.git_in_use {
            tracing::debug!("version control not in use");
            lock(&self.inner.repo).is_open = false;
            return Ok(());
        }

        let expected = metadata.repo_root.clone().unwrap_or_else(|| project_dir.clone());

        let _worktree = self.inner.worktree.lock().await;
        let git = &self.inner.git;
        git.set_workdir(&project_dir);

        if !git.is_repository().await {
            return Err(self.report_state_error(Error::MissingRepository { expected }));
        }
        let found = git.show_toplevel().await?;
        if !same_path(&found, &expected) {
            return Err(self.report_state_error(Error::RootMismatch { expected, found }));
        }

        git.set_workdir(&expected);
        let mut repo = lock(&self.inner.repo);
        repo.base_directory = expected;
        repo.tracked_pathspec = metadata
            .repo_pathspec
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| ".".into());
        repo.remote_target = metadata.repo_remote.filter(|t| !t.trim().is_empty());
        repo.is_open = true;
        tracing::info!(root = %repo.base_directory.display(), pathspec = %repo.tracked_pathspec, "repository opened");
        Ok(())
    }

    fn report_state_error(&self, error: Error) -> Error {
        tracing::error!(%error, "cannot open repository");
        lock(&self.inner.repo).is_open = false;
        self.inner.frontend.show_error(&error.to_string());
        error
    }
}
