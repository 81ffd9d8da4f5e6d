//! `GitCli` - runs the external git tool as a black box.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::RwLock;

use tokio::process::Command;

use crate::error::{Error, Result};
use crate::traits::GitOps;
use crate::types::{Remote, StatusEntry, parse_remotes, parse_status};

/// Print non-ASCII paths verbatim instead of C-quoting them.
const QUOTE_PATH_OFF: &str = "core.quotePath=false";

/// High-level wrapper around the git command-line tool.
#[derive(Debug)]
pub struct GitCli {
    program: String,
    workdir: RwLock<PathBuf>,
}

impl GitCli {
    /// Create a gateway running `git` in the given directory.
    #[must_use]
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: "git".into(),
            workdir: RwLock::new(workdir.into()),
        }
    }

    /// Use a different git executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Directory commands run in.
    #[must_use]
    pub fn workdir(&self) -> PathBuf {
        self.workdir
            .read()
            .map_or_else(|poisoned| poisoned.into_inner().clone(), |p| p.clone())
    }

    /// Point subsequent commands at another directory.
    pub fn set_workdir(&self, path: &Path) {
        match self.workdir.write() {
            Ok(mut guard) => *guard = path.to_path_buf(),
            Err(poisoned) => *poisoned.into_inner() = path.to_path_buf(),
        }
    }

    /// Execute a git command and return its stdout.
    async fn run(&self, args: &[&str]) -> Result<String> {
        let workdir = self.workdir();
        let command = format!("{} {}", self.program, args.join(" "));
        tracing::debug!(%command, workdir = %workdir.display(), "running git");

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound && workdir.is_dir() {
                    Error::GitNotFound(self.program.clone())
                } else {
                    Error::Io(e)
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        tracing::debug!(%command, code = ?output.status.code(), "git failed");
        Err(Error::CommandFailed {
            command,
            code: output.status.code(),
            stdout,
            stderr,
        })
    }

    async fn run_with_path(&self, base: &[&str], path: Option<&str>) -> Result<String> {
        let mut args = base.to_vec();
        if let Some(path) = path {
            args.push("--");
            args.push(path);
        }
        self.run(&args).await
    }

    // === Repository info ===

    /// Check whether the working directory is inside a repository.
    pub async fn is_repository(&self) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"])
            .await
            .is_ok_and(|out| out.trim() == "true")
    }

    /// Resolve the repository top-level directory.
    ///
    /// # Errors
    /// Returns the tool's failure when not inside a repository.
    pub async fn show_toplevel(&self) -> Result<PathBuf> {
        let out = self.run(&["rev-parse", "--show-toplevel"]).await?;
        Ok(PathBuf::from(out.trim()))
    }

    /// Create a repository in the working directory.
    ///
    /// # Errors
    /// Returns error if `git init` fails.
    pub async fn init(&self) -> Result<()> {
        self.run(&["init"]).await.map(drop)
    }

    /// Get the current branch name.
    ///
    /// Works before the first commit; fails when HEAD is detached.
    ///
    /// # Errors
    /// Returns error if HEAD does not name a branch.
    pub async fn current_branch(&self) -> Result<String> {
        let out = self.run(&["symbolic-ref", "--short", "HEAD"]).await?;
        Ok(out.trim().to_string())
    }

    /// Read a configuration value.
    ///
    /// # Errors
    /// Returns error if git config fails for a reason other than an unset key.
    pub async fn config_value(&self, key: &str) -> Result<Option<String>> {
        match self.run(&["config", "--get", key]).await {
            Ok(out) => {
                let value = out.trim();
                Ok((!value.is_empty()).then(|| value.to_string()))
            }
            Err(Error::CommandFailed { code: Some(1), .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // === Remotes ===

    /// List configured remotes.
    ///
    /// # Errors
    /// Returns error if `git remote` fails.
    pub async fn list_remotes(&self) -> Result<Vec<Remote>> {
        let out = self.run(&["remote", "-v"]).await?;
        Ok(parse_remotes(&out))
    }

    /// Add a remote.
    ///
    /// # Errors
    /// Returns error if the remote already exists.
    pub async fn add_remote(&self, name: &str, target: &str) -> Result<()> {
        self.run(&["remote", "add", name, target]).await.map(drop)
    }

    /// Remove a remote.
    ///
    /// # Errors
    /// Returns error if the remote does not exist.
    pub async fn remove_remote(&self, name: &str) -> Result<()> {
        self.run(&["remote", "remove", name]).await.map(drop)
    }

    /// Pull with a merge, never a rebase.
    ///
    /// # Errors
    /// Returns the tool's failure, including merge conflicts.
    pub async fn pull(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&["pull", "--no-rebase", "--no-edit", remote, branch])
            .await
            .map(drop)
    }

    /// Fetch a branch and all tags.
    ///
    /// # Errors
    /// Returns the tool's failure.
    pub async fn fetch_tags(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&["fetch", "--tags", remote, branch]).await.map(drop)
    }

    /// Push a branch.
    ///
    /// # Errors
    /// Returns the tool's failure.
    pub async fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&["push", remote, branch]).await.map(drop)
    }

    /// Push all tags.
    ///
    /// # Errors
    /// Returns the tool's failure.
    pub async fn push_tags(&self, remote: &str) -> Result<()> {
        self.run(&["push", remote, "--tags"]).await.map(drop)
    }

    // === Tags ===

    /// Create an annotated tag at HEAD.
    ///
    /// # Errors
    /// Returns error if the tag exists or HEAD is unborn.
    pub async fn add_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        self.run(&["tag", "-a", name, "-m", message]).await.map(drop)
    }

    /// List all tag names.
    ///
    /// # Errors
    /// Returns error if `git tag` fails.
    pub async fn list_tags(&self) -> Result<Vec<String>> {
        let out = self.run(&["tag", "--list"]).await?;
        Ok(lines(&out))
    }

    // === Index and commits ===

    /// Status of paths under `pathspec`, including ignored ones.
    ///
    /// # Errors
    /// Returns error if `git status` fails.
    pub async fn status(&self, pathspec: &str) -> Result<Vec<StatusEntry>> {
        let out = self
            .run(&[
                "status",
                "--porcelain=v1",
                "-z",
                "--ignored",
                "--untracked-files=all",
                "--",
                pathspec,
            ])
            .await?;
        Ok(parse_status(&out))
    }

    /// Paths with unresolved merge conflicts.
    ///
    /// # Errors
    /// Returns error if `git diff` fails.
    pub async fn conflicted_files(&self) -> Result<Vec<String>> {
        let out = self
            .run(&["-c", QUOTE_PATH_OFF, "diff", "--name-only", "--diff-filter=U"])
            .await?;
        Ok(lines(&out))
    }

    /// Stage the given paths.
    ///
    /// # Errors
    /// Returns error if any path cannot be staged.
    pub async fn add(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run(&args).await.map(drop)
    }

    /// Commit the staged changes.
    ///
    /// # Errors
    /// Returns error if nothing is staged or the commit fails.
    pub async fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "-m", message]).await.map(drop)
    }

    // === Diffs ===

    /// Per-file insertion and deletion counts.
    ///
    /// # Errors
    /// Returns error if the range cannot be resolved.
    pub async fn diff_numstat(&self, range: &str, path: Option<&str>) -> Result<String> {
        self.run_with_path(&["-c", QUOTE_PATH_OFF, "diff", "--numstat", "-M", range], path)
            .await
    }

    /// Per-file status codes.
    ///
    /// # Errors
    /// Returns error if the range cannot be resolved.
    pub async fn diff_summary(&self, range: &str, path: Option<&str>) -> Result<String> {
        self.run_with_path(
            &["-c", QUOTE_PATH_OFF, "diff", "--compact-summary", "--name-status", "-M", range],
            path,
        )
        .await
    }

    /// Full unified diff.
    ///
    /// # Errors
    /// Returns error if the range cannot be resolved.
    pub async fn diff_detail(&self, range: &str, path: Option<&str>) -> Result<String> {
        self.run_with_path(&["-c", QUOTE_PATH_OFF, "diff", "-M", range], path)
            .await
    }
}

fn lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

impl GitOps for GitCli {
    fn workdir(&self) -> PathBuf {
        self.workdir()
    }

    fn set_workdir(&self, path: &Path) {
        self.set_workdir(path);
    }

    async fn is_repository(&self) -> bool {
        self.is_repository().await
    }

    async fn show_toplevel(&self) -> Result<PathBuf> {
        self.show_toplevel().await
    }

    async fn init(&self) -> Result<()> {
        self.init().await
    }

    async fn current_branch(&self) -> Result<String> {
        self.current_branch().await
    }

    async fn config_value(&self, key: &str) -> Result<Option<String>> {
        self.config_value(key).await
    }

    async fn list_remotes(&self) -> Result<Vec<Remote>> {
        self.list_remotes().await
    }

    async fn add_remote(&self, name: &str, target: &str) -> Result<()> {
        self.add_remote(name, target).await
    }

    async fn remove_remote(&self, name: &str) -> Result<()> {
        self.remove_remote(name).await
    }

    async fn pull(&self, remote: &str, branch: &str) -> Result<()> {
        self.pull(remote, branch).await
    }

    async fn fetch_tags(&self, remote: &str, branch: &str) -> Result<()> {
        self.fetch_tags(remote, branch).await
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.push(remote, branch).await
    }

    async fn push_tags(&self, remote: &str) -> Result<()> {
        self.push_tags(remote).await
    }

    async fn add_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        self.add_annotated_tag(name, message).await
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        self.list_tags().await
    }

    async fn status(&self, pathspec: &str) -> Result<Vec<StatusEntry>> {
        self.status(pathspec).await
    }

    async fn conflicted_files(&self) -> Result<Vec<String>> {
        self.conflicted_files().await
    }

    async fn add(&self, paths: &[String]) -> Result<()> {
        self.add(paths).await
    }

    async fn commit(&self, message: &str) -> Result<()> {
        self.commit(message).await
    }

    async fn diff_numstat(&self, range: &str, path: Option<&str>) -> Result<String> {
        self.diff_numstat(range, path).await
    }

    async fn diff_summary(&self, range: &str, path: Option<&str>) -> Result<String> {
        self.diff_summary(range, path).await
    }

    async fn diff_detail(&self, range: &str, path: Option<&str>) -> Result<String> {
        self.diff_detail(range, path).await
    }
}
