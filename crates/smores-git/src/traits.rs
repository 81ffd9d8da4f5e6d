//! Trait abstraction for git operations.
//!
//! This module defines the `GitOps` trait which abstracts every operation the
//! engine issues against the version-control tool, enabling dependency
//! injection and testability.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::{Remote, Result, StatusEntry};

/// Trait for git repository operations.
///
/// This trait abstracts git invocations, allowing for:
/// - Dependency injection in the engine
/// - Scripted mock implementations for testing
///
/// Implementations never interpret failure text. A failed command resolves
/// to an error carrying the raw tool output; callers classify it.
///
/// Every call touches the one working tree at [`GitOps::workdir`]. Nothing
/// here serializes calls; the engine is responsible for that.
#[allow(clippy::missing_errors_doc)]
pub trait GitOps: Send + Sync {
    // === Working Tree ===

    /// Directory commands run in.
    fn workdir(&self) -> PathBuf;

    /// Point subsequent commands at another directory.
    fn set_workdir(&self, path: &Path);

    // === Repository Info ===

    /// Check whether the working directory is inside a repository.
    fn is_repository(&self) -> impl Future<Output = bool> + Send;

    /// Resolve the top-level directory of the enclosing repository.
    fn show_toplevel(&self) -> impl Future<Output = Result<PathBuf>> + Send;

    /// Create a new repository in the working directory.
    fn init(&self) -> impl Future<Output = Result<()>> + Send;

    /// Get the current branch name.
    fn current_branch(&self) -> impl Future<Output = Result<String>> + Send;

    /// Read a configuration value, `None` when unset.
    fn config_value(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    // === Remote Operations ===

    /// List configured remotes.
    fn list_remotes(&self) -> impl Future<Output = Result<Vec<Remote>>> + Send;

    /// Add a remote.
    fn add_remote(&self, name: &str, target: &str) -> impl Future<Output = Result<()>> + Send;

    /// Remove a remote.
    fn remove_remote(&self, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Pull a branch, merging rather than rebasing.
    fn pull(&self, remote: &str, branch: &str) -> impl Future<Output = Result<()>> + Send;

    /// Fetch a branch together with its tags.
    fn fetch_tags(&self, remote: &str, branch: &str) -> impl Future<Output = Result<()>> + Send;

    /// Push a branch.
    fn push(&self, remote: &str, branch: &str) -> impl Future<Output = Result<()>> + Send;

    /// Push all tags.
    fn push_tags(&self, remote: &str) -> impl Future<Output = Result<()>> + Send;

    // === Tags ===

    /// Create an annotated tag at HEAD.
    fn add_annotated_tag(
        &self,
        name: &str,
        message: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// List tag names.
    fn list_tags(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    // === Index and Commits ===

    /// Working tree status limited to a pathspec, ignored paths included.
    fn status(&self, pathspec: &str) -> impl Future<Output = Result<Vec<StatusEntry>>> + Send;

    /// Paths with unresolved merge conflicts.
    fn conflicted_files(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Stage paths.
    fn add(&self, paths: &[String]) -> impl Future<Output = Result<()>> + Send;

    /// Commit what is staged.
    fn commit(&self, message: &str) -> impl Future<Output = Result<()>> + Send;

    // === Diffs ===

    /// `diff --numstat` over a revision range.
    fn diff_numstat(
        &self,
        range: &str,
        path: Option<&str>,
    ) -> impl Future<Output = Result<String>> + Send;

    /// `diff --compact-summary --name-status` over a revision range.
    fn diff_summary(
        &self,
        range: &str,
        path: Option<&str>,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Full unified diff over a revision range.
    fn diff_detail(
        &self,
        range: &str,
        path: Option<&str>,
    ) -> impl Future<Output = Result<String>> + Send;
}
