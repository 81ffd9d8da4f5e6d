//! Collaborator traits.
//!
//! The document tree, its persistence and the editor UI live outside the
//! engine. They reach it through these traits, enabling dependency
//! injection and testability.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::state::ProjectMetadata;

/// The open project.
#[allow(clippy::missing_errors_doc)]
pub trait Workspace: Send + Sync {
    /// Directory holding the project.
    fn project_dir(&self) -> &Path;

    /// Human-readable project name, used for the baseline tag.
    fn project_name(&self) -> &str;

    /// Write every exportable artifact to disk before a commit.
    fn export_all(&self) -> Result<()>;

    /// Read the persisted version-control fields.
    fn load_metadata(&self) -> Result<ProjectMetadata>;

    /// Persist the version-control fields.
    fn save_metadata(&self, metadata: &ProjectMetadata) -> Result<()>;
}

/// One issued snapshot of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Major revision number.
    pub major: u32,
    /// Minor revision number.
    pub minor: u32,
    /// Free-text description, used as the tag message.
    pub detail: String,
}

impl Revision {
    /// Create a revision.
    #[must_use]
    pub fn new(major: u32, minor: u32, detail: impl Into<String>) -> Self {
        Self {
            major,
            minor,
            detail: detail.into(),
        }
    }

    /// Zero-padded `major-minor` form used in tag names.
    #[must_use]
    pub fn issue_string(&self) -> String {
        format!("{:02}-{:02}", self.major, self.minor)
    }
}

/// A requirements or test document.
pub trait Document: Send + Sync {
    /// Stable numeric identity.
    fn id(&self) -> u64;

    /// Current title.
    fn title(&self) -> &str;

    /// Latest revision of the document or of its trace report.
    fn latest_revision(&self, trace_report: bool) -> Revision;
}

/// How to start version control when the project already sits inside a
/// repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepoChoice {
    /// Use the enclosing repository, scoped to the project folder.
    AdoptExisting,
    /// Create a separate repository at the project folder.
    CreateNested,
}

/// The editor-facing side: status display, notifications and decisions.
pub trait Frontend: Send + Sync {
    // === Status ===

    /// A network sync is starting.
    fn sync_start(&self);

    /// The last sync attempt succeeded or failed.
    fn update_healthy(&self, healthy: bool);

    /// Whether a remote is configured and present.
    fn update_remote_use(&self, in_use: bool);

    // === Notifications ===

    /// Report a failure the user must act on.
    fn show_error(&self, message: &str);

    /// Report merge conflicts and open the files for manual resolution.
    fn show_conflicts(&self, paths: &[String]);

    // === Decisions ===

    /// Choose between adopting `outer_root` and creating a nested
    /// repository. `None` cancels.
    fn choose_repository_mode(&self, outer_root: &Path) -> Option<RepoChoice>;
}
