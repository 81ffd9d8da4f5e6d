//! Error types for smores-core.

use std::path::PathBuf;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in engine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Version control has not been started or reopened for this project.
    #[error("version control is not open for this project - run `smores init` first")]
    NotOpen,

    /// The project directory does not exist.
    #[error("project directory not found: {}", .0.display())]
    ProjectNotFound(PathBuf),

    /// Persisted metadata names a root that no longer contains a repository.
    #[error("no repository found at expected root {}", .expected.display())]
    MissingRepository {
        /// Root recorded in project metadata.
        expected: PathBuf,
    },

    /// The repository enclosing the project is not the one recorded.
    #[error(
        "expected repository root {} but the project is inside {}",
        .expected.display(),
        .found.display()
    )]
    RootMismatch {
        /// Root recorded in project metadata.
        expected: PathBuf,
        /// Root the tool reports.
        found: PathBuf,
    },

    /// The user declined to choose how version control should start.
    #[error("repository setup cancelled")]
    Cancelled,

    /// The project collaborator could not export its artifacts.
    #[error("export failed: {0}")]
    Export(String),

    /// Metadata or settings file parsing error.
    #[error("failed to parse {}: {message}", .file.display())]
    ParseError {
        /// File being parsed.
        file: PathBuf,
        /// Parser message.
        message: String,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Git operation error.
    #[error("git error: {0}")]
    Git(#[from] smores_git::Error),
}
