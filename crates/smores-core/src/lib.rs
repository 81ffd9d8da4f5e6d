//! # smores-core
//!
//! Version-control orchestration for smores projects: debounced commits,
//! periodic synchronization with a remote, revision tags for issued
//! documents and change records between revisions.
//!
//! The engine drives the git tool through [`smores_git::GitOps`] and talks to
//! the editor through the collaborator traits in [`traits`].

pub mod batcher;
pub mod config;
pub mod conflict;
pub mod diff;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod state;
pub mod sync;
pub mod tagger;
pub mod traits;

#[cfg(test)]
mod testing;

pub use batcher::{BatchPhase, FlushOutcome, SkipReason};
pub use config::Settings;
pub use conflict::{ConflictOutcome, classify};
pub use diff::{DiffRecord, Modification};
pub use engine::{Engine, RepositoryConfig};
pub use error::{Error, Result};
pub use lifecycle::StartOutcome;
pub use state::{ProjectMetadata, ProjectState};
pub use sync::{FailureKind, SyncOutcome, SyncState, SyncStep};
pub use tagger::{IssueReceipt, Tag, TagResult, tag_name};
pub use traits::{Document, Frontend, RepoChoice, Revision, Workspace};
