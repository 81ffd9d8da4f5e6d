//! # smores-git
//!
//! Gateway to the git command-line tool for smores. Each operation runs the
//! external tool once and resolves with its output, or fails with the raw
//! text the tool printed. Interpreting that text is left to the caller.

mod cli;
mod error;
mod traits;
mod types;

pub use cli::GitCli;
pub use error::{Error, Result};
pub use traits::GitOps;
pub use types::{Remote, StatusEntry, parse_remotes, parse_status};
