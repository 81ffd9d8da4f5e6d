//! Command definitions and dispatch targets.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;

use crate::document::DocumentArgs;

pub mod commit;
pub mod completions;
pub mod diff;
pub mod init;
pub mod issue;
pub mod remote;
pub mod status;
pub mod sync;
pub mod tag;
pub mod utils;
pub mod watch;
pub mod whoami;

/// smores - version control for requirements documents.
#[derive(Debug, Parser)]
#[command(name = "smores", version, about, propagate_version = true)]
pub struct Cli {
    /// Project directory.
    #[arg(long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Only print essential output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// More diagnostics on stderr (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start version control for the project.
    Init {
        /// Adopt the enclosing repository without asking.
        #[arg(long, conflicts_with = "nested")]
        adopt: bool,

        /// Create a separate repository inside the enclosing one.
        #[arg(long)]
        nested: bool,
    },

    /// Show repository and remote status.
    #[command(alias = "st")]
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Commit current changes.
    Commit {
        /// Commit message line; repeat for several.
        #[arg(short, long = "message", required = true)]
        message: Vec<String>,
    },

    /// Pull, fetch tags, push and push tags once.
    Sync,

    /// Issue a document revision and tag it.
    Issue {
        #[command(flatten)]
        document: DocumentArgs,

        /// Description of the revision, used as the tag message.
        #[arg(long, default_value = "")]
        detail: String,
    },

    /// Print the tag of a document's last issued revision.
    Tag {
        #[command(flatten)]
        document: DocumentArgs,

        /// Print the computed name without checking history.
        #[arg(long)]
        no_verify: bool,
    },

    /// Show changes since a document was last issued.
    Diff {
        #[command(flatten)]
        document: DocumentArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configure the remote.
    Remote {
        #[command(subcommand)]
        command: RemoteCommand,
    },

    /// Print the configured git user name.
    Whoami,

    /// Keep syncing periodically until interrupted.
    Watch,

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum RemoteCommand {
    /// Use a remote URL or path.
    Set {
        /// URL or path of the remote repository.
        target: String,
    },
    /// Stop using a remote.
    Clear,
}
