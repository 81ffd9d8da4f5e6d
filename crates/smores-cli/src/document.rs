//! Documents named on the command line.

use clap::Args;
use smores_core::{Document, Revision};

/// Identifies a document revision.
#[derive(Debug, Clone, Args)]
pub struct DocumentArgs {
    /// Document id.
    pub id: u64,

    /// Document title.
    pub title: String,

    /// Major revision number.
    #[arg(long, default_value_t = 0)]
    pub major: u32,

    /// Minor revision number.
    #[arg(long, default_value_t = 1)]
    pub minor: u32,

    /// Use the document's trace report instead of the document itself.
    #[arg(long)]
    pub trace_report: bool,
}

/// A document as described by [`DocumentArgs`].
///
/// The command line names exactly one revision, so it serves both the
/// document and its trace report.
pub struct CliDocument {
    id: u64,
    title: String,
    revision: Revision,
}

impl CliDocument {
    pub fn new(args: &DocumentArgs, detail: &str) -> Self {
        Self {
            id: args.id,
            title: args.title.clone(),
            revision: Revision::new(args.major, args.minor, detail),
        }
    }
}

impl Document for CliDocument {
    fn id(&self) -> u64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn latest_revision(&self, _trace_report: bool) -> Revision {
        self.revision.clone()
    }
}
