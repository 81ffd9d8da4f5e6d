//! `smores tag` command - Print the tag of a document's last issue.

use std::path::Path;

use anyhow::Result;

use super::utils;
use crate::document::{CliDocument, DocumentArgs};
use crate::frontend::TerminalFrontend;
use crate::output;

/// Run the tag command.
///
/// With `verify`, a tag missing from history falls back to the baseline.
pub fn run(project: &Path, args: &DocumentArgs, verify: bool) -> Result<()> {
    let document = CliDocument::new(args, "");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let engine = utils::open_engine(project, TerminalFrontend::new()).await?;
        let name = engine
            .get_last_tag(&document, args.trace_report, verify)
            .await;
        output::essential(&name);
        Ok(())
    })
}
