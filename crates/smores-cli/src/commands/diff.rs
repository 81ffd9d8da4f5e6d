//! `smores diff` command - Show changes since a document was last issued.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use super::utils;
use crate::document::{CliDocument, DocumentArgs};
use crate::frontend::TerminalFrontend;
use crate::output;

/// Run the diff command.
pub fn run(project: &Path, args: &DocumentArgs, json: bool) -> Result<()> {
    let document = CliDocument::new(args, "");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let engine = utils::open_engine(project, TerminalFrontend::new()).await?;
        utils::require_open(&engine)?;

        let records = engine
            .get_diff_records(&document, args.trace_report)
            .await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }

        let since = engine
            .get_last_tag(&document, args.trace_report, true)
            .await;
        if records.is_empty() {
            output::info(&format!("No changes since {since}"));
            return Ok(());
        }

        output::info(&format!("Changes since {since}:"));
        output::hr();
        for record in &records {
            println!(
                "  {} {} {} {}",
                output::modification_label(record.modification),
                record.filepath,
                format!("+{}", record.insertions).green(),
                format!("-{}", record.deletions).red(),
            );
        }
        Ok(())
    })
}
