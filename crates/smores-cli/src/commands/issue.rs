//! `smores issue` command - Tag a document revision.

use std::path::Path;

use anyhow::{Result, bail};
use smores_core::{FlushOutcome, TagResult};

use super::utils;
use crate::document::{CliDocument, DocumentArgs};
use crate::frontend::TerminalFrontend;
use crate::output;

/// Run the issue command.
pub fn run(project: &Path, args: &DocumentArgs, detail: &str) -> Result<()> {
    let document = CliDocument::new(args, detail);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let engine = utils::open_engine(project, TerminalFrontend::new()).await?;
        utils::require_open(&engine)?;

        let receipt = engine.issue_document(&document, args.trace_report).await?;
        if let FlushOutcome::Committed { paths, .. } = &receipt.flush {
            output::info(&format!("Committed {} pending file(s) first", paths.len()));
        }

        let results = engine.flush_tags().await;
        engine.shutdown().await;

        for result in results {
            match result {
                TagResult::Created { name } => {
                    output::success("Tagged revision");
                    output::essential(&name);
                }
                TagResult::AlreadyExists { name } => {
                    output::warn(&format!("Tag {name} already exists"));
                }
                TagResult::Failed { name, error } => bail!("Could not create {name}: {error}"),
            }
        }
        Ok(())
    })
}
