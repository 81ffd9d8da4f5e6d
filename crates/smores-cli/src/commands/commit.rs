//! `smores commit` command - Commit current changes.

use std::path::Path;

use anyhow::{Result, bail};
use smores_core::{FlushOutcome, SkipReason};

use super::utils;
use crate::frontend::TerminalFrontend;
use crate::output;

/// Run the commit command.
pub fn run(project: &Path, messages: &[String]) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let engine = utils::open_engine(project, TerminalFrontend::new()).await?;
        utils::require_open(&engine)?;

        for message in messages {
            engine.commit_changes(message);
        }
        let outcome = engine.flush_now().await;
        engine.shutdown().await;

        match outcome {
            FlushOutcome::Skipped {
                reason: SkipReason::Empty,
            } => output::info("No commit message given"),
            FlushOutcome::Skipped {
                reason: SkipReason::NotOpen,
            } => bail!("Version control not started - run `smores init` first"),
            FlushOutcome::NothingToCommit { .. } => output::info("Nothing to commit"),
            FlushOutcome::Committed { paths, sync, .. } => {
                output::success(&format!("Committed {} file(s)", paths.len()));
                for path in &paths {
                    output::detail(&format!("  {path}"));
                }
                utils::report_sync(&sync);
            }
            FlushOutcome::Failed { error, .. } => bail!("Commit failed: {error}"),
        }
        Ok(())
    })
}
