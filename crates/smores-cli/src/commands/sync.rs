//! `smores sync` command - Run one exchange with the remote.

use std::path::Path;

use anyhow::{Result, bail};
use smores_core::SyncOutcome;

use super::utils;
use crate::frontend::TerminalFrontend;
use crate::output;

/// Run the sync command.
pub fn run(project: &Path) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let engine = utils::open_engine(project, TerminalFrontend::new()).await?;
        utils::require_open(&engine)?;

        let outcome = engine.sync_with_remote().await;
        let state = engine.sync_state();
        engine.shutdown().await;

        match &outcome {
            SyncOutcome::RemoteUnused => {
                output::info("No remote in use. Use `smores remote set <url>` to add one.");
            }
            SyncOutcome::Failed { step, .. } => {
                utils::report_sync(&outcome);
                bail!("Sync did not complete ({step} failed)");
            }
            SyncOutcome::NotOpen | SyncOutcome::Synced => utils::report_sync(&outcome),
        }
        if let Some(target) = engine.repository().remote_target {
            output::detail(&format!("  {} {target}", output::health_indicator(&state)));
        }
        Ok(())
    })
}
