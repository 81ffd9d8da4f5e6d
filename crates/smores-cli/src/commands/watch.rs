//! `smores watch` command - Keep syncing until interrupted.

use std::path::Path;

use anyhow::{Context, Result};

use super::utils;
use crate::frontend::TerminalFrontend;
use crate::output;

/// Run the watch command.
pub fn run(project: &Path) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let engine = utils::open_engine(project, TerminalFrontend::new().announcing()).await?;
        utils::require_open(&engine)?;

        let interval = engine.settings().sync.interval_secs;
        output::info(&format!(
            "Syncing every {interval}s since {}. Press Ctrl-C to stop.",
            chrono::Local::now().format("%H:%M:%S")
        ));

        // Each cycle schedules the next one.
        engine.sync_with_remote().await;

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;

        output::info("Stopping");
        engine.shutdown().await;
        Ok(())
    })
}
