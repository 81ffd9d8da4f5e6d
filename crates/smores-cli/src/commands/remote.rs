//! `smores remote` command - Configure the remote.

use std::path::Path;

use anyhow::Result;

use super::utils;
use crate::frontend::TerminalFrontend;
use crate::output;

/// Run the remote command. `None` stops using a remote.
pub fn run(project: &Path, target: Option<&str>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let engine = utils::open_engine(project, TerminalFrontend::new()).await?;

        let outcome = engine.set_remote(target).await?;
        match target {
            Some(target) => output::success(&format!("Remote set to {target}")),
            None => output::success("Remote cleared"),
        }
        if !engine.repository().is_open {
            output::detail("  Takes effect once version control is started");
        }
        utils::report_sync(&outcome);

        engine.shutdown().await;
        Ok(())
    })
}
