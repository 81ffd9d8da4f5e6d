//! `smores whoami` command - Print the git user name.

use std::path::Path;

use anyhow::{Result, bail};

use super::utils;
use crate::frontend::TerminalFrontend;
use crate::output;

/// Run the whoami command.
pub fn run(project: &Path) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let engine = utils::open_engine(project, TerminalFrontend::new()).await?;
        let Some(name) = engine.configured_user_name().await else {
            bail!("No git user.name configured - run `git config user.name <name>`");
        };
        output::essential(&name);
        Ok(())
    })
}
