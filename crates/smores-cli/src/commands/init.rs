//! `smores init` command - Start version control for a project.

use std::path::Path;

use anyhow::Result;
use smores_core::{RepoChoice, StartOutcome};

use super::utils;
use crate::frontend::TerminalFrontend;
use crate::output;

/// Run the init command.
pub fn run(project: &Path, adopt: bool, nested: bool) -> Result<()> {
    let choice = if adopt {
        Some(RepoChoice::AdoptExisting)
    } else if nested {
        Some(RepoChoice::CreateNested)
    } else {
        None
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let frontend = TerminalFrontend::new().with_choice(choice);
        let engine = utils::open_engine(project, frontend).await?;

        if engine.repository().is_open {
            output::warn("Version control is already started for this project");
            return Ok(());
        }

        let outcome = engine.start_repo_use().await?;
        match &outcome {
            StartOutcome::Adopted { root, pathspec } => {
                output::success(&format!("Adopted repository at {}", root.display()));
                output::detail(&format!("  Tracking: {pathspec}"));
            }
            StartOutcome::Created { root, nested } => {
                output::success(&format!("Created repository at {}", root.display()));
                if *nested {
                    output::detail("  Ignored by the enclosing repository");
                }
            }
        }
        output::info(&format!("Baseline tag: {}", engine.baseline_tag()));

        engine.shutdown().await;
        Ok(())
    })
}
