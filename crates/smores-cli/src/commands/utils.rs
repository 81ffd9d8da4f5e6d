use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use smores_core::{Engine, Error, FailureKind, ProjectState, SyncOutcome, Workspace};
use smores_git::GitCli;

use crate::frontend::TerminalFrontend;
use crate::output;

/// Engine as wired up by the command line.
pub type CliEngine = Engine<GitCli, ProjectState, TerminalFrontend>;

/// Open the project at `project` and reattach to its repository, if any.
pub async fn open_engine(project: &Path, frontend: TerminalFrontend) -> Result<CliEngine> {
    let state = ProjectState::new(project)
        .with_context(|| format!("Cannot open project at {}", project.display()))?;
    let settings = state.load_settings()?;
    let git = GitCli::new(state.project_dir()).with_program(settings.repository.git_program.clone());

    let engine = Engine::new(git, state, frontend, settings);
    if let Err(e) = engine.initialise().await {
        return Err(match e {
            // Already shown through the frontend.
            Error::MissingRepository { .. } | Error::RootMismatch { .. } => {
                anyhow!("Cannot reopen version control for this project")
            }
            other => {
                anyhow::Error::new(other).context("Cannot reopen version control for this project")
            }
        });
    }
    Ok(engine)
}

/// Fail unless version control has been started.
pub fn require_open(engine: &CliEngine) -> Result<()> {
    if !engine.repository().is_open {
        bail!("Version control not started - run `smores init` first");
    }
    Ok(())
}

/// Print the result of a sync cycle.
pub fn report_sync(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::NotOpen => {}
        SyncOutcome::RemoteUnused => output::detail("  No remote in use"),
        SyncOutcome::Synced => output::success("Synced with remote"),
        SyncOutcome::Failed {
            step,
            kind: FailureKind::Transient,
            error,
            ..
        } => output::warn(&format!("Sync failed during {step}: {error}")),
        SyncOutcome::Failed {
            kind: FailureKind::MergeConflict,
            ..
        } => output::warn("Sync stopped by a merge conflict"),
    }
}
