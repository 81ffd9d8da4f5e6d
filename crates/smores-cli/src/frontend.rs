//! Terminal implementation of the engine's frontend.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use inquire::Select;
use smores_core::{Frontend, RepoChoice};

use crate::output;

const ADOPT: &str = "Use the enclosing repository";
const NESTED: &str = "Create a separate repository for this project";

/// Reports engine events on the terminal.
pub struct TerminalFrontend {
    spinner: Mutex<Option<ProgressBar>>,
    preset: Option<RepoChoice>,
    interactive: bool,
    announce: bool,
}

impl TerminalFrontend {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
            preset: None,
            interactive: console::Term::stdout().is_term() && !output::is_quiet(),
            announce: false,
        }
    }

    /// Answer the adopt/create question without prompting.
    pub const fn with_choice(mut self, choice: Option<RepoChoice>) -> Self {
        self.preset = choice;
        self
    }

    /// Print a line for every sync result, for long-running sessions.
    pub const fn announcing(mut self) -> Self {
        self.announce = true;
        self
    }

    fn stop_spinner(&self) {
        let spinner = match self.spinner.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
    }
}

impl Frontend for TerminalFrontend {
    fn sync_start(&self) {
        if !self.interactive {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Syncing with remote...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut guard) = self.spinner.lock() {
            *guard = Some(spinner);
        }
    }

    fn update_healthy(&self, healthy: bool) {
        self.stop_spinner();
        tracing::debug!(healthy, "remote health");
        if self.announce {
            let now = chrono::Local::now().format("%H:%M:%S");
            if healthy {
                output::success(&format!("{now} synced with remote"));
            } else {
                output::warn(&format!("{now} sync failed, retrying at next tick"));
            }
        }
    }

    fn update_remote_use(&self, in_use: bool) {
        tracing::debug!(in_use, "remote in use");
    }

    fn show_error(&self, message: &str) {
        self.stop_spinner();
        output::error(message);
    }

    fn show_conflicts(&self, paths: &[String]) {
        self.stop_spinner();
        output::warn("Merge conflicts need manual resolution:");
        for path in paths {
            eprintln!("    {path}");
        }
        eprintln!();
        eprintln!("Edit the files, then `git add` and `git commit` them.");
        eprintln!("smores leaves these paths alone until the next pull succeeds.");
    }

    fn choose_repository_mode(&self, outer_root: &Path) -> Option<RepoChoice> {
        if let Some(choice) = self.preset {
            return Some(choice);
        }
        if !self.interactive {
            output::warn(&format!(
                "Project is inside the repository at {}; pass --adopt or --nested",
                outer_root.display()
            ));
            return None;
        }

        let answer = Select::new(
            &format!("Project is inside {}.", outer_root.display()),
            vec![ADOPT, NESTED],
        )
        .with_help_message("Adopting tracks only this folder within the existing history")
        .prompt()
        .ok()?;

        Some(if answer == ADOPT {
            RepoChoice::AdoptExisting
        } else {
            RepoChoice::CreateNested
        })
    }
}
