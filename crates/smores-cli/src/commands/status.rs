//! `smores status` command - Display repository and remote settings.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use smores_core::{RepositoryConfig, Workspace};

use super::utils;
use crate::frontend::TerminalFrontend;
use crate::output;

/// JSON output structure.
#[derive(Serialize)]
struct JsonOutput {
    project: String,
    in_use: bool,
    repository: RepositoryConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    baseline_tag: Option<String>,
    conflicted_paths: Vec<String>,
}

/// Run the status command.
pub fn run(project: &Path, json: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let engine = utils::open_engine(project, TerminalFrontend::new()).await?;
        let repository = engine.repository();
        let name = engine.workspace().project_name().to_string();

        if !repository.is_open {
            if json {
                let output = JsonOutput {
                    project: name,
                    in_use: false,
                    repository,
                    user_name: None,
                    baseline_tag: None,
                    conflicted_paths: vec![],
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                output::info("Version control not started. Use `smores init` to start it.");
            }
            return Ok(());
        }

        let user_name = engine.configured_user_name().await;
        let conflicted_paths = match engine.git().conflicted_files().await {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!(error = %e, "could not list conflicted files");
                vec![]
            }
        };
        let baseline_tag = engine.baseline_tag();

        if json {
            let output = JsonOutput {
                project: name,
                in_use: true,
                repository,
                user_name,
                baseline_tag: Some(baseline_tag),
                conflicted_paths,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("{}", name.bold());
        output::detail(&format!("  Repository: {}", repository.base_directory.display()));
        output::detail(&format!("  Tracking:   {}", repository.tracked_pathspec));
        let remote = repository
            .remote_target
            .as_deref()
            .map_or_else(|| "(none)".dimmed().to_string(), ToString::to_string);
        output::detail(&format!("  Remote:     {} {remote}", repository.remote_name));
        output::detail(&format!("  Baseline:   {baseline_tag}"));
        match user_name {
            Some(user) => output::detail(&format!("  User:       {user}")),
            None => output::warn("No git user.name configured; commits may be refused"),
        }

        if !conflicted_paths.is_empty() {
            output::warn("Unresolved merge conflicts:");
            for path in &conflicted_paths {
                eprintln!("    {}", path.red());
            }
        }
        Ok(())
    })
}
