//! smores CLI - version control for requirements documents.

use clap::Parser;

mod commands;
mod document;
mod frontend;
mod logging;
mod output;

use commands::{Cli, Commands, RemoteCommand};

fn main() {
    let cli = Cli::parse();
    output::set_quiet(cli.quiet);
    logging::init(cli.verbose);

    let project = cli.project.as_path();
    let result = match cli.command {
        Commands::Init { adopt, nested } => commands::init::run(project, adopt, nested),
        Commands::Status { json } => commands::status::run(project, json),
        Commands::Commit { message } => commands::commit::run(project, &message),
        Commands::Sync => commands::sync::run(project),
        Commands::Issue { document, detail } => commands::issue::run(project, &document, &detail),
        Commands::Tag {
            document,
            no_verify,
        } => commands::tag::run(project, &document, !no_verify),
        Commands::Diff { document, json } => commands::diff::run(project, &document, json),
        Commands::Remote { command } => match command {
            RemoteCommand::Set { target } => commands::remote::run(project, Some(&target)),
            RemoteCommand::Clear => commands::remote::run(project, None),
        },
        Commands::Whoami => commands::whoami::run(project),
        Commands::Watch => commands::watch::run(project),
        Commands::Completions { shell } => commands::completions::run(shell),
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
