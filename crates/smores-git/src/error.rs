//! Error types for smores-git.

use std::path::PathBuf;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while invoking the git tool.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The git executable could not be spawned.
    #[error("git executable not found: {0}")]
    GitNotFound(String),

    /// Not inside a git repository.
    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// The tool ran and exited unsuccessfully.
    ///
    /// The output is kept verbatim; callers decide what it means.
    #[error("`{command}` failed: {}", first_line(.stderr, .stdout))]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// IO error while running the tool.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// All text the tool printed for a failed command, stdout first.
    ///
    /// git writes merge results (`CONFLICT ...`) to stdout and fatal
    /// messages to stderr, so both are needed to classify a failure.
    #[must_use]
    pub fn raw_output(&self) -> String {
        match self {
            Self::CommandFailed { stdout, stderr, .. } => [stdout.trim(), stderr.trim()]
                .iter()
                .filter(|s| !s.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join("\n"),
            other => other.to_string(),
        }
    }
}

fn first_line<'a>(stderr: &'a str, stdout: &'a str) -> &'a str {
    stderr
        .lines()
        .chain(stdout.lines())
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
}
