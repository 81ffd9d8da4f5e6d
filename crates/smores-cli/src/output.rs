//! Terminal output formatting utilities.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use smores_core::{Modification, SyncState};

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

/// Set quiet mode globally. Call once at startup.
pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Print a success message (suppressed in quiet mode).
pub fn success(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "✓".green(), msg);
    }
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message (suppressed in quiet mode).
pub fn info(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "→".blue(), msg);
    }
}

/// Print a detail line without prefix (suppressed in quiet mode).
///
/// Use for indented detail lines that accompany info or warn messages.
pub fn detail(msg: &str) {
    if !is_quiet() {
        println!("{msg}");
    }
}

/// Print essential machine-readable output (always prints).
///
/// Use for results that should be available for piping, like tag names.
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// Colored label for a change kind.
#[must_use]
pub fn modification_label(modification: Modification) -> String {
    let text = format!("{modification:<8}");
    match modification {
        Modification::Added => text.green().to_string(),
        Modification::Modified => text.yellow().to_string(),
        Modification::Deleted => text.red().to_string(),
        Modification::Renamed => text.cyan().to_string(),
        Modification::Unknown => text.dimmed().to_string(),
    }
}

/// Remote health indicator.
#[must_use]
pub fn health_indicator(state: &SyncState) -> String {
    if !state.remote_configured {
        "○".dimmed().to_string()
    } else if !state.conflicted_paths.is_empty() {
        "●".red().to_string()
    } else if state.remote_healthy {
        "●".green().to_string()
    } else {
        "●".yellow().to_string()
    }
}

/// Print a horizontal line (suppressed in quiet mode).
pub fn hr() {
    if !is_quiet() {
        println!("{}", "─".repeat(50).dimmed());
    }
}
