//! Diagnostic logging to stderr.

use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the filter, e.g. `SMORES_LOG=smores_git=debug`.
const LOG_ENV: &str = "SMORES_LOG";

const fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity).into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    // Fails only if a subscriber is already set.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
