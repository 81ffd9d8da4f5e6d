//! Engine settings loaded from `.smores/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Repository and remote naming.
    #[serde(default)]
    pub repository: RepositorySettings,

    /// Commit batching.
    #[serde(default)]
    pub commit: CommitSettings,

    /// Tag creation.
    #[serde(default)]
    pub tag: TagSettings,

    /// Periodic remote synchronization.
    #[serde(default)]
    pub sync: SyncSettings,
}

impl Settings {
    /// Load settings from a TOML file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns error if the file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::ParseError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save settings to a TOML file.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::other(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Repository naming settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySettings {
    /// Name of the remote the engine synchronizes with.
    #[serde(default = "default_remote_name")]
    pub remote_name: String,

    /// Prefix of the baseline tag created when version control starts.
    #[serde(default = "default_baseline_prefix")]
    pub baseline_prefix: String,

    /// git executable to run.
    #[serde(default = "default_git_program")]
    pub git_program: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            remote_name: default_remote_name(),
            baseline_prefix: default_baseline_prefix(),
            git_program: default_git_program(),
        }
    }
}

fn default_remote_name() -> String {
    "origin".into()
}

fn default_baseline_prefix() -> String {
    "start_".into()
}

fn default_git_program() -> String {
    "git".into()
}

/// Commit batching settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSettings {
    /// Quiet period before buffered messages are committed.
    #[serde(default = "default_commit_debounce_ms")]
    pub debounce_ms: u64,

    /// Keep the buffered message when staging or committing fails.
    #[serde(default = "default_true")]
    pub retain_on_failure: bool,
}

impl CommitSettings {
    /// Debounce window as a duration.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_commit_debounce_ms(),
            retain_on_failure: true,
        }
    }
}

const fn default_commit_debounce_ms() -> u64 {
    1000
}

const fn default_true() -> bool {
    true
}

/// Tag creation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSettings {
    /// Window in which repeated issuance collapses into one tag creation.
    #[serde(default = "default_tag_debounce_ms")]
    pub debounce_ms: u64,
}

impl TagSettings {
    /// Debounce window as a duration.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for TagSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_tag_debounce_ms(),
        }
    }
}

const fn default_tag_debounce_ms() -> u64 {
    500
}

/// Periodic synchronization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Delay between the end of one sync attempt and the next.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Double the delay after each consecutive failure.
    #[serde(default)]
    pub backoff_on_failure: bool,

    /// Upper bound for the delay when backing off.
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,
}

impl SyncSettings {
    /// Delay before the next attempt, given the consecutive failure count.
    #[must_use]
    pub fn next_delay(&self, consecutive_failures: u32) -> Duration {
        let base = Duration::from_secs(self.interval_secs);
        if !self.backoff_on_failure || consecutive_failures == 0 {
            return base;
        }
        let factor = 1u32 << consecutive_failures.min(16);
        base.saturating_mul(factor)
            .min(Duration::from_secs(self.max_interval_secs.max(self.interval_secs)))
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            backoff_on_failure: false,
            max_interval_secs: default_max_interval_secs(),
        }
    }
}

const fn default_interval_secs() -> u64 {
    300
}

const fn default_max_interval_secs() -> u64 {
    3600
}
