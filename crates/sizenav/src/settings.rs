//! Configuration and settings management

use crate::lister::DEFAULT_PARALLEL_THRESHOLD;
use crate::sizer::SizerKind;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    #[serde(default)]
    pub sizer: SizerKind,
    #[serde(default = "default_du_program")]
    pub du_program: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
    #[serde(default = "default_notice_ms")]
    pub notice_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            sizer: SizerKind::default(),
            du_program: default_du_program(),
            poll_interval_ms: default_poll_interval_ms(),
            parallel_threshold: default_parallel_threshold(),
            notice_ms: default_notice_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Where log files go; the platform data directory when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

fn default_du_program() -> String {
    "du".to_string()
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_parallel_threshold() -> usize {
    DEFAULT_PARALLEL_THRESHOLD
}

fn default_notice_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load settings from a file the user named. Keys it leaves out take
    /// their defaults; a missing file is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            bail!("Settings file {} does not exist", path.display());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;

        Ok(settings)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.browser.poll_interval_ms.max(1))
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.browser.notice_ms)
    }
}

/// Expand a leading `~` in a user supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}
