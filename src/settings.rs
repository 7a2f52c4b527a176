//! User defaults from `~/.config/stackrun/settings.toml`
//!
//! Every key is optional; command-line flags win over settings, settings win
//! over built-in defaults.
//!
//! ```toml
//! default_region = "us-east-1"
//! timeout_secs = 3600
//! poll_interval_secs = 5
//! jobs = 4
//! tail_events = true
//! config_file = "infra/cfn-cli.yaml"
//! aws_cli = "/usr/local/bin/aws"
//! ```

use crate::paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Region for stacks that set none (after `--region`)
    pub default_region: Option<String>,
    /// Wait timeout per stack
    pub timeout_secs: Option<u64>,
    /// Delay between status polls
    pub poll_interval_secs: Option<u64>,
    /// Stacks processed concurrently
    pub jobs: Option<usize>,
    /// Stream stack events while waiting
    pub tail_events: Option<bool>,
    /// Config file used when `--file` is not given
    pub config_file: Option<String>,
    /// AWS CLI executable
    pub aws_cli: Option<String>,
}

impl Settings {
    /// Path of the settings file
    pub fn path() -> Result<PathBuf> {
        Ok(paths::config_dir()?.join(SETTINGS_FILE))
    }

    /// Load user settings; a missing file means all defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings file at {}", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs.map(Duration::from_secs)
    }

    /// Config file from settings, `~` and variables expanded
    pub fn config_file(&self) -> Option<PathBuf> {
        self.config_file.as_deref().map(paths::expand)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_partial_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "default_region = \"eu-central-1\"\njobs = 4\ntimeout_secs = 900\n")
            .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.default_region.as_deref(), Some("eu-central-1"));
        assert_eq!(settings.jobs, Some(4));
        assert_eq!(settings.timeout(), Some(Duration::from_secs(900)));
        assert_eq!(settings.poll_interval(), None);
        assert_eq!(settings.tail_events, None);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "region = \"us-east-1\"\n").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }
}
