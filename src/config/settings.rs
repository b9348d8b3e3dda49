//! Application settings and paths.
//!
//! Settings supply the defaults that command-line flags override. They live
//! in `settings.json` under the XDG config directory, or in a file named by
//! `--config`.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/tcpsweep)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the XDG directories. Nothing is created on disk.
    pub fn locate() -> ConfigResult<Self> {
        let project =
            ProjectDirs::from("com", "tcpsweep", "tcpsweep").ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Maximum probes in flight.
    pub threads: usize,
    /// Connect timeout for local-network targets, in milliseconds.
    pub lan_timeout_ms: u64,
    /// Connect timeout for wide-area targets, in milliseconds.
    pub wan_timeout_ms: u64,
    /// Pause between sweeps, in milliseconds.
    pub loop_delay_ms: u64,
    /// Maximum probes per second, 0 for unlimited.
    pub rate_limit: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            threads: 100,
            lan_timeout_ms: 70,
            wan_timeout_ms: 180,
            loop_delay_ms: 700,
            rate_limit: 0,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, falling back to defaults
    /// when no settings file exists.
    pub fn load() -> ConfigResult<Self> {
        let file = match Paths::locate() {
            Ok(paths) => paths.settings_file(),
            Err(e) => {
                debug!("no config directory ({e}), using built-in settings");
                return Ok(Self::default());
            }
        };

        if !file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        debug!(path = %path.display(), ?settings, "loaded settings");
        Ok(settings)
    }

    pub fn lan_timeout(&self) -> Duration {
        Duration::from_millis(self.lan_timeout_ms)
    }

    pub fn wan_timeout(&self) -> Duration {
        Duration::from_millis(self.wan_timeout_ms)
    }

    pub fn loop_delay(&self) -> Duration {
        Duration::from_millis(self.loop_delay_ms)
    }
}
