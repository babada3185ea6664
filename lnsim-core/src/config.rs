use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DATA_DIR: &str = "~/.lnsim";
pub const CONFIG_FILE: &str = "config.json";
pub const DATABASE_FILE: &str = "lnsim.db";

/// Expands a leading `~` to the user's home directory.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Zoom bounds and step for chart viewports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub step: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 5.0,
            step: 0.1,
        }
    }
}

/// Readiness probe timing. The timeout is owned by whoever runs the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub timeout_secs: u64,
    pub interval_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            interval_ms: 500,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub zoom: ZoomConfig,
    pub probe: ProbeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: expand_path(DEFAULT_DATA_DIR),
            zoom: ZoomConfig::default(),
            probe: ProbeConfig::default(),
        }
    }
}

impl Config {
    /// Reads the config file at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;
        config.data_dir = expand_path(&config.data_dir.to_string_lossy());
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let zoom = &self.zoom;
        if zoom.min_scale.is_nan() || zoom.min_scale <= 0.0 || !zoom.max_scale.is_finite() {
            return Err(CoreError::Config(
                "zoom.min_scale must be positive and zoom.max_scale finite".to_string(),
            ));
        }
        if zoom.min_scale > 1.0 || zoom.max_scale < 1.0 {
            return Err(CoreError::Config(format!(
                "zoom range {}..{} must contain 1.0",
                zoom.min_scale, zoom.max_scale
            )));
        }
        if zoom.step.is_nan() || zoom.step <= 0.0 {
            return Err(CoreError::Config("zoom.step must be positive".to_string()));
        }
        if self.probe.interval_ms == 0 {
            return Err(CoreError::Config("probe.interval_ms must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    /// Directory holding per-network node data.
    pub fn networks_dir(&self) -> PathBuf {
        self.data_dir.join("networks")
    }
}
