//! Cloud container configuration

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Tunables for a cloud container facade
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// How long a coordination scope acquisition may wait before it is
    /// reported as timed out (milliseconds)
    pub coordination_timeout_ms: u64,

    /// Worker threads for the background I/O runtime
    pub worker_threads: usize,

    /// Directory for staging files used by the data transfer bridge.
    /// Defaults to the system temp directory when unset.
    pub staging_dir: Option<PathBuf>,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            coordination_timeout_ms: 10_000,
            worker_threads: 4,
            staging_dir: None,
        }
    }
}

impl CloudConfig {
    /// Default configuration file path
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("com", "CloudGate", "CloudGate")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }

    /// Load configuration from the default path, falling back to defaults
    pub fn load() -> Self {
        let path = Self::default_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Invalid config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&path, contents)
    }

    pub fn coordination_timeout(&self) -> Duration {
        Duration::from_millis(self.coordination_timeout_ms)
    }
}
