//! Configuration loading and config file resolution
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `SEEK_CONFIG` environment variable
//! 3. `<user config dir>/seek/config.toml`
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is not fatal: a warning is logged and defaults are
//! used. A file that exists but cannot be parsed is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CONFIG_ENV_VAR: &str = "SEEK_CONFIG";
pub const ENDPOINT_ENV_VAR: &str = "SEEK_ENDPOINT";
pub const SCIENTIFIC_NAMES_ENV_VAR: &str = "SEEK_SCIENTIFIC_NAMES";

pub const DEFAULT_ENDPOINT: &str = "https://api.inaturalist.org/v1/computervision/score_image";
pub const DEFAULT_USER_AGENT: &str = "Seek/0.1.0 (seek-vision)";
pub const DEFAULT_HOLD_MS: u64 = 2500;

/// Native capture shape, selected once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Capture through the module manager; no pre-save permission step
    Ios,
    /// Capture through the camera view; gallery permission requested before save
    Android,
}

impl Default for Platform {
    fn default() -> Self {
        if cfg!(target_os = "ios") {
            Platform::Ios
        } else {
            Platform::Android
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekConfig {
    /// Remote scoring endpoint
    pub endpoint: String,
    pub user_agent: String,
    /// Show scientific names instead of looking up common names
    pub scientific_names: bool,
    /// Locale used for common-name lookups
    pub locale: String,
    pub platform: Platform,
    /// Species hold duration in milliseconds
    pub hold_ms: u64,
    pub request_timeout_secs: u64,
    pub database_path: PathBuf,
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            scientific_names: false,
            locale: "en".to_string(),
            platform: Platform::default(),
            hold_ms: DEFAULT_HOLD_MS,
            request_timeout_secs: 30,
            database_path: default_database_path(),
        }
    }
}

impl SeekConfig {
    /// Resolve, load, and apply environment overrides
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_path) {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using defaults",
                    path.display()
                );
                Self::default()
            }
            None => {
                warn!("No config file location available, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV_VAR) {
            if !endpoint.trim().is_empty() {
                self.endpoint = endpoint;
            }
        }
        if let Ok(value) = std::env::var(SCIENTIFIC_NAMES_ENV_VAR) {
            match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.scientific_names = true,
                "0" | "false" | "no" => self.scientific_names = false,
                other => warn!("Ignoring {}={}", SCIENTIFIC_NAMES_ENV_VAR, other),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config("endpoint must not be empty".to_string()));
        }
        if self.hold_ms == 0 {
            return Err(Error::Config("hold_ms must be greater than zero".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn hold_duration(&self) -> std::time::Duration {
        crate::time::millis_to_duration(self.hold_ms)
    }
}

/// Config file path by priority, `None` if no location can be determined
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    dirs::config_dir().map(|d| d.join("seek").join("config.toml"))
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("seek").join("seek.db"))
        .unwrap_or_else(|| PathBuf::from("./seek_data/seek.db"))
}
