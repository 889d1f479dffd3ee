//! YAML configuration file support.
//!
//! One file carries the settings of every layer: ingest policy, dispatch
//! collaborators and the routing tables of the built-in handlers.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "irc relay"
//!
//! ingest:
//!   version: 1
//!   max_payload_bytes: 1048576
//!   decode_form_payloads: true
//!
//! dispatch:
//!   pacing_ms: 900
//!   shortener:
//!     enabled: true
//!     endpoint: "https://da.gd/s"
//!
//! handlers:
//!   org_channels:
//!     stardustapp: "#stardust"
//!   commit_caps:
//!     "#stardust": 5
//!   noise_channel: "#stardust-noise"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dispatch::{DispatchConfig, DispatchConfigError};
use handlers::{HandlerSettings, SettingsError};
use ingest::{ConfigError, IngestConfig};

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("ingest config: {0}")]
    Ingest(#[from] ConfigError),

    #[error("dispatch config: {0}")]
    Dispatch(#[from] DispatchConfigError),

    #[error("handler settings: {0}")]
    Handlers(#[from] SettingsError),
}

/// Top-level configuration for a relay process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HookRelayConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub handlers: HandlerSettings,
}

impl Default for HookRelayConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            ingest: IngestConfig::default(),
            dispatch: DispatchConfig::default(),
            handlers: HandlerSettings::default(),
        }
    }
}

impl HookRelayConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: HookRelayConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }
        self.ingest.validate()?;
        self.dispatch.validate()?;
        self.handlers.validate()?;
        Ok(())
    }
}
