//! Dispatch configuration.
//!
//! ```rust
//! use dispatch::DispatchConfig;
//!
//! let cfg: DispatchConfig = serde_json::from_str(r#"{"pacing_ms": 0}"#).unwrap();
//! assert_eq!(cfg.pacing_ms, 0);
//! assert!(cfg.shortener.enabled);
//! cfg.validate().unwrap();
//! ```
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime settings for the dispatcher and the collaborators it hands to
/// handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Delay a handler waits between follow-up lines of one hook, so chat
    /// networks do not flood-kick the relay.
    pub pacing_ms: u64,

    /// Link shortening collaborator.
    pub shortener: ShortenerConfig,

    /// Timeout for auxiliary fetches made by handlers.
    pub fetch_timeout_secs: u64,

    /// `User-Agent` sent on every outbound request.
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortenerConfig {
    /// When false, links are passed through unchanged.
    pub enabled: bool,

    /// Service answering `GET {endpoint}?url=<encoded>` with the short link
    /// as plain text.
    pub endpoint: String,

    pub timeout_secs: u64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DispatchConfigError {
    #[error("shortener endpoint must be an http(s) URL, got `{0}`")]
    InvalidShortenerEndpoint(String),

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pacing_ms: 900,
            shortener: ShortenerConfig::default(),
            fetch_timeout_secs: 10,
            user_agent: concat!("hookrelay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://da.gd/s".to_string(),
            timeout_secs: 5,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<(), DispatchConfigError> {
        if self.fetch_timeout_secs == 0 {
            return Err(DispatchConfigError::ZeroTimeout("fetch_timeout_secs"));
        }
        if self.shortener.enabled {
            let endpoint = &self.shortener.endpoint;
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(DispatchConfigError::InvalidShortenerEndpoint(endpoint.clone()));
            }
            if self.shortener.timeout_secs == 0 {
                return Err(DispatchConfigError::ZeroTimeout("shortener.timeout_secs"));
            }
        }
        Ok(())
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
