//! Configuration types for hook normalization.
//!
//! [`IngestConfig`] controls how the host's tree is turned into a
//! [`NormalizedRequest`](crate::NormalizedRequest): size limits, metadata
//! sanitizing, timestamp policy, and how non-JSON bodies are treated. It is
//! cheap to clone and deserializes from JSON, TOML or YAML.
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig {
//!     max_payload_bytes: Some(5 * 1024 * 1024),
//!     reject_future_timestamps: true,
//!     ..Default::default()
//! };
//! config.validate().expect("valid ingest config");
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime configuration for hook normalization.
///
/// ```json
/// {
///   "version": 1,
///   "strip_control_chars": true,
///   "max_payload_bytes": 5242880,
///   "reject_future_timestamps": false,
///   "max_clock_skew_secs": 300,
///   "decode_form_payloads": true,
///   "empty_payload_as_null": false
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Version of the ingest configuration schema.
    pub version: u32,

    /// Strip control characters from `Hook flavor` and `Source IP`. `Hook ID`
    /// is never rewritten.
    pub strip_control_chars: bool,

    /// Upper bound on the raw payload size in bytes.
    pub max_payload_bytes: Option<usize>,

    /// Reject hooks whose `Received at` lies further in the future than
    /// [`max_clock_skew_secs`](Self::max_clock_skew_secs).
    pub reject_future_timestamps: bool,

    /// Tolerated clock difference between the host and this process.
    pub max_clock_skew_secs: u64,

    /// Decode `application/x-www-form-urlencoded` bodies into a flat JSON
    /// object of strings instead of failing the JSON parse.
    pub decode_form_payloads: bool,

    /// Treat a blank JSON body as `null` instead of a malformed payload.
    /// Opt-in for senders (uptime checkers calling with GET) that deliver
    /// every field through the query string.
    pub empty_payload_as_null: bool,
}

/// Errors returned by [`IngestConfig::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("max_payload_bytes must be greater than zero")]
    ZeroPayloadLimit,

    #[error("unsupported ingest config version {0}")]
    UnsupportedVersion(u32),
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            version: 1,
            strip_control_chars: true,
            max_payload_bytes: None,
            reject_future_timestamps: false,
            max_clock_skew_secs: 300,
            decode_form_payloads: true,
            empty_payload_as_null: false,
        }
    }
}

impl IngestConfig {
    /// Checks the configuration for values that can never accept a hook.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::UnsupportedVersion(self.version));
        }
        if self.max_payload_bytes == Some(0) {
            return Err(ConfigError::ZeroPayloadLimit);
        }
        Ok(())
    }
}
