//! Metadata sanitizing and policy enforcement.
//!
//! ```text
//! RawHook metadata
//!        │
//!        ▼
//! ┌─────────────────────────────┐
//! │ 1. Sanitize strings         │
//! │    - strip control chars    │
//! │    - trim whitespace        │
//! ├─────────────────────────────┤
//! │ 2. Required fields          │
//! │    - hook flavor            │
//! │    - hook id (kept verbatim)│
//! ├─────────────────────────────┤
//! │ 3. Timestamp                │
//! │    - RFC 3339 parse         │
//! │    - future-skew policy     │
//! └─────────────────────────────┘
//! ```
use chrono::{DateTime, Duration, Utc};

use crate::config::IngestConfig;
use crate::error::IngestError;

pub(crate) struct NormalizedMetadata {
    pub(crate) source_ip: Option<String>,
    pub(crate) hook_flavor: String,
    pub(crate) hook_id: String,
    pub(crate) received_at: DateTime<Utc>,
}

pub(crate) fn normalize_metadata(
    source_ip: Option<String>,
    hook_flavor: String,
    hook_id: String,
    received_at: &str,
    cfg: &IngestConfig,
) -> Result<NormalizedMetadata, IngestError> {
    let hook_flavor = sanitize_required_field("Hook flavor", hook_flavor, cfg.strip_control_chars)?;
    let hook_id = require_opaque_field("Hook ID", hook_id)?;
    let source_ip = sanitize_optional_string(source_ip, cfg.strip_control_chars);
    let received_at = parse_received_at(received_at, cfg)?;

    Ok(NormalizedMetadata {
        source_ip,
        hook_flavor,
        hook_id,
        received_at,
    })
}

fn parse_received_at(value: &str, cfg: &IngestConfig) -> Result<DateTime<Utc>, IngestError> {
    let parsed = DateTime::parse_from_rfc3339(value.trim())
        .map_err(|err| IngestError::InvalidField(format!("Received at `{value}`: {err}")))?
        .with_timezone(&Utc);

    if cfg.reject_future_timestamps {
        let skew = Duration::seconds(i64::try_from(cfg.max_clock_skew_secs).unwrap_or(i64::MAX));
        if parsed > Utc::now() + skew {
            return Err(IngestError::InvalidField(
                "Received at lies in the future".into(),
            ));
        }
    }
    Ok(parsed)
}

/// Strips control characters (when enabled), trims, and maps empty to `None`.
pub(crate) fn sanitize_optional_string(
    value: Option<String>,
    strip_control: bool,
) -> Option<String> {
    value.and_then(|raw| {
        let filtered = if strip_control {
            raw.chars().filter(|c| !c.is_control()).collect::<String>()
        } else {
            raw
        };
        let trimmed = filtered.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

pub(crate) fn sanitize_required_field(
    field: &str,
    value: String,
    strip_control: bool,
) -> Result<String, IngestError> {
    sanitize_optional_string(Some(value), strip_control)
        .ok_or_else(|| IngestError::InvalidField(format!("{field} empty")))
}

/// Ids are correlation keys: reject blank ones, never rewrite them.
pub(crate) fn require_opaque_field(field: &str, value: String) -> Result<String, IngestError> {
    if value.chars().all(|c| c.is_whitespace() || c.is_control()) {
        return Err(IngestError::InvalidField(format!("{field} empty")));
    }
    Ok(value)
}
