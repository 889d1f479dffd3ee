//! Payload parsing.
//!
//! The raw body is kept verbatim on the request; this module only derives the
//! structured [`Value`] from it.
//!
//! ```text
//! payload_raw ──┬── size limit ──► PayloadTooLarge
//!               ├── blank + empty_payload_as_null ──► Value::Null
//!               ├── form content type + decode_form_payloads ──► {key: value}
//!               └── JSON parse ──► Value | MalformedPayload
//! ```
use serde_json::{Map, Value};

use crate::config::IngestConfig;
use crate::error::IngestError;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Parses the raw body according to its declared content type.
///
/// ```rust
/// use ingest::{parse_payload, IngestConfig};
///
/// let cfg = IngestConfig::default();
/// let value = parse_payload(r#"{"state":"ok"}"#, "application/json", &cfg).unwrap();
/// assert_eq!(value["state"], "ok");
///
/// let form = parse_payload("channel=%23ops&text=a+b", "application/x-www-form-urlencoded", &cfg).unwrap();
/// assert_eq!(form["text"], "a b");
/// ```
pub fn parse_payload(raw: &str, payload_type: &str, cfg: &IngestConfig) -> Result<Value, IngestError> {
    if let Some(limit) = cfg.max_payload_bytes {
        if raw.len() > limit {
            return Err(IngestError::PayloadTooLarge(format!(
                "raw payload size {} exceeds limit of {limit}",
                raw.len()
            )));
        }
    }

    if raw.trim().is_empty() && cfg.empty_payload_as_null {
        return Ok(Value::Null);
    }

    if cfg.decode_form_payloads && is_form_type(payload_type) {
        return decode_form(raw);
    }

    serde_json::from_str(raw).map_err(|err| IngestError::MalformedPayload(err.to_string()))
}

fn is_form_type(payload_type: &str) -> bool {
    payload_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
        .unwrap_or(false)
}

/// Flattens a form body into an object of strings; the first occurrence of
/// a key wins.
fn decode_form(raw: &str) -> Result<Value, IngestError> {
    let mut fields = Map::new();
    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key)?;
        if fields.contains_key(&key) {
            continue;
        }
        fields.insert(key, Value::String(decode_component(value)?));
    }
    Ok(Value::Object(fields))
}

fn decode_component(component: &str) -> Result<String, IngestError> {
    let spaced = component.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|err| IngestError::MalformedPayload(format!("form field: {err}")))
}
