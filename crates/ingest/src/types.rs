//! Core data model for inbound hooks.
//!
//! ```text
//! RawHook (host supplied, unvalidated)
//! ├── source_ip: Option<String>
//! ├── hook_flavor / hook_id: String
//! ├── received_at: String (RFC 3339)
//! ├── headers / parameters: Vec<(String, String)>
//! └── payload / payload_type: String
//!
//!         ↓ normalize()
//!
//! NormalizedRequest (immutable)
//! ├── headers: HeaderList   (case-insensitive lookup)
//! ├── parameters: ParamList (case-sensitive, first match wins)
//! ├── payload: serde_json::Value (parsed from payload_raw)
//! └── payload_raw: String (never re-derived from payload)
//! ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unvalidated hook fields as handed over by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHook {
    pub source_ip: Option<String>,
    pub hook_flavor: String,
    pub hook_id: String,
    /// ISO-8601 / RFC 3339 timestamp string.
    pub received_at: String,
    pub headers: Vec<(String, String)>,
    pub parameters: Vec<(String, String)>,
    pub payload: String,
    pub payload_type: String,
}

/// Ordered header multimap with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderList(Vec<(String, String)>);

impl HeaderList {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// First value whose name matches ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ordered query-string-like multimap. Lookups are case-sensitive and the
/// first entry wins on duplicate keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamList(Vec<(String, String)>);

impl ParamList {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Like [`get`](Self::get) but treats an empty value as absent.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(k, _)| k == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Validated, immutable view of one inbound hook.
///
/// Only [`normalize`](crate::normalize) constructs this type, which keeps
/// `payload` and `payload_raw` consistent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRequest {
    pub(crate) source_ip: Option<String>,
    pub(crate) hook_flavor: String,
    pub(crate) hook_id: String,
    pub(crate) received_at: DateTime<Utc>,
    pub(crate) headers: HeaderList,
    pub(crate) parameters: ParamList,
    pub(crate) payload: Value,
    pub(crate) payload_raw: String,
    pub(crate) payload_type: String,
}

impl NormalizedRequest {
    pub fn source_ip(&self) -> Option<&str> {
        self.source_ip.as_deref()
    }

    pub fn hook_flavor(&self) -> &str {
        &self.hook_flavor
    }

    pub fn hook_id(&self) -> &str {
        &self.hook_id
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub fn parameters(&self) -> &ParamList {
        &self.parameters
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Body exactly as received, for signature verification.
    pub fn payload_raw(&self) -> &str {
        &self.payload_raw
    }

    pub fn payload_type(&self) -> &str {
        &self.payload_type
    }
}
