//! hookrelay ingest layer
//!
//! This is where a webhook enters hookrelay. The host hands over a folder tree
//! describing one delivery; we pull the fields out of it, validate them, parse
//! the body, and produce an immutable [`NormalizedRequest`] that handlers read.
//!
//! ## What we do here
//!
//! - **Read the tree** - [`parse_entry`] extracts the handler id and a
//!   [`RawHook`] from the host's [`Entry`] input.
//! - **Validate metadata** - required fields must be non-empty once control
//!   characters are stripped; `Hook ID` is checked but kept byte-for-byte;
//!   `Received at` must be RFC 3339.
//! - **Parse the payload** - JSON by default, form bodies decoded when enabled.
//!   A blank JSON body is malformed unless `empty_payload_as_null` is set.
//!   The raw body is kept untouched.
//! - **Log everything** - structured logs via tracing, one line per hook.
//!
//! ## Main entry point
//!
//! Call [`normalize`] with a [`RawHook`] and [`IngestConfig`], get back a
//! [`NormalizedRequest`]. Errors are typed: [`IngestError::is_malformed`]
//! separates bad bodies from bad host input.
//!
//! ## Example
//!
//! ```
//! use ingest::{normalize, IngestConfig, RawHook};
//!
//! let raw = RawHook {
//!     hook_flavor: "github".into(),
//!     hook_id: "delivery-1".into(),
//!     received_at: "2024-05-01T12:00:00Z".into(),
//!     headers: vec![("X-GitHub-Event".into(), "ping".into())],
//!     payload: r#"{"zen":"Keep it logically awesome."}"#.into(),
//!     payload_type: "application/json".into(),
//!     ..Default::default()
//! };
//!
//! let request = normalize(raw, &IngestConfig::default()).unwrap();
//! assert_eq!(request.headers().get("x-github-event"), Some("ping"));
//! assert_eq!(request.payload()["zen"], "Keep it logically awesome.");
//! ```
use std::time::Instant;

use tracing::{info, warn, Level};

mod config;
mod entry;
mod error;
mod metadata;
mod payload;
mod types;

use crate::metadata::normalize_metadata;

pub use crate::config::{ConfigError, IngestConfig};
pub use crate::entry::Entry;
pub use crate::error::IngestError;
pub use crate::payload::parse_payload;
pub use crate::types::{HeaderList, NormalizedRequest, ParamList, RawHook};

/// Extracts the requested handler id and the raw hook fields from the host's
/// tree input.
///
/// Missing or mistyped fields fail here, before any handler is looked up.
pub fn parse_entry(input: &Entry) -> Result<(String, RawHook), IngestError> {
    if !matches!(input, Entry::Folder { .. }) {
        return Err(IngestError::WrongEntryType {
            field: "input".into(),
            expected: "Folder",
            found: input.kind(),
        });
    }

    let handler = required_string(input, "Handler")?;
    let hook = input.folder_child("Hook")?;

    let raw = RawHook {
        source_ip: hook.string_child("Source IP", false)?.map(str::to_string),
        hook_flavor: required_string(hook, "Hook flavor")?,
        hook_id: required_string(hook, "Hook ID")?,
        received_at: required_string(hook, "Received at")?,
        headers: hook.folder_child("Headers")?.to_pairs(),
        parameters: hook.folder_child("Parameters")?.to_pairs(),
        payload: required_string(hook, "Payload")?,
        payload_type: required_string(hook, "Payload type")?,
    };
    Ok((handler, raw))
}

fn required_string(entry: &Entry, name: &str) -> Result<String, IngestError> {
    entry
        .string_child(name, true)?
        .map(str::to_string)
        .ok_or_else(|| IngestError::MissingField(name.to_string()))
}

/// Validates a raw hook and builds the immutable request handlers consume.
pub fn normalize(raw: RawHook, cfg: &IngestConfig) -> Result<NormalizedRequest, IngestError> {
    let start = Instant::now();
    let span = tracing::span!(
        Level::INFO,
        "ingest.normalize",
        hook_id = %raw.hook_id,
        hook_flavor = %raw.hook_flavor,
    );
    let _guard = span.enter();

    match normalize_inner(raw, cfg) {
        Ok(request) => {
            let elapsed_micros = start.elapsed().as_micros();
            info!(
                payload_type = %request.payload_type,
                payload_len = request.payload_raw.len(),
                headers = request.headers.len(),
                parameters = request.parameters.len(),
                elapsed_micros,
                "ingest_success"
            );
            Ok(request)
        }
        Err(err) => {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(
                error = %err,
                malformed = err.is_malformed(),
                elapsed_micros,
                "ingest_failure"
            );
            Err(err)
        }
    }
}

fn normalize_inner(raw: RawHook, cfg: &IngestConfig) -> Result<NormalizedRequest, IngestError> {
    let RawHook {
        source_ip,
        hook_flavor,
        hook_id,
        received_at,
        headers,
        parameters,
        payload,
        payload_type,
    } = raw;

    let meta = normalize_metadata(source_ip, hook_flavor, hook_id, &received_at, cfg)?;
    let parsed = parse_payload(&payload, &payload_type, cfg)?;

    Ok(NormalizedRequest {
        source_ip: meta.source_ip,
        hook_flavor: meta.hook_flavor,
        hook_id: meta.hook_id,
        received_at: meta.received_at,
        headers: HeaderList::new(headers),
        parameters: ParamList::new(parameters),
        payload: parsed,
        payload_raw: payload,
        payload_type,
    })
}
