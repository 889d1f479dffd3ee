//! Error types produced by the ingest crate.
//!
//! Two classes of failure exist here and callers must tell them apart:
//!
//! | Error | Class | Meaning |
//! |-------|-------|---------|
//! | [`MissingField`](IngestError::MissingField) | Validation | Host sent a tree without a required field |
//! | [`WrongEntryType`](IngestError::WrongEntryType) | Validation | A field has the wrong entry kind |
//! | [`InvalidField`](IngestError::InvalidField) | Validation | A field is present but unusable |
//! | [`PayloadTooLarge`](IngestError::PayloadTooLarge) | Validation | Raw body exceeds the configured limit |
//! | [`MalformedPayload`](IngestError::MalformedPayload) | Malformed | Body could not be parsed |
//!
//! Validation failures are the host's fault and are fatal before any handler
//! is looked up. A malformed payload comes from the webhook sender and is
//! reported back as a `hook-malformed` result instead.
//!
//! ```rust
//! use ingest::IngestError;
//!
//! let err = IngestError::MalformedPayload("expected value at line 1 column 1".into());
//! assert!(err.is_malformed());
//! assert_eq!(err.http_status_code(), 422);
//! ```
use thiserror::Error;

/// Errors that can occur while building a [`NormalizedRequest`](crate::NormalizedRequest).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// A required tree field is absent.
    #[error("missing required field `{0}`")]
    MissingField(String),

    /// A tree field exists but holds the wrong entry kind.
    #[error("field `{field}` must be a {expected}, got {found}")]
    WrongEntryType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A field is present but empty after sanitizing, unparsable, or
    /// rejected by policy.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// Raw payload exceeds [`IngestConfig::max_payload_bytes`](crate::IngestConfig::max_payload_bytes).
    #[error("payload exceeds size limit: {0}")]
    PayloadTooLarge(String),

    /// The raw payload could not be parsed into a structured value.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl IngestError {
    /// True for failures caused by the webhook body rather than the host.
    pub fn is_malformed(&self) -> bool {
        matches!(self, IngestError::MalformedPayload(_))
    }

    /// All ingest errors are caused by input, never by the server itself.
    pub fn is_client_error(&self) -> bool {
        true
    }

    /// Suggested HTTP status for this error.
    ///
    /// ```rust
    /// use ingest::IngestError;
    ///
    /// assert_eq!(IngestError::PayloadTooLarge("big".into()).http_status_code(), 413);
    /// assert_eq!(IngestError::MissingField("Hook".into()).http_status_code(), 400);
    /// ```
    pub fn http_status_code(&self) -> u16 {
        match self {
            IngestError::PayloadTooLarge(_) => 413,
            IngestError::MalformedPayload(_) => 422,
            _ => 400,
        }
    }
}
