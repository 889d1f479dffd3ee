//! Error types for the dispatch harness.
//!
//! | Error | Raised by | Meaning |
//! |-------|-----------|---------|
//! | [`DispatchError::HandlerCrashed`] | [`Dispatcher::dispatch`](crate::Dispatcher::dispatch) | handler failed outside the abort primitives |
//! | [`CollaboratorError`] | shortener / fetcher | outbound HTTP call failed |
//!
//! Aborts are not errors and never show up here; they are rendered into a
//! [`HookResult::Rejected`](crate::HookResult::Rejected).
use thiserror::Error;

/// A dispatch that could not produce a result. Operators should be alerted.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("handler `{handler}` crashed: {source:#}")]
    HandlerCrashed {
        handler: String,
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    pub fn handler(&self) -> &str {
        match self {
            DispatchError::HandlerCrashed { handler, .. } => handler,
        }
    }
}

/// Failure of an outbound collaborator call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CollaboratorError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("unusable response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("{0} is disabled")]
    Disabled(&'static str),
}
