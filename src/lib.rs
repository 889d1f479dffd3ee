//! Workspace umbrella crate for hookrelay.
//!
//! Stitches ingest, dispatch and the built-in handlers together so a host
//! can go from the folder tree it received to the folder tree it returns
//! with one call:
//!
//! ```text
//! Entry ──parse_entry──► RawHook ──normalize──► NormalizedRequest
//!                                                      │
//!                         Dispatcher::dispatch ◄───────┘
//!                                │
//!                 HookResult ──to_entry──► Entry
//! ```
//!
//! A body that fails to parse is the sender's fault and comes back as a
//! `hook-malformed` result, the same as a handler calling
//! `cancel_as_malformed`. Every other ingest failure is the host's fault and
//! is returned as [`HookError::Ingest`].

pub mod config;

pub use crate::config::{ConfigLoadError, HookRelayConfig};
pub use dispatch::{
    Abort, AuxFetcher, Cancelled, CollaboratorError, DispatchConfig, DispatchConfigError,
    DispatchError, Dispatcher, HandlerTable, HookContext, HookFailure, HookHandler, HookResult,
    HttpFetcher, HttpShortener, NoFetch, Notification, Passthrough, Services, ShortenerConfig,
    UrlShortener, RESULT_SOURCE,
};
pub use handlers::{BuiltinHandlers, HandlerId, HandlerSettings, SettingsError, UnknownHandler};
pub use ingest::{
    normalize, parse_entry, Entry, HeaderList, IngestConfig, IngestError, NormalizedRequest,
    ParamList, RawHook,
};

use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Failures that leave the host without a result tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HookError {
    #[error("ingest failure: {0}")]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl HookError {
    /// True when the request, not the relay, is at fault.
    pub fn is_client_error(&self) -> bool {
        match self {
            HookError::Ingest(err) => err.is_client_error(),
            HookError::Dispatch(_) => false,
        }
    }

    /// Suggested HTTP status for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            HookError::Ingest(err) => err.http_status_code(),
            HookError::Dispatch(_) => 500,
        }
    }
}

/// Metrics observer for the two processing stages.
pub trait HookMetrics: Send + Sync {
    fn record_ingest(&self, latency: Duration, result: Result<(), &IngestError>);

    /// `outcome` is [`HookResult::outcome`] or `"crashed"`.
    fn record_dispatch(&self, handler: &str, latency: Duration, outcome: &str);
}

/// Install or clear the global metrics recorder.
pub fn set_hook_metrics(recorder: Option<Arc<dyn HookMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn HookMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn HookMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn HookMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Outcome label recorded for handler crashes.
pub const CRASHED_OUTCOME: &str = "crashed";

/// Builds a dispatcher over the built-in handlers.
pub fn builtin_dispatcher(
    settings: HandlerSettings,
    services: Services,
    config: DispatchConfig,
) -> Dispatcher<BuiltinHandlers> {
    Dispatcher::new(BuiltinHandlers::new(Arc::new(settings)), services, config)
}

fn malformed_result(err: &IngestError) -> HookResult {
    HookResult::Rejected {
        code: Abort::Malformed(String::new()).code().to_string(),
        source: RESULT_SOURCE.to_string(),
        message: err.to_string(),
    }
}

/// Normalizes `raw` and runs the handler registered as `handler_id`.
pub async fn process_hook<T: HandlerTable>(
    dispatcher: &Dispatcher<T>,
    handler_id: &str,
    raw: RawHook,
    cfg: &IngestConfig,
) -> Result<HookResult, HookError> {
    let recorder = metrics_recorder();

    let start = Instant::now();
    let normalized = normalize(raw, cfg);
    if let Some(recorder) = &recorder {
        recorder.record_ingest(start.elapsed(), normalized.as_ref().map(|_| ()));
    }
    let request = match normalized {
        Ok(request) => request,
        Err(err) if err.is_malformed() => return Ok(malformed_result(&err)),
        Err(err) => return Err(err.into()),
    };

    let start = Instant::now();
    let result = dispatcher.dispatch(handler_id, &request).await;
    if let Some(recorder) = &recorder {
        let outcome = match &result {
            Ok(result) => result.outcome(),
            Err(_) => CRASHED_OUTCOME,
        };
        recorder.record_dispatch(handler_id, start.elapsed(), outcome);
    }
    Ok(result?)
}

/// Full host round trip: reads the handler id and hook from `input`.
pub async fn process_entry<T: HandlerTable>(
    dispatcher: &Dispatcher<T>,
    input: &Entry,
    cfg: &IngestConfig,
) -> Result<HookResult, HookError> {
    let (handler_id, raw) = parse_entry(input)?;
    process_hook(dispatcher, &handler_id, raw, cfg).await
}
