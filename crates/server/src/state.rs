use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use dashmap::DashMap;
use hookrelay::{
    builtin_dispatcher, set_hook_metrics, BuiltinHandlers, Dispatcher, HookMetrics, IngestConfig,
    IngestError, Services,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: API key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, Instant)>>,

    /// Built-in handlers plus the shortener and fetcher they share
    pub dispatcher: Arc<Dispatcher<BuiltinHandlers>>,

    /// Ingest policy applied to every incoming hook
    pub ingest: Arc<IngestConfig>,

    /// Renders `/metrics`
    pub metrics: PrometheusHandle,

    pub started_at: Instant,
}

impl ServerState {
    /// Create new server state from the server config and the relay config
    /// it points at.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let relay = config
            .load_relay()
            .map_err(|err| ServerError::Config(err.to_string()))?;
        let services = Services::from_config(&relay.dispatch)
            .map_err(|err| ServerError::Config(err.to_string()))?;
        let dispatcher = builtin_dispatcher(relay.handlers, services, relay.dispatch);
        Self::with_dispatcher(config, dispatcher, relay.ingest)
    }

    /// State around a ready-made dispatcher.
    pub fn with_dispatcher(
        config: ServerConfig,
        dispatcher: Dispatcher<BuiltinHandlers>,
        ingest: IngestConfig,
    ) -> ServerResult<Self> {
        let metrics = prometheus_handle()?;
        if config.metrics_enabled {
            set_hook_metrics(Some(Arc::new(PrometheusHookMetrics)));
        }

        Ok(Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            dispatcher: Arc::new(dispatcher),
            ingest: Arc::new(ingest),
            metrics,
            started_at: Instant::now(),
        })
    }

    /// Check if API key is valid
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        self.config.api_keys.contains(key)
    }

    /// Check rate limit for API key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        // Reset if window has passed
        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// The process-wide Prometheus recorder. `metrics` allows one global
/// recorder, so every state shares it.
fn prometheus_handle() -> ServerResult<PrometheusHandle> {
    static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();
    HANDLE
        .get_or_try_init(|| PrometheusBuilder::new().install_recorder())
        .cloned()
        .map_err(|err| ServerError::Internal(format!("metrics recorder: {err}")))
}

/// Feeds hook outcomes into the `metrics` facade.
struct PrometheusHookMetrics;

impl HookMetrics for PrometheusHookMetrics {
    fn record_ingest(&self, latency: Duration, result: Result<(), &IngestError>) {
        let status = if result.is_ok() { "ok" } else { "rejected" };
        metrics::counter!("hookrelay_ingest_total", "status" => status).increment(1);
        metrics::histogram!("hookrelay_ingest_seconds").record(latency.as_secs_f64());
    }

    fn record_dispatch(&self, handler: &str, latency: Duration, outcome: &str) {
        metrics::counter!("hookrelay_hooks_total", "outcome" => outcome.to_string()).increment(1);
        metrics::histogram!("hookrelay_dispatch_seconds", "handler" => handler.to_string())
            .record(latency.as_secs_f64());
    }
}

/// Server metadata for `/`
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
    pub handlers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(limit: u32) -> ServerState {
        let config = ServerConfig {
            rate_limit_per_minute: limit,
            metrics_enabled: false,
            ..Default::default()
        };
        ServerState::new(config).unwrap()
    }

    #[test]
    fn rate_limit_counts_per_key() {
        let state = state(2);
        assert!(state.check_rate_limit("a"));
        assert!(state.check_rate_limit("a"));
        assert!(!state.check_rate_limit("a"));
        assert!(state.check_rate_limit("b"));
    }

    #[test]
    fn builtin_handlers_are_registered() {
        use hookrelay::HandlerTable;
        let state = state(10);
        let ids = state.dispatcher.table().ids();
        assert!(ids.contains(&"github"));
        assert!(ids.contains(&"upcheck"));
    }
}
