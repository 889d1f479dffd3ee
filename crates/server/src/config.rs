use hookrelay::HookRelayConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds. Handlers pace follow-up lines, so this
    /// has to cover the slowest multi-line hook.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Rate limit: requests per minute per API key
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    /// API keys for `/api/v1/*`. Empty disables authentication.
    #[serde(default)]
    pub api_keys: HashSet<String>,

    /// Concurrent hooks per batch request
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    /// YAML relay configuration (routing tables, ingest and dispatch
    /// settings). Built-in defaults when unset.
    #[serde(default)]
    pub relay_config: Option<PathBuf>,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            api_keys: HashSet::new(),
            batch_concurrency: default_batch_concurrency(),
            relay_config: None,
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the `server` file and `HOOKRELAY_SERVER__*`
    /// environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(config::Environment::with_prefix("HOOKRELAY_SERVER").separator("__"));

        let config: ServerConfig = builder.build()?.try_deserialize()?;

        if config.api_keys.is_empty() {
            tracing::warn!("No API keys configured, /api/v1 is open to anyone who can reach it");
        }

        Ok(config)
    }

    /// Reads the relay configuration named by `relay_config`.
    pub fn load_relay(&self) -> anyhow::Result<HookRelayConfig> {
        match &self.relay_config {
            Some(path) => Ok(HookRelayConfig::from_file(path)?),
            None => Ok(HookRelayConfig::default()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    pub fn auth_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    2
}

fn default_rate_limit_per_minute() -> u32 {
    600
}

fn default_batch_concurrency() -> usize {
    8
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.max_body_size(), 2 * 1024 * 1024);
        assert_eq!(cfg.batch_concurrency, 8);
        assert!(!cfg.auth_enabled());
        assert!(cfg.metrics_enabled);
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn missing_relay_config_uses_defaults() {
        let relay = ServerConfig::default().load_relay().unwrap();
        assert_eq!(relay.version, "1.0");
    }

    #[test]
    fn unreadable_relay_config_fails() {
        let cfg = ServerConfig {
            relay_config: Some(PathBuf::from("/nonexistent/hookrelay.yaml")),
            ..Default::default()
        };
        assert!(cfg.load_relay().is_err());
    }
}
