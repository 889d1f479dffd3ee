//! hookrelay server: HTTP front end for the webhook dispatcher
//!
//! Accepts hooks either as host input trees or as raw webhook requests,
//! runs them through the built-in handlers and answers with the rendered
//! result.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! ## Public Endpoints (No Authentication)
//!
//! - `GET /` - version, uptime and handler ids
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics (`hookrelay_hooks_total{outcome}` and friends)
//!
//! ## Protected Endpoints (API Key Required when keys are configured)
//!
//! - `POST /api/v1/hooks/process` - one host tree in, one result tree out
//! - `POST /api/v1/hooks/batch` - array of host trees, processed concurrently
//! - `POST /api/v1/hooks/{handler}` - raw webhook for the named handler
//!
//! # Configuration
//!
//! `server.{toml,yaml,json}` in the working directory, overridden by
//! `HOOKRELAY_SERVER__*` environment variables (a `.env` file is read
//! first). `relay_config` points at the YAML routing configuration.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
