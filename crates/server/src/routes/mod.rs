//! API route handlers
//!
//! - `health`: liveness, readiness and Prometheus metrics
//! - `hooks`: tree-in/tree-out processing, batches and the direct receiver

pub mod health;
pub mod hooks;

use crate::error::{ServerError, ServerResult};
use crate::state::{ServerMetadata, ServerState};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use hookrelay::HandlerTable;
use std::sync::Arc;

/// API version, uptime and the handler ids this server accepts.
pub async fn api_info(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let metadata = ServerMetadata {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        handlers: state
            .dispatcher
            .table()
            .ids()
            .into_iter()
            .map(str::to_string)
            .collect(),
    };
    Ok(Json(serde_json::to_value(metadata)?))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
