//! Hook endpoints.
//!
//! ```text
//! POST /api/v1/hooks/process    tree in  -> tree out
//! POST /api/v1/hooks/batch      [tree]   -> { results: [...] } in input order
//! POST /api/v1/hooks/{handler}  raw webhook -> HookResult JSON
//! ```
use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::{self, StreamExt};
use hookrelay::{process_entry, process_hook, Entry, HookResult, RawHook};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

/// Headers that carry a sender-side delivery id, checked in order.
const DELIVERY_ID_HEADERS: [&str; 3] = ["x-github-delivery", "x-request-id", "x-amz-sns-message-id"];

/// Runs one host tree and answers with the result tree.
///
/// Aborted hooks still answer 200: the `Cancel` error entry is the result.
pub async fn process_tree(
    State(state): State<Arc<ServerState>>,
    Json(input): Json<Entry>,
) -> ServerResult<impl IntoResponse> {
    let result = process_entry(&state.dispatcher, &input, &state.ingest).await?;
    Ok(Json(result.to_entry()))
}

/// One batch item: a result tree or the error that prevented one.
#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Entry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchError>,
}

#[derive(Debug, Serialize)]
pub struct BatchError {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub processed: usize,
    pub delivered: usize,
    pub rejected: usize,
    pub failed: usize,
    pub results: Vec<BatchItem>,
}

/// Runs every tree concurrently. One failing item never affects another.
pub async fn process_batch(
    State(state): State<Arc<ServerState>>,
    Json(inputs): Json<Vec<Entry>>,
) -> ServerResult<impl IntoResponse> {
    let concurrency = state.config.batch_concurrency.max(1);

    let mut outcomes: Vec<(usize, Result<HookResult, ServerError>)> =
        stream::iter(inputs.into_iter().enumerate().map(|(index, input)| {
            let state = Arc::clone(&state);
            async move {
                let result = process_entry(&state.dispatcher, &input, &state.ingest)
                    .await
                    .map_err(ServerError::from);
                (index, result)
            }
        }))
        .buffer_unordered(concurrency)
        .collect()
        .await;

    outcomes.sort_by_key(|(index, _)| *index);

    let mut response = BatchResponse {
        processed: outcomes.len(),
        delivered: 0,
        rejected: 0,
        failed: 0,
        results: Vec::with_capacity(outcomes.len()),
    };

    for (index, outcome) in outcomes {
        let item = match outcome {
            Ok(result) => {
                if result.is_delivered() {
                    response.delivered += 1;
                } else {
                    response.rejected += 1;
                }
                BatchItem {
                    index,
                    result: Some(result.to_entry()),
                    error: None,
                }
            }
            Err(err) => {
                response.failed += 1;
                BatchItem {
                    index,
                    result: None,
                    error: Some(BatchError {
                        code: err.error_code(),
                        message: err.to_string(),
                    }),
                }
            }
        };
        response.results.push(item);
    }

    Ok(Json(response))
}

/// Direct webhook receiver: the HTTP request itself is the hook.
///
/// Delivered hooks answer 200, rejected ones 422, both with the
/// [`HookResult`] as JSON.
pub async fn receive_hook(
    State(state): State<Arc<ServerState>>,
    Path(handler): Path<String>,
    Query(parameters): Query<Vec<(String, String)>>,
    request: Request,
) -> ServerResult<impl IntoResponse> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let headers = request.headers().clone();

    let limit = state.config.max_body_size();
    let body = axum::body::to_bytes(request.into_body(), limit)
        .await
        .map_err(|_| ServerError::PayloadTooLarge(state.config.max_body_size_mb))?;
    let payload = String::from_utf8(body.to_vec())
        .map_err(|_| ServerError::BadRequest("webhook body is not UTF-8".to_string()))?;

    let raw = RawHook {
        source_ip: forwarded_for(&headers).or(peer),
        hook_flavor: "webhook".to_string(),
        hook_id: delivery_id(&headers),
        received_at: chrono::Utc::now().to_rfc3339(),
        headers: header_pairs(&headers),
        parameters,
        payload,
        payload_type: headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string(),
    };

    let result = process_hook(&state.dispatcher, &handler, raw, &state.ingest).await?;
    let status = if result.is_delivered() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(result)))
}

/// Header pairs in arrival order; values that are not visible ASCII are
/// dropped.
fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

fn delivery_id(headers: &HeaderMap) -> String {
    DELIVERY_ID_HEADERS
        .iter()
        .find_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}
