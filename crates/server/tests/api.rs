//! Route tests driven through the full router with `oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use hookrelay::{builtin_dispatcher, DispatchConfig, HandlerSettings, IngestConfig, Services};
use serde_json::{json, Value};
use server::{build_router, ServerConfig, ServerState};
use tower::ServiceExt;

fn router_with(config: ServerConfig) -> Router {
    let dispatch = DispatchConfig {
        pacing_ms: 0,
        ..Default::default()
    };
    let dispatcher = builtin_dispatcher(HandlerSettings::default(), Services::offline(), dispatch);
    let state = ServerState::with_dispatcher(config, dispatcher, IngestConfig::default())
        .expect("state builds");
    build_router(Arc::new(state))
}

fn router() -> Router {
    router_with(ServerConfig::default())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("router answers");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn tree(handler: &str, payload: &Value) -> Value {
    json!({
        "Type": "Folder",
        "Name": "input",
        "Children": [
            {"Type": "String", "Name": "Handler", "StringValue": handler},
            {"Type": "Folder", "Name": "Hook", "Children": [
                {"Type": "String", "Name": "Hook flavor", "StringValue": "webhook"},
                {"Type": "String", "Name": "Hook ID", "StringValue": "t-1"},
                {"Type": "String", "Name": "Received at", "StringValue": "2024-03-13T10:00:00Z"},
                {"Type": "Folder", "Name": "Headers", "Children": []},
                {"Type": "Folder", "Name": "Parameters", "Children": []},
                {"Type": "String", "Name": "Payload", "StringValue": payload.to_string()},
                {"Type": "String", "Name": "Payload type", "StringValue": "application/json"},
            ]},
        ],
    })
}

fn slack_payload() -> Value {
    json!({"channel": "#ops", "username": "deploybot", "text": "Deploy finished"})
}

#[tokio::test]
async fn health_is_public() {
    let (status, body) = send(router(), Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn root_lists_handlers() {
    let (status, body) = send(router(), Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let handlers = body["handlers"].as_array().unwrap();
    assert_eq!(handlers.len(), 12);
    assert!(handlers.contains(&json!("github")));
}

#[tokio::test]
async fn process_returns_result_tree() {
    let request = post_json("/api/v1/hooks/process", &tree("slackjack", &slack_payload()));
    let (status, body) = send(router(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Name"], "Result");
    let first = &body["Children"][0]["Children"][0];
    assert_eq!(first["Name"], "1");
    assert_eq!(first["Children"][0]["StringValue"], "#ops");
    assert_eq!(
        first["Children"][1]["StringValue"],
        "[\u{3}07deploybot\u{f}] Deploy finished"
    );
}

#[tokio::test]
async fn process_renders_cancel_for_unknown_handler() {
    let request = post_json("/api/v1/hooks/process", &tree("jenkins", &json!({})));
    let (status, body) = send(router(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Type"], "Error");
    assert_eq!(body["Code"], "hook-unrecognizable");
    assert_eq!(body["Message"], "Handler jenkins is not available");
}

#[tokio::test]
async fn process_rejects_tree_without_hook() {
    let input = json!({
        "Type": "Folder",
        "Name": "input",
        "Children": [{"Type": "String", "Name": "Handler", "StringValue": "github"}],
    });
    let (status, body) = send(router(), post_json("/api/v1/hooks/process", &input)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INGEST_ERROR");
}

#[tokio::test]
async fn batch_keeps_input_order_and_isolates_failures() {
    let broken = json!({"Type": "Folder", "Name": "input", "Children": []});
    let batch = json!([
        tree("slackjack", &slack_payload()),
        broken,
        tree("slackjack", &json!({"channel": "#ops"})),
    ]);
    let (status, body) = send(router(), post_json("/api/v1/hooks/batch", &batch)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 3);
    assert_eq!(body["delivered"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["rejected"], 1);

    let results = body["results"].as_array().unwrap();
    let indices: Vec<_> = results.iter().map(|r| r["index"].as_u64().unwrap()).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(results[0]["result"]["Name"], "Result");
    assert_eq!(results[1]["error"]["code"], "INGEST_ERROR");
    assert_eq!(results[2]["result"]["Code"], "hook-unrecognizable");
}

#[tokio::test]
async fn direct_receiver_builds_hook_from_request() {
    let request = Request::post("/api/v1/hooks/slackjack")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-github-delivery", "abc-123")
        .body(Body::from(slack_payload().to_string()))
        .unwrap();
    let (status, body) = send(router(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "delivered");
    assert_eq!(body["detail"][0]["channel"], "#ops");
}

#[tokio::test]
async fn direct_receiver_passes_query_parameters() {
    let request = Request::post("/api/v1/hooks/grafana?channel=%23alerts&instance=prod")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"state": "ok", "ruleName": "CPU", "message": "back to normal"}).to_string(),
        ))
        .unwrap();
    let (status, body) = send(router(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detail"][0]["channel"], "#alerts");
}

#[tokio::test]
async fn direct_receiver_reports_rejection() {
    let request = Request::post("/api/v1/hooks/slackjack")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let (status, body) = send(router(), request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["outcome"], "rejected");
    assert_eq!(body["detail"]["code"], "hook-malformed");
}

#[tokio::test]
async fn api_keys_guard_hook_routes() {
    let mut config = ServerConfig::default();
    config.api_keys.insert("secret".to_string());
    let app = router_with(config);
    let payload = tree("slackjack", &slack_payload());

    let (status, body) = send(app.clone(), post_json("/api/v1/hooks/process", &payload)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_FAILED");

    let mut request = post_json("/api/v1/hooks/process", &payload);
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer secret".parse().unwrap());
    let (status, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_applies_per_key() {
    let mut config = ServerConfig::default();
    config.api_keys.insert("secret".to_string());
    config.rate_limit_per_minute = 1;
    let app = router_with(config);

    let request = || {
        let mut request = post_json("/api/v1/hooks/process", &tree("slackjack", &slack_payload()));
        request
            .headers_mut()
            .insert("x-api-key", "secret".parse().unwrap());
        request
    };
    let (first, _) = send(app.clone(), request()).await;
    let (second, body) = send(app, request()).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let request = Request::get("/health")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let response = router().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me");
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let (status, body) = send(router(), Request::get("/nope").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn metrics_count_outcomes() {
    let app = router();
    let request = post_json("/api/v1/hooks/process", &tree("slackjack", &slack_payload()));
    let (status, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("hookrelay_hooks_total"));
}
