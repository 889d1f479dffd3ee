//! End-to-end runs of the built-in handlers through a [`Dispatcher`].

use std::sync::Arc;

use dispatch::{
    DispatchConfig, DispatchError, Dispatcher, HookResult, HttpFetcher, Passthrough, Services,
};
use handlers::{BuiltinHandlers, HandlerSettings};
use ingest::{normalize, IngestConfig, NormalizedRequest, RawHook};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> HandlerSettings {
    let mut settings = HandlerSettings::default();
    settings
        .org_channels
        .insert("stardustapp".into(), "#stardust".into());
    settings.noise_channel = Some("#stardust-noise".into());
    settings
}

fn dispatcher_with(services: Services) -> Dispatcher<BuiltinHandlers> {
    let config = DispatchConfig {
        pacing_ms: 0,
        ..Default::default()
    };
    Dispatcher::new(BuiltinHandlers::new(Arc::new(settings())), services, config)
}

fn dispatcher() -> Dispatcher<BuiltinHandlers> {
    dispatcher_with(Services::offline())
}

fn hook(
    headers: &[(&str, &str)],
    params: &[(&str, &str)],
    payload: &str,
    payload_type: &str,
) -> NormalizedRequest {
    let pairs = |list: &[(&str, &str)]| -> Vec<(String, String)> {
        list.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    };
    normalize(
        RawHook {
            source_ip: Some("192.0.2.10".into()),
            hook_flavor: "webhook".into(),
            hook_id: "test-hook".into(),
            received_at: "2024-03-13T10:00:00Z".into(),
            headers: pairs(headers),
            parameters: pairs(params),
            payload: payload.into(),
            payload_type: payload_type.into(),
        },
        &IngestConfig::default(),
    )
    .expect("test hook normalizes")
}

fn json_hook(headers: &[(&str, &str)], params: &[(&str, &str)], payload: Value) -> NormalizedRequest {
    hook(headers, params, &payload.to_string(), "application/json")
}

fn lines(result: &HookResult) -> Vec<(&str, &str)> {
    result
        .notifications()
        .iter()
        .map(|n| (n.channel.as_str(), n.message.as_str()))
        .collect()
}

fn rejected_code(result: &HookResult) -> Option<&str> {
    match result {
        HookResult::Rejected { code, .. } => Some(code),
        HookResult::Delivered(_) => None,
    }
}

fn push_payload(commits: Value) -> Value {
    json!({
        "ref": "refs/heads/main",
        "compare": "https://github.com/stardustapp/hookrelay/compare/1111111...abcdef1",
        "commits": commits,
        "pusher": {"name": "danopia"},
        "repository": {
            "name": "hookrelay",
            "html_url": "https://github.com/stardustapp/hookrelay",
            "owner": {"login": "stardustapp"},
        },
        "sender": {"login": "danopia"},
    })
}

fn commit(id: &str, message: &str) -> Value {
    json!({"id": id, "message": message, "committer": {"name": "Dan", "username": "danopia"}})
}

#[tokio::test]
async fn github_single_commit_push_routes_by_owner() {
    let payload = push_payload(json!([commit("abcdef1234567", "Fix the thing")]));
    let hook = json_hook(&[("x-github-event", "push")], &[], payload);

    let result = dispatcher().dispatch("github", &hook).await.unwrap();
    assert_eq!(
        lines(&result),
        vec![(
            "#stardust",
            "[\x0313hookrelay\x0F] \x0315danopia\x0F pushed to \x0306main\x0F: \x0314abcdef1\x0F: \
             Fix the thing\x0F \x0302\x1Fhttps://github.com/stardustapp/hookrelay/compare/1111111...abcdef1\x0F"
        )]
    );
}

#[tokio::test]
async fn github_multi_commit_push_is_capped() {
    let commits: Vec<Value> = (1..=5)
        .map(|i| commit(&format!("{i}{i}{i}{i}{i}{i}{i}0"), &format!("change {i}")))
        .collect();
    let hook = json_hook(&[("X-GitHub-Event", "push")], &[], push_payload(Value::Array(commits)));

    let result = dispatcher().dispatch("github", &hook).await.unwrap();
    let sent = lines(&result);
    assert_eq!(sent.len(), 1 + 3);
    assert!(sent[0].1.contains("pushed \x025\x02 new commits to \x0306main\x0F"));
    assert!(sent[1].1.starts_with(" \x0313hookrelay\x0F/\x0306main\x0F \x03141111111\x0F: change 1"));
    assert!(sent[3].1.contains("change 3"));
}

#[tokio::test]
async fn github_channel_parameter_overrides_routing() {
    let payload = push_payload(json!([commit("abcdef1234567", "Fix")]));
    let hook = json_hook(&[("X-GitHub-Event", "push")], &[("channel", "#elsewhere")], payload);

    let result = dispatcher().dispatch("github", &hook).await.unwrap();
    assert_eq!(result.notifications()[0].channel, "#elsewhere");
}

#[tokio::test]
async fn github_unknown_event_also_reaches_noise_channel() {
    let hook = json_hook(
        &[("X-GitHub-Event", "sponsorship")],
        &[],
        json!({"repository": {"name": "hookrelay", "owner": {"login": "stardustapp"}}}),
    );

    let result = dispatcher().dispatch("github", &hook).await.unwrap();
    assert_eq!(
        lines(&result),
        vec![
            (
                "#stardust",
                "[\x0313hookrelay\x0F] Got Github event of unhandled type: sponsorship"
            ),
            (
                "#stardust-noise",
                "Got Github event for #stardust of unhandled type \"sponsorship\""
            ),
        ]
    );
}

#[tokio::test]
async fn github_without_event_header_is_unrecognizable() {
    let hook = json_hook(&[], &[], push_payload(json!([])));
    let result = dispatcher().dispatch("github", &hook).await.unwrap();
    assert_eq!(rejected_code(&result), Some("hook-unrecognizable"));
    assert!(result.notifications().is_empty());
}

#[tokio::test]
async fn github_invalid_branch_pattern_is_malformed() {
    let payload = push_payload(json!([commit("abcdef1234567", "Fix")]));
    let hook = json_hook(&[("X-GitHub-Event", "push")], &[("branch_filter", "[")], payload);
    let result = dispatcher().dispatch("github", &hook).await.unwrap();
    assert_eq!(rejected_code(&result), Some("hook-malformed"));
}

#[tokio::test]
async fn github_unrouted_hook_delivers_nothing() {
    let mut payload = push_payload(json!([commit("abcdef1234567", "Fix")]));
    payload["repository"]["owner"]["login"] = json!("someone-else");
    let hook = json_hook(&[("X-GitHub-Event", "push")], &[], payload);

    let result = dispatcher().dispatch("github", &hook).await.unwrap();
    assert!(result.is_delivered());
    assert!(result.notifications().is_empty());
}

#[tokio::test]
async fn github_actions_check_suite_resolves_workflow_run() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/repos/stardustapp/hookrelay/check-suites/1/check-runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "check_runs": [{"html_url": format!("{base}/stardustapp/hookrelay/runs/9")}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stardustapp/hookrelay/runs/9"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a href="/stardustapp/hookrelay/actions/runs/42">run</a>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/stardustapp/hookrelay/actions/runs/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conclusion": "failure",
            "event": "push",
            "workflow_url": format!("{base}/repos/stardustapp/hookrelay/actions/workflows/7"),
            "html_url": "https://github.com/stardustapp/hookrelay/actions/runs/42",
            "run_number": 12,
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/stardustapp/hookrelay/actions/workflows/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "CI"})))
        .mount(&server)
        .await;

    let services = Services {
        shortener: Arc::new(Passthrough),
        fetcher: Arc::new(HttpFetcher::new(reqwest::Client::new())),
    };
    let hook = json_hook(
        &[("X-GitHub-Event", "check_suite")],
        &[],
        json!({
            "action": "completed",
            "check_suite": {
                "head_branch": "main",
                "head_sha": "abcdef1234567",
                "status": "completed",
                "conclusion": "failure",
                "url": format!("{base}/repos/stardustapp/hookrelay/check-suites/1"),
                "app": {"slug": "github-actions", "name": "GitHub Actions"},
                "created_at": "2024-03-13T10:00:00Z",
                "updated_at": "2024-03-13T10:02:05Z",
            },
            "repository": {
                "name": "hookrelay",
                "html_url": "https://github.com/stardustapp/hookrelay",
                "private": false,
                "owner": {"login": "stardustapp"},
            },
        }),
    );

    let result = dispatcher_with(services).dispatch("github", &hook).await.unwrap();
    assert_eq!(
        lines(&result),
        vec![(
            "#stardust",
            "[\x0313hookrelay\x0F] \x0314abcdef1\x0F CI #12 \x0304failed\x0F on \x0306main\x0F \
             after 2 min 5 sec \x0302\x1Fhttps://github.com/stardustapp/hookrelay/actions/runs/42\x0F"
        )]
    );
}

#[tokio::test]
async fn travis_form_payload_is_unwrapped() {
    let build = json!({
        "repository": {"name": "hookrelay", "owner_name": "stardustapp"},
        "status_message": "Passed",
        "state": "passed",
        "commit": "0123456789abcdef",
        "number": "88",
        "duration": 125,
        "branch": "main",
        "build_url": "https://travis-ci.org/stardustapp/hookrelay/builds/1",
    });
    let body = format!("payload={}", urlencoding::encode(&build.to_string()));
    let hook = hook(&[], &[], &body, "application/x-www-form-urlencoded");

    let result = dispatcher().dispatch("travisci", &hook).await.unwrap();
    assert_eq!(
        lines(&result),
        vec![(
            "#stardust",
            "[\x0313hookrelay\x0F] \x03140123456\x0F Build #88 \x0303Passed\x0F on \x0306main\x0F \
             in 2.1 minutes: \x0302\x1Fhttps://travis-ci.org/stardustapp/hookrelay/builds/1\x0F"
        )]
    );
}

#[tokio::test]
async fn slackjack_without_text_is_unrecognizable() {
    let hook = json_hook(&[], &[], json!({"channel": "#ops", "username": "ci"}));
    let result = dispatcher().dispatch("slackjack", &hook).await.unwrap();
    assert_eq!(rejected_code(&result), Some("hook-unrecognizable"));
}

#[tokio::test]
async fn grafana_without_state_crashes() {
    let hook = json_hook(
        &[],
        &[("channel", "#ops"), ("instance", "metrics")],
        json!({"ruleName": "disk"}),
    );
    let err = dispatcher().dispatch("grafana", &hook).await.unwrap_err();
    assert!(matches!(err, DispatchError::HandlerCrashed { .. }));
    assert_eq!(err.handler(), "grafana");
}

#[tokio::test]
async fn mailgun_generic_mail_quotes_first_link_line() {
    let body = "recipient=irc-libera-ops%40hooks.test&sender=dan%40example.com\
                &subject=Hello+there&stripped-text=Hi%0Asee+https%3A%2F%2Fx.test%2Fy%0Abye";
    let hook = hook(&[], &[], body, "application/x-www-form-urlencoded");

    let result = dispatcher().dispatch("mailgun", &hook).await.unwrap();
    assert_eq!(
        lines(&result),
        vec![(
            "#ops",
            "[\x0313email\x0F/\x0306dan@example.com\x0F] Hello there \x0315/ see https://x.test/y\x0F"
        )]
    );
}

#[tokio::test]
async fn upcheck_uptimerobot_reads_query_parameters() {
    let hook = hook(
        &[("User-Agent", "Mozilla/5.0+(compatible; UptimeRobot/2.0; http://www.uptimerobot.com/)")],
        &[
            ("channel", "#ops"),
            ("alertTypeFriendlyName", "Down"),
            ("monitorFriendlyName", "Tom&#39;s site"),
            ("monitorURL", "https://tom.test"),
            ("alertDetails", "Connection Timeout"),
        ],
        "",
        "application/x-www-form-urlencoded",
    );

    let result = dispatcher().dispatch("upcheck", &hook).await.unwrap();
    assert_eq!(
        lines(&result),
        vec![(
            "#ops",
            "[\x0307uptimerobot\x0F] \x0313Tom's site\x0F \x0302\x1Fhttps://tom.test\x0F is now \
             \x0305\x02Down\x0F: \x0306Connection Timeout\x0F"
        )]
    );
}

#[tokio::test]
async fn upcheck_unknown_sender_pings_noise_channel() {
    let hook = json_hook(&[("User-Agent", "curl/8.0")], &[("channel", "#ops")], json!({}));
    let result = dispatcher().dispatch("upcheck", &hook).await.unwrap();
    assert_eq!(
        lines(&result),
        vec![
            ("#ops", "[\x0313upcheck\x0F] Got unhandled hook"),
            ("#stardust-noise", "got unprogrammed /upcheck hook for #ops: curl/8.0"),
        ]
    );
}

#[tokio::test]
async fn unknown_handler_id_is_unrecognizable() {
    let hook = json_hook(&[], &[], json!({}));
    let result = dispatcher().dispatch("jenkins", &hook).await.unwrap();
    match result {
        HookResult::Rejected { code, message, .. } => {
            assert_eq!(code, "hook-unrecognizable");
            assert_eq!(message, "Handler jenkins is not available");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}
