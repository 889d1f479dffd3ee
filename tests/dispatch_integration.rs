//! Tree-in, tree-out runs through the umbrella API.

use hookrelay::{
    builtin_dispatcher, process_entry, DispatchConfig, Entry, HandlerSettings, IngestConfig,
    Services,
};
use serde_json::json;

fn dispatcher() -> hookrelay::Dispatcher<hookrelay::BuiltinHandlers> {
    let mut settings = HandlerSettings::default();
    settings.org_channels.insert("stardustapp".into(), "#stardust".into());
    let config = DispatchConfig {
        pacing_ms: 0,
        ..Default::default()
    };
    builtin_dispatcher(settings, Services::offline(), config)
}

fn input(handler: &str, headers: Vec<Entry>, params: Vec<Entry>, payload: &str) -> Entry {
    Entry::folder(
        "input",
        vec![
            Entry::string("Handler", handler),
            Entry::folder(
                "Hook",
                vec![
                    Entry::string("Source IP", "192.0.2.1"),
                    Entry::string("Hook flavor", "webhook"),
                    Entry::string("Hook ID", "delivery-1"),
                    Entry::string("Received at", "2024-03-13T10:00:00Z"),
                    Entry::folder("Headers", headers),
                    Entry::folder("Parameters", params),
                    Entry::string("Payload", payload),
                    Entry::string("Payload type", "application/json"),
                ],
            ),
        ],
    )
}

#[tokio::test]
async fn delivered_result_renders_numbered_messages() {
    let payload = json!({
        "channel": "#ops",
        "username": "deploybot",
        "text": "Deploy finished\nall green",
    });
    let entry = input("slackjack", vec![], vec![], &payload.to_string());

    let result = process_entry(&dispatcher(), &entry, &IngestConfig::default())
        .await
        .expect("slackjack delivers");
    let tree = result.to_entry();

    let messages = tree.child("Messages").expect("messages folder");
    assert_eq!(messages.children().len(), 1);
    let first = messages.child("1").expect("first message");
    assert_eq!(first.child("Channel").and_then(Entry::as_str), Some("#ops"));
    assert_eq!(
        first.child("Message").and_then(Entry::as_str),
        Some("[\x0307deploybot\x0F] Deploy finished - all green")
    );
}

#[tokio::test]
async fn rejected_result_renders_cancel_error() {
    let entry = input("slackjack", vec![], vec![], r##"{"channel":"#ops"}"##);

    let result = process_entry(&dispatcher(), &entry, &IngestConfig::default())
        .await
        .unwrap();
    assert_eq!(
        result.to_entry(),
        Entry::error("Cancel", "hook-unrecognizable", "hookrelay", "Unrecognizable")
    );
}

#[tokio::test]
async fn unknown_handler_names_itself() {
    let entry = input("teamcity", vec![], vec![], "{}");
    let result = process_entry(&dispatcher(), &entry, &IngestConfig::default())
        .await
        .unwrap();
    assert_eq!(
        result.to_entry(),
        Entry::error(
            "Cancel",
            "hook-unrecognizable",
            "hookrelay",
            "Handler teamcity is not available"
        )
    );
}

#[tokio::test]
async fn github_ping_from_tree_input() {
    let payload = json!({
        "zen": "Design for failure.",
        "hook": {"type": "Repository", "events": ["push", "issues"]},
        "repository": {
            "name": "hookrelay",
            "html_url": "https://github.com/stardustapp/hookrelay",
            "owner": {"login": "stardustapp"},
        },
        "sender": {"login": "danopia"},
    });
    let entry = input(
        "github",
        vec![Entry::string("X-GitHub-Event", "ping")],
        vec![],
        &payload.to_string(),
    );

    let result = process_entry(&dispatcher(), &entry, &IngestConfig::default())
        .await
        .unwrap();
    assert!(result.is_delivered());
    let sent = result.notifications();
    assert!(!sent.is_empty());
    assert!(sent.iter().all(|n| n.channel == "#stardust"));
    assert!(sent[0].message.starts_with("[\x0313hookrelay\x0F] "));
}

#[test]
fn tree_input_round_trips_through_json() {
    let entry = input("github", vec![Entry::string("X-GitHub-Event", "ping")], vec![], "{}");
    let wire = serde_json::to_value(&entry).unwrap();
    assert_eq!(wire["Type"], "Folder");
    assert_eq!(wire["Children"][0]["StringValue"], "github");
    let back: Entry = serde_json::from_value(wire).unwrap();
    assert_eq!(back, entry);
}
