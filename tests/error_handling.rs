use async_trait::async_trait;
use hookrelay::{
    process_entry, process_hook, DispatchConfig, DispatchError, Dispatcher, Entry, HandlerTable,
    HookContext, HookError, HookFailure, HookHandler, HookResult, IngestConfig, IngestError,
    NormalizedRequest, RawHook, Services,
};

struct Exploding;
struct HalfDone;

#[async_trait]
impl HookHandler for Exploding {
    fn name(&self) -> &str {
        "exploding"
    }

    async fn handle(&self, ctx: &mut HookContext, _hook: &NormalizedRequest) -> Result<(), HookFailure> {
        ctx.notify("#ops", "about to fail");
        Err(anyhow::anyhow!("database unreachable").into())
    }
}

#[async_trait]
impl HookHandler for HalfDone {
    fn name(&self) -> &str {
        "half-done"
    }

    async fn handle(&self, ctx: &mut HookContext, _hook: &NormalizedRequest) -> Result<(), HookFailure> {
        ctx.notify("#ops", "first line");
        Err(ctx.cancel_as_malformed(Some("missing build number")).into())
    }
}

struct Table {
    exploding: Exploding,
    half_done: HalfDone,
}

impl HandlerTable for Table {
    fn resolve(&self, id: &str) -> Option<&dyn HookHandler> {
        match id {
            "exploding" => Some(&self.exploding),
            "half-done" => Some(&self.half_done),
            _ => None,
        }
    }

    fn ids(&self) -> Vec<&str> {
        vec!["exploding", "half-done"]
    }
}

fn dispatcher() -> Dispatcher<Table> {
    Dispatcher::new(
        Table {
            exploding: Exploding,
            half_done: HalfDone,
        },
        Services::offline(),
        DispatchConfig::default(),
    )
}

fn raw(payload: &str) -> RawHook {
    RawHook {
        hook_flavor: "webhook".into(),
        hook_id: "err-1".into(),
        received_at: "2024-03-13T10:00:00Z".into(),
        payload: payload.into(),
        payload_type: "application/json".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn handler_crash_propagates_with_source() {
    let err = process_hook(&dispatcher(), "exploding", raw("{}"), &IngestConfig::default())
        .await
        .unwrap_err();

    let HookError::Dispatch(DispatchError::HandlerCrashed { handler, source }) = &err else {
        panic!("expected a crash, got {err:?}");
    };
    assert_eq!(handler, "exploding");
    assert_eq!(source.to_string(), "database unreachable");
    assert!(!err.is_client_error());
    assert_eq!(err.http_status_code(), 500);
}

#[tokio::test]
async fn cancel_drops_earlier_notifications() {
    let result = process_hook(&dispatcher(), "half-done", raw("{}"), &IngestConfig::default())
        .await
        .unwrap();
    assert_eq!(
        result,
        HookResult::Rejected {
            code: "hook-malformed".into(),
            source: "hookrelay".into(),
            message: "missing build number".into(),
        }
    );
    assert!(result.notifications().is_empty());
}

#[tokio::test]
async fn unparsable_payload_never_reaches_the_handler() {
    let result = process_hook(&dispatcher(), "exploding", raw("<xml/>"), &IngestConfig::default())
        .await
        .expect("bad bodies are results, not errors");
    assert_eq!(result.outcome(), "hook-malformed");
}

#[tokio::test]
async fn oversized_payload_is_a_host_error() {
    let cfg = IngestConfig {
        max_payload_bytes: Some(8),
        ..Default::default()
    };
    let err = process_hook(&dispatcher(), "half-done", raw(r#"{"a":"long enough"}"#), &cfg)
        .await
        .unwrap_err();
    assert!(matches!(err, HookError::Ingest(IngestError::PayloadTooLarge(_))));
    assert_eq!(err.http_status_code(), 413);
}

#[tokio::test]
async fn tree_without_hook_folder_is_rejected_before_lookup() {
    let entry = Entry::folder("input", vec![Entry::string("Handler", "exploding")]);
    let err = process_entry(&dispatcher(), &entry, &IngestConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HookError::Ingest(IngestError::MissingField(field)) if field == "Hook"));
}

#[tokio::test]
async fn tree_with_mistyped_handler_field() {
    let entry = Entry::folder(
        "input",
        vec![Entry::folder("Handler", vec![]), Entry::folder("Hook", vec![])],
    );
    let err = process_entry(&dispatcher(), &entry, &IngestConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HookError::Ingest(IngestError::WrongEntryType { expected: "String", .. })
    ));
}
