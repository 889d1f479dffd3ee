//! Resolve, run, render.
use std::time::Instant;

use tracing::{error, info, warn, Instrument, Level};

use crate::config::DispatchConfig;
use crate::context::HookContext;
use crate::error::DispatchError;
use crate::handler::{HandlerTable, HookHandler, Unavailable};
use crate::result::HookResult;
use crate::services::Services;
use ingest::NormalizedRequest;

/// Runs hooks against a fixed handler table.
///
/// Shared freely between tasks; every [`dispatch`](Self::dispatch) call gets
/// its own [`HookContext`].
#[derive(Debug)]
pub struct Dispatcher<T> {
    table: T,
    services: Services,
    config: DispatchConfig,
}

impl<T: HandlerTable> Dispatcher<T> {
    pub fn new(table: T, services: Services, config: DispatchConfig) -> Self {
        Self {
            table,
            services,
            config,
        }
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Runs the handler registered as `handler_id` against `hook`.
    ///
    /// Unknown ids are rejected as unrecognizable. Only a handler crash
    /// returns `Err`.
    pub async fn dispatch(
        &self,
        handler_id: &str,
        hook: &NormalizedRequest,
    ) -> Result<HookResult, DispatchError> {
        let span = tracing::span!(
            Level::INFO,
            "hook.dispatch",
            handler = %handler_id,
            hook_id = %hook.hook_id(),
            hook_flavor = %hook.hook_flavor(),
        );
        self.dispatch_inner(handler_id, hook).instrument(span).await
    }

    async fn dispatch_inner(
        &self,
        handler_id: &str,
        hook: &NormalizedRequest,
    ) -> Result<HookResult, DispatchError> {
        let start = Instant::now();
        let fallback = Unavailable { id: handler_id };
        let handler: &dyn HookHandler = match self.table.resolve(handler_id) {
            Some(handler) => handler,
            None => &fallback,
        };

        let mut ctx = HookContext::new(self.services.clone(), self.config.pacing());
        if let Err(source) = ctx.process(handler, hook).await {
            error!(
                error = %format!("{source:#}"),
                elapsed_micros = start.elapsed().as_micros(),
                "dispatch_crash"
            );
            return Err(DispatchError::HandlerCrashed {
                handler: handler_id.to_string(),
                source,
            });
        }

        let result = ctx.into_result();
        let elapsed_micros = start.elapsed().as_micros();
        match &result {
            HookResult::Delivered(list) => {
                info!(notifications = list.len(), elapsed_micros, "dispatch_success");
            }
            HookResult::Rejected { code, message, .. } => {
                warn!(code = %code, reason = %message, elapsed_micros, "dispatch_aborted");
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HookFailure;
    use async_trait::async_trait;
    use ingest::{normalize, IngestConfig, RawHook};

    struct Echo;
    struct Quitter;
    struct Broken;

    #[async_trait]
    impl HookHandler for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<(), HookFailure> {
            for i in 1..=3 {
                ctx.notify(format!("#{}", hook.hook_id()), format!("line {i}"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl HookHandler for Quitter {
        fn name(&self) -> &str {
            "quitter"
        }

        async fn handle(&self, ctx: &mut HookContext, _hook: &NormalizedRequest) -> Result<(), HookFailure> {
            ctx.notify("#x", "never rendered");
            Err(ctx.cancel_as_malformed(Some("bad signature")).into())
        }
    }

    #[async_trait]
    impl HookHandler for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn handle(&self, _ctx: &mut HookContext, _hook: &NormalizedRequest) -> Result<(), HookFailure> {
            Err(HookFailure::crash("boom"))
        }
    }

    struct Table {
        echo: Echo,
        quitter: Quitter,
        broken: Broken,
    }

    impl HandlerTable for Table {
        fn resolve(&self, id: &str) -> Option<&dyn HookHandler> {
            match id {
                "echo" => Some(&self.echo),
                "quitter" => Some(&self.quitter),
                "broken" => Some(&self.broken),
                _ => None,
            }
        }

        fn ids(&self) -> Vec<&str> {
            vec!["echo", "quitter", "broken"]
        }
    }

    fn dispatcher() -> Dispatcher<Table> {
        Dispatcher::new(
            Table {
                echo: Echo,
                quitter: Quitter,
                broken: Broken,
            },
            Services::offline(),
            DispatchConfig {
                pacing_ms: 0,
                ..Default::default()
            },
        )
    }

    fn hook(id: &str) -> NormalizedRequest {
        let raw = RawHook {
            hook_flavor: "test".into(),
            hook_id: id.into(),
            received_at: "2024-01-01T00:00:00Z".into(),
            payload: "{}".into(),
            payload_type: "application/json".into(),
            ..Default::default()
        };
        normalize(raw, &IngestConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn delivered_in_call_order() {
        let result = dispatcher().dispatch("echo", &hook("ops")).await.unwrap();
        let lines: Vec<_> = result.notifications().iter().map(|n| n.message.as_str()).collect();
        assert_eq!(lines, vec!["line 1", "line 2", "line 3"]);
        assert_eq!(result.notifications()[0].channel, "#ops");
    }

    #[tokio::test]
    async fn abort_is_a_result_not_an_error() {
        let result = dispatcher().dispatch("quitter", &hook("a")).await.unwrap();
        assert_eq!(
            result,
            HookResult::Rejected {
                code: "hook-malformed".into(),
                source: "hookrelay".into(),
                message: "bad signature".into(),
            }
        );
    }

    #[tokio::test]
    async fn unknown_handler_names_the_id() {
        let result = dispatcher().dispatch("nope", &hook("a")).await.unwrap();
        match result {
            HookResult::Rejected { code, message, .. } => {
                assert_eq!(code, "hook-unrecognizable");
                assert_eq!(message, "Handler nope is not available");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn crash_propagates() {
        let err = dispatcher().dispatch("broken", &hook("a")).await.unwrap_err();
        assert_eq!(err.handler(), "broken");
        assert!(err.to_string().contains("boom"));
    }
}
