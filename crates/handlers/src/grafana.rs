//! Grafana legacy alerting webhooks.
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::irc::{loud, paint, Color};
use crate::routing;
use dispatch::{HookContext, HookFailure, HookHandler};
use ingest::NormalizedRequest;

#[derive(Debug, Clone, Default)]
pub struct Grafana;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Alert {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    rule_name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[async_trait]
impl HookHandler for Grafana {
    fn name(&self) -> &str {
        "grafana"
    }

    async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<(), HookFailure> {
        let alert: Alert = routing::read(ctx, hook)?;
        let params = hook.parameters();
        let (Some(channel), Some(instance)) = (params.non_empty("channel"), params.non_empty("instance"))
        else {
            debug!("grafana hook without channel and instance parameters");
            return Ok(());
        };

        let Some(state) = alert.state.as_deref() else {
            return Err(HookFailure::crash("grafana body had undefined state"));
        };
        let status = match state {
            "ok" => loud(Color::Green, state),
            "pending" => loud(Color::Orange, state),
            "alerting" => loud(Color::Maroon, state),
            other => {
                info!(state = other, "unhandled grafana state");
                other.to_string()
            }
        };

        ctx.notify(
            channel,
            format!(
                "[{}/{}] {} is now {status}{}",
                paint(Color::Orange, "grafana"),
                paint(Color::Purple, instance),
                paint(Color::Pink, alert.rule_name.as_deref().unwrap_or_default()),
                paint(Color::Grey, format!(": {}", alert.message.as_deref().unwrap_or_default()))
            ),
        );
        Ok(())
    }
}
