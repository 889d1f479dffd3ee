//! Bugsnag error notifications.
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::irc::{self, paint, Color};
use crate::routing;
use crate::settings::HandlerSettings;
use dispatch::{HookContext, HookFailure, HookHandler};
use ingest::NormalizedRequest;

#[derive(Debug, Clone)]
pub struct Bugsnag {
    settings: Arc<HandlerSettings>,
}

impl Bugsnag {
    pub fn new(settings: Arc<HandlerSettings>) -> Self {
        Self { settings }
    }
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Trigger {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ErrorReport {
    exception_class: String,
    message: String,
    context: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct Notice {
    #[serde(default)]
    account: Option<Named>,
    project: Named,
    trigger: Trigger,
    #[serde(default)]
    error: Option<ErrorReport>,
}

#[async_trait]
impl HookHandler for Bugsnag {
    fn name(&self) -> &str {
        "bugsnag"
    }

    async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<(), HookFailure> {
        let notice: Notice = routing::read(ctx, hook)?;

        let routed = notice
            .account
            .as_ref()
            .and_then(|account| self.settings.account_channels.get(&account.name));
        let Some(channel) = routing::channel(hook, routed.map(String::as_str)) else {
            debug!(project = %notice.project.name, "no channel routed for bugsnag hook");
            return Ok(());
        };

        let context = format!(
            "[{}/{}] ",
            paint(Color::Pink, "bugsnag"),
            paint(Color::Purple, &notice.project.name)
        );
        let line = match (notice.trigger.kind.as_str(), &notice.error) {
            ("firstException", Some(error)) => {
                // com.example.NullPointerException -> NullPointerException
                let class = error.exception_class.rsplit('.').next().unwrap_or_default();
                let short = ctx.shorten_url(&error.url).await?;
                format!(
                    "{context}{} {}: {class} {} {}",
                    notice.trigger.message,
                    paint(Color::Grey, format!("in {}", error.context)),
                    error.message,
                    irc::link(&short)
                )
            }
            (kind, _) => format!(
                "{context}{}: {}",
                paint(Color::Grey, kind),
                notice.trigger.message
            ),
        };
        ctx.notify(channel, line);
        Ok(())
    }
}
