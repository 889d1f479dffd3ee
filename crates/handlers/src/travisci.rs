//! Travis CI build notifications.
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::irc::{self, paint, Color};
use crate::routing;
use crate::settings::HandlerSettings;
use dispatch::{HookContext, HookFailure, HookHandler};
use ingest::NormalizedRequest;

#[derive(Debug, Clone)]
pub struct TravisCi {
    settings: Arc<HandlerSettings>,
}

impl TravisCi {
    pub fn new(settings: Arc<HandlerSettings>) -> Self {
        Self { settings }
    }
}

#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    owner_name: String,
}

#[derive(Debug, Deserialize)]
struct Build {
    #[serde(default)]
    repository: Option<Repository>,
    #[serde(default)]
    status_message: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    result_message: Option<String>,
    commit: String,
    number: serde_json::Value,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    branch: Option<String>,
    build_url: String,
}

#[async_trait]
impl HookHandler for TravisCi {
    fn name(&self) -> &str {
        "travisci"
    }

    async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<(), HookFailure> {
        let build: Build = routing::read(ctx, hook)?;

        let routed = build
            .repository
            .as_ref()
            .and_then(|repo| self.settings.org_channels.get(&repo.owner_name));
        let Some(channel) = routing::channel(hook, routed.map(String::as_str)) else {
            debug!("no channel routed for travis hook");
            return Ok(());
        };

        debug!(
            state = ?build.state,
            status_message = ?build.status_message,
            result_message = ?build.result_message,
            "travis build"
        );
        let status = build.status_message.as_deref().unwrap_or_default();
        let state = build.state.as_deref().unwrap_or_default();
        let text = match state {
            "passed" | "fixed" => paint(Color::Green, status),
            "failed" | "broken" | "errored" => paint(Color::Maroon, status),
            "started" => paint(Color::Orange, status),
            other => {
                warn!(state = other, "travis build in unexpected state");
                status.to_string()
            }
        };

        let time = if state == "started" {
            String::new()
        } else {
            let minutes = (build.duration.unwrap_or(0.0) / 60.0 * 10.0).round() / 10.0;
            format!(" in {minutes} minutes")
        };

        let number = match &build.number {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let repo_name = build.repository.as_ref().map_or("undefined", |repo| repo.name.as_str());
        let short = ctx.shorten_url(&build.build_url).await?;
        ctx.notify(
            channel,
            format!(
                "{}{} Build #{number} {text} on {}{time}: {}",
                irc::tag(Color::Pink, repo_name),
                paint(Color::Grey, build.commit.chars().take(7).collect::<String>()),
                paint(Color::Purple, build.branch.as_deref().unwrap_or_default()),
                irc::link(&short)
            ),
        );
        Ok(())
    }
}
