//! Slack-compatible incoming webhooks (`channel`, `text`, `username`, `url`).
use async_trait::async_trait;
use serde::Deserialize;

use crate::irc::{self, Color, RESET};
use crate::routing;
use dispatch::{HookContext, HookFailure, HookHandler};
use ingest::NormalizedRequest;

#[derive(Debug, Clone, Default)]
pub struct SlackJack;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Message {
    channel: Option<String>,
    text: Option<String>,
    username: Option<String>,
    url: Option<String>,
}

/// Senders whose first line is a redundant title.
const TITLED_SENDERS: [&str; 2] = ["plexpy", "tautulli"];

fn flatten(text: &str, username: &str) -> String {
    let skip = usize::from(TITLED_SENDERS.contains(&username));
    text.replace('\r', "")
        .split('\n')
        .skip(skip)
        .collect::<Vec<_>>()
        .join(" - ")
}

#[async_trait]
impl HookHandler for SlackJack {
    fn name(&self) -> &str {
        "slackjack"
    }

    async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<(), HookFailure> {
        let message: Message = routing::read(ctx, hook)?;
        let nonempty = |field: &Option<String>| field.clone().filter(|value| !value.is_empty());
        let (Some(channel), Some(text), Some(username)) = (
            nonempty(&message.channel),
            nonempty(&message.text),
            nonempty(&message.username),
        ) else {
            return Err(ctx.cancel_as_unrecognizable(None).into());
        };

        let url_suffix = match message.url.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => {
                let short = ctx.shorten_url(url).await?;
                format!("{RESET} {}", irc::link(&short))
            }
            None => String::new(),
        };

        let body = ctx.trim_text(Some(&flatten(&text, &username)), 140);
        ctx.notify(
            channel,
            format!("{}{body}{url_suffix}", irc::tag(Color::Orange, &username)),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plex_senders_drop_title_line() {
        assert_eq!(flatten("Title\r\nNow playing\nEpisode 3", "tautulli"), "Now playing - Episode 3");
        assert_eq!(flatten("Build\npassed", "ci"), "Build - passed");
    }
}
