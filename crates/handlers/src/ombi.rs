//! Ombi media request notifications.
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::irc::{self, bold, paint, Color, RESET, UNDERLINE};
use crate::routing::{self, loose};
use crate::settings::HandlerSettings;
use dispatch::{HookContext, HookFailure, HookHandler};
use ingest::NormalizedRequest;

#[derive(Debug, Clone)]
pub struct Ombi {
    settings: Arc<HandlerSettings>,
}

impl Ombi {
    pub fn new(settings: Arc<HandlerSettings>) -> Self {
        Self { settings }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Notice {
    notification_type: String,
    requested_user: String,
    title: String,
    #[serde(rename = "type")]
    media_type: String,
    year: serde_json::Value,
}

impl Notice {
    /// `someone@example.com` -> `someone`
    fn requester(&self) -> String {
        let user = self.requested_user.split('@').next().unwrap_or_default();
        paint(Color::Pink, user)
    }

    fn movie(&self) -> String {
        format!("\u{1F3A5} {UNDERLINE}{}{RESET} {}", self.title, loose(Some(&self.year)))
    }
}

fn describe(notice: &Notice) -> String {
    let is_movie = notice.media_type == "Movie";
    match notice.notification_type.as_str() {
        "NewRequest" if is_movie => {
            format!("New Request from {}: {}", notice.requester(), notice.movie())
        }
        "RequestApproved" if is_movie => format!(
            "Request from {} is {}: {}",
            notice.requester(),
            bold("Approved"),
            notice.movie()
        ),
        "RequestAvailable" if is_movie => format!(
            "Now Available: {} {} {}",
            notice.movie(),
            paint(Color::Grey, "- requested by"),
            notice.requester()
        ),
        "NewRequest" | "RequestApproved" | "RequestAvailable" => {
            format!("Received unknown media type {}", notice.media_type)
        }
        "Test" => format!("Received Test notification. {}", paint(Color::Green, "It worked!")),
        other => format!("Received unknown notificationType {other}"),
    }
}

#[async_trait]
impl HookHandler for Ombi {
    fn name(&self) -> &str {
        "ombi"
    }

    async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<(), HookFailure> {
        let notice: Notice = routing::read(ctx, hook)?;
        let Some(channel) = routing::channel(hook, self.settings.fallback_channel.as_deref()) else {
            debug!("no channel for ombi hook");
            return Ok(());
        };
        ctx.notify(
            channel,
            format!("{}{}", irc::tag(Color::Orange, "ombi"), describe(&notice)),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notice(value: serde_json::Value) -> Notice {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn movie_request_lifecycle() {
        let base = json!({
            "requestedUser": "dan@example.com",
            "title": "Arrival",
            "type": "Movie",
            "year": "2016",
        });
        let mut new = base.clone();
        new["notificationType"] = json!("NewRequest");
        assert_eq!(
            describe(&notice(new)),
            "New Request from \x0313dan\x0F: \u{1F3A5} \x1FArrival\x0F 2016"
        );

        let mut available = base;
        available["notificationType"] = json!("RequestAvailable");
        assert_eq!(
            describe(&notice(available)),
            "Now Available: \u{1F3A5} \x1FArrival\x0F 2016 \x0314- requested by\x0F \x0313dan\x0F"
        );
    }

    #[test]
    fn unknown_media_type_is_named() {
        let tv = notice(json!({"notificationType": "NewRequest", "type": "TvShow"}));
        assert_eq!(describe(&tv), "Received unknown media type TvShow");
        let odd = notice(json!({"notificationType": "IssueComment"}));
        assert_eq!(describe(&odd), "Received unknown notificationType IssueComment");
    }
}
