//! Inbound email routed by Mailgun.
//!
//! Mail sent to `irc-<network>-<channel>@<domain>` is announced in
//! `#<channel>`. FedEx tracking updates and AbuseHQ tickets get dedicated
//! formats; everything else is summarized by subject and first link.
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::filesize::filesize;
use crate::irc::{self, bold, paint, Color, RESET};
use crate::pattern::{compiled, Compiled};
use crate::routing::{self, loose};
use dispatch::{HookContext, HookFailure, HookHandler};
use ingest::NormalizedRequest;

static FEDEX_TRACKING: Compiled = Lazy::new(|| Regex::new(r"Tracking number\W+:(\d+)"));
static FEDEX_UPDATE: Compiled = Lazy::new(|| {
    Regex::new(r"Activity/Location\r\n  ([0-9/]+ [0-9:]+ [ap]m)\W+([^\r\n]+)\r\n\W+([^\r\n]+)\r\n")
});
static ABUSE_SUBJECT: Compiled = Lazy::new(|| Regex::new(r"\[([^\]]+)\] Ticket (#[0-9]+: [^:]+)"));
static ABUSE_LINK: Compiled = Lazy::new(|| Regex::new(r"https://[^/]+.abusehq.net/share/.+"));
static URL_LINE: Compiled = Lazy::new(|| Regex::new(r"(?m)^.+://.+$"));

#[derive(Debug, Clone, Default)]
pub struct Mailgun;

#[derive(Debug, Deserialize)]
struct Attachment {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    headers: Vec<(String, String)>,
}

impl Attachment {
    fn describe(&self) -> String {
        let label = if self.filename.is_empty() { &self.name } else { &self.filename };
        let mut text = format!("{}{label}{}", Color::LightGrey.code(), Color::Grey.code());
        let size = self
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<u64>().ok())
            .filter(|size| *size > 0);
        if let Some(size) = size {
            text.push_str(&format!(" ({})", filesize(size)));
        }
        text
    }
}

/// `irc-libera-rust@hooks.example` -> `#rust`
fn channel_for(recipient: &str) -> Option<String> {
    let local = recipient.split('@').next()?;
    let rest = local.strip_prefix("irc-")?;
    let (_network, channel) = rest.split_once('-')?;
    (!channel.is_empty()).then(|| format!("#{channel}"))
}

/// Attachments are any payload values carrying a non-empty `filename`.
fn attachments(mail: &Map<String, Value>) -> Vec<Attachment> {
    mail.values()
        .filter(|value| {
            value
                .get("filename")
                .and_then(Value::as_str)
                .map_or(false, |name| !name.is_empty())
        })
        .filter_map(|value| serde_json::from_value(value.clone()).ok())
        .collect()
}

fn text_field<'a>(mail: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    mail.get(name).and_then(Value::as_str).filter(|text| !text.is_empty())
}

#[async_trait]
impl HookHandler for Mailgun {
    fn name(&self) -> &str {
        "mailgun"
    }

    async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<(), HookFailure> {
        let mail: Map<String, Value> = routing::read(ctx, hook)?;
        let subject = ctx.trim_text(Some(text_field(&mail, "subject").unwrap_or("(No subject)")), 150);
        let body = text_field(&mail, "stripped-text").unwrap_or("(No body)");
        let Some(original_sender) = text_field(&mail, "Sender").or(text_field(&mail, "sender")) else {
            return Err(ctx
                .cancel_as_unrecognizable(Some("No \"Sender\" or \"sender\" field present"))
                .into());
        };

        let Some(channel) = text_field(&mail, "recipient").and_then(channel_for) else {
            debug!(recipient = %loose(mail.get("recipient")), "mail not addressed to a channel");
            return Ok(());
        };

        let envelope_sender = text_field(&mail, "sender").unwrap_or_default();
        if envelope_sender.ends_with("@nds.fedex.com") {
            let tracking = compiled(&FEDEX_TRACKING)?.captures(body);
            let update = compiled(&FEDEX_UPDATE)?.captures(body);
            if let (Some(tracking), Some(update)) = (tracking, update) {
                ctx.notify(
                    channel,
                    format!(
                        "[{}/{}] {} near {} {}",
                        paint(Color::Pink, "fedex"),
                        paint(Color::Purple, &tracking[1]),
                        bold(&update[2]),
                        paint(Color::Purple, &update[3]),
                        paint(Color::LightGrey, format!("(at {})", &update[1]))
                    ),
                );
                return Ok(());
            }
        }

        // Salesforce/AbuseHQ complaints, as sent by DigitalOcean
        let ticket = compiled(&ABUSE_SUBJECT)?.captures(&subject);
        let share = compiled(&ABUSE_LINK)?.find(body);
        if let (Some(ticket), Some(share)) = (ticket, share) {
            ctx.notify(
                channel,
                format!(
                    "[{}/{}] {} {}",
                    paint(Color::Pink, "abuse"),
                    paint(Color::Purple, &ticket[1]),
                    &ticket[2],
                    irc::link(share.as_str())
                ),
            );
            return Ok(());
        }

        let contents = compiled(&URL_LINE)?
            .find(body)
            .map_or(body, |line| line.as_str());

        let files = attachments(&mail);
        let trailer = if files.is_empty() {
            String::new()
        } else {
            let plural = if files.len() > 1 { "s" } else { "" };
            let listed: Vec<String> = files.iter().map(Attachment::describe).collect();
            format!(
                " {}/ {} attachment{plural}: {}",
                Color::Grey.code(),
                bold(files.len()),
                listed.join(", ")
            )
        };

        ctx.notify(
            channel,
            format!(
                "[{}/{}] {} {}/ {}{trailer}{RESET}",
                paint(Color::Pink, "email"),
                paint(Color::Purple, original_sender),
                ctx.trim_text(Some(&subject), 150),
                Color::LightGrey.code(),
                ctx.trim_text(Some(contents), 150)
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recipient_maps_to_channel() {
        assert_eq!(channel_for("irc-freenode-stardust@hooks.test").as_deref(), Some("#stardust"));
        assert_eq!(channel_for("irc-libera-my-channel@hooks.test").as_deref(), Some("#my-channel"));
        assert_eq!(channel_for("irc-libera-@hooks.test"), None);
        assert_eq!(channel_for("postmaster@hooks.test"), None);
    }

    #[test]
    fn attachment_summary_includes_size() {
        let mail = json!({
            "subject": "hi",
            "attachment-1": {
                "filename": "report.pdf",
                "headers": [["Content-Type", "application/pdf"], ["Content-Length", "2048"]],
            },
            "attachment-2": {"filename": "", "name": "ignored"},
            "body-plain": "text",
        });
        let files = attachments(mail.as_object().unwrap());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].describe(), "\x0315report.pdf\x0314 (2 KB)");
    }
}
