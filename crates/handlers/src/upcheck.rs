//! Uptime checkers: Nagios, Freshping, UptimeRobot and Google Cloud alerting.
//!
//! The sender is identified by its user agent. Unknown senders still get a
//! line in the target channel plus a note in the noise channel.
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::irc::{self, loud, paint, Color};
use crate::pattern::{compiled, Compiled};
use crate::routing::{self, loose};
use crate::settings::HandlerSettings;
use dispatch::{HookContext, HookFailure, HookHandler};
use ingest::{NormalizedRequest, ParamList};

static NUMERIC_ENTITY: Compiled = Lazy::new(|| Regex::new(r"&#(\d\d);"));

#[derive(Debug, Clone)]
pub struct Upcheck {
    settings: Arc<HandlerSettings>,
}

impl Upcheck {
    pub fn new(settings: Arc<HandlerSettings>) -> Self {
        Self { settings }
    }
}

fn field(map: &Map<String, Value>, name: &str) -> String {
    loose(map.get(name))
}

fn object<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Map<String, Value>> {
    map.get(name).and_then(Value::as_object)
}

fn nagios(payload: &Map<String, Value>) -> Result<String, HookFailure> {
    let state = payload
        .get("state")
        .and_then(Value::as_str)
        .ok_or_else(|| HookFailure::crash("nagios body had undefined status"))?;
    let status = match state {
        "OK" | "UP" => loud(Color::Green, state),
        "WARNING" => loud(Color::Orange, state),
        "CRITICAL" | "DOWN" => loud(Color::Maroon, state),
        other => {
            warn!(state = other, "nagios sent an unexpected state");
            other.to_string()
        }
    };

    let notification_type = field(payload, "notification_type");
    let host = irc::link(&field(payload, "hostname"));
    let service = field(payload, "service_desc");
    let context = if service.is_empty() {
        format!("{host} {notification_type}: Host")
    } else {
        format!("{} {notification_type}: {host}", paint(Color::Pink, &service))
    };

    Ok(format!(
        "[{}/{}] {context} is now {status}{}",
        paint(Color::Orange, "nagios"),
        paint(Color::Purple, field(payload, "nagios_server")),
        paint(Color::Grey, format!(": {}", field(payload, "output")))
    ))
}

fn freshping(payload: &Map<String, Value>) -> Result<String, HookFailure> {
    let empty = Map::new();
    let event = object(payload, "webhook_event_data").unwrap_or(&empty);
    let state = event
        .get("check_state_name")
        .and_then(Value::as_str)
        .ok_or_else(|| HookFailure::crash("freshping body had undefined status"))?;
    let status = match state {
        "Available" => loud(Color::Green, state),
        "Not Responding" => loud(Color::Maroon, state),
        other => {
            warn!(state = other, "freshping sent an unexpected state");
            other.to_string()
        }
    };

    Ok(format!(
        "[{}/{}] {} {} is now {status} {}",
        paint(Color::Orange, "freshping"),
        paint(Color::Purple, field(payload, "organization_name")),
        paint(Color::Pink, field(event, "check_name")),
        irc::link(&field(event, "request_url")),
        paint(Color::Grey, format!("(took {}ms)", field(event, "response_time")))
    ))
}

/// UptimeRobot escapes some characters as two-digit numeric entities.
fn decode_entities(re: &Regex, text: &str) -> String {
    re.replace_all(text, |caps: &Captures| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

fn uptimerobot(params: &ParamList) -> Result<String, HookFailure> {
    let re = compiled(&NUMERIC_ENTITY)?;
    let alert = params
        .get("alertTypeFriendlyName")
        .ok_or_else(|| HookFailure::crash("uptimerobot body had undefined status"))?;
    let status = match alert {
        "Up" => loud(Color::Green, alert),
        "Down" => loud(Color::Maroon, alert),
        other => {
            warn!(alert = other, "uptimerobot sent an unexpected alert type");
            other.to_string()
        }
    };
    let time = params
        .non_empty("alertFriendlyDuration")
        .map(|duration| format!(" after {duration} of downtime"))
        .unwrap_or_default();

    Ok(format!(
        "[{}] {} {} is now {status}{time}: {}",
        paint(Color::Orange, "uptimerobot"),
        paint(Color::Pink, decode_entities(re, params.get("monitorFriendlyName").unwrap_or_default())),
        irc::link(params.get("monitorURL").unwrap_or_default()),
        paint(Color::Purple, decode_entities(re, params.get("alertDetails").unwrap_or_default()))
    ))
}

fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn google_alert(payload: &Map<String, Value>) -> Result<String, HookFailure> {
    let empty = Map::new();
    let incident = object(payload, "incident").unwrap_or(&empty);
    let state = field(incident, "state");
    let (status, time) = match state.as_str() {
        "closed" => {
            let minutes = (number(incident.get("ended_at")) - number(incident.get("started_at"))) / 60.0;
            let minutes = (minutes * 100.0).round() / 100.0;
            (loud(Color::Green, &state), format!(" after {minutes} minutes"))
        }
        "open" => (loud(Color::Maroon, &state), String::new()),
        other => {
            return Err(HookFailure::crash(format!(
                "Google-Alerts body had unknown state {other}"
            )))
        }
    };

    Ok(format!(
        "[{}] {} incident {status}{time}: {} {}",
        paint(Color::Orange, "gcloud"),
        paint(Color::Pink, field(incident, "policy_name")),
        irc::link(&field(incident, "url")),
        paint(Color::Purple, field(incident, "summary"))
    ))
}

#[async_trait]
impl HookHandler for Upcheck {
    fn name(&self) -> &str {
        "upcheck"
    }

    async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<(), HookFailure> {
        let payload: Map<String, Value> = routing::read(ctx, hook)?;
        let routed = payload
            .get("organization_name")
            .and_then(Value::as_str)
            .and_then(|org| self.settings.upcheck_channels.get(org));
        let Some(channel) = routing::channel(hook, routed.map(String::as_str)) else {
            debug!("no channel routed for upcheck hook");
            return Ok(());
        };

        let headers = hook.headers();
        let user_agent = headers
            .get("User-Agent")
            .or_else(|| headers.get("userAgent"))
            .unwrap_or_default();

        let line = if user_agent.contains("happy.danopia") {
            Some(nagios(&payload)?)
        } else if user_agent.contains("freshping.io") {
            Some(freshping(&payload)?)
        } else if user_agent.contains("uptimerobot.com") {
            Some(uptimerobot(hook.parameters())?)
        } else if user_agent.contains("Google-Alerts") && field(&payload, "version") == "1.2" {
            Some(google_alert(&payload)?)
        } else {
            None
        };

        match line {
            Some(line) => ctx.notify(channel, line),
            None => {
                ctx.notify(
                    channel.as_str(),
                    format!("{}Got unhandled hook", irc::tag(Color::Pink, "upcheck")),
                );
                if let Some(noise) = &self.settings.noise_channel {
                    ctx.notify(
                        noise.as_str(),
                        format!("got unprogrammed /upcheck hook for {channel}: {user_agent}"),
                    );
                }
            }
        }
        Ok(())
    }
}
