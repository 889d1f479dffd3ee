//! CloudWatch alarms delivered through SNS HTTP subscriptions.
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::irc::{self, paint, Color, BOLD, RESET};
use crate::pattern::{compiled, Compiled};
use crate::routing;
use crate::settings::HandlerSettings;
use dispatch::{HookContext, HookFailure, HookHandler};
use ingest::NormalizedRequest;

static REASON_VALUE: Compiled = Lazy::new(|| Regex::new(r" \[([0-9\-.]+) "));

#[derive(Debug, Clone)]
pub struct CloudWatch {
    settings: Arc<HandlerSettings>,
}

impl CloudWatch {
    pub fn new(settings: Arc<HandlerSettings>) -> Self {
        Self { settings }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope {
    #[serde(rename = "Type", default)]
    kind: String,
    #[serde(default)]
    topic_arn: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "SubscribeURL", default)]
    subscribe_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Trigger {
    metric_name: String,
    #[serde(default)]
    statistic: String,
    #[serde(default)]
    statistic_type: String,
    #[serde(default)]
    period: f64,
    #[serde(default)]
    evaluation_periods: u32,
    threshold: f64,
    comparison_operator: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Alarm {
    alarm_name: String,
    new_state_value: String,
    new_state_reason: String,
    trigger: Trigger,
}

fn comparison_symbol(operator: &str) -> &str {
    match operator {
        "GreaterThanOrEqualToThreshold" => ">=",
        "GreaterThanThreshold" => ">",
        "LessThanOrEqualToThreshold" => "<=",
        "LessThanThreshold" => "<",
        other => other,
    }
}

/// Plain-English summary for single-period statistic alarms, otherwise the
/// raw state reason.
fn describe(alarm: &Alarm, reason_value: &Regex) -> String {
    let trigger = &alarm.trigger;
    if trigger.evaluation_periods != 1 || trigger.statistic_type != "Statistic" {
        return paint(Color::Grey, &alarm.new_state_reason);
    }

    let mut text = format!(
        "The {} of `{}` over {} minutes",
        trigger.statistic.to_lowercase(),
        trigger.metric_name,
        (trigger.period / 60.0).round()
    );
    // the SNS message has no value field, so read it back out of the reason
    let value = reason_value
        .captures(&alarm.new_state_reason)
        .and_then(|caps| caps[1].parse::<f64>().ok());
    if let Some(value) = value {
        text.push_str(&format!(" was `{value}`,"));
    }
    text.push_str(&format!(
        " alarms when `{} {}`",
        comparison_symbol(&trigger.comparison_operator),
        trigger.threshold
    ));
    text
}

#[async_trait]
impl HookHandler for CloudWatch {
    fn name(&self) -> &str {
        "cloudwatch"
    }

    async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<(), HookFailure> {
        let Some(channel) = routing::channel(hook, self.settings.noise_channel.as_deref()) else {
            debug!("no channel routed for cloudwatch hook");
            return Ok(());
        };
        let envelope: Envelope = routing::read(ctx, hook)?;

        match envelope.kind.as_str() {
            "SubscriptionConfirmation" => {
                ctx.notify(
                    channel,
                    format!(
                        "SNS Subscription, confirm here: {}",
                        envelope.subscribe_url.as_deref().unwrap_or_default()
                    ),
                );
                return Ok(());
            }
            "Notification" => {}
            other => {
                ctx.notify(
                    channel,
                    format!(
                        "Received SNS '{other}' from {}. \"{}\"",
                        envelope.topic_arn.as_deref().unwrap_or_default(),
                        envelope.subject.as_deref().unwrap_or_default()
                    ),
                );
                return Ok(());
            }
        }

        debug!(message = ?envelope.message, "cloudwatch SNS message body");
        let body = envelope.message.as_deref().unwrap_or("{}");
        let alarm: Alarm = match serde_json::from_str(body) {
            Ok(alarm) => alarm,
            Err(err) => {
                let message = format!("SNS message is not a CloudWatch alarm: {err}");
                return Err(ctx.cancel_as_malformed(Some(&message)).into());
            }
        };

        // arn:aws:sns:<region>:<account>:<topic>
        let region = envelope
            .topic_arn
            .as_deref()
            .and_then(|arn| arn.split(':').nth(3))
            .unwrap_or_default();
        let console = format!("https://console.aws.amazon.com/cloudwatch/home?region={region}");
        let alarm_url = format!(
            "{console}#alarm:alarmFilter=ANY;name={}",
            urlencoding::encode(&alarm.alarm_name)
        );

        let state_color = match alarm.new_state_value.as_str() {
            "ALARM" => Color::Red.code(),
            "OK" => Color::Green.code(),
            _ => String::new(),
        };
        let description = describe(&alarm, compiled(&REASON_VALUE)?);
        let short = ctx.shorten_url(&alarm_url).await?;
        ctx.notify(
            channel,
            format!(
                "[{}/{}] {state_color}{BOLD}{}{BOLD}: {}{RESET} - {description} {}",
                paint(Color::Pink, "aws"),
                paint(Color::Purple, region),
                alarm.new_state_value,
                alarm.alarm_name,
                irc::link(&short)
            ),
        );
        Ok(())
    }
}
