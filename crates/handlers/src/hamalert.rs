//! HamAlert spot notifications.
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::irc::{self, paint, Color, RESET};
use crate::routing::{self, loose};
use dispatch::{HookContext, HookFailure, HookHandler};
use ingest::NormalizedRequest;

#[derive(Debug, Clone, Default)]
pub struct HamAlert;

/// Spot fields arrive as strings or numbers depending on the alert source.
fn field(spot: &Map<String, Value>, name: &str) -> String {
    loose(spot.get(name))
}

fn format_spot(spot: &Map<String, Value>) -> String {
    let source = field(spot, "source");
    let mode = field(spot, "mode");
    let mode_detail = field(spot, "modeDetail");
    let snr = field(spot, "snr");
    let comment = field(spot, "comment");

    let service = if source.is_empty() {
        "hamalert".to_string()
    } else {
        format!("hamalert/{source}")
    };
    let mut out = irc::tag(Color::Orange, &service);
    out.push_str(&format!(
        "{} spotted by {} ",
        paint(Color::Purple, field(spot, "fullCallsign")),
        paint(Color::Yellow, field(spot, "spotter"))
    ));

    out.push_str(&Color::Blue.code());
    out.push_str(&mode);
    if !mode_detail.is_empty() && mode_detail != mode {
        out.push_str(&format!(" ({mode_detail})"));
    }
    out.push_str(RESET);

    out.push_str(&format!(
        " ({}{} @ {} MHz",
        Color::Green.code(),
        field(spot, "band"),
        field(spot, "frequency")
    ));
    if !snr.is_empty() {
        out.push_str(&format!(", {snr}dB"));
    }
    out.push_str(RESET);
    out.push(')');

    if !comment.is_empty() {
        out.push_str(&paint(Color::Red, comment));
    }
    out
}

#[async_trait]
impl HookHandler for HamAlert {
    fn name(&self) -> &str {
        "hamalert"
    }

    async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<(), HookFailure> {
        let spot: Map<String, Value> = routing::read(ctx, hook)?;
        let Some(channel) = hook.parameters().non_empty("channel") else {
            debug!("hamalert hook without channel parameter");
            return Ok(());
        };
        ctx.notify(channel, format_spot(&spot));
        Ok(())
    }
}
