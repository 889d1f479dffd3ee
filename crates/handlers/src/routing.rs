//! Channel routing and body decoding shared by every handler.
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::settings::HandlerSettings;
use dispatch::{HookContext, HookFailure};
use ingest::NormalizedRequest;

const FORM_TYPE: &str = "application/x-www-form-urlencoded";

/// The `channel` parameter when present and non-empty, otherwise the routed
/// channel from a settings table.
pub(crate) fn channel(hook: &NormalizedRequest, routed: Option<&str>) -> Option<String> {
    hook.parameters()
        .non_empty("channel")
        .or(routed)
        .map(str::to_string)
}

/// Payload as JSON, with two adjustments: form posts that wrap a JSON
/// document in a single `payload` field are unwrapped, and an empty body
/// reads as an empty object.
pub(crate) fn body(ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<Value, HookFailure> {
    let payload = hook.payload();
    if is_form(hook.payload_type()) {
        if let Some(Value::String(inner)) = payload.get("payload") {
            return match serde_json::from_str(inner) {
                Ok(value) => Ok(value),
                Err(err) => {
                    let message = format!("Form field `payload` is not JSON: {err}");
                    Err(ctx.cancel_as_malformed(Some(&message)).into())
                }
            };
        }
    }
    Ok(match payload {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    })
}

/// [`body`] narrowed to `T`.
pub(crate) fn read<T: DeserializeOwned>(
    ctx: &mut HookContext,
    hook: &NormalizedRequest,
) -> Result<T, HookFailure> {
    let value = body(ctx, hook)?;
    ctx.narrow(&value)
}

/// Zone for rendering dates: the `viewer-timezone` parameter, else the
/// configured default.
pub(crate) fn viewer_tz(
    ctx: &mut HookContext,
    hook: &NormalizedRequest,
    settings: &HandlerSettings,
) -> Result<Tz, HookFailure> {
    match hook.parameters().non_empty("viewer-timezone") {
        Some(name) => match name.parse::<Tz>() {
            Ok(tz) => Ok(tz),
            Err(_) => {
                let message = format!("Unknown viewer-timezone {name}");
                Err(ctx.cancel_as_malformed(Some(&message)).into())
            }
        },
        None => settings
            .viewer_tz()
            .map_err(|err| HookFailure::Crashed(err.into())),
    }
}

/// Renders a loosely typed field: strings bare, numbers and booleans as
/// written, anything missing or null as empty.
pub(crate) fn loose(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn is_form(payload_type: &str) -> bool {
    payload_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(FORM_TYPE))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_fields_render_bare() {
        assert_eq!(loose(Some(&Value::from("14.074"))), "14.074");
        assert_eq!(loose(Some(&Value::from(14.074))), "14.074");
        assert_eq!(loose(Some(&Value::Null)), "");
        assert_eq!(loose(None), "");
    }

    #[test]
    fn form_essence_ignores_parameters_and_case() {
        assert!(is_form("application/x-www-form-urlencoded; charset=utf-8"));
        assert!(is_form("Application/X-WWW-Form-Urlencoded"));
        assert!(!is_form("application/json"));
        assert!(!is_form(""));
    }
}
