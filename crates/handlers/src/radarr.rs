//! Radarr movie download notifications.
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::filesize::filesize;
use crate::irc::{self, paint, Color, RESET, UNDERLINE};
use crate::routing::{self, loose};
use crate::settings::HandlerSettings;
use crate::timefmt::{parse_timestamp, release_freshness};
use dispatch::{HookContext, HookFailure, HookHandler};
use ingest::NormalizedRequest;

#[derive(Debug, Clone)]
pub struct Radarr {
    settings: Arc<HandlerSettings>,
}

impl Radarr {
    pub fn new(settings: Arc<HandlerSettings>) -> Self {
        Self { settings }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Movie {
    title: String,
    #[serde(default)]
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteMovie {
    #[serde(default)]
    year: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovieFile {
    quality: String,
    #[serde(default)]
    release_group: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Release {
    pub release_title: String,
    pub indexer: String,
    pub size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Event {
    #[serde(default)]
    event_type: String,
    #[serde(default)]
    movie: Option<Movie>,
    #[serde(default)]
    remote_movie: Option<RemoteMovie>,
    #[serde(default)]
    movie_file: Option<MovieFile>,
    #[serde(default)]
    release: Option<Release>,
    #[serde(default)]
    is_upgrade: bool,
}

/// Shared by the media managers: `- group ` when a release group is known.
pub(crate) fn group_field(group: Option<&str>) -> String {
    match group.filter(|group| !group.is_empty()) {
        Some(group) => format!("{} {} ", paint(Color::Grey, "-"), paint(Color::Purple, group)),
        None => String::new(),
    }
}

pub(crate) fn upgrade_tag(is_upgrade: bool) -> String {
    if is_upgrade {
        format!(" ({})", paint(Color::Red, "upgrade!"))
    } else {
        String::new()
    }
}

/// `- 1.5 GB @ indexer: release title`
pub(crate) fn grab_tail(release: &Release) -> String {
    format!(
        "{} {} {} {}: {}",
        paint(Color::Grey, "-"),
        paint(Color::Pink, filesize(release.size)),
        paint(Color::Grey, "@"),
        paint(Color::LightGrey, &release.indexer),
        paint(Color::Blue, &release.release_title)
    )
}

/// Chat line for `event`, or the name of the missing field.
fn describe(event: &Event, tz: Tz, now: DateTime<Utc>) -> Result<String, &'static str> {
    Ok(match event.event_type.as_str() {
        "Download" => {
            let movie = event.movie.as_ref().ok_or("movie")?;
            let file = event.movie_file.as_ref().ok_or("movieFile")?;
            let remote = event.remote_movie.as_ref().ok_or("remoteMovie")?;
            let released = movie
                .release_date
                .as_deref()
                .and_then(parse_timestamp)
                .ok_or("movie.releaseDate")?;
            format!(
                "\u{1F4E5} {UNDERLINE}{}{RESET} {} {}[released {}{}{}] {}{} {}{}",
                movie.title,
                loose(Some(&remote.year)),
                Color::Grey.code(),
                Color::LightGrey.code(),
                release_freshness(released, tz, now),
                Color::Grey.code(),
                group_field(file.release_group.as_deref()),
                paint(Color::Grey, "@"),
                paint(Color::Pink, &file.quality),
                upgrade_tag(event.is_upgrade)
            )
        }
        "Grab" => {
            let movie = event.movie.as_ref().ok_or("movie")?;
            let release = event.release.as_ref().ok_or("release")?;
            format!("\u{1F553} {UNDERLINE}{}{RESET} {}", movie.title, grab_tail(release))
        }
        "Test" => format!("Received Test notification. {}", paint(Color::Green, "It worked!")),
        other => format!("Received unknown eventType {other}"),
    })
}

#[async_trait]
impl HookHandler for Radarr {
    fn name(&self) -> &str {
        "radarr"
    }

    async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<(), HookFailure> {
        let event: Event = routing::read(ctx, hook)?;
        let tz = routing::viewer_tz(ctx, hook, &self.settings)?;
        let Some(channel) = routing::channel(hook, self.settings.fallback_channel.as_deref()) else {
            debug!("no channel for radarr hook");
            return Ok(());
        };

        let line = match describe(&event, tz, Utc::now()) {
            Ok(line) => line,
            Err(field) => {
                let message = format!("Radarr {} event without {field}", event.event_type);
                return Err(ctx.cancel_as_malformed(Some(&message)).into());
            }
        };
        ctx.notify(channel, format!("{}{line}", irc::tag(Color::Orange, "radarr")));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: Value) -> Event {
        serde_json::from_value(value).unwrap()
    }

    fn now() -> DateTime<Utc> {
        parse_timestamp("2024-03-13T10:00:00Z").unwrap()
    }

    #[test]
    fn download_line() {
        let download = event(json!({
            "eventType": "Download",
            "movie": {"title": "Arrival", "releaseDate": "2016-11-11"},
            "remoteMovie": {"year": 2016},
            "movieFile": {"quality": "Bluray-1080p", "releaseGroup": "SPARKS"},
            "isUpgrade": true,
        }));
        assert_eq!(
            describe(&download, chrono_tz::UTC, now()).unwrap(),
            "\u{1F4E5} \x1FArrival\x0F 2016 \x0314[released \x031511/11/16\x0314] \
             \x0314-\x0F \x0306SPARKS\x0F \x0314@\x0F \x0313Bluray-1080p\x0F (\x0304upgrade!\x0F)"
        );
    }

    #[test]
    fn grab_line_and_missing_parts() {
        let grab = event(json!({
            "eventType": "Grab",
            "movie": {"title": "Arrival"},
            "release": {
                "quality": "WEBDL-1080p",
                "releaseTitle": "Arrival.2016.1080p.WEB-DL",
                "indexer": "NZBgeek",
                "size": 4_831_838_208u64,
            },
        }));
        assert_eq!(
            describe(&grab, chrono_tz::UTC, now()).unwrap(),
            "\u{1F553} \x1FArrival\x0F \x0314-\x0F \x03134.5 GB\x0F \x0314@\x0F \
             \x0315NZBgeek\x0F: \x0302Arrival.2016.1080p.WEB-DL\x0F"
        );

        let broken = event(json!({"eventType": "Grab", "movie": {"title": "Arrival"}}));
        assert_eq!(describe(&broken, chrono_tz::UTC, now()), Err("release"));
    }
}
