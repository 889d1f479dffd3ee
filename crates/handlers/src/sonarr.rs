//! Sonarr episode download notifications.
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;

use crate::irc::{self, paint, Color, RESET, UNDERLINE};
use crate::radarr::{grab_tail, group_field, upgrade_tag, Release};
use crate::routing;
use crate::settings::HandlerSettings;
use crate::timefmt::{air_freshness, parse_timestamp};
use dispatch::{HookContext, HookFailure, HookHandler};
use ingest::NormalizedRequest;

/// Lines listing every episode title are cut to this many characters.
const MAX_TITLES_LEN: usize = 170;

#[derive(Debug, Clone)]
pub struct Sonarr {
    settings: Arc<HandlerSettings>,
}

impl Sonarr {
    pub fn new(settings: Arc<HandlerSettings>) -> Self {
        Self { settings }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Episode {
    episode_number: u32,
    season_number: u32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    air_date_utc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpisodeFile {
    quality: String,
    #[serde(default)]
    release_group: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Event {
    #[serde(default)]
    event_type: String,
    #[serde(default)]
    episodes: Vec<Episode>,
    #[serde(default)]
    series: Option<Series>,
    #[serde(default)]
    episode_file: Option<EpisodeFile>,
    #[serde(default)]
    release: Option<Release>,
    #[serde(default)]
    is_upgrade: bool,
}

/// `s03e04`, with the leading zero kept in the outer color and the
/// significant digits in `digits`.
fn pad(num: u32, digits: &str) -> String {
    if num < 10 {
        format!("0{digits}{num}")
    } else {
        format!("{digits}{num}")
    }
}

struct AirDates {
    tz: Tz,
    now: DateTime<Utc>,
}

impl AirDates {
    fn render(&self, episode: &Episode) -> Option<String> {
        let aired = parse_timestamp(episode.air_date_utc.as_deref()?)?;
        Some(air_freshness(aired, self.tz, self.now))
    }
}

/// `s02e04 / s02e05`, or `s02e01..e08` for long contiguous runs in one
/// season. Air dates are attached only when `air` is given.
fn episode_string(episodes: &[Episode], air: Option<&AirDates>) -> String {
    let green = Color::Green.code();
    let light = Color::LightGreen.code();
    let grey = Color::Grey.code();
    let silver = Color::LightGrey.code();

    if let (Some(first), Some(last)) = (episodes.first(), episodes.last()) {
        let one_season = episodes.iter().all(|ep| ep.season_number == first.season_number);
        let contiguous = episodes
            .iter()
            .zip(first.episode_number..)
            .all(|(ep, expected)| ep.episode_number == expected);
        if one_season && episodes.len() > 4 && contiguous {
            let air_tag = match air.map(|air| (air.render(first), air.render(last))) {
                Some((Some(from), Some(to))) => {
                    format!(" {grey}[aired {silver}{from} thru {silver}{to}{grey}]")
                }
                _ => String::new(),
            };
            return format!(
                "{green}s{}{green}e{}{green}..e{}{air_tag}{RESET}",
                pad(first.season_number, &light),
                pad(first.episode_number, &light),
                pad(last.episode_number, &light)
            );
        }
    }

    episodes
        .iter()
        .map(|ep| {
            let air_tag = air
                .filter(|_| episodes.len() <= 4)
                .and_then(|air| air.render(ep))
                .map(|when| format!(" {grey}[aired {silver}{when}{grey}]"))
                .unwrap_or_default();
            format!(
                "{green}s{}{green}e{}{air_tag}{RESET}",
                pad(ep.season_number, &light),
                pad(ep.episode_number, &light)
            )
        })
        .collect::<Vec<_>>()
        .join(&format!(" {} ", paint(Color::Grey, "/")))
}

fn describe(event: &Event, tz: Tz, now: DateTime<Utc>) -> Result<String, &'static str> {
    let needs_episodes = matches!(event.event_type.as_str(), "Download" | "Grab");
    if needs_episodes && event.episodes.is_empty() {
        return Err("episodes");
    }
    Ok(match event.event_type.as_str() {
        "Download" => {
            let series = event.series.as_ref().ok_or("series")?;
            let file = event.episode_file.as_ref().ok_or("episodeFile")?;
            let names: String = event
                .episodes
                .iter()
                .map(|ep| paint(Color::LightGrey, &ep.title))
                .collect::<Vec<_>>()
                .join(&format!(" {} ", paint(Color::Grey, "/")))
                .chars()
                .take(MAX_TITLES_LEN)
                .collect();
            let air = AirDates { tz, now };
            format!(
                "\u{1F4E5} {UNDERLINE}{}{RESET} {} {}{} {}{}: {names}",
                series.title,
                episode_string(&event.episodes, Some(&air)),
                group_field(file.release_group.as_deref()),
                paint(Color::Grey, "@"),
                paint(Color::Pink, &file.quality),
                upgrade_tag(event.is_upgrade)
            )
        }
        "Grab" => {
            let series = event.series.as_ref().ok_or("series")?;
            let release = event.release.as_ref().ok_or("release")?;
            format!(
                "\u{1F553} {UNDERLINE}{}{RESET} {} {}",
                series.title,
                episode_string(&event.episodes, None),
                grab_tail(release)
            )
        }
        "Test" => format!("Received Test notification. {}", paint(Color::Green, "It worked!")),
        other => format!("Received unknown eventType {other}"),
    })
}

#[async_trait]
impl HookHandler for Sonarr {
    fn name(&self) -> &str {
        "sonarr"
    }

    async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<(), HookFailure> {
        let event: Event = routing::read(ctx, hook)?;
        let tz = routing::viewer_tz(ctx, hook, &self.settings)?;
        let Some(channel) = routing::channel(hook, self.settings.fallback_channel.as_deref()) else {
            debug!("no channel for sonarr hook");
            return Ok(());
        };

        let line = match describe(&event, tz, Utc::now()) {
            Ok(line) => line,
            Err(field) => {
                let message = format!("Sonarr {} event without {field}", event.event_type);
                return Err(ctx.cancel_as_malformed(Some(&message)).into());
            }
        };
        ctx.notify(channel, format!("{}{line}", irc::tag(Color::Orange, "sonarr")));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn episodes(value: serde_json::Value) -> Vec<Episode> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn padding_colors_significant_digits() {
        assert_eq!(pad(4, "\x0309"), "0\x03094");
        assert_eq!(pad(12, "\x0309"), "\x030912");
    }

    #[test]
    fn long_contiguous_run_collapses() {
        let run = episodes(json!([
            {"seasonNumber": 2, "episodeNumber": 1},
            {"seasonNumber": 2, "episodeNumber": 2},
            {"seasonNumber": 2, "episodeNumber": 3},
            {"seasonNumber": 2, "episodeNumber": 4},
            {"seasonNumber": 2, "episodeNumber": 5},
        ]));
        assert_eq!(
            episode_string(&run, None),
            "\x0303s0\x03092\x0303e0\x03091\x0303..e0\x03095\x0F"
        );
    }

    #[test]
    fn short_list_is_spelled_out_with_air_dates() {
        let pair = episodes(json!([
            {"seasonNumber": 1, "episodeNumber": 9, "airDateUtc": "2020-01-01T02:00:00Z"},
            {"seasonNumber": 1, "episodeNumber": 10},
        ]));
        let air = AirDates {
            tz: chrono_tz::UTC,
            now: parse_timestamp("2024-03-13T10:00:00Z").unwrap(),
        };
        assert_eq!(
            episode_string(&pair, Some(&air)),
            "\x0303s0\x03091\x0303e0\x03099 \x0314[aired \x03151/1/20 2h\x0314]\x0F \x0314/\x0F \
             \x0303s0\x03091\x0303e\x030910\x0F"
        );
    }

    #[test]
    fn download_without_episodes_is_reported() {
        let event: Event = serde_json::from_value(json!({"eventType": "Download"})).unwrap();
        assert_eq!(describe(&event, chrono_tz::UTC, Utc::now()), Err("episodes"));
    }
}
