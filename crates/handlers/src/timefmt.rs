//! Relative date phrasing for chat lines.
//!
//! Every function takes `now` explicitly; handlers pass `Utc::now()`.
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::irc::BOLD;

/// Accepts RFC 3339, a bare `YYYY-MM-DDTHH:MM:SS` (read as UTC) or a plain
/// date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Calendar phrasing relative to today, in UTC: `Today at 2:30 PM`,
/// `Last Monday at 9:00 AM`, or `03/14/2025` when more than a week away.
pub fn calendar(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (at.date_naive() - now.date_naive()).num_days();
    let time = at.format("%-I:%M %p");
    match days {
        -6..=-2 => format!("Last {} at {time}", at.format("%A")),
        -1 => format!("Yesterday at {time}"),
        0 => format!("Today at {time}"),
        1 => format!("Tomorrow at {time}"),
        2..=6 => format!("{} at {time}", at.format("%A")),
        _ => at.format("%m/%d/%Y").to_string(),
    }
}

/// Release date in the viewer's zone, louder the more recent it is.
pub fn release_freshness(at: DateTime<Utc>, tz: Tz, now: DateTime<Utc>) -> String {
    let full = at.with_timezone(&tz).format("%-m/%-d/%y").to_string();

    let old_cutoff = now.checked_sub_months(Months::new(12)).unwrap_or(now);
    if at < old_cutoff || at > now + Duration::days(1) {
        return full;
    }
    if at < now - Duration::weeks(1) {
        return format!("{full} (~{} months ago)", whole_months_between(at, now));
    }
    format!("{BOLD}this week!{BOLD} ({full})")
}

/// Air date and time in the viewer's zone, louder the more recent it is.
pub fn air_freshness(at: DateTime<Utc>, tz: Tz, now: DateTime<Utc>) -> String {
    let full = at
        .with_timezone(&tz)
        .format("%-m/%-d/%y %-H:%M")
        .to_string()
        .replacen(":00", "h", 1);

    let old_cutoff = now.checked_sub_months(Months::new(1)).unwrap_or(now);
    if at < old_cutoff || at > now + Duration::days(1) {
        return full;
    }
    let ago = now - at;
    if at < now - Duration::days(1) {
        return format!("{full} (~{} days ago)", ago.num_days());
    }
    if at < now - Duration::hours(2) {
        return format!("{BOLD}{} hours ago{BOLD} ({full})", ago.num_hours());
    }
    format!("{BOLD}{} minutes ago!{BOLD} ({full})", ago.num_minutes())
}

fn whole_months_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> u32 {
    let mut months = (later.year() - earlier.year()) * 12 + later.month() as i32
        - earlier.month() as i32;
    if months > 0 {
        let landed = earlier.checked_add_months(Months::new(months as u32));
        if landed.map_or(false, |ts| ts > later) {
            months -= 1;
        }
    }
    months.max(0) as u32
}
