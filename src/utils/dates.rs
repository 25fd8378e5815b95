// src/utils/dates.rs

//! Timestamp parsing for `date_posted` values.
//!
//! Sources hand out ISO-8601 strings, naive date-times, bare dates or epoch
//! seconds. Everything is brought to `DateTime<Utc>` for comparison.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Epoch values above this are taken as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Parse any supported timestamp form.
pub fn parse_posted_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(epoch) = parse_epoch(s) {
        return from_epoch(epoch);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Convert epoch seconds (or milliseconds) to an RFC 3339 string.
pub fn epoch_to_iso(epoch: i64) -> Option<String> {
    from_epoch(epoch).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Normalize a raw timestamp for storage: epoch values become RFC 3339,
/// anything else is kept as trimmed text.
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    match parse_epoch(s) {
        Some(epoch) => epoch_to_iso(epoch),
        None => Some(s.to_string()),
    }
}

fn parse_epoch(s: &str) -> Option<i64> {
    let numeric = s.chars().all(|c| c.is_ascii_digit() || c == '.');
    if !numeric || !s.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok().map(|v| v as i64)
}

fn from_epoch(epoch: i64) -> Option<DateTime<Utc>> {
    if epoch > EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}
