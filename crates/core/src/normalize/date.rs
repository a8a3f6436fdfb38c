//! Best-effort date parsing for listing pages and API payloads.
//!
//! All functions return epoch milliseconds. Callers decide the fallback for
//! unparseable input (usually "now"), so parsers stay deterministic.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.3fZ",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse the date formats commonly seen on torrent index sites.
///
/// Tries a fixed list of layouts in order, then RFC 3339, then a bare unix
/// timestamp in seconds.
pub fn parse_torrent_date(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis());
        }
    }

    if text.len() >= 9 && text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse::<i64>().ok().and_then(|secs| secs.checked_mul(1000));
    }

    None
}

/// Parse an ISO 8601 timestamp (`2024-06-15T10:30:00Z`, with or without millis).
pub fn parse_iso_date(text: &str) -> Option<i64> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.fZ")
                .ok()
                .map(|ndt| ndt.and_utc().timestamp_millis())
        })
}

/// Parse a compact `YYYYMMDD` date (resolver metadata `upload_date`).
pub fn parse_compact_date(text: &str) -> Option<i64> {
    NaiveDate::parse_from_str(text.trim(), "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Parse relative ages like "3 days ago", "yesterday" or "1 year+".
///
/// A month counts as 31 days and a year as 365, and the unit match is a plain
/// substring test ("2 months" and "2 month" both hit "month"). Anything that is
/// not a relative age falls back to [`parse_torrent_date`].
pub fn parse_relative_age(text: &str, now_ms: i64) -> Option<i64> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    if lower.contains("yesterday") {
        return now_ms.checked_sub(DAY_MS);
    }
    if lower.contains("1 year+") || lower.contains("last year") {
        return now_ms.checked_sub(365 * DAY_MS);
    }
    if lower.contains("last month") {
        return now_ms.checked_sub(31 * DAY_MS);
    }
    if lower == "today" || lower.contains("just now") {
        return Some(now_ms);
    }

    let mut parts = lower.split_whitespace();
    if let (Some(amount), Some(unit)) = (parts.next(), parts.next()) {
        if let Ok(value) = amount.parse::<i64>() {
            // Order matters: "minute" must not be read as "month" and vice versa.
            let unit_ms = if unit.contains("min") {
                Some(MINUTE_MS)
            } else if unit.contains("hour") {
                Some(HOUR_MS)
            } else if unit.contains("day") {
                Some(DAY_MS)
            } else if unit.contains("week") {
                Some(7 * DAY_MS)
            } else if unit.contains("month") || unit.starts_with("mo") {
                Some(31 * DAY_MS)
            } else if unit.contains("year") {
                Some(365 * DAY_MS)
            } else {
                None
            };
            if let Some(unit_ms) = unit_ms {
                // An age too large to represent is not a date.
                return value
                    .checked_mul(unit_ms)
                    .and_then(|age| now_ms.checked_sub(age));
            }
        }
    }

    parse_torrent_date(text)
}
