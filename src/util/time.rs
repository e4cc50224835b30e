//! Time and date parsing utilities.

use crate::error::{BugmailError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc};

/// Parse a flexible time specification into a `DateTime<Utc>`.
///
/// Supports:
/// - RFC3339: `2025-01-15T12:00:00Z`
/// - Simple date: `2025-01-15` (midnight UTC)
/// - Relative duration into the past: `-1h`, `-2d`, `-1w`, `-30m`, or
///   the same without the sign (`7d`)
///
/// # Errors
///
/// Returns a validation error naming `field_name` if the format is not recognized.
pub fn parse_flexible_timestamp(s: &str, field_name: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
            BugmailError::validation(field_name, "invalid date")
        })?;
        return Ok(Utc.from_utc_datetime(&naive));
    }

    let rest = s.strip_prefix('-').unwrap_or(s);
    if let Some(unit_char) = rest.chars().last() {
        let amount_str = &rest[..rest.len() - unit_char.len_utf8()];
        if let Ok(amount) = amount_str.parse::<i64>() {
            let duration = match unit_char {
                'm' => Duration::minutes(amount),
                'h' => Duration::hours(amount),
                'd' => Duration::days(amount),
                'w' => Duration::weeks(amount),
                _ => {
                    return Err(BugmailError::validation(
                        field_name,
                        "invalid unit (use m, h, d, w)",
                    ));
                }
            };
            return Ok(Utc::now() - duration);
        }
    }

    Err(BugmailError::validation(
        field_name,
        "invalid time format (try: -2d, 1w, or 2025-01-15)",
    ))
}

/// Parse a timestamp read back from the database.
///
/// Falls back to `SQLite`'s `CURRENT_TIMESTAMP` format, then to the epoch.
#[must_use]
pub fn parse_stored_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_utc_datetime(&naive);
    }

    DateTime::<Utc>::UNIX_EPOCH
}

/// Current time truncated to the microsecond precision that is persisted.
#[must_use]
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Return a timestamp strictly after `previous`, preferring `now`.
///
/// Guards against coarse or non-monotonic wall clocks so that a refreshed
/// `updated_at` always moves forward.
#[must_use]
pub fn advance_past(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Compact "time ago" rendering for listings.
#[must_use]
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(then);
    if delta.num_seconds() < 60 {
        return "just now".to_string();
    }
    if delta.num_minutes() < 60 {
        return format!("{}m ago", delta.num_minutes());
    }
    if delta.num_hours() < 24 {
        return format!("{}h ago", delta.num_hours());
    }
    format!("{}d ago", delta.num_days())
}
