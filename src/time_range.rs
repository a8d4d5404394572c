//! Turns "1h" / "7d" / "2w" into an ISO-8601 window ending now.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use regex::Regex;

use crate::error::{CoralogixError, Result};
use crate::model::DateRange;

fn time_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)([hdw])$").expect("static time range regex"))
}

/// Resolves `input` against the current wall clock.
pub fn resolve(input: &str) -> Result<DateRange> {
    resolve_at(input, Utc::now())
}

pub fn resolve_at(input: &str, now: DateTime<Utc>) -> Result<DateRange> {
    let invalid = || CoralogixError::TimeRangeError {
        input: input.to_string(),
    };
    let caps = time_range_re().captures(input).ok_or_else(invalid)?;
    let amount: i64 = caps[1].parse().map_err(|_| invalid())?;

    let span = match &caps[2] {
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        "w" => amount.checked_mul(7).and_then(Duration::try_days),
        _ => None,
    }
    .ok_or_else(invalid)?;
    let start = now.checked_sub_signed(span).ok_or_else(invalid)?;

    Ok(DateRange {
        start_date: iso(start),
        end_date: iso(now),
    })
}

/// Millisecond precision with a `Z` suffix, e.g. `2024-01-01T00:00:00.000Z`.
pub fn iso(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}
