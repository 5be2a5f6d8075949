//! Normalizing legacy clip timestamps.
//!
//! Clip documents exported from the old client carry their dates in whatever
//! shape the writing screen happened to use:
//!
//! - Firestore timestamp objects: `{"seconds": 1710485112, "nanoseconds": 0}`
//!   (or the admin SDK's `_seconds` / `_nanoseconds`)
//! - Epoch numbers, in seconds or milliseconds, sometimes as strings
//! - ISO 8601 / RFC 3339 strings, with or without an offset
//! - Locale strings produced by `toLocaleString`: `2024. 3. 15. 오후 3:45:12`,
//!   `2024년 3월 15일`, `3/15/2024, 3:45:12 PM`
//!
//! [`parse_timestamp`] resolves all of them to one UTC instant. Strings that
//! carry no offset are read in the caller's local offset.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// Default local offset (KST, UTC+9) used by the service.
pub const DEFAULT_OFFSET_HOURS: i32 = 9;

/// Epoch values at or above this magnitude are milliseconds.
///
/// 1e11 seconds is the year 5138; 1e11 milliseconds is March 1973.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// ISO layouts with an offset that RFC 3339 parsing rejects.
const OFFSET_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// Naive ISO layouts tried in order.
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Build a fixed offset from whole hours east of UTC.
#[must_use]
pub fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
}

/// Parse any of the known legacy timestamp shapes.
///
/// Returns `None` for `null`, booleans, arrays and anything unrecognized.
#[must_use]
pub fn parse_timestamp(value: &Value, offset: FixedOffset) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map_or_else(|| n.as_f64().and_then(from_epoch_f64), from_epoch_i64),
        Value::String(s) => parse_timestamp_str(s, offset),
        Value::Object(map) => from_firestore_object(map),
        _ => None,
    }
}

/// Parse a timestamp string.
#[must_use]
pub fn parse_timestamp_str(s: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(n) = s.parse::<i64>() {
        return from_epoch_i64(n);
    }
    if is_decimal_epoch(s)
        && let Ok(n) = s.parse::<f64>()
    {
        return from_epoch_f64(n);
    }

    if let Some(dt) = DateTime::parse_from_rfc3339(s)
        .ok()
        .or_else(|| parse_basic_offset(s))
    {
        return Some(dt.with_timezone(&Utc));
    }

    parse_naive_iso(s)
        .or_else(|| parse_localized(s))
        .and_then(|naive| local_to_utc(naive, offset))
}

/// `digits '.' digits`, e.g. `1710485112.5`.
fn is_decimal_epoch(s: &str) -> bool {
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    s.split_once('.')
        .is_some_and(|(whole, frac)| all_digits(whole) && all_digits(frac))
}

/// ISO 8601 with a basic-format offset such as `+0900`.
fn parse_basic_offset(s: &str) -> Option<DateTime<FixedOffset>> {
    OFFSET_LAYOUTS
        .iter()
        .find_map(|layout| DateTime::parse_from_str(s, layout).ok())
}

fn from_firestore_object(map: &Map<String, Value>) -> Option<DateTime<Utc>> {
    let seconds = map
        .get("seconds")
        .or_else(|| map.get("_seconds"))
        .and_then(Value::as_i64)?;
    let nanos = map
        .get("nanoseconds")
        .or_else(|| map.get("_nanoseconds"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let nanos = u32::try_from(nanos).ok().filter(|n| *n < 1_000_000_000)?;
    DateTime::from_timestamp(seconds, nanos)
}

fn from_epoch_i64(n: i64) -> Option<DateTime<Utc>> {
    if n.unsigned_abs() >= MILLIS_THRESHOLD.unsigned_abs() {
        DateTime::from_timestamp_millis(n)
    } else {
        DateTime::from_timestamp(n, 0)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn from_epoch_f64(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() {
        return None;
    }
    let millis = if n.abs() >= MILLIS_THRESHOLD as f64 {
        n
    } else {
        n * 1000.0
    };
    DateTime::from_timestamp_millis(millis.round() as i64)
}

fn parse_naive_iso(s: &str) -> Option<NaiveDateTime> {
    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Field order implied by the separator after the first number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateOrder {
    /// `2024. 3. 15.` and `2024년 3월 15일`
    YearMonthDay,
    /// `3/15/2024`
    MonthDayYear,
}

/// Parse `toLocaleString` output for the `ko-KR` and `en-US` locales.
fn parse_localized(s: &str) -> Option<NaiveDateTime> {
    let order = match s
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .chars()
        .next()?
    {
        '.' | '년' => DateOrder::YearMonthDay,
        '/' => DateOrder::MonthDayYear,
        _ => return None,
    };
    // Guards against a leading non-digit, which leaves the string untouched.
    if !s.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let numbers = digit_runs(s)?;
    let (year, month, day, time) = match (order, numbers.as_slice()) {
        (DateOrder::YearMonthDay, [y, m, d, rest @ ..])
        | (DateOrder::MonthDayYear, [m, d, y, rest @ ..]) => (*y, *m, *d, rest),
        _ => return None,
    };

    let (hour, minute, second) = match time {
        [] => (0, 0, 0),
        [h] => (*h, 0, 0),
        [h, mi] => (*h, *mi, 0),
        [h, mi, se] => (*h, *mi, *se),
        _ => return None,
    };

    let upper = s.to_uppercase();
    let pm = s.contains("오후") || upper.contains("PM");
    let am = s.contains("오전") || upper.contains("AM");
    let hour = match hour {
        h if pm && h < 12 => h + 12,
        12 if am => 0,
        h => h,
    };

    let year = if year < 100 { year + 2000 } else { year };
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)?
        .and_hms_opt(hour, minute, second)
}

/// Collect the runs of ASCII digits in `s`.
///
/// Returns `None` if a run is too long to be a date component.
fn digit_runs(s: &str) -> Option<Vec<u32>> {
    let mut runs = Vec::new();
    let mut current: Option<u32> = None;
    let mut len = 0_usize;

    for c in s.chars() {
        if let Some(d) = c.to_digit(10) {
            len += 1;
            if len > 4 {
                return None;
            }
            current = Some(current.unwrap_or(0) * 10 + d);
        } else if let Some(n) = current.take() {
            runs.push(n);
            len = 0;
        }
    }
    if let Some(n) = current {
        runs.push(n);
    }
    Some(runs)
}

fn local_to_utc(naive: NaiveDateTime, offset: FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
