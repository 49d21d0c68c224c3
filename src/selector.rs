//! ==============================================================================
//! selector.rs - latest reading selection
//! ==============================================================================
//!
//! purpose:
//!     picks the single "most recent" reading out of a collection.
//!
//! ```text
//!     devices are not guaranteed to write timestamped or monotonically keyed
//!     records, so the choice degrades in three steps:
//!       1. max valid `timestamp` field (ties go to the later entry)
//!       2. max numeric key, when every key is numeric
//!       3. last entry in collection order
//! ```
//!
//! relationships:
//!     - used by: location.rs (reading whose location is resolved)
//!
//! ==============================================================================

use crate::domain::{ReadingCollection, SensorReading};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// the reading judged most recent, `None` for an empty collection
pub fn latest_reading(collection: &ReadingCollection) -> Option<&SensorReading> {
    by_timestamp(collection)
        .or_else(|| by_numeric_key(collection))
        .or_else(|| collection.values().last())
}

fn by_timestamp(collection: &ReadingCollection) -> Option<&SensorReading> {
    let mut best: Option<(DateTime<Utc>, &SensorReading)> = None;
    for reading in collection.values() {
        let Some(ts) = reading.get("timestamp").and_then(parse_timestamp) else {
            continue;
        };
        // `>=` so equal timestamps resolve to the later entry
        if best.as_ref().map_or(true, |(max, _)| ts >= *max) {
            best = Some((ts, reading));
        }
    }
    best.map(|(_, reading)| reading)
}

fn by_numeric_key(collection: &ReadingCollection) -> Option<&SensorReading> {
    let mut best: Option<(f64, &SensorReading)> = None;
    for (key, reading) in collection {
        let n = key.trim().parse::<f64>().ok().filter(|n| n.is_finite())?;
        if best.as_ref().map_or(true, |(max, _)| n >= *max) {
            best = Some((n, reading));
        }
    }
    best.map(|(_, reading)| reading)
}

/// parse a reading timestamp; numbers are epoch milliseconds
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let ms = n.as_f64().filter(|ms| ms.is_finite())?;
            Utc.timestamp_millis_opt(ms as i64).single()
        }
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
