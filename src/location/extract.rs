//! location string extraction from a single record
//!
//! first match wins:
//!   1. direct string fields, in `DIRECT_FIELDS` order
//!   2. nested `location` record, comma-joined in `NESTED_FIELDS` order
//!   3. numeric `latitude` / `longitude`
//!   4. numeric `lat` / `lng`

use serde_json::{Map, Value};

const DIRECT_FIELDS: [&str; 10] = [
    "location", "Location", "loc", "place", "site", "area", "city", "district", "region", "town",
];

const NESTED_FIELDS: [&str; 6] = ["name", "city", "district", "area", "region", "town"];

/// best-effort location string, empty when nothing usable is present
pub fn extract_location(reading: Option<&Value>) -> String {
    let Some(record) = reading.and_then(Value::as_object) else {
        return String::new();
    };

    if let Some(direct) = DIRECT_FIELDS.iter().find_map(|field| non_empty_str(record.get(*field))) {
        return direct.to_string();
    }

    if let Some(nested) = record.get("location").and_then(Value::as_object) {
        let parts: Vec<&str> = NESTED_FIELDS
            .iter()
            .filter_map(|field| non_empty_str(nested.get(*field)))
            .collect();
        if !parts.is_empty() {
            return parts.join(", ");
        }
    }

    coordinates(record, "latitude", "longitude")
        .or_else(|| coordinates(record, "lat", "lng"))
        .unwrap_or_default()
}

/// a value usable as a location: a non-empty plain string, or a record the
/// extractor finds something in
pub fn value_to_location(value: &Value) -> Option<String> {
    if let Some(s) = non_empty_str(Some(value)) {
        return Some(s.to_string());
    }
    Some(extract_location(Some(value))).filter(|s| !s.is_empty())
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

fn coordinates(record: &Map<String, Value>, lat_key: &str, lng_key: &str) -> Option<String> {
    let lat = record.get(lat_key).and_then(Value::as_f64)?;
    let lng = record.get(lng_key).and_then(Value::as_f64)?;
    Some(format!("{}, {}", lat, lng))
}
