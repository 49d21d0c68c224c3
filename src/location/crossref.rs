//! cross-reference tier: treat identifier fields of the reading as foreign
//! keys into the device metadata trees
//!
//! identifiers outer, base paths inner; `{base}/{id}` is read and the first
//! value usable as a location wins.

use super::{probe, value_to_location, ResolutionTier, Target};
use crate::store::{is_valid_key, TreeStore};

use async_trait::async_trait;
use serde_json::Value;

const ID_FIELDS: [&str; 11] = [
    "deviceId", "sensorId", "device", "node", "stationId", "id", "sensor", "station", "nodeId",
    "device_id", "sensor_id",
];

const BASE_PATHS: [&str; 9] = [
    "/Devices",
    "/Sensors/Devices",
    "/Sensors/Meta",
    "/Sensors",
    "/SensorNodes",
    "/Nodes",
    "/Stations",
    "/SensorsInfo",
    "/DevicesInfo",
];

/// identifier values of a reading, in field priority order, without repeats
pub fn candidate_ids(reading: Option<&Value>) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let Some(record) = reading.and_then(Value::as_object) else {
        return ids;
    };

    for field in ID_FIELDS {
        let Some(id) = record.get(field).and_then(Value::as_str).map(str::trim) else {
            continue;
        };
        if id.is_empty() || ids.iter().any(|seen| seen == id) {
            continue;
        }
        if !is_valid_key(id) {
            tracing::debug!("[LOCATION] skipping {} {:?}: not a usable key", field, id);
            continue;
        }
        ids.push(id.to_string());
    }
    ids
}

pub struct CrossReferenceTier;

impl CrossReferenceTier {
    /// location of the device a reading names, if any metadata tree knows it
    pub async fn resolve_reading(&self, store: &dyn TreeStore, reading: Option<&Value>) -> Option<String> {
        for id in candidate_ids(reading) {
            for base in BASE_PATHS {
                let path = format!("{}/{}", base, id);
                if let Some(found) = probe(store, &path).await.as_ref().and_then(value_to_location) {
                    tracing::debug!("[LOCATION] {} resolved via {}", id, path);
                    return Some(found);
                }
            }
        }
        None
    }
}

#[async_trait]
impl ResolutionTier for CrossReferenceTier {
    fn name(&self) -> &'static str {
        "cross-reference"
    }

    async fn resolve(&self, store: &dyn TreeStore, targets: &mut [Target]) {
        for target in targets.iter_mut().filter(|t| !t.is_resolved()) {
            if let Some(found) = self.resolve_reading(store, target.latest.as_ref()).await {
                target.location = found;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_candidate_ids_order_and_filtering() {
        let reading = json!({
            "id": "N2",
            "deviceId": " S1 ",
            "sensorId": "",
            "node": "S1",
            "station": 7,
            "sensor_id": "a/b",
            "device_id": "D4"
        });
        assert_eq!(candidate_ids(Some(&reading)), vec!["S1", "N2", "D4"]);
        assert!(candidate_ids(Some(&json!("S1"))).is_empty());
        assert!(candidate_ids(None).is_empty());
    }

    #[tokio::test]
    async fn test_resolves_through_sensor_devices() {
        let store = MemoryStore::new(json!({"Sensors": {"Devices": {"S1": {"city": "Matara"}}}}));
        let reading = json!({"deviceId": "S1"});

        let found = CrossReferenceTier.resolve_reading(&store, Some(&reading)).await;

        assert_eq!(found.as_deref(), Some("Matara"));
        assert_eq!(store.reads(), vec!["/Devices/S1", "/Sensors/Devices/S1"]);
    }

    #[tokio::test]
    async fn test_plain_string_metadata_and_later_identifiers() {
        let store = MemoryStore::new(json!({
            "Devices": {"S1": {"firmware": "1.2"}},
            "Stations": {"ST-9": "Hambantota"}
        }));
        let reading = json!({"deviceId": "S1", "stationId": "ST-9"});

        let found = CrossReferenceTier.resolve_reading(&store, Some(&reading)).await;
        assert_eq!(found.as_deref(), Some("Hambantota"));
        // every base path was tried for the first identifier
        assert_eq!(store.reads().iter().filter(|p| p.ends_with("/S1")).count(), BASE_PATHS.len());
    }

    #[tokio::test]
    async fn test_failed_reads_count_as_absent() {
        let store = MemoryStore::new(json!({"Nodes": {"S1": {"town": "Ella"}}}))
            .fail_on("/Devices/S1")
            .fail_on("/Sensors/S1");
        let reading = json!({"device": "S1"});

        let found = CrossReferenceTier.resolve_reading(&store, Some(&reading)).await;
        assert_eq!(found.as_deref(), Some("Ella"));
    }
}
