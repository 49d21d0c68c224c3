//! ==============================================================================
//! location.rs - sensor location resolution
//! ==============================================================================
//!
//! purpose:
//!     infers a human-readable location for the rain and soil streams from
//!     records that were never given a consistent shape.
//!
//! chain (first non-empty result wins, per stream):
//!
//! ```text
//!     ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐   ┌─────────────┐
//!     │ inline       │ → │ cross-reference  │ → │ metadata     │ → │ override    │
//!     │ (the record) │   │ (device ids)     │   │ (known roots)│   │ (paths)     │
//!     └──────────────┘   └──────────────────┘   └──────────────┘   └─────────────┘
//!
//!     tiers run in order and only for streams that are still unresolved; a
//!     tier is skipped entirely once nothing is pending, so no store read is
//!     issued after the inline tier answers everything.
//! ```
//!
//! errors:
//!     every store read here is a probe. a failed probe is logged at debug
//!     and treated as "nothing there". an unresolved location is `""`.
//!
//! relationships:
//!     - used by: fetch.rs
//!     - uses: selector.rs (latest reading per stream), store.rs (probes)
//!
//! ==============================================================================

mod crossref;
mod extract;
mod metadata;
mod overrides;

pub use crossref::{candidate_ids, CrossReferenceTier};
pub use extract::{extract_location, value_to_location};
pub use metadata::MetadataTier;
pub use overrides::OverrideTier;

use crate::config::LocationsConfig;
use crate::domain::{LocationMap, SensorBundle, SensorReading, SensorStream};
use crate::selector::latest_reading;
use crate::store::TreeStore;

use async_trait::async_trait;
use serde_json::Value;

/// streams whose location is resolved rather than configured
pub const RESOLVED_STREAMS: [SensorStream; 2] = [SensorStream::Rain, SensorStream::Soil];

/// one stream moving through the chain
#[derive(Debug, Clone)]
pub struct Target {
    pub stream: SensorStream,
    pub latest: Option<SensorReading>,
    pub location: String,
}

impl Target {
    pub fn new(stream: SensorStream, latest: Option<SensorReading>) -> Self {
        Self { stream, latest, location: String::new() }
    }

    pub fn is_resolved(&self) -> bool {
        !self.location.is_empty()
    }
}

/// one strategy of the chain
#[async_trait]
pub trait ResolutionTier: Send + Sync {
    fn name(&self) -> &'static str;

    /// fill in `location` for the unresolved targets this tier can answer
    async fn resolve(&self, store: &dyn TreeStore, targets: &mut [Target]);
}

/// the location only the record itself carries
pub struct InlineTier;

#[async_trait]
impl ResolutionTier for InlineTier {
    fn name(&self) -> &'static str {
        "inline"
    }

    async fn resolve(&self, _store: &dyn TreeStore, targets: &mut [Target]) {
        for target in targets.iter_mut().filter(|t| !t.is_resolved()) {
            target.location = extract_location(target.latest.as_ref());
        }
    }
}

pub struct LocationResolver {
    tiers: Vec<Box<dyn ResolutionTier>>,
    water_level: String,
}

impl LocationResolver {
    pub fn new(config: &LocationsConfig) -> Self {
        Self {
            tiers: vec![
                Box::new(InlineTier),
                Box::new(CrossReferenceTier),
                Box::new(MetadataTier),
                Box::new(OverrideTier::new(config)),
            ],
            water_level: config.water_level.clone(),
        }
    }

    /// resolve every stream location for a freshly fetched bundle
    pub async fn resolve_all(&self, store: &dyn TreeStore, bundle: &SensorBundle) -> LocationMap {
        let mut targets: Vec<Target> = RESOLVED_STREAMS
            .iter()
            .map(|&stream| Target::new(stream, bundle.stream(stream).and_then(latest_reading).cloned()))
            .collect();

        self.run_chain(store, &mut targets).await;

        let mut locations = LocationMap { water_level: self.water_level.clone(), ..LocationMap::default() };
        for target in targets {
            match target.stream {
                SensorStream::Rain => locations.rain = target.location,
                SensorStream::Soil => locations.soil = target.location,
                _ => {}
            }
        }
        locations
    }

    /// run the tiers over `targets`, returning each stream that got a
    /// location together with the tier that found it
    pub async fn run_chain(&self, store: &dyn TreeStore, targets: &mut [Target]) -> Vec<(SensorStream, &'static str)> {
        let mut resolved_by = Vec::new();
        for tier in &self.tiers {
            if targets.iter().all(Target::is_resolved) {
                break;
            }
            let pending: Vec<bool> = targets.iter().map(|t| !t.is_resolved()).collect();
            tier.resolve(store, targets).await;

            for (target, was_pending) in targets.iter().zip(pending) {
                if was_pending && target.is_resolved() {
                    tracing::debug!("[LOCATION] {:?} = {:?} via {}", target.stream, target.location, tier.name());
                    resolved_by.push((target.stream, tier.name()));
                }
            }
        }

        for target in targets.iter().filter(|t| !t.is_resolved()) {
            tracing::debug!("[LOCATION] no location found for {:?}", target.stream);
        }
        resolved_by
    }
}

/// read a path, folding failures into "not present"
pub(crate) async fn probe(store: &dyn TreeStore, path: &str) -> Option<Value> {
    match store.read(path).await {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("[LOCATION] probe of {} failed: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::{json, Map};

    fn bundle(rain: Value, soil: Value) -> SensorBundle {
        let mut streams = Map::new();
        streams.insert("rain".into(), rain);
        streams.insert("soil".into(), soil);
        SensorBundle { streams, locations: None }
    }

    fn resolver() -> LocationResolver {
        LocationResolver::new(&LocationsConfig::default())
    }

    #[tokio::test]
    async fn test_inline_locations_skip_every_probe() {
        let store = MemoryStore::new(json!({"Devices": {"R1": {"city": "Nope"}}}));
        let b = bundle(
            json!({"1": {"value": 12, "city": "Kandy", "deviceId": "R1"}}),
            json!({"1": {"moisture": 40, "location": {"city": "Galle", "region": "South"}}}),
        );

        let locations = resolver().resolve_all(&store, &b).await;

        assert_eq!(locations.rain, "Kandy");
        assert_eq!(locations.soil, "Galle, South");
        assert_eq!(locations.water_level, "Colombo");
        assert!(store.reads().is_empty(), "unexpected reads: {:?}", store.reads());
    }

    #[tokio::test]
    async fn test_unresolvable_streams_stay_empty() {
        let store = MemoryStore::new(json!({
            "Sensors": {"RainReadings": {"1": {"value": 12, "timestamp": "2025-08-07 10:00:00"}}}
        }));
        let b = bundle(json!({"1": {"value": 12, "timestamp": "2025-08-07 10:00:00"}}), json!({}));

        let locations = resolver().resolve_all(&store, &b).await;

        assert_eq!(locations.rain, "");
        assert_eq!(locations.soil, "");
        // every metadata root and override path was tried before giving up
        let reads = store.reads();
        assert!(reads.contains(&"/Meta".to_string()));
        assert!(reads.contains(&"/Sensors/Rain/Location".to_string()));
        assert!(reads.contains(&"/Sensors/Soil/Location".to_string()));
    }

    #[tokio::test]
    async fn test_tiers_apply_in_order_per_stream() {
        let store = MemoryStore::new(json!({
            "Sensors": {"Devices": {"S1": {"city": "Matara"}}},
            "Locations": {"Rain": "Ratnapura", "Soil": "Badulla"},
            "SoilLocation": "Never reached"
        }));
        let b = bundle(
            json!({"1": {"deviceId": "S1"}}),
            json!({"1": {"moisture": 40}}),
        );

        let locations = resolver().resolve_all(&store, &b).await;

        assert_eq!(locations.rain, "Matara");
        assert_eq!(locations.soil, "Badulla");
        assert!(!store.reads().contains(&"/SoilLocation".to_string()));
    }

    #[tokio::test]
    async fn test_each_stream_is_credited_to_one_tier() {
        let store = MemoryStore::new(json!({"Locations": {"Soil": "Badulla"}}));
        let mut targets = vec![
            Target::new(SensorStream::Rain, Some(json!({"city": "Kandy"}))),
            Target::new(SensorStream::Soil, Some(json!({"moisture": 40}))),
        ];

        let resolved_by = resolver().run_chain(&store, &mut targets).await;

        assert_eq!(resolved_by, vec![(SensorStream::Rain, "inline"), (SensorStream::Soil, "metadata")]);
    }

    #[tokio::test]
    async fn test_latest_reading_is_the_one_resolved() {
        let store = MemoryStore::new(json!({}));
        let b = bundle(
            json!({
                "a": {"city": "Old Town", "timestamp": "2025-08-06 10:00:00"},
                "b": {"city": "New Town", "timestamp": "2025-08-07 10:00:00"}
            }),
            json!({}),
        );

        let locations = resolver().resolve_all(&store, &b).await;
        assert_eq!(locations.rain, "New Town");
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let store = MemoryStore::new(json!({
            "Meta": {"soilSensor": {"location": {"name": "Plot 7", "district": "Nuwara Eliya"}}}
        }));
        let b = bundle(json!({"1": {"value": 3}}), json!({"1": {"moisture": 40}}));
        let resolver = resolver();

        let first = resolver.resolve_all(&store, &b).await;
        let second = resolver.resolve_all(&store, &b).await;

        assert_eq!(first, second);
        assert_eq!(first.soil, "Plot 7, Nuwara Eliya");
    }

    #[tokio::test]
    async fn test_failing_probes_do_not_stop_the_chain() {
        let store = MemoryStore::new(json!({"RainLocation": "Kegalle"}))
            .fail_on("/Sensors/Locations")
            .fail_on("/Devices/R9");
        let b = bundle(json!({"1": {"deviceId": "R9"}}), json!({}));

        let locations = resolver().resolve_all(&store, &b).await;
        assert_eq!(locations.rain, "Kegalle");
    }
}
