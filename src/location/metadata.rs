//! metadata tier: look for per-sensor-type location entries under a fixed
//! list of generic metadata roots
//!
//! every pending stream probes `{root}/{leaf}` for its own leaf names; each
//! path is an independent read, so a root the store refuses does not hide
//! a readable leaf. iteration stops as soon as nothing is pending.
//!
//! when rain is still open after its leaves, the root itself is read and,
//! if it is a location (plain string, or a record the extractor
//! understands), taken as the rain location whether or not anything marks
//! it as rain data.
// FIXME: confirm with the dashboard owners whether that rain fallback is
// wanted; it can label the rain gauge with a site-wide location.

use super::{probe, value_to_location, ResolutionTier, Target};
use crate::domain::SensorStream;
use crate::store::TreeStore;

use async_trait::async_trait;

const ROOTS: [&str; 7] = [
    "/Sensors/Locations",
    "/Locations",
    "/Sensors/Meta",
    "/Meta/Sensors",
    "/SensorLocations",
    "/Configs/Sensors",
    "/Meta",
];

const RAIN_LEAVES: [&str; 9] = [
    "Rain", "rain", "RAIN", "RainSensor", "rainSensor", "RainReadings", "rainReadings", "RainLocation",
    "rainLocation",
];

const SOIL_LEAVES: [&str; 11] = [
    "Soil", "soil", "SOIL", "SoilSensor", "soilSensor", "SoilReadings", "soilReadings", "SoilMoisture",
    "soilMoisture", "SoilLocation", "soilLocation",
];

fn leaves(stream: SensorStream) -> &'static [&'static str] {
    match stream {
        SensorStream::Rain => &RAIN_LEAVES,
        SensorStream::Soil => &SOIL_LEAVES,
        _ => &[],
    }
}

pub struct MetadataTier;

#[async_trait]
impl ResolutionTier for MetadataTier {
    fn name(&self) -> &'static str {
        "metadata"
    }

    async fn resolve(&self, store: &dyn TreeStore, targets: &mut [Target]) {
        for root in ROOTS {
            if targets.iter().all(Target::is_resolved) {
                break;
            }

            for target in targets.iter_mut().filter(|t| !t.is_resolved()) {
                for leaf in leaves(target.stream) {
                    let path = format!("{}/{}", root, leaf);
                    if let Some(found) = probe(store, &path).await.as_ref().and_then(value_to_location) {
                        tracing::debug!("[LOCATION] {:?} found at {}", target.stream, path);
                        target.location = found;
                        break;
                    }
                }
            }

            let open_rain = targets
                .iter_mut()
                .find(|t| t.stream == SensorStream::Rain && !t.is_resolved());
            if let Some(rain) = open_rain {
                if let Some(found) = probe(store, root).await.as_ref().and_then(value_to_location) {
                    tracing::debug!("[LOCATION] rain takes untyped location {:?} from {}", found, root);
                    rain.location = found;
                }
            }
        }
    }
}
