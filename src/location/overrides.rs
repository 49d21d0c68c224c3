//! override tier: explicit location paths
//!
//! the configured path for a stream (SOIL_LOCATION_PATH / RAIN_LOCATION_PATH)
//! is tried first, then the conventional spots people put a location in.

use super::{probe, value_to_location, ResolutionTier, Target};
use crate::config::LocationsConfig;
use crate::domain::SensorStream;
use crate::store::TreeStore;

use async_trait::async_trait;

const SOIL_PATHS: [&str; 5] = [
    "/SoilLocation",
    "/Soil/location",
    "/Soil/Location",
    "/Sensors/Soil/location",
    "/Sensors/Soil/Location",
];

const RAIN_PATHS: [&str; 5] = [
    "/RainLocation",
    "/Rain/location",
    "/Rain/Location",
    "/Sensors/Rain/location",
    "/Sensors/Rain/Location",
];

pub struct OverrideTier {
    soil_path: Option<String>,
    rain_path: Option<String>,
}

impl OverrideTier {
    pub fn new(config: &LocationsConfig) -> Self {
        Self { soil_path: config.soil_path.clone(), rain_path: config.rain_path.clone() }
    }

    /// paths probed for a stream, in order
    pub fn paths(&self, stream: SensorStream) -> Vec<&str> {
        let (configured, conventional): (&Option<String>, &[&str]) = match stream {
            SensorStream::Soil => (&self.soil_path, &SOIL_PATHS),
            SensorStream::Rain => (&self.rain_path, &RAIN_PATHS),
            _ => return Vec::new(),
        };
        configured.as_deref().into_iter().chain(conventional.iter().copied()).collect()
    }
}

#[async_trait]
impl ResolutionTier for OverrideTier {
    fn name(&self) -> &'static str {
        "override"
    }

    async fn resolve(&self, store: &dyn TreeStore, targets: &mut [Target]) {
        for target in targets.iter_mut().filter(|t| !t.is_resolved()) {
            for path in self.paths(target.stream) {
                if let Some(found) = probe(store, path).await.as_ref().and_then(value_to_location) {
                    tracing::debug!("[LOCATION] {:?} found at {}", target.stream, path);
                    target.location = found;
                    break;
                }
            }
        }
    }
}
