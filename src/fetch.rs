//! ==============================================================================
//! fetch.rs - sensor data fetch operations
//! ==============================================================================
//!
//! purpose:
//!     the operations the dashboard calls: latest readings with resolved
//!     locations, full history, and a connectivity check.
//!
//! ```text
//!     every operation returns an envelope; a store failure becomes
//!     `{ success: false, message }` and never an error of the caller. an
//!     unresolved location is not a failure.
//! ```
//!
//! relationships:
//!     - used by: main.rs (http handlers)
//!     - uses: store.rs (collection reads), location.rs (resolution)
//!
//! ==============================================================================

use crate::config::HostConfig;
use crate::domain::{ConnectionStatus, FetchResponse, ReadingCollection, SensorBundle, SensorStream};
use crate::location::LocationResolver;
use crate::store::{into_collection, StoreError, TreeStore};

use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Clone-able handle shared by the http handlers
#[derive(Clone)]
pub struct SensorService {
    store: Arc<dyn TreeStore>,
    resolver: Arc<LocationResolver>,
    latest_limit: usize,
}

impl SensorService {
    pub fn new(store: Arc<dyn TreeStore>, config: &HostConfig) -> Self {
        Self {
            store,
            resolver: Arc::new(LocationResolver::new(&config.locations)),
            latest_limit: config.fetch.latest_limit,
        }
    }

    /// last N readings of every stream, plus resolved locations
    pub async fn fetch_latest(&self) -> FetchResponse<SensorBundle> {
        let mut bundle = match self.read_streams(Some(self.latest_limit)).await {
            Ok(bundle) => bundle,
            Err(e) => {
                tracing::warn!("[FETCH] latest sensor data failed: {}", e);
                return FetchResponse::failed(format!("Failed to fetch sensor data: {}", e));
            }
        };

        let locations = self.resolver.resolve_all(self.store.as_ref(), &bundle).await;
        bundle.locations = Some(locations);
        FetchResponse::ok(bundle)
    }

    /// every stored reading of every stream, for historical views
    pub async fn fetch_all(&self) -> FetchResponse<SensorBundle> {
        match self.read_streams(None).await {
            Ok(bundle) => FetchResponse::ok(bundle),
            Err(e) => {
                tracing::warn!("[FETCH] all sensor data failed: {}", e);
                FetchResponse::failed(format!("Failed to fetch all sensor data: {}", e))
            }
        }
    }

    /// shallow read of the database root to prove the store is reachable
    pub async fn test_connection(&self) -> ConnectionStatus {
        match self.store.read_shallow("/").await {
            Ok(_) => ConnectionStatus {
                success: true,
                message: "Firebase connection successful!".to_string(),
                connected: true,
            },
            Err(e) => {
                tracing::warn!("[FETCH] connection test failed: {}", e);
                ConnectionStatus {
                    success: false,
                    message: format!("Firebase connection failed: {}", e),
                    connected: false,
                }
            }
        }
    }

    async fn read_streams(&self, limit: Option<usize>) -> Result<SensorBundle, StoreError> {
        let reads = SensorStream::ALL.iter().map(|&stream| self.read_stream(stream, limit));
        let collections = try_join_all(reads).await?;

        let mut streams = Map::new();
        for (stream, collection) in SensorStream::ALL.iter().zip(collections) {
            streams.insert(stream.key().to_string(), Value::Object(collection));
        }
        Ok(SensorBundle { streams, locations: None })
    }

    async fn read_stream(&self, stream: SensorStream, limit: Option<usize>) -> Result<ReadingCollection, StoreError> {
        match limit {
            Some(n) => self.store.read_last_n(stream.path(), n).await,
            None => Ok(into_collection(self.store.read(stream.path()).await?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn service(store: MemoryStore) -> SensorService {
        SensorService::new(Arc::new(store), &HostConfig::default())
    }

    #[tokio::test]
    async fn test_missing_locations_are_not_a_failure() {
        let svc = service(MemoryStore::new(json!({
            "Sensors": {"RainReadings": {"1": {"value": 12, "timestamp": "2025-08-07 10:00:00"}}}
        })));

        let resp = svc.fetch_latest().await;

        assert!(resp.success);
        let data = resp.data.unwrap();
        let locations = data.locations.clone().unwrap();
        assert_eq!(locations.rain, "");
        assert_eq!(locations.soil, "");
        assert_eq!(locations.water_level, "Colombo");
        assert_eq!(data.stream(SensorStream::Rain).unwrap().len(), 1);
        assert!(data.stream(SensorStream::Tilt).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_is_limited_and_located() {
        let mut readings = Map::new();
        for i in 1..=25 {
            readings.insert(i.to_string(), json!({"value": i}));
        }
        readings.insert("26".into(), json!({"value": 26, "place": "Deniyaya"}));
        let svc = service(MemoryStore::new(json!({"Sensors": {"RainReadings": readings}})));

        let data = svc.fetch_latest().await.data.unwrap();

        let rain = data.stream(SensorStream::Rain).unwrap();
        assert_eq!(rain.len(), 20);
        assert!(rain.contains_key("26") && !rain.contains_key("6"));
        assert_eq!(data.locations.unwrap().rain, "Deniyaya");
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_in_band() {
        let svc = service(MemoryStore::new(json!({})).fail_on("/Sensors/TiltReadings"));

        let resp = svc.fetch_latest().await;

        assert!(!resp.success);
        assert!(resp.data.is_none());
        assert!(resp.message.unwrap().starts_with("Failed to fetch sensor data: "));
    }

    #[tokio::test]
    async fn test_fetch_all_has_no_locations_or_limit() {
        let mut readings = Map::new();
        for i in 1..=30 {
            readings.insert(i.to_string(), json!({"angle": i}));
        }
        let svc = service(MemoryStore::new(json!({"Sensors": {"TiltReadings": readings}})));

        let data = svc.fetch_all().await.data.unwrap();

        assert_eq!(data.stream(SensorStream::Tilt).unwrap().len(), 30);
        assert!(data.locations.is_none());
    }

    #[tokio::test]
    async fn test_array_shaped_streams_keep_their_readings() {
        let svc = service(MemoryStore::new(json!({
            "Sensors": {
                "TiltReadings": [{"x": 0}, {"x": 1}, {"x": 2}],
                "RainReadings": [{"v": 1}, {"v": 2, "city": "Kandy"}]
            }
        })));

        let all = svc.fetch_all().await.data.unwrap();
        assert_eq!(all.stream(SensorStream::Tilt).unwrap().len(), 3);

        let latest = svc.fetch_latest().await.data.unwrap();
        assert_eq!(latest.stream(SensorStream::Rain).unwrap().len(), 2);
        assert_eq!(latest.locations.unwrap().rain, "Kandy");
    }

    #[tokio::test]
    async fn test_connection_status() {
        let ok = service(MemoryStore::new(json!({"Sensors": {}}))).test_connection().await;
        assert!(ok.success && ok.connected);

        let down = service(MemoryStore::new(json!({})).fail_on("/")).test_connection().await;
        assert!(!down.success && !down.connected);
        assert!(down.message.starts_with("Firebase connection failed: "));
    }
}
