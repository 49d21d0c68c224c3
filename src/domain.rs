//! ==============================================================================
//! domain.rs - shared sensor types
//! ==============================================================================
//!
//! purpose:
//!     names the sensor streams the hub knows about and defines the json
//!     envelopes handed to the dashboard front end.
//!
//! relationships:
//!     - used by: fetch.rs (builds bundles), location.rs (location map),
//!       main.rs (serializes envelopes)
//!
//! ==============================================================================

use serde::Serialize;
use serde_json::{Map, Value};

/// one timestamped measurement - no fixed schema, devices write what they like
pub type SensorReading = Value;

/// per-reading key -> reading, in database key order
pub type ReadingCollection = Map<String, Value>;

/// a named category of readings stored under its own subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorStream {
    Bmp180,
    Mpu6050,
    Tilt,
    Rain,
    Soil,
    WaterLevel,
}

impl SensorStream {
    pub const ALL: [SensorStream; 6] = [
        SensorStream::Bmp180,
        SensorStream::Mpu6050,
        SensorStream::Tilt,
        SensorStream::Rain,
        SensorStream::Soil,
        SensorStream::WaterLevel,
    ];

    /// key used in the json envelope
    pub fn key(self) -> &'static str {
        match self {
            SensorStream::Bmp180 => "bmp180",
            SensorStream::Mpu6050 => "mpu6050",
            SensorStream::Tilt => "tilt",
            SensorStream::Rain => "rain",
            SensorStream::Soil => "soil",
            SensorStream::WaterLevel => "waterLevel",
        }
    }

    /// subtree holding the stream's readings
    pub fn path(self) -> &'static str {
        match self {
            SensorStream::Bmp180 => "/Sensors/BMP180Readings",
            SensorStream::Mpu6050 => "/Sensors/MPU6050Readings",
            SensorStream::Tilt => "/Sensors/TiltReadings",
            SensorStream::Rain => "/Sensors/RainReadings",
            SensorStream::Soil => "/Sensors/SoilReadings",
            SensorStream::WaterLevel => "/Sensors/WaterLevelReadings",
        }
    }
}

/// resolved location per stream, empty string when unresolved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationMap {
    pub rain: String,
    pub soil: String,
    pub water_level: String,
}

/// raw collections keyed by stream, plus resolved locations when requested
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorBundle {
    #[serde(flatten)]
    pub streams: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<LocationMap>,
}

impl SensorBundle {
    pub fn stream(&self, stream: SensorStream) -> Option<&ReadingCollection> {
        self.streams.get(stream.key()).and_then(Value::as_object)
    }
}

/// envelope returned by every fetch operation - failures are reported in-band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> FetchResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), message: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, data: None, message: Some(message.into()) }
    }
}

/// result of a connectivity probe against the database root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
    pub connected: bool,
}
