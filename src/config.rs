//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `host.toml`.
//!     loads configuration from file or falls back to defaults, then applies
//!     environment overrides (a `.env` file is loaded by main.rs first).
//!
//! structure:
//!     - ServerConfig: where the json api listens.
//!     - DatabaseConfig: which store backend to read and how patiently.
//!     - FetchConfig: how many recent readings per stream.
//!     - LocationsConfig: explicit location override paths + water level constant.
//!     - LoggingConfig: default log filter.
//!
//! environment overrides:
//!     FIREBASE_DATABASE_URL, FIREBASE_AUTH_TOKEN, SOIL_LOCATION_PATH,
//!     RAIN_LOCATION_PATH, DB_CONNECTION_TIMEOUT, DB_RETRY_ATTEMPTS,
//!     HOST_BIND_ADDR, LOG_LEVEL
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct HostConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub locations: LocationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Firebase,
    Snapshot,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub url: String,
    pub auth_token: Option<String>,
    pub snapshot_path: Option<PathBuf>,
    pub connection_timeout_ms: u64,
    pub retry_attempts: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub latest_limit: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LocationsConfig {
    /// consulted before the conventional soil location paths
    pub soil_path: Option<String>,
    /// consulted before the conventional rain location paths
    pub rain_path: Option<String>,
    /// water level stations are fixed installs; no resolution is attempted
    pub water_level: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:3000".to_string() }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Firebase,
            url: String::new(),
            auth_token: None,
            snapshot_path: None,
            connection_timeout_ms: 30_000,
            retry_attempts: 3,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { latest_limit: 20 }
    }
}

impl Default for LocationsConfig {
    fn default() -> Self {
        Self { soil_path: None, rain_path: None, water_level: "Colombo".to_string() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))
    }

    /// Load with default fallback, then apply the process environment
    pub fn load_or_default() -> Self {
        let mut config = Self::from_files();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn from_files() -> Self {
        let paths = [
            PathBuf::from("config").join("host.toml"),
            PathBuf::from("..").join("config").join("host.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        tracing::info!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("[CONFIG] Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        tracing::warn!("[CONFIG] No config file found - using defaults");
        Self::default()
    }

    /// overlay environment values; `lookup` is `std::env::var` outside tests
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = var("FIREBASE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(token) = var("FIREBASE_AUTH_TOKEN") {
            self.database.auth_token = Some(token);
        }
        if let Some(path) = var("SOIL_LOCATION_PATH") {
            self.locations.soil_path = Some(path);
        }
        if let Some(path) = var("RAIN_LOCATION_PATH") {
            self.locations.rain_path = Some(path);
        }
        if let Some(ms) = var("DB_CONNECTION_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.database.connection_timeout_ms = ms;
        }
        if let Some(n) = var("DB_RETRY_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.database.retry_attempts = n;
        }
        if let Some(addr) = var("HOST_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// reject configurations the host cannot start with
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.database.backend {
            Backend::Firebase if self.database.url.trim().is_empty() => {
                anyhow::bail!("database.url (or FIREBASE_DATABASE_URL) must be set for the firebase backend")
            }
            Backend::Snapshot if self.database.snapshot_path.is_none() => {
                anyhow::bail!("database.snapshot_path must be set for the snapshot backend")
            }
            _ => {}
        }
        if self.fetch.latest_limit == 0 {
            anyhow::bail!("fetch.latest_limit must be at least 1");
        }
        for path in [&self.locations.soil_path, &self.locations.rain_path].into_iter().flatten() {
            if !path.starts_with('/') {
                anyhow::bail!("location override path {:?} must be absolute", path);
            }
        }
        Ok(())
    }

    /// Log configuration summary
    pub fn print_summary(&self) {
        tracing::info!("┌─────────────────────────────────────────┐");
        tracing::info!("│           HOST CONFIGURATION            │");
        tracing::info!("├─────────────────────────────────────────┤");
        tracing::info!("│ Bind: {}", self.server.bind_addr);
        tracing::info!("│ Backend: {:?}", self.database.backend);
        match self.database.backend {
            Backend::Firebase => tracing::info!("│ Database: {}", self.database.url),
            Backend::Snapshot => tracing::info!("│ Snapshot: {:?}", self.database.snapshot_path),
        }
        tracing::info!("│ Timeout: {}ms, Retries: {}", self.database.connection_timeout_ms, self.database.retry_attempts);
        tracing::info!("│ Latest Limit: {}", self.fetch.latest_limit);
        tracing::info!("│ Soil Location Path: {}", self.locations.soil_path.as_deref().unwrap_or("-"));
        tracing::info!("│ Rain Location Path: {}", self.locations.rain_path.as_deref().unwrap_or("-"));
        tracing::info!("│ Log Level: {}", self.logging.level);
        tracing::info!("└─────────────────────────────────────────┘");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.server.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.database.connection_timeout_ms, 30_000);
        assert_eq!(config.database.retry_attempts, 3);
        assert_eq!(config.fetch.latest_limit, 20);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_partial_file() {
        let config = HostConfig::parse(
            r#"
            [database]
            backend = "snapshot"
            snapshot_path = "data/export.json"

            [locations]
            rain_path = "/Config/RainLocation"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.backend, Backend::Snapshot);
        assert_eq!(config.database.snapshot_path, Some(PathBuf::from("data/export.json")));
        assert_eq!(config.database.retry_attempts, 3);
        assert_eq!(config.locations.rain_path.as_deref(), Some("/Config/RainLocation"));
        assert_eq!(config.locations.water_level, "Colombo");
        assert_eq!(config.fetch.latest_limit, 20);
    }

    #[test]
    fn test_parse_rejects_unknown_backend() {
        assert!(HostConfig::parse("[database]\nbackend = \"mongo\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FIREBASE_DATABASE_URL", "https://demo.firebaseio.com"),
            ("SOIL_LOCATION_PATH", "/Config/Soil"),
            ("RAIN_LOCATION_PATH", "  "),
            ("DB_RETRY_ATTEMPTS", "5"),
            ("DB_CONNECTION_TIMEOUT", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = HostConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.url, "https://demo.firebaseio.com");
        assert_eq!(config.locations.soil_path.as_deref(), Some("/Config/Soil"));
        assert_eq!(config.locations.rain_path, None);
        assert_eq!(config.database.retry_attempts, 5);
        assert_eq!(config.database.connection_timeout_ms, 30_000);
    }

    #[test]
    fn test_validate() {
        let mut config = HostConfig::default();
        assert!(config.validate().is_err());

        config.database.url = "https://demo.firebaseio.com".into();
        assert!(config.validate().is_ok());

        config.locations.soil_path = Some("Soil/location".into());
        assert!(config.validate().is_err());

        config.locations.soil_path = None;
        config.database.backend = Backend::Snapshot;
        assert!(config.validate().is_err());
    }
}
