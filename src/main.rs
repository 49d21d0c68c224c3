//! ==============================================================================
//! main.rs - sensor hub host entry point
//! ==============================================================================
//!
//! purpose:
//!     serves live and historical environmental sensor readings (pressure,
//!     acceleration, tilt, rain, soil moisture, water level) from the realtime
//!     database to the dashboard front end, with a best-effort location for
//!     the rain and soil sensors.
//!
//! responsibilities:
//!     - load configuration (.env, host.toml, environment overrides)
//!     - open the tree store (realtime database or local snapshot)
//!     - serve the json api consumed by the dashboard
//!
//! relationships:
//!     - uses: config.rs (HostConfig), store.rs (TreeStore backends)
//!     - uses: fetch.rs (SensorService - the operations behind each route)
//!
//! architecture:
//!
//!     ┌─────────────────────────────────────────────────────────────┐
//!     │                    rust host (this file)                     │
//!     │  ┌──────────────────────────────────────────────────────┐   │
//!     │  │ web server (axum, CORS open for the dashboard)        │   │
//!     │  └──────────────────────────┬───────────────────────────┘   │
//!     │                      ┌──────┴──────┐                        │
//!     │                      │ SensorService│ <- fetch.rs           │
//!     │                      └──┬───────┬──┘                        │
//!     │          selector.rs ───┘       └─── location.rs            │
//!     └──────────────────────────┼──────────────────────────────────┘
//!                                │ TreeStore (read-only)
//!                    ┌───────────┴───────────┐
//!                    ▼                       ▼
//!             ┌─────────────┐         ┌─────────────┐
//!             │  firebase   │         │   json      │
//!             │  (REST)     │         │  snapshot   │
//!             └─────────────┘         └─────────────┘
//!
//! routes:
//!     GET /health               - liveness
//!     GET /api/connection       - database reachability
//!     GET /api/sensors/latest   - last N readings per stream + locations
//!     GET /api/sensors/all      - every reading per stream
//!
//! ==============================================================================

use anyhow::{Context, Result};
use axum::{extract::State, response::Json, routing::get, Router};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use sensor_hub::config;
use sensor_hub::domain::{ConnectionStatus, FetchResponse, SensorBundle};
use sensor_hub::fetch::SensorService;
use sensor_hub::store;

// ==============================================================================
// main entry point
// ==============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: environment (.env is optional)
    dotenvy::dotenv().ok();

    // step 2: load configuration
    let config = config::HostConfig::load_or_default();
    init_logging(&config.logging.level);

    tracing::info!("===========================================================");
    tracing::info!("  Sensor Hub Host");
    tracing::info!("===========================================================");
    config.print_summary();

    // missing database settings are the one fatal startup error
    if let Err(e) = config.validate() {
        tracing::error!("[STARTUP] Invalid configuration: {:#}", e);
        return Err(e);
    }

    // step 3: open the store
    let store = store::open(&config.database).context("failed to open sensor store")?;
    tracing::info!("[STARTUP] ✓ Store ready");

    // step 4: serve
    let service = SensorService::new(store, &config);
    run_server(&config.server.bind_addr, service).await
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// ==============================================================================
// web server
// ==============================================================================

async fn run_server(bind_addr: &str, service: SensorService) -> Result<()> {
    let app = build_router(service);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("[STARTUP] ✓ API live at http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(service: SensorService) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/connection", get(connection_handler))
        .route("/api/sensors/latest", get(latest_handler))
        .route("/api/sensors/all", get(all_handler))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// database reachability, always 200 with the outcome in the body
async fn connection_handler(State(service): State<SensorService>) -> Json<ConnectionStatus> {
    Json(service.test_connection().await)
}

/// latest readings per stream with resolved rain/soil locations
async fn latest_handler(State(service): State<SensorService>) -> Json<FetchResponse<SensorBundle>> {
    Json(service.fetch_latest().await)
}

async fn all_handler(State(service): State<SensorService>) -> Json<FetchResponse<SensorBundle>> {
    Json(service.fetch_all().await)
}
