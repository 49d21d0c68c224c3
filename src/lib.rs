//! sensor hub: latest/historical sensor readings from a realtime database
//! tree, with best-effort location resolution for the rain and soil sensors.
//!
//! the binary in main.rs wires these modules to an axum server.

pub mod config;
pub mod domain;
pub mod fetch;
pub mod location;
pub mod selector;
pub mod store;
