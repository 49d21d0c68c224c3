//! ==============================================================================
//! store.rs - key-value tree store abstraction
//! ==============================================================================
//!
//! purpose:
//!     provides a unified read-only interface to the realtime database tree.
//!     abstracts away the difference between the hosted database (reached
//!     over its REST endpoint) and a local json snapshot (used offline and
//!     in tests).
//!
//! design:
//!     - the hub never writes; the trait only exposes reads.
//!     - "absent" is `Ok(None)`, failures are `Err(StoreError)`. callers that
//!       only probe (the location resolver) fold both into "not found".
//!     - paths are absolute, `/`-separated, and validated the same way for
//!       every backend.
//!
//! relationships:
//!     - used by: fetch.rs (collection reads), location.rs (probes)
//!     - implemented by: store/firebase.rs, store/memory.rs
//!
//! ==============================================================================

pub mod firebase;
pub mod memory;

use crate::config::{Backend, DatabaseConfig};
use crate::domain::ReadingCollection;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;

pub use firebase::FirebaseStore;
pub use memory::MemoryStore;

/// errors a store read can produce
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} reading {path}")]
    Status { status: u16, path: String },
    #[error("invalid json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait TreeStore: Send + Sync {
    /// read the node at `path`, `None` when nothing is stored there
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// read up to `n` of the last children of `path`, in key order
    async fn read_last_n(&self, path: &str, n: usize) -> Result<ReadingCollection, StoreError>;

    /// read `path` with every child replaced by `true`, for cheap
    /// reachability checks
    async fn read_shallow(&self, path: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read(path).await?.map(shallow))
    }
}

/// open the store selected by the database config
pub fn open(config: &DatabaseConfig) -> Result<Arc<dyn TreeStore>, StoreError> {
    match config.backend {
        Backend::Firebase => {
            tracing::info!("Using realtime database at {}", config.url);
            Ok(Arc::new(FirebaseStore::new(config)?))
        }
        Backend::Snapshot => {
            let path = config
                .snapshot_path
                .as_ref()
                .ok_or_else(|| StoreError::Unavailable("no snapshot_path configured".into()))?;
            tracing::info!("Using json snapshot at {}", path.display());
            Ok(Arc::new(MemoryStore::from_file(path)?))
        }
    }
}

/// split an absolute path into its segments, rejecting characters the
/// database does not allow in keys
pub fn segments(path: &str) -> Result<Vec<&str>, StoreError> {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if parts.iter().any(|s| !is_valid_key(s)) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(parts)
}

/// `/a/b` form of a path, `/` for the root
pub fn normalize(path: &str) -> Result<String, StoreError> {
    Ok(format!("/{}", segments(path)?.join("/")))
}

/// true when `key` can be used as a single path segment
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(['/', '.', '#', '$', '[', ']'])
}

/// database key order: integer-like keys first (numerically), then the rest
/// lexicographically
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    match (as_int_key(a), as_int_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn as_int_key(key: &str) -> Option<i64> {
    let digits = key.strip_prefix('-').unwrap_or(key);
    if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
        return None;
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

/// children of a collection node. the database hands back sequential
/// integer keys as an array; those are keyed by index with null slots dropped
pub fn into_collection(value: Option<Value>) -> ReadingCollection {
    match value {
        Some(Value::Object(map)) => map,
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(i, item)| (i.to_string(), item))
            .collect(),
        _ => Map::new(),
    }
}

/// children of `value` sorted in key order, keeping only the last `n`
pub fn last_n_children(value: Option<Value>, n: usize) -> ReadingCollection {
    let mut entries: Vec<(String, Value)> = into_collection(value).into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));
    let skip = entries.len().saturating_sub(n);
    entries.into_iter().skip(skip).collect()
}

/// `value` with each child collapsed to `true`
pub fn shallow(value: Value) -> Value {
    match value {
        Value::Object(_) | Value::Array(_) => {
            Value::Object(into_collection(Some(value)).into_iter().map(|(k, _)| (k, Value::Bool(true))).collect())
        }
        leaf => leaf,
    }
}
