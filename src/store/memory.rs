//! in-memory tree store
//!
//! holds a whole database tree as one json value. loaded from an exported
//! snapshot for offline runs; in tests it doubles as an instrumented fake
//! (every read is logged, chosen paths can be made to fail).

use super::{last_n_children, normalize, segments, StoreError, TreeStore};
use crate::domain::ReadingCollection;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

pub struct MemoryStore {
    root: Value,
    failing: HashSet<String>,
    reads: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new(root: Value) -> Self {
        Self { root, failing: HashSet::new(), reads: Mutex::new(Vec::new()) }
    }

    /// load a json export of the database
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let root: Value = serde_json::from_str(&content)?;
        Ok(Self::new(root))
    }

    /// make every read of `path` fail with `StoreError::Unavailable`
    pub fn fail_on(mut self, path: &str) -> Self {
        if let Ok(p) = normalize(path) {
            self.failing.insert(p);
        }
        self
    }

    /// normalized paths read so far, in order
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_reads(&self) {
        self.reads.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn lookup(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let normalized = normalize(path)?;
        self.reads.lock().unwrap_or_else(|e| e.into_inner()).push(normalized.clone());

        if self.failing.contains(&normalized) {
            return Err(StoreError::Unavailable(format!("read of {} refused", normalized)));
        }

        let mut node = &self.root;
        for segment in segments(path)? {
            let child = match node {
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => node.get(segment),
            };
            match child {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }

        // the database never stores nulls or empty objects
        match node {
            Value::Null => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            Value::Array(items) if items.iter().all(Value::is_null) => Ok(None),
            other => Ok(Some(other.clone())),
        }
    }
}

#[async_trait]
impl TreeStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        tracing::debug!("[MEMORY] read {}", path);
        self.lookup(path)
    }

    async fn read_last_n(&self, path: &str, n: usize) -> Result<ReadingCollection, StoreError> {
        tracing::debug!("[MEMORY] read last {} of {}", n, path);
        Ok(last_n_children(self.lookup(path)?, n))
    }
}
