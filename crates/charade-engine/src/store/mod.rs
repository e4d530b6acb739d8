//! Scoped in-memory item store with optional snapshot persistence.
//!
//! Items live under a three-level key: `collection -> scope -> id`. Scopes
//! partition tenants; items in one scope are invisible to another. The store
//! can load a JSON snapshot at construction and writes one back on drop,
//! both best-effort: a missing or corrupt snapshot never fails construction.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

type Items = HashMap<String, Value>;
type Scopes = HashMap<String, Items>;
type Collections = HashMap<String, Scopes>;

/// Key-value store keyed by `(collection, scope, id)`.
///
/// Single-process cooperative use only: the inner lock gives `&self` method
/// ergonomics, not a cross-writer concurrency contract.
#[derive(Debug, Default)]
pub struct ScopedStore {
    data: RwLock<Collections>,
    snapshot_path: Option<PathBuf>,
}

impl ScopedStore {
    /// An empty store with no snapshot backing.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store backed by a snapshot file. If the file exists and parses, its
    /// contents seed the store; otherwise the store starts empty.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = load_snapshot(&path);
        Self {
            data: RwLock::new(data),
            snapshot_path: Some(path),
        }
    }

    /// Insert an item unless the id already exists in that scope. The
    /// existing value is left intact; this is the idempotent counterpart
    /// of [`put`](Self::put).
    pub fn add(&self, collection: &str, scope: &str, id: &str, item: Value) {
        let mut data = self.data.write();
        let items = data
            .entry(collection.to_string())
            .or_default()
            .entry(scope.to_string())
            .or_default();
        items.entry(id.to_string()).or_insert(item);
    }

    /// Unconditional upsert.
    pub fn put(&self, collection: &str, scope: &str, id: &str, item: Value) {
        let mut data = self.data.write();
        data.entry(collection.to_string())
            .or_default()
            .entry(scope.to_string())
            .or_default()
            .insert(id.to_string(), item);
    }

    /// Fetch a single item.
    pub fn get(&self, collection: &str, scope: &str, id: &str) -> Option<Value> {
        let data = self.data.read();
        data.get(collection)?.get(scope)?.get(id).cloned()
    }

    /// Fetch every item in a scope. Order is not significant.
    pub fn list(&self, collection: &str, scope: &str) -> Vec<Value> {
        let data = self.data.read();
        data.get(collection)
            .and_then(|scopes| scopes.get(scope))
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether an item exists.
    pub fn has(&self, collection: &str, scope: &str, id: &str) -> bool {
        let data = self.data.read();
        data.get(collection)
            .and_then(|scopes| scopes.get(scope))
            .is_some_and(|items| items.contains_key(id))
    }

    /// Whether the scope exists at all under the collection.
    pub fn has_scope(&self, collection: &str, scope: &str) -> bool {
        let data = self.data.read();
        data.get(collection)
            .is_some_and(|scopes| scopes.contains_key(scope))
    }

    /// Remove an item, returning it if present.
    pub fn remove(&self, collection: &str, scope: &str, id: &str) -> Option<Value> {
        let mut data = self.data.write();
        data.get_mut(collection)?.get_mut(scope)?.remove(id)
    }

    /// Wipe everything.
    pub fn clear(&self) {
        self.data.write().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn is_collection_empty(&self, collection: &str) -> bool {
        let data = self.data.read();
        data.get(collection).map_or(true, |scopes| scopes.is_empty())
    }

    pub fn is_scope_empty(&self, collection: &str, scope: &str) -> bool {
        let data = self.data.read();
        data.get(collection)
            .and_then(|scopes| scopes.get(scope))
            .map_or(true, |items| items.is_empty())
    }

    /// Serialize the full contents to the configured snapshot path, or to an
    /// explicit path. No-op when neither is set.
    pub fn save(&self) -> std::io::Result<()> {
        match &self.snapshot_path {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }

    /// Serialize the full contents to `path` as JSON.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let data = self.data.read();
        let json = serde_json::to_string(&*data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        fs::write(path, json)?;
        debug!(?path, collections = data.len(), "saved store snapshot");
        Ok(())
    }
}

impl Drop for ScopedStore {
    fn drop(&mut self) {
        // Advisory persistence: losing the snapshot must never panic a test.
        if self.snapshot_path.is_some() {
            if let Err(e) = self.save() {
                warn!("failed to save store snapshot on drop: {e}");
            }
        }
    }
}

fn load_snapshot(path: &Path) -> Collections {
    if !path.exists() {
        debug!(?path, "no store snapshot, starting empty");
        return Collections::default();
    }

    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(data) => {
                debug!(?path, "loaded store snapshot");
                data
            }
            Err(e) => {
                warn!(?path, "corrupt store snapshot, starting empty: {e}");
                Collections::default()
            }
        },
        Err(e) => {
            warn!(?path, "unreadable store snapshot, starting empty: {e}");
            Collections::default()
        }
    }
}
