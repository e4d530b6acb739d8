//! Temporary, call-counted response overrides.
//!
//! An override preempts routing, auth and handlers for a specific path and
//! method until its use count is exhausted, then removes itself. Paths are
//! normalized (trailing slash stripped) and methods uppercased on both
//! registration and lookup. A registered path ending in `/*` acts as a
//! prefix wildcard against the normalized request path.

use crate::response::ApiResponse;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone)]
struct OverrideEntry {
    body: Value,
    status: u16,
    headers: HashMap<String, String>,
    used: u32,
    total: u32,
}

/// A read-only view of a registered override, for introspection and tests.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OverrideSnapshot {
    pub path: String,
    pub method: String,
    pub status: u16,
    pub used: u32,
    pub total: u32,
}

/// Registered overrides, keyed by normalized path then method.
///
/// Path buckets are ordered so the wildcard scan is deterministic. Exact
/// path matches always take priority over wildcards, and at most one entry
/// is consumed per request.
#[derive(Debug, Default)]
pub struct ResponseOverrides {
    entries: RwLock<BTreeMap<String, HashMap<String, OverrideEntry>>>,
}

impl ResponseOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) an override for the exact path+method key.
    /// `total_uses` below 1 is treated as 1.
    pub fn add(
        &self,
        path: &str,
        method: &str,
        body: Value,
        total_uses: u32,
        status: u16,
        headers: HashMap<String, String>,
    ) {
        let path = normalize_path(path);
        let method = method.to_uppercase();
        debug!(path, method, status, total_uses, "registered temporary response");

        let mut entries = self.entries.write();
        entries.entry(path).or_default().insert(
            method,
            OverrideEntry {
                body,
                status,
                headers,
                used: 0,
                total: total_uses.max(1),
            },
        );
    }

    /// Consume one use of the first matching override, removing it when
    /// exhausted. Returns `None` when nothing matches, in which case normal
    /// routing proceeds.
    pub fn consume(&self, path: &str, method: &str) -> Option<ApiResponse> {
        let path = normalize_path(path);
        let method = method.to_uppercase();
        let mut entries = self.entries.write();

        if let Some(response) = consume_at(&mut entries, &path, &method) {
            debug!(path, method, "served exact temporary response");
            return Some(response);
        }

        let wildcard_keys: Vec<String> = entries
            .keys()
            .filter(|key| key.ends_with("/*"))
            .cloned()
            .collect();

        for key in wildcard_keys {
            let prefix = &key[..key.len() - 2];
            if !path.starts_with(prefix) {
                continue;
            }
            if let Some(response) = consume_at(&mut entries, &key, &method) {
                debug!(path, method, wildcard = key, "served wildcard temporary response");
                return Some(response);
            }
        }

        None
    }

    /// Snapshot of all live entries with their usage counters.
    pub fn list(&self) -> Vec<OverrideSnapshot> {
        let entries = self.entries.read();
        entries
            .iter()
            .flat_map(|(path, methods)| {
                methods.iter().map(|(method, entry)| OverrideSnapshot {
                    path: path.clone(),
                    method: method.clone(),
                    status: entry.status,
                    used: entry.used,
                    total: entry.total,
                })
            })
            .collect()
    }

    /// Remove every registered override.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn consume_at(
    entries: &mut BTreeMap<String, HashMap<String, OverrideEntry>>,
    path: &str,
    method: &str,
) -> Option<ApiResponse> {
    let bucket = entries.get_mut(path)?;
    let entry = bucket.get_mut(method)?;

    entry.used += 1;
    let response = ApiResponse::with_status(entry.body.clone(), entry.status)
        .with_headers(entry.headers.clone());

    if entry.used >= entry.total {
        bucket.remove(method);
        if bucket.is_empty() {
            entries.remove(path);
        }
    }

    Some(response)
}

/// Strip a trailing slash; an empty result normalizes to `/`.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
