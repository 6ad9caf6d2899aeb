// crates/posture-core/src/runtime/cache.rs
// ============================================================================
// Module: Posture In-Memory Cache
// Description: Process-lifetime memoization of API responses.
// Purpose: Serve repeated identical reads within a run without network calls.
// Dependencies: crate::{interfaces, model}, serde_json
// ============================================================================

//! ## Overview
//! [`MemoryCacheStore`] keeps at most one entry per key behind an internal
//! `RwLock`. There is no TTL and no eviction; entries live until an explicit
//! clear or process exit. A poisoned lock degrades to misses and no-op writes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde_json::Value;

use crate::interfaces::CacheStats;
use crate::interfaces::CacheStore;
use crate::interfaces::ClearScope;
use crate::model::time::Timestamp;

// ============================================================================
// SECTION: Entries
// ============================================================================

/// Stored cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Resource key (version, path, and sorted query parameters).
    pub key: String,
    /// Cached payload.
    pub value: Value,
    /// Time the entry was written.
    pub inserted_at: Timestamp,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Thread-safe in-memory cache store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    /// Entries keyed by resource key.
    entries: RwLock<BTreeMap<String, CacheEntry>>,
    /// Lookups that returned a value.
    hits: AtomicU64,
    /// Lookups that found nothing.
    misses: AtomicU64,
}

impl MemoryCacheStore {
    /// Creates an empty cache store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the full entry for `key`, including its insertion time.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().ok()?.get(key).cloned()
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns true when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Option<Value> {
        let value = self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).map(|entry| entry.value.clone()));
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    fn set(&self, key: &str, value: Value) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key.to_string(),
                CacheEntry {
                    key: key.to_string(),
                    value,
                    inserted_at: Timestamp::now(),
                },
            );
        }
    }

    fn clear(&self, scope: &ClearScope) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        match scope {
            ClearScope::All => entries.clear(),
            ClearScope::Prefix(prefix) => entries.retain(|key, _| !key.starts_with(prefix.as_str())),
        }
        before - entries.len()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
