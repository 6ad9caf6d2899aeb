// crates/posture-core/tests/cache.rs
// ============================================================================
// Module: Cache Store Tests
// Description: Tests for the in-memory cache store.
// Purpose: Validate get/set/clear semantics and concurrent access.
// Dependencies: posture-core
// ============================================================================
//! ## Overview
//! Ensures the cache is last-write-wins, treats misses as normal outcomes,
//! clears by prefix or entirely, and tolerates concurrent readers and writers.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::thread;

use posture_core::ApiRequest;
use posture_core::CacheStore;
use posture_core::ClearScope;
use posture_core::MemoryCacheStore;
use serde_json::json;

/// Verifies a value written with set is returned by get.
#[test]
fn cache_get_after_set_returns_value() {
    let cache = MemoryCacheStore::new();
    cache.set("v1.0/users?", json!([{"id": "u1"}]));
    assert_eq!(cache.get("v1.0/users?"), Some(json!([{"id": "u1"}])));
}

/// Verifies a miss returns None and is counted.
#[test]
fn cache_miss_is_none() {
    let cache = MemoryCacheStore::new();
    assert_eq!(cache.get("v1.0/missing?"), None);
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 0);
}

/// Verifies a second set on the same key overwrites the first.
#[test]
fn cache_set_is_last_write_wins() {
    let cache = MemoryCacheStore::new();
    cache.set("key", json!(1));
    cache.set("key", json!(2));
    assert_eq!(cache.get("key"), Some(json!(2)));
    assert_eq!(cache.len(), 1);
}

/// Verifies prefix clears only remove matching keys.
#[test]
fn cache_clear_prefix_removes_matching_keys() {
    let cache = MemoryCacheStore::new();
    cache.set("v1.0/users?", json!([]));
    cache.set("v1.0/users/u1?", json!({}));
    cache.set("beta/policies?", json!([]));

    let removed = cache.clear(&ClearScope::Prefix("v1.0/users".to_string()));

    assert_eq!(removed, 2);
    assert_eq!(cache.get("beta/policies?"), Some(json!([])));
    assert!(cache.get("v1.0/users?").is_none());
}

/// Verifies clearing everything empties the cache.
#[test]
fn cache_clear_all_empties_store() {
    let cache = MemoryCacheStore::new();
    cache.set("a", json!(1));
    cache.set("b", json!(2));
    assert_eq!(cache.clear(&ClearScope::All), 2);
    assert!(cache.is_empty());
}

/// Verifies entries record their insertion time.
#[test]
fn cache_entry_exposes_insertion_time() {
    let cache = MemoryCacheStore::new();
    cache.set("key", json!(true));
    let entry = cache.entry("key").unwrap();
    assert_eq!(entry.key, "key");
    assert!(entry.inserted_at.as_unix_millis() > 0);
}

/// Verifies concurrent writers and readers never observe torn state.
#[test]
fn cache_is_safe_for_concurrent_access() {
    let cache = Arc::new(MemoryCacheStore::new());
    let handles: Vec<_> = (0 .. 8)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for idx in 0 .. 100 {
                    let key = format!("k{}", idx % 10);
                    cache.set(&key, json!(worker));
                    let value = cache.get(&key).unwrap();
                    assert!(value.as_i64().unwrap() < 8);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(cache.len(), 10);
}

/// Verifies identical requests share a key regardless of parameter insertion order.
#[test]
fn request_cache_key_is_order_independent() {
    let first = ApiRequest::get("/users/")
        .with_param("$top", "999")
        .with_filter("accountEnabled eq true")
        .with_select(["id", "displayName"]);
    let second = ApiRequest::get("users")
        .with_select(["id", "displayName"])
        .with_filter("accountEnabled eq true")
        .with_param("$top", "999");
    assert_eq!(first.cache_key(), second.cache_key());
    assert_eq!(
        first.cache_key(),
        "v1.0/users?$filter=accountEnabled eq true&$select=id,displayName&$top=999"
    );
}

/// Verifies version and filter distinguish cache keys.
#[test]
fn request_cache_key_separates_version_and_filter() {
    let stable = ApiRequest::get("policies");
    let beta = ApiRequest::get("policies").beta();
    let filtered = ApiRequest::get("policies").with_filter("state eq 'enabled'");
    assert_ne!(stable.cache_key(), beta.cache_key());
    assert_ne!(stable.cache_key(), filtered.cache_key());
}

/// Verifies delimiters inside parameter values cannot forge another request's key.
#[test]
fn request_cache_key_escapes_delimiters() {
    let smuggled = ApiRequest::get("users").with_param("x", "1&y=2");
    let separate = ApiRequest::get("users").with_param("x", "1").with_param("y", "2");
    assert_ne!(smuggled.cache_key(), separate.cache_key());
    assert_eq!(separate.cache_key(), "v1.0/users?x=1&y=2");

    let equals_in_name = ApiRequest::get("users").with_param("a=b", "c");
    let equals_in_value = ApiRequest::get("users").with_param("a", "b=c");
    assert_ne!(equals_in_name.cache_key(), equals_in_value.cache_key());

    let literal_escape = ApiRequest::get("users").with_param("x", "1%26y%3D2");
    assert_ne!(literal_escape.cache_key(), smuggled.cache_key());
}

/// Verifies only non-bypassing reads are cacheable.
#[test]
fn request_cacheability_follows_method_and_bypass() {
    assert!(ApiRequest::get("users").is_cacheable());
    assert!(!ApiRequest::get("users").bypass_cache().is_cacheable());
    let mutation =
        ApiRequest::mutate(posture_core::HttpMethod::Post, "users", Some(json!({"a": 1})));
    assert!(!mutation.is_cacheable());
}
