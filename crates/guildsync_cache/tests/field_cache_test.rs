//! Tests for per-field caching.

use guildsync_cache::{FieldCache, FieldCacheConfig, FieldCacheConfigBuilder};
use serde_json::json;
use std::thread::sleep;
use std::time::Duration;

#[test]
fn test_cache_insert_and_get() {
    let mut cache = FieldCache::new(FieldCacheConfig::default());

    cache.insert("name", json!("Lounge"), None);

    let entry = cache.get("name").unwrap();
    assert_eq!(entry.value(), &json!("Lounge"));
    let remaining = entry.time_remaining().unwrap();
    assert!(remaining <= Duration::from_secs(15));
    assert!(remaining > Duration::from_secs(14));
}

#[test]
fn test_cache_miss() {
    let mut cache = FieldCache::default();
    assert!(cache.get("icon").is_none());
}

#[test]
fn test_cache_expiration() {
    let mut cache = FieldCache::default();

    cache.insert("owner_id", json!("1"), Some(Duration::from_millis(50)));
    assert!(cache.get("owner_id").is_some());

    sleep(Duration::from_millis(100));

    assert!(cache.get("owner_id").is_none());
    assert!(cache.is_empty());
}

#[test]
fn test_cache_invalidate() {
    let mut cache = FieldCache::default();
    cache.insert("botMemberRoles", json!(["1", "2"]), None);
    cache.invalidate("botMemberRoles");
    assert!(cache.get("botMemberRoles").is_none());
}

#[test]
fn test_cache_cleanup_expired() {
    let mut cache = FieldCache::default();

    cache.insert("name", json!("a"), Some(Duration::from_millis(20)));
    cache.insert("icon", json!(null), None);
    assert_eq!(cache.len(), 2);

    sleep(Duration::from_millis(60));

    assert_eq!(cache.cleanup_expired(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_cache_lru_eviction() {
    let config = FieldCacheConfigBuilder::default()
        .ttl_secs(15)
        .max_size(2)
        .enabled(true)
        .build()
        .unwrap();
    let mut cache = FieldCache::new(config);

    cache.insert("name", json!("a"), None);
    cache.insert("icon", json!("b"), None);

    // Touch name so icon becomes least recently used
    assert!(cache.get("name").is_some());

    cache.insert("owner_id", json!("c"), None);

    assert_eq!(cache.len(), 2);
    assert!(cache.get("icon").is_none());
    assert!(cache.get("name").is_some());
    assert!(cache.get("owner_id").is_some());
}

#[test]
fn test_cache_disabled() {
    let config = FieldCacheConfig::default().with_enabled(false);
    let mut cache = FieldCache::new(config);

    cache.insert("name", json!("a"), None);

    assert!(cache.get("name").is_none());
    assert_eq!(cache.len(), 0);
}

#[test]
fn test_cache_clear() {
    let mut cache = FieldCache::default();
    cache.insert("name", json!("a"), None);
    cache.clear();
    assert!(cache.is_empty());
}
