//! Tests for shard guild sets, counters and the shard-count invariant.

use guildsync_core::Snowflake;
use guildsync_core::keys::{SHARD_COUNT_KEY, shard_active_key};
use guildsync_error::CacheErrorKind;
use guildsync_shard::{ShardCount, ShardRegistry};
use guildsync_store::{DocumentStore, MemoryStore, SharedStore};
use std::sync::Arc;

fn registry(count: u32) -> (Arc<MemoryStore>, ShardRegistry) {
    let store = Arc::new(MemoryStore::new());
    let shared: SharedStore = store.clone();
    (store, ShardRegistry::new(shared, ShardCount::new(count).unwrap()))
}

/// A guild ID owned by `shard` under any count above `shard`.
fn guild_on(shard: u64, salt: u64) -> Snowflake {
    Snowflake::new(((shard + 1000 * salt) << 22) | salt)
}

#[tokio::test]
async fn test_insert_is_idempotent() {
    let (_, registry) = registry(1);
    let guild = guild_on(0, 1);

    assert!(registry.insert_guild(guild).await.unwrap());
    assert!(!registry.insert_guild(guild).await.unwrap());
    assert_eq!(registry.guild_ids(0).await.unwrap(), vec![guild]);
}

#[tokio::test]
async fn test_insert_uses_owning_shard() {
    let (_, registry) = registry(4);
    let guild = guild_on(3, 0);
    assert_eq!(registry.shard_for(guild), 3);

    registry.insert_guild(guild).await.unwrap();
    assert_eq!(registry.guild_ids(3).await.unwrap(), vec![guild]);
    assert!(registry.guild_ids(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_only_when_present() {
    let (_, registry) = registry(1);
    let a = guild_on(0, 1);
    let b = guild_on(0, 2);

    assert!(!registry.remove_guild(a).await.unwrap());

    registry.replace_guild_ids(0, &[a, b]).await.unwrap();
    assert!(registry.remove_guild(a).await.unwrap());
    assert!(!registry.remove_guild(a).await.unwrap());
    assert_eq!(registry.guild_ids(0).await.unwrap(), vec![b]);
}

#[tokio::test]
async fn test_counters_and_total() {
    let (_, registry) = registry(2);
    assert_eq!(registry.guild_count(0).await.unwrap(), 0);

    registry.reset_guild_count(0).await.unwrap();
    registry.increment_guild_count(0).await.unwrap();
    registry.increment_guild_count(0).await.unwrap();
    registry.increment_guild_count(1).await.unwrap();
    registry.decrement_guild_count(0).await.unwrap();

    assert_eq!(registry.guild_count(0).await.unwrap(), 1);
    assert_eq!(registry.guild_count(1).await.unwrap(), 1);
    assert_eq!(registry.total_guild_count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_shard_count_recorded_then_verified() {
    let (store, registry) = registry(2);
    registry.verify_shard_count().await.unwrap();
    assert_eq!(store.get(SHARD_COUNT_KEY).await.unwrap().as_deref(), Some("2"));

    registry.verify_shard_count().await.unwrap();
}

#[tokio::test]
async fn test_shard_count_mismatch_is_fatal() {
    let (store, registry) = registry(2);
    store.set(SHARD_COUNT_KEY, "3", None).await.unwrap();

    let err = registry.verify_shard_count().await.unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        err.cache_kind(),
        Some(CacheErrorKind::ShardCountMismatch {
            configured: 2,
            persisted: 3
        })
    ));
}

#[tokio::test]
async fn test_clear_shards_above() {
    let (store, registry) = registry(4);
    for shard in 0..4u64 {
        registry.insert_guild(guild_on(shard, 0)).await.unwrap();
        registry.increment_guild_count(shard as u32).await.unwrap();
    }
    store.set(&shard_active_key(3), "1", None).await.unwrap();
    store.set(SHARD_COUNT_KEY, "4", None).await.unwrap();

    let removed = registry.clear_shards_above(2).await.unwrap();
    assert_eq!(removed, 5);
    assert_eq!(registry.guild_ids(1).await.unwrap().len(), 1);
    assert!(registry.guild_ids(2).await.unwrap().is_empty());
    assert!(store.get(SHARD_COUNT_KEY).await.unwrap().is_some());
}
