//! Per-shard guild sets and counters.

use crate::ShardCount;
use guildsync_core::Snowflake;
use guildsync_core::keys::{
    SHARD_COUNT_KEY, SHARD_KEY_PATTERN, parse_shard_key, shard_active_key, shard_guild_count_key,
    shard_key,
};
use guildsync_error::{CacheError, CacheErrorKind, GuildsyncResult, JsonError};
use guildsync_store::{JsonPath, SharedStore};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Tracks which guilds each shard owns and how many.
///
/// Guild sets are JSON arrays at `shard:{n}` maintained with
/// index-then-append and index-then-pop, so replays never duplicate or
/// double-remove an ID. Counters at `shard:{n}:guild_count` are maintained
/// incrementally by the event handlers.
#[derive(Clone)]
pub struct ShardRegistry {
    store: SharedStore,
    count: ShardCount,
}

impl std::fmt::Debug for ShardRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardRegistry")
            .field("count", &self.count)
            .finish()
    }
}

fn parse_count(key: &str, raw: &str) -> GuildsyncResult<i64> {
    raw.parse()
        .map_err(|_| JsonError::new(format!("{} holds non-integer {:?}", key, raw)).into())
}

impl ShardRegistry {
    /// Create a registry over `store` for `count` shards.
    pub fn new(store: SharedStore, count: ShardCount) -> Self {
        Self { store, count }
    }

    /// Configured shard count.
    pub fn count(&self) -> ShardCount {
        self.count
    }

    /// Shard owning `guild_id`.
    pub fn shard_for(&self, guild_id: Snowflake) -> u32 {
        self.count.shard_for(guild_id)
    }

    /// Check the configured count against the one the cache was built with.
    ///
    /// Records the configured count when none is stored yet. A different
    /// stored count fails with [`CacheErrorKind::ShardCountMismatch`], which
    /// is fatal: continuing would silently reassign guilds between shards.
    #[instrument(skip(self), fields(configured = %self.count))]
    pub async fn verify_shard_count(&self) -> GuildsyncResult<()> {
        let configured = self.count.get();
        match self.store.get(SHARD_COUNT_KEY).await? {
            None => {
                self.store
                    .set(SHARD_COUNT_KEY, &configured.to_string(), None)
                    .await?;
                info!("Recorded shard count");
                Ok(())
            }
            Some(raw) => {
                let persisted = parse_count(SHARD_COUNT_KEY, &raw)?;
                if persisted == i64::from(configured) {
                    debug!("Shard count matches cache");
                    return Ok(());
                }
                Err(CacheError::new(CacheErrorKind::ShardCountMismatch {
                    configured,
                    persisted: u32::try_from(persisted).unwrap_or(u32::MAX),
                })
                .into())
            }
        }
    }

    /// Guild IDs registered under `shard_id`, in insertion order.
    pub async fn guild_ids(&self, shard_id: u32) -> GuildsyncResult<Vec<Snowflake>> {
        let value = self
            .store
            .json_get(&shard_key(shard_id), &JsonPath::root())
            .await?;
        match value {
            None => Ok(Vec::new()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    /// Replace the guild set of `shard_id`.
    #[instrument(skip(self, ids), fields(guilds = ids.len()))]
    pub async fn replace_guild_ids(&self, shard_id: u32, ids: &[Snowflake]) -> GuildsyncResult<()> {
        let value = Value::Array(ids.iter().map(|id| id.to_json()).collect());
        self.store
            .json_set(&shard_key(shard_id), &JsonPath::root(), value)
            .await?;
        Ok(())
    }

    /// Register `guild_id` under its shard. Returns `false` if already present.
    #[instrument(skip(self))]
    pub async fn insert_guild(&self, guild_id: Snowflake) -> GuildsyncResult<bool> {
        let key = shard_key(self.shard_for(guild_id));
        let root = JsonPath::root();
        let value = guild_id.to_json();

        match self.store.arr_index(&key, &root, &value).await {
            Ok(-1) => {
                self.store.arr_append(&key, &root, value).await?;
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(err) if err.is_key_not_found() => {
                self.store
                    .json_set(&key, &root, Value::Array(vec![value]))
                    .await?;
                Ok(true)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Unregister `guild_id` from its shard. Returns `false` if it was absent.
    #[instrument(skip(self))]
    pub async fn remove_guild(&self, guild_id: Snowflake) -> GuildsyncResult<bool> {
        let key = shard_key(self.shard_for(guild_id));
        let root = JsonPath::root();

        let index = match self.store.arr_index(&key, &root, &guild_id.to_json()).await {
            Ok(index) => index,
            Err(err) if err.is_key_not_found() => -1,
            Err(err) => return Err(err.into()),
        };
        if index == -1 {
            return Ok(false);
        }
        self.store.arr_pop(&key, &root, index).await?;
        Ok(true)
    }

    /// Set the guild counter of `shard_id` to zero.
    pub async fn reset_guild_count(&self, shard_id: u32) -> GuildsyncResult<()> {
        self.store
            .set(&shard_guild_count_key(shard_id), "0", None)
            .await?;
        Ok(())
    }

    /// Increment the guild counter of `shard_id`.
    pub async fn increment_guild_count(&self, shard_id: u32) -> GuildsyncResult<i64> {
        Ok(self.store.incr(&shard_guild_count_key(shard_id)).await?)
    }

    /// Decrement the guild counter of `shard_id`.
    pub async fn decrement_guild_count(&self, shard_id: u32) -> GuildsyncResult<i64> {
        Ok(self.store.decr(&shard_guild_count_key(shard_id)).await?)
    }

    /// Guild counter of `shard_id`, zero when never written.
    pub async fn guild_count(&self, shard_id: u32) -> GuildsyncResult<i64> {
        let key = shard_guild_count_key(shard_id);
        match self.store.get(&key).await? {
            None => Ok(0),
            Some(raw) => parse_count(&key, &raw),
        }
    }

    /// Sum of every shard's guild counter.
    pub async fn total_guild_count(&self) -> GuildsyncResult<i64> {
        let mut total = 0;
        for shard_id in self.count.shard_ids() {
            total += self.guild_count(shard_id).await?;
        }
        Ok(total)
    }

    /// Whether `shard_id` has a live heartbeat marker.
    pub async fn is_active(&self, shard_id: u32) -> GuildsyncResult<bool> {
        Ok(self.store.get(&shard_active_key(shard_id)).await?.is_some())
    }

    /// Delete every per-shard key of shards numbered `count` or higher.
    ///
    /// Used after lowering the shard count of a cleared cache, so stale
    /// shards do not linger in scans. Returns the number of keys removed.
    #[instrument(skip(self))]
    pub async fn clear_shards_above(&self, count: u32) -> GuildsyncResult<usize> {
        let keys = self.store.scan_all(SHARD_KEY_PATTERN).await?;
        let mut removed = 0;
        for key in keys {
            if parse_shard_key(&key).is_some_and(|shard_id| shard_id >= count)
                && self.store.del(&key).await?
            {
                removed += 1;
            }
        }
        if removed > 0 {
            warn!(removed, "Removed keys of shards beyond count");
        }
        Ok(removed)
    }
}
