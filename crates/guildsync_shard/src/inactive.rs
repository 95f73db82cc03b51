//! Reader-side tracking of shards without a live heartbeat.

use crate::{PeriodicTask, ShardCount, shard_id_for};
use guildsync_core::Snowflake;
use guildsync_core::keys::shard_active_key;
use guildsync_error::{CacheError, CacheErrorKind, GuildsyncResult};
use guildsync_store::SharedStore;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Default period between polls of the liveness markers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Set of shards whose liveness marker has expired, refreshed by polling.
///
/// Guilds owned by an inactive shard may be stale or mid-migration, so
/// lookups refuse them with [`CacheErrorKind::ShardInactive`]. Until the
/// first poll every shard is assumed active.
pub struct InactiveShardCache {
    store: SharedStore,
    count: ShardCount,
    inactive: RwLock<BTreeSet<u32>>,
}

impl std::fmt::Debug for InactiveShardCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InactiveShardCache")
            .field("count", &self.count)
            .field("inactive", &*self.inactive.read())
            .finish()
    }
}

impl InactiveShardCache {
    /// Create a cache for shards `0..count`.
    pub fn new(store: SharedStore, count: ShardCount) -> Self {
        Self {
            store,
            count,
            inactive: RwLock::new(BTreeSet::new()),
        }
    }

    /// Poll every shard's marker and replace the inactive set.
    #[instrument(skip(self), fields(shards = %self.count))]
    pub async fn refresh(&self) -> GuildsyncResult<BTreeSet<u32>> {
        let mut inactive = BTreeSet::new();
        for shard_id in self.count.shard_ids() {
            if self.store.get(&shard_active_key(shard_id)).await?.is_none() {
                inactive.insert(shard_id);
            }
        }

        let previous = std::mem::replace(&mut *self.inactive.write(), inactive.clone());
        for shard_id in inactive.difference(&previous) {
            warn!(shard_id, "Shard became inactive");
        }
        for shard_id in previous.difference(&inactive) {
            info!(shard_id, "Shard active again");
        }
        Ok(inactive)
    }

    /// Whether `shard_id` was inactive at the last poll.
    pub fn is_inactive(&self, shard_id: u32) -> bool {
        self.inactive.read().contains(&shard_id)
    }

    /// Shards inactive at the last poll.
    pub fn inactive_shards(&self) -> Vec<u32> {
        self.inactive.read().iter().copied().collect()
    }

    /// Fail with [`CacheErrorKind::ShardInactive`] if the shard owning
    /// `guild_id` was inactive at the last poll.
    pub fn ensure_active(&self, guild_id: Snowflake) -> GuildsyncResult<()> {
        let shard_id = shard_id_for(guild_id, self.count);
        if self.is_inactive(shard_id) {
            return Err(CacheError::new(CacheErrorKind::ShardInactive {
                shard_id,
                guild_id: guild_id.get(),
            })
            .into());
        }
        Ok(())
    }

    /// Poll on `period` until the task is stopped. The first poll is
    /// immediate.
    pub fn start(self: &Arc<Self>, period: Duration) -> PeriodicTask {
        let cache = Arc::clone(self);
        PeriodicTask::spawn("inactive-shard-poll", period, move || {
            let cache = cache.clone();
            async move { cache.refresh().await.map(|_| ()) }
        })
    }
}
