//! Reader-side access to the cache.

use crate::GuildsyncConfig;
use derive_getters::Getters;
use futures::future::try_join_all;
use guildsync_cache::FieldCacheConfig;
use guildsync_core::keys::CLIENT_ID_KEY;
use guildsync_core::{Guild, Snowflake};
use guildsync_error::{CacheError, CacheErrorKind, GuildsyncResult, JsonError};
use guildsync_shard::{InactiveShardCache, PeriodicTask, ShardCount, ShardRegistry};
use guildsync_store::SharedStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Name and icon of one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct GuildSummary {
    name: String,
    icon: Option<String>,
}

/// Entry point for processes that read the cache.
///
/// Readers never write guild data; they only hand out [`Guild`] handles and
/// aggregate the shard registry. Administrative resets are the exception.
///
/// # Example
///
/// ```
/// use guildsync::GuildManager;
/// use guildsync_shard::ShardCount;
/// use guildsync_store::MemoryStore;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let manager = GuildManager::new(Arc::new(MemoryStore::new()), ShardCount::ONE);
/// assert_eq!(manager.total_guild_count().await.unwrap(), 0);
/// assert!(manager.client_id().await.is_err());
/// # }
/// ```
#[derive(Clone)]
pub struct GuildManager {
    store: SharedStore,
    registry: ShardRegistry,
    inactive: Option<Arc<InactiveShardCache>>,
    cache_config: FieldCacheConfig,
}

impl std::fmt::Debug for GuildManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildManager")
            .field("registry", &self.registry)
            .field("tracks_inactive", &self.inactive.is_some())
            .finish()
    }
}

impl GuildManager {
    /// Create a manager for a cache built with `count` shards.
    pub fn new(store: SharedStore, count: ShardCount) -> Self {
        Self {
            registry: ShardRegistry::new(store.clone(), count),
            store,
            inactive: None,
            cache_config: FieldCacheConfig::default(),
        }
    }

    /// Manager set up from `config`, with inactive shards polled every
    /// `shard.poll_interval_secs`.
    ///
    /// The first poll completes before this returns. Stop the returned task
    /// on shutdown.
    #[instrument(skip(store, config), fields(shards = config.discord.shard_count))]
    pub async fn from_config(
        store: SharedStore,
        config: &GuildsyncConfig,
    ) -> GuildsyncResult<(Self, PeriodicTask)> {
        let count = config.shard_count()?;
        let inactive = Arc::new(InactiveShardCache::new(store.clone(), count));
        let initial = inactive.refresh().await?;
        info!(inactive = initial.len(), "Initial shard poll complete");

        let poller = inactive.start(config.poll_interval());
        let manager = Self::new(store, count)
            .with_cache_config(config.cache.clone())
            .with_inactive_cache(inactive);
        Ok((manager, poller))
    }

    /// Use `config` for the field cache of handed-out guild handles.
    pub fn with_cache_config(mut self, config: FieldCacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Answer [`guild_with_active_check`](Self::guild_with_active_check)
    /// from a polled cache instead of reading the marker each time.
    pub fn with_inactive_cache(mut self, cache: Arc<InactiveShardCache>) -> Self {
        self.inactive = Some(cache);
        self
    }

    /// The shard registry.
    pub fn registry(&self) -> &ShardRegistry {
        &self.registry
    }

    /// Handle to one guild. No store access happens until it is read.
    pub fn guild(&self, id: Snowflake) -> Guild {
        Guild::with_cache_config(id, self.store.clone(), self.cache_config.clone())
    }

    /// Handle to one guild, failing with [`CacheErrorKind::ShardInactive`]
    /// when its owning shard has no live heartbeat.
    pub async fn guild_with_active_check(&self, id: Snowflake) -> GuildsyncResult<Guild> {
        match &self.inactive {
            Some(cache) => cache.ensure_active(id)?,
            None => {
                let shard_id = self.registry.shard_for(id);
                if !self.registry.is_active(shard_id).await? {
                    return Err(CacheError::new(CacheErrorKind::ShardInactive {
                        shard_id,
                        guild_id: id.get(),
                    })
                    .into());
                }
            }
        }
        Ok(self.guild(id))
    }

    /// Shards without a live heartbeat.
    ///
    /// Answered from the polled cache when one is attached, otherwise by
    /// reading every shard's marker.
    pub async fn inactive_shards(&self) -> GuildsyncResult<Vec<u32>> {
        if let Some(cache) = &self.inactive {
            return Ok(cache.inactive_shards());
        }
        let mut inactive = Vec::new();
        for shard_id in self.registry.count().shard_ids() {
            if !self.registry.is_active(shard_id).await? {
                inactive.push(shard_id);
            }
        }
        Ok(inactive)
    }

    /// Guild counter of one shard.
    pub async fn guild_count(&self, shard_id: u32) -> GuildsyncResult<i64> {
        self.registry.guild_count(shard_id).await
    }

    /// Sum of every shard's guild counter.
    pub async fn total_guild_count(&self) -> GuildsyncResult<i64> {
        self.registry.total_guild_count().await
    }

    /// Name and icon of each cached, available guild among `ids`.
    ///
    /// Lookups run concurrently. Missing and unavailable guilds are left out.
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn guild_icons_and_names(
        &self,
        ids: &[Snowflake],
    ) -> GuildsyncResult<BTreeMap<Snowflake, GuildSummary>> {
        let summaries = try_join_all(ids.iter().map(|id| self.summary(*id))).await?;
        Ok(ids
            .iter()
            .copied()
            .zip(summaries)
            .filter_map(|(id, summary)| summary.map(|summary| (id, summary)))
            .collect())
    }

    async fn summary(&self, id: Snowflake) -> GuildsyncResult<Option<GuildSummary>> {
        let guild = self.guild(id);
        let name = match guild.name().await {
            Ok(name) => name,
            Err(err) if err.is_guild_not_found() || err.is_guild_unavailable() => {
                debug!(guild_id = %id, reason = %err, "Guild left out of summary");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let icon = guild.icon().await?;
        Ok(Some(GuildSummary { name, icon }))
    }

    /// User ID of the caching bot, recorded by the last ready.
    pub async fn client_id(&self) -> GuildsyncResult<Snowflake> {
        let raw = self
            .store
            .get(CLIENT_ID_KEY)
            .await?
            .ok_or_else(|| CacheError::new(CacheErrorKind::MissingClientId))?;
        raw.parse().map_err(|_| {
            JsonError::new(format!("stored client id {:?} is not a snowflake", raw)).into()
        })
    }

    /// Remove every key. Required before changing the shard count.
    #[instrument(skip(self))]
    pub async fn clear_cache(&self) -> GuildsyncResult<()> {
        self.store.flush().await?;
        warn!("Cache cleared");
        Ok(())
    }

    /// Remove the records of shards numbered `count` or higher.
    pub async fn clear_shards_above(&self, count: u32) -> GuildsyncResult<usize> {
        self.registry.clear_shards_above(count).await
    }
}
