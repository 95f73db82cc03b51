//! Status command handler.

use guildsync::{
    CacheErrorKind, GuildManager, GuildsyncConfig, GuildsyncResult, ObservedStore, RedisStore, SharedStore,
    Snowflake, StoreMetrics,
};
use std::sync::Arc;
use tracing::warn;

/// Connect to the configured store and print what the cache holds.
pub async fn run_status(config: &GuildsyncConfig, guild: Option<u64>) -> GuildsyncResult<()> {
    let metrics = StoreMetrics::new();
    let redis = RedisStore::connect(&config.store.endpoint).await?;
    let store: SharedStore = Arc::new(ObservedStore::new(
        Arc::new(redis),
        Arc::new(metrics.clone()),
    ));

    let (manager, poller) = GuildManager::from_config(store, config).await?;
    let result = report(&manager, config, guild).await;
    poller.stop().await;
    result?;

    println!("Store: {}", serde_json::to_string(&metrics.snapshot())?);
    Ok(())
}

async fn report(
    manager: &GuildManager,
    config: &GuildsyncConfig,
    guild: Option<u64>,
) -> GuildsyncResult<()> {
    for shard_id in manager.registry().count().shard_ids() {
        println!(
            "  shard {}: {} guilds",
            shard_id,
            manager.guild_count(shard_id).await?
        );
    }
    println!("  total: {} guilds", manager.total_guild_count().await?);

    let inactive = manager.inactive_shards().await?;
    if inactive.is_empty() {
        println!("All shards active");
    } else {
        println!("Inactive shards: {:?}", inactive);
    }

    match manager.client_id().await {
        Ok(client_id) => {
            println!("Client: {}", client_id);
            if let Some(expected) = config.discord.token_user_id()?
                && expected != client_id
            {
                warn!(%expected, cached = %client_id, "Cache was built by a different bot account");
            }
        }
        Err(err) if err.cache_kind() == Some(&CacheErrorKind::MissingClientId) => {
            println!("Client: none recorded")
        }
        Err(err) => return Err(err),
    }

    if let Some(id) = guild {
        let record = manager.guild(Snowflake::new(id)).to_static().await?;
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(())
}
