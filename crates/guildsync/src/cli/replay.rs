//! Replay command handler.

use guildsync::{
    DispatchMetrics, GuildManager, GuildsyncConfig, GuildsyncResult, MemoryStore, ObservedStore,
    SharedStore, ShardSession, Snowflake, StoreMetrics, replay,
};
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::BufReader;

/// Replay `events` into a fresh in-memory cache and print what it holds.
pub async fn run_replay(
    config: &GuildsyncConfig,
    events: &Path,
    dump: Option<u64>,
) -> GuildsyncResult<()> {
    let store_metrics = StoreMetrics::new();
    let dispatch_metrics = DispatchMetrics::new();
    let store: SharedStore = Arc::new(ObservedStore::new(
        Arc::new(MemoryStore::new()),
        Arc::new(store_metrics.clone()),
    ));
    let mut session = ShardSession::new(store.clone(), config.session_config()?)
        .with_observer(Arc::new(dispatch_metrics.clone()));

    let file = File::open(events).await?;
    let summary = replay(&mut session, BufReader::new(file)).await?;

    println!(
        "Replayed {} events ({} skipped) from {}",
        summary.events(),
        summary.skipped(),
        events.display()
    );
    for (shard_id, count) in summary.shard_counts() {
        println!("  shard {}: {} guilds", shard_id, count);
    }
    println!("  total: {} guilds", summary.total_guilds());
    println!(
        "Dispatch: {}",
        serde_json::to_string(&dispatch_metrics.snapshot())?
    );
    println!("Store: {}", serde_json::to_string(&store_metrics.snapshot())?);

    if let Some(id) = dump {
        let manager = GuildManager::new(store, config.shard_count()?)
            .with_cache_config(config.cache.clone());
        let guild = manager.guild(Snowflake::new(id)).to_static().await?;
        println!("{}", serde_json::to_string_pretty(&guild)?);
    }
    Ok(())
}
