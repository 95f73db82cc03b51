//! Guildsync: a shard-partitioned guild cache fed by gateway dispatch events.
//!
//! Writers run one [`ShardSession`] per shard, which turns the dispatch
//! stream into minimal guild records in a shared [`DocumentStore`]. Readers
//! use [`GuildManager`] to look guilds up and to answer permission queries
//! without a gateway connection of their own.
//!
//! This crate re-exports the workspace and adds what a process needs around
//! it: [`GuildsyncConfig`], [`init_observability`] and [`replay`].
//!
//! # Example
//!
//! ```
//! use guildsync::{GuildManager, RawDispatch, SessionConfigBuilder, ShardCount, ShardSession};
//! use guildsync::{MemoryStore, SharedStore, Snowflake};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store: SharedStore = Arc::new(MemoryStore::new());
//! let config = SessionConfigBuilder::default()
//!     .shard_id(0u32)
//!     .shard_count(ShardCount::ONE)
//!     .build()?;
//! let mut session = ShardSession::new(store.clone(), config);
//! session.connect().await?;
//!
//! session
//!     .dispatch(RawDispatch::new(
//!         "READY",
//!         json!({"user": {"id": "42"}, "guilds": [{"id": "100", "unavailable": true}]}),
//!     ))
//!     .await;
//!
//! let manager = GuildManager::new(store, ShardCount::ONE);
//! assert_eq!(manager.client_id().await?, Snowflake::new(42));
//! assert!(manager.guild(Snowflake::new(100)).name().await.unwrap_err().is_guild_unavailable());
//! # session.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod manager;
mod observability;
mod replay;

pub use config::{DiscordSettings, GuildsyncConfig, LoggingSettings, ShardSettings, StoreSettings};
pub use manager::{GuildManager, GuildSummary};
pub use observability::init_observability;
pub use replay::{ReplaySummary, replay};

pub use guildsync_cache::{FieldCache, FieldCacheConfig};
pub use guildsync_core::{
    CachedChannel, CachedGuild, CachedOverwrite, CachedRole, ChannelType, Guild, OverwriteType,
    Permissions, Snowflake, apply_overwrites, base_permissions, keys,
};
pub use guildsync_error::{
    CacheError, CacheErrorKind, ConfigError, GuildsyncError, GuildsyncErrorKind, GuildsyncResult,
    IoError, JsonError, StoreError, StoreErrorKind,
};
pub use guildsync_gateway::{
    CacheEventHandler, DispatchEvent, DispatchMetrics, DispatchMetricsSnapshot, DispatchObserver,
    DispatchOutcome, DispatchRecord, EventKind, GateState, RawDispatch, ReadyGate, SessionConfig, SessionConfigBuilder,
    SessionContext, ShardSession,
};
pub use guildsync_shard::{
    HeartbeatTiming, InactiveShardCache, PeriodicTask, ShardCount, ShardHeartbeat,
    ShardRegistry, shard_id_for,
};
pub use guildsync_store::{
    CommandObserver, CommandRecord, DocumentStore, JsonPath, MemoryStore, ObservedStore,
    SharedStore, StoreCommand, StoreMetrics, StoreMetricsSnapshot,
};
#[cfg(feature = "redis")]
pub use guildsync_store::RedisStore;
