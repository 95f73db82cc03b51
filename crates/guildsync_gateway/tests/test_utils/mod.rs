//! Fixtures shared by the gateway tests.

#![allow(dead_code)]

use guildsync_cache::FieldCacheConfig;
use guildsync_core::{Guild, Snowflake};
use guildsync_gateway::{
    DispatchObserver, DispatchOutcome, DispatchRecord, RawDispatch, SessionConfigBuilder,
    ShardSession,
};
use guildsync_shard::ShardCount;
use guildsync_store::{MemoryStore, SharedStore};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;

pub const BOT: u64 = 42;
pub const MEMBER: u64 = 50;

pub fn id(raw: u64) -> Snowflake {
    Snowflake::new(raw)
}

pub fn memory_store() -> (Arc<MemoryStore>, SharedStore) {
    let store = Arc::new(MemoryStore::new());
    let shared: SharedStore = store.clone();
    (store, shared)
}

/// Guild handle that always reads through to the store.
pub fn guild(store: &SharedStore, raw: u64) -> Guild {
    Guild::with_cache_config(
        id(raw),
        store.clone(),
        FieldCacheConfig::default().with_enabled(false),
    )
}

/// Single-shard session over `store`.
pub fn session(store: SharedStore) -> ShardSession {
    let config = SessionConfigBuilder::default()
        .shard_id(0u32)
        .shard_count(ShardCount::ONE)
        .build()
        .unwrap();
    ShardSession::new(store, config)
}

/// Collects every dispatch record.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    records: Mutex<Vec<(String, DispatchOutcome)>>,
}

impl RecordingObserver {
    pub fn records(&self) -> Vec<(String, DispatchOutcome)> {
        self.records.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.records().into_iter().map(|(name, _)| name).collect()
    }

    pub fn outcomes(&self) -> Vec<DispatchOutcome> {
        self.records().into_iter().map(|(_, outcome)| outcome).collect()
    }
}

impl DispatchObserver for RecordingObserver {
    fn on_dispatch(&self, record: &DispatchRecord<'_>) {
        self.records
            .lock()
            .push((record.name.to_string(), record.outcome));
    }
}

pub fn ready(guilds: &[u64]) -> RawDispatch {
    let guilds: Vec<Value> = guilds
        .iter()
        .map(|id| json!({"id": id.to_string(), "unavailable": true}))
        .collect();
    RawDispatch::new(
        "READY",
        json!({
            "user": {"id": BOT.to_string(), "username": "guildsync"},
            "guilds": guilds,
            "session_id": "abc",
            "shard": [0, 1]
        }),
    )
}

pub fn guild_json(id: u64, name: &str) -> Value {
    json!({
        "id": id.to_string(),
        "name": name,
        "icon": "a1b2",
        "owner_id": "7",
        "roles": [
            {"id": id.to_string(), "name": "@everyone", "permissions": "1024", "position": 0},
            {"id": "5", "name": "mod", "permissions": "8192", "position": 1}
        ],
        "channels": [{"id": "10", "type": 0, "name": "general"}],
        "threads": [],
        "members": [{"user": {"id": BOT.to_string()}, "roles": ["5"]}]
    })
}

pub fn guild_create(id: u64) -> RawDispatch {
    RawDispatch::new("GUILD_CREATE", guild_json(id, "Lounge"))
}

/// A guild update carries no channels or members.
pub fn guild_update(id: u64, name: &str) -> RawDispatch {
    RawDispatch::new(
        "GUILD_UPDATE",
        json!({
            "id": id.to_string(),
            "name": name,
            "icon": null,
            "owner_id": "8",
            "roles": [{"id": id.to_string(), "name": "@everyone", "permissions": "0", "position": 0}]
        }),
    )
}

pub fn guild_delete(id: u64, unavailable: bool) -> RawDispatch {
    RawDispatch::new(
        "GUILD_DELETE",
        json!({"id": id.to_string(), "unavailable": unavailable}),
    )
}

pub fn channel(name: &str, guild: u64, id: u64, channel_name: &str) -> RawDispatch {
    RawDispatch::new(
        name,
        json!({
            "id": id.to_string(),
            "type": 0,
            "guild_id": guild.to_string(),
            "name": channel_name,
            "position": 3
        }),
    )
}

pub fn thread(name: &str, guild: u64, id: u64, parent: u64, archived: bool) -> RawDispatch {
    RawDispatch::new(name, thread_json(guild, id, parent, archived))
}

pub fn thread_json(guild: u64, id: u64, parent: u64, archived: bool) -> Value {
    json!({
        "id": id.to_string(),
        "type": 11,
        "guild_id": guild.to_string(),
        "parent_id": parent.to_string(),
        "name": format!("thread-{}", id),
        "thread_metadata": {"archived": archived, "locked": false}
    })
}
