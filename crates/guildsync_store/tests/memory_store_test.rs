//! Tests for the in-memory document store.

use guildsync_error::StoreErrorKind;
use guildsync_store::{
    CommandObserver, CommandRecord, DocumentStore, JsonPath, MemoryStore, ObservedStore,
    StoreCommand,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn test_nested_set_and_get() {
    let store = MemoryStore::new();
    store
        .json_set("guild:1", &JsonPath::root(), json!({"name": "a", "channels": {}}))
        .await
        .unwrap();

    let path = JsonPath::field("channels").child("10");
    store
        .json_set("guild:1", &path, json!({"name": "general", "threads": []}))
        .await
        .unwrap();

    let name = store
        .json_get("guild:1", &path.clone().child("name"))
        .await
        .unwrap();
    assert_eq!(name, Some(json!("general")));
}

#[tokio::test]
async fn test_missing_key_reads_as_none() {
    let store = MemoryStore::new();
    assert_eq!(store.json_get("guild:9", &JsonPath::root()).await.unwrap(), None);
    assert_eq!(
        store
            .json_get_many("guild:9", &[JsonPath::field("name")])
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_get_many_reports_each_path() {
    let store = MemoryStore::new();
    store
        .json_set("guild:1", &JsonPath::root(), json!({"name": "a", "unavailable": false}))
        .await
        .unwrap();

    let values = store
        .json_get_many(
            "guild:1",
            &[JsonPath::field("name"), JsonPath::field("icon"), JsonPath::field("unavailable")],
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(values, vec![Some(json!("a")), None, Some(json!(false))]);
}

#[tokio::test]
async fn test_set_below_root_of_missing_key_is_command_error() {
    let store = MemoryStore::new();
    let err = store
        .json_set("guild:1", &JsonPath::field("roles").child("5"), json!({}))
        .await
        .unwrap_err();
    assert!(err.is_command());
}

#[tokio::test]
async fn test_set_with_missing_parent_is_command_error() {
    let store = MemoryStore::new();
    store
        .json_set("guild:1", &JsonPath::root(), json!({}))
        .await
        .unwrap();
    let err = store
        .json_set("guild:1", &JsonPath::field("roles").child("5"), json!({}))
        .await
        .unwrap_err();
    assert!(err.is_command());
}

#[tokio::test]
async fn test_delete_is_noop_when_absent() {
    let store = MemoryStore::new();
    assert_eq!(store.json_del("guild:1", &JsonPath::root()).await.unwrap(), 0);

    store
        .json_set("guild:1", &JsonPath::root(), json!({"roles": {"5": {}}}))
        .await
        .unwrap();
    let role = JsonPath::field("roles").child("5");
    assert_eq!(store.json_del("guild:1", &role).await.unwrap(), 1);
    assert_eq!(store.json_del("guild:1", &role).await.unwrap(), 0);
    assert_eq!(store.json_del("guild:1", &JsonPath::root()).await.unwrap(), 1);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_array_index_append_pop() {
    let store = MemoryStore::new();
    store
        .json_set("shard:0", &JsonPath::root(), json!(["1", "2"]))
        .await
        .unwrap();

    let root = JsonPath::root();
    assert_eq!(store.arr_index("shard:0", &root, &json!("2")).await.unwrap(), 1);
    assert_eq!(store.arr_index("shard:0", &root, &json!("3")).await.unwrap(), -1);
    assert_eq!(store.arr_append("shard:0", &root, json!("3")).await.unwrap(), 3);

    let popped = store.arr_pop("shard:0", &root, 0).await.unwrap();
    assert_eq!(popped, Some(json!("1")));
    assert_eq!(
        store.json_get("shard:0", &root).await.unwrap(),
        Some(json!(["2", "3"]))
    );
}

#[tokio::test]
async fn test_array_commands_on_missing_key() {
    let store = MemoryStore::new();
    let err = store
        .arr_index("shard:4", &JsonPath::root(), &json!("1"))
        .await
        .unwrap_err();
    assert!(matches!(err.kind, StoreErrorKind::KeyNotFound(_)));
}

#[tokio::test]
async fn test_counters() {
    let store = MemoryStore::new();
    assert_eq!(store.incr("shard:0:guild_count").await.unwrap(), 1);
    assert_eq!(store.incr("shard:0:guild_count").await.unwrap(), 2);
    assert_eq!(store.decr("shard:0:guild_count").await.unwrap(), 1);
    store.set("shard:0:guild_count", "0", None).await.unwrap();
    assert_eq!(
        store.get("shard:0:guild_count").await.unwrap().as_deref(),
        Some("0")
    );
}

#[tokio::test]
async fn test_scalar_on_document_is_wrong_type() {
    let store = MemoryStore::new();
    store
        .json_set("guild:1", &JsonPath::root(), json!({}))
        .await
        .unwrap();
    let err = store.incr("guild:1").await.unwrap_err();
    assert!(matches!(err.kind, StoreErrorKind::WrongType { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_scalar_expiry() {
    let store = MemoryStore::new();
    store
        .set("shard:0:active", "1", Some(Duration::from_secs(30)))
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(29)).await;
    assert!(store.get("shard:0:active").await.unwrap().is_some());
    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(store.get("shard:0:active").await.unwrap().is_none());
}

#[tokio::test]
async fn test_scan_walks_all_pages() {
    let store = MemoryStore::new();
    for id in 0..250 {
        store
            .json_set(&format!("guild:{}", id), &JsonPath::root(), json!({}))
            .await
            .unwrap();
    }
    store.set("client_id", "1", None).await.unwrap();

    let (cursor, first) = store.scan(0, "guild:*").await.unwrap();
    assert_eq!(first.len(), 100);
    assert_ne!(cursor, 0);

    let all = store.scan_all("guild:*").await.unwrap();
    assert_eq!(all.len(), 250);
}

#[derive(Default)]
struct Recorder {
    commands: Mutex<Vec<(StoreCommand, String, bool)>>,
}

impl CommandObserver for Recorder {
    fn on_command(&self, record: &CommandRecord<'_>) {
        self.commands.lock().unwrap().push((
            record.command,
            record.key.to_string(),
            record.succeeded,
        ));
    }
}

#[tokio::test]
async fn test_observed_store_reports_commands() {
    let recorder = Arc::new(Recorder::default());
    let store = ObservedStore::new(Arc::new(MemoryStore::new()), recorder.clone());

    store.incr("shard:0:guild_count").await.unwrap();
    let _ = store
        .json_set("guild:1", &JsonPath::field("name"), json!("x"))
        .await;

    let commands = recorder.commands.lock().unwrap();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].0.to_string(), "INCR");
    assert_eq!(commands[1], (StoreCommand::JsonSet, "guild:1".to_string(), false));
}
