//! In-memory implementation of [`DocumentStore`].
//!
//! Keeps every key in a `HashMap` behind a `tokio` lock. Expiry uses
//! `tokio::time::Instant`, so tests running with a paused clock can advance
//! past marker expiry deterministically. All data is lost when the last
//! handle is dropped.

use crate::{DocumentStore, JsonPath, glob_match};
use async_trait::async_trait;
use guildsync_error::{StoreError, StoreErrorKind, StoreResult};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{instrument, trace};

/// Number of keys returned per scan page.
const SCAN_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
enum Entry {
    Document(Value),
    Scalar {
        value: String,
        expires_at: Option<Instant>,
    },
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        match self {
            Entry::Scalar {
                expires_at: Some(at),
                ..
            } => *at <= now,
            _ => false,
        }
    }
}

/// In-memory document store.
///
/// Cloning is cheap; clones share the same keyspace.
///
/// # Example
/// ```
/// use guildsync_store::{DocumentStore, MemoryStore};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// assert_eq!(store.incr("shard:0:guild_count").await?, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys (for testing).
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    /// Check if the store holds no live keys (for testing).
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn wrong_type(key: &str, message: impl Into<String>) -> StoreError {
    StoreError::new(StoreErrorKind::WrongType {
        key: key.to_string(),
        message: message.into(),
    })
}

fn resolve<'a>(doc: &'a Value, path: &JsonPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(doc, |value, segment| value.as_object()?.get(segment))
}

fn resolve_mut<'a>(doc: &'a mut Value, path: &JsonPath) -> Option<&'a mut Value> {
    path.segments()
        .iter()
        .try_fold(doc, |value, segment| value.as_object_mut()?.get_mut(segment))
}

fn document<'a>(
    entries: &'a HashMap<String, Entry>,
    key: &str,
) -> StoreResult<Option<&'a Value>> {
    match entries.get(key) {
        None => Ok(None),
        Some(Entry::Document(doc)) => Ok(Some(doc)),
        Some(Entry::Scalar { .. }) => Err(wrong_type(key, "key holds a scalar, not a document")),
    }
}

fn document_mut<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
) -> StoreResult<Option<&'a mut Value>> {
    match entries.get_mut(key) {
        None => Ok(None),
        Some(Entry::Document(doc)) => Ok(Some(doc)),
        Some(Entry::Scalar { .. }) => Err(wrong_type(key, "key holds a scalar, not a document")),
    }
}

fn array_at<'a>(
    entries: &'a mut HashMap<String, Entry>,
    command: &str,
    key: &str,
    path: &JsonPath,
) -> StoreResult<&'a mut Vec<Value>> {
    let doc = document_mut(entries, key)?
        .ok_or_else(|| StoreError::new(StoreErrorKind::KeyNotFound(key.to_string())))?;
    let target = resolve_mut(doc, path)
        .ok_or_else(|| StoreError::command(command, format!("path {} does not exist", path)))?;
    target
        .as_array_mut()
        .ok_or_else(|| wrong_type(key, format!("value at {} is not an array", path)))
}

impl MemoryStore {
    fn scalar_update(
        entries: &mut HashMap<String, Entry>,
        key: &str,
        delta: i64,
    ) -> StoreResult<i64> {
        let now = Instant::now();
        let (current, expires_at) = match entries.get(key) {
            Some(entry) if entry.is_expired(now) => (0, None),
            None => (0, None),
            Some(Entry::Scalar { value, expires_at }) => {
                let parsed = value
                    .parse::<i64>()
                    .map_err(|_| wrong_type(key, "value is not an integer"))?;
                (parsed, *expires_at)
            }
            Some(Entry::Document(_)) => {
                return Err(wrong_type(key, "key holds a document, not a scalar"));
            }
        };
        let next = current + delta;
        entries.insert(
            key.to_string(),
            Entry::Scalar {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    #[instrument(level = "trace", skip(self), fields(path = %path))]
    async fn json_get(&self, key: &str, path: &JsonPath) -> StoreResult<Option<Value>> {
        let entries = self.entries.read().await;
        Ok(document(&entries, key)?.and_then(|doc| resolve(doc, path).cloned()))
    }

    #[instrument(level = "trace", skip(self, paths), fields(paths = paths.len()))]
    async fn json_get_many(
        &self,
        key: &str,
        paths: &[JsonPath],
    ) -> StoreResult<Option<Vec<Option<Value>>>> {
        let entries = self.entries.read().await;
        Ok(document(&entries, key)?.map(|doc| {
            paths
                .iter()
                .map(|path| resolve(doc, path).cloned())
                .collect()
        }))
    }

    #[instrument(level = "trace", skip(self, value), fields(path = %path))]
    async fn json_set(&self, key: &str, path: &JsonPath, value: Value) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        let Some((parent_path, member)) = path.split_last() else {
            if let Some(Entry::Scalar { .. }) = entries.get(key) {
                return Err(wrong_type(key, "key holds a scalar, not a document"));
            }
            entries.insert(key.to_string(), Entry::Document(value));
            return Ok(());
        };

        let doc = document_mut(&mut entries, key)?.ok_or_else(|| {
            StoreError::command("JSON.SET", "new objects must be created at the root")
        })?;
        let parent = resolve_mut(doc, &parent_path)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                StoreError::command("JSON.SET", format!("path {} does not exist", parent_path))
            })?;
        parent.insert(member.to_string(), value);
        Ok(())
    }

    #[instrument(level = "trace", skip(self), fields(path = %path))]
    async fn json_del(&self, key: &str, path: &JsonPath) -> StoreResult<u64> {
        let mut entries = self.entries.write().await;
        let Some((parent_path, member)) = path.split_last() else {
            let exists = document(&entries, key)?.is_some();
            if exists {
                entries.remove(key);
            }
            return Ok(u64::from(exists));
        };

        let removed = document_mut(&mut entries, key)?
            .and_then(|doc| resolve_mut(doc, &parent_path))
            .and_then(Value::as_object_mut)
            .and_then(|parent: &mut Map<String, Value>| parent.remove(member));
        Ok(u64::from(removed.is_some()))
    }

    #[instrument(level = "trace", skip(self, value), fields(path = %path))]
    async fn arr_append(&self, key: &str, path: &JsonPath, value: Value) -> StoreResult<usize> {
        let mut entries = self.entries.write().await;
        let array = array_at(&mut entries, "JSON.ARRAPPEND", key, path)?;
        array.push(value);
        Ok(array.len())
    }

    #[instrument(level = "trace", skip(self, value), fields(path = %path))]
    async fn arr_index(&self, key: &str, path: &JsonPath, value: &Value) -> StoreResult<i64> {
        let mut entries = self.entries.write().await;
        let array = array_at(&mut entries, "JSON.ARRINDEX", key, path)?;
        Ok(array
            .iter()
            .position(|item| item == value)
            .map_or(-1, |index| index as i64))
    }

    #[instrument(level = "trace", skip(self), fields(path = %path))]
    async fn arr_pop(&self, key: &str, path: &JsonPath, index: i64) -> StoreResult<Option<Value>> {
        let mut entries = self.entries.write().await;
        let array = array_at(&mut entries, "JSON.ARRPOP", key, path)?;
        if array.is_empty() {
            return Ok(None);
        }
        let len = array.len() as i64;
        let resolved = if index < 0 { len + index } else { index };
        let clamped = resolved.clamp(0, len - 1) as usize;
        Ok(Some(array.remove(clamped)))
    }

    #[instrument(level = "trace", skip(self))]
    async fn scan(&self, cursor: u64, pattern: &str) -> StoreResult<(u64, Vec<String>)> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        let mut keys: Vec<&String> = entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && glob_match(pattern, key))
            .map(|(key, _)| key)
            .collect();
        keys.sort();

        let start = cursor as usize;
        let page: Vec<String> = keys
            .iter()
            .skip(start)
            .take(SCAN_PAGE_SIZE)
            .map(|key| key.to_string())
            .collect();
        let next = start + page.len();
        let next_cursor = if next >= keys.len() { 0 } else { next as u64 };
        trace!(returned = page.len(), next_cursor, "Scanned keys");
        Ok((next_cursor, page))
    }

    #[instrument(level = "trace", skip(self))]
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        match entries.get(key) {
            None => Ok(None),
            Some(entry) if entry.is_expired(now) => Ok(None),
            Some(Entry::Scalar { value, .. }) => Ok(Some(value.clone())),
            Some(Entry::Document(_)) => Err(wrong_type(key, "key holds a document, not a scalar")),
        }
    }

    #[instrument(level = "trace", skip(self))]
    async fn set(&self, key: &str, value: &str, expiry: Option<Duration>) -> StoreResult<()> {
        let expires_at = expiry.map(|ttl| Instant::now() + ttl);
        self.entries.write().await.insert(
            key.to_string(),
            Entry::Scalar {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    #[instrument(level = "trace", skip(self))]
    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut entries = self.entries.write().await;
        Self::scalar_update(&mut entries, key, 1)
    }

    #[instrument(level = "trace", skip(self))]
    async fn decr(&self, key: &str) -> StoreResult<i64> {
        let mut entries = self.entries.write().await;
        Self::scalar_update(&mut entries, key, -1)
    }

    #[instrument(level = "trace", skip(self))]
    async fn del(&self, key: &str) -> StoreResult<bool> {
        let now = Instant::now();
        let removed = self.entries.write().await.remove(key);
        Ok(removed.is_some_and(|entry| !entry.is_expired(now)))
    }

    #[instrument(level = "trace", skip(self))]
    async fn flush(&self) -> StoreResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}
