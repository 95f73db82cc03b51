//! Command observability for document stores.
//!
//! [`ObservedStore`] forwards every command to an inner store and reports
//! the command name, key, latency and outcome to a [`CommandObserver`].

use crate::{DocumentStore, JsonPath, SharedStore};
use async_trait::async_trait;
use guildsync_error::StoreResult;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Store command names as the store spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
pub enum StoreCommand {
    /// `JSON.GET`
    #[strum(serialize = "JSON.GET")]
    JsonGet,
    /// `JSON.SET`
    #[strum(serialize = "JSON.SET")]
    JsonSet,
    /// `JSON.DEL`
    #[strum(serialize = "JSON.DEL")]
    JsonDel,
    /// `JSON.ARRAPPEND`
    #[strum(serialize = "JSON.ARRAPPEND")]
    ArrAppend,
    /// `JSON.ARRINDEX`
    #[strum(serialize = "JSON.ARRINDEX")]
    ArrIndex,
    /// `JSON.ARRPOP`
    #[strum(serialize = "JSON.ARRPOP")]
    ArrPop,
    /// `SCAN`
    #[strum(serialize = "SCAN")]
    Scan,
    /// `GET`
    #[strum(serialize = "GET")]
    Get,
    /// `SET`
    #[strum(serialize = "SET")]
    Set,
    /// `INCR`
    #[strum(serialize = "INCR")]
    Incr,
    /// `DECR`
    #[strum(serialize = "DECR")]
    Decr,
    /// `DEL`
    #[strum(serialize = "DEL")]
    Del,
    /// `FLUSHDB`
    #[strum(serialize = "FLUSHDB")]
    Flush,
}

/// One completed store command.
#[derive(Debug, Clone)]
pub struct CommandRecord<'a> {
    /// Command issued
    pub command: StoreCommand,
    /// Key addressed (the pattern for `SCAN`, empty for `FLUSHDB`)
    pub key: &'a str,
    /// Wall time spent in the inner store
    pub elapsed: Duration,
    /// Whether the command succeeded
    pub succeeded: bool,
}

/// Receives a record for every store command.
pub trait CommandObserver: Send + Sync {
    /// Called after each command completes.
    fn on_command(&self, record: &CommandRecord<'_>);
}

/// Store wrapper reporting every command to an observer.
pub struct ObservedStore {
    inner: SharedStore,
    observer: Arc<dyn CommandObserver>,
}

impl ObservedStore {
    /// Wrap `inner`, reporting to `observer`.
    pub fn new(inner: SharedStore, observer: Arc<dyn CommandObserver>) -> Self {
        Self { inner, observer }
    }

    fn record<T>(
        &self,
        command: StoreCommand,
        key: &str,
        started: Instant,
        result: StoreResult<T>,
    ) -> StoreResult<T> {
        self.observer.on_command(&CommandRecord {
            command,
            key,
            elapsed: started.elapsed(),
            succeeded: result.is_ok(),
        });
        result
    }
}

#[async_trait]
impl DocumentStore for ObservedStore {
    async fn json_get(&self, key: &str, path: &JsonPath) -> StoreResult<Option<Value>> {
        let started = Instant::now();
        let result = self.inner.json_get(key, path).await;
        self.record(StoreCommand::JsonGet, key, started, result)
    }

    async fn json_get_many(
        &self,
        key: &str,
        paths: &[JsonPath],
    ) -> StoreResult<Option<Vec<Option<Value>>>> {
        let started = Instant::now();
        let result = self.inner.json_get_many(key, paths).await;
        self.record(StoreCommand::JsonGet, key, started, result)
    }

    async fn json_set(&self, key: &str, path: &JsonPath, value: Value) -> StoreResult<()> {
        let started = Instant::now();
        let result = self.inner.json_set(key, path, value).await;
        self.record(StoreCommand::JsonSet, key, started, result)
    }

    async fn json_del(&self, key: &str, path: &JsonPath) -> StoreResult<u64> {
        let started = Instant::now();
        let result = self.inner.json_del(key, path).await;
        self.record(StoreCommand::JsonDel, key, started, result)
    }

    async fn arr_append(&self, key: &str, path: &JsonPath, value: Value) -> StoreResult<usize> {
        let started = Instant::now();
        let result = self.inner.arr_append(key, path, value).await;
        self.record(StoreCommand::ArrAppend, key, started, result)
    }

    async fn arr_index(&self, key: &str, path: &JsonPath, value: &Value) -> StoreResult<i64> {
        let started = Instant::now();
        let result = self.inner.arr_index(key, path, value).await;
        self.record(StoreCommand::ArrIndex, key, started, result)
    }

    async fn arr_pop(&self, key: &str, path: &JsonPath, index: i64) -> StoreResult<Option<Value>> {
        let started = Instant::now();
        let result = self.inner.arr_pop(key, path, index).await;
        self.record(StoreCommand::ArrPop, key, started, result)
    }

    async fn scan(&self, cursor: u64, pattern: &str) -> StoreResult<(u64, Vec<String>)> {
        let started = Instant::now();
        let result = self.inner.scan(cursor, pattern).await;
        self.record(StoreCommand::Scan, pattern, started, result)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let started = Instant::now();
        let result = self.inner.get(key).await;
        self.record(StoreCommand::Get, key, started, result)
    }

    async fn set(&self, key: &str, value: &str, expiry: Option<Duration>) -> StoreResult<()> {
        let started = Instant::now();
        let result = self.inner.set(key, value, expiry).await;
        self.record(StoreCommand::Set, key, started, result)
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let started = Instant::now();
        let result = self.inner.incr(key).await;
        self.record(StoreCommand::Incr, key, started, result)
    }

    async fn decr(&self, key: &str) -> StoreResult<i64> {
        let started = Instant::now();
        let result = self.inner.decr(key).await;
        self.record(StoreCommand::Decr, key, started, result)
    }

    async fn del(&self, key: &str) -> StoreResult<bool> {
        let started = Instant::now();
        let result = self.inner.del(key).await;
        self.record(StoreCommand::Del, key, started, result)
    }

    async fn flush(&self) -> StoreResult<()> {
        let started = Instant::now();
        let result = self.inner.flush().await;
        self.record(StoreCommand::Flush, "", started, result)
    }
}
