//! RedisJSON implementation of [`DocumentStore`].
//!
//! Talks to a Redis server with the RedisJSON module loaded. Reads use
//! `$`-rooted paths so a missing member comes back as an empty match list
//! rather than an error; writes and array commands use the legacy path
//! syntax rendered by [`JsonPath`].

use crate::{DocumentStore, JsonPath};
use async_trait::async_trait;
use guildsync_error::{StoreError, StoreErrorKind, StoreResult};
use redis::aio::ConnectionManager;
use redis::{Cmd, FromRedisValue, RedisError};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// Number of keys requested per `SCAN` page.
const SCAN_COUNT: usize = 100;

/// Document store backed by a Redis server with RedisJSON.
///
/// Cloning is cheap; clones share one auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to the server at `endpoint`, e.g. `redis://127.0.0.1:6379`.
    #[instrument(skip(endpoint))]
    pub async fn connect(endpoint: &str) -> StoreResult<Self> {
        let client = redis::Client::open(endpoint).map_err(connection_error)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(connection_error)?;
        debug!("Connected to document store");
        Ok(Self { connection })
    }

    async fn query<T: FromRedisValue>(&self, name: &str, cmd: &Cmd) -> StoreResult<T> {
        let mut connection = self.connection.clone();
        cmd.query_async(&mut connection)
            .await
            .map_err(|err| command_error(name, err))
    }

    /// Array commands report a missing key as a plain command error.
    async fn array_command<T: FromRedisValue>(
        &self,
        name: &str,
        key: &str,
        cmd: &Cmd,
    ) -> StoreResult<T> {
        match self.query(name, cmd).await {
            Err(err) if err.is_command() => {
                let exists: i64 = self.query("EXISTS", redis::cmd("EXISTS").arg(key)).await?;
                if exists == 0 {
                    Err(StoreError::new(StoreErrorKind::KeyNotFound(key.to_string())))
                } else {
                    Err(err)
                }
            }
            other => other,
        }
    }
}

/// Render `path` as a `$`-rooted JSONPath with every member bracketed.
fn query_path(path: &JsonPath) -> String {
    let mut rendered = String::from("$");
    for segment in path.segments() {
        rendered.push_str("[\"");
        rendered.push_str(&segment.replace('"', "\\\""));
        rendered.push_str("\"]");
    }
    rendered
}

/// First match of a `$`-path read, which returns a JSON array of matches.
fn first_match(matches: Value) -> Option<Value> {
    match matches {
        Value::Array(values) => values.into_iter().next(),
        _ => None,
    }
}

/// Split a multi-path read, returned as an object keyed by path, into
/// request order.
fn matches_by_path(response: Value, paths: &[String]) -> Vec<Option<Value>> {
    let mut by_path = match response {
        Value::Object(map) => map,
        _ => return vec![None; paths.len()],
    };
    paths
        .iter()
        .map(|path| by_path.get_mut(path).map(Value::take).and_then(first_match))
        .collect()
}

fn connection_error(err: RedisError) -> StoreError {
    StoreError::new(StoreErrorKind::Connection(err.to_string()))
}

fn command_error(name: &str, err: RedisError) -> StoreError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        return connection_error(err);
    }
    if err.code() == Some("WRONGTYPE") {
        return StoreError::new(StoreErrorKind::WrongType {
            key: String::new(),
            message: err.to_string(),
        });
    }
    StoreError::command(name, err.to_string())
}

#[async_trait]
impl DocumentStore for RedisStore {
    #[instrument(level = "trace", skip(self), fields(path = %path))]
    async fn json_get(&self, key: &str, path: &JsonPath) -> StoreResult<Option<Value>> {
        let raw: Option<String> = self
            .query(
                "JSON.GET",
                redis::cmd("JSON.GET").arg(key).arg(query_path(path)),
            )
            .await?;
        match raw {
            Some(raw) => Ok(first_match(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    #[instrument(level = "trace", skip(self, paths), fields(paths = paths.len()))]
    async fn json_get_many(
        &self,
        key: &str,
        paths: &[JsonPath],
    ) -> StoreResult<Option<Vec<Option<Value>>>> {
        let rendered: Vec<String> = paths.iter().map(query_path).collect();
        let raw: Option<String> = self
            .query("JSON.GET", redis::cmd("JSON.GET").arg(key).arg(&rendered))
            .await?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let response: Value = serde_json::from_str(&raw)?;
        // A single path comes back as a bare match list
        if let [_] = rendered.as_slice() {
            return Ok(Some(vec![first_match(response)]));
        }
        Ok(Some(matches_by_path(response, &rendered)))
    }

    #[instrument(level = "trace", skip(self, value), fields(path = %path))]
    async fn json_set(&self, key: &str, path: &JsonPath, value: Value) -> StoreResult<()> {
        let encoded = serde_json::to_string(&value)?;
        let reply: Option<String> = self
            .query(
                "JSON.SET",
                redis::cmd("JSON.SET")
                    .arg(key)
                    .arg(path.to_string())
                    .arg(encoded),
            )
            .await?;
        // A nil reply means the parent of `path` does not exist
        match reply {
            Some(_) => Ok(()),
            None => Err(StoreError::command(
                "JSON.SET",
                format!("path {} does not exist", path),
            )),
        }
    }

    #[instrument(level = "trace", skip(self), fields(path = %path))]
    async fn json_del(&self, key: &str, path: &JsonPath) -> StoreResult<u64> {
        self.query(
            "JSON.DEL",
            redis::cmd("JSON.DEL").arg(key).arg(path.to_string()),
        )
        .await
    }

    #[instrument(level = "trace", skip(self, value), fields(path = %path))]
    async fn arr_append(&self, key: &str, path: &JsonPath, value: Value) -> StoreResult<usize> {
        let encoded = serde_json::to_string(&value)?;
        self.array_command(
            "JSON.ARRAPPEND",
            key,
            redis::cmd("JSON.ARRAPPEND")
                .arg(key)
                .arg(path.to_string())
                .arg(encoded),
        )
        .await
    }

    #[instrument(level = "trace", skip(self, value), fields(path = %path))]
    async fn arr_index(&self, key: &str, path: &JsonPath, value: &Value) -> StoreResult<i64> {
        let encoded = serde_json::to_string(value)?;
        self.array_command(
            "JSON.ARRINDEX",
            key,
            redis::cmd("JSON.ARRINDEX")
                .arg(key)
                .arg(path.to_string())
                .arg(encoded),
        )
        .await
    }

    #[instrument(level = "trace", skip(self), fields(path = %path))]
    async fn arr_pop(&self, key: &str, path: &JsonPath, index: i64) -> StoreResult<Option<Value>> {
        let raw: Option<String> = self
            .array_command(
                "JSON.ARRPOP",
                key,
                redis::cmd("JSON.ARRPOP")
                    .arg(key)
                    .arg(path.to_string())
                    .arg(index),
            )
            .await?;
        raw.map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(StoreError::from)
    }

    #[instrument(level = "trace", skip(self))]
    async fn scan(&self, cursor: u64, pattern: &str) -> StoreResult<(u64, Vec<String>)> {
        self.query(
            "SCAN",
            redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT),
        )
        .await
    }

    #[instrument(level = "trace", skip(self))]
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.query("GET", redis::cmd("GET").arg(key)).await
    }

    #[instrument(level = "trace", skip(self))]
    async fn set(&self, key: &str, value: &str, expiry: Option<Duration>) -> StoreResult<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = expiry {
            cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }
        self.query("SET", &cmd).await
    }

    #[instrument(level = "trace", skip(self))]
    async fn incr(&self, key: &str) -> StoreResult<i64> {
        self.query("INCR", redis::cmd("INCR").arg(key)).await
    }

    #[instrument(level = "trace", skip(self))]
    async fn decr(&self, key: &str) -> StoreResult<i64> {
        self.query("DECR", redis::cmd("DECR").arg(key)).await
    }

    #[instrument(level = "trace", skip(self))]
    async fn del(&self, key: &str) -> StoreResult<bool> {
        let removed: i64 = self.query("DEL", redis::cmd("DEL").arg(key)).await?;
        Ok(removed > 0)
    }

    #[instrument(level = "trace", skip(self))]
    async fn flush(&self) -> StoreResult<()> {
        self.query("FLUSHDB", &redis::cmd("FLUSHDB")).await
    }
}
