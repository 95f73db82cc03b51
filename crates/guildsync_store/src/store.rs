//! Document store trait definition.

use crate::JsonPath;
use guildsync_error::StoreResult;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to a document store.
pub type SharedStore = Arc<dyn DocumentStore>;

/// Command surface of the external document store.
///
/// Keys hold either a JSON document (addressed by [`JsonPath`]) or a plain
/// scalar string (counters, liveness markers). The semantics follow
/// RedisJSON:
///
/// - reading a missing key yields `None`, never an error
/// - writes below the root of a missing key are rejected as a command error
/// - array commands on a missing key fail with `KeyNotFound`
/// - deleting a missing key or path is a no-op
///
/// Implementations handle connection management and retries themselves;
/// guildsync only issues commands.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the value at `path`.
    ///
    /// Returns `None` when the key or the path does not exist.
    async fn json_get(&self, key: &str, path: &JsonPath) -> StoreResult<Option<Value>>;

    /// Read several paths of one document in a single round trip.
    ///
    /// Returns `None` when the key does not exist, otherwise one entry per
    /// requested path in request order.
    async fn json_get_many(
        &self,
        key: &str,
        paths: &[JsonPath],
    ) -> StoreResult<Option<Vec<Option<Value>>>>;

    /// Write `value` at `path`, creating the member if its parent exists.
    async fn json_set(&self, key: &str, path: &JsonPath, value: Value) -> StoreResult<()>;

    /// Delete the value at `path`. Returns the number of values removed.
    async fn json_del(&self, key: &str, path: &JsonPath) -> StoreResult<u64>;

    /// Append `value` to the array at `path`. Returns the new length.
    async fn arr_append(&self, key: &str, path: &JsonPath, value: Value) -> StoreResult<usize>;

    /// Position of `value` in the array at `path`, or `-1` if absent.
    async fn arr_index(&self, key: &str, path: &JsonPath, value: &Value) -> StoreResult<i64>;

    /// Remove and return the element at `index` (negative counts from the end).
    async fn arr_pop(&self, key: &str, path: &JsonPath, index: i64) -> StoreResult<Option<Value>>;

    /// One page of keys matching a glob `pattern`.
    ///
    /// Start with cursor `0`; iteration is complete when the returned cursor
    /// is `0` again.
    async fn scan(&self, cursor: u64, pattern: &str) -> StoreResult<(u64, Vec<String>)>;

    /// Read a scalar value.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a scalar value with an optional expiry.
    async fn set(&self, key: &str, value: &str, expiry: Option<Duration>) -> StoreResult<()>;

    /// Increment an integer scalar, treating a missing key as `0`.
    async fn incr(&self, key: &str) -> StoreResult<i64>;

    /// Decrement an integer scalar, treating a missing key as `0`.
    async fn decr(&self, key: &str) -> StoreResult<i64>;

    /// Remove a key of any kind. Returns whether it existed.
    async fn del(&self, key: &str) -> StoreResult<bool>;

    /// Remove every key.
    async fn flush(&self) -> StoreResult<()>;

    /// Collect every key matching `pattern` by walking the scan cursor.
    async fn scan_all(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut cursor = 0;
        loop {
            let (next, page) = self.scan(cursor, pattern).await?;
            keys.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }
}

/// Match `text` against a glob pattern supporting `*` and `?`.
///
/// # Example
///
/// ```
/// use guildsync_store::glob_match;
///
/// assert!(glob_match("shard:*:active", "shard:3:active"));
/// assert!(!glob_match("shard:*:active", "shard:3"));
/// ```
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            mark = t;
            p += 1;
        } else if let Some(s) = star {
            p = s + 1;
            mark += 1;
            t = mark;
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}
