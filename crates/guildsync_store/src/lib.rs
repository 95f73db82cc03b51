//! Document store contract for guildsync.
//!
//! guildsync keeps every cached aggregate in an external, path-addressable
//! JSON document store (RedisJSON semantics). This crate defines that
//! command surface as the [`DocumentStore`] trait and ships:
//!
//! - [`JsonPath`] - a path into a stored document
//! - [`MemoryStore`] - an in-process backend with the same semantics,
//!   used for tests, replay and embedding
//! - `RedisStore` - the RedisJSON backend, behind the `redis` feature
//! - [`ObservedStore`] - a wrapper that reports every command to a
//!   [`CommandObserver`]
//! - [`StoreMetrics`] - an observer counting commands and failures
//!
//! # Example
//!
//! ```
//! use guildsync_store::{DocumentStore, JsonPath, MemoryStore};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! store.json_set("guild:1", &JsonPath::root(), json!({"name": "a"})).await?;
//! let name = store.json_get("guild:1", &JsonPath::field("name")).await?;
//! assert_eq!(name, Some(json!("a")));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod memory;
mod metrics;
mod observed;
mod path;
#[cfg(feature = "redis")]
mod redis_store;
mod store;

pub use memory::MemoryStore;
pub use metrics::{StoreMetrics, StoreMetricsSnapshot};
pub use observed::{CommandObserver, CommandRecord, ObservedStore, StoreCommand};
pub use path::JsonPath;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use store::{DocumentStore, SharedStore, glob_match};
