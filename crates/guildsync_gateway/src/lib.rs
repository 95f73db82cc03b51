//! Dispatch router for guildsync.
//!
//! A [`ShardSession`] consumes one shard's [`RawDispatch`] stream:
//!
//! 1. on connect it checks the shard-count invariant and starts the shard's
//!    liveness heartbeat
//! 2. until `READY` arrives, every other event is buffered by the
//!    [`ReadyGate`]
//! 3. `READY` replaces the shard's baseline, then the buffer is flushed in
//!    arrival order
//! 4. from then on each event is decoded into a [`DispatchEvent`] and
//!    applied by the [`CacheEventHandler`], one at a time
//!
//! Handler failures are logged and never stop the stream. A
//! [`DispatchObserver`] can be attached to see every routed event;
//! [`DispatchMetrics`] is one that counts them by outcome.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod event;
mod gate;
mod handler;
mod metrics;
mod observer;
mod session;

pub use context::SessionContext;
pub use event::{DispatchEvent, EventKind, RawDispatch};
pub use gate::{GateState, ReadyGate};
pub use handler::CacheEventHandler;
pub use metrics::{DispatchMetrics, DispatchMetricsSnapshot};
pub use observer::{DispatchObserver, DispatchOutcome, DispatchRecord};
pub use session::{SessionConfig, SessionConfigBuilder, ShardSession};
