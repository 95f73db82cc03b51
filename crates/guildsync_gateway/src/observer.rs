//! Dispatch observability hook.

use std::time::Duration;

/// How a routed event ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum DispatchOutcome {
    /// A handler ran and succeeded
    Handled,
    /// No handler exists for the event name
    Ignored,
    /// Decoding or the handler failed; the error was logged
    Failed,
}

/// One routed event.
#[derive(Debug, Clone)]
pub struct DispatchRecord<'a> {
    /// Event name as received
    pub name: &'a str,
    /// Shard that routed it
    pub shard_id: u32,
    /// Time spent decoding and handling
    pub elapsed: Duration,
    /// Result
    pub outcome: DispatchOutcome,
}

/// Receives a record for every routed event, whatever its outcome.
///
/// Buffered events are reported when they are flushed, not when they arrive.
pub trait DispatchObserver: Send + Sync {
    /// Called after each event is routed.
    fn on_dispatch(&self, record: &DispatchRecord<'_>);
}
