//! Ready gate.

use crate::RawDispatch;
use std::collections::VecDeque;

/// Gate position of a shard session.
#[derive(Debug, Clone, PartialEq)]
pub enum GateState {
    /// Baseline not applied yet; content events wait in arrival order.
    AwaitingReady {
        /// Events received so far
        buffer: VecDeque<RawDispatch>,
    },
    /// Baseline applied; events are routed as they arrive.
    Ready,
}

/// Holds content events back until the session's baseline is committed.
///
/// `Ready` is terminal; a reconnect builds a new session and a new gate.
///
/// # Example
///
/// ```
/// use guildsync_gateway::{RawDispatch, ReadyGate};
/// use serde_json::json;
///
/// let mut gate = ReadyGate::new();
/// assert!(gate.admit(RawDispatch::new("GUILD_CREATE", json!({}))).is_none());
///
/// let flushed = gate.open();
/// assert_eq!(flushed.len(), 1);
/// assert!(gate.admit(RawDispatch::new("GUILD_CREATE", json!({}))).is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyGate {
    state: GateState,
}

impl ReadyGate {
    /// A closed gate with an empty buffer.
    pub fn new() -> Self {
        Self {
            state: GateState::AwaitingReady {
                buffer: VecDeque::new(),
            },
        }
    }

    /// Current state.
    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Whether the gate has opened.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, GateState::Ready)
    }

    /// Number of events waiting.
    pub fn buffered(&self) -> usize {
        match &self.state {
            GateState::AwaitingReady { buffer } => buffer.len(),
            GateState::Ready => 0,
        }
    }

    /// Pass `event` through when open, otherwise queue it and return `None`.
    pub fn admit(&mut self, event: RawDispatch) -> Option<RawDispatch> {
        match &mut self.state {
            GateState::AwaitingReady { buffer } => {
                buffer.push_back(event);
                None
            }
            GateState::Ready => Some(event),
        }
    }

    /// Open the gate and take the queued events, oldest first.
    ///
    /// Opening an open gate returns nothing.
    pub fn open(&mut self) -> VecDeque<RawDispatch> {
        match std::mem::replace(&mut self.state, GateState::Ready) {
            GateState::AwaitingReady { buffer } => buffer,
            GateState::Ready => VecDeque::new(),
        }
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flush_preserves_arrival_order() {
        let mut gate = ReadyGate::new();
        for name in ["A", "B", "C"] {
            assert!(gate.admit(RawDispatch::new(name, json!(null))).is_none());
        }
        assert_eq!(gate.buffered(), 3);

        let names: Vec<String> = gate.open().into_iter().map(|raw| raw.name).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert!(gate.is_ready());
        assert_eq!(gate.buffered(), 0);
        assert!(gate.open().is_empty());
    }
}
