//! Per-session state passed to handlers.

use guildsync_core::Snowflake;

/// What a shard session knows about itself.
///
/// Written only by the ready handler; every other handler reads it. The
/// session processes events one at a time, so no locking is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    shard_id: u32,
    client_id: Option<Snowflake>,
    session_id: Option<String>,
}

impl SessionContext {
    /// Context for `shard_id` before ready.
    pub fn new(shard_id: u32) -> Self {
        Self {
            shard_id,
            ..Self::default()
        }
    }

    /// Shard this session serves.
    pub fn shard_id(&self) -> u32 {
        self.shard_id
    }

    /// The caching bot's user ID, known after ready.
    pub fn client_id(&self) -> Option<Snowflake> {
        self.client_id
    }

    /// Session identifier from ready.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Whether `user_id` is the caching bot.
    pub fn is_self(&self, user_id: Snowflake) -> bool {
        self.client_id == Some(user_id)
    }

    pub(crate) fn record_ready(&mut self, client_id: Snowflake, session_id: Option<String>) {
        self.client_id = Some(client_id);
        self.session_id = session_id;
    }
}
