//! Dispatch payload shapes.
//!
//! Only the fields guildsync consumes are declared; serde ignores the rest of
//! the platform's documented schema.

use crate::{ChannelType, OverwriteType, Permissions, Snowflake};
use serde::{Deserialize, Serialize};

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    /// User ID
    pub id: Snowflake,
    /// Display name, when sent
    #[serde(default)]
    pub username: Option<String>,
}

/// A guild role as sent by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePayload {
    /// Role ID
    pub id: Snowflake,
    /// Role name
    pub name: String,
    /// Icon hash
    #[serde(default)]
    pub icon: Option<String>,
    /// Unicode emoji shown instead of an icon
    #[serde(default)]
    pub unicode_emoji: Option<String>,
    /// RGB color
    #[serde(default)]
    pub color: u32,
    /// Capability bitmask
    pub permissions: Permissions,
    /// Sort position
    #[serde(default)]
    pub position: i64,
}

/// A permission overwrite as sent by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverwritePayload {
    /// Role or user ID
    pub id: Snowflake,
    /// Whether `id` names a role or a member
    #[serde(rename = "type")]
    pub kind: OverwriteType,
    /// Granted capabilities
    pub allow: Permissions,
    /// Revoked capabilities
    pub deny: Permissions,
}

/// Thread-only channel fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMetadataPayload {
    /// Whether the thread is archived
    #[serde(default)]
    pub archived: bool,
    /// Whether the thread is locked
    #[serde(default)]
    pub locked: bool,
}

/// A channel or thread as sent by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPayload {
    /// Channel ID
    pub id: Snowflake,
    /// Channel type
    #[serde(rename = "type")]
    pub kind: ChannelType,
    /// Owning guild; absent for direct messages and inside guild snapshots
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Channel name
    #[serde(default)]
    pub name: Option<String>,
    /// Category for channels, parent channel for threads
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
    /// Permission overwrites
    #[serde(default)]
    pub permission_overwrites: Option<Vec<OverwritePayload>>,
    /// Sort position
    #[serde(default)]
    pub position: Option<i64>,
    /// Thread state
    #[serde(default)]
    pub thread_metadata: Option<ThreadMetadataPayload>,
}

impl ChannelPayload {
    /// Whether this channel belongs to a guild and may be cached.
    pub fn is_guild_channel(&self) -> bool {
        self.guild_id.is_some() && !self.kind.is_direct_message()
    }
}

/// A guild member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPayload {
    /// The member's user; omitted in some contexts
    #[serde(default)]
    pub user: Option<UserPayload>,
    /// Role IDs held
    #[serde(default)]
    pub roles: Vec<Snowflake>,
}

/// A full guild, as carried by guild create and update events.
///
/// Update events omit `channels`, `threads` and `members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildPayload {
    /// Guild ID
    pub id: Snowflake,
    /// Guild name
    pub name: String,
    /// Icon hash
    #[serde(default)]
    pub icon: Option<String>,
    /// Owner's user ID
    pub owner_id: Snowflake,
    /// Roles
    #[serde(default)]
    pub roles: Vec<RolePayload>,
    /// Channels
    #[serde(default)]
    pub channels: Option<Vec<ChannelPayload>>,
    /// Active threads
    #[serde(default)]
    pub threads: Option<Vec<ChannelPayload>>,
    /// Members sent with the snapshot
    #[serde(default)]
    pub members: Option<Vec<MemberPayload>>,
}

/// A guild the session can see but has no data for yet, or a guild delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableGuildPayload {
    /// Guild ID
    pub id: Snowflake,
    /// Set when the guild is in an outage rather than gone
    #[serde(default)]
    pub unavailable: bool,
}

/// The ready snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyPayload {
    /// The connected bot user
    pub user: UserPayload,
    /// Every guild the session sees
    #[serde(default)]
    pub guilds: Vec<UnavailableGuildPayload>,
    /// Session identifier
    #[serde(default)]
    pub session_id: Option<String>,
    /// `[shard_id, shard_count]` when sharding
    #[serde(default)]
    pub shard: Option<[u32; 2]>,
}

/// Role create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRolePayload {
    /// Owning guild
    pub guild_id: Snowflake,
    /// The full role
    pub role: RolePayload,
}

/// Role delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRoleDeletePayload {
    /// Owning guild
    pub guild_id: Snowflake,
    /// Deleted role
    pub role_id: Snowflake,
}

/// Thread delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadDeletePayload {
    /// Thread ID
    pub id: Snowflake,
    /// Owning guild
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Parent channel
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
    /// Thread type
    #[serde(rename = "type")]
    pub kind: ChannelType,
}

/// Bulk thread resynchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadListSyncPayload {
    /// Owning guild
    pub guild_id: Snowflake,
    /// Parent channels being synced; every channel when absent
    #[serde(default)]
    pub channel_ids: Option<Vec<Snowflake>>,
    /// Every active thread in scope
    #[serde(default)]
    pub threads: Vec<ChannelPayload>,
}

/// Guild member update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberUpdatePayload {
    /// Owning guild
    pub guild_id: Snowflake,
    /// The updated user
    pub user: UserPayload,
    /// Role IDs now held
    #[serde(default)]
    pub roles: Vec<Snowflake>,
}
