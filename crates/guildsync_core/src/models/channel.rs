//! Cached channel shape and channel parsing.

use crate::{ChannelPayload, OverwritePayload, Permissions, Snowflake};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Platform channel types.
///
/// Serialized as the platform's integer code. Codes added by the platform
/// after this build are kept as [`ChannelType::Unknown`] so they round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ChannelType {
    /// Text channel
    GuildText,
    /// Direct message
    Dm,
    /// Voice channel
    GuildVoice,
    /// Group direct message
    GroupDm,
    /// Category
    GuildCategory,
    /// Announcement channel
    GuildAnnouncement,
    /// Thread in an announcement channel
    AnnouncementThread,
    /// Public thread
    PublicThread,
    /// Private thread
    PrivateThread,
    /// Stage channel
    GuildStageVoice,
    /// Student hub directory
    GuildDirectory,
    /// Forum
    GuildForum,
    /// Media channel
    GuildMedia,
    /// Any other code
    Unknown(u8),
}

impl ChannelType {
    /// Whether channels of this type are threads.
    pub fn is_thread(self) -> bool {
        matches!(
            self,
            ChannelType::AnnouncementThread | ChannelType::PublicThread | ChannelType::PrivateThread
        )
    }

    /// Whether channels of this type live outside any guild.
    pub fn is_direct_message(self) -> bool {
        matches!(self, ChannelType::Dm | ChannelType::GroupDm)
    }
}

impl From<u8> for ChannelType {
    fn from(code: u8) -> Self {
        match code {
            0 => ChannelType::GuildText,
            1 => ChannelType::Dm,
            2 => ChannelType::GuildVoice,
            3 => ChannelType::GroupDm,
            4 => ChannelType::GuildCategory,
            5 => ChannelType::GuildAnnouncement,
            10 => ChannelType::AnnouncementThread,
            11 => ChannelType::PublicThread,
            12 => ChannelType::PrivateThread,
            13 => ChannelType::GuildStageVoice,
            14 => ChannelType::GuildDirectory,
            15 => ChannelType::GuildForum,
            16 => ChannelType::GuildMedia,
            other => ChannelType::Unknown(other),
        }
    }
}

impl From<ChannelType> for u8 {
    fn from(kind: ChannelType) -> Self {
        match kind {
            ChannelType::GuildText => 0,
            ChannelType::Dm => 1,
            ChannelType::GuildVoice => 2,
            ChannelType::GroupDm => 3,
            ChannelType::GuildCategory => 4,
            ChannelType::GuildAnnouncement => 5,
            ChannelType::AnnouncementThread => 10,
            ChannelType::PublicThread => 11,
            ChannelType::PrivateThread => 12,
            ChannelType::GuildStageVoice => 13,
            ChannelType::GuildDirectory => 14,
            ChannelType::GuildForum => 15,
            ChannelType::GuildMedia => 16,
            ChannelType::Unknown(code) => code,
        }
    }
}

/// Subject of a permission overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OverwriteType {
    /// `id` is a role
    Role,
    /// `id` is a user
    Member,
}

impl TryFrom<u8> for OverwriteType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(OverwriteType::Role),
            1 => Ok(OverwriteType::Member),
            other => Err(format!("unknown overwrite type {}", other)),
        }
    }
}

impl From<OverwriteType> for u8 {
    fn from(kind: OverwriteType) -> Self {
        match kind {
            OverwriteType::Role => 0,
            OverwriteType::Member => 1,
        }
    }
}

/// A stored permission overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedOverwrite {
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

impl From<&OverwritePayload> for CachedOverwrite {
    fn from(overwrite: &OverwritePayload) -> Self {
        Self {
            id: overwrite.id,
            kind: overwrite.kind,
            allow: overwrite.allow,
            deny: overwrite.deny,
        }
    }
}

/// Minimal stored channel or thread.
///
/// Regular channels carry `threads` (the IDs of their child threads) and no
/// thread state; threads carry `archived`/`locked` and no `threads`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedChannel {
    /// Channel name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Category for channels, parent channel for threads
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
    /// Overwrites keyed by subject ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_overwrites: Option<BTreeMap<Snowflake, CachedOverwrite>>,
    /// Channel type
    #[serde(rename = "type")]
    pub kind: ChannelType,
    /// Sort position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    /// Thread archived flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    /// Thread locked flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    /// Child thread IDs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<Vec<Snowflake>>,
}

impl CachedChannel {
    /// Whether this record is a thread.
    pub fn is_thread(&self) -> bool {
        self.kind.is_thread()
    }

    /// Whether this record is an archived thread.
    pub fn is_archived(&self) -> bool {
        self.archived.unwrap_or(false)
    }

    /// Child thread IDs, empty for threads.
    pub fn thread_ids(&self) -> &[Snowflake] {
        self.threads.as_deref().unwrap_or_default()
    }
}

/// Parse a regular channel. The thread list starts empty.
pub fn parse_channel(channel: &ChannelPayload) -> CachedChannel {
    CachedChannel {
        name: channel.name.clone(),
        parent_id: channel.parent_id,
        permission_overwrites: channel.permission_overwrites.as_ref().map(|overwrites| {
            overwrites
                .iter()
                .map(|overwrite| (overwrite.id, CachedOverwrite::from(overwrite)))
                .collect()
        }),
        kind: channel.kind,
        position: channel.position,
        archived: None,
        locked: None,
        threads: Some(Vec::new()),
    }
}

/// Parse a thread. Threads have no overwrites of their own.
pub fn parse_thread(thread: &ChannelPayload) -> CachedChannel {
    let metadata = thread.thread_metadata.as_ref();
    CachedChannel {
        name: thread.name.clone(),
        parent_id: thread.parent_id,
        permission_overwrites: None,
        kind: thread.kind,
        position: None,
        archived: metadata.map(|m| m.archived),
        locked: metadata.map(|m| m.locked),
        threads: None,
    }
}

/// Parse a guild snapshot's channels and threads into one map, filling each
/// parent's thread list from the threads that name it.
pub fn parse_channels(
    channels: Option<&[ChannelPayload]>,
    threads: Option<&[ChannelPayload]>,
) -> BTreeMap<Snowflake, CachedChannel> {
    let mut parsed: BTreeMap<Snowflake, CachedChannel> = BTreeMap::new();
    let mut children: BTreeMap<Snowflake, Vec<Snowflake>> = BTreeMap::new();

    for thread in threads.unwrap_or_default() {
        if let Some(parent) = thread.parent_id {
            children.entry(parent).or_default().push(thread.id);
        }
        parsed.insert(thread.id, parse_thread(thread));
    }

    for channel in channels.unwrap_or_default() {
        let mut cached = parse_channel(channel);
        if let Some(ids) = children.remove(&channel.id) {
            cached.threads = Some(ids);
        }
        parsed.insert(channel.id, cached);
    }

    parsed
}

/// Merge a channel update into the stored channel.
///
/// Everything comes from `new` except `threads`, which only thread events
/// maintain.
pub fn merge_channel(old: &CachedChannel, new: CachedChannel) -> CachedChannel {
    CachedChannel {
        threads: old.threads.clone(),
        ..new
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> ChannelPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_channel_type_codes() {
        assert_eq!(ChannelType::from(11), ChannelType::PublicThread);
        assert_eq!(u8::from(ChannelType::Unknown(99)), 99);
        assert!(ChannelType::PrivateThread.is_thread());
        assert!(!ChannelType::GuildForum.is_thread());
        assert!(ChannelType::GroupDm.is_direct_message());
    }

    #[test]
    fn test_parse_channel_keys_overwrites_by_id() {
        let channel = payload(json!({
            "id": "10",
            "type": 0,
            "guild_id": "1",
            "name": "general",
            "position": 2,
            "permission_overwrites": [
                {"id": "1", "type": 0, "allow": "0", "deny": "1024"}
            ],
            "topic": "ignored"
        }));
        let cached = parse_channel(&channel);
        let overwrites = cached.permission_overwrites.unwrap();
        assert_eq!(
            overwrites[&Snowflake::new(1)].deny,
            Permissions::VIEW_CHANNEL
        );
        assert_eq!(cached.threads, Some(vec![]));
        assert_eq!(cached.position, Some(2));
    }

    #[test]
    fn test_parse_channels_links_threads_to_parents() {
        let channels = vec![payload(json!({"id": "10", "type": 0, "name": "general"}))];
        let threads = vec![
            payload(json!({
                "id": "20", "type": 11, "parent_id": "10", "name": "t1",
                "thread_metadata": {"archived": false, "locked": true}
            })),
            payload(json!({"id": "21", "type": 11, "parent_id": "10", "name": "t2"})),
        ];

        let parsed = parse_channels(Some(&channels), Some(&threads));
        assert_eq!(parsed.len(), 3);
        assert_eq!(
            parsed[&Snowflake::new(10)].thread_ids(),
            &[Snowflake::new(20), Snowflake::new(21)]
        );
        let thread = &parsed[&Snowflake::new(20)];
        assert_eq!(thread.locked, Some(true));
        assert_eq!(thread.threads, None);
    }

    #[test]
    fn test_merge_channel_keeps_threads() {
        let mut old = parse_channel(&payload(json!({"id": "10", "type": 0, "name": "old"})));
        old.threads = Some(vec![Snowflake::new(20)]);
        let new = parse_channel(&payload(json!({"id": "10", "type": 0, "name": "new"})));

        let merged = merge_channel(&old, new);
        assert_eq!(merged.name.as_deref(), Some("new"));
        assert_eq!(merged.thread_ids(), &[Snowflake::new(20)]);
    }

    #[test]
    fn test_thread_record_shape() {
        let thread = parse_thread(&payload(json!({
            "id": "20", "type": 12, "parent_id": "10", "name": "t",
            "thread_metadata": {"archived": true, "locked": false}
        })));
        let value = serde_json::to_value(&thread).unwrap();
        assert_eq!(
            value,
            json!({"name": "t", "parent_id": "10", "type": 12, "archived": true, "locked": false})
        );
    }
}
