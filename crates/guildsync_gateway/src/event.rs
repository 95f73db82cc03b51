//! Dispatch events.

use guildsync_core::{
    ChannelPayload, GuildPayload, GuildRoleDeletePayload, GuildRolePayload, MemberUpdatePayload,
    ReadyPayload, ThreadDeletePayload, ThreadListSyncPayload, UnavailableGuildPayload,
};
use guildsync_error::GuildsyncResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// A named dispatch as delivered by the transport, payload still undecoded.
///
/// Serialized with the platform's frame field names, `t` and `d`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDispatch {
    /// Event name, e.g. `GUILD_CREATE`
    #[serde(rename = "t")]
    pub name: String,
    /// Event payload
    #[serde(rename = "d", default)]
    pub payload: Value,
}

impl RawDispatch {
    /// Create a dispatch.
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Event kind, or `None` for names guildsync does not handle.
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_str(&self.name).ok()
    }

    /// Whether this is the ready snapshot.
    pub fn is_ready(&self) -> bool {
        self.kind() == Some(EventKind::Ready)
    }
}

/// Every dispatch name guildsync handles.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// `READY`
    Ready,
    /// `GUILD_CREATE`
    GuildCreate,
    /// `GUILD_UPDATE`
    GuildUpdate,
    /// `GUILD_DELETE`
    GuildDelete,
    /// `CHANNEL_CREATE`
    ChannelCreate,
    /// `CHANNEL_UPDATE`
    ChannelUpdate,
    /// `CHANNEL_DELETE`
    ChannelDelete,
    /// `GUILD_ROLE_CREATE`
    GuildRoleCreate,
    /// `GUILD_ROLE_UPDATE`
    GuildRoleUpdate,
    /// `GUILD_ROLE_DELETE`
    GuildRoleDelete,
    /// `THREAD_CREATE`
    ThreadCreate,
    /// `THREAD_UPDATE`
    ThreadUpdate,
    /// `THREAD_DELETE`
    ThreadDelete,
    /// `THREAD_LIST_SYNC`
    ThreadListSync,
    /// `GUILD_MEMBER_UPDATE`
    GuildMemberUpdate,
}

/// A decoded dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// Session baseline
    Ready(ReadyPayload),
    /// Full guild snapshot
    GuildCreate(GuildPayload),
    /// Guild settings changed
    GuildUpdate(GuildPayload),
    /// Guild left, or in an outage when `unavailable` is set
    GuildDelete(UnavailableGuildPayload),
    /// Channel created
    ChannelCreate(ChannelPayload),
    /// Channel changed
    ChannelUpdate(ChannelPayload),
    /// Channel removed
    ChannelDelete(ChannelPayload),
    /// Role created
    GuildRoleCreate(GuildRolePayload),
    /// Role changed
    GuildRoleUpdate(GuildRolePayload),
    /// Role removed
    GuildRoleDelete(GuildRoleDeletePayload),
    /// Thread created or joined
    ThreadCreate(ChannelPayload),
    /// Thread changed
    ThreadUpdate(ChannelPayload),
    /// Thread removed
    ThreadDelete(ThreadDeletePayload),
    /// Active threads resynchronized
    ThreadListSync(ThreadListSyncPayload),
    /// A member's roles changed
    GuildMemberUpdate(MemberUpdatePayload),
}

impl DispatchEvent {
    /// Decode a raw dispatch.
    ///
    /// Returns `Ok(None)` for event names with no variant, and an error when a
    /// known event's payload does not match its shape.
    pub fn decode(raw: RawDispatch) -> GuildsyncResult<Option<Self>> {
        let Some(kind) = raw.kind() else {
            return Ok(None);
        };
        let payload = raw.payload;
        let event = match kind {
            EventKind::Ready => Self::Ready(serde_json::from_value(payload)?),
            EventKind::GuildCreate => Self::GuildCreate(serde_json::from_value(payload)?),
            EventKind::GuildUpdate => Self::GuildUpdate(serde_json::from_value(payload)?),
            EventKind::GuildDelete => Self::GuildDelete(serde_json::from_value(payload)?),
            EventKind::ChannelCreate => Self::ChannelCreate(serde_json::from_value(payload)?),
            EventKind::ChannelUpdate => Self::ChannelUpdate(serde_json::from_value(payload)?),
            EventKind::ChannelDelete => Self::ChannelDelete(serde_json::from_value(payload)?),
            EventKind::GuildRoleCreate => Self::GuildRoleCreate(serde_json::from_value(payload)?),
            EventKind::GuildRoleUpdate => Self::GuildRoleUpdate(serde_json::from_value(payload)?),
            EventKind::GuildRoleDelete => Self::GuildRoleDelete(serde_json::from_value(payload)?),
            EventKind::ThreadCreate => Self::ThreadCreate(serde_json::from_value(payload)?),
            EventKind::ThreadUpdate => Self::ThreadUpdate(serde_json::from_value(payload)?),
            EventKind::ThreadDelete => Self::ThreadDelete(serde_json::from_value(payload)?),
            EventKind::ThreadListSync => Self::ThreadListSync(serde_json::from_value(payload)?),
            EventKind::GuildMemberUpdate => {
                Self::GuildMemberUpdate(serde_json::from_value(payload)?)
            }
        };
        Ok(Some(event))
    }

    /// The event's kind.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ready(_) => EventKind::Ready,
            Self::GuildCreate(_) => EventKind::GuildCreate,
            Self::GuildUpdate(_) => EventKind::GuildUpdate,
            Self::GuildDelete(_) => EventKind::GuildDelete,
            Self::ChannelCreate(_) => EventKind::ChannelCreate,
            Self::ChannelUpdate(_) => EventKind::ChannelUpdate,
            Self::ChannelDelete(_) => EventKind::ChannelDelete,
            Self::GuildRoleCreate(_) => EventKind::GuildRoleCreate,
            Self::GuildRoleUpdate(_) => EventKind::GuildRoleUpdate,
            Self::GuildRoleDelete(_) => EventKind::GuildRoleDelete,
            Self::ThreadCreate(_) => EventKind::ThreadCreate,
            Self::ThreadUpdate(_) => EventKind::ThreadUpdate,
            Self::ThreadDelete(_) => EventKind::ThreadDelete,
            Self::ThreadListSync(_) => EventKind::ThreadListSync,
            Self::GuildMemberUpdate(_) => EventKind::GuildMemberUpdate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[test]
    fn test_names_round_trip() {
        for kind in EventKind::iter() {
            assert_eq!(EventKind::from_str(kind.as_ref()).unwrap(), kind);
        }
        assert_eq!(EventKind::GuildRoleCreate.to_string(), "GUILD_ROLE_CREATE");
        assert_eq!(EventKind::ThreadListSync.to_string(), "THREAD_LIST_SYNC");
    }

    #[test]
    fn test_unknown_name_decodes_to_none() {
        let raw = RawDispatch::new("MESSAGE_CREATE", json!({"content": "hi"}));
        assert_eq!(DispatchEvent::decode(raw).unwrap(), None);
    }

    #[test]
    fn test_bad_payload_is_an_error() {
        let raw = RawDispatch::new("GUILD_ROLE_DELETE", json!({"guild_id": "1"}));
        assert!(DispatchEvent::decode(raw).is_err());
    }

    #[test]
    fn test_frame_field_names() {
        let raw: RawDispatch =
            serde_json::from_value(json!({"t": "GUILD_DELETE", "d": {"id": "1"}})).unwrap();
        let event = DispatchEvent::decode(raw).unwrap().unwrap();
        assert_eq!(event.kind(), EventKind::GuildDelete);
    }
}
