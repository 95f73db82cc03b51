//! Cached guild shape, guild parsing and merging.

use crate::{
    CachedChannel, CachedRole, GuildPayload, Snowflake, parse_channels, parse_roles,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Minimal stored guild, as seen by readers.
///
/// The stored document also carries the availability flag; it is a storage
/// concern, added by [`available_record`] and dropped again on read.
///
/// Guild update events carry no `channels` and no members, so `channels` and
/// `bot_member_roles` survive updates; they are maintained by guild create
/// and the more specific channel, thread and member events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedGuild {
    /// Guild name
    pub name: String,
    /// Icon hash
    #[serde(default)]
    pub icon: Option<String>,
    /// Owner's user ID
    pub owner_id: Snowflake,
    /// Channels and threads keyed by ID
    #[serde(default)]
    pub channels: BTreeMap<Snowflake, CachedChannel>,
    /// Roles keyed by ID
    #[serde(default)]
    pub roles: BTreeMap<Snowflake, CachedRole>,
    /// Role IDs held by the caching bot
    #[serde(rename = "botMemberRoles", default)]
    pub bot_member_roles: Vec<Snowflake>,
}

/// Name of the availability flag in a stored guild document.
pub(crate) const AVAILABILITY_FIELD: &str = "unavailable";

/// The record stored for a guild that is known but not reachable.
pub fn unavailable_placeholder() -> Value {
    json!({ "unavailable": true })
}

/// The document stored for a full, available guild record.
pub(crate) fn available_record(guild: &CachedGuild) -> serde_json::Result<Value> {
    let mut record = serde_json::to_value(guild)?;
    if let Value::Object(fields) = &mut record {
        fields.insert(AVAILABILITY_FIELD.to_string(), Value::Bool(false));
    }
    Ok(record)
}

/// Drop the availability flag from a stored record.
pub(crate) fn strip_availability(mut record: Value) -> Value {
    if let Value::Object(fields) = &mut record {
        fields.remove(AVAILABILITY_FIELD);
    }
    record
}

/// Parse a guild create or update payload.
///
/// `bot_member_roles` is taken from the member entry whose user is
/// `client_id`, and is empty when the payload has no such member.
pub fn parse_guild(guild: &GuildPayload, client_id: Option<Snowflake>) -> CachedGuild {
    let bot_member_roles = client_id
        .and_then(|client_id| {
            guild.members.as_ref()?.iter().find(|member| {
                member
                    .user
                    .as_ref()
                    .is_some_and(|user| user.id == client_id)
            })
        })
        .map(|member| member.roles.clone())
        .unwrap_or_default();

    CachedGuild {
        name: guild.name.clone(),
        icon: guild.icon.clone(),
        owner_id: guild.owner_id,
        channels: parse_channels(guild.channels.as_deref(), guild.threads.as_deref()),
        roles: parse_roles(&guild.roles),
        bot_member_roles,
    }
}

/// Merge a parsed guild update into the stored record.
pub fn merge_guilds(old: &CachedGuild, new: CachedGuild) -> CachedGuild {
    CachedGuild {
        channels: old.channels.clone(),
        bot_member_roles: old.bot_member_roles.clone(),
        name: new.name,
        icon: new.icon,
        owner_id: new.owner_id,
        roles: new.roles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Permissions;

    fn guild_payload() -> GuildPayload {
        serde_json::from_value(json!({
            "id": "100",
            "name": "Lounge",
            "icon": "abc",
            "owner_id": "7",
            "roles": [
                {"id": "100", "name": "@everyone", "permissions": "1024", "position": 0, "color": 0},
                {"id": "5", "name": "mod", "permissions": "8192", "position": 3, "color": 255}
            ],
            "channels": [{"id": "10", "type": 0, "name": "general"}],
            "members": [
                {"user": {"id": "7"}, "roles": []},
                {"user": {"id": "42"}, "roles": ["5"]}
            ],
            "member_count": 2
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_guild_strips_to_minimal_shape() {
        let parsed = parse_guild(&guild_payload(), Some(Snowflake::new(42)));
        assert_eq!(parsed.bot_member_roles, vec![Snowflake::new(5)]);
        assert_eq!(
            parsed.roles[&Snowflake::new(100)].permissions,
            Permissions::VIEW_CHANNEL
        );

        let value = serde_json::to_value(&parsed).unwrap();
        let mut fields: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        fields.sort_unstable();
        assert_eq!(
            fields,
            vec!["botMemberRoles", "channels", "icon", "name", "owner_id", "roles"]
        );
    }

    #[test]
    fn test_stored_record_carries_availability_only_in_storage() {
        let parsed = parse_guild(&guild_payload(), None);

        let stored = available_record(&parsed).unwrap();
        assert_eq!(stored["unavailable"], json!(false));

        let read_back = strip_availability(stored);
        assert!(read_back.get("unavailable").is_none());
        assert_eq!(serde_json::from_value::<CachedGuild>(read_back).unwrap(), parsed);
    }

    #[test]
    fn test_parse_guild_without_bot_member() {
        let parsed = parse_guild(&guild_payload(), None);
        assert!(parsed.bot_member_roles.is_empty());
    }

    #[test]
    fn test_merge_carries_event_absent_fields() {
        let old = parse_guild(&guild_payload(), Some(Snowflake::new(42)));

        let mut update = guild_payload();
        update.name = "Renamed".to_string();
        update.channels = None;
        update.members = None;
        update.roles.truncate(1);
        let new = parse_guild(&update, Some(Snowflake::new(42)));

        let merged = merge_guilds(&old, new.clone());
        assert_eq!(merged.name, "Renamed");
        assert_eq!(merged.roles.len(), 1);
        assert_eq!(merged.channels, old.channels);
        assert_eq!(merged.bot_member_roles, old.bot_member_roles);

        let twice = merge_guilds(&merged, new);
        assert_eq!(twice, merged);
    }
}
