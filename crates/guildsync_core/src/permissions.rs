//! Capability bitmask.

use bitflags::bitflags;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// A set of capabilities, one bit per permission.
    ///
    /// The platform's permission set has outgrown 32 bits and keeps growing,
    /// so the mask is a `u128`. It is serialized as a decimal string,
    /// matching the platform's wire format. Bits this build has no name for
    /// are kept as they are.
    ///
    /// # Example
    ///
    /// ```
    /// use guildsync_core::Permissions;
    ///
    /// let perms = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;
    /// assert!(perms.contains(Permissions::VIEW_CHANNEL));
    /// assert!(!perms.contains(Permissions::ADMINISTRATOR));
    /// assert_eq!(serde_json::to_string(&perms).unwrap(), "\"3072\"");
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Permissions: u128 {
        /// Create instant invites
        const CREATE_INSTANT_INVITE = 1 << 0;
        /// Kick members
        const KICK_MEMBERS = 1 << 1;
        /// Ban members
        const BAN_MEMBERS = 1 << 2;
        /// Bypasses every overwrite and grants every capability
        const ADMINISTRATOR = 1 << 3;
        /// Manage channels
        const MANAGE_CHANNELS = 1 << 4;
        /// Manage the guild
        const MANAGE_GUILD = 1 << 5;
        /// Add reactions
        const ADD_REACTIONS = 1 << 6;
        /// View the audit log
        const VIEW_AUDIT_LOG = 1 << 7;
        /// Priority speaker in voice
        const PRIORITY_SPEAKER = 1 << 8;
        /// Stream video
        const STREAM = 1 << 9;
        /// View channels
        const VIEW_CHANNEL = 1 << 10;
        /// Send messages
        const SEND_MESSAGES = 1 << 11;
        /// Send text-to-speech messages
        const SEND_TTS_MESSAGES = 1 << 12;
        /// Manage messages
        const MANAGE_MESSAGES = 1 << 13;
        /// Embed links
        const EMBED_LINKS = 1 << 14;
        /// Attach files
        const ATTACH_FILES = 1 << 15;
        /// Read message history
        const READ_MESSAGE_HISTORY = 1 << 16;
        /// Mention everyone
        const MENTION_EVERYONE = 1 << 17;
        /// Use external emojis
        const USE_EXTERNAL_EMOJIS = 1 << 18;
        /// View guild insights
        const VIEW_GUILD_INSIGHTS = 1 << 19;
        /// Connect to voice
        const CONNECT = 1 << 20;
        /// Speak in voice
        const SPEAK = 1 << 21;
        /// Mute members
        const MUTE_MEMBERS = 1 << 22;
        /// Deafen members
        const DEAFEN_MEMBERS = 1 << 23;
        /// Move members
        const MOVE_MEMBERS = 1 << 24;
        /// Use voice activity detection
        const USE_VAD = 1 << 25;
        /// Change own nickname
        const CHANGE_NICKNAME = 1 << 26;
        /// Manage nicknames
        const MANAGE_NICKNAMES = 1 << 27;
        /// Manage roles
        const MANAGE_ROLES = 1 << 28;
        /// Manage webhooks
        const MANAGE_WEBHOOKS = 1 << 29;
        /// Manage emojis, stickers and sounds
        const MANAGE_GUILD_EXPRESSIONS = 1 << 30;
        /// Use application commands
        const USE_APPLICATION_COMMANDS = 1 << 31;
        /// Request to speak in stage channels
        const REQUEST_TO_SPEAK = 1 << 32;
        /// Manage scheduled events
        const MANAGE_EVENTS = 1 << 33;
        /// Manage threads
        const MANAGE_THREADS = 1 << 34;
        /// Create public threads
        const CREATE_PUBLIC_THREADS = 1 << 35;
        /// Create private threads
        const CREATE_PRIVATE_THREADS = 1 << 36;
        /// Use external stickers
        const USE_EXTERNAL_STICKERS = 1 << 37;
        /// Send messages in threads
        const SEND_MESSAGES_IN_THREADS = 1 << 38;
        /// Use embedded activities
        const USE_EMBEDDED_ACTIVITIES = 1 << 39;
        /// Time out members
        const MODERATE_MEMBERS = 1 << 40;
        /// View creator monetization analytics
        const VIEW_CREATOR_MONETIZATION_ANALYTICS = 1 << 41;
        /// Use the soundboard
        const USE_SOUNDBOARD = 1 << 42;
        /// Create emojis, stickers and sounds
        const CREATE_GUILD_EXPRESSIONS = 1 << 43;
        /// Create scheduled events
        const CREATE_EVENTS = 1 << 44;
        /// Use sounds from other guilds
        const USE_EXTERNAL_SOUNDS = 1 << 45;
        /// Send voice messages
        const SEND_VOICE_MESSAGES = 1 << 46;
        /// Create polls
        const SEND_POLLS = 1 << 49;
        /// Use user-installed apps
        const USE_EXTERNAL_APPS = 1 << 50;
    }
}

impl Permissions {
    /// No capabilities.
    pub const NONE: Permissions = Permissions::empty();

    /// Every capability known to this build.
    pub const ALL: Permissions = Permissions::all();

    /// Clear every bit of `deny`, then set every bit of `allow`.
    ///
    /// Works on raw bits, so unnamed bits are cleared and set like any other.
    pub const fn apply(self, allow: Permissions, deny: Permissions) -> Permissions {
        Permissions::from_bits_retain((self.bits() & !deny.bits()) | allow.bits())
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.bits())
    }
}

struct PermissionsVisitor;

impl Visitor<'_> for PermissionsVisitor {
    type Value = Permissions;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a permission bitmask as a decimal string or unsigned integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Permissions, E> {
        Ok(Permissions::from_bits_retain(u128::from(v)))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Permissions, E> {
        Ok(Permissions::from_bits_retain(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Permissions, E> {
        v.parse()
            .map(Permissions::from_bits_retain)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PermissionsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_contains_every_flag() {
        assert!(Permissions::ALL.contains(Permissions::ADMINISTRATOR));
        assert!(Permissions::ALL.contains(Permissions::USE_EXTERNAL_APPS));
        assert!(Permissions::ALL.bits() > u128::from(u32::MAX));
    }

    #[test]
    fn test_apply_clears_then_sets() {
        let base = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;
        let result = base.apply(Permissions::SEND_MESSAGES, Permissions::SEND_MESSAGES);
        assert_eq!(result, base);

        let denied = base.apply(Permissions::NONE, Permissions::SEND_MESSAGES);
        assert_eq!(denied, Permissions::VIEW_CHANNEL);
    }

    #[test]
    fn test_unnamed_bits_survive_decode_and_apply() {
        let stored: Permissions = serde_json::from_str("\"1267650600228229401496703206400\"").unwrap();
        assert_eq!(stored.bits(), (1 << 100) | 1024);
        assert!(stored.contains(Permissions::VIEW_CHANNEL));

        let applied = stored.apply(Permissions::SEND_MESSAGES, Permissions::VIEW_CHANNEL);
        assert_eq!(applied.bits(), (1 << 100) | 2048);
        assert_eq!(serde_json::to_string(&applied).unwrap(), format!("\"{}\"", applied.bits()));

        let unioned = Permissions::from_bits_retain(1 << 120) | Permissions::ADMINISTRATOR;
        assert_eq!(unioned.bits(), (1 << 120) | 8);
    }

    #[test]
    fn test_wide_string_round_trip() {
        let wide = Permissions::from_bits_retain(1 << 100);
        let json = serde_json::to_string(&wide).unwrap();
        let back: Permissions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wide);
    }
}
