//! Guild aggregates for guildsync.
//!
//! This crate holds everything guildsync knows about a single guild:
//!
//! - identifiers ([`Snowflake`]) and capability masks ([`Permissions`])
//! - the dispatch payload shapes it consumes (`*Payload`)
//! - the minimal cached shapes ([`CachedGuild`], [`CachedChannel`],
//!   [`CachedRole`]) with their pure parse and merge functions
//! - [`Guild`], a store-backed handle that reads with availability checks
//!   and writes partial updates
//! - the permission calculator ([`base_permissions`], [`apply_overwrites`]
//!   and the `calculate_*` methods on [`Guild`])
//! - the store key layout ([`keys`])

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod calculator;
mod guild;
pub mod keys;
mod models;
mod payloads;
mod permissions;
mod snowflake;

pub use calculator::{apply_overwrites, base_permissions};
pub use guild::Guild;
pub use models::{
    CachedChannel, CachedGuild, CachedOverwrite, CachedRole, ChannelType, OverwriteType,
    merge_channel, merge_guilds, parse_channel, parse_channels, parse_guild, parse_role,
    parse_roles, parse_thread, unavailable_placeholder,
};
pub use payloads::{
    ChannelPayload, GuildPayload, GuildRoleDeletePayload, GuildRolePayload, MemberPayload,
    MemberUpdatePayload, OverwritePayload, ReadyPayload, RolePayload, ThreadDeletePayload,
    ThreadListSyncPayload, ThreadMetadataPayload, UnavailableGuildPayload, UserPayload,
};
pub use permissions::Permissions;
pub use snowflake::Snowflake;
