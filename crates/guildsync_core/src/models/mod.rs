//! Cached aggregate shapes and the pure parse/merge functions over them.

mod channel;
mod guild;
mod role;

pub use channel::{
    CachedChannel, CachedOverwrite, ChannelType, OverwriteType, merge_channel, parse_channel,
    parse_channels, parse_thread,
};
pub(crate) use guild::{AVAILABILITY_FIELD, available_record, strip_availability};
pub use guild::{CachedGuild, merge_guilds, parse_guild, unavailable_placeholder};
pub use role::{CachedRole, parse_role, parse_roles};
