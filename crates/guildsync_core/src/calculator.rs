//! Effective permission calculation.
//!
//! Follows the platform's documented overwrite model: guild permissions are
//! the union of the everyone role and every held role; channel permissions
//! then apply the everyone overwrite, the combined role overwrites and the
//! member overwrite, in that order. Owners and administrators bypass
//! everything.

use crate::{CachedOverwrite, Guild, Permissions, Snowflake};
use guildsync_error::{CacheError, CacheErrorKind, GuildsyncResult};
use std::collections::BTreeMap;
use tracing::instrument;

/// Guild-level permissions from the everyone role and the held roles.
///
/// Returns [`Permissions::ALL`] when the result includes administrator.
pub fn base_permissions(
    everyone: Option<Permissions>,
    held: impl IntoIterator<Item = Permissions>,
) -> Permissions {
    let permissions = held
        .into_iter()
        .fold(everyone.unwrap_or(Permissions::NONE), |acc, role| acc | role);
    if permissions.contains(Permissions::ADMINISTRATOR) {
        Permissions::ALL
    } else {
        permissions
    }
}

/// Apply a channel's overwrites to guild-level permissions.
///
/// Role overwrites are combined before they are applied: every held role's
/// deny is cleared, then every held role's allow is set.
///
/// # Example
///
/// ```
/// use guildsync_core::{CachedOverwrite, OverwriteType, Permissions, Snowflake, apply_overwrites};
/// use std::collections::BTreeMap;
///
/// let guild_id = Snowflake::new(1);
/// let user_id = Snowflake::new(2);
/// let mut overwrites = BTreeMap::new();
/// overwrites.insert(guild_id, CachedOverwrite {
///     id: guild_id,
///     kind: OverwriteType::Role,
///     allow: Permissions::NONE,
///     deny: Permissions::SEND_MESSAGES,
/// });
///
/// let base = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;
/// let result = apply_overwrites(base, guild_id, user_id, &[], &overwrites);
/// assert_eq!(result, Permissions::VIEW_CHANNEL);
/// ```
pub fn apply_overwrites(
    base: Permissions,
    guild_id: Snowflake,
    user_id: Snowflake,
    roles: &[Snowflake],
    overwrites: &BTreeMap<Snowflake, CachedOverwrite>,
) -> Permissions {
    if base.contains(Permissions::ADMINISTRATOR) {
        return Permissions::ALL;
    }

    let mut total = base;
    if let Some(everyone) = overwrites.get(&guild_id) {
        total = total.apply(everyone.allow, everyone.deny);
    }

    let (allow, deny) = roles
        .iter()
        .filter_map(|role| overwrites.get(role))
        .fold((Permissions::NONE, Permissions::NONE), |(allow, deny), o| {
            (allow | o.allow, deny | o.deny)
        });
    total = total.apply(allow, deny);

    if let Some(member) = overwrites.get(&user_id) {
        total = total.apply(member.allow, member.deny);
    }
    total
}

fn channel_not_found(guild_id: Snowflake, channel_id: Snowflake) -> CacheError {
    CacheError::new(CacheErrorKind::ChannelNotFound {
        guild_id: guild_id.get(),
        channel_id: channel_id.get(),
    })
}

impl Guild {
    /// Permissions of `user_id` holding `roles` across the whole guild.
    #[instrument(skip(self, roles), fields(guild_id = %self.id()))]
    pub async fn calculate_guild_permissions(
        &self,
        user_id: Snowflake,
        roles: &[Snowflake],
    ) -> GuildsyncResult<Permissions> {
        if user_id == self.owner_id().await? {
            return Ok(Permissions::ALL);
        }

        let mut ids = roles.to_vec();
        ids.push(self.id());
        let cached = self.roles(&ids).await?;

        let everyone = cached.get(&self.id()).map(|role| role.permissions);
        let held = roles
            .iter()
            .filter_map(|id| cached.get(id))
            .map(|role| role.permissions);
        Ok(base_permissions(everyone, held))
    }

    /// Permissions of `user_id` holding `roles` in one channel.
    ///
    /// Threads use their parent channel's overwrites.
    #[instrument(skip(self, roles), fields(guild_id = %self.id()))]
    pub async fn calculate_channel_permissions(
        &self,
        user_id: Snowflake,
        roles: &[Snowflake],
        channel_id: Snowflake,
    ) -> GuildsyncResult<Permissions> {
        let mut channel = self
            .channel(channel_id)
            .await?
            .ok_or_else(|| channel_not_found(self.id(), channel_id))?;

        if channel.is_thread() {
            let parent_id = channel
                .parent_id
                .ok_or_else(|| channel_not_found(self.id(), channel_id))?;
            channel = self
                .channel(parent_id)
                .await?
                .ok_or_else(|| channel_not_found(self.id(), parent_id))?;
        }

        // Administrators already resolved to ALL at guild level.
        let guild_permissions = self.calculate_guild_permissions(user_id, roles).await?;
        Ok(match &channel.permission_overwrites {
            Some(overwrites) => {
                apply_overwrites(guild_permissions, self.id(), user_id, roles, overwrites)
            }
            None => guild_permissions,
        })
    }

    /// Guild permissions of the caching bot.
    pub async fn calculate_bot_guild_permissions(&self) -> GuildsyncResult<Permissions> {
        let bot_id = self.client_id().await?;
        let roles = self.bot_member_roles().await?;
        self.calculate_guild_permissions(bot_id, &roles).await
    }

    /// Channel permissions of the caching bot.
    pub async fn calculate_bot_channel_permissions(
        &self,
        channel_id: Snowflake,
    ) -> GuildsyncResult<Permissions> {
        let bot_id = self.client_id().await?;
        let roles = self.bot_member_roles().await?;
        self.calculate_channel_permissions(bot_id, &roles, channel_id)
            .await
    }

    /// Highest position among the cached roles in `roles`, or `0`.
    pub async fn highest_role_position(&self, roles: &[Snowflake]) -> GuildsyncResult<i64> {
        let cached = self.roles(roles).await?;
        Ok(cached
            .values()
            .map(|role| role.position)
            .fold(0, i64::max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OverwriteType;

    fn overwrite(id: u64, kind: OverwriteType, allow: Permissions, deny: Permissions) -> CachedOverwrite {
        CachedOverwrite {
            id: Snowflake::new(id),
            kind,
            allow,
            deny,
        }
    }

    #[test]
    fn test_base_permissions_unions_roles() {
        let result = base_permissions(
            Some(Permissions::VIEW_CHANNEL),
            [Permissions::SEND_MESSAGES, Permissions::ATTACH_FILES],
        );
        assert_eq!(
            result,
            Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::ATTACH_FILES
        );
        assert_eq!(base_permissions(None, []), Permissions::NONE);
    }

    #[test]
    fn test_base_permissions_administrator_is_all() {
        let result = base_permissions(None, [Permissions::ADMINISTRATOR]);
        assert_eq!(result, Permissions::ALL);
    }

    #[test]
    fn test_overwrite_precedence_formula() {
        let guild_id = Snowflake::new(1);
        let user_id = Snowflake::new(2);
        let role_a = Snowflake::new(3);
        let role_b = Snowflake::new(4);

        let base = Permissions::VIEW_CHANNEL
            | Permissions::SEND_MESSAGES
            | Permissions::EMBED_LINKS
            | Permissions::ADD_REACTIONS;
        let (allow_e, deny_e) = (Permissions::ATTACH_FILES, Permissions::SEND_MESSAGES);
        let (allow_a, deny_a) = (Permissions::SEND_MESSAGES, Permissions::EMBED_LINKS);
        let (allow_b, deny_b) = (Permissions::NONE, Permissions::ATTACH_FILES);
        let (allow_m, deny_m) = (Permissions::EMBED_LINKS, Permissions::ADD_REACTIONS);

        let mut overwrites = BTreeMap::new();
        overwrites.insert(guild_id, overwrite(1, OverwriteType::Role, allow_e, deny_e));
        overwrites.insert(role_a, overwrite(3, OverwriteType::Role, allow_a, deny_a));
        overwrites.insert(role_b, overwrite(4, OverwriteType::Role, allow_b, deny_b));
        overwrites.insert(user_id, overwrite(2, OverwriteType::Member, allow_m, deny_m));

        let allow_r = allow_a | allow_b;
        let deny_r = deny_a | deny_b;
        let expected = (((((base & !deny_e) | allow_e) & !deny_r) | allow_r) & !deny_m) | allow_m;

        let result = apply_overwrites(base, guild_id, user_id, &[role_a, role_b], &overwrites);
        assert_eq!(result, expected);
        assert_eq!(
            result,
            Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::EMBED_LINKS
        );
    }

    #[test]
    fn test_role_overwrites_combine_before_applying() {
        let guild_id = Snowflake::new(1);
        let user_id = Snowflake::new(2);
        let mut overwrites = BTreeMap::new();
        overwrites.insert(
            Snowflake::new(3),
            overwrite(3, OverwriteType::Role, Permissions::SEND_MESSAGES, Permissions::NONE),
        );
        overwrites.insert(
            Snowflake::new(4),
            overwrite(4, OverwriteType::Role, Permissions::NONE, Permissions::SEND_MESSAGES),
        );

        // A role allow wins over another role's deny, whatever the order.
        for roles in [
            [Snowflake::new(3), Snowflake::new(4)],
            [Snowflake::new(4), Snowflake::new(3)],
        ] {
            let result = apply_overwrites(Permissions::NONE, guild_id, user_id, &roles, &overwrites);
            assert_eq!(result, Permissions::SEND_MESSAGES);
        }
    }

    #[test]
    fn test_administrator_ignores_overwrites() {
        let guild_id = Snowflake::new(1);
        let mut overwrites = BTreeMap::new();
        overwrites.insert(
            guild_id,
            overwrite(1, OverwriteType::Role, Permissions::NONE, Permissions::ALL),
        );
        let result = apply_overwrites(
            Permissions::ADMINISTRATOR,
            guild_id,
            Snowflake::new(2),
            &[],
            &overwrites,
        );
        assert_eq!(result, Permissions::ALL);
    }
}
