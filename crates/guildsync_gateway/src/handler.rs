//! Per-event cache handlers.

use crate::{DispatchEvent, SessionContext};
use guildsync_cache::FieldCacheConfig;
use guildsync_core::keys::CLIENT_ID_KEY;
use guildsync_core::{
    ChannelPayload, Guild, GuildPayload, GuildRoleDeletePayload, GuildRolePayload,
    MemberUpdatePayload, ReadyPayload, Snowflake, ThreadDeletePayload, ThreadListSyncPayload,
    UnavailableGuildPayload, merge_channel, merge_guilds, parse_channel, parse_guild,
};
use guildsync_error::{GuildsyncError, GuildsyncResult};
use guildsync_shard::ShardRegistry;
use guildsync_store::SharedStore;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, trace, warn};

/// Applies decoded dispatch events to the store.
///
/// Every handler is a short sequence of awaited store commands with no
/// locking. Two handlers touching the same guild concurrently can therefore
/// interleave their fetch and write and lose an update; [`crate::ShardSession`]
/// avoids that by running them one at a time.
#[derive(Clone)]
pub struct CacheEventHandler {
    store: SharedStore,
    registry: ShardRegistry,
    cache_config: FieldCacheConfig,
}

impl std::fmt::Debug for CacheEventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEventHandler")
            .field("registry", &self.registry)
            .field("cache_config", &self.cache_config)
            .finish()
    }
}

/// Missing and unavailable guilds are skipped by channel and thread events;
/// the next guild create brings the full record.
fn is_absent_guild(err: &GuildsyncError) -> bool {
    err.is_guild_not_found() || err.is_guild_unavailable()
}

impl CacheEventHandler {
    /// Create a handler writing to `store` and registering guilds in
    /// `registry`.
    pub fn new(store: SharedStore, registry: ShardRegistry) -> Self {
        Self {
            store,
            registry,
            cache_config: FieldCacheConfig::default(),
        }
    }

    /// Use `config` for the field cache of every guild handle.
    pub fn with_cache_config(mut self, config: FieldCacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Store the handler writes to.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Registry the handler maintains.
    pub fn registry(&self) -> &ShardRegistry {
        &self.registry
    }

    fn guild(&self, id: Snowflake) -> Guild {
        Guild::with_cache_config(id, self.store.clone(), self.cache_config.clone())
    }

    /// Apply one event.
    ///
    /// Only `Ready` writes to `ctx`.
    #[instrument(skip(self, ctx, event), fields(shard_id = ctx.shard_id(), event = %event.kind()))]
    pub async fn handle(
        &self,
        ctx: &mut SessionContext,
        event: DispatchEvent,
    ) -> GuildsyncResult<()> {
        match event {
            DispatchEvent::Ready(payload) => self.ready(ctx, payload).await,
            DispatchEvent::GuildCreate(payload) => self.guild_create(ctx, payload).await,
            DispatchEvent::GuildUpdate(payload) => self.guild_update(ctx, payload).await,
            DispatchEvent::GuildDelete(payload) => self.guild_delete(payload).await,
            DispatchEvent::ChannelCreate(payload) => self.channel_create(payload).await,
            DispatchEvent::ChannelUpdate(payload) => self.channel_update(payload).await,
            DispatchEvent::ChannelDelete(payload) => self.channel_delete(payload).await,
            DispatchEvent::GuildRoleCreate(payload) | DispatchEvent::GuildRoleUpdate(payload) => {
                self.role_save(payload).await
            }
            DispatchEvent::GuildRoleDelete(payload) => self.role_delete(payload).await,
            DispatchEvent::ThreadCreate(payload) | DispatchEvent::ThreadUpdate(payload) => {
                self.thread_save(payload).await
            }
            DispatchEvent::ThreadDelete(payload) => self.thread_delete(payload).await,
            DispatchEvent::ThreadListSync(payload) => self.thread_list_sync(payload).await,
            DispatchEvent::GuildMemberUpdate(payload) => self.member_update(ctx, payload).await,
        }
    }

    // Session baseline

    async fn ready(&self, ctx: &mut SessionContext, payload: ReadyPayload) -> GuildsyncResult<()> {
        let shard_id = ctx.shard_id();
        if let Some([reported, _]) = payload.shard
            && reported != shard_id
        {
            warn!(reported, "Ready reports a different shard than the session serves");
        }

        let mut seen = BTreeSet::new();
        let ids: Vec<Snowflake> = payload
            .guilds
            .iter()
            .map(|guild| guild.id)
            .filter(|id| seen.insert(*id))
            .collect();

        let previous = self.registry.guild_ids(shard_id).await?;
        let vanished: Vec<Snowflake> = previous
            .into_iter()
            .filter(|id| !seen.contains(id))
            .collect();
        if !vanished.is_empty() {
            warn!(count = vanished.len(), "Guilds vanished since last session, deleting");
        }
        for id in &vanished {
            self.guild(*id).delete().await?;
        }

        self.registry.replace_guild_ids(shard_id, &ids).await?;
        self.registry.reset_guild_count(shard_id).await?;
        for id in &ids {
            self.guild(*id).save_unavailable().await?;
        }

        let client_id = payload.user.id;
        ctx.record_ready(client_id, payload.session_id);
        self.store
            .set(CLIENT_ID_KEY, &client_id.to_string(), None)
            .await?;

        info!(
            guilds = ids.len(),
            vanished = vanished.len(),
            client_id = %client_id,
            "Ready baseline applied"
        );
        Ok(())
    }

    // Guilds

    async fn guild_create(&self, ctx: &SessionContext, payload: GuildPayload) -> GuildsyncResult<()> {
        self.guild(payload.id)
            .save_new(&payload, ctx.client_id())
            .await?;
        self.register(payload.id).await
    }

    async fn guild_update(&self, ctx: &SessionContext, payload: GuildPayload) -> GuildsyncResult<()> {
        let guild = self.guild(payload.id);
        let parsed = parse_guild(&payload, ctx.client_id());

        match guild.to_static().await {
            Ok(old) => guild.overwrite(&merge_guilds(&old, parsed)).await,
            Err(err) if is_absent_guild(&err) => {
                debug!(guild_id = %payload.id, reason = %err, "Update for uncached guild, storing as new");
                guild.overwrite(&parsed).await?;
                self.register(payload.id).await
            }
            Err(err) => Err(err),
        }
    }

    async fn guild_delete(&self, payload: UnavailableGuildPayload) -> GuildsyncResult<()> {
        let guild = self.guild(payload.id);
        if payload.unavailable {
            debug!(guild_id = %payload.id, "Guild outage, storing placeholder");
            return guild.save_unavailable().await;
        }

        let registered = self.registry.remove_guild(payload.id).await?;
        guild.delete().await?;
        if registered {
            self.registry
                .decrement_guild_count(self.registry.shard_for(payload.id))
                .await?;
        }
        Ok(())
    }

    /// Registry insert, then counter increment.
    async fn register(&self, guild_id: Snowflake) -> GuildsyncResult<()> {
        self.registry.insert_guild(guild_id).await?;
        self.registry
            .increment_guild_count(self.registry.shard_for(guild_id))
            .await?;
        Ok(())
    }

    // Channels

    async fn channel_create(&self, payload: ChannelPayload) -> GuildsyncResult<()> {
        let Some(guild_id) = guild_channel(&payload) else {
            return Ok(());
        };
        self.guild(guild_id).save_new_channel(&payload).await
    }

    async fn channel_update(&self, payload: ChannelPayload) -> GuildsyncResult<()> {
        let Some(guild_id) = guild_channel(&payload) else {
            return Ok(());
        };
        let guild = self.guild(guild_id);

        match guild.channel(payload.id).await {
            Ok(None) => guild.save_new_channel(&payload).await,
            Ok(Some(old)) => {
                let merged = merge_channel(&old, parse_channel(&payload));
                guild.overwrite_channel(payload.id, &merged).await
            }
            Err(err) if is_absent_guild(&err) => {
                debug!(guild_id = %guild_id, channel_id = %payload.id, reason = %err, "Channel update skipped");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn channel_delete(&self, payload: ChannelPayload) -> GuildsyncResult<()> {
        let Some(guild_id) = guild_channel(&payload) else {
            return Ok(());
        };
        self.guild(guild_id).delete_channel(payload.id).await
    }

    // Roles and members

    async fn role_save(&self, payload: GuildRolePayload) -> GuildsyncResult<()> {
        self.guild(payload.guild_id)
            .save_new_role(&payload.role)
            .await
    }

    async fn role_delete(&self, payload: GuildRoleDeletePayload) -> GuildsyncResult<()> {
        self.guild(payload.guild_id)
            .delete_role(payload.role_id)
            .await
    }

    async fn member_update(
        &self,
        ctx: &SessionContext,
        payload: MemberUpdatePayload,
    ) -> GuildsyncResult<()> {
        if !ctx.is_self(payload.user.id) {
            trace!(user_id = %payload.user.id, "Member update for another user ignored");
            return Ok(());
        }
        self.guild(payload.guild_id)
            .set_bot_member_roles(&payload.roles)
            .await
    }

    // Threads

    async fn thread_save(&self, payload: ChannelPayload) -> GuildsyncResult<()> {
        let Some(guild_id) = payload.guild_id else {
            trace!(thread_id = %payload.id, "Thread without guild ignored");
            return Ok(());
        };
        skip_absent_guild(guild_id, self.guild(guild_id).save_new_thread(&payload).await)
    }

    async fn thread_delete(&self, payload: ThreadDeletePayload) -> GuildsyncResult<()> {
        let Some(guild_id) = payload.guild_id else {
            trace!(thread_id = %payload.id, "Thread without guild ignored");
            return Ok(());
        };
        let result = self
            .guild(guild_id)
            .delete_thread(payload.id, payload.parent_id)
            .await;
        skip_absent_guild(guild_id, result)
    }

    async fn thread_list_sync(&self, payload: ThreadListSyncPayload) -> GuildsyncResult<()> {
        let guild = self.guild(payload.guild_id);
        match sync_threads(&guild, &payload).await {
            Err(err) if err.is_guild_not_found() => {
                debug!(guild_id = %payload.guild_id, "Thread sync for uncached guild skipped");
                Ok(())
            }
            other => other,
        }
    }
}

/// Guild ID of a channel that belongs in the cache.
fn guild_channel(payload: &ChannelPayload) -> Option<Snowflake> {
    if !payload.is_guild_channel() {
        trace!(channel_id = %payload.id, kind = ?payload.kind, "Non-guild channel ignored");
        return None;
    }
    payload.guild_id
}

fn skip_absent_guild(guild_id: Snowflake, result: GuildsyncResult<()>) -> GuildsyncResult<()> {
    match result {
        Err(err) if is_absent_guild(&err) => {
            debug!(guild_id = %guild_id, reason = %err, "Thread event skipped");
            Ok(())
        }
        other => other,
    }
}

/// Drop every known thread in scope that is uncached or still active, then
/// store the threads the sync lists.
///
/// Active threads are always resent by the sync, so an active thread that
/// is not in the payload is gone. Archived threads are never resent and are
/// kept.
#[instrument(skip(guild, payload), fields(guild_id = %guild.id(), threads = payload.threads.len()))]
async fn sync_threads(guild: &Guild, payload: &ThreadListSyncPayload) -> GuildsyncResult<()> {
    let scope: Vec<Snowflake> = match &payload.channel_ids {
        Some(ids) => ids.clone(),
        None => guild
            .to_static()
            .await?
            .channels
            .into_iter()
            .filter(|(_, channel)| !channel.is_thread())
            .map(|(id, _)| id)
            .collect(),
    };

    let mut dropped = 0;
    for channel_id in scope {
        let Some(channel) = guild.channel(channel_id).await? else {
            continue;
        };
        for thread_id in channel.thread_ids().to_vec() {
            let archived = guild
                .channel(thread_id)
                .await?
                .is_some_and(|thread| thread.is_archived());
            if !archived {
                guild.delete_thread(thread_id, Some(channel_id)).await?;
                dropped += 1;
            }
        }
    }

    for thread in &payload.threads {
        guild.save_new_thread(thread).await?;
    }
    debug!(dropped, "Thread list synchronized");
    Ok(())
}
