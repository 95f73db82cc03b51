//! Store-backed guild handle.

use crate::keys::{CLIENT_ID_KEY, guild_key};
use crate::{
    CachedChannel, CachedGuild, CachedRole, ChannelPayload, GuildPayload, RolePayload, Snowflake,
    parse_channel, parse_guild, parse_role, parse_thread, unavailable_placeholder,
    models::{AVAILABILITY_FIELD, available_record, strip_availability},
};
use guildsync_cache::{FieldCache, FieldCacheConfig};
use guildsync_error::{CacheError, CacheErrorKind, GuildsyncResult, JsonError};
use guildsync_store::{JsonPath, SharedStore};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, instrument, trace};

/// Handle to one cached guild.
///
/// The handle holds no guild data of its own: every read goes to the store,
/// except single-field reads, which are kept in a short-lived
/// [`FieldCache`]. Any write through the handle clears that cache.
///
/// Reads enforce availability: a missing key fails with
/// [`CacheErrorKind::GuildNotFound`], a placeholder with
/// [`CacheErrorKind::GuildUnavailable`].
///
/// # Example
///
/// ```
/// use guildsync_core::{Guild, Snowflake};
/// use guildsync_store::MemoryStore;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let guild = Guild::new(Snowflake::new(1), Arc::new(MemoryStore::new()));
/// let err = guild.name().await.unwrap_err();
/// assert!(err.is_guild_not_found());
/// # }
/// ```
pub struct Guild {
    id: Snowflake,
    key: String,
    store: SharedStore,
    fields: Mutex<FieldCache>,
}

impl fmt::Debug for Guild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guild")
            .field("id", &self.id)
            .field("cached_fields", &self.fields.lock().len())
            .finish()
    }
}

fn channel_path(id: Snowflake) -> JsonPath {
    JsonPath::field("channels").child(id)
}

fn role_path(id: Snowflake) -> JsonPath {
    JsonPath::field("roles").child(id)
}

fn decode<T: DeserializeOwned>(value: Value) -> GuildsyncResult<T> {
    Ok(serde_json::from_value(value)?)
}

impl Guild {
    /// Create a handle with the default field cache.
    pub fn new(id: Snowflake, store: SharedStore) -> Self {
        Self::with_cache_config(id, store, FieldCacheConfig::default())
    }

    /// Create a handle with a specific field cache configuration.
    pub fn with_cache_config(id: Snowflake, store: SharedStore, config: FieldCacheConfig) -> Self {
        Self {
            id,
            key: guild_key(id),
            store,
            fields: Mutex::new(FieldCache::new(config)),
        }
    }

    /// Guild ID.
    pub fn id(&self) -> Snowflake {
        self.id
    }

    /// Store key of the guild record.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The store this handle reads and writes.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    // Whole-record writes

    /// Write the unavailable placeholder over whatever is stored.
    #[instrument(skip(self), fields(guild_id = %self.id))]
    pub async fn save_unavailable(&self) -> GuildsyncResult<()> {
        self.set_value(&JsonPath::root(), unavailable_placeholder())
            .await
    }

    /// Parse a guild create payload and store it as the full record.
    #[instrument(skip(self, payload, client_id), fields(guild_id = %self.id))]
    pub async fn save_new(
        &self,
        payload: &GuildPayload,
        client_id: Option<Snowflake>,
    ) -> GuildsyncResult<CachedGuild> {
        let guild = parse_guild(payload, client_id);
        self.overwrite(&guild).await?;
        Ok(guild)
    }

    /// Replace the full record, marking the guild available.
    #[instrument(skip(self, guild), fields(guild_id = %self.id))]
    pub async fn overwrite(&self, guild: &CachedGuild) -> GuildsyncResult<()> {
        self.set_value(&JsonPath::root(), available_record(guild)?)
            .await
    }

    /// Remove the record. Returns whether it existed.
    #[instrument(skip(self), fields(guild_id = %self.id))]
    pub async fn delete(&self) -> GuildsyncResult<bool> {
        let removed = self.delete_path(&JsonPath::root()).await?;
        Ok(removed > 0)
    }

    /// The full available record, without the availability flag.
    #[instrument(skip(self), fields(guild_id = %self.id))]
    pub async fn to_static(&self) -> GuildsyncResult<CachedGuild> {
        let mut values = self.read_paths(&[JsonPath::root()]).await?;
        let record = values.pop().flatten().unwrap_or(Value::Null);
        decode(strip_availability(record))
    }

    // Field reads

    /// Guild name.
    pub async fn name(&self) -> GuildsyncResult<String> {
        self.required_field("name").await
    }

    /// Icon hash.
    pub async fn icon(&self) -> GuildsyncResult<Option<String>> {
        let value = self.read_field(JsonPath::field("icon")).await?;
        value.map_or(Ok(None), decode)
    }

    /// Owner's user ID.
    pub async fn owner_id(&self) -> GuildsyncResult<Snowflake> {
        self.required_field("owner_id").await
    }

    /// Role IDs held by the caching bot in this guild.
    pub async fn bot_member_roles(&self) -> GuildsyncResult<Vec<Snowflake>> {
        let value = self.read_field(JsonPath::field("botMemberRoles")).await?;
        value.map_or(Ok(Vec::new()), decode)
    }

    /// User ID of the caching bot, recorded on ready.
    pub async fn client_id(&self) -> GuildsyncResult<Snowflake> {
        let raw = self
            .store
            .get(CLIENT_ID_KEY)
            .await?
            .ok_or_else(|| CacheError::new(CacheErrorKind::MissingClientId))?;
        raw.parse()
            .map_err(|_| JsonError::new(format!("stored client id {:?} is not a snowflake", raw)).into())
    }

    /// One role, if cached.
    pub async fn role(&self, id: Snowflake) -> GuildsyncResult<Option<CachedRole>> {
        let value = self.read_field(role_path(id)).await?;
        value.map(decode).transpose()
    }

    /// Every cached role among `ids`, fetched in one round trip.
    #[instrument(skip(self, ids), fields(guild_id = %self.id, requested = ids.len()))]
    pub async fn roles(&self, ids: &[Snowflake]) -> GuildsyncResult<BTreeMap<Snowflake, CachedRole>> {
        let paths: Vec<JsonPath> = ids.iter().map(|id| role_path(*id)).collect();
        let values = self.read_paths(&paths).await?;

        let mut roles = BTreeMap::new();
        for (id, value) in ids.iter().zip(values) {
            if let Some(value) = value {
                roles.insert(*id, decode(value)?);
            }
        }
        Ok(roles)
    }

    /// One channel or thread, if cached.
    pub async fn channel(&self, id: Snowflake) -> GuildsyncResult<Option<CachedChannel>> {
        let value = self.read_field(channel_path(id)).await?;
        value.map(decode).transpose()
    }

    // Partial writes

    /// Store a role created or updated by an event.
    ///
    /// Skipped when the guild record does not exist yet.
    #[instrument(skip(self, role), fields(guild_id = %self.id, role_id = %role.id))]
    pub async fn save_new_role(&self, role: &RolePayload) -> GuildsyncResult<()> {
        self.set_best_effort(&role_path(role.id), serde_json::to_value(parse_role(role))?)
            .await
    }

    /// Remove one role.
    #[instrument(skip(self), fields(guild_id = %self.id))]
    pub async fn delete_role(&self, id: Snowflake) -> GuildsyncResult<()> {
        self.delete_path(&role_path(id)).await?;
        Ok(())
    }

    /// Store a channel created by an event.
    ///
    /// Skipped when the guild record does not exist yet.
    #[instrument(skip(self, channel), fields(guild_id = %self.id, channel_id = %channel.id))]
    pub async fn save_new_channel(&self, channel: &ChannelPayload) -> GuildsyncResult<()> {
        self.set_best_effort(
            &channel_path(channel.id),
            serde_json::to_value(parse_channel(channel))?,
        )
        .await
    }

    /// Replace one channel record.
    ///
    /// Skipped when the guild record does not exist.
    #[instrument(skip(self, channel), fields(guild_id = %self.id))]
    pub async fn overwrite_channel(
        &self,
        id: Snowflake,
        channel: &CachedChannel,
    ) -> GuildsyncResult<()> {
        self.set_best_effort(&channel_path(id), serde_json::to_value(channel)?)
            .await
    }

    /// Remove one channel or thread record. Thread lists are not touched.
    #[instrument(skip(self), fields(guild_id = %self.id))]
    pub async fn delete_channel(&self, id: Snowflake) -> GuildsyncResult<()> {
        self.delete_path(&channel_path(id)).await?;
        Ok(())
    }

    /// Store a thread and link it into its parent's thread list.
    ///
    /// The parent list is appended to only when the parent is cached and does
    /// not already list the thread, so replays never duplicate it.
    #[instrument(skip(self, thread), fields(guild_id = %self.id, thread_id = %thread.id))]
    pub async fn save_new_thread(&self, thread: &ChannelPayload) -> GuildsyncResult<()> {
        if let Some(parent_id) = thread.parent_id
            && let Some(parent) = self.channel(parent_id).await?
            && parent.threads.as_ref().is_some_and(|ids| !ids.contains(&thread.id))
        {
            let path = channel_path(parent_id).child("threads");
            self.store
                .arr_append(&self.key, &path, thread.id.to_json())
                .await?;
            self.fields.lock().clear();
            trace!(parent_id = %parent_id, "Linked thread into parent");
        }

        self.set_value(
            &channel_path(thread.id),
            serde_json::to_value(parse_thread(thread))?,
        )
        .await
    }

    /// Remove a thread and unlink it from its parent's thread list.
    ///
    /// The parent list loses exactly one element, and only when it lists the
    /// thread.
    #[instrument(skip(self), fields(guild_id = %self.id))]
    pub async fn delete_thread(
        &self,
        id: Snowflake,
        parent_id: Option<Snowflake>,
    ) -> GuildsyncResult<()> {
        if let Some(parent_id) = parent_id
            && let Some(parent) = self.channel(parent_id).await?
            && parent.threads.is_some()
        {
            let path = channel_path(parent_id).child("threads");
            let index = self.store.arr_index(&self.key, &path, &id.to_json()).await?;
            if index != -1 {
                self.store.arr_pop(&self.key, &path, index).await?;
                trace!(parent_id = %parent_id, index, "Unlinked thread from parent");
            }
        }

        self.delete_channel(id).await
    }

    /// Replace the caching bot's role list.
    #[instrument(skip(self, roles), fields(guild_id = %self.id, roles = roles.len()))]
    pub async fn set_bot_member_roles(&self, roles: &[Snowflake]) -> GuildsyncResult<()> {
        self.set_value(&JsonPath::field("botMemberRoles"), serde_json::to_value(roles)?)
            .await
    }

    // Plumbing

    /// Write `value` at `path`.
    pub async fn set_value(&self, path: &JsonPath, value: Value) -> GuildsyncResult<()> {
        let result = self.store.json_set(&self.key, path, value).await;
        self.fields.lock().clear();
        Ok(result?)
    }

    async fn delete_path(&self, path: &JsonPath) -> GuildsyncResult<u64> {
        let result = self.store.json_del(&self.key, path).await;
        self.fields.lock().clear();
        Ok(result?)
    }

    /// Write that tolerates a missing guild record.
    ///
    /// The store rejects writes below the root of an absent key as a command
    /// error; those are skipped, since a later guild create carries the
    /// data anyway. Every other failure propagates.
    async fn set_best_effort(&self, path: &JsonPath, value: Value) -> GuildsyncResult<()> {
        match self.set_value(path, value).await {
            Err(err) if err.is_command_error() => {
                debug!(guild_id = %self.id, path = %path, error = %err, "Guild record missing, write skipped");
                Ok(())
            }
            other => other,
        }
    }

    /// Fetch `paths` plus the availability flag in one round trip.
    async fn read_paths(&self, paths: &[JsonPath]) -> GuildsyncResult<Vec<Option<Value>>> {
        let mut request = paths.to_vec();
        request.push(JsonPath::field(AVAILABILITY_FIELD));

        let values = match self.store.json_get_many(&self.key, &request).await {
            Ok(values) => values,
            Err(err) if err.is_command() => None,
            Err(err) => return Err(err.into()),
        };
        let Some(mut values) = values else {
            return Err(CacheError::new(CacheErrorKind::GuildNotFound(self.id.get())).into());
        };

        if values.pop().flatten() != Some(Value::Bool(false)) {
            return Err(CacheError::new(CacheErrorKind::GuildUnavailable(self.id.get())).into());
        }
        Ok(values)
    }

    async fn read_field(&self, path: JsonPath) -> GuildsyncResult<Option<Value>> {
        let field = path.to_string();
        let cached = self
            .fields
            .lock()
            .get(&field)
            .map(|entry| entry.value().clone());
        if let Some(value) = cached {
            debug!(guild_id = %self.id, field = %field, "Field cache hit");
            return Ok(Some(value));
        }

        let value = self.read_paths(std::slice::from_ref(&path)).await?.pop().flatten();
        if let Some(value) = &value {
            self.fields.lock().insert(&field, value.clone(), None);
        }
        Ok(value)
    }

    async fn required_field<T: DeserializeOwned>(&self, name: &str) -> GuildsyncResult<T> {
        let value = self.read_field(JsonPath::field(name)).await?.ok_or_else(|| {
            JsonError::new(format!("guild {} record has no field {}", self.id, name))
        })?;
        decode(value)
    }
}
