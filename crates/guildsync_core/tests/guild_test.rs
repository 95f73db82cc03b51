//! Tests for the store-backed guild handle and permission queries.

use guildsync_core::keys::CLIENT_ID_KEY;
use guildsync_core::{ChannelPayload, Guild, GuildPayload, Permissions, RolePayload, Snowflake};
use guildsync_error::CacheErrorKind;
use guildsync_store::{DocumentStore, JsonPath, MemoryStore, SharedStore};
use serde_json::json;
use std::sync::Arc;

const GUILD: u64 = 100;
const OWNER: u64 = 7;
const BOT: u64 = 42;
const MEMBER: u64 = 50;
const MOD_ROLE: u64 = 5;
const MUTED_ROLE: u64 = 6;
const GENERAL: u64 = 10;
const THREAD: u64 = 20;

fn id(raw: u64) -> Snowflake {
    Snowflake::new(raw)
}

fn guild_payload() -> GuildPayload {
    serde_json::from_value(json!({
        "id": GUILD.to_string(),
        "name": "Lounge",
        "icon": null,
        "owner_id": OWNER.to_string(),
        "roles": [
            {"id": GUILD.to_string(), "name": "@everyone", "permissions": "3072", "position": 0},
            {"id": MOD_ROLE.to_string(), "name": "mod", "permissions": "8192", "position": 4},
            {"id": MUTED_ROLE.to_string(), "name": "muted", "permissions": "0", "position": 2}
        ],
        "channels": [{
            "id": GENERAL.to_string(),
            "type": 0,
            "name": "general",
            "permission_overwrites": [
                {"id": GUILD.to_string(), "type": 0, "allow": "0", "deny": "2048"},
                {"id": MOD_ROLE.to_string(), "type": 0, "allow": "2048", "deny": "0"},
                {"id": MEMBER.to_string(), "type": 1, "allow": "0", "deny": "1024"}
            ]
        }],
        "threads": [{
            "id": THREAD.to_string(),
            "type": 11,
            "parent_id": GENERAL.to_string(),
            "name": "t",
            "thread_metadata": {"archived": false, "locked": false}
        }],
        "members": [{"user": {"id": BOT.to_string()}, "roles": [MOD_ROLE.to_string()]}]
    }))
    .unwrap()
}

fn thread_payload(raw: u64, parent: u64) -> ChannelPayload {
    serde_json::from_value(json!({
        "id": raw.to_string(),
        "type": 11,
        "guild_id": GUILD.to_string(),
        "parent_id": parent.to_string(),
        "name": format!("thread-{}", raw),
        "thread_metadata": {"archived": false, "locked": false}
    }))
    .unwrap()
}

async fn seeded() -> (Arc<MemoryStore>, Guild) {
    let store = Arc::new(MemoryStore::new());
    let shared: SharedStore = store.clone();
    let guild = Guild::new(id(GUILD), shared);
    guild.save_new(&guild_payload(), Some(id(BOT))).await.unwrap();
    (store, guild)
}

#[tokio::test]
async fn test_missing_guild_reads_fail_not_found() {
    let guild = Guild::new(id(GUILD), Arc::new(MemoryStore::new()));
    let err = guild.owner_id().await.unwrap_err();
    assert!(err.is_guild_not_found());
    assert!(guild.to_static().await.unwrap_err().is_guild_not_found());
}

#[tokio::test]
async fn test_placeholder_reads_fail_unavailable() {
    let guild = Guild::new(id(GUILD), Arc::new(MemoryStore::new()));
    guild.save_unavailable().await.unwrap();
    assert!(guild.name().await.unwrap_err().is_guild_unavailable());
    assert!(guild.channel(id(GENERAL)).await.unwrap_err().is_guild_unavailable());
}

#[tokio::test]
async fn test_available_record_reads() {
    let (_, guild) = seeded().await;
    assert_eq!(guild.name().await.unwrap(), "Lounge");
    assert_eq!(guild.icon().await.unwrap(), None);
    assert_eq!(guild.owner_id().await.unwrap(), id(OWNER));
    assert_eq!(guild.bot_member_roles().await.unwrap(), vec![id(MOD_ROLE)]);

    let general = guild.channel(id(GENERAL)).await.unwrap().unwrap();
    assert_eq!(general.thread_ids(), &[id(THREAD)]);
    assert!(guild.channel(id(999)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_static_record_has_no_availability_flag() {
    let (store, guild) = seeded().await;

    let record = guild.to_static().await.unwrap();
    let exported = serde_json::to_value(&record).unwrap();
    assert!(exported.get("unavailable").is_none());

    // An outage placeholder is replaced by a plain overwrite of the record
    guild.save_unavailable().await.unwrap();
    assert!(guild.to_static().await.unwrap_err().is_guild_unavailable());
    guild.overwrite(&record).await.unwrap();

    let stored = store
        .json_get(guild.key(), &JsonPath::field("unavailable"))
        .await
        .unwrap();
    assert_eq!(stored, Some(json!(false)));
    assert_eq!(guild.to_static().await.unwrap(), record);
}

#[tokio::test]
async fn test_write_clears_field_cache() {
    let (_, guild) = seeded().await;
    assert_eq!(guild.name().await.unwrap(), "Lounge");
    guild
        .set_value(&JsonPath::field("name"), json!("Renamed"))
        .await
        .unwrap();
    assert_eq!(guild.name().await.unwrap(), "Renamed");
}

#[tokio::test]
async fn test_role_save_on_missing_guild_is_skipped() {
    let store = Arc::new(MemoryStore::new());
    let guild = Guild::new(id(GUILD), store.clone());
    let role: RolePayload = serde_json::from_value(json!({
        "id": "5", "name": "mod", "permissions": "8", "position": 1
    }))
    .unwrap();

    guild.save_new_role(&role).await.unwrap();
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_thread_create_links_parent_once() {
    let (_, guild) = seeded().await;
    let thread = thread_payload(21, GENERAL);

    guild.save_new_thread(&thread).await.unwrap();
    guild.save_new_thread(&thread).await.unwrap();

    let general = guild.channel(id(GENERAL)).await.unwrap().unwrap();
    assert_eq!(general.thread_ids(), &[id(THREAD), id(21)]);
    assert!(guild.channel(id(21)).await.unwrap().unwrap().is_thread());
}

#[tokio::test]
async fn test_thread_delete_prunes_parent_exactly_once() {
    let (_, guild) = seeded().await;
    guild.save_new_thread(&thread_payload(21, GENERAL)).await.unwrap();

    guild.delete_thread(id(THREAD), Some(id(GENERAL))).await.unwrap();
    let general = guild.channel(id(GENERAL)).await.unwrap().unwrap();
    assert_eq!(general.thread_ids(), &[id(21)]);
    assert!(guild.channel(id(THREAD)).await.unwrap().is_none());

    // Already unlinked: the parent list is left alone
    guild.delete_thread(id(THREAD), Some(id(GENERAL))).await.unwrap();
    let general = guild.channel(id(GENERAL)).await.unwrap().unwrap();
    assert_eq!(general.thread_ids(), &[id(21)]);
}

#[tokio::test]
async fn test_owner_bypass() {
    let (_, guild) = seeded().await;
    let perms = guild
        .calculate_channel_permissions(id(OWNER), &[id(MUTED_ROLE)], id(GENERAL))
        .await
        .unwrap();
    assert_eq!(perms, Permissions::ALL);
}

#[tokio::test]
async fn test_guild_permissions_union_everyone_and_roles() {
    let (_, guild) = seeded().await;
    let perms = guild
        .calculate_guild_permissions(id(MEMBER), &[id(MOD_ROLE)])
        .await
        .unwrap();
    assert_eq!(
        perms,
        Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::MANAGE_MESSAGES
    );
}

#[tokio::test]
async fn test_channel_permissions_apply_overwrites() {
    let (_, guild) = seeded().await;

    // Everyone loses SEND_MESSAGES in general
    let plain = guild
        .calculate_channel_permissions(Snowflake::new(60), &[], id(GENERAL))
        .await
        .unwrap();
    assert_eq!(plain, Permissions::VIEW_CHANNEL);

    // The mod role overwrite gives it back; the member overwrite hides the channel
    let member = guild
        .calculate_channel_permissions(id(MEMBER), &[id(MOD_ROLE)], id(GENERAL))
        .await
        .unwrap();
    assert_eq!(
        member,
        Permissions::SEND_MESSAGES | Permissions::MANAGE_MESSAGES
    );
}

#[tokio::test]
async fn test_thread_permissions_use_parent() {
    let (_, guild) = seeded().await;
    let in_thread = guild
        .calculate_channel_permissions(Snowflake::new(60), &[], id(THREAD))
        .await
        .unwrap();
    assert_eq!(in_thread, Permissions::VIEW_CHANNEL);
}

#[tokio::test]
async fn test_missing_channel_is_reported() {
    let (_, guild) = seeded().await;
    let err = guild
        .calculate_channel_permissions(id(MEMBER), &[], id(999))
        .await
        .unwrap_err();
    assert!(matches!(
        err.cache_kind(),
        Some(CacheErrorKind::ChannelNotFound { channel_id: 999, .. })
    ));
}

#[tokio::test]
async fn test_bot_permissions_need_client_id() {
    let (store, guild) = seeded().await;
    let err = guild.calculate_bot_guild_permissions().await.unwrap_err();
    assert!(matches!(err.cache_kind(), Some(CacheErrorKind::MissingClientId)));

    store.set(CLIENT_ID_KEY, &BOT.to_string(), None).await.unwrap();
    let perms = guild.calculate_bot_channel_permissions(id(GENERAL)).await.unwrap();
    assert_eq!(
        perms,
        Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::MANAGE_MESSAGES
    );
}

#[tokio::test]
async fn test_highest_role_position() {
    let (_, guild) = seeded().await;
    let highest = guild
        .highest_role_position(&[id(MUTED_ROLE), id(MOD_ROLE), id(404)])
        .await
        .unwrap();
    assert_eq!(highest, 4);
    assert_eq!(guild.highest_role_position(&[]).await.unwrap(), 0);
}
