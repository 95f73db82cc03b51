//! Cached role shape.

use crate::{Permissions, RolePayload, Snowflake};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimal stored role. Roles are always fully overwritten, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRole {
    /// Role name
    pub name: String,
    /// Icon hash
    #[serde(default)]
    pub icon: Option<String>,
    /// RGB color
    #[serde(default)]
    pub color: u32,
    /// Capability bitmask
    pub permissions: Permissions,
    /// Sort position
    #[serde(default)]
    pub position: i64,
    /// Unicode emoji shown instead of an icon
    #[serde(default)]
    pub unicode_emoji: Option<String>,
}

/// Parse one role.
pub fn parse_role(role: &RolePayload) -> CachedRole {
    CachedRole {
        name: role.name.clone(),
        icon: role.icon.clone(),
        color: role.color,
        permissions: role.permissions,
        position: role.position,
        unicode_emoji: role.unicode_emoji.clone(),
    }
}

/// Parse a role list into a map keyed by role ID.
pub fn parse_roles(roles: &[RolePayload]) -> BTreeMap<Snowflake, CachedRole> {
    roles.iter().map(|role| (role.id, parse_role(role))).collect()
}
