//! Space and user types.

use serde::Deserialize;

/// Confluence space.
#[derive(Debug, Clone, Deserialize)]
pub struct Space {
    /// Space key.
    pub key: String,
}

/// Space reference embedded in other payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct SpaceRef {
    pub key: String,
}

/// Authenticated user, from `/user/current`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Present when requested with `expand=personalSpace`.
    #[serde(default)]
    pub personal_space: Option<SpaceRef>,
}
