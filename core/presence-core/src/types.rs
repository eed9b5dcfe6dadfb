//! Shared value types.

use presence_protocol::UserId;
use serde::{Deserialize, Serialize};

use crate::status::StatusKind;

/// Latest known presence of one user, as rendered on a card.
///
/// Snapshots are replaced whole on every accepted update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    /// State string of the first activity, or empty.
    #[serde(default)]
    pub app: String,
    /// Canonical identity, `username#discriminator`.
    pub username: String,
    /// Avatar URL; empty when the user has no avatar.
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub status: StatusKind,
}

/// Profile data resolved from the user API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl UserProfile {
    /// `username#discriminator`, or the bare username for accounts that no
    /// longer carry a discriminator (`"0"` or empty).
    pub fn display_name(&self) -> String {
        display_name(&self.username, &self.discriminator)
    }
}

pub(crate) fn display_name(username: &str, discriminator: &str) -> String {
    if discriminator.is_empty() || discriminator == "0" {
        username.to_string()
    } else {
        format!("{}#{}", username, discriminator)
    }
}
