//! User profile lookup.
//!
//! Presence events often carry an incomplete user object, so the resolver
//! asks a [`ProfileLookup`] for the full profile before building a snapshot.

use std::time::Duration;

use presence_protocol::UserId;
use tracing::debug;

use crate::error::{PresenceError, Result};
use crate::types::UserProfile;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_PROFILE_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("presence-card/", env!("CARGO_PKG_VERSION"));

/// Resolves a user ID to its full profile.
///
/// Implementations may fail; callers treat failures as non-fatal.
pub trait ProfileLookup: Send + Sync {
    fn user(&self, id: UserId) -> Result<UserProfile>;
}

/// Lookup that never resolves anything. Resolvers fall back to the user
/// object embedded in each event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProfileLookup;

impl ProfileLookup for NoProfileLookup {
    fn user(&self, id: UserId) -> Result<UserProfile> {
        Err(PresenceError::ProfileLookup {
            user_id: id,
            details: "no profile source configured".to_string(),
        })
    }
}

/// REST client for `GET {api_base}/users/{id}` authenticated as a bot.
#[derive(Clone)]
pub struct DiscordProfileClient {
    client: reqwest::blocking::Client,
    api_base: String,
    token: String,
}

impl DiscordProfileClient {
    pub fn new(
        token: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PresenceError::HttpClient {
                details: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn user_url(&self, id: UserId) -> String {
        format!("{}/users/{}", self.api_base, id)
    }
}

impl ProfileLookup for DiscordProfileClient {
    fn user(&self, id: UserId) -> Result<UserProfile> {
        let url = self.user_url(id);
        let lookup_error = |details: String| PresenceError::ProfileLookup {
            user_id: id,
            details,
        };

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .map_err(|e| lookup_error(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(lookup_error(format!("HTTP {} from {}", response.status(), url)));
        }

        let profile: UserProfile = response
            .json()
            .map_err(|e| lookup_error(format!("Failed to read profile: {}", e)))?;
        debug!(user_id = %id, username = %profile.username, "Profile resolved");
        Ok(profile)
    }
}
