//! Raw presence feed types.
//!
//! These mirror the presence-update payload delivered by the upstream gateway,
//! already decoded. The tracker and its hosts share them so the feed schema
//! stays in one place. Fields the gateway may omit default to empty values; the
//! embedded user object in particular is often partial and gets enriched later.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const MAX_FEED_LINE_BYTES: usize = 64 * 1024;

/// Snowflake identifier of a user.
///
/// Serialized as a decimal string; deserialized from either a string or a
/// JSON number, matching what the gateway and hand-written lists both use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u64);

impl UserId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ErrorInfo;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<u64>()
            .map(UserId)
            .map_err(|_| ErrorInfo::new("invalid_user_id", format!("not a snowflake: {value:?}")))
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        UserId(value)
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(UserId(value)),
            Repr::Text(value) => value
                .parse::<UserId>()
                .map_err(|err| serde::de::Error::custom(err.message)),
        }
    }
}

/// User object embedded in a presence update. Only `id` is guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUser {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Default for UserId {
    fn default() -> Self {
        UserId(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawActivity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPresenceUpdate {
    pub user: RawUser,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub activities: Vec<RawActivity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
}

impl RawPresenceUpdate {
    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    /// State string of the first activity, or empty.
    pub fn first_activity_state(&self) -> &str {
        self.activities
            .first()
            .and_then(|activity| activity.state.as_deref())
            .unwrap_or("")
    }

    pub fn validate(&self) -> Result<(), ErrorInfo> {
        if self.user.id.get() == 0 {
            return Err(ErrorInfo::new("invalid_user_id", "user.id is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorInfo {}

/// Parses one newline-delimited feed record.
pub fn parse_update(line: &str) -> Result<RawPresenceUpdate, ErrorInfo> {
    if line.len() > MAX_FEED_LINE_BYTES {
        return Err(ErrorInfo::new(
            "line_too_large",
            "feed line exceeded maximum size",
        ));
    }
    if line.trim().is_empty() {
        return Err(ErrorInfo::new("empty_line", "feed line was empty"));
    }

    let update: RawPresenceUpdate = serde_json::from_str(line).map_err(|err| {
        ErrorInfo::new(
            "invalid_json",
            format!("feed line was not a presence update: {}", err),
        )
    })?;
    update.validate()?;
    Ok(update)
}
