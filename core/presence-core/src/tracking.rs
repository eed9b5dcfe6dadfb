//! Bulk tracked-user lists.
//!
//! The list is a flat JSON array of snowflakes, e.g. `[206794847581896705]`.
//! String entries are accepted too.

use std::path::Path;

use presence_protocol::UserId;

use crate::error::{PresenceError, Result};

pub fn parse_tracked_ids(content: &str) -> Result<Vec<UserId>> {
    serde_json::from_str(content).map_err(|source| PresenceError::Json {
        context: "tracked user list".to_string(),
        source,
    })
}

pub fn load_tracked_ids(path: &Path) -> Result<Vec<UserId>> {
    let content = fs_err::read_to_string(path)
        .map_err(|err| PresenceError::io("Failed to read tracked user list", err))?;
    parse_tracked_ids(&content)
}
