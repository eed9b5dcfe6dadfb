//! Error types for presence-core operations.
//!
//! Per-update and per-render failures are recoverable and usually only logged
//! by callers; asset errors are fatal at startup.

use std::path::PathBuf;

use presence_protocol::UserId;

/// All errors that can occur in presence-core operations.
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    // ─────────────────────────────────────────────────────────────────────
    // Asset Errors (fatal at startup)
    // ─────────────────────────────────────────────────────────────────────
    #[error("Template image could not be decoded: {source}")]
    TemplateDecode {
        #[source]
        source: image::ImageError,
    },

    #[error("Template image must be {expected_width}x{expected_height}, got {width}x{height}")]
    TemplateDimensions {
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error("Font could not be parsed: {details}")]
    FontParse { details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Collaborator Errors (recoverable, logged)
    // ─────────────────────────────────────────────────────────────────────
    #[error("Profile lookup failed for {user_id}: {details}")]
    ProfileLookup { user_id: UserId, details: String },

    #[error("Avatar fetch failed for {url}: {details}")]
    AvatarFetch { url: String, details: String },

    #[error("HTTP client could not be created: {details}")]
    HttpClient { details: String },

    #[error("Avatar decode failed for {url}: {source}")]
    AvatarDecode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Caller Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("No presence snapshot for user {0}")]
    NoSnapshot(UserId),

    #[error("Notification stream already has a subscriber")]
    AlreadySubscribed,

    #[error("Notifications are disabled")]
    NotificationsDisabled,

    #[error("Notification subscriber is gone")]
    SubscriberGone,

    // ─────────────────────────────────────────────────────────────────────
    // Configuration & I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("PNG encoding failed: {source}")]
    Encode {
        #[source]
        source: image::ImageError,
    },
}

impl PresenceError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PresenceError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using PresenceError.
pub type Result<T> = std::result::Result<T, PresenceError>;
