//! # presence-core
//!
//! Live presence cache for a tracked set of users, with single-consumer
//! change notifications and a fixed-layout card renderer.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Producers and the consumer
//!   are plain threads.
//! - **Thread-safe registry**: One coarse lock; every operation is atomic and
//!   readers receive copies.
//! - **Graceful degradation**: Profile and avatar failures are logged and the
//!   update or render continues with what it has.
//! - **No globals**: Render assets are an immutable value built at startup.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use presence_core::*;
//!
//! let assets = Arc::new(load_assets(&config.assets, &config.render)?);
//! let tracker = PresenceTracker::with_profiles(
//!     config.notifications.mode(),
//!     Arc::new(NoProfileLookup),
//!     assets,
//!     Arc::new(HttpAvatarFetcher::new(config.render.avatar_timeout())?),
//! );
//! tracker.track(load_tracked_ids(&config.tracking.users_file)?);
//! let notifications = tracker.subscribe()?;
//! ```

pub mod assets;
pub mod avatar;
pub mod compositor;
pub mod config;
pub mod error;
pub mod mask;
pub mod notify;
pub mod profile;
pub mod registry;
pub mod resolver;
pub mod status;
pub mod text;
pub mod tracker;
pub mod tracking;
pub mod types;

pub use assets::{load_assets, CardAssets, FontFace, Palette};
pub use avatar::{AvatarFetcher, HttpAvatarFetcher, NoAvatarFetcher};
pub use compositor::{generate_template, Card, Compositor, CARD_HEIGHT, CARD_WIDTH};
pub use config::{load_config, PresenceConfig};
pub use error::{PresenceError, Result};
pub use mask::{CircleMask, OpacityField};
pub use notify::{NotificationMode, Notifications};
pub use presence_protocol::{RawActivity, RawPresenceUpdate, RawUser, UserId};
pub use profile::{DiscordProfileClient, NoProfileLookup, ProfileLookup};
pub use registry::{PresenceRegistry, RegistryEntry, UpdateOutcome};
pub use resolver::PresenceResolver;
pub use status::{classify_status, Status, StatusKind};
pub use tracker::PresenceTracker;
pub use tracking::load_tracked_ids;
pub use types::{PresenceSnapshot, UserProfile};
