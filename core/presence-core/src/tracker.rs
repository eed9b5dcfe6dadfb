//! Presence tracker: the feed-facing entry point.
//!
//! Wires resolver, registry and compositor together. The feed calls
//! [`PresenceTracker::handle_update`] from any number of threads; a single
//! consumer drains [`PresenceTracker::subscribe`] and calls
//! [`PresenceTracker::render_user`] for each ID.

use std::sync::Arc;

use presence_protocol::{RawPresenceUpdate, UserId};
use tracing::{debug, info};

use crate::assets::CardAssets;
use crate::avatar::AvatarFetcher;
use crate::compositor::{Card, Compositor};
use crate::error::{PresenceError, Result};
use crate::notify::{NotificationMode, Notifications};
use crate::profile::ProfileLookup;
use crate::registry::{PresenceRegistry, RegistryEntry, UpdateOutcome};
use crate::resolver::PresenceResolver;
use crate::types::PresenceSnapshot;

pub struct PresenceTracker {
    registry: PresenceRegistry,
    resolver: PresenceResolver,
    compositor: Compositor,
}

impl PresenceTracker {
    pub fn new(
        mode: NotificationMode,
        resolver: PresenceResolver,
        assets: Arc<CardAssets>,
        avatars: Arc<dyn AvatarFetcher>,
    ) -> Self {
        info!(mode = ?mode, "Presence tracker created");
        Self {
            registry: PresenceRegistry::new(mode),
            resolver,
            compositor: Compositor::new(assets, avatars),
        }
    }

    /// Tracker with the default CDN layout for avatar URLs.
    pub fn with_profiles(
        mode: NotificationMode,
        profiles: Arc<dyn ProfileLookup>,
        assets: Arc<CardAssets>,
        avatars: Arc<dyn AvatarFetcher>,
    ) -> Self {
        Self::new(mode, PresenceResolver::new(profiles), assets, avatars)
    }

    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    pub fn track<I>(&self, ids: I)
    where
        I: IntoIterator<Item = UserId>,
    {
        self.registry.track(ids);
    }

    pub fn untrack<I>(&self, ids: I)
    where
        I: IntoIterator<Item = UserId>,
    {
        self.registry.untrack(ids);
    }

    /// Feed callback. Untracked users are dropped before any profile lookup;
    /// the registry re-checks membership when storing, so a concurrent
    /// untrack still wins.
    pub fn handle_update(&self, update: &RawPresenceUpdate) -> UpdateOutcome {
        let id = update.user_id();
        if !self.registry.is_tracked(id) {
            return UpdateOutcome::Discarded;
        }

        let snapshot = self.resolver.resolve(update);
        debug!(
            user_id = %id,
            status = %snapshot.status,
            username = %snapshot.username,
            "Presence resolved"
        );
        self.registry.update(id, snapshot)
    }

    pub fn get(&self, id: UserId) -> Option<PresenceSnapshot> {
        self.registry.get(id)
    }

    pub fn entry(&self, id: UserId) -> RegistryEntry {
        self.registry.entry(id)
    }

    pub fn subscribe(&self) -> Result<Notifications> {
        self.registry.subscribe()
    }

    pub fn close_notifications(&self) {
        self.registry.close_notifications();
    }

    /// Renders the current snapshot of `id`. The snapshot is copied out of
    /// the registry first; rendering never holds the registry lock.
    pub fn render_user(&self, id: UserId) -> Result<Card> {
        let snapshot = self.registry.get(id).ok_or(PresenceError::NoSnapshot(id))?;
        Ok(self.compositor.render(&snapshot))
    }

    pub fn render_snapshot(&self, snapshot: &PresenceSnapshot) -> Card {
        self.compositor.render(snapshot)
    }
}
