//! Tracked-user presence cache.
//!
//! The registry exclusively owns snapshot storage. Every operation runs under
//! one coarse lock, so a reader never sees a half-written snapshot and each
//! track/untrack/update is atomic. Readers get clones.
//!
//! Notification happens after the lock is released: the consumer re-reads the
//! registry when it wakes up, and in blocking channel modes a publish made
//! under the lock would deadlock against that read.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use presence_protocol::UserId;
use tracing::{debug, warn};

use crate::error::Result;
use crate::notify::{NotificationMode, Notifications, Notifier};
use crate::types::PresenceSnapshot;

/// Tagged view of one user's registry slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEntry {
    NotTracked,
    TrackedEmpty,
    Tracked {
        snapshot: PresenceSnapshot,
        updated_at: DateTime<Utc>,
    },
}

impl RegistryEntry {
    pub fn is_tracked(&self) -> bool {
        !matches!(self, RegistryEntry::NotTracked)
    }

    pub fn snapshot(&self) -> Option<&PresenceSnapshot> {
        match self {
            RegistryEntry::Tracked { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The user is not tracked; nothing was stored or published.
    Discarded,
    Stored,
}

#[derive(Debug, Clone)]
struct Slot {
    snapshot: PresenceSnapshot,
    updated_at: DateTime<Utc>,
}

pub struct PresenceRegistry {
    // `None` marks a tracked user that has not reported yet.
    entries: Mutex<HashMap<UserId, Option<Slot>>>,
    notifier: Notifier,
}

impl PresenceRegistry {
    pub fn new(mode: NotificationMode) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            notifier: Notifier::new(mode),
        }
    }

    /// Plain cache without fan-out.
    pub fn passive() -> Self {
        Self::new(NotificationMode::Disabled)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, Option<Slot>>> {
        // Slots are replaced whole, so a poisoned map holds no torn values.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds users to the tracked set. Existing snapshots are kept.
    pub fn track<I>(&self, ids: I)
    where
        I: IntoIterator<Item = UserId>,
    {
        let mut entries = self.lock();
        for id in ids {
            entries.entry(id).or_insert(None);
        }
        debug!(tracked = entries.len(), "Tracked set updated");
    }

    /// Removes users and their snapshots.
    pub fn untrack<I>(&self, ids: I)
    where
        I: IntoIterator<Item = UserId>,
    {
        let mut entries = self.lock();
        for id in ids {
            entries.remove(&id);
        }
        debug!(tracked = entries.len(), "Tracked set updated");
    }

    /// Replaces the snapshot of a tracked user and then publishes its ID.
    pub fn update(&self, id: UserId, snapshot: PresenceSnapshot) -> UpdateOutcome {
        {
            let mut entries = self.lock();
            match entries.get_mut(&id) {
                Some(slot) => {
                    *slot = Some(Slot {
                        snapshot,
                        updated_at: Utc::now(),
                    });
                }
                None => return UpdateOutcome::Discarded,
            }
        }

        if let Err(err) = self.notifier.publish(id) {
            warn!(user_id = %id, error = %err, "Failed to publish presence notification");
        }
        UpdateOutcome::Stored
    }

    pub fn get(&self, id: UserId) -> Option<PresenceSnapshot> {
        self.lock()
            .get(&id)
            .and_then(|slot| slot.as_ref())
            .map(|slot| slot.snapshot.clone())
    }

    pub fn entry(&self, id: UserId) -> RegistryEntry {
        match self.lock().get(&id) {
            None => RegistryEntry::NotTracked,
            Some(None) => RegistryEntry::TrackedEmpty,
            Some(Some(slot)) => RegistryEntry::Tracked {
                snapshot: slot.snapshot.clone(),
                updated_at: slot.updated_at,
            },
        }
    }

    pub fn is_tracked(&self, id: UserId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Tracked IDs in ascending order.
    pub fn tracked_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn notification_mode(&self) -> NotificationMode {
        self.notifier.mode()
    }

    pub fn subscribe(&self) -> Result<Notifications> {
        self.notifier.subscribe()
    }

    /// Ends the notification stream once the subscriber has drained it.
    pub fn close_notifications(&self) {
        self.notifier.close();
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::passive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusKind;
    use std::sync::Arc;
    use std::thread;

    fn snapshot(username: &str, status: StatusKind) -> PresenceSnapshot {
        PresenceSnapshot {
            app: "Coding".to_string(),
            username: username.to_string(),
            avatar: String::new(),
            status,
        }
    }

    #[test]
    fn update_before_track_is_discarded() {
        let registry = PresenceRegistry::passive();
        let outcome = registry.update(UserId(1), snapshot("a#1", StatusKind::Online));
        assert_eq!(outcome, UpdateOutcome::Discarded);
        assert_eq!(registry.get(UserId(1)), None);
        assert_eq!(registry.entry(UserId(1)), RegistryEntry::NotTracked);

        registry.track([UserId(1)]);
        assert_eq!(registry.get(UserId(1)), None);
    }

    #[test]
    fn tracked_update_is_returned_exactly() {
        let registry = PresenceRegistry::passive();
        registry.track([UserId(1)]);
        let expected = snapshot("a#1", StatusKind::Idle);
        assert_eq!(
            registry.update(UserId(1), expected.clone()),
            UpdateOutcome::Stored
        );
        assert_eq!(registry.get(UserId(1)), Some(expected.clone()));
        assert_eq!(registry.entry(UserId(1)).snapshot(), Some(&expected));
    }

    #[test]
    fn track_distinguishes_empty_from_untracked() {
        let registry = PresenceRegistry::passive();
        registry.track([UserId(5)]);
        assert_eq!(registry.entry(UserId(5)), RegistryEntry::TrackedEmpty);
        assert!(registry.entry(UserId(5)).is_tracked());
        assert_eq!(registry.get(UserId(5)), None);
    }

    #[test]
    fn track_is_idempotent_and_keeps_snapshot() {
        let registry = PresenceRegistry::passive();
        registry.track([UserId(1)]);
        registry.update(UserId(1), snapshot("a#1", StatusKind::Online));
        registry.track([UserId(1), UserId(1)]);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get(UserId(1)).map(|s| s.status),
            Some(StatusKind::Online)
        );
    }

    #[test]
    fn untrack_clears_and_discards_until_retracked() {
        let registry = PresenceRegistry::passive();
        registry.track([UserId(1)]);
        registry.update(UserId(1), snapshot("a#1", StatusKind::Online));
        registry.untrack([UserId(1)]);

        assert_eq!(registry.get(UserId(1)), None);
        assert_eq!(
            registry.update(UserId(1), snapshot("a#1", StatusKind::Idle)),
            UpdateOutcome::Discarded
        );
        assert_eq!(registry.get(UserId(1)), None);

        registry.track([UserId(1)]);
        registry.update(UserId(1), snapshot("a#1", StatusKind::Idle));
        assert_eq!(
            registry.get(UserId(1)).map(|s| s.status),
            Some(StatusKind::Idle)
        );
    }

    #[test]
    fn accepted_updates_are_published_after_store() {
        let registry = PresenceRegistry::new(NotificationMode::Unbounded);
        let notifications = registry.subscribe().expect("subscribe");
        registry.track([UserId(1)]);

        registry.update(UserId(2), snapshot("b#2", StatusKind::Online));
        registry.update(UserId(1), snapshot("a#1", StatusKind::Online));

        let id = notifications.try_recv().expect("notified");
        assert_eq!(id, UserId(1));
        assert!(registry.get(id).is_some());
        assert_eq!(notifications.try_recv(), None);
    }

    #[test]
    fn rendezvous_consumer_can_read_registry_on_wakeup() {
        let registry = Arc::new(PresenceRegistry::new(NotificationMode::Rendezvous));
        let notifications = registry.subscribe().expect("subscribe");
        registry.track([UserId(9)]);

        let consumer = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let id = notifications.recv().expect("notification");
                registry.get(id)
            })
        };

        registry.update(UserId(9), snapshot("n#9", StatusKind::DoNotDisturb));
        let seen = consumer.join().expect("join").expect("snapshot");
        assert_eq!(seen.status, StatusKind::DoNotDisturb);
    }

    #[test]
    fn tracked_ids_are_sorted() {
        let registry = PresenceRegistry::passive();
        registry.track([UserId(3), UserId(1), UserId(2)]);
        assert_eq!(
            registry.tracked_ids(),
            vec![UserId(1), UserId(2), UserId(3)]
        );
    }
}
