//! Single-consumer notification channel.
//!
//! After every accepted registry update the user ID is published once. The
//! channel carries IDs only; consumers re-read the registry for the snapshot
//! and must tolerate it having changed again in between (last write wins).
//!
//! ## Modes
//!
//! - `Disabled`: no channel exists, publishing is a no-op.
//! - `Unbounded`: publishers never block; the queue grows while the consumer
//!   stalls.
//! - `Bounded(n)`: publishers block once `n` IDs are queued.
//! - `Rendezvous`: zero capacity, every publish waits for the consumer.
//!
//! In the two blocking modes a stalled consumer stalls the feed. That is the
//! accepted cost of backpressure, not something this module papers over. A
//! consumer that hangs up turns publishes into errors instead of hangs.

use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendError, Sender, TryRecvError};
use presence_protocol::UserId;
use serde::{Deserialize, Serialize};

use crate::error::{PresenceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationMode {
    Disabled,
    Unbounded,
    Bounded(usize),
    #[default]
    Rendezvous,
}

/// Mode names as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationModeName {
    Disabled,
    Unbounded,
    Bounded,
    #[default]
    Rendezvous,
}

impl NotificationMode {
    pub fn from_config(name: NotificationModeName, capacity: usize) -> Self {
        match name {
            NotificationModeName::Disabled => NotificationMode::Disabled,
            NotificationModeName::Unbounded => NotificationMode::Unbounded,
            NotificationModeName::Bounded => NotificationMode::Bounded(capacity.max(1)),
            NotificationModeName::Rendezvous => NotificationMode::Rendezvous,
        }
    }

    pub fn is_enabled(self) -> bool {
        self != NotificationMode::Disabled
    }
}

/// Producer side, owned by the registry.
pub struct Notifier {
    mode: NotificationMode,
    sender: Mutex<Option<Sender<UserId>>>,
    receiver: Mutex<Option<Receiver<UserId>>>,
}

impl Notifier {
    pub fn new(mode: NotificationMode) -> Self {
        let (sender, receiver) = match mode {
            NotificationMode::Disabled => (None, None),
            NotificationMode::Unbounded => {
                let (tx, rx) = crossbeam_channel::unbounded();
                (Some(tx), Some(rx))
            }
            NotificationMode::Bounded(capacity) => {
                let (tx, rx) = crossbeam_channel::bounded(capacity);
                (Some(tx), Some(rx))
            }
            NotificationMode::Rendezvous => {
                let (tx, rx) = crossbeam_channel::bounded(0);
                (Some(tx), Some(rx))
            }
        };

        Self {
            mode,
            sender: Mutex::new(sender),
            receiver: Mutex::new(receiver),
        }
    }

    pub fn disabled() -> Self {
        Self::new(NotificationMode::Disabled)
    }

    pub fn mode(&self) -> NotificationMode {
        self.mode
    }

    /// Hands out the consumer end. Only the first call succeeds.
    pub fn subscribe(&self) -> Result<Notifications> {
        if !self.mode.is_enabled() {
            return Err(PresenceError::NotificationsDisabled);
        }
        let mut slot = self
            .receiver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.take()
            .map(|receiver| Notifications { receiver })
            .ok_or(PresenceError::AlreadySubscribed)
    }

    /// Publishes `id`. May block in bounded and rendezvous modes; never call
    /// while holding the registry lock.
    pub fn publish(&self, id: UserId) -> Result<()> {
        // Clone out so a blocking send does not hold the sender slot.
        let sender = {
            let slot = self
                .sender
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match slot.as_ref() {
                Some(sender) => sender.clone(),
                None => return Ok(()),
            }
        };

        sender
            .send(id)
            .map_err(|SendError(_)| PresenceError::SubscriberGone)
    }

    /// Drops the producer end so the subscriber's stream ends once drained.
    pub fn close(&self) {
        let mut slot = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.take();
    }
}

/// Consumer end of the notification channel.
pub struct Notifications {
    receiver: Receiver<UserId>,
}

impl Notifications {
    /// Blocks until an ID arrives; `None` once the producer is closed and the
    /// queue is drained.
    pub fn recv(&self) -> Option<UserId> {
        self.receiver.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<UserId> {
        match self.receiver.recv_timeout(timeout) {
            Ok(id) => Some(id),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<UserId> {
        match self.receiver.try_recv() {
            Ok(id) => Some(id),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl Iterator for Notifications {
    type Item = UserId;

    fn next(&mut self) -> Option<UserId> {
        self.recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn disabled_mode_swallows_publishes() {
        let notifier = Notifier::disabled();
        notifier.publish(UserId(1)).expect("no-op publish");
        assert!(matches!(
            notifier.subscribe(),
            Err(PresenceError::NotificationsDisabled)
        ));
    }

    #[test]
    fn only_one_subscriber_is_allowed() {
        let notifier = Notifier::new(NotificationMode::Unbounded);
        let _first = notifier.subscribe().expect("first subscriber");
        assert!(matches!(
            notifier.subscribe(),
            Err(PresenceError::AlreadySubscribed)
        ));
    }

    #[test]
    fn unbounded_mode_queues_without_consumer() {
        let notifier = Notifier::new(NotificationMode::Unbounded);
        for id in 1..=100 {
            notifier.publish(UserId(id)).expect("publish");
        }
        let notifications = notifier.subscribe().expect("subscribe");
        assert_eq!(notifications.pending(), 100);
        assert_eq!(notifications.try_recv(), Some(UserId(1)));
    }

    #[test]
    fn bounded_mode_blocks_until_drained() {
        let notifier = std::sync::Arc::new(Notifier::new(NotificationMode::Bounded(1)));
        let notifications = notifier.subscribe().expect("subscribe");
        notifier.publish(UserId(1)).expect("fits in buffer");

        let producer = {
            let notifier = std::sync::Arc::clone(&notifier);
            thread::spawn(move || notifier.publish(UserId(2)))
        };

        assert_eq!(notifications.recv(), Some(UserId(1)));
        assert_eq!(notifications.recv(), Some(UserId(2)));
        producer.join().expect("join").expect("publish");
    }

    #[test]
    fn rendezvous_mode_hands_off_directly() {
        let notifier = std::sync::Arc::new(Notifier::new(NotificationMode::Rendezvous));
        let notifications = notifier.subscribe().expect("subscribe");
        let producer = {
            let notifier = std::sync::Arc::clone(&notifier);
            thread::spawn(move || notifier.publish(UserId(7)))
        };
        assert_eq!(notifications.recv(), Some(UserId(7)));
        producer.join().expect("join").expect("publish");
    }

    #[test]
    fn dropped_subscriber_turns_publish_into_error() {
        let notifier = Notifier::new(NotificationMode::Rendezvous);
        drop(notifier.subscribe().expect("subscribe"));
        assert!(matches!(
            notifier.publish(UserId(3)),
            Err(PresenceError::SubscriberGone)
        ));
    }

    #[test]
    fn close_ends_the_stream_after_draining() {
        let notifier = Notifier::new(NotificationMode::Unbounded);
        let notifications = notifier.subscribe().expect("subscribe");
        notifier.publish(UserId(1)).expect("publish");
        notifier.publish(UserId(2)).expect("publish");
        notifier.close();

        let drained: Vec<_> = notifications.collect();
        assert_eq!(drained, vec![UserId(1), UserId(2)]);
    }

    #[test]
    fn bounded_capacity_is_at_least_one() {
        assert_eq!(
            NotificationMode::from_config(NotificationModeName::Bounded, 0),
            NotificationMode::Bounded(1)
        );
    }
}
