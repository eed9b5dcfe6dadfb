//! Turns raw presence updates into snapshots.

use std::sync::Arc;

use presence_protocol::RawPresenceUpdate;
use tracing::warn;

use crate::avatar::{avatar_url, DEFAULT_CDN_BASE};
use crate::profile::ProfileLookup;
use crate::status::StatusKind;
use crate::types::{display_name, PresenceSnapshot, UserProfile};

pub struct PresenceResolver {
    profiles: Arc<dyn ProfileLookup>,
    cdn_base: String,
}

impl PresenceResolver {
    pub fn new(profiles: Arc<dyn ProfileLookup>) -> Self {
        Self::with_cdn_base(profiles, DEFAULT_CDN_BASE)
    }

    pub fn with_cdn_base(profiles: Arc<dyn ProfileLookup>, cdn_base: impl Into<String>) -> Self {
        Self {
            profiles,
            cdn_base: cdn_base.into(),
        }
    }

    /// Builds a full snapshot for `update`.
    ///
    /// A failed profile lookup is logged and the embedded user object is used
    /// as-is, so the update still lands with whatever data it carried.
    pub fn resolve(&self, update: &RawPresenceUpdate) -> PresenceSnapshot {
        let id = update.user_id();
        let profile = match self.profiles.user(id) {
            Ok(profile) => profile,
            Err(err) => {
                warn!(user_id = %id, error = %err, "Profile lookup failed; using event data");
                embedded_profile(update)
            }
        };

        let avatar = match profile.avatar.as_deref().filter(|key| !key.is_empty()) {
            Some(key) => avatar_url(&self.cdn_base, id, key),
            None => String::new(),
        };

        PresenceSnapshot {
            app: update.first_activity_state().to_string(),
            username: display_name(&profile.username, &profile.discriminator),
            avatar,
            status: StatusKind::classify(&update.status),
        }
    }
}

fn embedded_profile(update: &RawPresenceUpdate) -> UserProfile {
    let user = &update.user;
    UserProfile {
        id: user.id,
        username: user.username.clone().unwrap_or_default(),
        discriminator: user.discriminator.clone().unwrap_or_default(),
        avatar: user.avatar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PresenceError, Result};
    use crate::profile::NoProfileLookup;
    use presence_protocol::{RawActivity, RawUser, UserId};

    struct FixedProfile(UserProfile);

    impl ProfileLookup for FixedProfile {
        fn user(&self, _id: UserId) -> Result<UserProfile> {
            Ok(self.0.clone())
        }
    }

    fn raw(status: &str, state: Option<&str>) -> RawPresenceUpdate {
        RawPresenceUpdate {
            user: RawUser {
                id: UserId(42),
                username: Some("partial".to_string()),
                discriminator: Some("0002".to_string()),
                avatar: Some("embedded".to_string()),
            },
            status: status.to_string(),
            activities: state
                .map(|state| {
                    vec![RawActivity {
                        name: "Editor".to_string(),
                        state: Some(state.to_string()),
                    }]
                })
                .unwrap_or_default(),
            guild_id: None,
        }
    }

    #[test]
    fn resolved_profile_wins_over_embedded_user() {
        let resolver = PresenceResolver::new(Arc::new(FixedProfile(UserProfile {
            id: UserId(42),
            username: "Ari".to_string(),
            discriminator: "0001".to_string(),
            avatar: Some("abc".to_string()),
        })));

        let snapshot = resolver.resolve(&raw("idle", Some("Coding")));
        assert_eq!(snapshot.username, "Ari#0001");
        assert_eq!(snapshot.app, "Coding");
        assert_eq!(snapshot.status, StatusKind::Idle);
        assert_eq!(
            snapshot.avatar,
            "https://cdn.discordapp.com/avatars/42/abc.png"
        );
    }

    #[test]
    fn lookup_failure_falls_back_to_event_data() {
        let resolver = PresenceResolver::new(Arc::new(NoProfileLookup));
        let snapshot = resolver.resolve(&raw("dnd", None));
        assert_eq!(snapshot.username, "partial#0002");
        assert_eq!(snapshot.app, "");
        assert_eq!(snapshot.status, StatusKind::DoNotDisturb);
        assert_eq!(
            snapshot.avatar,
            "https://cdn.discordapp.com/avatars/42/embedded.png"
        );
    }

    #[test]
    fn missing_avatar_key_leaves_avatar_empty() {
        struct Failing;
        impl ProfileLookup for Failing {
            fn user(&self, id: UserId) -> Result<UserProfile> {
                Err(PresenceError::ProfileLookup {
                    user_id: id,
                    details: "boom".to_string(),
                })
            }
        }

        let resolver = PresenceResolver::new(Arc::new(Failing));
        let mut update = raw("online", None);
        update.user.avatar = None;
        assert!(resolver.resolve(&update).avatar.is_empty());
    }

    #[test]
    fn custom_cdn_base_is_used() {
        let resolver =
            PresenceResolver::with_cdn_base(Arc::new(NoProfileLookup), "http://127.0.0.1:9/");
        let snapshot = resolver.resolve(&raw("online", None));
        assert_eq!(snapshot.avatar, "http://127.0.0.1:9/avatars/42/embedded.png");
    }
}
