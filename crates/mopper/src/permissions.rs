use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use mopper_common::options::DEFAULT_PERMISSION_TTL_DAYS;
use mopper_common::{KvStore, MopOptions, PermissionDecision, SmolStr, StoreError, User};

use crate::events::{RosterAction, RosterEvent, RosterEventHandler, dispatch};
use crate::provider::AuthorizationSource;

/// Moderator scopes that allow bulk actions
const MANAGING_SCOPES: [&str; 2] = ["all", "posts"];

/// Store key for a user's cached decision
pub fn cache_key(user_id: &str) -> String {
    format!("permissionsCache:{user_id}")
}

/// Cached answer to "can this user mop"
///
/// Decisions are written to the [`KvStore`] with a fixed lifetime (28 days
/// unless configured otherwise) and reused until they expire or a roster
/// change for that user deletes them. Concurrent misses for the same user may
/// each do a fresh lookup; they all write the same answer.
#[derive(Clone)]
pub struct PermissionCache {
    source: Arc<dyn AuthorizationSource>,
    store: Arc<dyn KvStore>,
    community: SmolStr,
    ttl: TimeDelta,
}

impl PermissionCache {
    /// Cache for moderators of `community`
    pub fn new(
        source: Arc<dyn AuthorizationSource>,
        store: Arc<dyn KvStore>,
        community: impl Into<SmolStr>,
    ) -> Self {
        Self {
            source,
            store,
            community: community.into(),
            ttl: TimeDelta::days(i64::from(DEFAULT_PERMISSION_TTL_DAYS)),
        }
    }

    /// Override how long decisions stay cached
    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    /// Take the cache lifetime from `options`
    pub fn with_options(self, options: &MopOptions) -> Self {
        self.with_ttl(options.permission_ttl())
    }

    /// Whether `user_id` may run bulk actions
    ///
    /// Store and lookup failures give [`PermissionDecision::Undetermined`],
    /// never `Allowed`.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self)))]
    pub async fn authorize(&self, user_id: &str) -> PermissionDecision {
        if user_id.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::error!("no user id to authorize");
            return PermissionDecision::Undetermined;
        }

        #[cfg(feature = "tracing")]
        let start = std::time::Instant::now();
        let key = cache_key(user_id);

        match self.store.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<bool>(&raw) {
                Ok(allowed) => {
                    #[cfg(feature = "tracing")]
                    tracing::info!(
                        user = user_id,
                        allowed,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "permission cache hit"
                    );
                    return PermissionDecision::from_allowed(allowed);
                }
                Err(_error) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(user = user_id, value = %raw, error = %_error, "discarding unreadable cache entry");
                }
            },
            Ok(None) => {}
            Err(_error) => {
                #[cfg(feature = "tracing")]
                tracing::error!(user = user_id, error = %_error, "permission cache read failed");
                return PermissionDecision::Undetermined;
            }
        }

        let Some(user) = self.resolve_user(user_id).await else {
            #[cfg(feature = "tracing")]
            tracing::error!(user = user_id, "user could not be retrieved or is not a moderator");
            return PermissionDecision::Undetermined;
        };

        let scopes = match self.source.mod_permissions(&user, &self.community).await {
            Ok(scopes) => scopes,
            Err(_error) => {
                #[cfg(feature = "tracing")]
                tracing::error!(user = %user.username, error = %_error, "mod permission lookup failed");
                return PermissionDecision::Undetermined;
            }
        };
        let allowed = scopes
            .iter()
            .any(|scope| MANAGING_SCOPES.contains(&scope.as_str()));

        let expire_at = Utc::now() + self.ttl;
        if let Err(_error) = self.store.set(&key, allowed.to_string(), expire_at).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(user = user_id, error = %_error, "failed to cache permission decision");
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            user = %user.username,
            allowed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "permission cache miss"
        );
        PermissionDecision::from_allowed(allowed)
    }

    /// Forget the cached decision for `user_id`
    pub async fn invalidate(&self, user_id: &str) -> Result<(), StoreError> {
        self.store.delete(&cache_key(user_id)).await
    }

    /// Handle a platform roster event, invalidating when it is relevant
    pub async fn on_roster_change_event(&self, event: &RosterEvent) -> Option<RosterAction> {
        dispatch(self, event).await
    }

    /// Current user if it is `user_id`, otherwise scan the moderator roster
    async fn resolve_user(&self, user_id: &str) -> Option<User> {
        match self.source.current_user().await {
            Ok(user) if user.id == user_id => return Some(user),
            Ok(_other) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(user = user_id, current = %_other.id, "current user is someone else, checking roster");
            }
            Err(_error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(user = user_id, error = %_error, "current user lookup failed, checking roster");
            }
        }

        match self.source.moderators(&self.community).await {
            Ok(moderators) => moderators.into_iter().find(|m| m.id == user_id),
            Err(_error) => {
                #[cfg(feature = "tracing")]
                tracing::error!(community = %self.community, error = %_error, "moderator roster lookup failed");
                None
            }
        }
    }

    async fn invalidate_for(&self, user_id: &str, _action: RosterAction) {
        match self.invalidate(user_id).await {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::info!(user = user_id, action = _action.as_str(), "cleared permission cache");
            }
            Err(_error) => {
                #[cfg(feature = "tracing")]
                tracing::error!(user = user_id, action = _action.as_str(), error = %_error, "failed to clear permission cache");
            }
        }
    }
}

#[async_trait]
impl RosterEventHandler for PermissionCache {
    async fn moderator_added(&self, user_id: &str) {
        self.invalidate_for(user_id, RosterAction::AddModerator).await
    }
    async fn moderator_invited(&self, user_id: &str) {
        self.invalidate_for(user_id, RosterAction::InviteModerator).await
    }
    async fn permissions_changed(&self, user_id: &str) {
        self.invalidate_for(user_id, RosterAction::PermissionsChanged).await
    }
    async fn moderator_removed(&self, user_id: &str) {
        self.invalidate_for(user_id, RosterAction::RemoveModerator).await
    }
}
