//! Moderator roster change events
//!
//! The platform reports every mod-log action through one event type. Only four
//! of them can change what a moderator is allowed to do; [`dispatch`] routes
//! those to a [`RosterEventHandler`] and drops the rest.

use async_trait::async_trait;
use mopper_common::SmolStr;
use serde::Deserialize;

/// Roster actions that can change a moderator's permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterAction {
    /// `addmoderator`
    AddModerator,
    /// `invitemoderator`
    InviteModerator,
    /// `permissions`
    PermissionsChanged,
    /// `removemoderator`
    RemoveModerator,
}

impl RosterAction {
    /// Parse a platform action token. Unrelated actions give `None`.
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "addmoderator" => Some(Self::AddModerator),
            "invitemoderator" => Some(Self::InviteModerator),
            "permissions" => Some(Self::PermissionsChanged),
            "removemoderator" => Some(Self::RemoveModerator),
            _ => None,
        }
    }

    /// Platform action token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddModerator => "addmoderator",
            Self::InviteModerator => "invitemoderator",
            Self::PermissionsChanged => "permissions",
            Self::RemoveModerator => "removemoderator",
        }
    }
}

/// A mod action as delivered by the platform's event subscription
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEvent {
    /// Action token, e.g. `removemoderator`
    #[serde(default)]
    pub action: Option<SmolStr>,
    /// Account the action targeted
    #[serde(default)]
    pub target_user_id: Option<SmolStr>,
}

impl RosterEvent {
    /// Event with both fields set
    pub fn new(action: impl Into<SmolStr>, target_user_id: impl Into<SmolStr>) -> Self {
        Self {
            action: Some(action.into()),
            target_user_id: Some(target_user_id.into()),
        }
    }
}

/// Receiver for roster changes, one method per relevant action
#[async_trait]
pub trait RosterEventHandler: Send + Sync {
    /// A user was made moderator
    async fn moderator_added(&self, user_id: &str);
    /// A user was invited to moderate
    async fn moderator_invited(&self, user_id: &str);
    /// A moderator's permission scopes changed
    async fn permissions_changed(&self, user_id: &str);
    /// A moderator was removed
    async fn moderator_removed(&self, user_id: &str);
}

/// Route `event` to the matching handler method
///
/// Returns the action that was dispatched, or `None` when the event was
/// irrelevant or missing its action or target.
pub async fn dispatch<H>(handler: &H, event: &RosterEvent) -> Option<RosterAction>
where
    H: RosterEventHandler + ?Sized,
{
    let action = RosterAction::parse(event.action.as_deref()?)?;
    let user_id = event.target_user_id.as_deref()?;
    match action {
        RosterAction::AddModerator => handler.moderator_added(user_id).await,
        RosterAction::InviteModerator => handler.moderator_invited(user_id).await,
        RosterAction::PermissionsChanged => handler.permissions_changed(user_id).await,
        RosterAction::RemoveModerator => handler.moderator_removed(user_id).await,
    }
    Some(action)
}
