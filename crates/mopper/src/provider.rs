//! Capability traits for the platform services a mop talks to
//!
//! Each trait is an I/O boundary. Implementations wrap the real platform API;
//! tests substitute in-memory fakes.

use async_trait::async_trait;
use mopper_common::{Node, ProviderResult, SmolStr, User};
use serde::Serialize;
use std::fmt;

/// Read and mutate posts and comments
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Fetch a single post or comment by id
    async fn get_node(&self, id: &str) -> ProviderResult<Node>;

    /// Direct children of `node`, in reply order
    ///
    /// For a post these are its top-level comments, for a comment its replies.
    async fn list_children(&self, node: &Node) -> ProviderResult<Vec<Node>>;

    /// Remove a post or comment. Removing something already removed succeeds.
    async fn remove(&self, id: &str) -> ProviderResult<()>;

    /// Lock a post or comment. Locking something already locked succeeds.
    async fn lock(&self, id: &str) -> ProviderResult<()>;
}

/// Look up who the acting user is and what moderator scopes they hold
#[async_trait]
pub trait AuthorizationSource: Send + Sync {
    /// The account the current request runs as
    ///
    /// May fail for actors that aren't conventionally fetchable users.
    async fn current_user(&self) -> ProviderResult<User>;

    /// Moderator roster of `community`
    async fn moderators(&self, community: &str) -> ProviderResult<Vec<User>>;

    /// Permission scope tokens (`all`, `posts`, `wiki`, ...) `user` holds in `community`
    async fn mod_permissions(&self, user: &User, community: &str)
    -> ProviderResult<Vec<SmolStr>>;
}

/// Mod-log action recorded for a mop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// Mop rooted at a comment
    RemoveComment,
    /// Mop rooted at a post
    RemoveLink,
}

impl AuditAction {
    /// Platform token for this action
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemoveComment => "removecomment",
            Self::RemoveLink => "removelink",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One moderation-log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    /// What kind of removal this records
    pub action: AuditAction,
    /// Root post or comment id
    pub target: SmolStr,
    /// Short tag identifying the tool
    pub details: SmolStr,
    /// Human-readable description
    pub description: String,
}

/// Append-only moderation log
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append an entry. Callers treat failure as non-fatal.
    async fn append(&self, entry: AuditEntry) -> ProviderResult<()>;
}
