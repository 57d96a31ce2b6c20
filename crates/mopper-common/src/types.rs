use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Whether a node is the post at the top of a discussion or a comment under it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Top-level submission. Its direct children are top-level comments.
    Post,
    /// A comment. Its children are its replies.
    Comment,
}

/// Snapshot of a post or comment taken when it was fetched
///
/// Nodes are never mutated in memory: removing or locking one is a side effect
/// against the content provider, and the snapshot keeps the flags it was
/// fetched with. Children are not stored; they are listed on demand through
/// the content provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Opaque platform identifier (e.g. `t1_abc123`, `t3_xyz`)
    pub id: SmolStr,
    /// Post or comment
    pub kind: NodeKind,
    /// Carries the moderator badge
    #[serde(default)]
    pub distinguished: bool,
    /// Already removed at fetch time
    #[serde(default)]
    pub removed: bool,
    /// Already locked at fetch time
    #[serde(default)]
    pub locked: bool,
}

impl Node {
    /// A plain comment with no flags set
    pub fn comment(id: impl Into<SmolStr>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Comment,
            distinguished: false,
            removed: false,
            locked: false,
        }
    }

    /// A plain post with no flags set
    pub fn post(id: impl Into<SmolStr>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Post,
            distinguished: false,
            removed: false,
            locked: false,
        }
    }

    /// Mark as distinguished
    pub fn distinguished(mut self) -> Self {
        self.distinguished = true;
        self
    }

    /// Mark as already removed
    pub fn removed(mut self) -> Self {
        self.removed = true;
        self
    }

    /// Mark as already locked
    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Whether this node is a post
    pub fn is_post(&self) -> bool {
        self.kind == NodeKind::Post
    }
}

/// What a mop should do, and which nodes it should leave alone
///
/// Missing fields deserialize to the defaults moderators get on a fresh
/// install: remove, don't lock, touch distinguished comments, skip anything
/// already actioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActionConfig {
    /// Remove the collected comments
    pub remove: bool,
    /// Lock the collected comments
    pub lock: bool,
    /// Leave distinguished comments out of the collection entirely
    pub skip_distinguished: bool,
    /// Don't re-remove removed comments or re-lock locked ones
    pub skip_already_actioned: bool,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            remove: true,
            lock: false,
            skip_distinguished: false,
            skip_already_actioned: true,
        }
    }
}

impl ActionConfig {
    /// At least one mutating action was requested
    pub fn has_action(&self) -> bool {
        self.remove || self.lock
    }

    /// Collection filter derived from `skip_distinguished`
    pub fn keeps(&self, node: &Node) -> bool {
        !(self.skip_distinguished && node.distinguished)
    }

    /// Whether `node` should receive a remove call
    pub fn should_remove(&self, node: &Node) -> bool {
        self.remove && !(self.skip_already_actioned && node.removed)
    }

    /// Whether `node` should receive a lock call
    pub fn should_lock(&self, node: &Node) -> bool {
        self.lock && !(self.skip_already_actioned && node.locked)
    }

    /// Past-tense verb for user-facing messages
    pub fn past_tense(&self) -> &'static str {
        match (self.remove, self.lock) {
            (true, true) => "removed and locked",
            (false, true) => "locked",
            _ => "removed",
        }
    }

    /// Imperative verb for audit entries
    pub fn imperative(&self) -> &'static str {
        match (self.remove, self.lock) {
            (true, true) => "remove and lock",
            (false, true) => "lock",
            _ => "remove",
        }
    }
}

/// A platform account as returned by the authorization source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable account id (e.g. `t2_abc`)
    pub id: SmolStr,
    /// Display name
    pub username: SmolStr,
}

impl User {
    /// Construct a user from id and name
    pub fn new(id: impl Into<SmolStr>, username: impl Into<SmolStr>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// Answer to "may this user run bulk actions"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    /// Holds the `all` or `posts` moderator scope
    Allowed,
    /// Resolved, but lacks the required scope
    Denied,
    /// Could not be resolved; callers should offer a retry
    Undetermined,
}

impl PermissionDecision {
    /// Convert a resolved boolean decision
    pub fn from_allowed(allowed: bool) -> Self {
        if allowed { Self::Allowed } else { Self::Denied }
    }
}
