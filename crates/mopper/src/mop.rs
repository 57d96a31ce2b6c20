use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bon::Builder;
use mopper_common::{
    ActionConfig, MopOptions, Node, NodeKind, PermissionDecision, SmolStr, User, ValidationError,
};

use crate::collect::TreeCollector;
use crate::error::{ActionError, MopError};
use crate::events::{RosterAction, RosterEvent};
use crate::execute::{Action, BatchExecutor};
use crate::permissions::PermissionCache;
use crate::provider::{AuditAction, AuditEntry, AuditSink, ContentProvider};

/// Counts and timings of a completed mop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MopSummary {
    /// Root post or comment id
    pub target: SmolStr,
    /// Kind of the root
    pub kind: NodeKind,
    /// Comments collected and actioned
    pub count: usize,
    /// Remove calls issued
    pub removed: usize,
    /// Lock calls issued
    pub locked: usize,
    /// "removed", "locked" or "removed and locked"
    pub verb: &'static str,
    /// Time spent walking the tree
    pub gather_time: Duration,
    /// Time spent removing and locking
    pub action_time: Duration,
}

impl fmt::Display for MopSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} in {}ms (gathered in {}ms)",
            self.target,
            self.verb,
            pluralize(self.count, "comment"),
            self.action_time.as_millis(),
            self.gather_time.as_millis(),
        )
    }
}

/// Terminal result of one mop invocation
///
/// Every entry point returns exactly one of these; errors never escape as
/// panics or `Err`.
#[derive(Debug)]
pub enum MopOutcome {
    /// Rejected before any I/O
    Invalid(ValidationError),
    /// The actor lacks the required moderator scope
    Denied,
    /// The actor's permissions could not be determined
    Undetermined,
    /// No comment needed removing or locking
    NothingToMop,
    /// Only lock was requested on a post, so the post itself was locked
    PostLocked,
    /// As [`MopOutcome::PostLocked`], but the post was already locked
    PostAlreadyLocked,
    /// Every requested action succeeded
    Completed(MopSummary),
    /// Collection or an action wave failed
    Failed(MopError),
}

impl MopOutcome {
    /// Message to show the moderator who triggered the mop
    pub fn message(&self) -> Cow<'static, str> {
        match self {
            Self::Invalid(error) => error.to_string().into(),
            Self::Denied => "You do not have the correct mod permissions to do this.".into(),
            Self::Undetermined => {
                "Could not determine your mod permissions. Please try again later.".into()
            }
            Self::NothingToMop => "No comments found to mop.".into(),
            Self::PostLocked => {
                "Rather than locking individual comments, the post has been locked.".into()
            }
            Self::PostAlreadyLocked => {
                "The post is already locked. Locking individual comments is not necessary.".into()
            }
            Self::Completed(summary) => format!(
                "Successfully {} comments! Refresh the page to see the cleanup.",
                summary.verb
            )
            .into(),
            Self::Failed(_) => "Mop failed! Please try again later.".into(),
        }
    }

    /// Whether the mop changed (or confirmed) what was asked
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Completed(_) | Self::PostLocked | Self::PostAlreadyLocked
        )
    }

    /// The summary, if the mop completed
    pub fn summary(&self) -> Option<&MopSummary> {
        match self {
            Self::Completed(summary) => Some(summary),
            _ => None,
        }
    }
}

/// Runs mops: authorize, collect, execute, summarize
///
/// ```ignore
/// let mopper = Mopper::builder()
///     .content(platform.clone())
///     .permissions(PermissionCache::new(platform.clone(), store, "rust"))
///     .audit(platform)
///     .build();
/// let outcome = mopper.mop_post(&actor, "t3_abc", ActionConfig::default()).await;
/// println!("{}", outcome.message());
/// ```
#[derive(Builder)]
pub struct Mopper {
    content: Arc<dyn ContentProvider>,
    permissions: PermissionCache,
    audit: Arc<dyn AuditSink>,
    #[builder(default)]
    options: MopOptions,
}

impl Mopper {
    /// Mop a comment and every reply under it
    pub async fn mop_thread(
        &self,
        actor: &User,
        comment_id: &str,
        config: ActionConfig,
    ) -> MopOutcome {
        self.run(actor, comment_id, NodeKind::Comment, config).await
    }

    /// Mop every comment on a post
    pub async fn mop_post(&self, actor: &User, post_id: &str, config: ActionConfig) -> MopOutcome {
        self.run(actor, post_id, NodeKind::Post, config).await
    }

    /// Whether `user_id` may mop, consulting the cache first
    pub async fn authorize(&self, user_id: &str) -> PermissionDecision {
        self.permissions.authorize(user_id).await
    }

    /// Feed a moderator roster event to the permission cache
    pub async fn on_roster_change_event(&self, event: &RosterEvent) -> Option<RosterAction> {
        self.permissions.on_roster_change_event(event).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(self, actor, config), fields(actor = %actor.username)))]
    async fn run(
        &self,
        actor: &User,
        root_id: &str,
        expected: NodeKind,
        config: ActionConfig,
    ) -> MopOutcome {
        if let Err(error) = validate(root_id, &config) {
            return MopOutcome::Invalid(error);
        }

        let root = match self.content.get_node(root_id).await {
            Ok(root) if root.kind == expected => root,
            Ok(_) => {
                let wanted = match expected {
                    NodeKind::Post => "post",
                    NodeKind::Comment => "comment",
                };
                return MopOutcome::Invalid(ValidationError::WrongRootKind(
                    root_id.into(),
                    wanted,
                ));
            }
            Err(error) => return self.fail(root_id, MopError::Collect(error)),
        };

        // Authorization may write the cache, so it runs after every input check.
        match self.permissions.authorize(&actor.id).await {
            PermissionDecision::Allowed => {}
            PermissionDecision::Denied => return MopOutcome::Denied,
            PermissionDecision::Undetermined => return MopOutcome::Undetermined,
        }

        if root.is_post() && config.lock && !config.remove && self.options.lock_post_instead {
            return self.lock_post(&root).await;
        }

        match self.mop(actor, &root, &config).await {
            Ok(outcome) => outcome,
            Err(error) => self.fail(root_id, error),
        }
    }

    async fn mop(
        &self,
        actor: &User,
        root: &Node,
        config: &ActionConfig,
    ) -> Result<MopOutcome, MopError> {
        let start = Instant::now();
        let nodes = TreeCollector::new(self.content.as_ref(), self.options.fetch_concurrency())
            .collect(root, |node| config.keeps(node))
            .await?;
        let gather_time = start.elapsed();

        #[cfg(feature = "tracing")]
        tracing::info!(
            "{}: Gathered {} in {}ms",
            root.id,
            pluralize(nodes.len(), "comment"),
            gather_time.as_millis()
        );

        if !nodes
            .iter()
            .any(|n| config.should_remove(n) || config.should_lock(n))
        {
            #[cfg(feature = "tracing")]
            tracing::info!("{}: No comments found to mop.", root.id);
            return Ok(MopOutcome::NothingToMop);
        }

        let action_start = Instant::now();
        let report = BatchExecutor::new(self.content.as_ref(), self.options.chunk_size())
            .execute(&nodes, config)
            .await?;

        let summary = MopSummary {
            target: root.id.clone(),
            kind: root.kind,
            count: report.nodes,
            removed: report.removed,
            locked: report.locked,
            verb: config.past_tense(),
            gather_time,
            action_time: action_start.elapsed(),
        };

        #[cfg(feature = "tracing")]
        tracing::info!(
            "{}: /u/{} successfully {} {} in {}ms.",
            root.id,
            actor.username,
            summary.verb,
            pluralize(summary.count, "comment"),
            summary.action_time.as_millis()
        );

        if config.remove {
            self.record_audit(actor, root, config).await;
        }

        Ok(MopOutcome::Completed(summary))
    }

    async fn lock_post(&self, post: &Node) -> MopOutcome {
        if post.locked {
            return MopOutcome::PostAlreadyLocked;
        }
        match self.content.lock(&post.id).await {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::info!("{}: locked post instead of individual comments", post.id);
                MopOutcome::PostLocked
            }
            Err(error) => {
                let error = ActionError {
                    chunk: 0,
                    action: Action::Lock,
                    failed: 1,
                    attempted: 1,
                    first_id: post.id.clone(),
                    source: error,
                };
                self.fail(&post.id, error.into())
            }
        }
    }

    /// Best effort: failures are logged and swallowed
    async fn record_audit(&self, actor: &User, root: &Node, config: &ActionConfig) {
        let entry = AuditEntry {
            action: match root.kind {
                NodeKind::Comment => AuditAction::RemoveComment,
                NodeKind::Post => AuditAction::RemoveLink,
            },
            target: root.id.clone(),
            details: self.options.audit_details.clone(),
            description: format!(
                "{} used comment-mop to {} all comments of this post.",
                actor.username,
                config.imperative()
            ),
        };
        if let Err(_error) = self.audit.append(entry).await {
            #[cfg(feature = "tracing")]
            tracing::error!(target_id = %root.id, error = %_error, "failed to add modlog entry");
        }
    }

    fn fail(&self, _root_id: &str, error: MopError) -> MopOutcome {
        #[cfg(feature = "tracing")]
        tracing::error!(root = _root_id, error = %error, "mop failed");
        MopOutcome::Failed(error)
    }
}

fn validate(root_id: &str, config: &ActionConfig) -> Result<(), ValidationError> {
    if !config.has_action() {
        return Err(ValidationError::NoActionSelected);
    }
    if root_id.trim().is_empty() {
        return Err(ValidationError::MissingRoot);
    }
    Ok(())
}

fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
