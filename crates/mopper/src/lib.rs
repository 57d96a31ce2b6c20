//! # mopper
//!
//! Bulk moderation over comment trees: remove and/or lock a comment and all
//! of its replies, or every comment on a post, in one action.
//!
//! A mop runs in four steps:
//!
//! 1. The actor's moderator permissions are checked through a
//!    [`PermissionCache`], which keeps decisions in a [`KvStore`] for 28 days
//!    and drops them when a roster change event arrives for that user.
//! 2. A [`TreeCollector`] walks the tree under the root with a capped number
//!    of outstanding fetches, leaving out distinguished comments if asked.
//! 3. A [`BatchExecutor`] removes and locks the collected comments in chunks
//!    of 30, so no more than 30 mutating calls are ever in flight.
//! 4. The [`Mopper`] turns the result into exactly one [`MopOutcome`] and,
//!    for removals, writes a best-effort audit entry.
//!
//! The platform itself is reached only through the traits in [`provider`].
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mopper::{ActionConfig, MemoryKvStore, Mopper, PermissionCache};
//!
//! # async fn example(platform: Arc<MyPlatform>, actor: mopper::User) {
//! let store = Arc::new(MemoryKvStore::new());
//! let mopper = Mopper::builder()
//!     .content(platform.clone())
//!     .permissions(PermissionCache::new(platform.clone(), store, "rust"))
//!     .audit(platform)
//!     .build();
//!
//! let outcome = mopper
//!     .mop_thread(&actor, "t1_abc123", ActionConfig::default())
//!     .await;
//! println!("{}", outcome.message());
//! # }
//! ```
//!
//! [`KvStore`]: mopper_common::KvStore

#![warn(missing_docs)]

/// Tree traversal with bounded fetch concurrency.
pub mod collect;
/// Orchestration errors.
pub mod error;
pub mod events;
/// Chunked remove/lock execution.
pub mod execute;
/// Mop orchestration and outcomes.
pub mod mop;
/// Cached moderator permission checks.
pub mod permissions;
pub mod provider;

pub use collect::TreeCollector;
pub use error::{ActionError, MopError};
pub use events::{RosterAction, RosterEvent, RosterEventHandler};
pub use execute::{Action, BatchExecutor, ExecutionReport};
pub use mop::{MopOutcome, MopSummary, Mopper};
pub use permissions::PermissionCache;
pub use provider::{AuditAction, AuditEntry, AuditSink, AuthorizationSource, ContentProvider};

pub use mopper_common::*;
