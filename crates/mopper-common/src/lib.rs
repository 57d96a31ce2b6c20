//! Common types for mopper: the discussion-tree data model, errors, options
//! and the key-value store used for the permission cache.

#![warn(missing_docs)]
pub use smol_str;
pub use smol_str::SmolStr;

pub mod error;
/// Options controlling chunking, fetch concurrency and cache lifetime.
pub mod options;
pub mod store;
/// Nodes, action configuration and permission decisions.
pub mod types;

pub use error::{ProviderError, ProviderResult, StoreError, ValidationError};
pub use options::MopOptions;
pub use store::{FileKvStore, KvStore, MemoryKvStore};
pub use types::{ActionConfig, Node, NodeKind, PermissionDecision, User};
