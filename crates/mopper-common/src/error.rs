//! Error types shared by the mopper crates

use miette::Diagnostic;
use smol_str::SmolStr;
use std::error::Error as StdError;

/// Failure reported by an external collaborator (content, authorization or audit)
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ProviderError {
    /// The requested post, comment or user does not exist
    #[error("not found: {0}")]
    #[diagnostic(code(mopper::provider::not_found))]
    NotFound(SmolStr),

    /// The platform could not be reached or timed out
    #[error("provider unavailable: {0}")]
    #[diagnostic(
        code(mopper::provider::unavailable),
        help("this is usually transient, try again later")
    )]
    Unavailable(String),

    /// The platform refused the action
    #[error("{id}: {reason}")]
    #[diagnostic(code(mopper::provider::rejected))]
    Rejected {
        /// Node or user the call targeted
        id: SmolStr,
        /// Platform-supplied reason
        reason: String,
    },

    /// Any other error from a provider implementation
    #[error(transparent)]
    #[diagnostic(code(mopper::provider::other))]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl ProviderError {
    /// Shorthand for [`ProviderError::Rejected`]
    pub fn rejected(id: impl Into<SmolStr>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Errors emitted by key-value stores.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum StoreError {
    /// Filesystem or I/O error
    #[error("I/O error: {0}")]
    #[diagnostic(code(mopper::store::io))]
    Io(#[from] std::io::Error),
    /// Serialization error (e.g., JSON)
    #[error("serialization error: {0}")]
    #[diagnostic(code(mopper::store::serde))]
    Serde(#[from] serde_json::Error),
    /// Any other error from a backend implementation
    #[error(transparent)]
    #[diagnostic(code(mopper::store::other))]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

/// A mop request that was rejected before any I/O happened
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
pub enum ValidationError {
    /// Neither remove nor lock was requested
    #[error("You must select either lock or remove.")]
    #[diagnostic(code(mopper::validation::no_action))]
    NoActionSelected,

    /// The trigger did not carry a post or comment id
    #[error("No target id was provided.")]
    #[diagnostic(code(mopper::validation::missing_root))]
    MissingRoot,

    /// The id resolved to the wrong kind of node for the entry point
    #[error("{0} is not a {1}.")]
    #[diagnostic(code(mopper::validation::wrong_kind))]
    WrongRootKind(SmolStr, &'static str),
}

/// Result type for collaborator calls
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
