use miette::Diagnostic;
use mopper_common::{ProviderError, SmolStr, ValidationError};

use crate::execute::Action;

/// A wave of remove or lock calls in which at least one call failed
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("{action} failed for {failed} of {attempted} comments in chunk {chunk} (first: {first_id})")]
#[diagnostic(
    code(mopper::execute::action_failed),
    help("comments in earlier chunks were already actioned; running the mop again is safe")
)]
pub struct ActionError {
    /// Zero-based index of the failing chunk
    pub chunk: usize,
    /// Which wave failed
    pub action: Action,
    /// Calls in the wave that failed
    pub failed: usize,
    /// Calls in the wave that were issued
    pub attempted: usize,
    /// Id of the first node whose call failed
    pub first_id: SmolStr,
    /// Error from that call
    #[source]
    pub source: ProviderError,
}

/// Why a mop did not complete
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum MopError {
    /// Rejected before any I/O
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    /// The root or part of the tree could not be fetched; nothing was actioned
    #[error("failed to collect comments: {0}")]
    #[diagnostic(code(mopper::collect))]
    Collect(
        #[from]
        #[diagnostic_source]
        ProviderError,
    ),

    /// A remove or lock wave failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Action(#[from] ActionError),
}
