//! Error types of the matching engine.

use crate::term::TermId;
use thiserror::Error;

/// Result type for matching operations
pub type MatchResult<T> = Result<T, MatchError>;

/// Outcome of a failed match. All of these are ordinary, recoverable results
/// for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// The pattern head is a new hole with no arguments.
    #[error("indeterminate pattern")]
    UndefPat,

    /// Neither pass found an acceptable subterm.
    #[error("pattern does not match any subterm")]
    NoMatch,

    /// The highest requested occurrence does not exist.
    #[error("only {found} < {requested} occurrences of the pattern")]
    MissingOccs { found: usize, requested: usize },

    /// The abstracted context does not type-check.
    #[error("dependent type error in abstracted context {context:?}: {reason}")]
    Dependent { context: TermId, reason: String },

    /// A free variable index beyond [`MAX_FREE_REL`](crate::subst::MAX_FREE_REL).
    #[error("free variable index {0} is too large")]
    FreeRelTooLarge(u32),

    /// Occurrence indices start at 1.
    #[error("invalid occurrence index {0}")]
    InvalidOccurrence(u32),
}

impl MatchError {
    pub fn missing(found: usize, requested: usize) -> Self {
        MatchError::MissingOccs { found, requested }
    }

    pub fn dependent(context: TermId, reason: impl Into<String>) -> Self {
        MatchError::Dependent {
            context,
            reason: reason.into(),
        }
    }
}
