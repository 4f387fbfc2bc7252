//! Search-level errors surfaced by [`MctsPlayer`](crate::MctsPlayer).

use thiserror::Error;

use crate::evaluator::EvaluatorError;

/// Errors that can end a move decision.
///
/// A failed `choose_move` never leaves partial statistics behind: the
/// player discards the tree and debug record before returning one of these.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The evaluator failed, timed out, or produced unusable output.
    #[error("Evaluator unavailable: {0}")]
    EvaluatorUnavailable(#[from] EvaluatorError),

    /// Selection or expansion produced an action the rules do not allow.
    #[error("Illegal state reached: {detail}")]
    IllegalStateReached { detail: String },

    /// The root position is terminal or has no legal moves.
    #[error("No legal moves available")]
    NoLegalMoves,

    /// The search was cancelled or ran out of time.
    #[error("Search aborted")]
    SearchAborted,

    /// A simulation worker thread could not be started.
    #[error("Failed to spawn search worker: {0}")]
    Spawn(#[source] std::io::Error),
}

impl SearchError {
    pub(crate) fn illegal(detail: impl Into<String>) -> Self {
        Self::IllegalStateReached {
            detail: detail.into(),
        }
    }
}
