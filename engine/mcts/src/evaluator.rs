//! Evaluator trait for position evaluation.
//!
//! The evaluator provides a policy (one probability per action index) and a
//! value estimate for an encoded game state. In play this is a neural
//! network, usually behind a [`BatchingEvaluator`](crate::BatchingEvaluator);
//! for testing we provide a uniform evaluator.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during evaluation.
///
/// Cloneable so a failed batch can be reported to every request in it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluatorError {
    #[error("Model unavailable: {0}")]
    Unavailable(String),

    #[error("Evaluation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid evaluator output: {0}")]
    InvalidOutput(String),

    #[error("Evaluator closed")]
    Closed,
}

/// Result of evaluating a game state.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalResult {
    /// Policy: probability distribution over action indices.
    /// Entries for illegal actions are ignored by the search.
    pub policy: Vec<f32>,

    /// Value estimate for the side to move.
    /// Range: -1.0 (certain loss) to +1.0 (certain win).
    pub value: f32,
}

/// Trait for position evaluators.
///
/// Implementations must be safe to call from several simulation workers at
/// once.
pub trait Evaluator: Send + Sync {
    /// Evaluate a single encoded state.
    fn evaluate(&self, input: &[f32]) -> Result<EvalResult, EvaluatorError>;

    /// Batch evaluate multiple encoded states.
    ///
    /// Results are returned in input order. Default implementation calls
    /// evaluate() in a loop.
    fn evaluate_batch(&self, inputs: &[&[f32]]) -> Result<Vec<EvalResult>, EvaluatorError> {
        inputs.iter().map(|input| self.evaluate(input)).collect()
    }

    /// Release background resources. Later calls may fail with `Closed`.
    fn close(&self) {}
}

impl<E: Evaluator + ?Sized> Evaluator for std::sync::Arc<E> {
    fn evaluate(&self, input: &[f32]) -> Result<EvalResult, EvaluatorError> {
        (**self).evaluate(input)
    }

    fn evaluate_batch(&self, inputs: &[&[f32]]) -> Result<Vec<EvalResult>, EvaluatorError> {
        (**self).evaluate_batch(inputs)
    }

    fn close(&self) {
        (**self).close()
    }
}

/// Uniform evaluator that assigns equal probability to every action index.
/// Value is always 0.0 (neutral). Useful for testing MCTS without a model;
/// the search masks the policy down to the legal moves.
#[derive(Debug, Clone)]
pub struct UniformEvaluator {
    num_actions: usize,
}

impl UniformEvaluator {
    pub fn new(num_actions: usize) -> Self {
        Self { num_actions }
    }
}

impl Evaluator for UniformEvaluator {
    fn evaluate(&self, _input: &[f32]) -> Result<EvalResult, EvaluatorError> {
        if self.num_actions == 0 {
            return Err(EvaluatorError::InvalidOutput(
                "uniform evaluator has no actions".into(),
            ));
        }
        let prob = 1.0 / self.num_actions as f32;
        Ok(EvalResult {
            policy: vec![prob; self.num_actions],
            value: 0.0,
        })
    }
}
