//! Scripted games and evaluators shared by the unit tests.

use engine_core::Game;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::evaluator::{EvalResult, Evaluator, EvaluatorError};
use crate::tree::SearchTree;

/// Three root moves, each opening a single forced line.
///
/// Root move `a` leads to branch `a + 1`; every later position has the
/// single move 0. Lines end (as draws) at `max_depth`.
#[derive(Debug, Clone)]
pub struct BranchGame {
    pub max_depth: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchState {
    pub branch: u8,
    pub depth: u16,
}

impl BranchState {
    pub const ROOT: Self = Self {
        branch: 0,
        depth: 0,
    };
}

impl BranchGame {
    pub fn new(max_depth: u16) -> Self {
        Self { max_depth }
    }
}

impl Game for BranchGame {
    type State = BranchState;
    type Action = u8;

    fn legal_moves(&self, state: &BranchState) -> Vec<u8> {
        if state.depth == 0 {
            vec![0, 1, 2]
        } else if state.depth >= self.max_depth {
            Vec::new()
        } else {
            vec![0]
        }
    }

    fn apply(&self, state: &BranchState, action: &u8) -> BranchState {
        if state.depth == 0 {
            BranchState {
                branch: action + 1,
                depth: 1,
            }
        } else {
            BranchState {
                branch: state.branch,
                depth: state.depth + 1,
            }
        }
    }

    fn is_terminal(&self, state: &BranchState) -> bool {
        state.depth >= self.max_depth
    }

    fn terminal_value(&self, _state: &BranchState) -> f32 {
        0.0
    }

    fn encode(&self, state: &BranchState) -> Vec<f32> {
        vec![state.branch as f32, state.depth as f32]
    }

    fn action_index(&self, action: &u8) -> usize {
        *action as usize
    }

    fn num_actions(&self) -> usize {
        3
    }
}

/// Evaluator for [`BranchGame`]: fixed root priors, and every position in
/// branch `b` worth `values[b - 1]` to the root player.
#[derive(Debug)]
pub struct BranchEvaluator {
    pub priors: [f32; 3],
    pub values: [f32; 3],
}

impl BranchEvaluator {
    pub fn new(priors: [f32; 3], values: [f32; 3]) -> Self {
        Self { priors, values }
    }
}

impl Evaluator for BranchEvaluator {
    fn evaluate(&self, input: &[f32]) -> Result<EvalResult, EvaluatorError> {
        let branch = input[0] as usize;
        let depth = input[1] as u32;
        if branch == 0 {
            return Ok(EvalResult {
                policy: self.priors.to_vec(),
                value: 0.0,
            });
        }
        let root_value = self.values[branch - 1];
        // Odd depths are the opponent's turn
        let value = if depth % 2 == 1 {
            -root_value
        } else {
            root_value
        };
        Ok(EvalResult {
            policy: vec![1.0, 0.0, 0.0],
            value,
        })
    }
}

/// Root 0 has moves 0 (to 1, a position without moves) and 1 (to 2, a draw).
#[derive(Debug, Clone, Copy)]
pub struct DeadEndGame;

impl Game for DeadEndGame {
    type State = u8;
    type Action = u8;

    fn legal_moves(&self, state: &u8) -> Vec<u8> {
        if *state == 0 {
            vec![0, 1]
        } else {
            Vec::new()
        }
    }

    fn apply(&self, _state: &u8, action: &u8) -> u8 {
        action + 1
    }

    fn is_terminal(&self, state: &u8) -> bool {
        *state == 2
    }

    fn terminal_value(&self, _state: &u8) -> f32 {
        0.0
    }

    fn encode(&self, state: &u8) -> Vec<f32> {
        vec![*state as f32]
    }

    fn action_index(&self, action: &u8) -> usize {
        *action as usize
    }

    fn num_actions(&self) -> usize {
        2
    }
}

/// Two positions that move into each other forever.
#[derive(Debug, Clone, Copy)]
pub struct CycleGame;

impl Game for CycleGame {
    type State = u8;
    type Action = u8;

    fn legal_moves(&self, _state: &u8) -> Vec<u8> {
        vec![0]
    }

    fn apply(&self, state: &u8, _action: &u8) -> u8 {
        1 - state
    }

    fn is_terminal(&self, _state: &u8) -> bool {
        false
    }

    fn terminal_value(&self, _state: &u8) -> f32 {
        0.0
    }

    fn encode(&self, state: &u8) -> Vec<f32> {
        vec![*state as f32]
    }

    fn action_index(&self, _action: &u8) -> usize {
        0
    }

    fn num_actions(&self) -> usize {
        1
    }
}

/// Uniform policy with a fixed value.
#[derive(Debug, Clone)]
pub struct ConstantEvaluator {
    num_actions: usize,
    value: f32,
}

impl ConstantEvaluator {
    pub fn new(num_actions: usize, value: f32) -> Self {
        Self { num_actions, value }
    }
}

impl Evaluator for ConstantEvaluator {
    fn evaluate(&self, _input: &[f32]) -> Result<EvalResult, EvaluatorError> {
        Ok(EvalResult {
            policy: vec![1.0 / self.num_actions as f32; self.num_actions],
            value: self.value,
        })
    }
}

/// Policy and value that vary with the input, the way a trained model's do.
#[derive(Debug, Clone)]
pub struct MixingEvaluator {
    num_actions: usize,
}

impl MixingEvaluator {
    pub fn new(num_actions: usize) -> Self {
        Self { num_actions }
    }
}

impl Evaluator for MixingEvaluator {
    fn evaluate(&self, input: &[f32]) -> Result<EvalResult, EvaluatorError> {
        let mix: f32 = input
            .iter()
            .enumerate()
            .map(|(i, x)| x * (i as f32 + 1.0))
            .sum();
        let policy = (0..self.num_actions)
            .map(|a| 1.5 + ((a as f32 + 1.0) * mix * 0.37).cos())
            .collect();
        Ok(EvalResult {
            policy,
            value: (mix * 0.61).sin() * 0.9,
        })
    }
}

/// Records every input passed to the wrapped evaluator.
#[derive(Debug)]
pub struct CountingEvaluator<E> {
    inner: E,
    inputs: Mutex<Vec<Vec<f32>>>,
    closed: AtomicUsize,
}

impl<E: Evaluator> CountingEvaluator<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            inputs: Mutex::new(Vec::new()),
            closed: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.inputs.lock().len()
    }

    pub fn inputs(&self) -> Vec<Vec<f32>> {
        self.inputs.lock().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl<E: Evaluator> Evaluator for CountingEvaluator<E> {
    fn evaluate(&self, input: &[f32]) -> Result<EvalResult, EvaluatorError> {
        self.inputs.lock().push(input.to_vec());
        self.inner.evaluate(input)
    }

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.inner.close();
    }
}

/// Answers the first `ok_calls` requests, then reports the model as gone.
#[derive(Debug)]
pub struct FlakyEvaluator<E> {
    inner: E,
    remaining: AtomicUsize,
}

impl<E: Evaluator> FlakyEvaluator<E> {
    pub fn new(inner: E, ok_calls: usize) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(ok_calls),
        }
    }
}

impl<E: Evaluator> Evaluator for FlakyEvaluator<E> {
    fn evaluate(&self, input: &[f32]) -> Result<EvalResult, EvaluatorError> {
        let granted = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if granted {
            self.inner.evaluate(input)
        } else {
            Err(EvaluatorError::Unavailable("model went away".into()))
        }
    }
}

/// Check the per-node invariants of a tree with no search in flight.
pub fn assert_consistent<S, A>(tree: &SearchTree<S, A>)
where
    S: Clone + Eq + std::hash::Hash + std::fmt::Debug,
    A: Copy + Ord + std::fmt::Debug,
{
    for node in tree.nodes() {
        let guard = node.lock();
        let mut visits = 0;
        for (action, edge) in &guard.edges {
            assert_eq!(edge.virtual_loss, 0, "virtual loss left on {:?}", action);
            visits += edge.visit_count;
            if edge.visit_count > 0 {
                let q = edge.total_value / edge.visit_count as f32;
                assert!(
                    (edge.action_value - q).abs() < 1e-5,
                    "Q mismatch on {:?}",
                    action
                );
            } else {
                assert_eq!(edge.action_value, 0.0);
            }
        }
        assert_eq!(guard.sum_visits, visits);
    }
}
