//! MCTS search implementation.
//!
//! The search grows the tree in rounds of `leaf_batch` passes:
//! 1. Selection: walk from the root by PUCT, charging virtual loss on each
//!    edge, one pass after another in a fixed order. Finished positions and
//!    repetitions are backed up on the spot.
//! 2. Evaluation: the round's distinct leaves go to the evaluator together,
//!    split over the worker threads.
//! 3. Expansion and backup: leaves are expanded in selection order, then
//!    every pending path resolves its virtual loss and adds the value,
//!    flipping sign per ply.
//!
//! Threads only take part in evaluation, so for a fixed evaluator the tree
//! is the same for any number of workers. A failed round is reverted edge
//! by edge, so no virtual loss stays behind. No node lock is held while the
//! evaluator or the rules are called.

use engine_core::Game;
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

use crate::debug::DebugRecord;
use crate::error::SearchError;
use crate::evaluator::{EvalResult, Evaluator, EvaluatorError};
use crate::node::{NodeStatus, RootNoise};
use crate::tree::{NodeRef, SearchTree};

/// Counters for one run of the simulation loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchStats {
    /// Simulation passes that completed backup
    pub completed: u32,
    /// Longest selected path, in plies
    pub max_depth: usize,
    /// Rounds of leaf selection
    pub rounds: u32,
    pub elapsed: Duration,
}

type Path<G> = Vec<(
    NodeRef<<G as Game>::State, <G as Game>::Action>,
    <G as Game>::Action,
)>;

/// Where a selection walk stopped.
enum Descent<G: Game> {
    /// Value known without the evaluator (finished, stuck or repeated)
    Resolved(f32),
    /// Unexpanded position that needs an evaluation
    Leaf(G::State, Vec<G::Action>),
}

/// A distinct position waiting for the evaluator in the current round.
struct PendingLeaf<G: Game> {
    state: G::State,
    legal: Vec<G::Action>,
    input: Vec<f32>,
}

/// Everything the search needs, borrowed for one decision.
pub(crate) struct Search<'a, G: Game, E: Evaluator> {
    pub game: &'a G,
    pub evaluator: &'a E,
    pub tree: &'a SearchTree<G::State, G::Action>,
    pub debug: &'a DebugRecord<G::State>,
    pub c_puct: f32,
    pub virtual_loss: f32,
    pub root_noise: Option<RootNoise>,
}

impl<'a, G: Game, E: Evaluator> Search<'a, G, E> {
    /// Evaluate and expand the root if it is not expanded yet.
    ///
    /// Does not count as a simulation and backs nothing up.
    pub fn expand_root(&self, root: &G::State) -> Result<(), SearchError> {
        if self.game.is_terminal(root) {
            return Err(SearchError::NoLegalMoves);
        }
        let node = self.tree.get_or_create(root);
        let status = node.lock().status();
        match status {
            NodeStatus::Expanded => Ok(()),
            NodeStatus::Terminal(_) => Err(SearchError::NoLegalMoves),
            NodeStatus::Unexpanded => {
                let legal = self.game.legal_moves(root);
                if legal.is_empty() {
                    return Err(SearchError::NoLegalMoves);
                }
                let output = self.evaluator.evaluate(&self.game.encode(root))?;
                self.expand_evaluated(root, &legal, output).map(|_| ())
            }
        }
    }

    /// Run simulation passes until `budget` have completed.
    ///
    /// Passes run in rounds of `leaf_batch`; `num_workers` threads share the
    /// evaluations of each round. `abort` and `deadline` are checked between
    /// rounds, and stopping early fails with `SearchAborted`.
    pub fn run(
        &self,
        root: &G::State,
        budget: u32,
        leaf_batch: usize,
        num_workers: usize,
        abort: &AtomicBool,
        deadline: Option<Instant>,
    ) -> Result<SearchStats, SearchError> {
        let start = Instant::now();
        let leaf_batch = u32::try_from(leaf_batch.max(1)).unwrap_or(u32::MAX);
        let mut stats = SearchStats::default();

        while stats.completed < budget {
            if abort.load(Ordering::SeqCst) {
                break;
            }
            if deadline.map_or(false, |d| Instant::now() >= d) {
                break;
            }
            let size = leaf_batch.min(budget - stats.completed);
            let depth = self.run_round(root, size, num_workers)?;
            stats.completed += size;
            stats.max_depth = stats.max_depth.max(depth);
            stats.rounds += 1;
        }

        if stats.completed < budget {
            return Err(SearchError::SearchAborted);
        }
        stats.elapsed = start.elapsed();
        Ok(stats)
    }

    /// Select, evaluate and back up `size` passes. Returns the longest path.
    ///
    /// On error every pass of the round that is not yet backed up is
    /// reverted.
    fn run_round(
        &self,
        root: &G::State,
        size: u32,
        num_workers: usize,
    ) -> Result<usize, SearchError> {
        let mut max_depth = 0;
        let mut pending: Vec<(Path<G>, usize)> = Vec::new();
        let mut leaves: Vec<PendingLeaf<G>> = Vec::new();
        let mut leaf_index: HashMap<G::State, usize> = HashMap::new();

        for _ in 0..size {
            let mut path: Path<G> = Vec::new();
            match self.descend(root, &mut path) {
                Ok(Descent::Resolved(value)) => {
                    self.backup(&path, value);
                    max_depth = max_depth.max(path.len());
                    trace!(path_len = path.len(), leaf_value = value, "Simulation complete");
                }
                Ok(Descent::Leaf(state, legal)) => {
                    let index = match leaf_index.get(&state).copied() {
                        Some(index) => index,
                        None => {
                            let input = self.game.encode(&state);
                            leaf_index.insert(state.clone(), leaves.len());
                            leaves.push(PendingLeaf {
                                state,
                                legal,
                                input,
                            });
                            leaves.len() - 1
                        }
                    };
                    pending.push((path, index));
                }
                Err(e) => {
                    self.revert(&path);
                    return Err(self.abandon_round(&pending, e));
                }
            }
        }

        if leaves.is_empty() {
            return Ok(max_depth);
        }

        let outputs = match self.evaluate_leaves(&leaves, num_workers) {
            Ok(outputs) => outputs,
            Err(e) => return Err(self.abandon_round(&pending, e)),
        };

        let mut values = Vec::with_capacity(leaves.len());
        for (leaf, output) in leaves.iter().zip(outputs) {
            match self.expand_evaluated(&leaf.state, &leaf.legal, output) {
                Ok(value) => values.push(value),
                Err(e) => return Err(self.abandon_round(&pending, e)),
            }
        }

        for (path, index) in &pending {
            let value = values[*index];
            self.backup(path, value);
            max_depth = max_depth.max(path.len());
            trace!(path_len = path.len(), leaf_value = value, "Simulation complete");
        }
        Ok(max_depth)
    }

    fn abandon_round(&self, pending: &[(Path<G>, usize)], error: SearchError) -> SearchError {
        warn!(error = %error, passes = pending.len(), "Simulation round failed");
        for (path, _) in pending.iter().rev() {
            self.revert(path);
        }
        error
    }

    /// Select down to a leaf.
    ///
    /// Every edge pushed onto `path` carries one unit of virtual loss.
    fn descend(&self, root: &G::State, path: &mut Path<G>) -> Result<Descent<G>, SearchError> {
        let mut state = root.clone();
        let mut on_path: HashSet<G::State> = HashSet::new();
        on_path.insert(root.clone());

        loop {
            let node = self.tree.get_or_create(&state);
            let step = {
                let mut guard = node.lock();
                match guard.status() {
                    NodeStatus::Terminal(value) => return Ok(Descent::Resolved(value)),
                    NodeStatus::Unexpanded => None,
                    NodeStatus::Expanded => {
                        let noise = if path.is_empty() {
                            self.root_noise.as_ref()
                        } else {
                            None
                        };
                        let action = guard.select(self.c_puct, noise).ok_or_else(|| {
                            SearchError::illegal(format!("expanded node {:?} has no moves", state))
                        })?;
                        guard.apply_virtual_loss(&action, self.virtual_loss);
                        Some((action, guard.child(&action).cloned()))
                    }
                }
            };

            let Some((action, cached)) = step else {
                return Ok(self.classify_leaf(state));
            };
            path.push((Arc::clone(&node), action));

            let next = match cached {
                Some(child) => child,
                None => {
                    let child = self.game.apply(&state, &action);
                    node.lock().set_child(&action, child.clone());
                    child
                }
            };

            // A position repeating on the current path is scored as a draw
            if !on_path.insert(next.clone()) {
                return Ok(Descent::Resolved(0.0));
            }
            state = next;
        }
    }

    fn classify_leaf(&self, state: G::State) -> Descent<G> {
        if self.game.is_terminal(&state) {
            let value = self.game.terminal_value(&state);
            self.tree.set_terminal(&state, value);
            return Descent::Resolved(value);
        }
        let legal = self.game.legal_moves(&state);
        if legal.is_empty() {
            // Stuck without a move: a loss for the side to move
            self.tree.set_terminal(&state, -1.0);
            return Descent::Resolved(-1.0);
        }
        Descent::Leaf(state, legal)
    }

    /// Evaluate leaves in order, in contiguous chunks across worker threads.
    fn evaluate_leaves(
        &self,
        leaves: &[PendingLeaf<G>],
        num_workers: usize,
    ) -> Result<Vec<EvalResult>, SearchError> {
        let inputs: Vec<&[f32]> = leaves.iter().map(|leaf| leaf.input.as_slice()).collect();
        let workers = num_workers.clamp(1, inputs.len().max(1));
        if workers == 1 {
            return self.evaluate_chunk(&inputs);
        }

        let chunk_size = (inputs.len() + workers - 1) / workers;
        let results: Vec<Result<Vec<EvalResult>, SearchError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = inputs
                .chunks(chunk_size)
                .enumerate()
                .map(|(i, chunk)| {
                    std::thread::Builder::new()
                        .name(format!("mcts-worker-{}", i))
                        .spawn_scoped(scope, move || self.evaluate_chunk(chunk))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle {
                    Ok(handle) => handle
                        .join()
                        .unwrap_or_else(|_| Err(SearchError::illegal("evaluation worker panicked"))),
                    Err(e) => Err(SearchError::Spawn(e)),
                })
                .collect()
        });

        let mut outputs = Vec::with_capacity(inputs.len());
        for result in results {
            outputs.extend(result?);
        }
        Ok(outputs)
    }

    fn evaluate_chunk(&self, inputs: &[&[f32]]) -> Result<Vec<EvalResult>, SearchError> {
        let outputs = self.evaluator.evaluate_batch(inputs)?;
        if outputs.len() != inputs.len() {
            return Err(EvaluatorError::InvalidOutput(format!(
                "{} results for {} inputs",
                outputs.len(),
                inputs.len()
            ))
            .into());
        }
        Ok(outputs)
    }

    /// Validate an evaluation, store the priors and record it.
    fn expand_evaluated(
        &self,
        state: &G::State,
        legal: &[G::Action],
        output: EvalResult,
    ) -> Result<f32, SearchError> {
        if !output.value.is_finite() {
            return Err(EvaluatorError::InvalidOutput(format!("value {}", output.value)).into());
        }
        let value = output.value.clamp(-1.0, 1.0);
        let priors = masked_priors(self.game, legal, &output.policy)?;
        self.tree.expand(state, legal, &priors)?;
        self.debug.record(state, output.policy, value);
        Ok(value)
    }

    fn backup(&self, path: &Path<G>, leaf_value: f32) {
        // Each edge is scored for the side choosing it: the leaf's parent
        // sees the leaf value negated
        let mut value = -leaf_value;
        for (node, action) in path.iter().rev() {
            node.lock().backup(action, self.virtual_loss, value);
            value = -value;
        }
    }

    fn revert(&self, path: &Path<G>) {
        for (node, action) in path.iter().rev() {
            node.lock().revert(action, self.virtual_loss);
        }
    }
}

/// Restrict an evaluator policy to the legal moves and renormalize.
///
/// Negative or non-finite entries count as zero. If no legal move has any
/// mass the priors are uniform.
pub fn masked_priors<G: Game>(
    game: &G,
    legal: &[G::Action],
    policy: &[f32],
) -> Result<Vec<(G::Action, f32)>, EvaluatorError> {
    if policy.len() != game.num_actions() {
        return Err(EvaluatorError::InvalidOutput(format!(
            "policy has {} entries, expected {}",
            policy.len(),
            game.num_actions()
        )));
    }

    let mut priors = Vec::with_capacity(legal.len());
    for action in legal {
        let index = game.action_index(action);
        let p = *policy.get(index).ok_or_else(|| {
            EvaluatorError::InvalidOutput(format!("action index {} out of range", index))
        })?;
        let p = if p.is_finite() && p > 0.0 { p } else { 0.0 };
        priors.push((*action, p));
    }

    let sum: f32 = priors.iter().map(|(_, p)| p).sum();
    if sum > 0.0 {
        for (_, p) in &mut priors {
            *p /= sum;
        }
    } else if !priors.is_empty() {
        let uniform = 1.0 / priors.len() as f32;
        for (_, p) in &mut priors {
            *p = uniform;
        }
    }
    Ok(priors)
}

/// Visit counts turned into move probabilities: pi(a) ~ N(a)^(1/tau).
///
/// Counts are scaled by the maximum first so large exponents stay finite.
/// Returns all zeros when nothing was visited.
pub fn visit_distribution(visits: &[u32], temperature: f32) -> Vec<f32> {
    let max = visits.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return vec![0.0; visits.len()];
    }
    let exponent = 1.0 / temperature;
    let weights: Vec<f32> = visits
        .iter()
        .map(|&n| (n as f32 / max as f32).powf(exponent))
        .collect();
    let total: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Sample an index from a probability distribution.
///
/// Returns None if every weight is zero.
pub fn sample_action(policy: &[f32], rng: &mut ChaCha20Rng) -> Option<usize> {
    let r: f32 = rng.gen();
    let mut cumsum = 0.0;

    for (i, &p) in policy.iter().enumerate() {
        cumsum += p;
        if r < cumsum {
            return Some(i);
        }
    }

    // Fallback to last non-zero entry (handles floating point issues)
    policy.iter().rposition(|&p| p > 0.0)
}

/// Generate Dirichlet-distributed noise using Gamma variates.
pub fn dirichlet_noise(n: usize, alpha: f32, rng: &mut ChaCha20Rng) -> Vec<f32> {
    use rand_distr::{Distribution, Gamma};

    if n == 0 {
        return Vec::new();
    }
    let gamma = match Gamma::new(alpha as f64, 1.0) {
        Ok(gamma) => gamma,
        Err(e) => {
            warn!(alpha, error = %e, "Invalid Dirichlet alpha, using flat noise");
            return vec![1.0 / n as f32; n];
        }
    };
    let mut samples: Vec<f32> = (0..n).map(|_| gamma.sample(rng) as f32).collect();

    // Normalize
    let sum: f32 = samples.iter().sum();
    if sum > 0.0 {
        for s in &mut samples {
            *s /= sum;
        }
    } else {
        samples.fill(1.0 / n as f32);
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::evaluator::UniformEvaluator;
    use crate::gateway::BatchingEvaluator;
    use crate::test_utils::*;
    use games_tictactoe::{Action, State, TicTacToe};
    use rand::SeedableRng;

    struct Fixture<G: Game> {
        game: G,
        tree: SearchTree<G::State, G::Action>,
        debug: DebugRecord<G::State>,
    }

    impl<G: Game> Fixture<G> {
        fn new(game: G) -> Self {
            Self {
                game,
                tree: SearchTree::new(),
                debug: DebugRecord::new(),
            }
        }

        fn search<'a, E: Evaluator>(&'a self, evaluator: &'a E) -> Search<'a, G, E> {
            Search {
                game: &self.game,
                evaluator,
                tree: &self.tree,
                debug: &self.debug,
                c_puct: 1.5,
                virtual_loss: 1.0,
                root_noise: None,
            }
        }

        fn run<E: Evaluator>(
            &self,
            evaluator: &E,
            root: &G::State,
            budget: u32,
            leaf_batch: usize,
            workers: usize,
        ) -> Result<SearchStats, SearchError> {
            let search = self.search(evaluator);
            search.expand_root(root)?;
            search.run(root, budget, leaf_batch, workers, &AtomicBool::new(false), None)
        }
    }

    #[test]
    fn test_masked_priors_renormalize() {
        let game = BranchGame::new(8);
        let priors = masked_priors(&game, &[0, 2], &[0.5, 0.3, 0.2]).unwrap();
        assert_eq!(priors.len(), 2);
        assert!((priors[0].1 - 0.5 / 0.7).abs() < 1e-6);
        assert!((priors[1].1 - 0.2 / 0.7).abs() < 1e-6);
        let sum: f32 = priors.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_masked_priors_uniform_fallback() {
        let game = BranchGame::new(8);
        let priors = masked_priors(&game, &[0, 1], &[0.0, f32::NAN, 1.0]).unwrap();
        assert_eq!(priors, vec![(0, 0.5), (1, 0.5)]);
    }

    #[test]
    fn test_masked_priors_rejects_wrong_length() {
        let game = BranchGame::new(8);
        assert!(matches!(
            masked_priors(&game, &[0], &[1.0]),
            Err(EvaluatorError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_root_expansion_records_debug() {
        let fixture = Fixture::new(BranchGame::new(8));
        let evaluator = BranchEvaluator::new([0.5, 0.3, 0.2], [0.8, 0.1, -0.5]);
        let root = BranchState::ROOT;

        fixture.search(&evaluator).expand_root(&root).unwrap();

        let node = fixture.tree.get(&root).unwrap();
        let guard = node.lock();
        assert!(guard.is_expanded());
        let sum: f32 = guard.edges.values().map(|e| e.prior).sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert_eq!(guard.sum_visits, 0);

        let entry = fixture.debug.get(&root).unwrap();
        assert_eq!(entry.policy, vec![0.5, 0.3, 0.2]);
        assert_eq!(entry.value, 0.0);
    }

    #[test]
    fn test_backup_flips_sign_per_ply() {
        let fixture = Fixture::new(BranchGame::new(64));
        let evaluator = BranchEvaluator::new([0.5, 0.3, 0.2], [0.8, 0.1, -0.5]);
        let root = BranchState::ROOT;

        let stats = fixture.run(&evaluator, &root, 20, 1, 1).unwrap();
        assert_eq!(stats.completed, 20);

        // Every backup into branch b is worth values[b] to the root player
        let node = fixture.tree.get(&root).unwrap();
        let guard = node.lock();
        assert_eq!(guard.sum_visits, 20);
        for (action, expected) in [(0u8, 0.8f32), (1, 0.1), (2, -0.5)] {
            let edge = &guard.edges[&action];
            if edge.visit_count > 0 {
                assert!(
                    (edge.action_value - expected).abs() < 1e-5,
                    "action {} has Q {}",
                    action,
                    edge.action_value
                );
            }
        }
        assert!(guard.edges[&0].visit_count > guard.edges[&1].visit_count);
    }

    #[test]
    fn test_terminal_leaf_skips_evaluator() {
        // X: 0, 1; O: 3, 4. X to move, 2 wins at once
        let fixture = Fixture::new(TicTacToe::new());
        let root = State::from_board([1, 1, 0, 2, 2, 0, 0, 0, 0]);
        let evaluator = CountingEvaluator::new(UniformEvaluator::new(9));

        fixture.run(&evaluator, &root, 100, 1, 1).unwrap();

        let winning = TicTacToe::new().apply(&root, &Action::Place(2));
        for input in evaluator.inputs() {
            assert_ne!(input, TicTacToe::new().encode(&winning));
        }

        let node = fixture.tree.get(&root).unwrap();
        let guard = node.lock();
        let edge = &guard.edges[&Action::Place(2)];
        assert!(edge.visit_count > 0);
        // terminal_value(winning) = -1 for O, so the edge is worth +1 to X
        assert_eq!(
            edge.action_value,
            -TicTacToe::new().terminal_value(&winning)
        );
        assert_eq!(edge.action_value, 1.0);
    }

    #[test]
    fn test_dead_end_counts_as_loss_for_mover() {
        let fixture = Fixture::new(DeadEndGame);
        let evaluator = CountingEvaluator::new(ConstantEvaluator::new(2, 0.0));

        fixture.run(&evaluator, &0, 10, 1, 1).unwrap();

        // Only the root was evaluated
        assert_eq!(evaluator.calls(), 1);
        let node = fixture.tree.get(&0).unwrap();
        let guard = node.lock();
        assert_eq!(guard.edges[&0].action_value, 1.0);
        assert_eq!(guard.edges[&1].action_value, 0.0);
    }

    #[test]
    fn test_repetition_backs_up_draw() {
        let fixture = Fixture::new(CycleGame);
        let evaluator = ConstantEvaluator::new(1, 0.5);

        let stats = fixture.run(&evaluator, &0, 10, 1, 1).unwrap();
        assert_eq!(stats.completed, 10);

        let node = fixture.tree.get(&0).unwrap();
        let guard = node.lock();
        let edge = &guard.edges[&0];
        assert_eq!(edge.visit_count, 10);
        // First pass evaluates state 1 (-0.5 for the root), the rest repeat
        assert!((edge.total_value + 0.5).abs() < 1e-6);
        drop(guard);
        assert_eq!(fixture.tree.stats().pending_virtual_loss, 0);
    }

    #[test]
    fn test_parallel_search_resolves_all_virtual_loss() {
        let fixture = Fixture::new(TicTacToe::new());
        let evaluator = UniformEvaluator::new(9);
        let root = State::new();

        let stats = fixture.run(&evaluator, &root, 400, 8, 4).unwrap();
        assert_eq!(stats.completed, 400);
        assert_consistent(&fixture.tree);

        let node = fixture.tree.get(&root).unwrap();
        assert_eq!(node.lock().sum_visits, 400);
    }

    #[test]
    fn test_tree_independent_of_worker_count() {
        let root = State::new();
        let evaluator = MixingEvaluator::new(9);
        let mut expected: Option<(Vec<(Action, u32, f32)>, usize)> = None;

        for workers in [1, 2, 4, 8] {
            for _ in 0..3 {
                let fixture = Fixture::new(TicTacToe::new());
                let stats = fixture.run(&evaluator, &root, 200, 8, workers).unwrap();
                assert_eq!(stats.completed, 200);
                assert_eq!(stats.rounds, 25);

                let node = fixture.tree.get(&root).unwrap();
                let edges: Vec<(Action, u32, f32)> = node
                    .lock()
                    .edges
                    .iter()
                    .map(|(a, e)| (*a, e.visit_count, e.action_value))
                    .collect();
                let snapshot = (edges, fixture.tree.len());
                match &expected {
                    None => expected = Some(snapshot),
                    Some(first) => assert_eq!(first, &snapshot, "workers = {}", workers),
                }
            }
        }
    }

    #[test]
    fn test_round_evaluates_shared_leaf_once() {
        let fixture = Fixture::new(CycleGame);
        let evaluator = CountingEvaluator::new(ConstantEvaluator::new(1, 0.5));

        let stats = fixture.run(&evaluator, &0, 4, 4, 2).unwrap();
        assert_eq!(stats.rounds, 1);

        // Root, then state 1 once for all four passes
        assert_eq!(evaluator.calls(), 2);
        let node = fixture.tree.get(&0).unwrap();
        let guard = node.lock();
        assert_eq!(guard.edges[&0].visit_count, 4);
        assert!((guard.edges[&0].total_value + 2.0).abs() < 1e-6);
        drop(guard);
        assert_consistent(&fixture.tree);
    }

    #[test]
    fn test_round_leaves_reach_gateway_together() {
        let fixture = Fixture::new(TicTacToe::new());
        let gateway = BatchingEvaluator::new(
            UniformEvaluator::new(9),
            GatewayConfig::for_testing().with_max_batch_size(8),
        )
        .unwrap();

        fixture.run(&gateway, &State::new(), 64, 8, 1).unwrap();

        let stats = gateway.stats();
        assert!(stats.largest_batch > 1);
        assert!(stats.batches < stats.requests);
        assert_consistent(&fixture.tree);
    }

    #[test]
    fn test_evaluator_failure_reverts_passes() {
        let fixture = Fixture::new(TicTacToe::new());
        // Root evaluation succeeds, everything after fails
        let evaluator = FlakyEvaluator::new(UniformEvaluator::new(9), 1);
        let root = State::new();

        let err = fixture.run(&evaluator, &root, 50, 8, 4).unwrap_err();
        assert!(matches!(err, SearchError::EvaluatorUnavailable(_)));

        assert_consistent(&fixture.tree);
        let node = fixture.tree.get(&root).unwrap();
        assert_eq!(node.lock().sum_visits, 0);
    }

    #[test]
    fn test_abort_stops_dispatch() {
        let fixture = Fixture::new(TicTacToe::new());
        let evaluator = UniformEvaluator::new(9);
        let root = State::new();
        let search = fixture.search(&evaluator);
        search.expand_root(&root).unwrap();

        let abort = AtomicBool::new(true);
        let err = search.run(&root, 100, 4, 2, &abort, None).unwrap_err();
        assert!(matches!(err, SearchError::SearchAborted));
        assert_consistent(&fixture.tree);
    }

    #[test]
    fn test_expired_deadline_aborts() {
        let fixture = Fixture::new(TicTacToe::new());
        let evaluator = UniformEvaluator::new(9);
        let root = State::new();
        let search = fixture.search(&evaluator);
        search.expand_root(&root).unwrap();

        let abort = AtomicBool::new(false);
        let err = search
            .run(&root, 100, 1, 1, &abort, Some(Instant::now()))
            .unwrap_err();
        assert!(matches!(err, SearchError::SearchAborted));
    }

    #[test]
    fn test_terminal_root_has_no_moves() {
        let fixture = Fixture::new(TicTacToe::new());
        let evaluator = UniformEvaluator::new(9);
        let finished = State::from_board([1, 1, 1, 2, 2, 0, 0, 0, 0]);
        assert!(matches!(
            fixture.search(&evaluator).expand_root(&finished),
            Err(SearchError::NoLegalMoves)
        ));
    }

    #[test]
    fn test_visit_distribution() {
        let pi = visit_distribution(&[6, 3, 1], 1.0);
        assert!((pi[0] - 0.6).abs() < 1e-6);
        assert!((pi[1] - 0.3).abs() < 1e-6);
        assert!((pi[2] - 0.1).abs() < 1e-6);

        // Lower temperature sharpens
        let sharp = visit_distribution(&[6, 3, 1], 0.5);
        assert!(sharp[0] > pi[0]);

        assert_eq!(visit_distribution(&[0, 0], 1.0), vec![0.0, 0.0]);
    }

    #[test]
    fn test_sample_action() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let policy = vec![0.0, 0.5, 0.3, 0.2, 0.0];

        // Sample many times and check distribution
        let mut counts = [0u32; 5];
        for _ in 0..1000 {
            let action = sample_action(&policy, &mut rng).unwrap();
            counts[action] += 1;
        }

        // Action 0 and 4 should never be selected
        assert_eq!(counts[0], 0);
        assert_eq!(counts[4], 0);

        // Action 1 should be most common (~500), action 2 (~300), action 3 (~200)
        assert!(counts[1] > counts[2]);
        assert!(counts[2] > counts[3]);

        assert_eq!(sample_action(&[0.0, 0.0], &mut rng), None);
    }

    #[test]
    fn test_dirichlet_noise() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let noise = dirichlet_noise(5, 0.3, &mut rng);

        // Should sum to 1.0
        let sum: f32 = noise.iter().sum();
        assert!((sum - 1.0).abs() < 0.01);

        // All values should be positive
        for &n in &noise {
            assert!(n >= 0.0);
        }

        assert!(dirichlet_noise(0, 0.3, &mut rng).is_empty());
        assert_eq!(dirichlet_noise(2, -1.0, &mut rng), vec![0.5, 0.5]);
    }
}
