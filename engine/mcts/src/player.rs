//! Search orchestrator: runs a search from a position and turns the root
//! statistics into a move.
//!
//! A player is created per game. Each [`MctsPlayer::choose_move`] call walks
//! `Idle -> Running -> Done`; a failed call drops back to `Idle` with the
//! tree and debug record cleared, so no partial statistics are ever read.
//! The phase and the abort request live behind a [`SearchHandle`] that other
//! threads can hold.

use engine_core::Game;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::MctsConfig;
use crate::debug::{DebugEntry, DebugRecord};
use crate::error::SearchError;
use crate::evaluator::{Evaluator, EvaluatorError};
use crate::node::{ActionStats, RootNoise};
use crate::report::SearchReport;
use crate::search::{dirichlet_noise, sample_action, visit_distribution, Search, SearchStats};
use crate::tree::SearchTree;

/// Outcome of one move decision.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveDecision<A> {
    /// The move to play, or None when the player resigns
    pub action: Option<A>,

    /// Move-selection distribution, indexed by `Game::action_index`
    pub policy: Vec<f32>,

    /// Root value estimate for the side to move
    pub value: f32,

    /// Visits at the root when the move was chosen
    pub simulations: u32,
}

impl<A> MoveDecision<A> {
    pub fn is_resignation(&self) -> bool {
        self.action.is_none()
    }
}

/// Where the player is in its decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SearchPhase {
    Idle = 0,
    Running = 1,
    Done = 2,
}

impl SearchPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SearchPhase::Running,
            2 => SearchPhase::Done,
            _ => SearchPhase::Idle,
        }
    }
}

#[derive(Debug, Default)]
struct SearchControl {
    abort: AtomicBool,
    phase: AtomicU8,
}

/// Shared view of a player's search for other threads.
///
/// Reads the phase while `choose_move` runs and can stop the search.
#[derive(Debug, Clone)]
pub struct SearchHandle {
    control: Arc<SearchControl>,
}

impl SearchHandle {
    /// Stop the search at the next round. The pending decision fails with
    /// `SearchAborted` and the request is cleared.
    pub fn abort(&self) {
        self.control.abort.store(true, Ordering::SeqCst);
    }

    pub fn abort_requested(&self) -> bool {
        self.control.abort.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> SearchPhase {
        SearchPhase::from_u8(self.control.phase.load(Ordering::SeqCst))
    }
}

/// MCTS player for one game.
pub struct MctsPlayer<G: Game, E: Evaluator> {
    game: G,
    evaluator: E,
    config: MctsConfig,
    tree: SearchTree<G::State, G::Action>,
    debug: DebugRecord<G::State>,
    rng: ChaCha20Rng,
    control: Arc<SearchControl>,
    last_root: Option<G::State>,
    last_stats: Option<SearchStats>,
    resign_streak: u32,
    closed: bool,
}

impl<G: Game, E: Evaluator> MctsPlayer<G, E> {
    pub fn new(game: G, evaluator: E, config: MctsConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        Self {
            game,
            evaluator,
            config,
            tree: SearchTree::new(),
            debug: DebugRecord::new(),
            rng,
            control: Arc::new(SearchControl::default()),
            last_root: None,
            last_stats: None,
            resign_streak: 0,
            closed: false,
        }
    }

    /// Search from `state` and pick a move for the side to move.
    ///
    /// `ply` is the number of moves already played in the game; it drives
    /// the temperature schedule and the minimum resignation ply.
    pub fn choose_move(
        &mut self,
        state: &G::State,
        ply: u32,
    ) -> Result<MoveDecision<G::Action>, SearchError> {
        self.choose_move_excluding(state, ply, &[])
    }

    /// Like [`choose_move`](Self::choose_move), but never returns a move in
    /// `excluded` and gives those moves zero probability.
    ///
    /// If every legal move is excluded the exclusion is ignored.
    pub fn choose_move_excluding(
        &mut self,
        state: &G::State,
        ply: u32,
        excluded: &[G::Action],
    ) -> Result<MoveDecision<G::Action>, SearchError> {
        if self.closed {
            return Err(EvaluatorError::Closed.into());
        }

        self.set_phase(SearchPhase::Running);
        let outcome = self.search_and_decide(state, ply, excluded);
        self.control.abort.store(false, Ordering::SeqCst);

        match outcome {
            Ok(decision) => {
                self.set_phase(SearchPhase::Done);
                Ok(decision)
            }
            Err(e) => {
                self.tree.clear();
                self.debug.clear();
                self.last_root = None;
                self.last_stats = None;
                self.set_phase(SearchPhase::Idle);
                warn!(error = %e, ply, "Move decision failed");
                Err(e)
            }
        }
    }

    fn search_and_decide(
        &mut self,
        state: &G::State,
        ply: u32,
        excluded: &[G::Action],
    ) -> Result<MoveDecision<G::Action>, SearchError> {
        self.last_root = None;
        self.last_stats = None;
        self.prepare_tree(state);

        let mut search = Search {
            game: &self.game,
            evaluator: &self.evaluator,
            tree: &self.tree,
            debug: &self.debug,
            c_puct: self.config.c_puct,
            virtual_loss: self.config.virtual_loss,
            root_noise: None,
        };
        search.expand_root(state)?;

        let root = self
            .tree
            .get(state)
            .ok_or_else(|| SearchError::illegal("root missing after expansion"))?;
        let (num_edges, credited) = {
            let guard = root.lock();
            (guard.edges.len(), guard.sum_visits)
        };

        if self.config.dirichlet_alpha > 0.0 && self.config.dirichlet_epsilon > 0.0 {
            search.root_noise = Some(RootNoise {
                weights: dirichlet_noise(num_edges, self.config.dirichlet_alpha, &mut self.rng),
                epsilon: self.config.dirichlet_epsilon,
            });
        }

        let budget = self.config.num_simulations.saturating_sub(credited);
        let deadline = self.config.max_search_time.map(|t| Instant::now() + t);
        let stats = search.run(
            state,
            budget,
            self.config.leaf_batch_size,
            self.config.num_workers,
            &self.control.abort,
            deadline,
        )?;

        let legal = self.game.legal_moves(state);
        let guard = root.lock();
        let mut candidates: Vec<(&G::Action, &ActionStats<G::State>)> = guard
            .edges
            .iter()
            .filter(|(action, _)| !excluded.contains(action))
            .collect();
        if candidates.is_empty() {
            warn!(
                excluded = excluded.len(),
                "Every legal move is excluded, ignoring exclusions"
            );
            candidates = guard.edges.iter().collect();
        }

        let tau = self.config.temperature_at(ply);
        let (index, weights) = if tau == 0.0 {
            let best = greedy_index(&candidates);
            let mut weights = vec![0.0; candidates.len()];
            weights[best] = 1.0;
            (best, weights)
        } else {
            let visits: Vec<u32> = candidates.iter().map(|(_, s)| s.visit_count).collect();
            let mut weights = visit_distribution(&visits, tau);
            if weights.iter().all(|&w| w == 0.0) {
                weights = prior_distribution(&candidates);
            }
            let index = sample_action(&weights, &mut self.rng)
                .ok_or_else(|| SearchError::illegal("empty move distribution"))?;
            (index, weights)
        };

        let action = *candidates[index].0;
        if !legal.contains(&action) {
            return Err(SearchError::illegal(format!(
                "chosen move {:?} is not legal",
                action
            )));
        }

        let mut policy = vec![0.0; self.game.num_actions()];
        for ((candidate, _), weight) in candidates.iter().zip(&weights) {
            if let Some(slot) = policy.get_mut(self.game.action_index(candidate)) {
                *slot += weight;
            }
        }

        let value = self
            .debug
            .get(state)
            .map(|entry| entry.value)
            .or_else(|| guard.visit_weighted_value())
            .unwrap_or(0.0);
        let simulations = guard.sum_visits;
        drop(guard);

        let resign = self.update_resign_streak(value, ply);
        if resign {
            info!(
                value,
                ply,
                streak = self.resign_streak,
                "Resigning"
            );
        }

        debug!(
            action = ?action,
            value,
            simulations,
            completed = stats.completed,
            max_depth = stats.max_depth,
            rounds = stats.rounds,
            tree_size = self.tree.len(),
            "Move chosen"
        );

        self.last_root = Some(state.clone());
        self.last_stats = Some(stats);

        Ok(MoveDecision {
            action: (!resign).then_some(action),
            policy,
            value,
            simulations,
        })
    }

    fn prepare_tree(&mut self, state: &G::State) {
        if self.config.reuse_tree && self.tree.contains(state) {
            self.tree.prune_to(state);
            let tree = &self.tree;
            self.debug.retain(|s| tree.contains(s));
            debug!(nodes = tree.len(), "Reusing search tree");
        } else {
            self.tree.clear();
            self.debug.clear();
        }
    }

    /// Count this decision toward resignation. Returns true once the
    /// streak is long enough.
    fn update_resign_streak(&mut self, value: f32, ply: u32) -> bool {
        let resign = &self.config.resign;
        if !resign.enabled || ply < resign.min_ply {
            self.resign_streak = 0;
            return false;
        }
        if value < resign.threshold {
            self.resign_streak += 1;
        } else {
            self.resign_streak = 0;
        }
        self.resign_streak >= resign.consecutive_plies.max(1)
    }

    /// Root edge statistics from the last successful decision.
    pub fn search_report(&self) -> Option<SearchReport<G::Action>> {
        let root = self.last_root.as_ref()?;
        let node = self.tree.get(root)?;
        let root_value = self.debug.get(root).map(|entry| entry.value);
        let guard = node.lock();
        Some(SearchReport::from_root(&guard, root_value))
    }

    /// Evaluator output recorded for the last root.
    pub fn root_debug(&self) -> Option<DebugEntry> {
        self.last_root.as_ref().and_then(|root| self.debug.get(root))
    }

    /// Handle for watching or stopping searches from another thread.
    pub fn handle(&self) -> SearchHandle {
        SearchHandle {
            control: Arc::clone(&self.control),
        }
    }

    fn set_phase(&self, phase: SearchPhase) {
        self.control.phase.store(phase as u8, Ordering::SeqCst);
    }

    /// Forget everything from the previous game.
    pub fn reset(&mut self) {
        self.tree.clear();
        self.debug.clear();
        self.last_root = None;
        self.last_stats = None;
        self.resign_streak = 0;
        self.set_phase(SearchPhase::Idle);
    }

    /// Release the evaluator. Later decisions fail with `Closed`.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.evaluator.close();
        self.tree.clear();
        self.debug.clear();
        self.last_root = None;
        self.set_phase(SearchPhase::Idle);
        info!("Search player closed");
    }

    pub fn phase(&self) -> SearchPhase {
        SearchPhase::from_u8(self.control.phase.load(Ordering::SeqCst))
    }

    pub fn last_stats(&self) -> Option<SearchStats> {
        self.last_stats
    }

    pub fn resign_streak(&self) -> u32 {
        self.resign_streak
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn tree(&self) -> &SearchTree<G::State, G::Action> {
        &self.tree
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<G: Game, E: Evaluator> Drop for MctsPlayer<G, E> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Most visited candidate; ties go to the higher prior, then the first.
fn greedy_index<A, S>(candidates: &[(&A, &ActionStats<S>)]) -> usize {
    let mut best = 0;
    for (i, (_, stats)) in candidates.iter().enumerate().skip(1) {
        let current = candidates[best].1;
        if stats.visit_count > current.visit_count
            || (stats.visit_count == current.visit_count && stats.prior > current.prior)
        {
            best = i;
        }
    }
    best
}

/// Priors renormalized over the candidates, uniform if they are all zero.
fn prior_distribution<A, S>(candidates: &[(&A, &ActionStats<S>)]) -> Vec<f32> {
    let total: f32 = candidates.iter().map(|(_, s)| s.prior).sum();
    if total > 0.0 {
        candidates.iter().map(|(_, s)| s.prior / total).collect()
    } else {
        vec![1.0 / candidates.len() as f32; candidates.len()]
    }
}
