//! Per-state search statistics.
//!
//! A [`VisitState`] holds one [`ActionStats`] edge per legal move of its
//! state. Nodes are shared between simulation workers behind a mutex owned
//! by the [`SearchTree`](crate::SearchTree); every method here runs with
//! that lock held, so a worker's selection and virtual loss are one atomic
//! step.

use std::collections::BTreeMap;

/// Statistics for one action out of a state.
///
/// `action_value == total_value / visit_count` whenever `visit_count > 0`.
/// `total_value` includes the virtual loss of simulations still in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionStats<S> {
    /// Completed and in-flight visits through this edge
    pub visit_count: u32,

    /// Sum of backed-up values, from the perspective of the node's mover
    pub total_value: f32,

    /// Q(s,a) = total_value / visit_count
    pub action_value: f32,

    /// Prior probability from the evaluator policy, fixed at expansion
    pub prior: f32,

    /// Simulations currently in flight through this edge
    pub virtual_loss: u32,

    /// Cached successor state, filled on first descent
    pub child: Option<S>,
}

impl<S> ActionStats<S> {
    pub fn new(prior: f32) -> Self {
        Self {
            visit_count: 0,
            total_value: 0.0,
            action_value: 0.0,
            prior,
            virtual_loss: 0,
            child: None,
        }
    }

    #[inline]
    fn refresh_q(&mut self) {
        self.action_value = if self.visit_count == 0 {
            0.0
        } else {
            self.total_value / self.visit_count as f32
        };
    }
}

/// PUCT score: Q + c_puct * P * sqrt(sum_b N(s,b)) / (1 + N(s,a))
///
/// Takes pre-computed sqrt(sum of visits) to avoid redundant sqrt calls
/// when comparing edges.
#[inline]
pub fn puct_score(q: f32, prior: f32, visits: u32, sum_visits_sqrt: f32, c_puct: f32) -> f32 {
    q + c_puct * prior * sum_visits_sqrt / (1.0 + visits as f32)
}

/// Dirichlet noise mixed into root priors during selection.
///
/// `weights` is aligned with the root's edges in action order.
#[derive(Debug, Clone)]
pub struct RootNoise {
    pub weights: Vec<f32>,
    pub epsilon: f32,
}

impl RootNoise {
    #[inline]
    fn mix(&self, index: usize, prior: f32) -> f32 {
        match self.weights.get(index) {
            Some(&noise) => (1.0 - self.epsilon) * prior + self.epsilon * noise,
            None => prior,
        }
    }
}

/// Lifecycle of a node as seen by a simulation reaching it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeStatus {
    /// Freshly created; needs an evaluator call
    Unexpanded,
    /// Edges populated; selection continues below
    Expanded,
    /// Game over (or no moves); value from the mover's perspective
    Terminal(f32),
}

/// Search tree node: the statistics of every legal action from one state.
#[derive(Debug, Clone)]
pub struct VisitState<S, A: Ord> {
    /// One edge per legal action, in the fixed action order
    pub edges: BTreeMap<A, ActionStats<S>>,

    /// sum_b N(s,b), kept alongside the edges
    pub sum_visits: u32,

    expanded: bool,
    terminal_value: Option<f32>,
}

impl<S, A: Ord> Default for VisitState<S, A> {
    fn default() -> Self {
        Self {
            edges: BTreeMap::new(),
            sum_visits: 0,
            expanded: false,
            terminal_value: None,
        }
    }
}

impl<S: Clone, A: Ord + Copy> VisitState<S, A> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn status(&self) -> NodeStatus {
        match self.terminal_value {
            Some(value) => NodeStatus::Terminal(value),
            None if self.expanded => NodeStatus::Expanded,
            None => NodeStatus::Unexpanded,
        }
    }

    /// Populate the edges. No-op (returns false) if already expanded.
    pub(crate) fn expand(&mut self, priors: impl IntoIterator<Item = (A, f32)>) -> bool {
        if self.expanded {
            return false;
        }
        self.edges = priors
            .into_iter()
            .map(|(action, prior)| (action, ActionStats::new(prior)))
            .collect();
        self.expanded = true;
        true
    }

    /// Mark as a finished position. No-op (returns false) if already expanded.
    pub(crate) fn set_terminal(&mut self, value: f32) -> bool {
        if self.expanded {
            return false;
        }
        self.terminal_value = Some(value);
        self.expanded = true;
        true
    }

    /// Pick the action with the highest PUCT score.
    ///
    /// Ties go to the higher prior, then to the smaller action.
    pub fn select(&self, c_puct: f32, noise: Option<&RootNoise>) -> Option<A> {
        let sum_visits_sqrt = (self.sum_visits as f32).sqrt();
        let mut best: Option<(A, f32, f32)> = None;

        for (index, (action, stats)) in self.edges.iter().enumerate() {
            let prior = match noise {
                Some(noise) => noise.mix(index, stats.prior),
                None => stats.prior,
            };
            let score = puct_score(
                stats.action_value,
                prior,
                stats.visit_count,
                sum_visits_sqrt,
                c_puct,
            );
            let better = match best {
                None => true,
                Some((_, best_score, best_prior)) => {
                    score > best_score || (score == best_score && prior > best_prior)
                }
            };
            if better {
                best = Some((*action, score, prior));
            }
        }

        best.map(|(action, _, _)| action)
    }

    /// Count an in-flight visit through `action` and charge its virtual loss.
    pub(crate) fn apply_virtual_loss(&mut self, action: &A, loss: f32) -> bool {
        let Some(stats) = self.edges.get_mut(action) else {
            return false;
        };
        stats.visit_count += 1;
        stats.virtual_loss += 1;
        stats.total_value -= loss;
        stats.refresh_q();
        self.sum_visits += 1;
        true
    }

    /// Resolve an in-flight visit: refund the virtual loss and add `value`.
    /// The visit itself stays counted.
    pub(crate) fn backup(&mut self, action: &A, loss: f32, value: f32) {
        if let Some(stats) = self.edges.get_mut(action) {
            debug_assert!(stats.virtual_loss > 0, "backup without virtual loss");
            stats.virtual_loss = stats.virtual_loss.saturating_sub(1);
            stats.total_value += loss + value;
            stats.refresh_q();
        }
    }

    /// Undo an in-flight visit entirely, as if it never happened.
    pub(crate) fn revert(&mut self, action: &A, loss: f32) {
        if let Some(stats) = self.edges.get_mut(action) {
            stats.visit_count = stats.visit_count.saturating_sub(1);
            stats.virtual_loss = stats.virtual_loss.saturating_sub(1);
            stats.total_value += loss;
            if stats.visit_count == 0 {
                stats.total_value = 0.0;
            }
            stats.refresh_q();
            self.sum_visits = self.sum_visits.saturating_sub(1);
        }
    }

    /// Record the successor reached by `action`, keeping the first one.
    pub(crate) fn set_child(&mut self, action: &A, child: S) {
        if let Some(stats) = self.edges.get_mut(action) {
            stats.child.get_or_insert(child);
        }
    }

    pub fn child(&self, action: &A) -> Option<&S> {
        self.edges.get(action).and_then(|stats| stats.child.as_ref())
    }

    /// Visit-weighted mean of the action values, or None before any visit.
    pub fn visit_weighted_value(&self) -> Option<f32> {
        if self.sum_visits == 0 {
            return None;
        }
        let total: f32 = self
            .edges
            .values()
            .map(|s| s.action_value * s.visit_count as f32)
            .sum();
        Some(total / self.sum_visits as f32)
    }

    /// Total in-flight simulations through this node's edges.
    pub fn pending_virtual_loss(&self) -> u32 {
        self.edges.values().map(|s| s.virtual_loss).sum()
    }
}
