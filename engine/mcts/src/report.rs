//! Human-readable summary of the last search at the root.

use std::fmt;

use crate::node::VisitState;

/// Root edge statistics for one candidate move.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionReport<A> {
    pub action: A,
    pub visit_count: u32,
    pub action_value: f32,
    pub prior: f32,
}

/// Snapshot of the root after a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport<A> {
    /// Candidate moves, most visited first
    pub actions: Vec<ActionReport<A>>,
    /// Evaluator value for the root, side-to-move perspective
    pub root_value: Option<f32>,
    /// Completed visits below the root
    pub simulations: u32,
}

impl<A: Copy + Ord> SearchReport<A> {
    /// Build a report from a root node. Ties in visits keep edge order.
    pub fn from_root<S>(root: &VisitState<S, A>, root_value: Option<f32>) -> Self {
        let mut actions: Vec<ActionReport<A>> = root
            .edges
            .iter()
            .map(|(action, edge)| ActionReport {
                action: *action,
                visit_count: edge.visit_count,
                action_value: edge.action_value,
                prior: edge.prior,
            })
            .collect();
        actions.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
        Self {
            actions,
            root_value,
            simulations: root.sum_visits,
        }
    }

    pub fn get(&self, action: &A) -> Option<&ActionReport<A>> {
        self.actions.iter().find(|r| r.action == *action)
    }

    /// Most visited move.
    pub fn best(&self) -> Option<&ActionReport<A>> {
        self.actions.first()
    }
}

impl<A: fmt::Debug> fmt::Display for SearchReport<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root_value {
            Some(v) => writeln!(f, "Root evaluation: {:+.3}", v)?,
            None => writeln!(f, "Root evaluation: n/a")?,
        }
        writeln!(f, "Simulations: {}", self.simulations)?;
        writeln!(f, "{:>12} {:>8} {:>8} {:>8}", "move", "visits", "Q", "prior")?;
        for r in &self.actions {
            writeln!(
                f,
                "{:>12} {:>8} {:>+8.3} {:>8.3}",
                format!("{:?}", r.action),
                r.visit_count,
                r.action_value,
                r.prior
            )?;
        }
        Ok(())
    }
}
