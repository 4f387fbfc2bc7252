//! Per-search record of raw evaluator outputs.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;

/// What the evaluator said about one state.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugEntry {
    /// Raw policy vector, indexed by action index
    pub policy: Vec<f32>,
    /// Value for the side to move
    pub value: f32,
}

/// Evaluator outputs keyed by state, owned by one player.
///
/// A later evaluation of the same state overwrites the earlier entry.
#[derive(Debug)]
pub struct DebugRecord<S> {
    entries: Mutex<HashMap<S, DebugEntry>>,
}

impl<S> Default for DebugRecord<S> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<S: Clone + Eq + Hash> DebugRecord<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, state: &S, policy: Vec<f32>, value: f32) {
        self.entries
            .lock()
            .insert(state.clone(), DebugEntry { policy, value });
    }

    pub fn get(&self, state: &S) -> Option<DebugEntry> {
        self.entries.lock().get(state).cloned()
    }

    /// Keep only the entries whose state passes `keep`.
    pub fn retain(&self, mut keep: impl FnMut(&S) -> bool) {
        self.entries.lock().retain(|state, _| keep(state));
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
