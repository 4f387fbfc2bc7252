//! Node Store: the shared mapping from game state to search node.
//!
//! Nodes live behind their own mutex so workers on different parts of the
//! tree never contend. The map itself is only write-locked when a node is
//! created, pruned or cleared.

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

use crate::error::SearchError;
use crate::node::VisitState;

/// Shared handle to one node.
pub type NodeRef<S, A> = Arc<Mutex<VisitState<S, A>>>;

/// Search tree keyed by game state.
///
/// Exactly one node exists per state, even when several workers touch a
/// new state at the same time.
#[derive(Debug)]
pub struct SearchTree<S, A: Ord> {
    nodes: RwLock<HashMap<S, NodeRef<S, A>>>,
}

impl<S, A: Ord> Default for SearchTree<S, A> {
    fn default() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }
}

impl<S, A> SearchTree<S, A>
where
    S: Clone + Eq + Hash + std::fmt::Debug,
    A: Copy + Ord + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the node for `state`, creating an unexpanded one on first touch.
    pub fn get_or_create(&self, state: &S) -> NodeRef<S, A> {
        if let Some(node) = self.nodes.read().get(state) {
            return Arc::clone(node);
        }
        let mut nodes = self.nodes.write();
        Arc::clone(
            nodes
                .entry(state.clone())
                .or_insert_with(|| Arc::new(Mutex::new(VisitState::new()))),
        )
    }

    pub fn get(&self, state: &S) -> Option<NodeRef<S, A>> {
        self.nodes.read().get(state).cloned()
    }

    pub fn contains(&self, state: &S) -> bool {
        self.nodes.read().contains_key(state)
    }

    /// Populate the node for `state` with one edge per legal move.
    ///
    /// Legal moves missing from `priors` get a zero prior. Returns false
    /// when the node was already expanded, in which case nothing changes.
    ///
    /// # Errors
    /// `IllegalStateReached` if a prior names a move outside `legal_moves`
    /// or a legal move is listed twice.
    pub fn expand(
        &self,
        state: &S,
        legal_moves: &[A],
        priors: &[(A, f32)],
    ) -> Result<bool, SearchError> {
        let mut table: std::collections::BTreeMap<A, f32> =
            legal_moves.iter().map(|&a| (a, 0.0)).collect();
        if table.len() != legal_moves.len() {
            return Err(SearchError::illegal(format!(
                "duplicate legal moves at {:?}",
                state
            )));
        }
        for (action, prior) in priors {
            match table.get_mut(action) {
                Some(slot) => *slot = *prior,
                None => {
                    return Err(SearchError::illegal(format!(
                        "prior for {:?} which is not legal at {:?}",
                        action, state
                    )))
                }
            }
        }

        let node = self.get_or_create(state);
        let mut guard = node.lock();
        Ok(guard.expand(table))
    }

    /// Record that `state` is a finished position worth `value` to its mover.
    pub fn set_terminal(&self, state: &S, value: f32) -> bool {
        let node = self.get_or_create(state);
        let mut guard = node.lock();
        guard.set_terminal(value)
    }

    /// Discard every node not reachable from `root`.
    ///
    /// Reachability follows the successor states cached on the edges. If
    /// `root` is not in the store the store ends up empty.
    pub fn prune_to(&self, root: &S) {
        let mut nodes = self.nodes.write();
        let mut keep: HashSet<S> = HashSet::new();
        let mut queue: VecDeque<S> = VecDeque::new();

        if nodes.contains_key(root) {
            keep.insert(root.clone());
            queue.push_back(root.clone());
        }

        while let Some(state) = queue.pop_front() {
            let Some(node) = nodes.get(&state) else {
                continue;
            };
            let guard = node.lock();
            for stats in guard.edges.values() {
                if let Some(child) = &stats.child {
                    if nodes.contains_key(child) && keep.insert(child.clone()) {
                        queue.push_back(child.clone());
                    }
                }
            }
        }

        nodes.retain(|state, _| keep.contains(state));
    }

    pub fn clear(&self) {
        self.nodes.write().clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Snapshot of the stored node handles.
    pub fn nodes(&self) -> Vec<NodeRef<S, A>> {
        self.nodes.read().values().cloned().collect()
    }

    /// Get statistics about the tree.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        for node in self.nodes() {
            let guard = node.lock();
            stats.total_nodes += 1;
            if guard.is_expanded() {
                stats.expanded_nodes += 1;
            }
            stats.total_edges += guard.edges.len();
            stats.pending_virtual_loss += guard.pending_virtual_loss();
        }
        stats
    }
}

/// Statistics about the search tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub expanded_nodes: usize,
    pub total_edges: usize,
    /// In-flight simulations; 0 whenever no search is running
    pub pending_virtual_loss: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    type Tree = SearchTree<u32, u8>;

    fn link(tree: &Tree, parent: u32, action: u8, child: u32) {
        let node = tree.get_or_create(&parent);
        node.lock().set_child(&action, child);
        tree.get_or_create(&child);
    }

    #[test]
    fn test_new_tree() {
        let tree = Tree::new();
        assert!(tree.is_empty());
        assert!(tree.get(&0).is_none());
        assert_eq!(tree.stats(), TreeStats::default());
    }

    #[test]
    fn test_get_or_create_returns_same_node() {
        let tree = Tree::new();
        let a = tree.get_or_create(&1);
        let b = tree.get_or_create(&1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_concurrent_first_touch_creates_one_node() {
        let tree = Tree::new();
        let handles: Vec<NodeRef<u32, u8>> = thread::scope(|s| {
            let workers: Vec<_> = (0..8).map(|_| s.spawn(|| tree.get_or_create(&42))).collect();
            workers.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(tree.len(), 1);
        for handle in &handles {
            assert!(Arc::ptr_eq(handle, &handles[0]));
        }
    }

    #[test]
    fn test_expand_masks_and_validates() {
        let tree = Tree::new();
        assert!(tree.expand(&0, &[1, 2, 3], &[(1, 0.7), (3, 0.3)]).unwrap());

        let node = tree.get(&0).unwrap();
        let guard = node.lock();
        assert_eq!(guard.edges.len(), 3);
        assert_eq!(guard.edges[&2].prior, 0.0);
        assert!((guard.edges[&1].prior - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_expand_is_noop_when_expanded() {
        let tree = Tree::new();
        assert!(tree.expand(&0, &[1, 2], &[(1, 0.5), (2, 0.5)]).unwrap());
        assert!(!tree.expand(&0, &[4], &[(4, 1.0)]).unwrap());

        let node = tree.get(&0).unwrap();
        let keys: Vec<u8> = node.lock().edges.keys().copied().collect();
        assert_eq!(keys, vec![1, 2]);
    }

    #[test]
    fn test_expand_rejects_illegal_prior() {
        let tree = Tree::new();
        let err = tree.expand(&0, &[1, 2], &[(9, 1.0)]).unwrap_err();
        assert!(matches!(err, SearchError::IllegalStateReached { .. }));
        // Rejected before the node was touched
        assert!(tree.get(&0).is_none());
    }

    #[test]
    fn test_expand_rejects_duplicate_moves() {
        let tree = Tree::new();
        let err = tree.expand(&0, &[1, 1], &[]).unwrap_err();
        assert!(matches!(err, SearchError::IllegalStateReached { .. }));
    }

    #[test]
    fn test_prune_to_drops_siblings() {
        // 0 -> {1, 2}; 1 -> {3}; 2 -> {4}
        let tree = Tree::new();
        tree.expand(&0, &[0, 1], &[(0, 0.5), (1, 0.5)]).unwrap();
        tree.expand(&1, &[0], &[(0, 1.0)]).unwrap();
        tree.expand(&2, &[0], &[(0, 1.0)]).unwrap();
        link(&tree, 0, 0, 1);
        link(&tree, 0, 1, 2);
        link(&tree, 1, 0, 3);
        link(&tree, 2, 0, 4);
        assert_eq!(tree.len(), 5);

        tree.prune_to(&1);

        assert_eq!(tree.len(), 2);
        assert!(tree.contains(&1));
        assert!(tree.contains(&3));
        for gone in [0, 2, 4] {
            assert!(tree.get(&gone).is_none(), "state {} should be pruned", gone);
        }
    }

    #[test]
    fn test_prune_keeps_shared_descendants() {
        // Transposition: 1 and 2 both lead to 5
        let tree = Tree::new();
        tree.expand(&0, &[0, 1], &[(0, 0.5), (1, 0.5)]).unwrap();
        tree.expand(&1, &[0], &[(0, 1.0)]).unwrap();
        tree.expand(&2, &[0], &[(0, 1.0)]).unwrap();
        link(&tree, 0, 0, 1);
        link(&tree, 0, 1, 2);
        link(&tree, 1, 0, 5);
        link(&tree, 2, 0, 5);

        tree.prune_to(&2);
        assert!(tree.contains(&2));
        assert!(tree.contains(&5));
        assert!(!tree.contains(&1));
    }

    #[test]
    fn test_prune_to_unknown_state_empties_store() {
        let tree = Tree::new();
        tree.get_or_create(&0);
        tree.get_or_create(&1);
        tree.prune_to(&99);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_set_terminal() {
        let tree = Tree::new();
        assert!(tree.set_terminal(&7, -1.0));
        assert!(!tree.set_terminal(&7, 1.0));
        let node = tree.get(&7).unwrap();
        assert_eq!(
            node.lock().status(),
            crate::node::NodeStatus::Terminal(-1.0)
        );
    }

    #[test]
    fn test_tree_stats() {
        let tree = Tree::new();
        tree.expand(&0, &[0, 1], &[(0, 0.5), (1, 0.5)]).unwrap();
        tree.get_or_create(&1);
        let node = tree.get(&0).unwrap();
        node.lock().apply_virtual_loss(&0, 1.0);

        let stats = tree.stats();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.expanded_nodes, 1);
        assert_eq!(stats.total_edges, 2);
        assert_eq!(stats.pending_virtual_loss, 1);

        tree.clear();
        assert!(tree.is_empty());
    }
}
