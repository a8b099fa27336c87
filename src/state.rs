//! Reference-counted graph versions with path-reversal materialisation.
//!
//! Every search node is a [`GraphState`]: either the single concrete `Base` graph of
//! its version tree, or a `Delta` that reaches a neighbouring version by applying a
//! [`ChangeSet`]. Locking a state walks its `Delta` chain to the base and rotates
//! every changeset on the way, so the locked state becomes the new base and every
//! other version stays reachable through inverse changesets. No matrix is copied.
//!
//! Handles are `Rc`-shared: job queues, the best slot and child states each own one
//! strong reference, and a version is freed when its last holder drops it.

use crate::changeset::{Accounting, ChangeKind, ChangeSet};
use crate::graph::{Cost, Graph};
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

#[derive(Debug)]
enum Version {
    Base(Graph),
    Delta { target: GraphState, changeset: ChangeSet },
}

impl Default for Version {
    fn default() -> Self {
        Version::Base(Graph::default())
    }
}

impl Version {
    /// Takes the outgoing reference, leaving an empty base behind.
    fn detach(&mut self) -> Option<GraphState> {
        match std::mem::take(self) {
            Version::Delta { target, .. } => Some(target),
            Version::Base(_) => None,
        }
    }
}

#[derive(Debug)]
struct StateNode {
    cost: Cell<Option<Cost>>,
    cost_left: Cell<Option<Cost>>,
    version: RefCell<Version>,
}

impl Drop for StateNode {
    // Unwinds long Delta chains iteratively instead of through nested drops.
    fn drop(&mut self) {
        let mut pending = self.version.get_mut().detach();
        while let Some(state) = pending {
            pending = match Rc::try_unwrap(state.0) {
                Ok(mut node) => node.version.get_mut().detach(),
                Err(_) => None,
            };
        }
    }
}

/// Shared handle to one version of the search graph.
#[derive(Clone)]
pub struct GraphState(Rc<StateNode>);

impl fmt::Debug for GraphState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphState")
            .field("cost", &self.cost())
            .field("cost_left", &self.cost_left())
            .field("base", &self.is_base())
            .field("references", &self.references())
            .finish()
    }
}

impl GraphState {
    /// Wraps an input graph as the root version with cost `0` and the given budget.
    pub fn base(graph: Graph, budget: Cost) -> Self {
        GraphState(Rc::new(StateNode {
            cost: Cell::new(Some(0)),
            cost_left: Cell::new(Some(budget)),
            version: RefCell::new(Version::Base(graph)),
        }))
    }

    /// Creates a child version reached by applying `changeset` to `self`.
    ///
    /// Cost and remaining budget stay unset until the child is first locked.
    #[must_use]
    pub fn derive(&self, changeset: ChangeSet) -> Self {
        GraphState(Rc::new(StateNode {
            cost: Cell::new(None),
            cost_left: Cell::new(None),
            version: RefCell::new(Version::Delta {
                target: self.clone(),
                changeset,
            }),
        }))
    }

    /// Accumulated search cost, once computed by a lock.
    pub fn cost(&self) -> Option<Cost> {
        self.0.cost.get()
    }

    /// Remaining budget, once computed by a lock. Negative means pruned.
    pub fn cost_left(&self) -> Option<Cost> {
        self.0.cost_left.get()
    }

    /// Cost if known, else the cost of the version it was derived from.
    pub fn estimated_cost(&self) -> Cost {
        if let Some(cost) = self.cost() {
            return cost;
        }
        match &*self.0.version.borrow() {
            Version::Delta { target, .. } => target.cost().unwrap_or(0),
            Version::Base(_) => 0,
        }
    }

    /// Raises the remaining budget by `step` (iterative deepening).
    pub fn add_budget(&self, step: Cost) {
        let left = self.0.cost_left.get().unwrap_or(0);
        self.0.cost_left.set(Some(left + step));
    }

    /// Number of strong holders of this version.
    pub fn references(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// `true` if this version currently holds the concrete graph.
    pub fn is_base(&self) -> bool {
        matches!(&*self.0.version.borrow(), Version::Base(_))
    }

    /// Weak handle that upgrades while any strong holder remains.
    pub fn downgrade(&self) -> WeakGraphState {
        WeakGraphState(Rc::downgrade(&self.0))
    }

    /// `true` if both handles refer to the same version.
    pub fn ptr_eq(&self, other: &GraphState) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Materialises this version and returns a guard giving read access to its graph.
    ///
    /// Costs are computed on the first lock and cached. Locking again while nothing
    /// else was locked is a no-op.
    ///
    /// # Panics
    /// Panics if another guard in the same version tree is still alive.
    pub fn lock(&self, accounting: Accounting) -> StateGuard<'_> {
        self.materialize(accounting);
        let graph = Ref::map(self.0.version.borrow(), |version| match version {
            Version::Base(graph) => graph,
            Version::Delta { .. } => unreachable!("materialised state is not a base"),
        });
        debug_assert!(self.cost().is_some() && self.cost_left().is_some());
        StateGuard {
            cost: self.cost().unwrap_or(0),
            cost_left: self.cost_left().unwrap_or(-1),
            graph,
        }
    }

    fn materialize(&self, accounting: Accounting) {
        let mut chain = vec![self.clone()];
        loop {
            let next = match &*chain[chain.len() - 1].0.version.borrow() {
                Version::Base(_) => None,
                Version::Delta { target, .. } => Some(target.clone()),
            };
            match next {
                Some(target) => chain.push(target),
                None => break,
            }
        }
        for pair in chain.windows(2).rev() {
            pair[0].rotate_from(&pair[1], accounting);
        }
    }

    /// Moves the base from `parent` into `self`, leaving `parent` as the inverse delta.
    fn rotate_from(&self, parent: &GraphState, accounting: Accounting) {
        let Version::Delta {
            target,
            mut changeset,
        } = self.0.version.take()
        else {
            unreachable!("rotation source is not a delta");
        };
        debug_assert!(target.ptr_eq(parent));
        let Version::Base(mut graph) = parent.0.version.take() else {
            unreachable!("rotation target is not a base");
        };

        let delta = changeset.apply(&mut graph, accounting);
        if self.cost().is_none() {
            let parent_cost = parent.cost().unwrap_or(0);
            let parent_left = parent.cost_left().unwrap_or(-1);
            self.0.cost.set(Some(parent_cost + delta));
            self.0.cost_left.set(Some(parent_left - delta));
        }

        self.0.version.replace(Version::Base(graph));
        parent.0.version.replace(Version::Delta {
            target: self.clone(),
            changeset,
        });
        drop(target);
    }

    /// Propagates clique ids along merges recorded between `self` and the base.
    ///
    /// Walks from `self` towards the current base and replays every inverse merge
    /// from the base outwards, so nodes absorbed into already-absorbed nodes resolve
    /// transitively. Only reads the chain; `ids[n1]` must be set for every merge.
    pub fn trace_merges(&self, ids: &mut [usize]) {
        let mut splits = Vec::new();
        let mut cursor = self.clone();
        loop {
            let next = match &*cursor.0.version.borrow() {
                Version::Base(_) => None,
                Version::Delta { target, changeset } => {
                    if changeset.kind() == ChangeKind::Split {
                        splits.push(changeset.nodes());
                    }
                    Some(target.clone())
                }
            };
            match next {
                Some(target) => cursor = target,
                None => break,
            }
        }
        for (n1, n2) in splits.into_iter().rev() {
            ids[n2] = ids[n1];
        }
    }
}

/// Non-owning handle to a [`GraphState`].
#[derive(Clone, Debug)]
pub struct WeakGraphState(Weak<StateNode>);

impl WeakGraphState {
    /// Returns a strong handle if the version is still alive.
    pub fn upgrade(&self) -> Option<GraphState> {
        self.0.upgrade().map(GraphState)
    }
}

/// Read access to a locked version. Dropping the guard unlocks.
pub struct StateGuard<'a> {
    cost: Cost,
    cost_left: Cost,
    graph: Ref<'a, Graph>,
}

impl StateGuard<'_> {
    /// The materialised graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Accumulated search cost of the locked version.
    pub fn cost(&self) -> Cost {
        self.cost
    }

    /// Remaining budget of the locked version.
    pub fn cost_left(&self) -> Cost {
        self.cost_left
    }
}

impl Deref for StateGuard<'_> {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    const ACC: Accounting = Accounting::EXACT;

    fn path_graph() -> Graph {
        let mut g = Graph::new(4);
        g.set_value(0, 1, 2);
        g.set_value(1, 2, 2);
        g.set_value(2, 3, 1);
        g
    }

    fn replay(base: &Graph, changes: &[ChangeSet]) -> (Graph, Cost) {
        let mut g = base.clone();
        let mut cost = 0;
        for cs in changes {
            cost += cs.clone().apply(&mut g, ACC);
        }
        (g, cost)
    }

    #[test]
    fn base_lock_exposes_input() {
        let root = GraphState::base(path_graph(), 5);
        let guard = root.lock(ACC);
        assert_eq!(*guard.graph(), path_graph());
        assert_eq!(guard.cost(), 0);
        assert_eq!(guard.cost_left(), 5);
    }

    #[test]
    fn child_lock_rotates_base() {
        let root = GraphState::base(path_graph(), 5);
        let child = root.derive(ChangeSet::merge(1, 2));
        assert_eq!(child.cost(), None);
        {
            let guard = child.lock(ACC);
            assert_eq!(guard.live_count(), 3);
            assert_eq!(guard.cost(), 2);
            assert_eq!(guard.cost_left(), 3);
        }
        assert!(child.is_base());
        assert!(!root.is_base());
        let guard = root.lock(ACC);
        assert_eq!(*guard.graph(), path_graph());
    }

    #[test]
    fn second_lock_is_idempotent() {
        let root = GraphState::base(path_graph(), 3);
        let a = root.derive(ChangeSet::forbid(0, 1));
        let b = a.derive(ChangeSet::merge(2, 3));
        let first = {
            let guard = b.lock(ACC);
            (guard.graph().clone(), guard.cost(), guard.cost_left())
        };
        let second = {
            let guard = b.lock(ACC);
            (guard.graph().clone(), guard.cost(), guard.cost_left())
        };
        assert_eq!(first, second);
        assert_eq!((first.1, first.2), (3, 0));
    }

    #[test]
    fn siblings_stay_valid_after_alternating_locks() {
        let root = GraphState::base(path_graph(), 10);
        let merge = root.derive(ChangeSet::merge(0, 1));
        let forbid = root.derive(ChangeSet::forbid(0, 1));
        let deeper = merge.derive(ChangeSet::merge(0, 2));

        let (merge_graph, _) = replay(&path_graph(), &[ChangeSet::merge(0, 1)]);
        let (forbid_graph, forbid_cost) = replay(&path_graph(), &[ChangeSet::forbid(0, 1)]);
        let (deeper_graph, deeper_cost) =
            replay(&path_graph(), &[ChangeSet::merge(0, 1), ChangeSet::merge(0, 2)]);

        for _ in 0..3 {
            assert_eq!(*deeper.lock(ACC).graph(), deeper_graph);
            assert_eq!(*forbid.lock(ACC).graph(), forbid_graph);
            assert_eq!(*merge.lock(ACC).graph(), merge_graph);
            assert_eq!(*root.lock(ACC).graph(), path_graph());
        }
        assert_eq!(forbid.cost(), Some(forbid_cost));
        assert_eq!(deeper.cost(), Some(deeper_cost));
        assert_eq!(deeper.cost_left(), Some(10 - deeper_cost));
    }

    #[test]
    fn random_version_trees_match_replayed_edits() {
        let mut rng = XorShiftRng::seed_from_u64(0xC0FFEE);
        for _ in 0..40 {
            let n = rng.random_range(3..8);
            let mut input = Graph::new(n);
            for i in 0..n {
                for j in (i + 1)..n {
                    input.set_value(i, j, rng.random_range(-3..=3));
                }
            }
            let root = GraphState::base(input.clone(), 100);
            let mut states: Vec<(GraphState, Vec<ChangeSet>)> = vec![(root, Vec::new())];
            for _ in 0..12 {
                let (parent, history) = states[rng.random_range(0..states.len())].clone();
                let graph = replay(&input, &history).0;
                let live: Vec<usize> = graph.live_nodes().collect();
                if live.len() < 2 {
                    continue;
                }
                let a = live[rng.random_range(0..live.len())];
                let b = live[(live.iter().position(|&x| x == a).unwrap() + 1) % live.len()];
                let cs = if rng.random_bool(0.5) {
                    ChangeSet::merge(a, b)
                } else {
                    ChangeSet::forbid(a, b)
                };
                let child = parent.derive(cs.clone());
                let mut child_history = history.clone();
                child_history.push(cs);
                states.push((child, child_history));
            }
            for _ in 0..30 {
                let (state, history) = &states[rng.random_range(0..states.len())];
                let (expected, cost) = replay(&input, history);
                let guard = state.lock(ACC);
                assert_eq!(*guard.graph(), expected);
                assert_eq!(guard.cost(), cost);
            }
        }
    }

    #[test]
    fn dropping_all_holders_frees_the_chain() {
        let root = GraphState::base(path_graph(), 5);
        let a = root.derive(ChangeSet::merge(0, 1));
        let b = a.derive(ChangeSet::forbid(0, 2));
        let weak = [root.downgrade(), a.downgrade(), b.downgrade()];
        b.lock(ACC);
        // b is now the base; nothing but the local handles reaches root and a.
        drop(root);
        drop(a);
        assert!(weak[0].upgrade().is_none());
        assert!(weak[1].upgrade().is_none());
        assert!(weak[2].upgrade().is_some());
        drop(b);
        assert!(weak.iter().all(|w| w.upgrade().is_none()));
    }

    #[test]
    fn unlocked_descendants_keep_ancestors_alive() {
        let root = GraphState::base(path_graph(), 5);
        let a = root.derive(ChangeSet::merge(0, 1));
        let weak_root = root.downgrade();
        drop(root);
        assert_eq!(a.references(), 1);
        let revived = weak_root.upgrade().unwrap();
        assert_eq!(revived.references(), 2);
        drop(revived);
        drop(a);
        assert!(weak_root.upgrade().is_none());
    }

    #[test]
    fn references_track_holders() {
        let root = GraphState::base(path_graph(), 0);
        assert_eq!(root.references(), 1);
        let child = root.derive(ChangeSet::forbid(0, 1));
        assert_eq!(root.references(), 2);
        let held = child.clone();
        assert_eq!(child.references(), 2);
        drop(held);
        drop(child);
        assert_eq!(root.references(), 1);
    }

    #[test]
    fn deep_chain_drops_without_recursion() {
        let root = GraphState::base(Graph::new(2), 0);
        let weak = root.downgrade();
        let mut tip = root;
        for i in 0..200_000 {
            let value = if i % 2 == 0 { 1 } else { -1 };
            tip = tip.derive(ChangeSet::set_edge(0, 1, value));
        }
        drop(tip);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn trace_merges_follows_absorbed_nodes() {
        let mut g = Graph::new(5);
        g.set_value(1, 3, 2);
        g.set_value(0, 1, 2);
        let root = GraphState::base(g, 10);
        let a = root.derive(ChangeSet::merge(1, 3));
        let b = a.derive(ChangeSet::merge(0, 1));
        b.lock(ACC);
        let mut ids = vec![usize::MAX; 5];
        ids[0] = 0;
        ids[2] = 1;
        ids[4] = 2;
        root.trace_merges(&mut ids);
        assert_eq!(ids, vec![0, 0, 1, 0, 2]);
    }

    #[test]
    fn estimated_cost_falls_back_to_parent() {
        let root = GraphState::base(path_graph(), 5);
        let child = root.derive(ChangeSet::forbid(0, 1));
        let grandchild = child.derive(ChangeSet::forbid(1, 2));
        assert_eq!(child.estimated_cost(), 0);
        child.lock(ACC);
        assert_eq!(grandchild.estimated_cost(), 2);
        assert_eq!(child.estimated_cost(), 2);
    }
}
