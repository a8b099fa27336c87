//! Invertible edits on a [`Graph`]: merging two nodes and fixing a pair's value.
//!
//! Applying a changeset mutates the graph, returns the incremental search cost of the
//! edit, and turns the changeset into its own inverse. Applying it a second time
//! restores the graph exactly.

use crate::graph::{Cost, Graph, FORBIDDEN, PERSISTENT};

/// Cost-accounting constants of a branching algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Accounting {
    /// Multiplier applied to every overridden weight.
    pub fixpoint: Cost,
    /// Charged for resolving an undecided zero-edge, refunded when one is created.
    pub bookkeeping: Cost,
}

impl Accounting {
    /// Plain weighted edit cost: every unit of overridden weight costs one.
    pub const EXACT: Self = Self {
        fixpoint: 1,
        bookkeeping: 0,
    };

    /// Doubled weights plus one unit per zero-edge, used by the branching-number algorithms.
    pub const DOUBLED: Self = Self {
        fixpoint: 2,
        bookkeeping: 1,
    };
}

/// Kind of a [`ChangeSet`], as seen by read-only traversals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// Forward merge of `n2` into `n1`.
    Merge,
    /// Inverse of a merge.
    Split,
    /// Pair value overwrite.
    SetEdge,
}

/// One invertible graph edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeSet {
    /// Add row `n2` into row `n1` and remove `n2` from the live order (`n1 < n2`).
    Merge {
        /// Surviving node.
        n1: usize,
        /// Absorbed node.
        n2: usize,
    },
    /// Undo of a merge; `prev` is the live predecessor `n2` had.
    Split {
        /// Surviving node.
        n1: usize,
        /// Absorbed node to restore.
        n2: usize,
        /// Predecessor of `n2` in the live order at merge time.
        prev: usize,
    },
    /// Swap the pair's value with `value`.
    SetEdge {
        /// First endpoint.
        n1: usize,
        /// Second endpoint.
        n2: usize,
        /// Value written on the next application.
        value: Cost,
    },
}

impl ChangeSet {
    /// Merges the pair, keeping the lower-indexed node.
    pub fn merge(a: usize, b: usize) -> Self {
        debug_assert!(a != b, "cannot merge node {a} with itself");
        Self::Merge {
            n1: a.min(b),
            n2: a.max(b),
        }
    }

    /// Fixes the pair as a non-edge.
    pub fn forbid(a: usize, b: usize) -> Self {
        Self::set_edge(a, b, FORBIDDEN)
    }

    /// Fixes the pair as an edge.
    pub fn set_persistent(a: usize, b: usize) -> Self {
        Self::set_edge(a, b, PERSISTENT)
    }

    /// Overwrites the pair with an arbitrary value.
    pub fn set_edge(a: usize, b: usize, value: Cost) -> Self {
        debug_assert!(a != b, "cannot set self pair ({a}, {a})");
        Self::SetEdge {
            n1: a.min(b),
            n2: a.max(b),
            value,
        }
    }

    /// Kind of the edit in its current direction.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Merge { .. } => ChangeKind::Merge,
            Self::Split { .. } => ChangeKind::Split,
            Self::SetEdge { .. } => ChangeKind::SetEdge,
        }
    }

    /// The pair the edit touches, lower node first.
    pub fn nodes(&self) -> (usize, usize) {
        match *self {
            Self::Merge { n1, n2 } | Self::Split { n1, n2, .. } | Self::SetEdge { n1, n2, .. } => {
                (n1, n2)
            }
        }
    }

    /// Applies the edit, returns its cost and turns `self` into the inverse edit.
    ///
    /// Inverse directions (`Split`, and the second application of a `SetEdge`) are
    /// only meaningful as undo steps; their returned cost is not a search cost.
    pub fn apply(&mut self, graph: &mut Graph, accounting: Accounting) -> Cost {
        match *self {
            Self::Merge { n1, n2 } => {
                let (cost, prev) = apply_merge(graph, n1, n2, accounting);
                *self = Self::Split { n1, n2, prev };
                cost
            }
            Self::Split { n1, n2, prev } => {
                graph.add_row(n1, n2, -1);
                graph.relink(prev, n2);
                *self = Self::Merge { n1, n2 };
                0
            }
            Self::SetEdge { n1, n2, value } => {
                let old = graph.value(n1, n2);
                graph.set_value(n1, n2, value);
                *self = Self::SetEdge { n1, n2, value: old };
                set_edge_cost(old, value, accounting)
            }
        }
    }
}

fn apply_merge(graph: &mut Graph, n1: usize, n2: usize, accounting: Accounting) -> (Cost, usize) {
    let Accounting {
        fixpoint,
        bookkeeping,
    } = accounting;

    let mut cost = match graph.value(n1, n2) {
        v if v < 0 => -v * fixpoint,
        0 => bookkeeping,
        _ => 0,
    };

    for i in graph.live_nodes() {
        if i == n1 || i == n2 {
            continue;
        }
        let v1 = graph.value(n1, i);
        let v2 = graph.value(n2, i);
        if (v1 > 0 && v2 < 0) || (v1 < 0 && v2 > 0) {
            cost += fixpoint * v1.abs().min(v2.abs());
        }
        if v1 + v2 == 0 {
            if v1 == 0 {
                cost += bookkeeping;
            } else {
                cost -= bookkeeping;
            }
        } else if v1 == 0 || v2 == 0 {
            cost += bookkeeping;
        }
    }

    graph.add_row(n1, n2, 1);
    let prev = graph.unlink(n2);
    (cost, prev)
}

fn set_edge_cost(old: Cost, new: Cost, accounting: Accounting) -> Cost {
    let mut cost = 0;
    if (old < 0 && new > 0) || (old > 0 && new < 0) {
        cost += accounting.fixpoint * old.abs();
    }
    if old == 0 {
        cost += accounting.bookkeeping;
    }
    if new == 0 {
        cost -= accounting.bookkeeping;
    }
    cost
}
