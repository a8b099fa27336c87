//! Budget-driven kernelization.
//!
//! For every live pair two lower bounds are kept:
//! - `icf`: cost induced by forbidding the pair (the pair's own weight if it is an
//!   edge, plus `min` of both weights for every common positive neighbour);
//! - `icp`: cost induced by making the pair permanent, i.e. merging it (its weight if
//!   it is a non-edge, plus `min` of both magnitudes for every neighbour the two
//!   endpoints disagree on).
//!
//! If forbidding a pair would overrun the remaining budget, the pair must be merged;
//! if merging would, it must be forbidden. Each reduction derives a new state and
//! updates the bounds incrementally instead of rebuilding them.

use crate::changeset::{Accounting, ChangeSet};
use crate::graph::{is_fixed, pair_index, Cost, Graph};
use crate::state::GraphState;
use tracing::debug;

// ============================================================================
// Per-row indexed max-heaps
// ============================================================================

/// One induced-cost measure over all pairs, as one max-heap per row.
///
/// Row `lo` holds the partners `hi > lo`; `pos` maps a pair index to its slot
/// within the row heap so point updates sift in `O(log n)`.
#[derive(Clone, Debug)]
struct InducedHeap {
    values: Vec<Cost>,
    rows: Vec<Vec<usize>>,
    pos: Vec<usize>,
}

impl InducedHeap {
    fn new(node_count: usize, values: Vec<Cost>) -> Self {
        let mut pos = vec![0; values.len()];
        let rows = (0..node_count)
            .map(|lo| {
                let row: Vec<usize> = ((lo + 1)..node_count).collect();
                for (slot, &hi) in row.iter().enumerate() {
                    pos[pair_index(lo, hi)] = slot;
                }
                row
            })
            .collect();
        let mut heap = Self { values, rows, pos };
        for lo in 0..node_count {
            for slot in (0..heap.rows[lo].len() / 2).rev() {
                heap.sift_down(lo, slot);
            }
        }
        heap
    }

    #[inline]
    fn value(&self, a: usize, b: usize) -> Cost {
        self.values[pair_index(a, b)]
    }

    #[inline]
    fn key(&self, lo: usize, slot: usize) -> Cost {
        self.values[pair_index(lo, self.rows[lo][slot])]
    }

    fn set(&mut self, a: usize, b: usize, value: Cost) {
        let (lo, hi) = (a.min(b), a.max(b));
        let p = pair_index(lo, hi);
        let old = self.values[p];
        if old == value {
            return;
        }
        self.values[p] = value;
        if value > old {
            self.sift_up(lo, self.pos[p]);
        } else {
            self.sift_down(lo, self.pos[p]);
        }
    }

    fn add(&mut self, a: usize, b: usize, delta: Cost) {
        if delta != 0 {
            let value = self.value(a, b) + delta;
            self.set(a, b, value);
        }
    }

    fn swap(&mut self, lo: usize, x: usize, y: usize) {
        self.rows[lo].swap(x, y);
        let (hx, hy) = (self.rows[lo][x], self.rows[lo][y]);
        self.pos[pair_index(lo, hx)] = x;
        self.pos[pair_index(lo, hy)] = y;
    }

    fn sift_up(&mut self, lo: usize, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.key(lo, parent) >= self.key(lo, slot) {
                break;
            }
            self.swap(lo, parent, slot);
            slot = parent;
        }
    }

    fn sift_down(&mut self, lo: usize, mut slot: usize) {
        let len = self.rows[lo].len();
        loop {
            let left = 2 * slot + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.key(lo, right) > self.key(lo, left) {
                right
            } else {
                left
            };
            if self.key(lo, slot) >= self.key(lo, child) {
                break;
            }
            self.swap(lo, slot, child);
            slot = child;
        }
    }

    /// Largest value over all rows as `(value, lo, hi)`; earliest row wins ties.
    fn max(&self) -> Option<(Cost, usize, usize)> {
        let mut best: Option<(Cost, usize, usize)> = None;
        for (lo, row) in self.rows.iter().enumerate() {
            if let Some(&hi) = row.first() {
                let value = self.value(lo, hi);
                if best.map_or(true, |(v, _, _)| value > v) {
                    best = Some((value, lo, hi));
                }
            }
        }
        best
    }
}

// ============================================================================
// Induced costs
// ============================================================================

#[inline]
fn forbid_term(a: Cost, b: Cost) -> Cost {
    if a > 0 && b > 0 {
        a.min(b)
    } else {
        0
    }
}

#[inline]
fn merge_term(a: Cost, b: Cost) -> Cost {
    if (a > 0 && b < 0) || (a < 0 && b > 0) {
        a.abs().min(b.abs())
    } else {
        0
    }
}

/// `(icf, icp)` of the live pair `(x, y)`, computed from scratch in `O(n)`.
fn induced_costs(graph: &Graph, live: &[usize], x: usize, y: usize) -> (Cost, Cost) {
    let s = graph.value(x, y);
    if is_fixed(s) {
        return (0, 0);
    }
    let mut icf = s.max(0);
    let mut icp = (-s).max(0);
    for &w in live {
        if w != x && w != y {
            let (a, b) = (graph.value(x, w), graph.value(y, w));
            icf += forbid_term(a, b);
            icp += merge_term(a, b);
        }
    }
    (icf, icp)
}

/// Reduction chosen by [`Kernel::select`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Merge(usize, usize),
    Forbid(usize, usize),
}

/// Pre-change values needed to patch the bounds after a reduction.
enum Snapshot {
    Forbid { old: Cost },
    Merge { row_u: Vec<Cost>, row_v: Vec<Cost> },
}

#[derive(Clone, Debug)]
struct Kernel {
    icf: InducedHeap,
    icp: InducedHeap,
}

impl Kernel {
    /// Computes both bounds for every live pair, `O(n^3)`.
    fn build(graph: &Graph) -> Self {
        let n = graph.node_count();
        let live: Vec<usize> = graph.live_nodes().collect();
        let mut icf = vec![0; graph.edge_count()];
        let mut icp = vec![0; graph.edge_count()];
        for (idx, &x) in live.iter().enumerate() {
            for &y in &live[idx + 1..] {
                let (f, p) = induced_costs(graph, &live, x, y);
                icf[pair_index(x, y)] = f;
                icp[pair_index(x, y)] = p;
            }
        }
        Self {
            icf: InducedHeap::new(n, icf),
            icp: InducedHeap::new(n, icp),
        }
    }

    /// Picks the forced reduction, if any bound exceeds the budget.
    ///
    /// When both do, the larger bound governs; ties go to forbidding.
    fn select(&self, budget: Cost, fixpoint: Cost) -> Option<Action> {
        let over = |top: Option<(Cost, usize, usize)>| top.filter(|&(v, _, _)| v * fixpoint > budget);
        match (over(self.icf.max()), over(self.icp.max())) {
            (Some((f, a, b)), Some((p, _, _))) if f > p => Some(Action::Merge(a, b)),
            (_, Some((_, a, b))) => Some(Action::Forbid(a, b)),
            (Some((_, a, b)), None) => Some(Action::Merge(a, b)),
            (None, None) => None,
        }
    }

    fn snapshot(graph: &Graph, action: Action) -> Snapshot {
        let row = |u: usize| {
            (0..graph.node_count())
                .map(|x| if x == u { 0 } else { graph.value(u, x) })
                .collect()
        };
        match action {
            Action::Forbid(u, v) => Snapshot::Forbid {
                old: graph.value(u, v),
            },
            Action::Merge(u, v) => Snapshot::Merge {
                row_u: row(u),
                row_v: row(v),
            },
        }
    }

    /// Patches the bounds after `action` turned the graph into `graph`.
    fn update(&mut self, graph: &Graph, action: Action, snapshot: Snapshot) {
        let live: Vec<usize> = graph.live_nodes().collect();
        match (action, snapshot) {
            (Action::Forbid(u, v), Snapshot::Forbid { old }) => {
                let new = graph.value(u, v);
                let (f, p) = induced_costs(graph, &live, u, v);
                self.icf.set(u, v, f);
                self.icp.set(u, v, p);
                for &w in &live {
                    if w == u || w == v {
                        continue;
                    }
                    // (u, w) sees v as third node, (v, w) sees u.
                    for (x, other) in [(u, v), (v, u)] {
                        if is_fixed(graph.value(x, w)) {
                            continue;
                        }
                        let s = graph.value(other, w);
                        self.icf.add(x, w, forbid_term(new, s) - forbid_term(old, s));
                        self.icp.add(x, w, merge_term(new, s) - merge_term(old, s));
                    }
                }
            }
            (Action::Merge(u, v), Snapshot::Merge { row_u, row_v }) => {
                for x in 0..graph.node_count() {
                    if x != v {
                        self.icf.set(v, x, 0);
                        self.icp.set(v, x, 0);
                    }
                }
                for &x in &live {
                    if x != u {
                        let (f, p) = induced_costs(graph, &live, u, x);
                        self.icf.set(u, x, f);
                        self.icp.set(u, x, p);
                    }
                }
                for (idx, &x) in live.iter().enumerate() {
                    if x == u {
                        continue;
                    }
                    for &y in &live[idx + 1..] {
                        if y == u || is_fixed(graph.value(x, y)) {
                            continue;
                        }
                        let (nx, ny) = (graph.value(u, x), graph.value(u, y));
                        let df = forbid_term(nx, ny)
                            - forbid_term(row_u[x], row_u[y])
                            - forbid_term(row_v[x], row_v[y]);
                        let dp = merge_term(nx, ny)
                            - merge_term(row_u[x], row_u[y])
                            - merge_term(row_v[x], row_v[y]);
                        self.icf.add(x, y, df);
                        self.icp.add(x, y, dp);
                    }
                }
            }
            _ => unreachable!("snapshot does not match reduction"),
        }
    }
}

// ============================================================================
// Reduction loop
// ============================================================================

/// Result of [`kernelize`].
#[derive(Debug)]
pub struct Kernelized {
    /// The reduced state (the input state if nothing was forced).
    pub state: GraphState,
    /// Number of forced merges and forbids applied.
    pub reductions: u64,
}

/// Applies forced merges and forbids until no bound exceeds the remaining budget.
///
/// Stops early once the budget turns negative; the caller prunes such a state.
pub fn kernelize(state: GraphState, accounting: Accounting) -> Kernelized {
    let mut state = state;
    let mut reductions = 0;
    let mut kernel = Kernel::build(state.lock(accounting).graph());

    loop {
        let (action, snapshot) = {
            let guard = state.lock(accounting);
            let budget = guard.cost_left();
            if budget < 0 {
                break;
            }
            let Some(action) = kernel.select(budget, accounting.fixpoint) else {
                break;
            };
            (action, Kernel::snapshot(guard.graph(), action))
        };
        let changeset = match action {
            Action::Merge(u, v) => ChangeSet::merge(u, v),
            Action::Forbid(u, v) => ChangeSet::forbid(u, v),
        };
        state = state.derive(changeset);
        let guard = state.lock(accounting);
        kernel.update(guard.graph(), action, snapshot);
        reductions += 1;
    }

    debug!(reductions, cost_left = ?state.cost_left(), "kernel pass finished");
    Kernelized { state, reductions }
}
