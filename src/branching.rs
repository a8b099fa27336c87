//! Branch-point selection for the branching algorithms.

use crate::changeset::Accounting;
use crate::graph::{pair_index, Cost, Graph};

/// Costs above this are clamped before solving for the branching number.
///
/// Keeps the Newton iteration in range for pairs touching fixed sentinels; such
/// branches are pruned right away, so the exact growth rate does not matter.
const BRANCH_COST_CAP: Cost = 128;

const NEWTON_EPSILON: f64 = 1e-5;
const NEWTON_MAX_STEPS: usize = 1_000;

/// Branching number at or above which 1.82k tries its triangle rule first.
pub const RULE_A_THRESHOLD: f64 = 1.76;

/// Live nodes beyond which 1.82k does not solve a residual instance exhaustively.
pub const EXACT_NODE_LIMIT: usize = 4;

/// Growth rate of a two-way branch with the given (doubled) branch costs.
///
/// Solves `z^max - z^min = 1` with `a = merge/2`, `b = forbid/2`,
/// `max = max(a, b)` and `min = |a - b|`, by Newton iteration from `z = 2`.
pub fn branching_number(merge_cost: Cost, forbid_cost: Cost) -> f64 {
    let a = merge_cost.clamp(1, BRANCH_COST_CAP) as f64 / 2.0;
    let b = forbid_cost.clamp(1, BRANCH_COST_CAP) as f64 / 2.0;
    let (max, min) = if a > b { (a, a - b) } else { (b, b - a) };

    let mut z = 2.0_f64;
    for _ in 0..NEWTON_MAX_STEPS {
        let pow_max = z.powf(max);
        let pow_min = z.powf(min);
        let slope = (pow_max * max - pow_min * min) / z;
        let step = (pow_max - pow_min - 1.0) / slope;
        z -= step;
        if step * step <= NEWTON_EPSILON {
            break;
        }
    }
    z
}

/// Lower bound on the cost of merging every live pair, indexed by pair index.
///
/// The pair's own insertion, `bookkeeping` for every zero-edge the merge resolves,
/// and `fixpoint * min` for every neighbour the endpoints disagree on.
pub fn merge_costs(graph: &Graph, accounting: Accounting) -> Vec<Cost> {
    let Accounting {
        fixpoint,
        bookkeeping,
    } = accounting;
    let live: Vec<usize> = graph.live_nodes().collect();
    let mut costs = vec![0; graph.edge_count()];
    for (idx, &a) in live.iter().enumerate() {
        for &b in &live[idx + 1..] {
            let mut cost = match graph.value(a, b) {
                0 => bookkeeping,
                v if v < 0 => -v * fixpoint,
                _ => 0,
            };
            for &c in &live {
                if c == a || c == b {
                    continue;
                }
                let (ca, cb) = (graph.value(a, c), graph.value(b, c));
                if ca == 0 || cb == 0 {
                    cost += bookkeeping;
                }
                if (ca < 0 && cb > 0) || (ca > 0 && cb < 0) {
                    cost += fixpoint * ca.abs().min(cb.abs());
                }
            }
            costs[pair_index(a, b)] = cost;
        }
    }
    costs
}

/// Pair chosen by [`min_branching_pair`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairChoice {
    /// Lower endpoint.
    pub a: usize,
    /// Higher endpoint.
    pub b: usize,
    /// Branching number of merge-vs-forbid on `(a, b)`.
    pub number: f64,
}

/// Among edges and zero-edges with a positive merge cost, the pair with the
/// smallest branching number. `None` means the state is a finished clustering.
pub fn min_branching_pair(graph: &Graph, accounting: Accounting) -> Option<PairChoice> {
    let costs = merge_costs(graph, accounting);
    let mut best: Option<PairChoice> = None;
    for a in graph.live_nodes() {
        for b in graph.live_after(a) {
            let merge = costs[pair_index(a, b)];
            let value = graph.value(a, b);
            if merge <= 0 || value < 0 {
                continue;
            }
            let forbid = if value == 0 {
                accounting.bookkeeping.max(1)
            } else {
                value * accounting.fixpoint
            };
            let number = branching_number(merge, forbid);
            if best.map_or(true, |choice| number < choice.number) {
                best = Some(PairChoice {
                    a: a.min(b),
                    b: a.max(b),
                    number,
                });
            }
        }
    }
    best
}

/// First pair `(a, c)` such that some `b` has `(a, b) <= 0` while `c` is attached to
/// both `a` and `b` by edges or zero-edges, at least one of them an edge.
pub fn conflict_pair(graph: &Graph) -> Option<(usize, usize)> {
    for a in graph.live_nodes() {
        for b in graph.live_after(a) {
            if graph.value(a, b) > 0 {
                continue;
            }
            for c in graph.live_nodes() {
                if c == a || c == b {
                    continue;
                }
                let (ac, bc) = (graph.value(a, c), graph.value(b, c));
                if (ac > 0 && bc >= 0) || (ac >= 0 && bc > 0) {
                    return Some((a, c));
                }
            }
        }
    }
    None
}

/// First triple `(u, v, w)` with `(u, v) > 0`, `(v, w) > 0` and `(u, w) <= 0`.
pub fn conflict_triple(graph: &Graph) -> Option<(usize, usize, usize)> {
    for u in graph.live_nodes() {
        for w in graph.live_after(u) {
            if graph.value(u, w) > 0 {
                continue;
            }
            for v in graph.live_nodes() {
                if v != u && v != w && graph.value(u, v) > 0 && graph.value(v, w) > 0 {
                    return Some((u, v, w));
                }
            }
        }
    }
    None
}

/// Whether `v` qualifies for the triangle rule against the triangle `(x, y, z)`.
fn rule_b_legal(graph: &Graph, v: usize, x: usize, y: usize, z: usize) -> bool {
    let (vx, vy, vz) = (graph.value(v, x), graph.value(v, y), graph.value(v, z));
    (vx > 0 && vy < 0)
        || (vx == 0 && vy == 0)
        || (vx == 0 && vy < 0 && vz >= 0)
        || (vx > 0 && vy == 0 && vz <= 0)
}

/// Triangle rule: first positive triangle `x < y < z` in live order with two
/// further legal nodes; branching happens on `(x, y)`.
pub fn rule_b_pair(graph: &Graph) -> Option<(usize, usize)> {
    for x in graph.live_nodes() {
        for y in graph.live_after(x) {
            if graph.value(x, y) <= 0 {
                continue;
            }
            for z in graph.live_after(y) {
                if graph.value(x, z) <= 0 || graph.value(y, z) <= 0 {
                    continue;
                }
                let legal = graph
                    .live_nodes()
                    .filter(|&v| v != x && v != y && v != z)
                    .filter(|&v| rule_b_legal(graph, v, x, y, z))
                    .take(2)
                    .count();
                if legal == 2 {
                    return Some((x, y));
                }
            }
        }
    }
    None
}
