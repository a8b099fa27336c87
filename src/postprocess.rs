//! Turning a finished search state into a clustering of the input nodes.

use crate::changeset::Accounting;
use crate::graph::{Cost, Graph};
use crate::state::GraphState;
use std::collections::BTreeMap;
use std::fmt;

/// Assigns a cluster id to every input node.
///
/// Locks `best`, groups its live nodes by positive pairs, then replays the merge
/// history between `root` and `best` so every absorbed node inherits the id of the
/// node it was merged into. Ids are dense, in order of first live node.
pub fn enumerate_cliques(root: &GraphState, best: &GraphState, accounting: Accounting) -> Vec<usize> {
    let mut ids = {
        let guard = best.lock(accounting);
        let graph = guard.graph();
        let mut ids = vec![usize::MAX; graph.node_count()];
        let mut next_id = 0;
        for i in graph.live_nodes() {
            if ids[i] != usize::MAX {
                continue;
            }
            ids[i] = next_id;
            for j in graph.live_after(i) {
                if ids[j] == usize::MAX && graph.value(i, j) > 0 {
                    ids[j] = next_id;
                }
            }
            next_id += 1;
        }
        ids
    };
    root.trace_merges(&mut ids);
    ids
}

/// Number of distinct cluster ids.
pub fn cluster_count(ids: &[usize]) -> usize {
    ids.iter().map(|&id| id + 1).max().unwrap_or(0)
}

/// Weighted edit cost of `ids` against `graph`: inserted non-edges inside clusters
/// plus deleted edges between clusters. Zero-edges are free either way.
pub fn edit_cost(graph: &Graph, ids: &[usize]) -> Cost {
    let n = graph.node_count();
    let mut cost = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            let value = graph.value(i, j);
            let together = ids[i] == ids[j];
            if together && value < 0 {
                cost -= value;
            } else if !together && value > 0 {
                cost += value;
            }
        }
    }
    cost
}

/// Text rendering of a clustering: one line per cluster, then one per disagreement
/// with the input weights.
pub struct ClusterReport<'a> {
    graph: &'a Graph,
    ids: &'a [usize],
}

impl<'a> ClusterReport<'a> {
    /// Pairs a clustering with the graph it was computed for.
    pub fn new(graph: &'a Graph, ids: &'a [usize]) -> Self {
        debug_assert_eq!(graph.node_count(), ids.len());
        Self { graph, ids }
    }
}

impl fmt::Display for ClusterReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (node, &id) in self.ids.iter().enumerate() {
            clusters.entry(id).or_default().push(node);
        }
        for (id, nodes) in &clusters {
            write!(f, "cluster {id:4}:")?;
            for node in nodes {
                write!(f, " {node}")?;
            }
            writeln!(f)?;
        }

        let n = self.graph.node_count();
        for i in 0..n {
            for j in (i + 1)..n {
                let value = self.graph.value(i, j);
                let together = self.ids[i] == self.ids[j];
                match (value, together) {
                    (v, false) if v > 0 => writeln!(f, "delete edge {i} {j} (weight {v})")?,
                    (v, true) if v < 0 => writeln!(f, "insert edge {i} {j} (weight {})", -v)?,
                    (0, true) => writeln!(f, "zero-edge {i} {j} joined")?,
                    (0, false) => writeln!(f, "zero-edge {i} {j} separated")?,
                    _ => {}
                }
            }
        }
        Ok(())
    }
}
