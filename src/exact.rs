//! Exhaustive clustering of small residual instances.
//!
//! Enumerates every set partition of the live nodes as a restricted growth string,
//! pruning a prefix once its cost reaches the best complete partition. Bell numbers
//! grow fast; callers keep this to a handful of nodes.

use crate::changeset::ChangeSet;
use crate::graph::{Cost, Graph};

/// Optimal clustering of the live nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    /// Weighted edit cost on the current matrix (zero-edges are free).
    pub cost: Cost,
    /// Clusters in order of their smallest node, each sorted ascending.
    pub blocks: Vec<Vec<usize>>,
}

impl Partition {
    /// Edits realising the partition: merges into each block's smallest node, then
    /// forbids between all block representatives.
    pub fn changesets(&self) -> Vec<ChangeSet> {
        let mut changes = Vec::new();
        for block in &self.blocks {
            let rep = block[0];
            changes.extend(block[1..].iter().map(|&v| ChangeSet::merge(rep, v)));
        }
        for (i, a) in self.blocks.iter().enumerate() {
            for b in &self.blocks[i + 1..] {
                changes.push(ChangeSet::forbid(a[0], b[0]));
            }
        }
        changes
    }
}

/// Cost of placing nodes `a` and `b` in the same cluster (`together`) or apart.
#[inline]
fn pair_cost(value: Cost, together: bool) -> Cost {
    match (together, value) {
        (true, v) if v < 0 => -v,
        (false, v) if v > 0 => v,
        _ => 0,
    }
}

struct Search<'a> {
    graph: &'a Graph,
    nodes: Vec<usize>,
    assign: Vec<usize>,
    best_cost: Cost,
    best_assign: Vec<usize>,
}

impl Search<'_> {
    fn extend(&mut self, depth: usize, blocks: usize, cost: Cost) {
        if cost >= self.best_cost {
            return;
        }
        if depth == self.nodes.len() {
            self.best_cost = cost;
            self.best_assign.clone_from(&self.assign);
            return;
        }
        let node = self.nodes[depth];
        for block in 0..=blocks {
            let mut added = 0;
            for prev in 0..depth {
                let value = self.graph.value(node, self.nodes[prev]);
                added += pair_cost(value, self.assign[prev] == block);
            }
            self.assign[depth] = block;
            self.extend(depth + 1, blocks.max(block + 1), cost + added);
        }
    }
}

/// Finds a minimum-cost clustering of the live nodes by exhaustive enumeration.
pub fn best_partition(graph: &Graph) -> Partition {
    let nodes: Vec<usize> = graph.live_nodes().collect();
    let count = nodes.len();
    let mut search = Search {
        graph,
        nodes,
        assign: vec![0; count],
        best_cost: Cost::MAX,
        best_assign: vec![0; count],
    };
    search.extend(0, 0, 0);

    let block_count = search.best_assign.iter().map(|&b| b + 1).max().unwrap_or(0);
    let mut blocks = vec![Vec::new(); block_count];
    for (&node, &block) in search.nodes.iter().zip(&search.best_assign) {
        blocks[block].push(node);
    }
    Partition {
        cost: if count == 0 { 0 } else { search.best_cost },
        blocks,
    }
}
