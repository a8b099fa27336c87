//! Weighted graph over a symmetric cost matrix with a linked order of live nodes.
//!
//! Pair values carry both the decision and its confidence:
//! - `> 0`: edge, magnitude is the cost of deleting it,
//! - `< 0`: non-edge, magnitude is the cost of inserting it,
//! - `== 0`: undecided "zero-edge".
//!
//! Merging nodes never shrinks the matrix; the merged-away node is unlinked from the
//! live order instead, so [`Graph::edge_count`] always refers to the original node count.

use crate::error::GraphParseError;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;

// ============================================================================
// Cost values
// ============================================================================

/// Signed pair value / accumulated search cost.
pub type Cost = i64;

/// Sentinel for a pair fixed as non-edge for the rest of the search.
///
/// A large finite value instead of `i64::MIN` so sums of merged rows cannot wrap.
pub const FORBIDDEN: Cost = -100_000;

/// Sentinel for a pair fixed as edge for the rest of the search.
pub const PERSISTENT: Cost = 100_000;

/// Pairs whose magnitude exceeds this are fixed (forbidden or persistent).
pub const FIXED_THRESHOLD: Cost = 50_000;

/// Largest weight magnitude accepted from input.
pub const MAX_INPUT_WEIGHT: Cost = 1_000;

/// Returns `true` if `value` is one of the fixed sentinels (or a merge of them).
#[inline(always)]
pub const fn is_fixed(value: Cost) -> bool {
    value > FIXED_THRESHOLD || value < -FIXED_THRESHOLD
}

/// Index of the unordered pair `{a, b}` in the packed lower triangle.
#[inline(always)]
pub(crate) const fn pair_index(a: usize, b: usize) -> usize {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    hi * (hi - 1) / 2 + lo
}

/// Number of unordered pairs over `n` nodes.
#[inline(always)]
pub const fn choose2(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

// ============================================================================
// Graph
// ============================================================================

/// Symmetric signed cost matrix over a fixed node range, plus the live traversal order.
///
/// Node `0` is always live: merges always remove the higher-indexed node of the pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Graph {
    node_count: usize,
    costs: Vec<Cost>,
    next: Vec<Option<usize>>,
}

impl Graph {
    /// Creates a graph on `node_count` nodes with every pair a weak non-edge (`-1`).
    pub fn new(node_count: usize) -> Self {
        let mut graph = Self {
            node_count,
            costs: vec![-1; choose2(node_count)],
            next: vec![None; node_count],
        };
        graph.reset_order();
        graph
    }

    /// Number of nodes the matrix was created with (never shrinks).
    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of unordered pairs over the original node count.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.costs.len()
    }

    /// Returns the value of pair `(a, b)`.
    ///
    /// # Panics
    /// Panics in debug builds if `a == b` or either index is out of range.
    #[inline(always)]
    pub fn value(&self, a: usize, b: usize) -> Cost {
        debug_assert!(a != b, "pair value requested for self pair ({a}, {a})");
        debug_assert!(a < self.node_count && b < self.node_count);
        self.costs[pair_index(a, b)]
    }

    /// Sets the value of pair `(a, b)`.
    ///
    /// # Panics
    /// Panics in debug builds if `a == b` or either index is out of range.
    #[inline(always)]
    pub fn set_value(&mut self, a: usize, b: usize, value: Cost) {
        debug_assert!(a != b, "pair value written for self pair ({a}, {a})");
        debug_assert!(a < self.node_count && b < self.node_count);
        self.costs[pair_index(a, b)] = value;
    }

    /// Sets every pair to `value` and relinks all nodes as live.
    pub fn set_all(&mut self, value: Cost) {
        self.costs.fill(value);
        self.reset_order();
    }

    fn reset_order(&mut self) {
        for i in 0..self.node_count {
            self.next[i] = if i + 1 < self.node_count { Some(i + 1) } else { None };
        }
    }

    /// First live node, or `None` for an empty graph.
    #[inline]
    pub fn first(&self) -> Option<usize> {
        if self.node_count > 0 {
            Some(0)
        } else {
            None
        }
    }

    /// Next live node after the live node `i`, or `None` at the end of the order.
    #[inline(always)]
    pub fn next(&self, i: usize) -> Option<usize> {
        self.next[i]
    }

    /// Traversal step: `None` starts at the first live node, `Some(i)` moves past `i`.
    #[inline]
    pub fn next_live(&self, cursor: Option<usize>) -> Option<usize> {
        match cursor {
            None => self.first(),
            Some(i) => self.next(i),
        }
    }

    /// Iterates live nodes in traversal order.
    pub fn live_nodes(&self) -> LiveNodes<'_> {
        LiveNodes {
            graph: self,
            cursor: self.first(),
        }
    }

    /// Iterates live nodes following `i` in traversal order.
    pub fn live_after(&self, i: usize) -> LiveNodes<'_> {
        LiveNodes {
            graph: self,
            cursor: self.next(i),
        }
    }

    /// Number of live nodes (`O(n)`).
    pub fn live_count(&self) -> usize {
        self.live_nodes().count()
    }

    /// Removes `node` from the live order and returns its predecessor.
    ///
    /// # Panics
    /// Panics in debug builds if `node` is `0` or not live.
    pub(crate) fn unlink(&mut self, node: usize) -> usize {
        debug_assert!(node != 0, "node 0 is the anchor of the live order");
        let mut prev = 0;
        while self.next[prev] != Some(node) {
            match self.next[prev] {
                Some(i) => prev = i,
                None => unreachable!("node {node} is not live"),
            }
        }
        self.next[prev] = self.next[node];
        prev
    }

    /// Reinserts `node` after `prev`, undoing [`Graph::unlink`].
    pub(crate) fn relink(&mut self, prev: usize, node: usize) {
        debug_assert_eq!(self.next[prev], self.next[node]);
        self.next[prev] = Some(node);
    }

    /// Adds row/column `from` into row/column `into` over all other live nodes.
    pub(crate) fn add_row(&mut self, into: usize, from: usize, sign: Cost) {
        let mut cursor = self.first();
        while let Some(i) = cursor {
            if i != into && i != from {
                let moved = self.value(from, i);
                self.costs[pair_index(into, i)] += sign * moved;
            }
            cursor = self.next(i);
        }
    }

    /// Returns `true` iff no live triple has two pairs `>= 0` and the third `< 0`.
    ///
    /// `O(n^3)`.
    pub fn is_cluster_graph(&self) -> bool {
        self.bad_triple().is_none()
    }

    /// Finds a live triple `(i, j, k)` with `(i, j) < 0`, `(i, k) >= 0` and `(j, k) >= 0`.
    pub fn bad_triple(&self) -> Option<(usize, usize, usize)> {
        for i in self.live_nodes() {
            for j in self.live_after(i) {
                if self.value(i, j) >= 0 {
                    continue;
                }
                for k in self.live_nodes() {
                    if k != i && k != j && self.value(i, k) >= 0 && self.value(j, k) >= 0 {
                        return Some((i, j, k));
                    }
                }
            }
        }
        None
    }

    // ------------------------------------------------------------------------
    // Text format
    // ------------------------------------------------------------------------

    /// Parses the plain-text format: a node-count header, then `i j [weight]` lines.
    ///
    /// Pairs not mentioned are weak non-edges (`-1`); a missing weight means `1`.
    /// Blank lines and lines starting with `#` are skipped.
    ///
    /// # Errors
    /// Returns an error on a missing/invalid header, malformed lines, out-of-range
    /// nodes, self loops, or weights beyond [`MAX_INPUT_WEIGHT`].
    pub fn parse(text: &str) -> Result<Self, GraphParseError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let (_, header) = lines.next().ok_or(GraphParseError::Empty)?;
        let mut header_tokens = header.split_whitespace();
        let nodes = match (header_tokens.next(), header_tokens.next()) {
            (Some(tok), None) => tok.parse::<usize>().map_err(|_| GraphParseError::InvalidHeader {
                line: header.to_string(),
            })?,
            _ => {
                return Err(GraphParseError::InvalidHeader {
                    line: header.to_string(),
                })
            }
        };

        let mut graph = Graph::new(nodes);
        for (line_no, line) in lines {
            let invalid = || GraphParseError::InvalidLine {
                line_no,
                content: line.to_string(),
            };
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let (a, b, weight) = match tokens.as_slice() {
                [a, b] => (*a, *b, None),
                [a, b, w] => (*a, *b, Some(*w)),
                _ => return Err(invalid()),
            };
            let a: usize = a.parse().map_err(|_| invalid())?;
            let b: usize = b.parse().map_err(|_| invalid())?;
            let weight: Cost = match weight {
                Some(w) => w.parse().map_err(|_| invalid())?,
                None => 1,
            };

            for node in [a, b] {
                if node >= nodes {
                    return Err(GraphParseError::NodeOutOfRange { line_no, node, nodes });
                }
            }
            if a == b {
                return Err(GraphParseError::SelfLoop { line_no, node: a });
            }
            if weight.abs() > MAX_INPUT_WEIGHT {
                return Err(GraphParseError::WeightOutOfRange {
                    line_no,
                    weight,
                    max: MAX_INPUT_WEIGHT,
                });
            }
            graph.set_value(a, b, weight);
        }
        Ok(graph)
    }

    /// Reads a graph in the plain-text format from a reader.
    ///
    /// # Errors
    /// Returns an error if reading fails or the text is malformed.
    pub fn read_from<R: BufRead>(mut reader: R) -> Result<Self, GraphParseError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    /// Loads a graph from a file in the plain-text format.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is malformed.
    pub fn load_from_file(filename: impl AsRef<Path>) -> Result<Self, GraphParseError> {
        let file = File::open(filename)?;
        Self::read_from(BufReader::new(file))
    }

    /// Writes every pair over the original node range as `i j value` lines.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        writeln!(w, "{}", self.node_count)?;
        for i in 0..self.node_count {
            for j in (i + 1)..self.node_count {
                writeln!(w, "{i} {j} {}", self.value(i, j))?;
            }
        }
        Ok(())
    }
}

/// Iterator over live nodes, see [`Graph::live_nodes`].
#[derive(Clone, Debug)]
pub struct LiveNodes<'a> {
    graph: &'a Graph,
    cursor: Option<usize>,
}

impl Iterator for LiveNodes<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        let current = self.cursor?;
        self.cursor = self.graph.next(current);
        Some(current)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    fn random_graph(rng: &mut XorShiftRng, n: usize, max_weight: Cost) -> Graph {
        let mut g = Graph::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                g.set_value(i, j, rng.random_range(-max_weight..=max_weight));
            }
        }
        g
    }

    fn brute_has_bad_triple(g: &Graph) -> bool {
        let live: Vec<usize> = g.live_nodes().collect();
        for &i in &live {
            for &j in &live {
                for &k in &live {
                    if i == j || j == k || i == k {
                        continue;
                    }
                    if g.value(i, j) >= 0 && g.value(i, k) >= 0 && g.value(j, k) < 0 {
                        return true;
                    }
                }
            }
        }
        false
    }

    #[test]
    fn new_graph_is_all_weak_non_edges() {
        let g = Graph::new(5);
        assert_eq!(g.node_count(), 5);
        assert_eq!(g.edge_count(), 10);
        for i in 0..5 {
            for j in (i + 1)..5 {
                assert_eq!(g.value(i, j), -1);
            }
        }
        assert_eq!(g.live_nodes().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn values_are_symmetric() {
        let mut g = Graph::new(4);
        g.set_value(3, 1, 7);
        assert_eq!(g.value(1, 3), 7);
        assert_eq!(g.value(3, 1), 7);
    }

    #[test]
    fn traversal_starts_at_first_live_node() {
        let g = Graph::new(3);
        assert_eq!(g.next_live(None), Some(0));
        assert_eq!(g.next_live(Some(0)), Some(1));
        assert_eq!(g.next_live(Some(2)), None);
        assert_eq!(Graph::new(0).next_live(None), None);
    }

    #[test]
    fn unlink_and_relink_restore_order() {
        let mut g = Graph::new(5);
        let prev = g.unlink(3);
        assert_eq!(prev, 2);
        assert_eq!(g.live_nodes().collect::<Vec<_>>(), vec![0, 1, 2, 4]);
        let prev1 = g.unlink(1);
        assert_eq!(prev1, 0);
        assert_eq!(g.live_count(), 3);
        g.relink(prev1, 1);
        g.relink(prev, 3);
        assert_eq!(g.live_nodes().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn edge_count_ignores_removed_nodes() {
        let mut g = Graph::new(6);
        g.unlink(5);
        g.unlink(2);
        assert_eq!(g.edge_count(), 15);
        assert_eq!(g.live_count(), 4);
    }

    #[test]
    fn disjoint_cliques_are_a_cluster_graph() {
        let mut g = Graph::new(6);
        for (a, b) in [(0, 1), (0, 2), (1, 2), (3, 4)] {
            g.set_value(a, b, 2);
        }
        assert!(g.is_cluster_graph());
    }

    #[test]
    fn path_is_not_a_cluster_graph() {
        let mut g = Graph::new(3);
        g.set_value(0, 1, 1);
        g.set_value(1, 2, 1);
        assert_eq!(g.bad_triple(), Some((0, 2, 1)));
        assert!(!g.is_cluster_graph());
    }

    #[test]
    fn zero_edges_count_as_present_in_bad_triples() {
        let mut g = Graph::new(3);
        g.set_value(0, 1, 0);
        g.set_value(1, 2, 3);
        assert!(!g.is_cluster_graph());
    }

    #[test]
    fn cluster_check_matches_bruteforce_scan() {
        let mut rng = XorShiftRng::seed_from_u64(0xC1A55);
        for _ in 0..300 {
            let n = rng.random_range(0..8);
            let mut g = random_graph(&mut rng, n, 1);
            if n > 3 && rng.random_bool(0.5) {
                g.unlink(rng.random_range(1..n));
            }
            assert_eq!(g.is_cluster_graph(), !brute_has_bad_triple(&g));
        }
    }

    #[test]
    fn removed_nodes_do_not_form_bad_triples() {
        let mut g = Graph::new(3);
        g.set_value(0, 1, 1);
        g.set_value(1, 2, 1);
        g.unlink(2);
        assert!(g.is_cluster_graph());
    }

    #[test]
    fn parse_reads_weighted_and_unweighted_lines() {
        let g = Graph::parse("4\n0 1\n1 2 5\n# comment\n\n3 2 -4\n").unwrap();
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.value(0, 1), 1);
        assert_eq!(g.value(1, 2), 5);
        assert_eq!(g.value(2, 3), -4);
        assert_eq!(g.value(0, 3), -1);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(Graph::parse(""), Err(GraphParseError::Empty)));
        assert!(matches!(
            Graph::parse("3 4\n"),
            Err(GraphParseError::InvalidHeader { .. })
        ));
        assert!(matches!(
            Graph::parse("3\n0 1 2 3\n"),
            Err(GraphParseError::InvalidLine { line_no: 2, .. })
        ));
        assert!(matches!(
            Graph::parse("3\n0 3\n"),
            Err(GraphParseError::NodeOutOfRange { node: 3, nodes: 3, .. })
        ));
        assert!(matches!(
            Graph::parse("3\n1 1\n"),
            Err(GraphParseError::SelfLoop { node: 1, .. })
        ));
        assert!(matches!(
            Graph::parse("3\n0 1 5000\n"),
            Err(GraphParseError::WeightOutOfRange { weight: 5000, .. })
        ));
    }

    #[test]
    fn write_then_parse_preserves_matrix() {
        let mut rng = XorShiftRng::seed_from_u64(0xF11E);
        let g = random_graph(&mut rng, 7, 4);
        let mut buf = Vec::new();
        g.write_to(&mut buf).unwrap();
        let parsed = Graph::read_from(buf.as_slice()).unwrap();
        assert_eq!(parsed, g);
    }

    #[test]
    fn fixed_sentinels_are_detected() {
        assert!(is_fixed(FORBIDDEN));
        assert!(is_fixed(PERSISTENT));
        assert!(is_fixed(FORBIDDEN + 3));
        assert!(!is_fixed(MAX_INPUT_WEIGHT));
        assert!(!is_fixed(0));
    }
}
