//! Planted cluster-editing instances.
//!
//! A perfect cluster graph is built over a random assignment of nodes to cliques,
//! then a number of pairs are flipped against their clique membership. The
//! planted clustering costs at most the weight of those flips, which gives a
//! known upper bound for benchmarking.

use crate::error::ConfigError;
use crate::graph::{choose2, pair_index, Cost, Graph, MAX_INPUT_WEIGHT};
use rand::Rng;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Parameters
// ============================================================================

/// Shape of a planted instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlantedParams {
    /// Number of nodes.
    pub nodes: usize,
    /// Number of planted cliques (nodes are dealt round-robin before shuffling).
    pub cliques: usize,
    /// Number of pairs flipped against the planted clustering.
    pub edits: usize,
    /// Pair weights are drawn from `1..=max_weight` before signing.
    pub max_weight: Cost,
}

impl Default for PlantedParams {
    fn default() -> Self {
        Self {
            nodes: 100,
            cliques: 10,
            edits: 7,
            max_weight: 3,
        }
    }
}

impl fmt::Display for PlantedParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.nodes, self.cliques, self.edits, self.max_weight
        )
    }
}

impl FromStr for PlantedParams {
    type Err = ConfigError;

    /// Parses `nodes:cliques:edits:max_weight`. Trailing fields may be omitted
    /// and keep their defaults; an empty string yields the defaults.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ConfigError::InvalidRandomSpec {
            spec: s.to_string(),
            reason,
        };

        let mut params = PlantedParams::default();
        let spec = s.trim();
        if spec.is_empty() {
            return Ok(params);
        }

        let fields: Vec<&str> = spec.split(':').map(str::trim).collect();
        if fields.len() > 4 {
            return Err(invalid(format!("expected at most 4 fields, got {}", fields.len())));
        }
        let number = |idx: usize, name: &str| -> Result<Option<usize>, ConfigError> {
            fields
                .get(idx)
                .map(|field| {
                    field
                        .parse::<usize>()
                        .map_err(|e| invalid(format!("{name} {field:?}: {e}")))
                })
                .transpose()
        };

        if let Some(nodes) = number(0, "nodes")? {
            params.nodes = nodes;
        }
        if let Some(cliques) = number(1, "cliques")? {
            params.cliques = cliques;
        }
        if let Some(edits) = number(2, "edits")? {
            params.edits = edits;
        }
        if let Some(weight) = number(3, "max_weight")? {
            params.max_weight = Cost::try_from(weight).unwrap_or(Cost::MAX);
        }

        if params.cliques == 0 {
            return Err(invalid("cliques must be at least 1".to_string()));
        }
        if !(1..=MAX_INPUT_WEIGHT).contains(&params.max_weight) {
            return Err(invalid(format!(
                "max_weight must be in 1..={MAX_INPUT_WEIGHT}"
            )));
        }
        Ok(params)
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Builds a planted instance.
///
/// Flips are only applied to pairs still agreeing with the planted clustering,
/// and their number is capped at the number of pairs.
pub fn generate_planted<R: Rng + ?Sized>(rng: &mut R, params: &PlantedParams) -> Graph {
    let n = params.nodes;
    let cliques = params.cliques.max(1);
    let max_weight = params.max_weight.clamp(1, MAX_INPUT_WEIGHT);

    let mut clique_of: Vec<usize> = (0..n).map(|i| i % cliques).collect();
    for i in (1..n).rev() {
        let j = rng.random_range(0..=i);
        clique_of.swap(i, j);
    }

    let mut graph = Graph::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let weight = rng.random_range(1..=max_weight);
            let value = if clique_of[i] == clique_of[j] { weight } else { -weight };
            graph.set_value(i, j, value);
        }
    }

    let mut flipped = vec![false; choose2(n)];
    let mut remaining = params.edits.min(flipped.len());
    let noise = max_weight / 2;
    while remaining > 0 {
        let i = rng.random_range(0..n);
        let j = rng.random_range(0..n);
        if i == j {
            continue;
        }
        let slot = pair_index(i, j);
        if flipped[slot] {
            continue;
        }
        flipped[slot] = true;
        let value = if clique_of[i] == clique_of[j] { -noise } else { noise };
        graph.set_value(i, j, value);
        remaining -= 1;
    }

    graph
}
