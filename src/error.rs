//! Error types for graph input, configuration and the search driver.

use thiserror::Error;

/// Errors encountered while reading a weighted graph in the plain-text format.
#[derive(Debug, Error)]
pub enum GraphParseError {
    /// No header line was found.
    #[error("graph input is empty")]
    Empty,

    /// The first non-blank line is not a single node count.
    #[error("invalid header {line:?}: expected a single node count")]
    InvalidHeader {
        /// The offending header text.
        line: String,
    },

    /// A body line is neither `i j` nor `i j weight`.
    #[error("line {line_no}: expected `i j [weight]`, got {content:?}")]
    InvalidLine {
        /// 1-based line number.
        line_no: usize,
        /// The offending line text.
        content: String,
    },

    /// A node index is not below the declared node count.
    #[error("line {line_no}: node {node} out of range (graph has {nodes} nodes)")]
    NodeOutOfRange {
        /// 1-based line number.
        line_no: usize,
        /// Node index as written.
        node: usize,
        /// Declared node count.
        nodes: usize,
    },

    /// A line connects a node to itself.
    #[error("line {line_no}: self loop at node {node}")]
    SelfLoop {
        /// 1-based line number.
        line_no: usize,
        /// The node.
        node: usize,
    },

    /// A weight collides with the fixed-edge sentinel range.
    #[error("line {line_no}: weight {weight} outside supported range ±{max}")]
    WeightOutOfRange {
        /// 1-based line number.
        line_no: usize,
        /// Weight as written.
        weight: i64,
        /// Largest supported magnitude.
        max: i64,
    },

    /// Underlying reader failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors in solver or source configuration.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Unknown branching algorithm name.
    #[error("unknown algorithm {0:?} (available: 2k, 1.82k, 2.62k, 3k)")]
    UnknownAlgorithm(String),

    /// Unknown search strategy name.
    #[error("unknown strategy {0:?} (available: depth-first, best-first)")]
    UnknownStrategy(String),

    /// Malformed `nodes:cliques:noise:max_weight` spec.
    #[error("invalid random graph spec {spec:?}: {reason}")]
    InvalidRandomSpec {
        /// The spec as given.
        spec: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Errors returned by the search driver.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SolveError {
    /// The configured round cap was reached before any solution fit the budget.
    #[error("no solution within {rounds} budget rounds (last budget {budget})")]
    RoundLimit {
        /// Number of completed rounds.
        rounds: u64,
        /// Budget of the last round, in the algorithm's cost units.
        budget: i64,
    },

    /// A core invariant did not hold (programmer error).
    #[error("internal error: {0}")]
    Internal(String),
}
