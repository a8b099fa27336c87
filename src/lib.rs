//! # Cluster Editing Solver
//!
//! Exact weighted cluster editing by fixed-parameter branch-and-bound.
//!
//! Given a complete graph whose pairs carry signed weights (positive: the nodes
//! belong together, negative: they belong apart), find a partition of the nodes
//! into clusters that minimises the total weight of disagreeing pairs.
//!
//! This crate provides:
//! - A packed symmetric weight matrix with a live-node list, so merged nodes
//!   drop out without reallocating.
//! - Reversible edits ([`changeset::ChangeSet`]) and a version tree of search
//!   states ([`state::GraphState`]) that shares one matrix among all states by
//!   rotating edits along the path to the state being examined.
//! - Four branching rules (2k, 1.82k, 2.62k, 3k), a data-reduction pass, and
//!   depth-first or best-first search under an iteratively raised budget.
//!
//! ## Quick Start
//!
//! ```
//! use clusteredit::prelude::*;
//!
//! // A path 0 - 1 - 2 costs one edit to become a cluster graph.
//! let graph = Graph::parse("3\n0 1\n1 2\n").unwrap();
//! let solution = solve(&graph, &SolverConfig::default()).unwrap();
//!
//! assert_eq!(solution.cost, 1);
//! assert_eq!(solution.clique_ids.len(), 3);
//! ```
//!
//! ## Choosing an Algorithm
//!
//! ```
//! use clusteredit::prelude::*;
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::SmallRng::seed_from_u64(7);
//! let params = PlantedParams { nodes: 12, cliques: 3, edits: 2, max_weight: 3 };
//! let graph = generate_planted(&mut rng, &params);
//!
//! let config = SolverConfig {
//!     algorithm: "2.62k".parse().unwrap(),
//!     strategy: Strategy::BestFirst,
//!     max_rounds: None,
//! };
//! let solution = solve(&graph, &config).unwrap();
//! println!("{}", ClusterReport::new(&graph, &solution.clique_ids));
//! ```
//!
//! ## Modules
//!
//! - [`graph`]: Weight matrix, live-node list and the plain-text graph format.
//! - [`changeset`]: Reversible merge/split/set-edge edits and their cost.
//! - [`state`]: Reference-counted version tree with path-reversal locking.
//! - [`kernel`]: Induced-cost data reduction with per-row max-heaps.
//! - [`branching`]: Branch-pair selection rules.
//! - [`exact`]: Exhaustive solver for tiny residual instances.
//! - [`algorithm`]: The four branching algorithms and their cost accounting.
//! - [`strategy`]: Depth-first and best-first job queues.
//! - [`scheduler`]: The per-round search loop.
//! - [`solve`]: Iterative-deepening driver.
//! - [`postprocess`]: Cluster ids, edit cost and the text report.
//! - [`generate`]: Planted random instances.
//! - [`source`]: File, stdin and random instance sources.
//! - [`error`]: Error types.
//!
//! ## Performance Notes
//!
//! - Weights are stored once per unordered pair (`n(n-1)/2` entries); a search
//!   never copies the matrix.
//! - Costs are exact integers. Budgets grow one accounting step per round, so the
//!   first solution found is optimal.
//! - For maximum performance, compile with: `RUSTFLAGS="-C target-cpu=native" cargo build --release`

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::inline_always)] // Intentional for hot-path code
#![allow(clippy::many_single_char_names)] // Graph-theoretic variable names
#![allow(clippy::needless_range_loop)] // Often clearer for matrix indexing
#![allow(clippy::doc_markdown)]
#![allow(clippy::multiple_crate_versions)] // Cargo.lock management is external

pub mod algorithm;
pub mod branching;
pub mod changeset;
pub mod error;
pub mod exact;
pub mod generate;
pub mod graph;
pub mod kernel;
pub mod postprocess;
pub mod scheduler;
pub mod solve;
pub mod source;
pub mod state;
pub mod strategy;

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::algorithm::Algorithm;
    pub use crate::error::{ConfigError, GraphParseError, SolveError};
    pub use crate::generate::{generate_planted, PlantedParams};
    pub use crate::graph::{Cost, Graph};
    pub use crate::postprocess::ClusterReport;
    pub use crate::solve::{solve, Solution, Solver, SolverConfig};
    pub use crate::source::{GraphSource, Origin};
    pub use crate::strategy::Strategy;
}
