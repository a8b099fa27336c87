//! Iterative-deepening driver: grow the budget until the search finds a clustering.

use crate::algorithm::Algorithm;
use crate::error::SolveError;
use crate::graph::{Cost, Graph};
use crate::postprocess::{cluster_count, edit_cost, enumerate_cliques};
use crate::scheduler::{Scheduler, SearchStats};
use crate::state::GraphState;
use crate::strategy::Strategy;
use tracing::{debug, info};

// ============================================================================
// Configuration
// ============================================================================

/// Solver configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolverConfig {
    /// Branching rule and cost accounting.
    pub algorithm: Algorithm,
    /// Job order within a budget round.
    pub strategy: Strategy,
    /// Give up after this many budget rounds (`None`: never).
    pub max_rounds: Option<u64>,
}

/// An optimal clustering and how it was found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    /// Weighted edit cost of the clustering on the input weights.
    pub cost: Cost,
    /// Cost in the algorithm's own accounting units.
    pub search_cost: Cost,
    /// Cluster id per input node.
    pub clique_ids: Vec<usize>,
    /// Number of clusters.
    pub cluster_count: usize,
    /// Budget rounds run, including the successful one.
    pub rounds: u64,
    /// Search counters summed over all rounds.
    pub stats: SearchStats,
}

// ============================================================================
// Driver
// ============================================================================

/// Reusable solver; one scheduler serves every instance.
pub struct Solver {
    config: SolverConfig,
    scheduler: Scheduler,
}

impl Solver {
    /// Creates a solver for `config`.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            scheduler: Scheduler::new(config.algorithm, config.strategy),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Finds a minimum-cost clustering of `graph`.
    ///
    /// Starts from budget `0` and raises it by the algorithm's step after every
    /// round that ends without a solution.
    ///
    /// # Errors
    /// Returns [`SolveError::RoundLimit`] if `max_rounds` is reached first.
    pub fn solve(&mut self, graph: &Graph) -> Result<Solution, SolveError> {
        if graph.node_count() == 0 {
            return Ok(Solution {
                cost: 0,
                search_cost: 0,
                clique_ids: Vec::new(),
                cluster_count: 0,
                rounds: 0,
                stats: SearchStats::default(),
            });
        }

        let accounting = self.config.algorithm.accounting();
        let root = GraphState::base(graph.clone(), 0);
        self.scheduler.take_stats();
        let mut rounds = 0;

        let best = loop {
            rounds += 1;
            debug!(round = rounds, budget = ?root.cost_left(), "starting budget round");
            self.scheduler.add_job(root.clone());
            self.scheduler.run();
            if let Some(best) = self.scheduler.reset_best() {
                break best;
            }
            if self.config.max_rounds.is_some_and(|max| rounds >= max) {
                self.scheduler.clear();
                return Err(SolveError::RoundLimit {
                    rounds,
                    budget: root.cost_left().unwrap_or(0),
                });
            }
            self.scheduler.inc_limit(&root);
        };

        let search_cost = best
            .cost()
            .ok_or_else(|| SolveError::Internal("best state was never locked".to_string()))?;
        let clique_ids = enumerate_cliques(&root, &best, accounting);
        if clique_ids.contains(&usize::MAX) {
            return Err(SolveError::Internal("node without a cluster".to_string()));
        }
        drop(best);

        // Locking the root rotates the input matrix back into place.
        let cost = edit_cost(root.lock(accounting).graph(), &clique_ids);
        let stats = self.scheduler.take_stats();
        let clusters = cluster_count(&clique_ids);
        info!(
            cost,
            search_cost,
            clusters,
            rounds,
            steps = stats.steps,
            "instance solved"
        );

        Ok(Solution {
            cost,
            search_cost,
            cluster_count: clusters,
            clique_ids,
            rounds,
            stats,
        })
    }
}

/// Solves one instance with a fresh [`Solver`].
///
/// # Errors
/// See [`Solver::solve`].
pub fn solve(graph: &Graph, config: &SolverConfig) -> Result<Solution, SolveError> {
    Solver::new(*config).solve(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::best_partition;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    fn config(algorithm: Algorithm, strategy: Strategy) -> SolverConfig {
        SolverConfig {
            algorithm,
            strategy,
            max_rounds: None,
        }
    }

    fn random_graph(rng: &mut XorShiftRng, n: usize, w: Cost) -> Graph {
        let mut g = Graph::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                g.set_value(i, j, rng.random_range(-w..=w));
            }
        }
        g
    }

    fn zero_pairs(g: &Graph) -> Cost {
        let n = g.node_count();
        (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .filter(|&(i, j)| g.value(i, j) == 0)
            .count() as Cost
    }

    fn same_cluster(ids: &[usize], a: usize, b: usize) -> bool {
        ids[a] == ids[b]
    }

    #[test]
    fn empty_graph_is_trivially_solved() {
        let solution = solve(&Graph::new(0), &SolverConfig::default()).unwrap();
        assert_eq!(solution.cost, 0);
        assert!(solution.clique_ids.is_empty());
        assert_eq!(solution.rounds, 0);
    }

    #[test]
    fn single_node_is_one_cluster() {
        let solution = solve(&Graph::new(1), &SolverConfig::default()).unwrap();
        assert_eq!(solution.clique_ids, vec![0]);
        assert_eq!(solution.cluster_count, 1);
        assert_eq!(solution.rounds, 1);
    }

    #[test]
    fn perfect_cluster_graph_succeeds_in_first_round() {
        let mut g = Graph::new(7);
        for (a, b) in [(0, 1), (0, 2), (1, 2), (3, 4), (5, 6)] {
            g.set_value(a, b, 3);
        }
        for alg in Algorithm::ALL {
            let solution = solve(&g, &config(alg, Strategy::DepthFirst)).unwrap();
            assert_eq!(solution.cost, 0, "{alg}");
            assert_eq!(solution.rounds, 1, "{alg}");
            assert_eq!(solution.cluster_count, 3, "{alg}");
            assert!(same_cluster(&solution.clique_ids, 0, 2));
            assert!(!same_cluster(&solution.clique_ids, 2, 3));
        }
    }

    #[test]
    fn fully_connected_two_triangles_stay_one_cluster() {
        // every pair present: already a single clique
        let mut g = Graph::new(6);
        for a in 0..6 {
            for b in (a + 1)..6 {
                let intra = (a < 3) == (b < 3);
                g.set_value(a, b, if intra { 3 } else { 1 });
            }
        }
        let solution = solve(&g, &SolverConfig::default()).unwrap();
        assert_eq!(solution.cost, 0);
        assert_eq!(solution.cluster_count, 1);
    }

    #[test]
    fn two_triangles_split_along_weak_matching() {
        let mut g = Graph::new(6);
        for a in 0..6 {
            for b in (a + 1)..6 {
                let intra = (a < 3) == (b < 3);
                let matched = b == a + 3;
                let value = if intra {
                    3
                } else if matched {
                    1
                } else {
                    -1
                };
                g.set_value(a, b, value);
            }
        }
        for alg in Algorithm::ALL {
            for strategy in Strategy::ALL {
                let solution = solve(&g, &config(alg, strategy)).unwrap();
                assert_eq!(solution.cost, 3, "{alg} {strategy}");
                assert_eq!(solution.cluster_count, 2, "{alg} {strategy}");
                let ids = &solution.clique_ids;
                assert!(same_cluster(ids, 0, 1) && same_cluster(ids, 1, 2));
                assert!(same_cluster(ids, 3, 4) && same_cluster(ids, 4, 5));
                assert!(!same_cluster(ids, 0, 3));
            }
        }
    }

    #[test]
    fn algorithms_agree_with_exhaustive_optimum() {
        let mut rng = XorShiftRng::seed_from_u64(0xC0FFEE);
        for _ in 0..25 {
            let n = rng.random_range(2..8);
            let g = random_graph(&mut rng, n, 3);
            let optimum = best_partition(&g).cost;
            for alg in Algorithm::ALL {
                let solution = solve(&g, &config(alg, Strategy::DepthFirst)).unwrap();
                assert_eq!(solution.cost, optimum, "{alg} on {g:?}");
                assert_eq!(edit_cost(&g, &solution.clique_ids), solution.cost);
            }
        }
    }

    #[test]
    fn search_cost_matches_accounting() {
        let mut rng = XorShiftRng::seed_from_u64(0xACC7);
        for _ in 0..25 {
            let n = rng.random_range(2..8);
            let g = random_graph(&mut rng, n, 2);
            for alg in Algorithm::ALL {
                let s = solve(&g, &config(alg, Strategy::BestFirst)).unwrap();
                let acc = alg.accounting();
                let zeros = if acc.bookkeeping > 0 { zero_pairs(&g) } else { 0 };
                assert_eq!(s.search_cost, acc.fixpoint * s.cost + zeros, "{alg}");
            }
        }
    }

    #[test]
    fn strategies_agree_on_cost() {
        let mut rng = XorShiftRng::seed_from_u64(0xBE57);
        for _ in 0..20 {
            let n = rng.random_range(3..10);
            let g = random_graph(&mut rng, n, 2);
            let depth = solve(&g, &config(Algorithm::TwoK, Strategy::DepthFirst)).unwrap();
            let best = solve(&g, &config(Algorithm::TwoK, Strategy::BestFirst)).unwrap();
            assert_eq!(depth.cost, best.cost);
        }
    }

    #[test]
    fn two_k_and_two_sixty_two_k_agree_up_to_ten_nodes() {
        let mut rng = XorShiftRng::seed_from_u64(0x2262);
        for _ in 0..15 {
            let n = rng.random_range(5..=10);
            let g = random_graph(&mut rng, n, 1);
            let a = solve(&g, &config(Algorithm::TwoK, Strategy::DepthFirst)).unwrap();
            let b = solve(&g, &config(Algorithm::TwoSixtyTwoK, Strategy::DepthFirst)).unwrap();
            assert_eq!(a.cost, b.cost);
        }
    }

    #[test]
    fn round_limit_is_reported() {
        let mut g = Graph::new(3);
        g.set_value(0, 1, 5);
        g.set_value(1, 2, 5);
        g.set_value(0, 2, -5);
        let cfg = SolverConfig {
            algorithm: Algorithm::ThreeK,
            strategy: Strategy::DepthFirst,
            max_rounds: Some(2),
        };
        assert_eq!(
            solve(&g, &cfg),
            Err(SolveError::RoundLimit {
                rounds: 2,
                budget: 1
            })
        );
    }

    #[test]
    fn solver_is_reusable_across_instances() {
        let mut solver = Solver::new(config(Algorithm::TwoSixtyTwoK, Strategy::BestFirst));
        let mut path = Graph::new(3);
        path.set_value(0, 1, 1);
        path.set_value(1, 2, 1);
        let first = solver.solve(&path).unwrap();
        let second = solver.solve(&path).unwrap();
        assert_eq!(first.cost, 1);
        assert_eq!(first.cost, second.cost);
        assert_eq!(first.stats, second.stats);
    }
}
