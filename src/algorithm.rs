//! Branching algorithms: cost accounting plus the per-job `calculate` step.

use crate::branching::{
    conflict_pair, conflict_triple, min_branching_pair, rule_b_pair, EXACT_NODE_LIMIT,
    RULE_A_THRESHOLD,
};
use crate::changeset::{Accounting, ChangeSet};
use crate::error::ConfigError;
use crate::exact::best_partition;
use crate::graph::{Cost, Graph};
use crate::kernel::kernelize;
use crate::scheduler::Scheduler;
use crate::state::GraphState;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// Branching rule together with its cost accounting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Minimum branching number over merge/forbid pairs, with kernelization.
    #[default]
    TwoK,
    /// 2k accounting with a triangle rule and exhaustive small instances; no kernel.
    OneEightyTwoK,
    /// First conflict triple, two-way merge/forbid branch, with kernelization.
    TwoSixtyTwoK,
    /// First conflict triple, three-way branch; no kernel.
    ThreeK,
}

/// What `calculate` decided for a locked state.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Decision {
    /// Merge-or-forbid on a pair.
    Pair(usize, usize),
    /// Forbid `(u, v)`, or merge it and then forbid or merge `w` as well.
    Triple(usize, usize, usize),
    /// A single child reached by a fixed edit sequence.
    Chain(Vec<ChangeSet>),
    /// No branch point: a finished clustering.
    Terminal,
}

impl Algorithm {
    /// Every algorithm, in CLI listing order.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::TwoK,
        Algorithm::OneEightyTwoK,
        Algorithm::TwoSixtyTwoK,
        Algorithm::ThreeK,
    ];

    /// Name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::TwoK => "2k",
            Algorithm::OneEightyTwoK => "1.82k",
            Algorithm::TwoSixtyTwoK => "2.62k",
            Algorithm::ThreeK => "3k",
        }
    }

    /// Accounting constants used when locking states.
    pub fn accounting(self) -> Accounting {
        match self {
            Algorithm::TwoK | Algorithm::OneEightyTwoK => Accounting::DOUBLED,
            Algorithm::TwoSixtyTwoK | Algorithm::ThreeK => Accounting::EXACT,
        }
    }

    /// Budget increase per iterative-deepening round.
    pub fn limit_step(self) -> Cost {
        self.accounting().fixpoint
    }

    /// Whether jobs are kernelized before branching.
    pub fn kernelizes(self) -> bool {
        matches!(self, Algorithm::TwoK | Algorithm::TwoSixtyTwoK)
    }

    /// Raises the remaining budget of `job` by one round.
    pub fn inc_limit(self, job: &GraphState) {
        job.add_budget(self.limit_step());
    }

    /// Processes one job: prune, kernelize, then branch or offer it as a solution.
    pub(crate) fn calculate(self, job: GraphState, scheduler: &mut Scheduler) {
        let accounting = self.accounting();
        let (cost, cost_left) = {
            let guard = job.lock(accounting);
            (guard.cost(), guard.cost_left())
        };
        if cost_left < 0 || !scheduler.improves(cost) {
            trace!(cost, cost_left, "pruned before branching");
            scheduler.note_pruned();
            return;
        }

        let state = if self.kernelizes() {
            let reduced = kernelize(job, accounting);
            scheduler.note_reductions(reduced.reductions);
            reduced.state
        } else {
            job
        };

        let decision = {
            let guard = state.lock(accounting);
            if guard.cost_left() < 0 || !scheduler.improves(guard.cost()) {
                trace!(cost = guard.cost(), "pruned after kernelization");
                scheduler.note_pruned();
                return;
            }
            self.select(guard.graph())
        };

        match decision {
            Decision::Pair(a, b) => {
                scheduler.note_branch();
                scheduler.add_job(state.derive(ChangeSet::merge(a, b)));
                scheduler.add_job(state.derive(ChangeSet::forbid(a, b)));
            }
            Decision::Triple(u, v, w) => {
                scheduler.note_branch();
                let rep = u.min(v);
                let merged = state.derive(ChangeSet::merge(u, v));
                scheduler.add_job(state.derive(ChangeSet::forbid(u, v)));
                scheduler.add_job(merged.derive(ChangeSet::forbid(rep, w)));
                scheduler.add_job(merged.derive(ChangeSet::merge(rep, w)));
            }
            Decision::Chain(changes) => {
                scheduler.note_branch();
                let child = changes
                    .into_iter()
                    .fold(state, |parent, change| parent.derive(change));
                scheduler.add_job(child);
            }
            Decision::Terminal => {
                scheduler.set_best(state);
            }
        }
    }

    fn select(self, graph: &Graph) -> Decision {
        match self {
            Algorithm::TwoK => match min_branching_pair(graph, self.accounting()) {
                Some(choice) => Decision::Pair(choice.a, choice.b),
                None => Decision::Terminal,
            },
            Algorithm::OneEightyTwoK => {
                let Some(choice) = min_branching_pair(graph, self.accounting()) else {
                    return Decision::Terminal;
                };
                if choice.number < RULE_A_THRESHOLD {
                    return Decision::Pair(choice.a, choice.b);
                }
                if let Some((x, y)) = rule_b_pair(graph) {
                    return Decision::Pair(x, y);
                }
                if graph.live_count() <= EXACT_NODE_LIMIT {
                    let changes = best_partition(graph).changesets();
                    if !changes.is_empty() {
                        return Decision::Chain(changes);
                    }
                }
                Decision::Pair(choice.a, choice.b)
            }
            Algorithm::TwoSixtyTwoK => match conflict_pair(graph) {
                Some((a, c)) => Decision::Pair(a, c),
                None => Decision::Terminal,
            },
            Algorithm::ThreeK => match conflict_triple(graph) {
                Some((u, v, w)) => Decision::Triple(u, v, w),
                None => Decision::Terminal,
            },
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownAlgorithm(s.to_string()))
    }
}
