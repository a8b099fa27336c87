//! Search loop: a job queue, a branching algorithm and the best-known solution.

use crate::algorithm::Algorithm;
use crate::graph::Cost;
use crate::state::GraphState;
use crate::strategy::{JobQueue, Strategy};
use tracing::trace;

/// Counters collected while searching.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Jobs taken from the queue.
    pub steps: u64,
    /// Jobs that produced children.
    pub branches: u64,
    /// Jobs discarded for budget or for not beating the best solution.
    pub pruned: u64,
    /// Finished clusterings offered as best.
    pub candidates: u64,
    /// Forced merges and forbids applied by kernelization.
    pub kernel_reductions: u64,
}

/// Couples a [`Strategy`] with an [`Algorithm`] and tracks the best solution.
pub struct Scheduler {
    algorithm: Algorithm,
    strategy: Strategy,
    queue: JobQueue,
    best: Option<GraphState>,
    stats: SearchStats,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new(algorithm: Algorithm, strategy: Strategy) -> Self {
        Self {
            algorithm,
            strategy,
            queue: strategy.queue(),
            best: None,
            stats: SearchStats::default(),
        }
    }

    /// The branching algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The search order.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Queues a job.
    pub fn add_job(&mut self, job: GraphState) {
        self.queue.push(job);
    }

    /// Number of queued jobs.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Processes one job. Returns `false` if the queue was empty.
    pub fn step_one(&mut self) -> bool {
        let Some(job) = self.queue.pop() else {
            return false;
        };
        self.stats.steps += 1;
        trace!(step = self.stats.steps, pending = self.queue.len(), "step");
        self.algorithm.calculate(job, self);
        true
    }

    /// Processes jobs until the queue is empty.
    pub fn run(&mut self) {
        while self.step_one() {}
    }

    /// Drops all queued jobs.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// The best solution found so far.
    pub fn best(&self) -> Option<&GraphState> {
        self.best.as_ref()
    }

    /// Offers a finished clustering; it replaces the best if none is held or it is
    /// no more expensive. Returns whether it was taken.
    pub fn set_best(&mut self, candidate: GraphState) -> bool {
        self.stats.candidates += 1;
        let cost = candidate.cost().unwrap_or(Cost::MAX);
        let replace = self
            .best
            .as_ref()
            .map_or(true, |best| cost <= best.cost().unwrap_or(Cost::MAX));
        if replace {
            trace!(cost, "new best");
            self.best = Some(candidate);
        }
        replace
    }

    /// Takes the best solution out, leaving the slot empty.
    pub fn reset_best(&mut self) -> Option<GraphState> {
        self.best.take()
    }

    /// Raises the budget of `job` by the algorithm's step.
    pub fn inc_limit(&self, job: &GraphState) {
        self.algorithm.inc_limit(job);
    }

    /// Counters since creation or the last [`Scheduler::take_stats`].
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Returns the counters and resets them.
    pub fn take_stats(&mut self) -> SearchStats {
        std::mem::take(&mut self.stats)
    }

    /// `true` if a state of accumulated `cost` could still beat the best.
    pub(crate) fn improves(&self, cost: Cost) -> bool {
        self.best
            .as_ref()
            .map_or(true, |best| cost < best.cost().unwrap_or(Cost::MAX))
    }

    pub(crate) fn note_pruned(&mut self) {
        self.stats.pruned += 1;
    }

    pub(crate) fn note_branch(&mut self) {
        self.stats.branches += 1;
    }

    pub(crate) fn note_reductions(&mut self, reductions: u64) {
        self.stats.kernel_reductions += reductions;
    }
}
