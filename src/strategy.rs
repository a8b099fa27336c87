//! Search order: depth-first stack or best-first priority queue.

use crate::error::ConfigError;
use crate::graph::Cost;
use crate::state::GraphState;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::str::FromStr;

/// Order in which pending jobs are processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Last in, first out.
    #[default]
    DepthFirst,
    /// Cheapest accumulated cost first.
    BestFirst,
}

impl Strategy {
    /// Every strategy, in CLI listing order.
    pub const ALL: [Strategy; 2] = [Strategy::DepthFirst, Strategy::BestFirst];

    /// Name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Strategy::DepthFirst => "depth-first",
            Strategy::BestFirst => "best-first",
        }
    }

    pub(crate) fn queue(self) -> JobQueue {
        match self {
            Strategy::DepthFirst => JobQueue::Stack(Vec::new()),
            Strategy::BestFirst => JobQueue::Heap {
                heap: BinaryHeap::new(),
                pushed: 0,
            },
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownStrategy(s.to_string()))
    }
}

/// Heap entry; the priority is fixed when the job is queued.
pub(crate) struct Queued {
    priority: Cost,
    seq: u64,
    state: GraphState,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // BinaryHeap pops the greatest: lowest priority first, newest first on ties.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Pending jobs of one scheduler.
pub(crate) enum JobQueue {
    Stack(Vec<GraphState>),
    Heap { heap: BinaryHeap<Queued>, pushed: u64 },
}

impl JobQueue {
    /// Queues `state`, ordered by its cost (or its parent's, if not yet locked).
    pub(crate) fn push(&mut self, state: GraphState) {
        match self {
            JobQueue::Stack(stack) => stack.push(state),
            JobQueue::Heap { heap, pushed } => {
                *pushed += 1;
                heap.push(Queued {
                    priority: state.estimated_cost(),
                    seq: *pushed,
                    state,
                });
            }
        }
    }

    pub(crate) fn pop(&mut self) -> Option<GraphState> {
        match self {
            JobQueue::Stack(stack) => stack.pop(),
            JobQueue::Heap { heap, .. } => heap.pop().map(|queued| queued.state),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            JobQueue::Stack(stack) => stack.len(),
            JobQueue::Heap { heap, .. } => heap.len(),
        }
    }

    pub(crate) fn clear(&mut self) {
        match self {
            JobQueue::Stack(stack) => stack.clear(),
            JobQueue::Heap { heap, .. } => heap.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::{Accounting, ChangeSet};
    use crate::graph::Graph;

    fn costed_children(root: &GraphState, weights: &[i64]) -> Vec<GraphState> {
        // child i forbids an edge of weight weights[i], so its cost is that weight
        weights
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let child = root.derive(ChangeSet::forbid(0, i + 1));
                child.lock(Accounting::EXACT);
                child
            })
            .collect()
    }

    fn star(weights: &[i64]) -> Graph {
        let mut g = Graph::new(weights.len() + 1);
        for (i, &w) in weights.iter().enumerate() {
            g.set_value(0, i + 1, w);
        }
        g
    }

    #[test]
    fn names_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.name().parse::<Strategy>(), Ok(strategy));
        }
        assert!(matches!(
            "random".parse::<Strategy>(),
            Err(ConfigError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn depth_first_is_lifo() {
        let weights = [3, 1, 2];
        let root = GraphState::base(star(&weights), 10);
        let children = costed_children(&root, &weights);
        let mut queue = Strategy::DepthFirst.queue();
        for child in &children {
            queue.push(child.clone());
        }
        assert_eq!(queue.len(), 3);
        for child in children.iter().rev() {
            assert!(queue.pop().unwrap().ptr_eq(child));
        }
        assert!(queue.pop().is_none());
    }

    #[test]
    fn best_first_pops_cheapest() {
        let weights = [3, 1, 2, 1];
        let root = GraphState::base(star(&weights), 10);
        let children = costed_children(&root, &weights);
        let mut queue = Strategy::BestFirst.queue();
        for child in &children {
            queue.push(child.clone());
        }
        let order: Vec<i64> = std::iter::from_fn(|| queue.pop())
            .map(|s| s.cost().unwrap())
            .collect();
        assert_eq!(order, vec![1, 1, 2, 3]);
    }

    #[test]
    fn best_first_prefers_newest_on_ties() {
        let root = GraphState::base(star(&[1, 1]), 10);
        let a = root.derive(ChangeSet::forbid(0, 1));
        let b = root.derive(ChangeSet::forbid(0, 2));
        let mut queue = Strategy::BestFirst.queue();
        queue.push(a.clone());
        queue.push(b.clone());
        assert!(queue.pop().unwrap().ptr_eq(&b));
        assert!(queue.pop().unwrap().ptr_eq(&a));
    }

    #[test]
    fn clear_drops_references() {
        let root = GraphState::base(Graph::new(3), 0);
        let mut queue = Strategy::BestFirst.queue();
        queue.push(root.derive(ChangeSet::forbid(0, 1)));
        assert_eq!(root.references(), 2);
        queue.clear();
        assert_eq!(queue.len(), 0);
        assert_eq!(root.references(), 1);
    }
}
