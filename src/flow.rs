// 🔀 Transaction Flow - which transactions did money move on to?
//
// An explicit From→To edge list between transactions, walked breadth-first.
// Cycles are allowed in the data; the visited set guarantees every
// transaction is yielded at most once and the walk terminates.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// One hop of money from a transaction to a follow-up transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowEdge {
    pub from_transaction_id: i64,
    pub to_transaction_id: i64,
}

impl FlowEdge {
    pub fn new(from_transaction_id: i64, to_transaction_id: i64) -> Self {
        FlowEdge {
            from_transaction_id,
            to_transaction_id,
        }
    }
}

/// A reachable transaction and its hop distance from the start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    pub transaction_id: i64,
    pub depth: usize,
}

pub struct TransactionFlow {
    /// Outgoing edges per transaction, in edge-list order
    adjacency: HashMap<i64, Vec<i64>>,
    edge_count: usize,
}

impl TransactionFlow {
    pub fn new(edges: &[FlowEdge]) -> Self {
        let mut adjacency: HashMap<i64, Vec<i64>> = HashMap::new();
        for edge in edges {
            adjacency
                .entry(edge.from_transaction_id)
                .or_default()
                .push(edge.to_transaction_id);
        }

        TransactionFlow {
            adjacency,
            edge_count: edges.len(),
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Lazy breadth-first walk starting at (and including) `start`
    pub fn reachable_from(&self, start: i64) -> Reachable<'_> {
        let mut visited = HashSet::new();
        visited.insert(start);

        let mut queue = VecDeque::new();
        queue.push_back(FlowStep {
            transaction_id: start,
            depth: 0,
        });

        Reachable {
            flow: self,
            queue,
            visited,
        }
    }
}

/// Iterator returned by `TransactionFlow::reachable_from`
pub struct Reachable<'a> {
    flow: &'a TransactionFlow,
    queue: VecDeque<FlowStep>,
    visited: HashSet<i64>,
}

impl Iterator for Reachable<'_> {
    type Item = FlowStep;

    fn next(&mut self) -> Option<FlowStep> {
        let step = self.queue.pop_front()?;

        if let Some(targets) = self.flow.adjacency.get(&step.transaction_id) {
            for &target in targets {
                if self.visited.insert(target) {
                    self.queue.push_back(FlowStep {
                        transaction_id: target,
                        depth: step.depth + 1,
                    });
                }
            }
        }

        Some(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(steps: impl Iterator<Item = FlowStep>) -> Vec<(i64, usize)> {
        steps.map(|s| (s.transaction_id, s.depth)).collect()
    }

    #[test]
    fn test_breadth_first_order_with_depth() {
        let flow = TransactionFlow::new(&[
            FlowEdge::new(1, 2),
            FlowEdge::new(1, 3),
            FlowEdge::new(2, 4),
            FlowEdge::new(3, 4),
            FlowEdge::new(4, 5),
        ]);

        assert_eq!(
            ids(flow.reachable_from(1)),
            vec![(1, 0), (2, 1), (3, 1), (4, 2), (5, 3)]
        );
        assert_eq!(flow.edge_count(), 5);
    }

    #[test]
    fn test_cycles_terminate() {
        let flow = TransactionFlow::new(&[
            FlowEdge::new(1, 2),
            FlowEdge::new(2, 3),
            FlowEdge::new(3, 1),
            FlowEdge::new(3, 3),
        ]);

        assert_eq!(ids(flow.reachable_from(2)), vec![(2, 0), (3, 1), (1, 2)]);
    }

    #[test]
    fn test_unknown_start_yields_only_itself() {
        let flow = TransactionFlow::new(&[FlowEdge::new(1, 2)]);
        assert_eq!(ids(flow.reachable_from(99)), vec![(99, 0)]);
    }

    #[test]
    fn test_walk_is_lazy() {
        // A long chain; taking two steps must not require walking it all
        let edges: Vec<FlowEdge> = (0..10_000).map(|i| FlowEdge::new(i, i + 1)).collect();
        let flow = TransactionFlow::new(&edges);

        let mut walk = flow.reachable_from(0);
        assert_eq!(walk.next().map(|s| s.transaction_id), Some(0));
        assert_eq!(walk.next().map(|s| s.transaction_id), Some(1));
        assert_eq!(walk.queue.len(), 1);
    }
}
