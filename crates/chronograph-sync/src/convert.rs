//! Time conversion - cheapest path search over the sync graph
//!
//! Dijkstra from the source node, stopping as soon as the target is
//! settled. The mappings along the winning path are composed in traversal
//! order into a single affine mapping.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::{debug, trace};

use chronograph_core::{ChronoError, ChronoResult, NodeIndex, TimeMapping};

use crate::SyncGraph;

/// Cheapest route between two epoch nodes
#[derive(Clone, Debug, PartialEq)]
pub struct ConversionPath {
    /// Nodes visited, source first and target last
    pub nodes: Vec<NodeIndex>,
    /// Sum of edge costs
    pub cost: f64,
    /// Composite mapping from source clock to target clock
    pub mapping: TimeMapping,
}

impl ConversionPath {
    pub fn apply(&self, t: f64) -> f64 {
        self.mapping.apply(t)
    }

    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

/// Frontier entry for the heap, ordered so the cheapest pops first
#[derive(Clone, Copy, Debug)]
struct Frontier {
    cost: f64,
    node: NodeIndex,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl SyncGraph {
    /// Cheapest conversion path from `from` to `to`.
    ///
    /// Superseded handles are resolved to their replacement first. Returns
    /// `NoPath` when the two nodes are not known to be synchronized.
    pub fn conversion_path(&self, from: NodeIndex, to: NodeIndex) -> ChronoResult<ConversionPath> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;

        if source == target {
            return Ok(ConversionPath {
                nodes: vec![source],
                cost: 0.0,
                mapping: TimeMapping::identity(),
            });
        }

        let count = self.node_count();
        let mut dist = vec![f64::INFINITY; count];
        let mut prev: Vec<Option<NodeIndex>> = vec![None; count];
        let mut heap = BinaryHeap::new();

        dist[source.0] = 0.0;
        heap.push(Frontier {
            cost: 0.0,
            node: source,
        });

        while let Some(Frontier { cost, node }) = heap.pop() {
            if node == target {
                break;
            }
            if cost > dist[node.0] {
                continue;
            }
            for (next, edge) in self.neighbors(node) {
                let candidate = cost + edge.cost;
                if candidate < dist[next.0] {
                    dist[next.0] = candidate;
                    prev[next.0] = Some(node);
                    heap.push(Frontier {
                        cost: candidate,
                        node: next,
                    });
                }
            }
        }

        if dist[target.0].is_infinite() {
            debug!(from = %source, to = %target, "no synchronization path");
            return Err(self.no_path(source, target));
        }

        let mut nodes = vec![target];
        let mut current = target;
        while let Some(p) = prev[current.0] {
            nodes.push(p);
            current = p;
        }
        nodes.reverse();

        let mut mapping = TimeMapping::identity();
        for hop in nodes.windows(2) {
            let edge = self
                .edge(hop[0], hop[1])
                .ok_or_else(|| self.no_path(hop[0], hop[1]))?;
            mapping = mapping.checked_compose(&edge.mapping)?;
            trace!(from = %hop[0], to = %hop[1], origin = ?edge.origin, "path hop");
        }

        let path = ConversionPath {
            nodes,
            cost: dist[target.0],
            mapping,
        };
        debug!(
            from = %source,
            to = %target,
            hops = path.hops(),
            cost = path.cost,
            "conversion path found"
        );
        Ok(path)
    }

    /// Convert time `t` on `from`'s clock to `to`'s clock
    pub fn time_convert(&self, from: NodeIndex, to: NodeIndex, t: f64) -> ChronoResult<f64> {
        Ok(self.conversion_path(from, to)?.apply(t))
    }

    /// Convert many samples with a single path search
    pub fn time_convert_many(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        times: &[f64],
    ) -> ChronoResult<Vec<f64>> {
        let path = self.conversion_path(from, to)?;
        Ok(times.iter().map(|&t| path.apply(t)).collect())
    }

    fn no_path(&self, from: NodeIndex, to: NodeIndex) -> ChronoError {
        let describe = |i: NodeIndex| match self.node(i) {
            Some(node) => node.to_string(),
            None => i.to_string(),
        };
        ChronoError::NoPath {
            from: describe(from),
            to: describe(to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileMatch, InternalEdge};
    use chronograph_core::{ClockType, EpochNode};
    use proptest::prelude::*;

    fn local(owner: &str, epoch: &str) -> EpochNode {
        EpochNode::new(owner, epoch, ClockType::DevLocalTime)
    }

    fn chain(mappings: &[TimeMapping]) -> (SyncGraph, Vec<NodeIndex>) {
        let mut graph = SyncGraph::new();
        let nodes = (0..=mappings.len())
            .map(|i| local("dev", &format!("e{i}")))
            .collect();
        let edges = mappings
            .iter()
            .enumerate()
            .map(|(i, m)| InternalEdge::new(i, i + 1, 1.0, *m))
            .collect();
        let added = graph.manual_add_nodes(nodes, edges).unwrap();
        (graph, added)
    }

    #[test]
    fn test_frontier_pops_cheapest() {
        let mut heap = BinaryHeap::new();
        heap.push(Frontier { cost: 5.0, node: NodeIndex(0) });
        heap.push(Frontier { cost: 1.0, node: NodeIndex(1) });
        heap.push(Frontier { cost: 3.0, node: NodeIndex(2) });
        heap.push(Frontier { cost: 1.0, node: NodeIndex(3) });

        let order: Vec<usize> = std::iter::from_fn(|| heap.pop()).map(|f| f.node.0).collect();
        assert_eq!(order, vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_same_node_returns_input() {
        let mut graph = SyncGraph::new();
        let a = graph.add_epoch(local("dev", "e1")).unwrap();
        assert_eq!(graph.time_convert(a, a, 42.5).unwrap(), 42.5);
        assert_eq!(graph.conversion_path(a, a).unwrap().hops(), 0);
    }

    #[test]
    fn test_two_hop_composition() {
        let m1 = TimeMapping::new(2.0, 1.0).unwrap();
        let m2 = TimeMapping::new(0.5, -3.0).unwrap();
        let (graph, n) = chain(&[m1, m2]);

        let path = graph.conversion_path(n[0], n[2]).unwrap();
        assert_eq!(path.nodes, n);
        assert_eq!(path.cost, 2.0);
        for t in [-10.0, 0.0, 3.25, 1e4] {
            let expected = m2.apply(m1.apply(t));
            assert!((path.apply(t) - expected).abs() < 1e-9);
        }

        let back = graph.time_convert(n[2], n[0], path.apply(7.0)).unwrap();
        assert!((back - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_cheaper_path_preferred() {
        let mut graph = SyncGraph::new();
        let slow = TimeMapping::offset(100.0).unwrap();
        let fast = TimeMapping::offset(1.0).unwrap();
        let added = graph
            .manual_add_nodes(
                vec![local("dev", "a"), local("dev", "b"), local("dev", "c")],
                vec![
                    InternalEdge::new(0, 2, 10.0, slow),
                    InternalEdge::new(0, 1, 1.0, fast),
                    InternalEdge::new(1, 2, 1.0, fast),
                ],
            )
            .unwrap();

        let path = graph.conversion_path(added[0], added[2]).unwrap();
        assert_eq!(path.hops(), 2);
        assert_eq!(path.apply(0.0), 2.0);
    }

    #[test]
    fn test_no_path_names_both_nodes() {
        let mut graph = SyncGraph::new();
        let a = graph.add_epoch(local("dev1", "A")).unwrap();
        let c = graph
            .add_epoch(EpochNode::new("dev3", "C", ClockType::Utc))
            .unwrap();

        let err = graph.time_convert(a, c, 1.0).unwrap_err();
        assert!(err.is_connectivity());
        match err {
            ChronoError::NoPath { from, to } => {
                assert!(from.contains("dev1"));
                assert!(to.contains("dev3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_handle() {
        let graph = SyncGraph::new();
        let err = graph.time_convert(NodeIndex(0), NodeIndex(1), 0.0).unwrap_err();
        assert!(matches!(err, ChronoError::InvalidNodeIndex(_)));
    }

    #[test]
    fn test_superseded_handle_still_converts() {
        let mut graph = SyncGraph::new();
        graph.add_rule(FileMatch::new(1)).unwrap();
        let old = graph
            .add_epoch(local("dev1", "e1").with_files(["/f1"]))
            .unwrap();
        let b = graph
            .add_epoch(local("dev2", "e1").with_files(["/f1", "/f2"]))
            .unwrap();
        graph
            .add_epoch(local("dev1", "e1").with_files(["/f2"]))
            .unwrap();

        assert_eq!(graph.time_convert(old, b, 3.0).unwrap(), 3.0);
    }

    fn random_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize, f64, f64)>)> {
        (2usize..7).prop_flat_map(|n| {
            let edge = (0..n, 1..n, 0u8..20, -50i32..50)
                .prop_map(move |(from, step, cost, shift)| {
                    (from, (from + step) % n, f64::from(cost), f64::from(shift))
                });
            (Just(n), prop::collection::vec(edge, 0..12))
        })
    }

    proptest! {
        #[test]
        fn prop_path_cost_is_minimal((n, edges) in random_graph()) {
            let mut graph = SyncGraph::new();
            let nodes = (0..n).map(|i| local("dev", &format!("e{i}"))).collect();
            let internal = edges
                .iter()
                .map(|&(from, to, cost, shift)| {
                    InternalEdge::new(from, to, cost, TimeMapping::offset(shift).unwrap())
                })
                .collect();
            let added = graph.manual_add_nodes(nodes, internal).unwrap();

            // Floyd-Warshall over the undirected edge list
            let mut best = vec![vec![f64::INFINITY; n]; n];
            for (i, row) in best.iter_mut().enumerate() {
                row[i] = 0.0;
            }
            for &(from, to, cost, _) in &edges {
                best[from][to] = best[from][to].min(cost);
                best[to][from] = best[to][from].min(cost);
            }
            for k in 0..n {
                for i in 0..n {
                    for j in 0..n {
                        let through = best[i][k] + best[k][j];
                        if through < best[i][j] {
                            best[i][j] = through;
                        }
                    }
                }
            }

            let target = n - 1;
            match graph.conversion_path(added[0], added[target]) {
                Ok(path) => {
                    prop_assert_eq!(path.cost, best[0][target]);
                    let shifts: f64 = path
                        .nodes
                        .windows(2)
                        .map(|hop| graph.edge(hop[0], hop[1]).unwrap().mapping.shift())
                        .sum();
                    prop_assert_eq!(path.apply(0.0), shifts);
                }
                Err(err) => {
                    prop_assert!(err.is_connectivity());
                    prop_assert!(best[0][target].is_infinite());
                }
            }
        }
    }

    #[test]
    fn test_time_convert_many() {
        let (graph, n) = chain(&[TimeMapping::new(2.0, 0.0).unwrap()]);
        let out = graph.time_convert_many(n[0], n[1], &[0.0, 1.0, 2.5]).unwrap();
        assert_eq!(out, vec![0.0, 2.0, 5.0]);
    }
}
