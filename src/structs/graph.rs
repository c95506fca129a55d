// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Graph Module - *Weighted Directed Graph*
//!
//! Adjacency lists of `(target, cost)` edges stored as one offset partition over
//! flat target and cost buffers, the same layout as a `var * (node, cost)` array.
//!
//! [`Graph::shortest_paths`] returns a ragged `var * var * int64` array holding,
//! for every node, the cheapest path from the start node to it. Unreachable
//! nodes get an empty path.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::trace;

use crate::aliases::Result;
use crate::enums::error::NdError;
use crate::structs::ndarray::NdArray;

/// Directed graph with non-negative `f64` edge costs.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    offsets: Vec<usize>,
    targets: Vec<usize>,
    costs: Vec<f64>,
}

/// Heap entry ordered so that `BinaryHeap` pops the cheapest node first.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frontier {
    cost: f64,
    node: usize,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.total_cmp(&self.cost).then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Graph {
    /// Builds a graph from one edge list per node.
    ///
    /// Fails with a value error when an edge points outside `0..n` or has a
    /// negative or NaN cost.
    ///
    /// ```rust
    /// use ndufunc::Graph;
    ///
    /// let g = Graph::new(&[vec![(1, 1.2), (2, 4.4)], vec![(2, 2.2)], vec![(1, 2.3)]]).unwrap();
    /// assert_eq!(g.shortest_paths(0).unwrap().to_string(), "[[0], [0, 1], [0, 1, 2]]");
    /// ```
    pub fn new(adjacency: &[Vec<(usize, f64)>]) -> Result<Graph> {
        let n = adjacency.len();
        let mut offsets = Vec::with_capacity(n + 1);
        let mut targets = Vec::new();
        let mut costs = Vec::new();
        offsets.push(0);
        for (node, edges) in adjacency.iter().enumerate() {
            for &(target, cost) in edges {
                if target >= n {
                    return Err(NdError::value(format!(
                        "edge {node} -> {target} points outside the graph of {n} nodes"
                    )));
                }
                if cost.is_nan() || cost < 0.0 {
                    return Err(NdError::value(format!("edge {node} -> {target} has invalid cost {cost}")));
                }
                targets.push(target);
                costs.push(cost);
            }
            offsets.push(targets.len());
        }
        Ok(Graph { offsets, targets, costs })
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Outgoing edges of `node` as `(target, cost)`.
    pub fn edges(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (lo, hi) = (self.offsets[node], self.offsets[node + 1]);
        self.targets[lo..hi].iter().copied().zip(self.costs[lo..hi].iter().copied())
    }

    /// Cheapest distance and predecessor of every node reachable from `start`.
    fn dijkstra(&self, start: usize) -> (Vec<Option<f64>>, Vec<Option<usize>>) {
        let n = self.len();
        let mut dist: Vec<Option<f64>> = vec![None; n];
        let mut prev: Vec<Option<usize>> = vec![None; n];
        let mut heap = BinaryHeap::new();
        dist[start] = Some(0.0);
        heap.push(Frontier { cost: 0.0, node: start });
        while let Some(Frontier { cost, node }) = heap.pop() {
            if dist[node].is_some_and(|d| cost > d) {
                continue;
            }
            for (target, w) in self.edges(node) {
                let next = cost + w;
                if dist[target].is_none_or(|d| next < d) {
                    dist[target] = Some(next);
                    prev[target] = Some(node);
                    heap.push(Frontier { cost: next, node: target });
                }
            }
        }
        (dist, prev)
    }

    /// Cheapest distance from `start` to every node, `None` when unreachable.
    pub fn distances(&self, start: usize) -> Result<Vec<Option<f64>>> {
        self.check_node(start)?;
        Ok(self.dijkstra(start).0)
    }

    /// Shortest path from `start` to every node as a `var * var * int64` array.
    pub fn shortest_paths(&self, start: usize) -> Result<NdArray> {
        self.check_node(start)?;
        let (dist, prev) = self.dijkstra(start);
        let paths: Vec<Vec<i64>> = (0..self.len())
            .map(|target| {
                if dist[target].is_none() {
                    return Vec::new();
                }
                let mut path = vec![target as i64];
                let mut cur = target;
                while let Some(p) = prev[cur] {
                    path.push(p as i64);
                    cur = p;
                }
                path.reverse();
                path
            })
            .collect();
        trace!("shortest paths from {start}: {paths:?}");
        Ok(NdArray::from_lists(paths))
    }

    fn check_node(&self, node: usize) -> Result<()> {
        if node >= self.len() {
            return Err(NdError::value(format!("node {node} is outside the graph of {} nodes", self.len())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn graph2() -> Graph {
        Graph::new(&[
            vec![(1, 1.2), (2, 4.4)],
            vec![(2, 2.2)],
            vec![(1, 2.3)],
            vec![(2, 1.1)],
        ])
        .unwrap()
    }

    #[test]
    fn test_paths_from_every_start() {
        let g = graph2();
        let expected = [
            "[[0], [0, 1], [0, 1, 2], []]",
            "[[], [1], [1, 2], []]",
            "[[], [2, 1], [2], []]",
            "[[], [3, 2, 1], [3, 2], [3]]",
        ];
        for (start, want) in expected.iter().enumerate() {
            assert_eq!(g.shortest_paths(start).unwrap().to_string(), *want);
        }
    }

    #[test]
    fn test_distances() {
        let d = graph2().distances(0).unwrap();
        assert_eq!(d[0], Some(0.0));
        assert!((d[2].unwrap() - 3.4).abs() < 1e-12);
        assert_eq!(d[3], None);
    }

    #[test]
    fn test_out_of_range_edge() {
        let e = Graph::new(&[vec![(0, 1.2)], vec![(2, 2.2), (1, 0.1)]]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Value);
        assert_eq!(graph2().shortest_paths(4).unwrap_err().kind(), ErrorKind::Value);
    }

    #[test]
    fn test_negative_cost() {
        assert!(Graph::new(&[vec![(0, -1.0)]]).is_err());
    }
}
