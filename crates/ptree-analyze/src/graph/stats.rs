//! Structural statistics for a product tree graph.
//!
//! # Statistics Provided
//!
//! - **node_count** / **edge_count**: size of the graph as built.
//! - **root_count**: nodes with no incoming edge (orphans included).
//! - **leaf_count**: nodes with no outgoing edge (orphans included).
//! - **nodes_with_children**: nodes with at least one outgoing edge.
//! - **max_depth**: deepest level reachable from a root, roots at 0.
//!   Levels are breadth-first, so in a node with several parents the
//!   shallowest path wins.
//! - **average_fanout**: mean child count over nodes that have children.
//! - **max_in_degree** / **max_out_degree**: largest parent / child counts.
//! - **weakly_connected_components**: disjoint subtrees when edge direction
//!   is ignored.
//! - **orphan_count**: nodes with no edges at all.
//! - **cycle_count**: cycle paths found by [`crate::graph::cycles::detect_cycles`].

use std::collections::{HashSet, VecDeque};

use petgraph::algo::connected_components;
use serde::Serialize;

use crate::graph::build::TreeGraph;
use crate::graph::cycles::detect_cycles;

// ---------------------------------------------------------------------------
// GraphStats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub root_count: usize,
    pub leaf_count: usize,
    pub nodes_with_children: usize,
    pub max_depth: usize,
    pub average_fanout: f64,
    pub max_in_degree: usize,
    pub max_out_degree: usize,
    pub weakly_connected_components: usize,
    pub orphan_count: usize,
    pub cycle_count: usize,
}

impl GraphStats {
    #[must_use]
    pub fn from_graph(graph: &TreeGraph) -> Self {
        let indices: Vec<_> = graph.indices().collect();
        let in_degrees: Vec<usize> = indices.iter().map(|&i| graph.in_degree(i)).collect();
        let out_degrees: Vec<usize> = indices.iter().map(|&i| graph.out_degree(i)).collect();

        let root_count = in_degrees.iter().filter(|&&d| d == 0).count();
        let leaf_count = out_degrees.iter().filter(|&&d| d == 0).count();
        let orphan_count = in_degrees
            .iter()
            .zip(&out_degrees)
            .filter(|&(&i, &o)| i == 0 && o == 0)
            .count();

        Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            root_count,
            leaf_count,
            nodes_with_children: out_degrees.len() - leaf_count,
            max_depth: compute_depth(graph),
            average_fanout: compute_average_fanout(graph),
            max_in_degree: in_degrees.iter().copied().max().unwrap_or(0),
            max_out_degree: out_degrees.iter().copied().max().unwrap_or(0),
            weakly_connected_components: connected_components(&graph.graph),
            orphan_count,
            cycle_count: detect_cycles(graph).len(),
        }
    }
}

/// Deepest breadth-first level below any root (roots are level 0).
///
/// Nodes reachable only through a cycle (no root above them) do not count.
/// An empty graph has depth 0.
#[must_use]
pub fn compute_depth(graph: &TreeGraph) -> usize {
    let mut seen = HashSet::new();
    let mut queue: VecDeque<_> = graph
        .indices()
        .filter(|&i| graph.in_degree(i) == 0)
        .map(|i| (i, 0usize))
        .collect();
    let mut max_depth = 0;
    while let Some((idx, depth)) = queue.pop_front() {
        if !seen.insert(idx) {
            continue;
        }
        max_depth = max_depth.max(depth);
        for child in graph.children(idx) {
            if !seen.contains(&child) {
                queue.push_back((child, depth + 1));
            }
        }
    }
    max_depth
}

/// Mean number of children among nodes with at least one child.
///
/// `0.0` when no node has children.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_average_fanout(graph: &TreeGraph) -> f64 {
    let (parents, children) = graph
        .indices()
        .map(|i| graph.out_degree(i))
        .filter(|&d| d > 0)
        .fold((0usize, 0usize), |(p, c), d| (p + 1, c + d));
    if parents == 0 {
        0.0
    } else {
        children as f64 / parents as f64
    }
}
