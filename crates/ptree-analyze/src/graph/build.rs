//! Graph construction from a tree snapshot.
//!
//! # Overview
//!
//! [`TreeGraph`] is a [`petgraph`] directed graph whose nodes are node ids
//! and whose edges are `contains` relationships (`parent → child`). It is
//! built from a [`TreeSnapshot`] exactly as given: cycles, multiple parents
//! and stray edges are kept so the diagnostics can report them.
//!
//! ## Anomalies recorded at build time
//!
//! - Edges whose endpoints are not in the node list are not added; they are
//!   listed in [`TreeGraph::dangling_edges`].
//! - Repeated `(from, to)` pairs are added once; later copies are listed in
//!   [`TreeGraph::duplicate_edges`].
//! - Repeated node ids keep the first occurrence; later copies are listed in
//!   [`TreeGraph::duplicate_node_ids`].
//!
//! ## Content hash
//!
//! [`TreeGraph::content_hash`] is a BLAKE3 hash over the sorted node ids
//! and sorted edge pairs, so it is independent of input order.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use ptree_core::{ProductTree, TreeSnapshot};
use serde::Serialize;
use tracing::{debug, instrument};

// ---------------------------------------------------------------------------
// TreeGraph
// ---------------------------------------------------------------------------

/// An edge that references a node missing from the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DanglingEdge {
    pub edge_id: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug)]
pub struct TreeGraph {
    /// Directed graph: nodes = node ids, edges = `contains`.
    pub graph: DiGraph<String, ()>,
    /// Mapping from node id to petgraph `NodeIndex`.
    pub node_map: HashMap<String, NodeIndex>,
    /// BLAKE3 content hash of node ids and edges.
    pub content_hash: String,
    pub dangling_edges: Vec<DanglingEdge>,
    /// Ids of edges repeating an earlier `(from, to)` pair.
    pub duplicate_edges: Vec<String>,
    pub duplicate_node_ids: Vec<String>,
}

impl TreeGraph {
    /// Build from an edge-list snapshot. Never fails; anomalies are recorded.
    #[instrument(skip(snapshot), fields(nodes = snapshot.nodes.len(), edges = snapshot.edges.len()))]
    pub fn from_snapshot(snapshot: &TreeSnapshot) -> Self {
        let mut graph = DiGraph::<String, ()>::with_capacity(snapshot.nodes.len(), snapshot.edges.len());
        let mut node_map: HashMap<String, NodeIndex> = HashMap::with_capacity(snapshot.nodes.len());
        let mut duplicate_node_ids = Vec::new();

        for node in &snapshot.nodes {
            if node_map.contains_key(&node.id) {
                duplicate_node_ids.push(node.id.clone());
                continue;
            }
            let idx = graph.add_node(node.id.clone());
            node_map.insert(node.id.clone(), idx);
        }

        let mut dangling_edges = Vec::new();
        let mut duplicate_edges = Vec::new();
        for edge in &snapshot.edges {
            let (Some(&from), Some(&to)) = (node_map.get(&edge.from), node_map.get(&edge.to)) else {
                dangling_edges.push(DanglingEdge {
                    edge_id: edge.id.clone(),
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                });
                continue;
            };
            // Avoid duplicate edges (petgraph allows them by default).
            if graph.contains_edge(from, to) {
                duplicate_edges.push(edge.id.clone());
            } else {
                graph.add_edge(from, to, ());
            }
        }

        let content_hash = compute_hash(&graph);
        debug!(
            dangling = dangling_edges.len(),
            duplicates = duplicate_edges.len(),
            "built tree graph"
        );

        Self {
            graph,
            node_map,
            content_hash,
            dangling_edges,
            duplicate_edges,
            duplicate_node_ids,
        }
    }

    pub fn from_tree(tree: &ProductTree) -> Self {
        Self::from_snapshot(&tree.to_snapshot())
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    /// Node id label for `idx`.
    #[must_use]
    pub fn node_id(&self, idx: NodeIndex) -> &str {
        self.graph.node_weight(idx).map_or("", String::as_str)
    }

    /// Node indexes in snapshot order.
    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Targets of `idx`'s outgoing edges, in edge insertion order.
    #[must_use]
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.ordered_neighbors(idx, Direction::Outgoing)
    }

    /// Sources of `idx`'s incoming edges, in edge insertion order.
    #[must_use]
    pub fn parents(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.ordered_neighbors(idx, Direction::Incoming)
    }

    fn ordered_neighbors(&self, idx: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        // petgraph walks adjacency lists newest-first; sort by edge index.
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| {
                let other = if dir == Direction::Outgoing { e.target() } else { e.source() };
                (e.id().index(), other)
            })
            .collect();
        edges.sort_unstable_by_key(|(edge, _)| *edge);
        edges.into_iter().map(|(_, other)| other).collect()
    }

    #[must_use]
    pub fn in_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    #[must_use]
    pub fn out_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn compute_hash(graph: &DiGraph<String, ()>) -> String {
    let mut ids: Vec<&str> = graph.node_indices().map(|i| graph[i].as_str()).collect();
    ids.sort_unstable();
    let mut edges: Vec<(&str, &str)> = graph
        .raw_edges()
        .iter()
        .map(|e| (graph[e.source()].as_str(), graph[e.target()].as_str()))
        .collect();
    edges.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update(b"\x00");
    }
    hasher.update(b"\x01");
    for (from, to) in edges {
        hasher.update(from.as_bytes());
        hasher.update(b"\x00");
        hasher.update(to.as_bytes());
        hasher.update(b"\x00");
    }
    format!("blake3:{}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ptree_core::{Edge, Node, NodeType};

    /// Snapshot with nodes `ids` and `contains` edges `edges`.
    pub(crate) fn snapshot(ids: &[&str], edges: &[(&str, &str)]) -> TreeSnapshot {
        TreeSnapshot {
            nodes: ids
                .iter()
                .map(|id| Node::new(*id, NodeType::Goal, id.to_uppercase(), "2025-01-01T00:00:00Z"))
                .collect(),
            edges: edges
                .iter()
                .enumerate()
                .map(|(i, (from, to))| Edge::contains(format!("edge_{i}"), *from, *to))
                .collect(),
        }
    }

    #[test]
    fn builds_nodes_and_edges_in_order() {
        let g = TreeGraph::from_snapshot(&snapshot(&["a", "b", "c"], &[("a", "c"), ("a", "b")]));
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        let a = g.node_index("a").expect("a");
        let kids: Vec<_> = g.children(a).into_iter().map(|i| g.node_id(i)).collect();
        assert_eq!(kids, vec!["c", "b"]);
        assert_eq!(g.out_degree(a), 2);
        assert_eq!(g.in_degree(a), 0);
    }

    #[test]
    fn records_dangling_and_duplicate_edges() {
        let g = TreeGraph::from_snapshot(&snapshot(
            &["a", "b", "a"],
            &[("a", "b"), ("a", "b"), ("a", "ghost")],
        ));
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.duplicate_edges, vec!["edge_1"]);
        assert_eq!(g.dangling_edges.len(), 1);
        assert_eq!(g.dangling_edges[0].to, "ghost");
        assert_eq!(g.duplicate_node_ids, vec!["a"]);
    }

    #[test]
    fn content_hash_ignores_order() {
        let g1 = TreeGraph::from_snapshot(&snapshot(&["a", "b", "c"], &[("a", "b"), ("a", "c")]));
        let g2 = TreeGraph::from_snapshot(&snapshot(&["c", "b", "a"], &[("a", "c"), ("a", "b")]));
        let g3 = TreeGraph::from_snapshot(&snapshot(&["a", "b", "c"], &[("a", "b"), ("b", "c")]));
        assert_eq!(g1.content_hash, g2.content_hash);
        assert_ne!(g1.content_hash, g3.content_hash);
        assert!(g1.content_hash.starts_with("blake3:"));
    }
}
