//! Node-level findings over a tree graph.
//!
//! - [`find_duplicate_titles`]: titles shared by two or more nodes.
//! - [`find_roots`]: nodes with no incoming edge.
//! - [`find_orphans`]: nodes with no edges at all.
//! - [`dependency_outliers`]: nodes whose edge counts exceed thresholds.
//!
//! A node with children but no parent is a root, not an orphan.

use std::collections::{BTreeMap, BTreeSet};

use ptree_core::TreeSnapshot;
use serde::Serialize;

use crate::graph::build::TreeGraph;

/// Title → ids for every non-empty title carried by two or more nodes.
///
/// Titles are compared exactly: case and surrounding whitespace count.
#[must_use]
pub fn find_duplicate_titles(snapshot: &TreeSnapshot) -> BTreeMap<String, BTreeSet<String>> {
    let mut by_title: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for node in &snapshot.nodes {
        if node.title.is_empty() {
            continue;
        }
        by_title
            .entry(node.title.clone())
            .or_default()
            .insert(node.id.clone());
    }
    by_title.retain(|_, ids| ids.len() > 1);
    by_title
}

/// Ids of nodes with no incoming edge, in snapshot order.
#[must_use]
pub fn find_roots(graph: &TreeGraph) -> Vec<String> {
    graph
        .indices()
        .filter(|&i| graph.in_degree(i) == 0)
        .map(|i| graph.node_id(i).to_string())
        .collect()
}

/// Ids of nodes with neither incoming nor outgoing edges, in snapshot order.
#[must_use]
pub fn find_orphans(graph: &TreeGraph) -> Vec<String> {
    graph
        .indices()
        .filter(|&i| graph.in_degree(i) == 0 && graph.out_degree(i) == 0)
        .map(|i| graph.node_id(i).to_string())
        .collect()
}

/// A node flagged for unusually many incoming or outgoing edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outlier {
    pub id: String,
    pub in_degree: usize,
    pub out_degree: usize,
    pub too_many_parents: bool,
    pub too_many_children: bool,
}

impl Outlier {
    /// Human-readable flag, e.g. `n1: high dependency (3 incoming)`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut reasons = Vec::new();
        if self.too_many_parents {
            reasons.push(format!("{} incoming", self.in_degree));
        }
        if self.too_many_children {
            reasons.push(format!("{} outgoing", self.out_degree));
        }
        format!("{}: high dependency ({})", self.id, reasons.join(", "))
    }
}

/// Nodes with `in_degree > in_threshold` or `out_degree > out_threshold`,
/// in snapshot order.
#[must_use]
pub fn dependency_outliers(graph: &TreeGraph, in_threshold: usize, out_threshold: usize) -> Vec<Outlier> {
    graph
        .indices()
        .filter_map(|i| {
            let in_degree = graph.in_degree(i);
            let out_degree = graph.out_degree(i);
            let too_many_parents = in_degree > in_threshold;
            let too_many_children = out_degree > out_threshold;
            (too_many_parents || too_many_children).then(|| Outlier {
                id: graph.node_id(i).to_string(),
                in_degree,
                out_degree,
                too_many_parents,
                too_many_children,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build::tests::snapshot;

    #[test]
    fn duplicate_titles_group_ids() {
        let mut snap = snapshot(&["n1", "n2", "n3", "n4"], &[]);
        snap.nodes[0].title = "Login".into();
        snap.nodes[1].title = "Login".into();
        snap.nodes[2].title = "Signup".into();
        snap.nodes[3].title = String::new();
        let dups = find_duplicate_titles(&snap);
        assert_eq!(dups.len(), 1);
        let ids: Vec<_> = dups["Login"].iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["n1", "n2"]);
    }

    #[test]
    fn titles_differing_in_whitespace_or_case_are_distinct() {
        let mut snap = snapshot(&["n1", "n2", "n3"], &[]);
        snap.nodes[0].title = "Login".into();
        snap.nodes[1].title = "Login ".into();
        snap.nodes[2].title = "login".into();
        assert!(find_duplicate_titles(&snap).is_empty());
    }

    #[test]
    fn empty_titles_are_never_duplicates() {
        let mut snap = snapshot(&["a", "b"], &[]);
        snap.nodes[0].title = String::new();
        snap.nodes[1].title = String::new();
        assert!(find_duplicate_titles(&snap).is_empty());
    }

    #[test]
    fn lone_node_is_root_and_orphan() {
        let g = TreeGraph::from_snapshot(&snapshot(&["solo"], &[]));
        assert_eq!(find_roots(&g), vec!["solo"]);
        assert_eq!(find_orphans(&g), vec!["solo"]);
    }

    #[test]
    fn roots_and_orphans() {
        // a has children but no parent: root, not orphan. o has no edges.
        let g = TreeGraph::from_snapshot(&snapshot(&["a", "b", "o"], &[("a", "b")]));
        assert_eq!(find_roots(&g), vec!["a", "o"]);
        assert_eq!(find_orphans(&g), vec!["o"]);
    }

    #[test]
    fn outliers_use_strict_thresholds() {
        let g = TreeGraph::from_snapshot(&snapshot(
            &["hub", "c1", "c2", "c3", "p1", "p2", "p3", "shared"],
            &[
                ("hub", "c1"),
                ("hub", "c2"),
                ("hub", "c3"),
                ("p1", "shared"),
                ("p2", "shared"),
                ("p3", "shared"),
            ],
        ));
        let defaults = dependency_outliers(&g, 2, 5);
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, "shared");
        assert!(defaults[0].too_many_parents);
        assert_eq!(defaults[0].describe(), "shared: high dependency (3 incoming)");

        let tight = dependency_outliers(&g, 3, 2);
        assert_eq!(tight.len(), 1);
        assert_eq!(tight[0].id, "hub");
        assert!(tight[0].too_many_children);
    }
}
