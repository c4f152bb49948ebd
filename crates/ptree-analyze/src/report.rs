//! Aggregated, deterministic analysis report.
//!
//! [`analyze`] runs every diagnostic over one snapshot. The report contains
//! only ordered collections, so analyzing an unchanged snapshot twice gives
//! equal reports and byte-identical JSON.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use ptree_core::config::AnalysisConfig;
use ptree_core::{Node, ProductTree, TreeSnapshot};
use serde::Serialize;
use tracing::info;

use crate::diagnostics::{
    Outlier, dependency_outliers, find_duplicate_titles, find_orphans, find_roots,
};
use crate::graph::{DanglingEdge, GraphStats, TreeGraph, cycle_components, detect_cycles};

/// Minimal identification of a node in findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRef {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub node_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub content_hash: String,
    pub stats: GraphStats,
    pub roots: Vec<NodeRef>,
    pub orphans: Vec<NodeRef>,
    pub duplicate_titles: BTreeMap<String, BTreeSet<String>>,
    /// Concrete cycle paths, `[start, ..., start]`.
    pub cycles: Vec<Vec<String>>,
    /// Members of each strongly connected component that contains a cycle.
    pub cycle_components: Vec<Vec<String>>,
    pub outliers: Vec<Outlier>,
    pub dangling_edges: Vec<DanglingEdge>,
    pub duplicate_edges: Vec<String>,
    pub duplicate_node_ids: Vec<String>,
    pub by_type: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub in_threshold: usize,
    pub out_threshold: usize,
}

/// Run all diagnostics over `snapshot`.
#[must_use]
pub fn analyze(snapshot: &TreeSnapshot, config: &AnalysisConfig) -> AnalysisReport {
    let graph = TreeGraph::from_snapshot(snapshot);
    let by_id: HashMap<&str, &Node> = snapshot
        .nodes
        .iter()
        .rev()
        .map(|n| (n.id.as_str(), n))
        .collect();
    let refs = |ids: Vec<String>| -> Vec<NodeRef> {
        ids.into_iter()
            .map(|id| {
                let (title, node_type) = by_id
                    .get(id.as_str())
                    .map(|n| (n.title.clone(), n.node_type.to_string()))
                    .unwrap_or_default();
                NodeRef { id, title, node_type }
            })
            .collect()
    };

    let mut by_type = BTreeMap::new();
    let mut by_status = BTreeMap::new();
    let mut by_priority = BTreeMap::new();
    for node in &snapshot.nodes {
        *by_type.entry(node.node_type.to_string()).or_insert(0) += 1;
        *by_status.entry(node.status.clone()).or_insert(0) += 1;
        *by_priority.entry(node.priority.clone()).or_insert(0) += 1;
    }

    let report = AnalysisReport {
        content_hash: graph.content_hash.clone(),
        stats: GraphStats::from_graph(&graph),
        roots: refs(find_roots(&graph)),
        orphans: refs(find_orphans(&graph)),
        duplicate_titles: find_duplicate_titles(snapshot),
        cycles: detect_cycles(&graph),
        cycle_components: cycle_components(&graph),
        outliers: dependency_outliers(&graph, config.in_threshold, config.out_threshold),
        dangling_edges: graph.dangling_edges.clone(),
        duplicate_edges: graph.duplicate_edges.clone(),
        duplicate_node_ids: graph.duplicate_node_ids.clone(),
        by_type,
        by_status,
        by_priority,
        in_threshold: config.in_threshold,
        out_threshold: config.out_threshold,
    };
    info!(
        nodes = report.stats.node_count,
        cycles = report.cycles.len(),
        duplicates = report.duplicate_titles.len(),
        orphans = report.orphans.len(),
        "analysis complete"
    );
    report
}

/// [`analyze`] over a tree's edge-list projection.
#[must_use]
pub fn analyze_tree(tree: &ProductTree, config: &AnalysisConfig) -> AnalysisReport {
    analyze(&tree.to_snapshot(), config)
}

impl AnalysisReport {
    /// True when the snapshot is a clean forest with no flagged nodes.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.cycles.is_empty()
            && self.duplicate_titles.is_empty()
            && self.orphans.is_empty()
            && self.outliers.is_empty()
            && self.dangling_edges.is_empty()
            && self.duplicate_edges.is_empty()
            && self.duplicate_node_ids.is_empty()
    }

    /// One human-readable line per finding.
    #[must_use]
    pub fn findings(&self) -> Vec<String> {
        let mut out = Vec::new();
        for cycle in &self.cycles {
            out.push(format!("cycle: {}", cycle.join(" -> ")));
        }
        for (title, ids) in &self.duplicate_titles {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            out.push(format!("duplicate title \"{title}\": {}", ids.join(", ")));
        }
        for orphan in &self.orphans {
            out.push(format!("orphan: {} \"{}\"", orphan.id, orphan.title));
        }
        for outlier in &self.outliers {
            out.push(outlier.describe());
        }
        for edge in &self.dangling_edges {
            out.push(format!(
                "dangling edge {}: {} -> {}",
                edge.edge_id, edge.from, edge.to
            ));
        }
        for edge in &self.duplicate_edges {
            out.push(format!("duplicate edge: {edge}"));
        }
        for id in &self.duplicate_node_ids {
            out.push(format!("duplicate node id: {id}"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build::tests::snapshot;

    #[test]
    fn clean_tree_has_no_findings() {
        let snap = snapshot(&["p", "g"], &[("p", "g")]);
        let report = analyze(&snap, &AnalysisConfig::default());
        assert!(report.is_clean());
        assert!(report.findings().is_empty());
        assert_eq!(report.roots.len(), 1);
        assert_eq!(report.roots[0].title, "P");
        assert_eq!(report.by_type.get("goal"), Some(&2));
        assert_eq!(report.by_status.get("not_started"), Some(&2));
    }

    #[test]
    fn findings_cover_each_anomaly() {
        let mut snap = snapshot(
            &["a", "b", "c", "o", "d"],
            &[("a", "b"), ("b", "c"), ("c", "a"), ("a", "zz")],
        );
        snap.nodes[4].title = "A".into();
        let report = analyze(&snap, &AnalysisConfig::default());
        let findings = report.findings();
        assert!(findings.contains(&"cycle: a -> b -> c -> a".to_string()));
        assert!(findings.iter().any(|f| f.starts_with("duplicate title \"A\"")));
        assert!(findings.iter().any(|f| f.starts_with("orphan: o")));
        assert!(findings.iter().any(|f| f.starts_with("dangling edge edge_3")));
        assert!(!report.is_clean());
    }

    #[test]
    fn analysis_is_idempotent() {
        let snap = snapshot(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let config = AnalysisConfig::default();
        let first = analyze(&snap, &config);
        let second = analyze(&snap, &config);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).expect("json"),
            serde_json::to_string(&second).expect("json")
        );
    }
}
