//! Edge-list projection of a [`ProductTree`].
//!
//! A [`TreeSnapshot`] is the flat `{nodes, edges}` form used for JSON files,
//! the bulk-import push and the graph analyzer. Conversion in both
//! directions is lossless for well-formed trees. Snapshots that are not
//! forests can still be analyzed but cannot become a [`ProductTree`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::model::node::Node;
use crate::model::tree::ProductTree;

/// The only relationship kind in a product tree.
pub const CONTAINS: &str = "contains";

/// Directed parent → child relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type", default = "contains")]
    pub kind: String,
}

fn contains() -> String {
    CONTAINS.to_string()
}

impl Edge {
    pub fn contains(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            kind: CONTAINS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl TreeSnapshot {
    /// Parse a snapshot from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Snapshot`] if the JSON does not match the schema.
    pub fn from_json(text: &str) -> Result<Self, TreeError> {
        serde_json::from_str(text).map_err(|e| TreeError::Snapshot(e.to_string()))
    }

    /// Serialize as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Snapshot`] if serialization fails.
    pub fn to_json(&self) -> Result<String, TreeError> {
        serde_json::to_string_pretty(self).map_err(|e| TreeError::Snapshot(e.to_string()))
    }
}

impl ProductTree {
    /// Project into nodes (document order) and `contains` edges.
    ///
    /// Edge ids are `edge_{n}`, numbered in document order.
    pub fn to_snapshot(&self) -> TreeSnapshot {
        let nodes: Vec<Node> = self.iter().cloned().collect();
        let mut edges = Vec::new();
        for node in &nodes {
            for child in self.child_ids(&node.id) {
                edges.push(Edge::contains(
                    format!("edge_{}", edges.len()),
                    node.id.clone(),
                    child.clone(),
                ));
            }
        }
        TreeSnapshot { nodes, edges }
    }

    /// Rebuild a tree from an edge-list snapshot.
    ///
    /// Roots keep their order in `nodes`; children keep the order of their
    /// edges.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Snapshot`] when the snapshot is not a forest:
    /// duplicate ids, edges to unknown nodes, a node with two parents, or a
    /// cycle. Use the analyzer to diagnose such snapshots. Returns
    /// [`TreeError::Validation`] for a node type that cannot be a tag.
    pub fn from_snapshot(snapshot: &TreeSnapshot) -> Result<Self, TreeError> {
        let mut by_id: HashMap<&str, &Node> = HashMap::with_capacity(snapshot.nodes.len());
        for node in &snapshot.nodes {
            node.node_type.validate()?;
            if by_id.insert(node.id.as_str(), node).is_some() {
                return Err(TreeError::Snapshot(format!("duplicate node id '{}'", node.id)));
            }
        }

        let mut parent_of: HashMap<&str, &str> = HashMap::new();
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut seen_edges = HashSet::new();
        for edge in &snapshot.edges {
            for end in [&edge.from, &edge.to] {
                if !by_id.contains_key(end.as_str()) {
                    return Err(TreeError::Snapshot(format!(
                        "edge '{}' references unknown node '{end}'",
                        edge.id
                    )));
                }
            }
            if !seen_edges.insert((edge.from.as_str(), edge.to.as_str())) {
                continue;
            }
            if let Some(prev) = parent_of.insert(edge.to.as_str(), edge.from.as_str()) {
                return Err(TreeError::Snapshot(format!(
                    "node '{}' has two parents ('{prev}' and '{}')",
                    edge.to, edge.from
                )));
            }
            children.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
        }

        let mut tree = Self::new();
        let mut stack: Vec<(Option<&str>, &str)> = snapshot
            .nodes
            .iter()
            .rev()
            .filter(|n| !parent_of.contains_key(n.id.as_str()))
            .map(|n| (None, n.id.as_str()))
            .collect();
        while let Some((parent, id)) = stack.pop() {
            if let Some(node) = by_id.get(id) {
                tree.insert(parent, (*node).clone())?;
            }
            if let Some(kids) = children.get(id) {
                stack.extend(kids.iter().rev().map(|kid| (Some(id), *kid)));
            }
        }

        if tree.len() != snapshot.nodes.len() {
            return Err(TreeError::Snapshot(format!(
                "{} node(s) are unreachable from any root (cycle)",
                snapshot.nodes.len() - tree.len()
            )));
        }
        Ok(tree)
    }
}
