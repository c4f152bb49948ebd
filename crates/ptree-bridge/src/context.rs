//! Bounded, human-readable tree context for prompts.
//!
//! A snapshot never embeds the whole tree: children, siblings and overview
//! samples are capped by [`ContextConfig`] and the remainder is summarised
//! as `... and N more <kind>`.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use ptree_core::config::ContextConfig;
use ptree_core::{Node, ProductTree, TreeError};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSnapshot {
    /// Id of the selected node, `None` for a whole-tree overview.
    pub focus: Option<String>,
    pub text: String,
}

impl ContextSnapshot {
    /// Context centred on one node: its fields, parent, children and siblings.
    pub fn for_node(
        tree: &ProductTree,
        id: &str,
        caps: &ContextConfig,
    ) -> Result<Self, TreeError> {
        let node = tree.get(id)?;
        let mut text = String::new();

        let _ = writeln!(
            text,
            "SELECTED ITEM: \"{}\" ({})",
            node.title,
            node.node_type.label()
        );
        let _ = writeln!(text, "- Id: {}", node.id);
        let _ = writeln!(text, "- Status: {}", or_unset(&node.status));
        let _ = writeln!(text, "- Priority: {}", or_unset(&node.priority));
        let _ = writeln!(text, "- Team: {}", or_unset(&node.team));
        if !node.owner.is_empty() {
            let _ = writeln!(text, "- Owner: {}", node.owner);
        }
        let _ = writeln!(
            text,
            "- Summary: {}",
            node.summary.as_deref().unwrap_or("No summary available")
        );
        let _ = writeln!(
            text,
            "- Description: {}",
            node.description
                .as_deref()
                .unwrap_or("No description available")
        );
        if let Some(job) = &node.job {
            if !job.effort_estimate.is_empty() {
                let _ = writeln!(text, "- Effort: {}", job.effort_estimate);
            }
            if !job.start_date.is_empty() || !job.end_date.is_empty() {
                let _ = writeln!(text, "- Schedule: {} to {}", job.start_date, job.end_date);
            }
        }

        text.push('\n');
        match tree.parent_of(id) {
            Some(parent) => {
                let _ = writeln!(
                    text,
                    "PARENT: {} ({}, Status: {})",
                    parent.title,
                    parent.node_type.label(),
                    or_unset(&parent.status)
                );
            }
            None => text.push_str("PARENT: none (root level)\n"),
        }

        let children = tree.children_of(id);
        text.push('\n');
        let _ = writeln!(text, "CHILDREN ({}):", children.len());
        push_capped(&mut text, &children, caps.max_children, "children");

        let siblings: Vec<&Node> = tree
            .sibling_ids(id)
            .iter()
            .filter_map(|sid| tree.find_by_id(sid))
            .collect();
        text.push('\n');
        let _ = writeln!(text, "SIBLINGS ({}):", siblings.len());
        push_capped(&mut text, &siblings, caps.max_siblings, "siblings");

        Ok(Self {
            focus: Some(node.id.clone()),
            text: text.trim_end().to_string(),
        })
    }

    /// Whole-tree context: distributions plus the first few nodes.
    #[must_use]
    pub fn overview(tree: &ProductTree, caps: &ContextConfig) -> Self {
        if tree.is_empty() {
            return Self {
                focus: None,
                text: "The product tree is empty.".to_string(),
            };
        }
        let nodes: Vec<&Node> = tree.iter().collect();
        let mut types = BTreeMap::new();
        let mut statuses = BTreeMap::new();
        let mut priorities = BTreeMap::new();
        for node in &nodes {
            *types.entry(node.node_type.as_str()).or_insert(0usize) += 1;
            *statuses.entry(node.status.as_str()).or_insert(0usize) += 1;
            *priorities.entry(node.priority.as_str()).or_insert(0usize) += 1;
        }

        let mut text = String::new();
        let _ = writeln!(
            text,
            "PRODUCT TREE: {} nodes, {} top-level",
            nodes.len(),
            tree.root_ids().len()
        );
        let _ = writeln!(text, "- Node Types: {}", distribution(&types));
        let _ = writeln!(text, "- Status Distribution: {}", distribution(&statuses));
        let _ = writeln!(text, "- Priority Distribution: {}", distribution(&priorities));
        text.push('\n');
        text.push_str("SAMPLE NODES:\n");
        for node in nodes.iter().take(caps.max_overview_nodes) {
            let _ = writeln!(
                text,
                "- {}: {} (Status: {}, Priority: {})",
                node.node_type.as_str(),
                node.title,
                or_unset(&node.status),
                or_unset(&node.priority)
            );
        }
        if nodes.len() > caps.max_overview_nodes {
            let _ = writeln!(
                text,
                "... and {} more nodes",
                nodes.len() - caps.max_overview_nodes
            );
        }

        Self {
            focus: None,
            text: text.trim_end().to_string(),
        }
    }
}

fn push_capped(text: &mut String, nodes: &[&Node], cap: usize, kind: &str) {
    if nodes.is_empty() {
        text.push_str("- none\n");
        return;
    }
    for node in nodes.iter().take(cap) {
        let _ = writeln!(
            text,
            "- {} ({}, Status: {}, Priority: {})",
            node.title,
            node.node_type.label(),
            or_unset(&node.status),
            or_unset(&node.priority)
        );
    }
    if nodes.len() > cap {
        let _ = writeln!(text, "... and {} more {kind}", nodes.len() - cap);
    }
}

fn distribution(counts: &BTreeMap<&str, usize>) -> String {
    counts
        .iter()
        .map(|(key, count)| format!("{key}: {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "Not specified"
    } else {
        value
    }
}
