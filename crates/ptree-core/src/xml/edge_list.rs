//! Edge-list product tree XML.
//!
//! ```xml
//! <product_tree>
//!   <nodes>
//!     <node id="p1"><title>Shop</title><type>product</type><status>active</status></node>
//!   </nodes>
//!   <edges>
//!     <edge from="p1" to="g1" type="contains"/>
//!   </edges>
//! </product_tree>
//! ```
//!
//! Node fields are child elements (or attributes of the same name). Edges
//! are taken as written, so the result is a [`TreeSnapshot`] that may hold
//! cycles, shared children or dangling edges for the analyzer to report.

use std::collections::BTreeMap;

use tracing::info;

use crate::error::TreeError;
use crate::model::node::{DEFAULT_PRIORITY, DEFAULT_STATUS, JobData, Node, NodeType};
use crate::model::snapshot::{CONTAINS, Edge, TreeSnapshot};
use crate::xml::reader::Element;

const NODE_TAG: &str = "node";
const EDGE_TAG: &str = "edge";

/// Wrapper and item tags of the edge-list layout.
pub const EDGE_LIST_TAGS: [&str; 4] = ["nodes", "node", "edges", "edge"];

/// True when `document` uses the `<nodes>`/`<edges>` layout.
///
/// Either wrapper directly under the root, or `<node>`/`<edge>` items as
/// direct children of the root, selects this format.
#[must_use]
pub fn is_edge_list(document: &Element) -> bool {
    EDGE_LIST_TAGS.contains(&document.name.as_str())
        || document
            .child_elements()
            .any(|e| EDGE_LIST_TAGS.contains(&e.name.as_str()))
}

/// Build a snapshot from an edge-list document.
///
/// Nodes without an `id` get `node_{n}`; edges without one get `edge_{n}`.
///
/// # Errors
///
/// Returns [`TreeError::Snapshot`] if an `<edge>` lacks `from` or `to`.
pub fn snapshot_from_document(document: &Element, now: &str) -> Result<TreeSnapshot, TreeError> {
    let mut node_elements = Vec::new();
    let mut edge_elements = Vec::new();
    collect(document, &mut node_elements, &mut edge_elements);

    let nodes: Vec<Node> = node_elements
        .iter()
        .enumerate()
        .map(|(index, element)| build_node(element, index, now))
        .collect();

    let mut edges = Vec::with_capacity(edge_elements.len());
    for (index, element) in edge_elements.iter().enumerate() {
        let end = |key: &str| {
            element
                .attr(key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| TreeError::Snapshot(format!("edge {index} is missing '{key}'")))
        };
        edges.push(Edge {
            id: element
                .attr("id")
                .map_or_else(|| format!("edge_{index}"), str::to_string),
            from: end("from")?,
            to: end("to")?,
            kind: element.attr("type").unwrap_or(CONTAINS).to_string(),
        });
    }

    info!(nodes = nodes.len(), edges = edges.len(), "imported edge-list document");
    Ok(TreeSnapshot { nodes, edges })
}

/// Gather `<node>` and `<edge>` elements in document order. Items are not
/// searched for nested items.
fn collect<'a>(element: &'a Element, nodes: &mut Vec<&'a Element>, edges: &mut Vec<&'a Element>) {
    match element.name.as_str() {
        NODE_TAG => nodes.push(element),
        EDGE_TAG => edges.push(element),
        _ => {
            for child in element.child_elements() {
                collect(child, nodes, edges);
            }
        }
    }
}

fn build_node(element: &Element, index: usize, now: &str) -> Node {
    let text = |name: &str| {
        element
            .child(name)
            .map(Element::text_content)
            .or_else(|| element.attr(name).map(str::to_string))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let node_type = text("type").map_or_else(NodeType::default, |t| normalize_type(&t));
    let job = node_type.is_job().then(|| JobData {
        job_content: text("job_content").unwrap_or_default(),
        effort_estimate: text("effort").unwrap_or_default(),
        start_date: text("start").unwrap_or_default(),
        end_date: text("end").unwrap_or_default(),
    });

    Node {
        id: element
            .attr("id")
            .map_or_else(|| format!("node_{index}"), str::to_string),
        title: text("title").unwrap_or_default(),
        node_type,
        status: text("status").unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        priority: text("priority").unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
        team: text("team").unwrap_or_default(),
        owner: text("owner").unwrap_or_default(),
        description: text("description"),
        summary: text("summary"),
        job,
        created_at: text("created").unwrap_or_else(|| now.to_string()),
        updated_at: text("updated").unwrap_or_else(|| now.to_string()),
        extra_attributes: BTreeMap::new(),
    }
}

/// `Work Item` → `work_item`: type text here is free-form, not a tag.
fn normalize_type(raw: &str) -> NodeType {
    let tag = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    NodeType::from(tag.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::reader::parse_document;

    const NOW: &str = "2025-03-01T12:00:00Z";

    const EDGE_LIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<product_tree>
  <nodes>
    <node id="p1"><title>Shop</title><type>product</type><status>active</status></node>
    <node id="g1"><title>Grow</title><type>goal</type><description>More buyers</description></node>
    <node id="j1"><title>Cart</title><type>job</type><job_content>One page</job_content></node>
    <node id="w1"><title> Login </title></node>
  </nodes>
  <edges>
    <edge from="p1" to="g1" type="contains"/>
    <edge from="g1" to="j1"/>
    <edge from="j1" to="w1"/>
  </edges>
</product_tree>"#;

    fn snapshot(xml: &str) -> TreeSnapshot {
        let document = parse_document(xml).expect("parse");
        assert!(is_edge_list(&document));
        snapshot_from_document(&document, NOW).expect("snapshot")
    }

    #[test]
    fn reads_nodes_and_edges() {
        let snap = snapshot(EDGE_LIST);
        let ids: Vec<_> = snap.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "g1", "j1", "w1"]);

        let p1 = &snap.nodes[0];
        assert_eq!(p1.node_type, NodeType::Product);
        assert_eq!(p1.status, "active");
        assert_eq!(p1.priority, DEFAULT_PRIORITY);
        assert_eq!(p1.created_at, NOW);

        assert_eq!(snap.nodes[1].description.as_deref(), Some("More buyers"));
        let job = snap.nodes[2].job.as_ref().expect("job data");
        assert_eq!(job.job_content, "One page");

        let w1 = &snap.nodes[3];
        assert_eq!(w1.node_type, NodeType::WorkItem);
        assert_eq!(w1.title, "Login");
        assert_eq!(w1.status, DEFAULT_STATUS);

        let edges: Vec<_> = snap
            .edges
            .iter()
            .map(|e| (e.id.as_str(), e.from.as_str(), e.to.as_str(), e.kind.as_str()))
            .collect();
        assert_eq!(
            edges,
            vec![
                ("edge_0", "p1", "g1", "contains"),
                ("edge_1", "g1", "j1", "contains"),
                ("edge_2", "j1", "w1", "contains"),
            ]
        );
    }

    #[test]
    fn keeps_cycles_and_shared_children() {
        let xml = r#"<product_tree>
  <nodes><node id="a"><title>A</title></node><node id="b"><title>B</title></node><node id="c"/></nodes>
  <edges><edge from="a" to="b"/><edge from="b" to="a"/><edge from="a" to="c"/><edge from="b" to="c"/></edges>
</product_tree>"#;
        let snap = snapshot(xml);
        assert_eq!(snap.nodes.len(), 3);
        assert_eq!(snap.edges.len(), 4);
    }

    #[test]
    fn nested_document_is_not_edge_list() {
        let document =
            parse_document("<product_tree><product id=\"p\"><title>x</title></product></product_tree>")
                .expect("parse");
        assert!(!is_edge_list(&document));
    }

    #[test]
    fn edge_without_target_is_rejected() {
        let document = parse_document(r#"<product_tree><edges><edge from="a"/></edges></product_tree>"#)
            .expect("parse");
        let err = snapshot_from_document(&document, NOW).expect_err("missing to");
        assert!(matches!(err, TreeError::Snapshot(_)));
    }

    #[test]
    fn type_text_is_normalized_to_a_tag() {
        let snap = snapshot(
            "<nodes><node id=\"a\"><type>Work Item</type></node><node id=\"b\"><type> Key Result </type></node></nodes>",
        );
        assert_eq!(snap.nodes[0].node_type, NodeType::WorkItem);
        assert_eq!(snap.nodes[1].node_type, NodeType::from("key_result"));
    }

    #[test]
    fn missing_ids_are_numbered() {
        let snap = snapshot("<nodes><node><title>x</title></node><node><title>y</title></node></nodes>");
        let ids: Vec<_> = snap.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["node_0", "node_1"]);
    }
}
