//! XML → [`ProductTree`] importer.
//!
//! Each element is a node whose type is its tag name, except for the
//! reserved leaf tags (`title`, `description`, `summary`, `job_content`),
//! which become scalar fields of the enclosing node. A `product_tree` root
//! element is a plain container; any other root element is itself the
//! single root node.
//!
//! Ids come from an explicit `id` attribute when present. Otherwise they
//! are derived from the parent id, tag name and index among the parent's
//! node children (`product_0.goal_1`), so parsing the same document twice
//! yields the same ids.
//!
//! Documents in the `<nodes>`/`<edges>` layout are read by
//! [`crate::xml::edge_list`] instead.
//!
//! Import is all-or-nothing: any syntax error or duplicate id fails the
//! whole document.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::TreeError;
use crate::model::node::{DEFAULT_PRIORITY, DEFAULT_STATUS, JobData, Node, NodeType};
use crate::model::now_timestamp;
use crate::model::snapshot::TreeSnapshot;
use crate::model::tree::ProductTree;
use crate::xml::edge_list::{is_edge_list, snapshot_from_document};
use crate::xml::reader::{Element, parse_document};

/// Root tag treated as a container rather than a node.
pub const CONTAINER_TAG: &str = "product_tree";

/// Leaf tags read as fields of their parent, never as nodes.
pub const RESERVED_TAGS: [&str; 4] = ["title", "description", "summary", "job_content"];

/// Attributes mapped onto dedicated node fields.
const KNOWN_ATTRIBUTES: [&str; 7] = ["id", "status", "priority", "team", "owner", "created", "updated"];

/// Attributes mapped onto [`JobData`] for `job` nodes.
const JOB_ATTRIBUTES: [&str; 3] = ["effort", "start", "end"];

fn is_reserved(tag: &str) -> bool {
    RESERVED_TAGS.contains(&tag)
}

/// Parse an XML document into a tree, stamping missing timestamps with now.
///
/// # Errors
///
/// - [`TreeError::Parse`] for malformed XML.
/// - [`TreeError::DuplicateId`] if two elements resolve to the same id.
/// - [`TreeError::Snapshot`] if an edge-list document is not a forest.
pub fn import_xml(text: &str) -> Result<ProductTree, TreeError> {
    import_xml_at(text, &now_timestamp())
}

/// Like [`import_xml`] with an explicit timestamp for missing
/// `created`/`updated` attributes.
///
/// # Errors
///
/// Same as [`import_xml`].
pub fn import_xml_at(text: &str, now: &str) -> Result<ProductTree, TreeError> {
    let document = parse_document(text)?;
    if is_edge_list(&document) {
        return ProductTree::from_snapshot(&snapshot_from_document(&document, now)?);
    }
    import_nested(&document, now)
}

/// Parse either XML layout into a snapshot without requiring a forest.
///
/// Edge-list documents keep their edges as written; nested documents are
/// imported and projected.
///
/// # Errors
///
/// - [`TreeError::Parse`] for malformed XML.
/// - [`TreeError::DuplicateId`] for duplicate ids in a nested document.
/// - [`TreeError::Snapshot`] for an `<edge>` missing an endpoint.
pub fn import_snapshot_xml(text: &str) -> Result<TreeSnapshot, TreeError> {
    import_snapshot_xml_at(text, &now_timestamp())
}

/// Like [`import_snapshot_xml`] with an explicit timestamp.
///
/// # Errors
///
/// Same as [`import_snapshot_xml`].
pub fn import_snapshot_xml_at(text: &str, now: &str) -> Result<TreeSnapshot, TreeError> {
    let document = parse_document(text)?;
    if is_edge_list(&document) {
        snapshot_from_document(&document, now)
    } else {
        Ok(import_nested(&document, now)?.to_snapshot())
    }
}

fn import_nested(document: &Element, now: &str) -> Result<ProductTree, TreeError> {
    let mut tree = ProductTree::new();

    if document.name == CONTAINER_TAG {
        let roots = document.child_elements().filter(|e| !is_reserved(&e.name));
        for (index, element) in roots.enumerate() {
            import_element(&mut tree, None, element, index, now)?;
        }
    } else if is_reserved(&document.name) {
        debug!(tag = %document.name, "root element is a field tag; nothing to import");
    } else {
        import_element(&mut tree, None, document, 0, now)?;
    }

    info!(
        nodes = tree.len(),
        roots = tree.root_ids().len(),
        "imported product tree"
    );
    Ok(tree)
}

fn import_element(
    tree: &mut ProductTree,
    parent: Option<&str>,
    element: &Element,
    index: usize,
    now: &str,
) -> Result<(), TreeError> {
    let id = element.attr("id").map_or_else(
        || match parent {
            Some(p) => format!("{p}.{}_{index}", element.name),
            None => format!("{}_{index}", element.name),
        },
        str::to_string,
    );
    let node = build_node(id, element, now);
    let id = tree.insert(parent, node)?.id.clone();

    let children = element.child_elements().filter(|e| !is_reserved(&e.name));
    for (child_index, child) in children.enumerate() {
        import_element(tree, Some(&id), child, child_index, now)?;
    }
    Ok(())
}

fn build_node(id: String, element: &Element, now: &str) -> Node {
    let node_type = NodeType::from(element.name.as_str());
    let attr = |key: &str| element.attr(key).map(str::to_string);

    let job = node_type.is_job().then(|| JobData {
        job_content: field(element, "job_content").unwrap_or_default(),
        effort_estimate: attr("effort").unwrap_or_default(),
        start_date: attr("start").unwrap_or_default(),
        end_date: attr("end").unwrap_or_default(),
    });

    let mut extra_attributes = BTreeMap::new();
    for (key, value) in &element.attributes {
        let consumed = KNOWN_ATTRIBUTES.contains(&key.as_str())
            || (node_type.is_job() && JOB_ATTRIBUTES.contains(&key.as_str()))
            || (is_reserved(key) && field_element(element, key).is_none());
        if !consumed {
            extra_attributes.insert(key.clone(), value.clone());
        }
    }

    Node {
        id,
        title: field(element, "title").unwrap_or_default(),
        node_type,
        status: attr("status").unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        priority: attr("priority").unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
        team: attr("team").unwrap_or_default(),
        owner: attr("owner").unwrap_or_default(),
        description: field(element, "description").filter(|s| !s.is_empty()),
        summary: field(element, "summary").filter(|s| !s.is_empty()),
        job,
        created_at: attr("created").unwrap_or_else(|| now.to_string()),
        updated_at: attr("updated").unwrap_or_else(|| now.to_string()),
        extra_attributes,
    }
}

/// Trimmed text of scalar field `name`, falling back to an attribute of the
/// same name.
fn field(element: &Element, name: &str) -> Option<String> {
    field_element(element, name)
        .map(|e| e.text_content().trim().to_string())
        .or_else(|| element.attr(name).map(|v| v.trim().to_string()))
}

/// Locate the element carrying scalar field `name`.
///
/// Direct children win. Otherwise the first match in document order among
/// descendants, descending only through wrapper elements. Elements named
/// after a known node type (`goal`, `job`, ...) or carrying an `id` are
/// separate nodes and their fields are never borrowed.
fn field_element<'a>(element: &'a Element, name: &str) -> Option<&'a Element> {
    if let Some(direct) = element.child(name) {
        return Some(direct);
    }
    element
        .child_elements()
        .filter(|child| {
            !is_reserved(&child.name)
                && child.attr("id").is_none()
                && matches!(NodeType::from(child.name.as_str()), NodeType::Other(_))
        })
        .find_map(|wrapper| field_element(wrapper, name))
}
