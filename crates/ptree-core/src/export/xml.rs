//! `<product_tree>` XML export, readable by the importer.

use std::fmt::Write;

use quick_xml::escape::escape;

use crate::model::node::Node;
use crate::model::tree::ProductTree;

const INDENT: &str = "  ";

/// Serialize the tree as XML.
///
/// Nodes are written depth-first, each followed by its children, with
/// two-space indentation per level. Empty attributes and optional fields are
/// omitted; `<title>` is always present. Ids are written explicitly so a
/// re-import reproduces them.
pub fn to_xml(tree: &ProductTree) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<product_tree>\n");
    for root in tree.root_ids() {
        write_node(tree, root, 1, &mut out);
    }
    out.push_str("</product_tree>");
    out
}

fn write_node(tree: &ProductTree, id: &str, depth: usize, out: &mut String) {
    let Some(node) = tree.find_by_id(id) else {
        return;
    };
    let pad = INDENT.repeat(depth);
    let tag = node.node_type.as_str();

    let _ = writeln!(out, "{pad}<{tag}{}>", attributes(node));
    let _ = writeln!(out, "{pad}{INDENT}<title>{}</title>", escape(&node.title));
    if let Some(description) = node.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(
            out,
            "{pad}{INDENT}<description>{}</description>",
            escape(description)
        );
    }
    if let Some(summary) = node.summary.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "{pad}{INDENT}<summary>{}</summary>", escape(summary));
    }
    if let Some(job) = node.job.as_ref().filter(|j| !j.job_content.is_empty()) {
        let _ = writeln!(
            out,
            "{pad}{INDENT}<job_content>{}</job_content>",
            escape(&job.job_content)
        );
    }
    for child in tree.child_ids(id) {
        write_node(tree, child, depth + 1, out);
    }
    let _ = writeln!(out, "{pad}</{tag}>");
}

fn attributes(node: &Node) -> String {
    let mut pairs: Vec<(&str, &str)> = vec![
        ("id", node.id.as_str()),
        ("status", node.status.as_str()),
        ("priority", node.priority.as_str()),
        ("team", node.team.as_str()),
        ("owner", node.owner.as_str()),
        ("created", node.created_at.as_str()),
        ("updated", node.updated_at.as_str()),
    ];
    if let Some(job) = &node.job {
        pairs.push(("effort", job.effort_estimate.as_str()));
        pairs.push(("start", job.start_date.as_str()));
        pairs.push(("end", job.end_date.as_str()));
    }
    pairs.extend(
        node.extra_attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str())),
    );

    let mut out = String::new();
    for (key, value) in pairs.into_iter().filter(|(_, v)| !v.is_empty()) {
        let _ = write!(out, " {key}=\"{}\"", escape(value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::{JobData, NodeType};
    use crate::xml::import_xml_at;

    const T: &str = "2025-01-02T03:04:05Z";

    fn sample() -> ProductTree {
        let mut tree = ProductTree::new();
        let mut product = Node::new("p", NodeType::Product, "Shop & Co", T);
        product.team = "Core".into();
        product.description = Some("Sells <things>".into());
        tree.insert(None, product).expect("insert");
        let mut job = Node::new("p.job_0", NodeType::Job, "Cart", T);
        job.job = Some(JobData {
            job_content: "Do it".into(),
            effort_estimate: "2w".into(),
            ..JobData::default()
        });
        tree.insert(Some("p"), job).expect("insert");
        tree
    }

    #[test]
    fn writes_expected_document() {
        let xml = to_xml(&sample());
        let expected = [
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "<product_tree>",
            r#"  <product id="p" status="not_started" priority="P2" team="Core" created="2025-01-02T03:04:05Z" updated="2025-01-02T03:04:05Z">"#,
            "    <title>Shop &amp; Co</title>",
            "    <description>Sells &lt;things&gt;</description>",
            r#"    <job id="p.job_0" status="not_started" priority="P2" created="2025-01-02T03:04:05Z" updated="2025-01-02T03:04:05Z" effort="2w">"#,
            "      <title>Cart</title>",
            "      <job_content>Do it</job_content>",
            "    </job>",
            "  </product>",
            "</product_tree>",
        ]
        .join("\n");
        assert_eq!(xml, expected);
    }

    #[test]
    fn empty_tree_is_an_empty_container() {
        assert_eq!(
            to_xml(&ProductTree::new()),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<product_tree>\n</product_tree>"
        );
    }

    #[test]
    fn reimport_reproduces_tree() {
        let tree = sample();
        let back = import_xml_at(&to_xml(&tree), "ignored").expect("reimport");
        assert_eq!(back, tree);
    }

    #[test]
    fn markup_characters_are_escaped_and_restored() {
        let mut tree = ProductTree::new();
        let mut node = Node::new("w", NodeType::WorkItem, r#"a & b < c > d "e" 'f'"#, T);
        node.extra_attributes.insert("note".into(), r#"x<"y">"#.into());
        tree.insert(None, node).expect("insert");

        let xml = to_xml(&tree);
        assert!(xml.contains("<title>a &amp; b &lt; c &gt; d &quot;e&quot; &apos;f&apos;</title>"));
        assert!(xml.contains(r#"note="x&lt;&quot;y&quot;&gt;""#));
        assert_eq!(import_xml_at(&xml, T).expect("reimport"), tree);
    }

    #[test]
    fn extra_attributes_survive() {
        let tree = import_xml_at(r#"<goal quarter="Q1" year="2025"><title>G</title></goal>"#, T)
            .expect("import");
        let xml = to_xml(&tree);
        assert!(xml.contains(r#"quarter="Q1" year="2025""#));
    }
}
