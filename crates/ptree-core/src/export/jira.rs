//! Flat CSV in Jira's bulk-import column layout.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::export::escape_csv;
use crate::model::node::{Node, NodeType};
use crate::model::tree::ProductTree;

pub const HEADERS: [&str; 12] = [
    "Issue Type",
    "Summary",
    "Description",
    "Priority",
    "Status",
    "Assignee",
    "Reporter",
    "Labels",
    "Components",
    "Story Points",
    "Created",
    "Updated",
];

/// Reporter used when the configuration does not name one.
pub const DEFAULT_REPORTER: &str = "admin";

#[derive(Debug, Clone)]
pub struct JiraOptions {
    pub reporter: String,
}

impl Default for JiraOptions {
    fn default() -> Self {
        Self {
            reporter: DEFAULT_REPORTER.to_string(),
        }
    }
}

/// One header row plus one row per node, in document order.
///
/// Rows are separated by `\n` with no trailing newline.
pub fn to_jira_csv(tree: &ProductTree, options: &JiraOptions) -> String {
    let mut rows = vec![HEADERS.join(",")];
    for node in tree.iter() {
        rows.push(row(tree, node, options).join(","));
    }
    rows.join("\n")
}

fn row(tree: &ProductTree, node: &Node, options: &JiraOptions) -> Vec<String> {
    let mut labels = vec![node.node_type.as_str().to_string()];
    if let Some(product) = owning_product(tree, &node.id) {
        labels.push(product.title.clone());
    }
    let description = node
        .description
        .as_deref()
        .or(node.summary.as_deref())
        .unwrap_or_default();
    let story_points = node
        .job
        .as_ref()
        .map_or("", |j| j.effort_estimate.as_str());

    let status = node.status.replace('_', " ");
    let labels = labels.join(",");
    let created = date_only(&node.created_at);
    let updated = date_only(&node.updated_at);
    let fields: [&str; 12] = [
        node.node_type.jira_issue_type(),
        &node.title,
        description,
        &node.priority,
        &status,
        &node.owner,
        &options.reporter,
        &labels,
        &node.team,
        story_points,
        &created,
        &updated,
    ];
    fields.into_iter().map(escape_csv).collect()
}

/// Nearest `product` among the node itself and its ancestors.
fn owning_product<'a>(tree: &'a ProductTree, id: &str) -> Option<&'a Node> {
    std::iter::once(id.to_string())
        .chain(tree.ancestors(id))
        .filter_map(|candidate| tree.find_by_id(&candidate))
        .find(|n| n.node_type == NodeType::Product)
}

/// `YYYY-MM-DD` (UTC) for an ISO-8601 timestamp or date; empty otherwise.
pub fn date_only(timestamp: &str) -> String {
    let raw = timestamp.trim();
    if raw.is_empty() {
        return String::new();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.naive_utc().date().format("%Y-%m-%d").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.date().format("%Y-%m-%d").to_string();
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::JobData;

    const T: &str = "2025-06-30T23:30:00-02:00";

    fn sample() -> ProductTree {
        let mut tree = ProductTree::new();
        let mut product = Node::new("p", NodeType::Product, "Shop", T);
        product.status = "in_progress".into();
        tree.insert(None, product).expect("insert");
        let mut goal = Node::new("g", NodeType::Goal, r#"Say "Hi", please"#, T);
        goal.summary = Some("short".into());
        goal.owner = "bo@example.com".into();
        goal.team = "Growth".into();
        tree.insert(Some("p"), goal).expect("insert");
        let mut job = Node::new("j", NodeType::Job, "Build", "2025-01-05");
        job.job = Some(JobData {
            effort_estimate: "5".into(),
            ..JobData::default()
        });
        tree.insert(Some("g"), job).expect("insert");
        let orphan = Node::new("x", NodeType::from("spike"), "Loose", "");
        tree.insert(None, orphan).expect("insert");
        tree
    }

    fn lines(csv: &str) -> Vec<&str> {
        csv.split('\n').collect()
    }

    #[test]
    fn header_row_comes_first() {
        let csv = to_jira_csv(&sample(), &JiraOptions::default());
        assert_eq!(
            lines(&csv)[0],
            "Issue Type,Summary,Description,Priority,Status,Assignee,Reporter,Labels,Components,Story Points,Created,Updated"
        );
        assert!(!csv.ends_with('\n'));
        assert_eq!(lines(&csv).len(), 5);
    }

    #[test]
    fn product_row() {
        let csv = to_jira_csv(&sample(), &JiraOptions::default());
        assert_eq!(
            lines(&csv)[1],
            "Initiative,Shop,,P2,in progress,,admin,\"product,Shop\",,,2025-07-01,2025-07-01"
        );
    }

    #[test]
    fn goal_row_escapes_and_falls_back_to_summary() {
        let csv = to_jira_csv(
            &sample(),
            &JiraOptions {
                reporter: "pm".into(),
            },
        );
        assert_eq!(
            lines(&csv)[2],
            "Initiative,\"Say \"\"Hi\"\", please\",short,P2,not started,bo@example.com,pm,\"goal,Shop\",Growth,,2025-07-01,2025-07-01"
        );
    }

    #[test]
    fn job_row_has_story_points() {
        let csv = to_jira_csv(&sample(), &JiraOptions::default());
        assert_eq!(
            lines(&csv)[3],
            "Epic,Build,,P2,not started,,admin,\"job,Shop\",,5,2025-01-05,2025-01-05"
        );
    }

    #[test]
    fn nodes_without_product_get_type_label_only() {
        let csv = to_jira_csv(&sample(), &JiraOptions::default());
        assert_eq!(lines(&csv)[4], "Story,Loose,,P2,not started,,admin,spike,,,,");
    }

    #[test]
    fn date_only_handles_variants() {
        assert_eq!(date_only("2024-02-29T10:00:00Z"), "2024-02-29");
        assert_eq!(date_only("2024-02-29T10:00:00.123"), "2024-02-29");
        assert_eq!(date_only("2024-02-29"), "2024-02-29");
        assert_eq!(date_only("next week"), "");
        assert_eq!(date_only(""), "");
    }
}
