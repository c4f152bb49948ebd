//! Node records: one entry in the product hierarchy.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::TreeError;

/// Status applied when the source omits one.
pub const DEFAULT_STATUS: &str = "not_started";
/// Priority applied when the source omits one.
pub const DEFAULT_PRIORITY: &str = "P2";

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

fn default_priority() -> String {
    DEFAULT_PRIORITY.to_string()
}

/// Node type, taken from the XML tag name.
///
/// The set is open: unknown tags pass through as [`NodeType::Other`]
/// and are exported under their original name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    Product,
    Goal,
    Job,
    #[default]
    WorkItem,
    Work,
    Other(String),
}

impl NodeType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Product => "product",
            Self::Goal => "goal",
            Self::Job => "job",
            Self::WorkItem => "work_item",
            Self::Work => "work",
            Self::Other(tag) => tag,
        }
    }

    #[must_use]
    pub const fn icon(&self) -> &'static str {
        match self {
            Self::Product => "🏢",
            Self::Goal => "🎯",
            Self::Job => "💼",
            Self::WorkItem => "🔧",
            Self::Work => "⚙️",
            Self::Other(_) => "📄",
        }
    }

    /// Display label, e.g. `Work Item`.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Product => "Product".into(),
            Self::Goal => "Goal".into(),
            Self::Job => "Job".into(),
            Self::WorkItem => "Work Item".into(),
            Self::Work => "Work".into(),
            Self::Other(tag) => tag
                .split('_')
                .filter(|part| !part.is_empty())
                .map(capitalize)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Jira issue type used by the CSV exporter.
    #[must_use]
    pub const fn jira_issue_type(&self) -> &'static str {
        match self {
            Self::Product | Self::Goal => "Initiative",
            Self::Job => "Epic",
            Self::WorkItem | Self::Work | Self::Other(_) => "Story",
        }
    }

    #[must_use]
    pub const fn is_job(&self) -> bool {
        matches!(self, Self::Job)
    }

    /// Check that the type can be written back as an element name.
    ///
    /// The tag must be an XML name (letter or `_`, then letters, digits,
    /// `_`, `-` or `.`), must not start with `xml`, and must not collide
    /// with a field, container or edge-list tag.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Validation`] naming the offending tag.
    pub fn validate(&self) -> Result<(), TreeError> {
        let tag = self.as_str();
        if RESERVED_TYPE_NAMES.contains(&tag) {
            return Err(TreeError::Validation(format!(
                "'{tag}' is a reserved tag and cannot be a node type"
            )));
        }
        if !is_xml_name(tag) || tag.to_ascii_lowercase().starts_with("xml") {
            return Err(TreeError::Validation(format!(
                "'{tag}' is not a valid node type (use letters, digits and '_', e.g. user_story)"
            )));
        }
        Ok(())
    }
}

/// Tags a node type may not take: field tags, the document container and
/// the edge-list layout tags.
pub const RESERVED_TYPE_NAMES: [&str; 9] = [
    "title",
    "description",
    "summary",
    "job_content",
    "product_tree",
    "nodes",
    "node",
    "edges",
    "edge",
];

fn is_xml_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl From<&str> for NodeType {
    fn from(s: &str) -> Self {
        match s {
            "product" => Self::Product,
            "goal" => Self::Goal,
            "job" => Self::Job,
            "work_item" => Self::WorkItem,
            "work" => Self::Work,
            other => Self::Other(other.to_string()),
        }
    }
}

impl FromStr for NodeType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NodeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// Scheduling payload carried only by `job` nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobData {
    pub job_content: String,
    pub effort_estimate: String,
    pub start_date: String,
    pub end_date: String,
}

impl JobData {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.job_content.is_empty()
            && self.effort_estimate.is_empty()
            && self.start_date.is_empty()
            && self.end_date.is_empty()
    }
}

/// A single tree entry.
///
/// Hierarchy is not stored on the node; see [`crate::model::tree::ProductTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, rename = "job_data", skip_serializing_if = "Option::is_none")]
    pub job: Option<JobData>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    /// Source attributes with no dedicated field (e.g. `quarter`, `year`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_attributes: BTreeMap<String, String>,
}

impl Node {
    /// Build a node with default classification and both timestamps set to `now`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        node_type: NodeType,
        title: impl Into<String>,
        now: &str,
    ) -> Self {
        let job = node_type.is_job().then(JobData::default);
        Self {
            id: id.into(),
            title: title.into(),
            node_type,
            status: DEFAULT_STATUS.to_string(),
            priority: DEFAULT_PRIORITY.to_string(),
            team: String::new(),
            owner: String::new(),
            description: None,
            summary: None,
            job,
            created_at: now.to_string(),
            updated_at: now.to_string(),
            extra_attributes: BTreeMap::new(),
        }
    }

    /// Change the type, keeping `job` present exactly when the type is `job`.
    pub fn set_type(&mut self, node_type: NodeType) {
        if node_type.is_job() {
            if self.job.is_none() {
                self.job = Some(JobData::default());
            }
        } else {
            self.job = None;
        }
        self.node_type = node_type;
    }

    /// Whether `job` presence agrees with the node type.
    #[must_use]
    pub const fn job_invariant_holds(&self) -> bool {
        self.node_type.is_job() == self.job.is_some()
    }

    /// Case-insensitive substring match over title and description.
    #[must_use]
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle_lower))
    }
}

/// Fields for [`crate::model::tree::ProductTree::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNode {
    pub node_type: NodeType,
    pub title: String,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub team: Option<String>,
    pub owner: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub job: Option<JobData>,
}

/// Partial update merged by [`crate::model::tree::ProductTree::update`].
///
/// `None` leaves a field untouched. For the optional text fields, `Some("")`
/// clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePatch {
    pub title: Option<String>,
    pub node_type: Option<NodeType>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub team: Option<String>,
    pub owner: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub job_content: Option<String>,
    pub effort_estimate: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl NodePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the patch touches job fields.
    #[must_use]
    pub const fn has_job_fields(&self) -> bool {
        self.job_content.is_some()
            || self.effort_estimate.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
    }

    /// Field names accepted by [`NodePatch::set_field`].
    pub const FIELDS: [&'static str; 12] = [
        "title",
        "type",
        "status",
        "priority",
        "team",
        "owner",
        "description",
        "summary",
        "job_content",
        "effort",
        "start",
        "end",
    ];

    /// Set one field by its XML name (`effort`, `start`, `end` for job dates).
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Validation`] for an unknown field name.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), TreeError> {
        let value = value.to_string();
        match field {
            "title" => self.title = Some(value),
            "type" => self.node_type = Some(NodeType::from(value.as_str())),
            "status" => self.status = Some(value),
            "priority" => self.priority = Some(value),
            "team" => self.team = Some(value),
            "owner" => self.owner = Some(value),
            "description" => self.description = Some(value),
            "summary" => self.summary = Some(value),
            "job_content" => self.job_content = Some(value),
            "effort" | "effort_estimate" => self.effort_estimate = Some(value),
            "start" | "start_date" => self.start_date = Some(value),
            "end" | "end_date" => self.end_date = Some(value),
            other => {
                return Err(TreeError::Validation(format!(
                    "unknown field '{other}' (expected one of: {})",
                    Self::FIELDS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Apply the patch in place. Does not touch `updated_at`.
    pub fn apply(self, node: &mut Node) {
        if let Some(kind) = self.node_type {
            node.set_type(kind);
        }
        if let Some(title) = self.title {
            node.title = title.trim().to_string();
        }
        if let Some(status) = self.status {
            node.status = status;
        }
        if let Some(priority) = self.priority {
            node.priority = priority;
        }
        if let Some(team) = self.team {
            node.team = team;
        }
        if let Some(owner) = self.owner {
            node.owner = owner;
        }
        if let Some(description) = self.description {
            node.description = trimmed(&description);
        }
        if let Some(summary) = self.summary {
            node.summary = trimmed(&summary);
        }
        if let Some(job) = node.job.as_mut() {
            if let Some(v) = self.job_content {
                job.job_content = v.trim().to_string();
            }
            if let Some(v) = self.effort_estimate {
                job.effort_estimate = v;
            }
            if let Some(v) = self.start_date {
                job.start_date = v;
            }
            if let Some(v) = self.end_date {
                job.end_date = v;
            }
        }
    }
}

/// Surrounding whitespace dropped, matching what an XML re-import reads.
pub(crate) fn trimmed(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_and_malformed_types_are_rejected() {
        let bad_types = [
            "title",
            "job_content",
            "product_tree",
            "edge",
            "user story",
            "",
            "1st",
            "a:b",
            "xml_thing",
        ];
        for bad in bad_types {
            let err = NodeType::from(bad).validate().expect_err(bad);
            assert!(matches!(err, TreeError::Validation(_)), "{bad}");
        }
        let good_types = ["product", "work_item", "key_result", "user-story", "epic.v2", "_draft"];
        for good in good_types {
            NodeType::from(good).validate().expect(good);
        }
    }

    #[test]
    fn node_type_round_trips_tag_names() {
        for tag in ["product", "goal", "job", "work_item", "work", "epic_thing"] {
            assert_eq!(NodeType::from(tag).as_str(), tag);
        }
        assert_eq!(NodeType::from("epic_thing"), NodeType::Other("epic_thing".into()));
    }

    #[test]
    fn jira_mapping() {
        assert_eq!(NodeType::Product.jira_issue_type(), "Initiative");
        assert_eq!(NodeType::Goal.jira_issue_type(), "Initiative");
        assert_eq!(NodeType::Job.jira_issue_type(), "Epic");
        assert_eq!(NodeType::WorkItem.jira_issue_type(), "Story");
        assert_eq!(NodeType::from("custom").jira_issue_type(), "Story");
    }

    #[test]
    fn set_field_maps_xml_names() {
        let mut patch = NodePatch::default();
        patch.set_field("effort", "8").expect("effort");
        patch.set_field("type", "job").expect("type");
        patch.set_field("description", "").expect("description");
        assert_eq!(patch.effort_estimate.as_deref(), Some("8"));
        assert_eq!(patch.node_type, Some(NodeType::Job));
        assert_eq!(patch.description.as_deref(), Some(""));
        assert!(patch.has_job_fields());
        let err = patch.set_field("colour", "red").expect_err("unknown");
        assert!(err.to_string().contains("unknown field 'colour'"));
    }

    #[test]
    fn labels_for_unknown_types_are_title_cased() {
        assert_eq!(NodeType::WorkItem.label(), "Work Item");
        assert_eq!(NodeType::from("key_result").label(), "Key Result");
    }

    #[test]
    fn type_change_keeps_job_invariant() {
        let mut node = Node::new("a", NodeType::Goal, "A", "2024-01-01T00:00:00Z");
        assert!(node.job.is_none());
        node.set_type(NodeType::Job);
        assert!(node.job.is_some());
        assert!(node.job_invariant_holds());
        node.set_type(NodeType::Work);
        assert!(node.job.is_none());
    }

    #[test]
    fn patch_clears_optional_text_with_empty_string() {
        let mut node = Node::new("a", NodeType::Goal, "A", "t");
        node.description = Some("old".into());
        NodePatch {
            description: Some(String::new()),
            title: Some("B".into()),
            ..NodePatch::default()
        }
        .apply(&mut node);
        assert_eq!(node.description, None);
        assert_eq!(node.title, "B");
    }

    #[test]
    fn node_type_serializes_as_tag() {
        let json = serde_json::to_string(&NodeType::WorkItem).expect("serialize");
        assert_eq!(json, "\"work_item\"");
    }
}
