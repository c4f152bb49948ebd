//! Serializers from a [`crate::ProductTree`] to external formats.

pub mod jira;
pub mod xml;

pub use jira::{JiraOptions, to_jira_csv};
pub use xml::to_xml;

/// Quote a CSV field if it contains a comma, quote or line break.
pub fn escape_csv(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
