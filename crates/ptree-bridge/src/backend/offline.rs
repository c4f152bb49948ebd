//! Rule-based answers computed from the loaded tree.
//!
//! Keywords in the question pick a report; everything is derived from the
//! tree and the structural analyzer, so this backend never touches the
//! network and is always healthy.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use ptree_analyze::analyze_tree;
use ptree_core::config::AnalysisConfig;
use ptree_core::{Node, NodeType, ProductTree};
use tracing::debug;

use super::{AiBackend, AskRequest, HealthStatus};
use crate::error::BridgeError;

const NO_TREE: &str = "Load a product tree first, then ask about its structure, status, \
priorities, teams, goals, jobs or work items.";

const HELP: &str = "I can answer questions about the loaded product tree:\n\
- analysis / summary: node counts and status distribution\n\
- suggest / improve: missing descriptions, teams and blockers\n\
- status / progress: completion and blocked rates\n\
- priority: P0-P3 distribution\n\
- team: ownership by team\n\
- goal, job, work item: per-type reports\n\
- duplicate, cycle, orphan: structural issues";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Help,
    Structure,
    Suggestions,
    Analysis,
    Status,
    Priorities,
    Teams,
    Goals,
    Jobs,
    WorkItems,
    General,
}

impl Topic {
    fn classify(question: &str) -> Self {
        let q = question.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| q.contains(w));
        if has(&["help", "what can you"]) {
            Self::Help
        } else if has(&["duplicate", "cycle", "orphan", "issue", "problem"]) {
            Self::Structure
        } else if has(&["suggest", "recommend", "improve"]) {
            Self::Suggestions
        } else if has(&["analy", "summary", "overview"]) {
            Self::Analysis
        } else if has(&["status", "progress"]) {
            Self::Status
        } else if has(&["priorit"]) {
            Self::Priorities
        } else if has(&["team"]) {
            Self::Teams
        } else if has(&["goal"]) {
            Self::Goals
        } else if has(&["job", "epic"]) {
            Self::Jobs
        } else if has(&["work", "story", "stories"]) {
            Self::WorkItems
        } else {
            Self::General
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OfflineBackend {
    analysis: AnalysisConfig,
}

impl OfflineBackend {
    #[must_use]
    pub const fn new(analysis: AnalysisConfig) -> Self {
        Self { analysis }
    }

    fn answer(&self, question: &str, tree: &ProductTree) -> String {
        let topic = Topic::classify(question);
        debug!(?topic, "offline answer");
        let nodes: Vec<&Node> = tree.iter().collect();
        match topic {
            Topic::Help => HELP.to_string(),
            Topic::Structure => self.structure(tree),
            Topic::Suggestions => suggestions(&nodes),
            Topic::Analysis => analysis(&nodes),
            Topic::Status => status(&nodes),
            Topic::Priorities => priorities(&nodes),
            Topic::Teams => teams(&nodes),
            Topic::Goals => goals(&nodes),
            Topic::Jobs => jobs(&nodes),
            Topic::WorkItems => work_items(&nodes),
            Topic::General => format!(
                "I can't answer \"{}\" offline.\n\n{HELP}",
                question.trim()
            ),
        }
    }

    fn structure(&self, tree: &ProductTree) -> String {
        let report = analyze_tree(tree, &self.analysis);
        let findings = report.findings();
        let mut out = String::from("## Structure Check\n\n");
        let _ = writeln!(
            out,
            "**Nodes:** {}  **Roots:** {}  **Max depth:** {}",
            report.stats.node_count,
            report.roots.len(),
            report.stats.max_depth
        );
        if findings.is_empty() {
            out.push_str("\nNo duplicates, cycles, orphans or overloaded nodes found.");
        } else {
            out.push_str("\n**Findings:**\n");
            for finding in findings {
                let _ = writeln!(out, "- {finding}");
            }
        }
        out.trim_end().to_string()
    }
}

impl AiBackend for OfflineBackend {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn endpoint(&self) -> &str {
        "local rules"
    }

    fn ask(&self, request: &AskRequest<'_>) -> Result<String, BridgeError> {
        Ok(match request.tree {
            Some(tree) if !tree.is_empty() => self.answer(request.question, tree),
            Some(_) => "The product tree is empty. Add a product, goals and work items to get started.".to_string(),
            None => NO_TREE.to_string(),
        })
    }

    fn health(&self) -> Result<HealthStatus, BridgeError> {
        Ok(HealthStatus {
            backend: self.name().to_string(),
            endpoint: self.endpoint().to_string(),
            healthy: true,
            detail: "rule-based answers, no network".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[allow(clippy::cast_precision_loss)]
fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

/// `in_progress` → `In Progress`.
fn title_case(value: &str) -> String {
    value
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn count_by<'a>(nodes: &[&'a Node], key: impl Fn(&'a Node) -> &'a str) -> BTreeMap<&'a str, usize> {
    let mut counts = BTreeMap::new();
    for &node in nodes {
        *counts.entry(key(node)).or_insert(0) += 1;
    }
    counts
}

fn team_of(node: &Node) -> &str {
    if node.team.is_empty() {
        "Unassigned"
    } else {
        &node.team
    }
}

fn push_distribution(out: &mut String, counts: &BTreeMap<&str, usize>, total: usize) {
    for (key, count) in counts {
        let _ = writeln!(
            out,
            "- {}: {count} ({:.1}%)",
            title_case(key),
            percent(*count, total)
        );
    }
}

fn of_type<'a>(nodes: &[&'a Node], wanted: impl Fn(&NodeType) -> bool) -> Vec<&'a Node> {
    nodes
        .iter()
        .copied()
        .filter(|n| wanted(&n.node_type))
        .collect()
}

fn analysis(nodes: &[&Node]) -> String {
    let types = count_by(nodes, |n| n.node_type.as_str());
    let mut out = String::from("## Product Tree Analysis\n\n");
    let _ = writeln!(out, "**Total Nodes:** {}", nodes.len());
    let structure: Vec<String> = types
        .iter()
        .map(|(kind, count)| format!("{count} {}", kind.replace('_', " ")))
        .collect();
    let _ = writeln!(out, "**Structure:** {}", structure.join(", "));
    out.push_str("\n**Status Distribution:**\n");
    push_distribution(&mut out, &count_by(nodes, |n| n.status.as_str()), nodes.len());
    out.trim_end().to_string()
}

fn suggestions(nodes: &[&Node]) -> String {
    let mut out = String::from("## Improvement Suggestions\n\n");
    let missing_desc = nodes.iter().filter(|n| n.description.is_none()).count();
    if missing_desc > 0 {
        let _ = writeln!(
            out,
            "**Add Descriptions:** {missing_desc} nodes are missing descriptions.\n"
        );
    }
    let missing_team = nodes.iter().filter(|n| n.team.is_empty()).count();
    if missing_team > 0 {
        let _ = writeln!(
            out,
            "**Assign Teams:** {missing_team} nodes don't have an assigned team.\n"
        );
    }
    let blocked = nodes.iter().filter(|n| n.status == "blocked").count();
    if blocked > 0 {
        let _ = writeln!(
            out,
            "**Address Blockers:** {blocked} items are blocked. Review them and identify actions to unblock.\n"
        );
    }
    let active = nodes
        .iter()
        .filter(|n| matches!(n.status.as_str(), "in_progress" | "active"))
        .count();
    if active > 0 {
        let _ = writeln!(
            out,
            "**Monitor Progress:** {active} items are in progress. Regular status updates keep stakeholders informed.\n"
        );
    }
    if missing_desc + missing_team + blocked + active == 0 {
        out.push_str("**Great job!** The tree looks well-structured. Review it regularly to keep it aligned with your goals.");
    }
    out.trim_end().to_string()
}

fn status(nodes: &[&Node]) -> String {
    let total = nodes.len();
    let counts = count_by(nodes, |n| n.status.as_str());
    let mut out = String::from("## Status Analysis\n\n");
    for (status, count) in &counts {
        let _ = writeln!(
            out,
            "**{}:** {count} items ({:.1}%)",
            title_case(status),
            percent(*count, total)
        );
    }
    out.push_str("\n**Insights:**\n");
    let rate = |key: &str| counts.get(key).map(|c| percent(*c, total));
    if let Some(done) = rate("completed") {
        let _ = writeln!(out, "- Completion rate: {done:.1}%");
    }
    if let Some(blocked) = rate("blocked") {
        let _ = writeln!(out, "- Blocked items: {blocked:.1}% (consider addressing blockers)");
    }
    if let Some(active) = rate("in_progress") {
        let _ = writeln!(out, "- Active work: {active:.1}%");
    }
    out.trim_end().to_string()
}

fn priorities(nodes: &[&Node]) -> String {
    let total = nodes.len();
    let counts = count_by(nodes, |n| {
        if n.priority.is_empty() {
            "Unset"
        } else {
            n.priority.as_str()
        }
    });
    let mut out = String::from("## Priority Analysis\n\n");
    for (priority, count) in &counts {
        let _ = writeln!(
            out,
            "**{priority}:** {count} items ({:.1}%)",
            percent(*count, total)
        );
    }
    let high = counts.get("P0").copied().unwrap_or(0) + counts.get("P1").copied().unwrap_or(0);
    if high > 0 {
        let _ = writeln!(
            out,
            "\n**High Priority Items (P0+P1):** {high} ({:.1}%)",
            percent(high, total)
        );
    }
    if let Some(unset) = counts.get("Unset") {
        let _ = writeln!(out, "\n**Items without priorities:** {unset}");
    }
    out.trim_end().to_string()
}

fn teams(nodes: &[&Node]) -> String {
    let total = nodes.len();
    let counts = count_by(nodes, team_of);
    let mut out = String::from("## Team Analysis\n\n");
    for (team, count) in &counts {
        let _ = writeln!(out, "**{team}:** {count} items ({:.1}%)", percent(*count, total));
    }
    if let Some(unassigned) = counts.get("Unassigned") {
        let _ = writeln!(
            out,
            "\n**Unassigned items:** {unassigned} ({:.1}%). Assigning teams improves accountability.",
            percent(*unassigned, total)
        );
    }
    out.trim_end().to_string()
}

fn goals(nodes: &[&Node]) -> String {
    let goals = of_type(nodes, |t| *t == NodeType::Goal);
    if goals.is_empty() {
        return "No goals found. Consider adding strategic goals to guide product development."
            .to_string();
    }
    let mut out = String::from("## Goals Analysis\n\n");
    let _ = writeln!(out, "**Total Goals:** {}\n", goals.len());
    out.push_str("**Goal Status:**\n");
    push_distribution(&mut out, &count_by(&goals, |n| n.status.as_str()), goals.len());
    let no_desc = goals.iter().filter(|g| g.description.is_none()).count();
    if no_desc > 0 {
        let _ = writeln!(out, "\n**Goals without descriptions:** {no_desc}");
    }
    out.trim_end().to_string()
}

fn jobs(nodes: &[&Node]) -> String {
    let jobs = of_type(nodes, NodeType::is_job);
    if jobs.is_empty() {
        return "No jobs found. Consider breaking goals down into jobs.".to_string();
    }
    let mut out = String::from("## Jobs Analysis\n\n");
    let _ = writeln!(out, "**Total Jobs:** {}\n", jobs.len());
    let efforts: Vec<&str> = jobs
        .iter()
        .filter_map(|j| j.job.as_ref())
        .map(|data| data.effort_estimate.as_str())
        .filter(|effort| !effort.is_empty())
        .collect();
    if efforts.is_empty() {
        out.push_str("**No effort estimates found.** Add estimates to help with planning.\n");
    } else {
        let _ = writeln!(
            out,
            "**Jobs with effort estimates:** {}/{}",
            efforts.len(),
            jobs.len()
        );
        let total: f64 = efforts.iter().filter_map(|e| e.parse::<f64>().ok()).sum();
        if total > 0.0 {
            let _ = writeln!(out, "**Total estimated effort:** {total} story points");
        }
    }
    let with_content = jobs
        .iter()
        .filter(|j| j.job.as_ref().is_some_and(|d| !d.job_content.is_empty()))
        .count();
    let _ = writeln!(
        out,
        "\n**Jobs with detailed content:** {with_content}/{}",
        jobs.len()
    );
    out.trim_end().to_string()
}

fn work_items(nodes: &[&Node]) -> String {
    let items = of_type(nodes, |t| matches!(t, NodeType::WorkItem | NodeType::Work));
    if items.is_empty() {
        return "No work items found. Consider breaking jobs down into work items.".to_string();
    }
    let mut out = String::from("## Work Items Analysis\n\n");
    let _ = writeln!(out, "**Total Work Items:** {}\n", items.len());
    out.push_str("**Status Distribution:**\n");
    push_distribution(&mut out, &count_by(&items, |n| n.status.as_str()), items.len());
    let by_team = count_by(&items, team_of);
    if by_team.len() > 1 {
        out.push_str("\n**Team Distribution:**\n");
        for (team, count) in &by_team {
            let _ = writeln!(out, "- {team}: {count} ({:.1}%)", percent(*count, items.len()));
        }
    }
    out.trim_end().to_string()
}
