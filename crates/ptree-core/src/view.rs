//! Per-session view state and the flattened rows a tree view displays.
//!
//! [`ViewState`] is owned by whoever drives the UI (the CLI `session`
//! loop, a one-shot `pt tree` call) and passed into [`visible_rows`]; the
//! tree itself carries no presentation state.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::model::node::Node;
use crate::model::tree::ProductTree;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub expanded: BTreeSet<String>,
    pub selected: Option<String>,
    search: Option<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip expansion of `id`. Returns the new state.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.to_string());
            true
        }
    }

    pub fn expand(&mut self, id: &str) {
        self.expanded.insert(id.to_string());
    }

    pub fn collapse(&mut self, id: &str) {
        self.expanded.remove(id);
    }

    /// Expand every node that has children.
    pub fn expand_all(&mut self, tree: &ProductTree) {
        self.expanded = tree
            .iter()
            .filter(|n| !tree.child_ids(&n.id).is_empty())
            .map(|n| n.id.clone())
            .collect();
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Select `id`, expanding its ancestors so it is visible.
    ///
    /// Returns `false` (and leaves the selection alone) if `id` is unknown.
    pub fn select(&mut self, tree: &ProductTree, id: &str) -> bool {
        if !tree.contains(id) {
            return false;
        }
        self.expanded.extend(tree.ancestors(id));
        self.selected = Some(id.to_string());
        true
    }

    /// Set or clear (`None` / blank) the search filter.
    pub fn set_search(&mut self, query: Option<&str>) {
        self.search = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Drop references to ids no longer in `tree` (after deletes).
    pub fn prune(&mut self, tree: &ProductTree) {
        self.expanded.retain(|id| tree.contains(id));
        if self.selected.as_deref().is_some_and(|id| !tree.contains(id)) {
            self.selected = None;
        }
    }
}

/// One displayed line of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub id: String,
    pub depth: usize,
    pub icon: &'static str,
    pub title: String,
    pub type_label: String,
    pub status: String,
    pub priority: String,
    pub has_children: bool,
    pub expanded: bool,
    pub selected: bool,
    /// The node itself matches the active search.
    pub matched: bool,
}

/// Flatten `tree` into the rows visible under `view`.
///
/// Without a search, roots are shown and children appear under expanded
/// nodes. With a search, only matching nodes and their ancestors are shown,
/// and those ancestors are treated as expanded.
pub fn visible_rows(tree: &ProductTree, view: &ViewState) -> Vec<Row> {
    let shown = view.search().map(|query| search_closure(tree, query));
    let mut rows = Vec::new();
    let mut stack: Vec<(&str, usize)> = tree
        .root_ids()
        .iter()
        .rev()
        .map(|id| (id.as_str(), 0))
        .collect();

    while let Some((id, depth)) = stack.pop() {
        let Some(node) = tree.find_by_id(id) else {
            continue;
        };
        if shown.as_ref().is_some_and(|(visible, _)| !visible.contains(id)) {
            continue;
        }
        let children = tree.child_ids(id);
        let expanded = match &shown {
            Some((visible, _)) => children.iter().any(|c| visible.contains(c.as_str())),
            None => view.expanded.contains(id),
        };
        rows.push(row(node, depth, !children.is_empty(), expanded, view, shown.as_ref()));
        if expanded {
            stack.extend(children.iter().rev().map(|c| (c.as_str(), depth + 1)));
        }
    }
    rows
}

fn row(
    node: &Node,
    depth: usize,
    has_children: bool,
    expanded: bool,
    view: &ViewState,
    shown: Option<&(HashSet<&str>, HashSet<&str>)>,
) -> Row {
    Row {
        id: node.id.clone(),
        depth,
        icon: node.node_type.icon(),
        title: node.title.clone(),
        type_label: node.node_type.label(),
        status: node.status.clone(),
        priority: node.priority.clone(),
        has_children,
        expanded,
        selected: view.selected.as_deref() == Some(node.id.as_str()),
        matched: shown.is_some_and(|(_, matches)| matches.contains(node.id.as_str())),
    }
}

/// `(visible, matched)`: matches plus all their ancestors, and the matches alone.
fn search_closure<'a>(tree: &'a ProductTree, query: &str) -> (HashSet<&'a str>, HashSet<&'a str>) {
    let matched: HashSet<&str> = tree
        .iter()
        .filter(|n| n.matches(query))
        .map(|n| n.id.as_str())
        .collect();
    let mut visible = matched.clone();
    for id in &matched {
        let mut cursor = tree.parent_id(id);
        while let Some(parent) = cursor {
            if !visible.insert(parent) {
                break;
            }
            cursor = tree.parent_id(parent);
        }
    }
    (visible, matched)
}

/// Everything a detail pane shows for one node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeDetails {
    #[serde(flatten)]
    pub node: Node,
    pub type_label: String,
    pub parent_id: Option<String>,
    pub parent_title: Option<String>,
    pub depth: usize,
    pub child_count: usize,
    pub descendant_count: usize,
}

/// Detail record for `id`, or `None` if unknown.
pub fn details(tree: &ProductTree, id: &str) -> Option<NodeDetails> {
    let node = tree.find_by_id(id)?;
    let parent = tree.parent_of(id);
    Some(NodeDetails {
        node: node.clone(),
        type_label: node.node_type.label(),
        parent_id: parent.map(|p| p.id.clone()),
        parent_title: parent.map(|p| p.title.clone()),
        depth: tree.depth(id).unwrap_or_default(),
        child_count: tree.child_ids(id).len(),
        descendant_count: tree.subtree_ids(id).len().saturating_sub(1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::NodeType;

    fn sample() -> ProductTree {
        let mut tree = ProductTree::new();
        let t = "2025-01-01T00:00:00Z";
        tree.insert(None, Node::new("p", NodeType::Product, "Payments", t)).expect("insert");
        tree.insert(Some("p"), Node::new("g", NodeType::Goal, "Refunds", t)).expect("insert");
        tree.insert(Some("g"), Node::new("j", NodeType::Job, "Refund API", t)).expect("insert");
        tree.insert(Some("p"), Node::new("h", NodeType::Goal, "Invoices", t)).expect("insert");
        tree.insert(None, Node::new("q", NodeType::Product, "Search", t)).expect("insert");
        tree
    }

    fn ids(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn collapsed_tree_shows_roots() {
        let tree = sample();
        let rows = visible_rows(&tree, &ViewState::new());
        assert_eq!(ids(&rows), vec!["p", "q"]);
        assert!(rows[0].has_children);
        assert!(!rows[0].expanded);
        assert!(!rows[1].has_children);
    }

    #[test]
    fn expanding_reveals_children() {
        let tree = sample();
        let mut view = ViewState::new();
        assert!(view.toggle("p"));
        let rows = visible_rows(&tree, &view);
        assert_eq!(ids(&rows), vec!["p", "g", "h", "q"]);
        assert_eq!(rows[1].depth, 1);
        assert!(!view.toggle("p"));
        assert_eq!(ids(&visible_rows(&tree, &view)), vec!["p", "q"]);
    }

    #[test]
    fn expand_all_shows_everything() {
        let tree = sample();
        let mut view = ViewState::new();
        view.expand_all(&tree);
        assert_eq!(ids(&visible_rows(&tree, &view)), vec!["p", "g", "j", "h", "q"]);
        view.collapse_all();
        assert_eq!(visible_rows(&tree, &view).len(), 2);
    }

    #[test]
    fn select_expands_ancestors() {
        let tree = sample();
        let mut view = ViewState::new();
        assert!(view.select(&tree, "j"));
        let rows = visible_rows(&tree, &view);
        assert_eq!(ids(&rows), vec!["p", "g", "j", "h", "q"]);
        assert!(rows.iter().find(|r| r.id == "j").is_some_and(|r| r.selected));
        assert!(!view.select(&tree, "nope"));
        assert_eq!(view.selected.as_deref(), Some("j"));
    }

    #[test]
    fn search_shows_matches_and_ancestors() {
        let tree = sample();
        let mut view = ViewState::new();
        view.set_search(Some("  REFUND api "));
        let rows = visible_rows(&tree, &view);
        assert_eq!(ids(&rows), vec!["p", "g", "j"]);
        assert!(rows[0].expanded);
        assert!(!rows[0].matched);
        assert!(rows[2].matched);
        view.set_search(Some(""));
        assert_eq!(view.search(), None);
    }

    #[test]
    fn search_without_matches_shows_nothing() {
        let tree = sample();
        let mut view = ViewState::new();
        view.set_search(Some("zzz"));
        assert!(visible_rows(&tree, &view).is_empty());
    }

    #[test]
    fn prune_drops_deleted_ids() {
        let mut tree = sample();
        let mut view = ViewState::new();
        view.select(&tree, "j");
        tree.delete("g").expect("delete");
        view.prune(&tree);
        assert_eq!(view.selected, None);
        assert!(!view.expanded.contains("g"));
    }

    #[test]
    fn details_include_parent_and_counts() {
        let tree = sample();
        let d = details(&tree, "g").expect("details");
        assert_eq!(d.parent_title.as_deref(), Some("Payments"));
        assert_eq!(d.depth, 1);
        assert_eq!(d.child_count, 1);
        assert_eq!(d.descendant_count, 1);
        assert!(details(&tree, "nope").is_none());
    }
}
