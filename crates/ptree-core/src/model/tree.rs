//! In-memory product tree: nodes plus their parent/child hierarchy.
//!
//! The tree owns every [`Node`] and stores hierarchy separately as ordered
//! child lists and a parent index, so lookups in either direction are O(1).
//!
//! - `find_by_id` / `children_of` / `parent_of` answer structural questions.
//! - `create` / `update` / `delete` / `reparent` mutate in place.
//! - Iteration is in document order: roots first, each node before its
//!   children, siblings in insertion order.
//!
//! # Delete semantics
//!
//! Deleting a node removes its entire subtree. Children are never left
//! pointing at a missing parent.
//!
//! # Cycle prevention
//!
//! `reparent` rejects moving a node beneath itself or one of its
//! descendants, so the hierarchy stays a forest.

#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::error::TreeError;
use crate::model::node::{NewNode, Node, NodePatch, NodeType, trimmed};
use crate::model::now_timestamp;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Nodes and hierarchy for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductTree {
    nodes: HashMap<String, Node>,
    children: HashMap<String, Vec<String>>,
    parent: HashMap<String, String>,
    roots: Vec<String>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl ProductTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Like [`Self::find_by_id`] but reports a missing id as an error.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] if `id` is unknown.
    pub fn get(&self, id: &str) -> Result<&Node, TreeError> {
        self.nodes.get(id).ok_or_else(|| TreeError::not_found(id))
    }

    /// Root ids in document order.
    pub fn root_ids(&self) -> &[String] {
        &self.roots
    }

    pub fn roots(&self) -> Vec<&Node> {
        self.roots.iter().filter_map(|id| self.nodes.get(id)).collect()
    }

    /// Child ids of `id` in order. Empty for leaves and unknown ids.
    pub fn child_ids(&self, id: &str) -> &[String] {
        self.children.get(id).map_or(&[], Vec::as_slice)
    }

    /// Children of `id` in order. Empty for leaves and unknown ids.
    pub fn children_of(&self, id: &str) -> Vec<&Node> {
        self.child_ids(id)
            .iter()
            .filter_map(|child| self.nodes.get(child))
            .collect()
    }

    pub fn parent_id(&self, id: &str) -> Option<&str> {
        self.parent.get(id).map(String::as_str)
    }

    /// Parent of `id`, or `None` for roots and unknown ids.
    pub fn parent_of(&self, id: &str) -> Option<&Node> {
        self.parent.get(id).and_then(|p| self.nodes.get(p))
    }

    /// Sibling ids of `id` (same parent, or other roots), excluding `id`.
    pub fn sibling_ids(&self, id: &str) -> Vec<&str> {
        let peers = self
            .parent
            .get(id)
            .map_or(self.roots.as_slice(), |p| self.child_ids(p));
        peers
            .iter()
            .map(String::as_str)
            .filter(|peer| *peer != id)
            .collect()
    }

    /// Ancestor ids from the immediate parent up to the root.
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.parent.get(id);
        while let Some(p) = cursor {
            if !seen.insert(p.clone()) {
                break;
            }
            out.push(p.clone());
            cursor = self.parent.get(p);
        }
        out
    }

    /// Depth of `id`, roots at 0. `None` for unknown ids.
    pub fn depth(&self, id: &str) -> Option<usize> {
        self.contains(id).then(|| self.ancestors(id).len())
    }

    /// Breadth-first ids of the subtree rooted at `id`, including `id`.
    ///
    /// Empty if `id` is unknown.
    pub fn subtree_ids(&self, id: &str) -> Vec<String> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([id.to_string()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            for child in self.child_ids(&current) {
                queue.push_back(child.clone());
            }
            out.push(current);
        }
        out
    }

    /// All nodes in document order (pre-order from each root).
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.preorder_ids()
            .into_iter()
            .filter_map(|id| self.nodes.get(id))
    }

    /// Pre-order walk with each node's depth.
    pub fn walk(&self) -> Vec<(&Node, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(&str, usize)> =
            self.roots.iter().rev().map(|r| (r.as_str(), 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                out.push((node, depth));
            }
            for child in self.child_ids(id).iter().rev() {
                stack.push((child.as_str(), depth + 1));
            }
        }
        out
    }

    fn preorder_ids(&self) -> Vec<&str> {
        self.walk().into_iter().map(|(n, _)| n.id.as_str()).collect()
    }

    /// Nodes whose title or description contains `query`, case-insensitively.
    pub fn search(&self, query: &str) -> Vec<&Node> {
        let needle = query.to_lowercase();
        self.iter().filter(|n| n.matches(&needle)).collect()
    }
}

// ---------------------------------------------------------------------------
// Mutation
// ---------------------------------------------------------------------------

impl ProductTree {
    /// Attach a fully built node under `parent` (or as a root).
    ///
    /// # Errors
    ///
    /// - [`TreeError::DuplicateId`] if the id is taken.
    /// - [`TreeError::ParentNotFound`] if `parent` is unknown.
    pub fn insert(&mut self, parent: Option<&str>, node: Node) -> Result<&Node, TreeError> {
        if self.nodes.contains_key(&node.id) {
            return Err(TreeError::DuplicateId { id: node.id });
        }
        let id = node.id.clone();
        match parent {
            Some(p) => {
                if !self.nodes.contains_key(p) {
                    return Err(TreeError::ParentNotFound { id: p.to_string() });
                }
                self.children.entry(p.to_string()).or_default().push(id.clone());
                self.parent.insert(id.clone(), p.to_string());
            }
            None => self.roots.push(id.clone()),
        }
        Ok(self.nodes.entry(id).or_insert(node))
    }

    /// Create a child of `parent_id` with a fresh id.
    ///
    /// The id has the form `{parent_id}.{type}_{n}` where `n` starts at the
    /// parent's current child count and skips ids already in use.
    ///
    /// # Errors
    ///
    /// - [`TreeError::ParentNotFound`] if `parent_id` is unknown.
    /// - [`TreeError::Validation`] if the type cannot be written as a tag.
    pub fn create(&mut self, parent_id: &str, fields: NewNode) -> Result<&Node, TreeError> {
        fields.node_type.validate()?;
        if !self.contains(parent_id) {
            return Err(TreeError::ParentNotFound {
                id: parent_id.to_string(),
            });
        }
        let id = self.fresh_child_id(parent_id, fields.node_type.as_str());
        let node = build_node(id, fields, &now_timestamp());
        debug!(id = %node.id, parent = parent_id, "created node");
        self.insert(Some(parent_id), node)
    }

    /// Create a new root with a fresh id `{type}_{n}`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Validation`] if the type cannot be written as a tag.
    pub fn create_root(&mut self, fields: NewNode) -> Result<&Node, TreeError> {
        fields.node_type.validate()?;
        let tag = fields.node_type.as_str().to_string();
        let mut n = self.roots.len();
        let mut id = format!("{tag}_{n}");
        while self.contains(&id) {
            n += 1;
            id = format!("{tag}_{n}");
        }
        let node = build_node(id.clone(), fields, &now_timestamp());
        debug!(id = %node.id, "created root");
        self.roots.push(id.clone());
        Ok(self.nodes.entry(id).or_insert(node))
    }

    fn fresh_child_id(&self, parent_id: &str, tag: &str) -> String {
        let mut n = self.child_ids(parent_id).len();
        loop {
            let candidate = format!("{parent_id}.{tag}_{n}");
            if !self.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Merge `patch` into node `id` and bump `updated_at`.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NotFound`] if `id` is unknown.
    /// - [`TreeError::Validation`] if the patch sets job fields on a node
    ///   that is not (and does not become) a job, blanks the title, or
    ///   changes the type to one that cannot be written as a tag.
    pub fn update(&mut self, id: &str, patch: NodePatch) -> Result<&Node, TreeError> {
        let node = self.nodes.get_mut(id).ok_or_else(|| TreeError::not_found(id))?;
        if let Some(kind) = &patch.node_type {
            kind.validate()?;
        }
        let becomes_job = patch
            .node_type
            .as_ref()
            .map_or(node.node_type.is_job(), NodeType::is_job);
        if patch.has_job_fields() && !becomes_job {
            return Err(TreeError::Validation(format!(
                "job fields can only be set on job nodes ('{id}' is {})",
                node.node_type
            )));
        }
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(TreeError::Validation("title cannot be empty".into()));
        }
        patch.apply(node);
        node.updated_at = now_timestamp();
        debug!(id, "updated node");
        Ok(node)
    }

    /// Remove `id` and its whole subtree. Returns the removed ids.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] if `id` is unknown.
    pub fn delete(&mut self, id: &str) -> Result<Vec<String>, TreeError> {
        if !self.contains(id) {
            return Err(TreeError::not_found(id));
        }
        self.detach(id);
        let removed = self.subtree_ids(id);
        for gone in &removed {
            self.nodes.remove(gone);
            self.children.remove(gone);
            self.parent.remove(gone);
        }
        debug!(id, removed = removed.len(), "deleted subtree");
        Ok(removed)
    }

    /// Move `id` under `new_parent`, or make it a root when `None`.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NotFound`] if `id` is unknown.
    /// - [`TreeError::ParentNotFound`] if `new_parent` is unknown.
    /// - [`TreeError::Cycle`] if `new_parent` is `id` or one of its descendants.
    pub fn reparent(&mut self, id: &str, new_parent: Option<&str>) -> Result<(), TreeError> {
        if !self.contains(id) {
            return Err(TreeError::not_found(id));
        }
        if let Some(p) = new_parent {
            if !self.contains(p) {
                return Err(TreeError::ParentNotFound { id: p.to_string() });
            }
            if p == id || self.ancestors(p).iter().any(|a| a == id) {
                return Err(TreeError::Cycle {
                    id: id.to_string(),
                    parent: p.to_string(),
                });
            }
        }
        self.detach(id);
        match new_parent {
            Some(p) => {
                self.children.entry(p.to_string()).or_default().push(id.to_string());
                self.parent.insert(id.to_string(), p.to_string());
            }
            None => self.roots.push(id.to_string()),
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.updated_at = now_timestamp();
        }
        Ok(())
    }

    /// Unlink `id` from its parent's child list (or the root list).
    fn detach(&mut self, id: &str) {
        match self.parent.remove(id) {
            Some(p) => {
                if let Some(siblings) = self.children.get_mut(&p) {
                    siblings.retain(|c| c != id);
                }
            }
            None => self.roots.retain(|r| r != id),
        }
    }
}

fn build_node(id: String, fields: NewNode, now: &str) -> Node {
    let mut node = Node::new(id, fields.node_type, fields.title.trim(), now);
    if let Some(status) = fields.status {
        node.status = status;
    }
    if let Some(priority) = fields.priority {
        node.priority = priority;
    }
    node.team = fields.team.unwrap_or_default();
    node.owner = fields.owner.unwrap_or_default();
    node.description = fields.description.as_deref().and_then(trimmed);
    node.summary = fields.summary.as_deref().and_then(trimmed);
    if node.node_type.is_job() {
        let mut job = fields.job.unwrap_or_default();
        job.job_content = job.job_content.trim().to_string();
        node.job = Some(job);
    }
    node
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
