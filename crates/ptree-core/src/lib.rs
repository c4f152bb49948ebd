//! Core data model for product trees.
//!
//! A product tree is a forest of [`Node`]s (products → goals → jobs → work
//! items) loaded from XML, edited in memory and exported back to XML or a
//! Jira-style CSV.

pub mod config;
pub mod error;
pub mod export;
pub mod file;
pub mod model;
pub mod view;
pub mod xml;

pub use error::{ErrorCode, TreeError};
pub use file::{TreeFormat, read_snapshot, read_tree, write_tree};
pub use model::node::{JobData, NewNode, Node, NodePatch, NodeType};
pub use model::snapshot::{Edge, TreeSnapshot};
pub use model::tree::ProductTree;
