#![forbid(unsafe_code)]
//! Read-only structural diagnostics for product trees.
//!
//! # Conventions
//!
//! - **Input**: every entry point takes a [`ptree_core::TreeSnapshot`] (or a
//!   tree, projected to one) and never mutates it.
//! - **Malformed input**: cycles, dangling edges and repeated ids are
//!   reported, never rejected.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod diagnostics;
pub mod graph;
pub mod report;

pub use diagnostics::{
    Outlier, dependency_outliers, find_duplicate_titles, find_orphans, find_roots,
};
pub use graph::{GraphStats, TreeGraph, cycle_components, detect_cycles};
pub use report::{AnalysisReport, NodeRef, analyze, analyze_tree};
