//! Graph view of a product tree.
//!
//! ## Pipeline
//!
//! ```text
//! TreeSnapshot (nodes + contains edges)
//!        ↓  build::TreeGraph::from_snapshot()
//! TreeGraph (DiGraph, anomalies recorded)
//!        ├─ cycles::detect_cycles() / cycle_components()
//!        └─ stats::GraphStats::from_graph()
//! ```

pub mod build;
pub mod cycles;
pub mod stats;

pub use build::{DanglingEdge, TreeGraph};
pub use cycles::{cycle_components, detect_cycles};
pub use stats::{GraphStats, compute_average_fanout, compute_depth};
