//! XML reading and the product tree importers (nested and edge-list).

pub mod edge_list;
pub mod import;
pub mod reader;

pub use import::{import_snapshot_xml, import_snapshot_xml_at, import_xml, import_xml_at};
