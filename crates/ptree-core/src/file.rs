//! Reading and writing tree files.
//!
//! A tree file is either product tree XML or a snapshot (`.json`). Writes
//! go through a sibling temp file and a rename, so a failed save never
//! leaves a truncated file behind.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::TreeError;
use crate::export::xml::to_xml;
use crate::model::snapshot::TreeSnapshot;
use crate::model::tree::ProductTree;
use crate::xml::{import_snapshot_xml, import_xml};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeFormat {
    Xml,
    Snapshot,
}

impl TreeFormat {
    /// `.json` files are snapshots; everything else is XML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Snapshot,
            _ => Self::Xml,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Snapshot => "snapshot",
        }
    }
}

/// Parse `text` in `format`.
///
/// # Errors
///
/// Returns [`TreeError::Parse`] for malformed XML and
/// [`TreeError::Snapshot`] for invalid snapshots.
pub fn parse_tree(text: &str, format: TreeFormat) -> Result<ProductTree, TreeError> {
    match format {
        TreeFormat::Xml => import_xml(text),
        TreeFormat::Snapshot => ProductTree::from_snapshot(&TreeSnapshot::from_json(text)?),
    }
}

/// Serialize `tree` in `format`.
///
/// # Errors
///
/// Returns [`TreeError::Snapshot`] if JSON serialization fails.
pub fn render_tree(tree: &ProductTree, format: TreeFormat) -> Result<String, TreeError> {
    match format {
        TreeFormat::Xml => Ok(to_xml(tree)),
        TreeFormat::Snapshot => tree.to_snapshot().to_json(),
    }
}

/// Load a tree file, choosing the format from the extension.
///
/// # Errors
///
/// Returns [`TreeError::Io`] if the file cannot be read, or a parse error.
pub fn read_tree(path: &Path) -> Result<(ProductTree, TreeFormat), TreeError> {
    let text = fs::read_to_string(path).map_err(|source| TreeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = TreeFormat::from_path(path);
    let tree = parse_tree(&text, format)?;
    info!(path = %path.display(), format = format.as_str(), nodes = tree.len(), "tree loaded");
    Ok((tree, format))
}

/// Load a tree file as a raw snapshot, without requiring a forest.
///
/// Used where malformed graphs must be reported rather than rejected.
///
/// # Errors
///
/// Returns [`TreeError::Io`] if the file cannot be read, or a parse error.
pub fn read_snapshot(path: &Path) -> Result<(TreeSnapshot, TreeFormat), TreeError> {
    let text = fs::read_to_string(path).map_err(|source| TreeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = TreeFormat::from_path(path);
    let snapshot = match format {
        TreeFormat::Xml => import_snapshot_xml(&text)?,
        TreeFormat::Snapshot => TreeSnapshot::from_json(&text)?,
    };
    info!(
        path = %path.display(),
        format = format.as_str(),
        nodes = snapshot.nodes.len(),
        edges = snapshot.edges.len(),
        "snapshot loaded"
    );
    Ok((snapshot, format))
}

/// Write `text` to `path` atomically.
///
/// # Errors
///
/// Returns [`TreeError::Io`] if the temp file cannot be written or renamed.
pub fn write_atomic(path: &Path, text: &str) -> Result<(), TreeError> {
    let io_err = |source| TreeError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp = temp_path(path);
    fs::write(&tmp, text).map_err(io_err)?;
    if let Err(source) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(source));
    }
    debug!(path = %path.display(), bytes = text.len(), "file written");
    Ok(())
}

/// Save `tree` to `path` in `format`.
///
/// # Errors
///
/// Returns [`TreeError::Io`] on write failure.
pub fn write_tree(tree: &ProductTree, path: &Path, format: TreeFormat) -> Result<(), TreeError> {
    write_atomic(path, &render_tree(tree, format)?)?;
    info!(path = %path.display(), format = format.as_str(), nodes = tree.len(), "tree saved");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const XML: &str = r#"<product_tree><product id="p"><title>Portal</title><goal id="g"><title>Grow</title></goal></product></product_tree>"#;

    #[test]
    fn format_follows_extension() {
        assert_eq!(TreeFormat::from_path(Path::new("a.json")), TreeFormat::Snapshot);
        assert_eq!(TreeFormat::from_path(Path::new("a.JSON")), TreeFormat::Snapshot);
        assert_eq!(TreeFormat::from_path(Path::new("a.xml")), TreeFormat::Xml);
        assert_eq!(TreeFormat::from_path(Path::new("tree")), TreeFormat::Xml);
    }

    #[test]
    fn xml_file_round_trips_through_snapshot_file() {
        let dir = TempDir::new().expect("tempdir");
        let xml_path = dir.path().join("tree.xml");
        fs::write(&xml_path, XML).expect("write");

        let (tree, format) = read_tree(&xml_path).expect("read xml");
        assert_eq!(format, TreeFormat::Xml);

        let json_path = dir.path().join("out/tree.json");
        write_tree(&tree, &json_path, TreeFormat::Snapshot).expect("write json");
        let (again, format) = read_tree(&json_path).expect("read json");
        assert_eq!(format, TreeFormat::Snapshot);
        assert_eq!(again, tree);
        assert!(!dir.path().join("out/tree.json.tmp").exists());
    }

    #[test]
    fn cyclic_snapshot_reads_raw_but_not_as_tree() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("cycle.json");
        let json = r#"{"nodes":[{"id":"a","title":"A","type":"goal"},{"id":"b","title":"B","type":"goal"}],
            "edges":[{"id":"e0","from":"a","to":"b"},{"id":"e1","from":"b","to":"a"}]}"#;
        fs::write(&path, json).expect("write");

        assert!(matches!(read_tree(&path), Err(TreeError::Snapshot(_))));
        let (snapshot, format) = read_snapshot(&path).expect("raw snapshot");
        assert_eq!(format, TreeFormat::Snapshot);
        assert_eq!(snapshot.edges.len(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = read_tree(&dir.path().join("nope.xml")).expect_err("missing");
        assert!(matches!(err, TreeError::Io { .. }));
    }

    #[test]
    fn malformed_xml_is_parse_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("bad.xml");
        fs::write(&path, "<product><title>x</product>").expect("write");
        assert!(matches!(read_tree(&path), Err(TreeError::Parse { .. })));
    }
}
