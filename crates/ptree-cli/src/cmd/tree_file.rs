//! Loading and saving the `<file>` argument shared by tree commands.
//!
//! Mutating commands write back to the input in its own format unless
//! `--output` names another file, whose extension then picks the format.

use std::path::{Path, PathBuf};

use ptree_core::{ProductTree, TreeFormat, read_tree, write_tree};

use crate::output::{OutputMode, fail};

/// A tree loaded from disk plus where it came from.
#[derive(Debug)]
pub struct LoadedTree {
    pub tree: ProductTree,
    pub path: PathBuf,
    pub format: TreeFormat,
}

impl LoadedTree {
    /// Write the tree back, to `output` when given.
    ///
    /// Returns the path written.
    pub fn save(&self, output: Option<&Path>, mode: OutputMode) -> anyhow::Result<PathBuf> {
        let (path, format) = match output {
            Some(path) => (path, TreeFormat::from_path(path)),
            None => (self.path.as_path(), self.format),
        };
        write_tree(&self.tree, path, format).map_err(|err| fail(mode, err))?;
        Ok(path.to_path_buf())
    }
}

/// Load `path`, rendering any failure before returning it.
pub fn load(path: &Path, mode: OutputMode) -> anyhow::Result<LoadedTree> {
    let (tree, format) = read_tree(path).map_err(|err| fail(mode, err))?;
    Ok(LoadedTree {
        tree,
        path: path.to_path_buf(),
        format,
    })
}

/// `"none"` (any case) or `"-"` means top level.
pub fn parent_arg(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    if raw == "-" || raw.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_arg_recognizes_top_level() {
        assert_eq!(parent_arg("none"), None);
        assert_eq!(parent_arg("NONE"), None);
        assert_eq!(parent_arg("-"), None);
        assert_eq!(parent_arg(" g1 "), Some("g1"));
    }
}
