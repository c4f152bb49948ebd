//! `pt delete`: remove a node and its whole subtree.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::cmd::tree_file;
use crate::output::{OutputMode, fail, render};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Product tree XML or snapshot JSON.
    pub file: PathBuf,

    /// Node id to delete; descendants are removed too.
    pub id: String,

    /// Write the result here instead of back to FILE.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Deleted {
    id: String,
    removed: Vec<String>,
    remaining: usize,
    saved_to: String,
}

pub fn run_delete(args: &DeleteArgs, output: OutputMode) -> anyhow::Result<()> {
    let mut loaded = tree_file::load(&args.file, output)?;
    let removed = loaded
        .tree
        .delete(&args.id)
        .map_err(|err| fail(output, err))?;
    let saved = loaded.save(args.output.as_deref(), output)?;

    let result = Deleted {
        id: args.id.clone(),
        removed,
        remaining: loaded.tree.len(),
        saved_to: saved.display().to_string(),
    };
    render(output, &result, |d, w| {
        writeln!(
            w,
            "✓ deleted {} ({} nodes removed, {} remain)",
            d.id,
            d.removed.len(),
            d.remaining
        )
    })
}
