//! `pt move`: reparent a node.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::cmd::tree_file::{self, parent_arg};
use crate::output::{OutputMode, fail, render};

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Product tree XML or snapshot JSON.
    pub file: PathBuf,

    /// Node id to move.
    pub id: String,

    /// New parent id. Use "--parent none" to make it top-level.
    #[arg(long)]
    pub parent: String,

    /// Write the result here instead of back to FILE.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Moved<'a> {
    id: &'a str,
    from: Option<String>,
    to: Option<&'a str>,
    depth: usize,
    saved_to: String,
}

pub fn run_move(args: &MoveArgs, output: OutputMode) -> anyhow::Result<()> {
    let mut loaded = tree_file::load(&args.file, output)?;
    let from = loaded.tree.parent_id(&args.id).map(str::to_string);
    let to = parent_arg(&args.parent);
    loaded
        .tree
        .reparent(&args.id, to)
        .map_err(|err| fail(output, err))?;
    let saved = loaded.save(args.output.as_deref(), output)?;

    let moved = Moved {
        id: &args.id,
        from,
        to,
        depth: loaded.tree.depth(&args.id).unwrap_or_default(),
        saved_to: saved.display().to_string(),
    };
    render(output, &moved, |m, w| {
        writeln!(
            w,
            "✓ moved {} under {}",
            m.id,
            m.to.unwrap_or("(top level)")
        )
    })
}
