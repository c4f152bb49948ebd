//! `pt tree`: print the visible rows of a tree view.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use ptree_core::view::{Row, ViewState, visible_rows};
use ptree_core::{ErrorCode, ProductTree};

use crate::cmd::tree_file;
use crate::output::{CliError, OutputMode, render_error, render_mode};

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Product tree XML or snapshot JSON.
    pub file: PathBuf,

    /// Show only nodes matching this text, with their ancestors.
    #[arg(long, short)]
    pub search: Option<String>,

    /// Expand this node (repeatable).
    #[arg(long, value_name = "ID")]
    pub expand: Vec<String>,

    /// Expand every node.
    #[arg(long, conflicts_with = "expand")]
    pub expand_all: bool,

    /// Select this node, expanding its ancestors.
    #[arg(long, value_name = "ID")]
    pub select: Option<String>,
}

pub fn run_tree(args: &TreeArgs, output: OutputMode) -> anyhow::Result<()> {
    let loaded = tree_file::load(&args.file, output)?;
    let tree = &loaded.tree;

    let mut view = ViewState::new();
    if args.expand_all {
        view.expand_all(tree);
    }
    for id in &args.expand {
        view.expand(id);
    }
    if let Some(id) = &args.select
        && !view.select(tree, id)
    {
        render_error(
            output,
            &CliError::coded(format!("node '{id}' not found"), ErrorCode::NodeNotFound),
        )?;
        anyhow::bail!("node '{id}' not found");
    }
    view.set_search(args.search.as_deref());

    let rows = visible_rows(tree, &view);
    render_mode(
        output,
        &rows,
        |rows, w| render_rows_text(rows, w),
        |rows, w| render_rows_pretty(tree, rows, w),
    )
}

/// One tab-separated line per row: depth, id, type, status, priority, title.
pub fn render_rows_text(rows: &[Row], w: &mut dyn Write) -> io::Result<()> {
    for row in rows {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            row.depth, row.id, row.type_label, row.status, row.priority, row.title
        )?;
    }
    Ok(())
}

/// Indented outline with expansion markers and icons.
pub fn render_rows_pretty(tree: &ProductTree, rows: &[Row], w: &mut dyn Write) -> io::Result<()> {
    if rows.is_empty() {
        if tree.is_empty() {
            writeln!(w, "(empty tree)")?;
        } else {
            writeln!(w, "(no matches)")?;
        }
        return Ok(());
    }
    for row in rows {
        let marker = match (row.has_children, row.expanded) {
            (false, _) => ' ',
            (true, true) => '▾',
            (true, false) => '▸',
        };
        let cursor = if row.selected { '>' } else { ' ' };
        let hit = if row.matched { " *" } else { "" };
        writeln!(
            w,
            "{cursor}{}{marker} {} {}  [{}] {} {}{hit}",
            "  ".repeat(row.depth),
            row.icon,
            row.title,
            row.id,
            row.status,
            row.priority,
        )?;
    }
    Ok(())
}
