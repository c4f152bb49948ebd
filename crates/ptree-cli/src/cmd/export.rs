//! `pt export`: write a tree as XML, Jira CSV or snapshot JSON.
//!
//! Without `--output` the document goes to stdout verbatim, whatever the
//! output mode, so it can be piped.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use ptree_core::config::Config;
use ptree_core::export::jira::{JiraOptions, to_jira_csv};
use ptree_core::export::xml::to_xml;
use ptree_core::file::write_atomic;
use ptree_core::{ProductTree, TreeError};
use serde::Serialize;

use crate::cmd::tree_file;
use crate::output::{OutputMode, fail, render};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Product tree XML.
    Xml,
    /// Jira bulk-import CSV.
    Jira,
    /// Snapshot JSON (nodes and edges).
    Json,
}

impl ExportFormat {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Jira => "jira",
            Self::Json => "json",
        }
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Product tree XML or snapshot JSON.
    pub file: PathBuf,

    /// Target format.
    #[arg(long, value_enum, default_value_t = ExportFormat::Xml)]
    pub to: ExportFormat,

    /// Write to this file instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Jira reporter column (default from `[export] reporter`).
    #[arg(long)]
    pub reporter: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExportResult {
    path: String,
    format: &'static str,
    nodes: usize,
    bytes: usize,
}

/// Render `tree` in `format`.
pub fn render_export(
    tree: &ProductTree,
    format: ExportFormat,
    reporter: &str,
) -> Result<String, TreeError> {
    match format {
        ExportFormat::Xml => Ok(to_xml(tree)),
        ExportFormat::Jira => Ok(to_jira_csv(
            tree,
            &JiraOptions {
                reporter: reporter.to_string(),
            },
        )),
        ExportFormat::Json => tree.to_snapshot().to_json(),
    }
}

pub fn run_export(args: &ExportArgs, output: OutputMode, config: &Config) -> anyhow::Result<()> {
    let loaded = tree_file::load(&args.file, output)?;
    let reporter = args
        .reporter
        .as_deref()
        .unwrap_or(config.export.reporter.as_str());
    let text =
        render_export(&loaded.tree, args.to, reporter).map_err(|err| fail(output, err))?;

    let Some(path) = &args.output else {
        let mut out = io::stdout().lock();
        writeln!(out, "{text}")?;
        return Ok(());
    };

    write_atomic(path, &text).map_err(|err| fail(output, err))?;
    let result = ExportResult {
        path: path.display().to_string(),
        format: args.to.as_str(),
        nodes: loaded.tree.len(),
        bytes: text.len(),
    };
    render(output, &result, |r, w| {
        writeln!(w, "✓ exported {} nodes as {} to {}", r.nodes, r.format, r.path)
    })
}
