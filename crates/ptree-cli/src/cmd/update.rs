//! `pt update`: change fields of an existing node.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use ptree_core::{ErrorCode, Node, NodePatch, NodeType};
use serde::Serialize;

use crate::cmd::tree_file;
use crate::output::{CliError, OutputMode, fail, render, render_error};

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Product tree XML or snapshot JSON.
    pub file: PathBuf,

    /// Node id to update.
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    /// Change the node type; job fields are dropped when leaving `job`.
    #[arg(long = "type", value_name = "TYPE")]
    pub node_type: Option<String>,

    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub team: Option<String>,

    #[arg(long)]
    pub owner: Option<String>,

    /// New description; an empty string clears it.
    #[arg(long)]
    pub description: Option<String>,

    /// New summary; an empty string clears it.
    #[arg(long)]
    pub summary: Option<String>,

    #[arg(long)]
    pub job_content: Option<String>,

    #[arg(long)]
    pub effort: Option<String>,

    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub end: Option<String>,

    /// Write the result here instead of back to FILE.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl UpdateArgs {
    fn patch(&self) -> NodePatch {
        NodePatch {
            title: self.title.clone(),
            node_type: self.node_type.as_deref().map(NodeType::from),
            status: self.status.clone(),
            priority: self.priority.clone(),
            team: self.team.clone(),
            owner: self.owner.clone(),
            description: self.description.clone(),
            summary: self.summary.clone(),
            job_content: self.job_content.clone(),
            effort_estimate: self.effort.clone(),
            start_date: self.start.clone(),
            end_date: self.end.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Updated<'a> {
    #[serde(flatten)]
    node: &'a Node,
    saved_to: String,
}

pub fn run_update(args: &UpdateArgs, output: OutputMode) -> anyhow::Result<()> {
    let patch = args.patch();
    if patch.is_empty() {
        render_error(
            output,
            &CliError::with_details(
                "nothing to update",
                "pass at least one field flag, e.g. --status in_progress",
                ErrorCode::InvalidField.code(),
            ),
        )?;
        anyhow::bail!("nothing to update");
    }

    let mut loaded = tree_file::load(&args.file, output)?;
    loaded
        .tree
        .update(&args.id, patch)
        .map_err(|err| fail(output, err))?;
    let saved = loaded.save(args.output.as_deref(), output)?;

    let node = loaded.tree.get(&args.id).map_err(|err| fail(output, err))?;
    let updated = Updated {
        node,
        saved_to: saved.display().to_string(),
    };
    render(output, &updated, |u, w| {
        writeln!(w, "✓ updated {} \"{}\"", u.node.id, u.node.title)
    })
}
