//! `pt create`: add a node under a parent (or at top level).

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use ptree_core::{JobData, NewNode, Node, NodeType};
use serde::Serialize;

use crate::cmd::tree_file::{self, parent_arg};
use crate::output::{OutputMode, fail, render};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Product tree XML or snapshot JSON.
    pub file: PathBuf,

    /// Parent node id; "none" creates a top-level node.
    #[arg(long)]
    pub parent: String,

    /// Node type: product, goal, job, work_item, work or any custom tag.
    #[arg(long = "type", value_name = "TYPE")]
    pub node_type: String,

    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub team: Option<String>,

    #[arg(long)]
    pub owner: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub summary: Option<String>,

    /// Job content (jobs only).
    #[arg(long)]
    pub job_content: Option<String>,

    /// Effort estimate (jobs only).
    #[arg(long)]
    pub effort: Option<String>,

    /// Start date (jobs only).
    #[arg(long)]
    pub start: Option<String>,

    /// End date (jobs only).
    #[arg(long)]
    pub end: Option<String>,

    /// Write the result here instead of back to FILE.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl CreateArgs {
    fn fields(&self) -> NewNode {
        let node_type = NodeType::from(self.node_type.as_str());
        let job_fields = [&self.job_content, &self.effort, &self.start, &self.end];
        let job = (node_type.is_job() && job_fields.iter().any(|f| f.is_some())).then(|| JobData {
            job_content: self.job_content.clone().unwrap_or_default(),
            effort_estimate: self.effort.clone().unwrap_or_default(),
            start_date: self.start.clone().unwrap_or_default(),
            end_date: self.end.clone().unwrap_or_default(),
        });
        NewNode {
            node_type,
            title: self.title.clone(),
            status: self.status.clone(),
            priority: self.priority.clone(),
            team: self.team.clone(),
            owner: self.owner.clone(),
            description: self.description.clone(),
            summary: self.summary.clone(),
            job,
        }
    }
}

#[derive(Debug, Serialize)]
struct Created<'a> {
    #[serde(flatten)]
    node: &'a Node,
    parent_id: Option<&'a str>,
    saved_to: String,
}

pub fn run_create(args: &CreateArgs, output: OutputMode) -> anyhow::Result<()> {
    let mut loaded = tree_file::load(&args.file, output)?;
    let parent = parent_arg(&args.parent);
    let created = match parent {
        Some(parent) => loaded.tree.create(parent, args.fields()),
        None => loaded.tree.create_root(args.fields()),
    };
    let id = created.map_err(|err| fail(output, err))?.id.clone();
    let saved = loaded.save(args.output.as_deref(), output)?;

    let node = loaded.tree.get(&id).map_err(|err| fail(output, err))?;
    let created = Created {
        node,
        parent_id: parent,
        saved_to: saved.display().to_string(),
    };
    render(output, &created, |c, w| {
        writeln!(
            w,
            "✓ created {} {} \"{}\"",
            c.node.node_type, c.node.id, c.node.title
        )
    })
}
