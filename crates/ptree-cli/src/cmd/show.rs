//! `pt show`: display full details of a single node.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use ptree_core::view::{NodeDetails, details};
use ptree_core::{ErrorCode, ProductTree};

use crate::cmd::tree_file;
use crate::output::{
    CliError, OutputMode, pretty_kv, pretty_rule, pretty_section, render_error, render_mode,
};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Product tree XML or snapshot JSON.
    pub file: PathBuf,

    /// Node id to display.
    pub id: String,
}

pub fn run_show(args: &ShowArgs, output: OutputMode) -> anyhow::Result<()> {
    let loaded = tree_file::load(&args.file, output)?;
    let info = lookup(&loaded.tree, &args.id, output)?;
    render_mode(
        output,
        &info,
        |d, w| render_show_text(d, w),
        |d, w| render_show_human(d, w),
    )
}

/// Details for `id`, rendering a not-found error when missing.
pub fn lookup(tree: &ProductTree, id: &str, output: OutputMode) -> anyhow::Result<NodeDetails> {
    if let Some(found) = details(tree, id) {
        return Ok(found);
    }
    render_error(
        output,
        &CliError::coded(format!("node '{id}' not found"), ErrorCode::NodeNotFound),
    )?;
    anyhow::bail!("node '{id}' not found")
}

pub fn render_show_human(d: &NodeDetails, w: &mut dyn Write) -> std::io::Result<()> {
    let node = &d.node;
    pretty_section(w, &format!("{} {} {}", node.node_type.icon(), d.type_label, node.id))?;
    writeln!(w, "{}", node.title)?;
    pretty_rule(w)?;
    pretty_kv(w, "status", &node.status)?;
    pretty_kv(w, "priority", &node.priority)?;
    if !node.team.is_empty() {
        pretty_kv(w, "team", &node.team)?;
    }
    if !node.owner.is_empty() {
        pretty_kv(w, "owner", &node.owner)?;
    }
    match (&d.parent_id, &d.parent_title) {
        (Some(id), Some(title)) => pretty_kv(w, "parent", format!("{title} [{id}]"))?,
        _ => pretty_kv(w, "parent", "(top level)")?,
    }
    pretty_kv(w, "depth", d.depth.to_string())?;
    pretty_kv(w, "children", d.child_count.to_string())?;
    pretty_kv(w, "descendants", d.descendant_count.to_string())?;
    pretty_kv(w, "created", &node.created_at)?;
    pretty_kv(w, "updated", &node.updated_at)?;
    if let Some(job) = &node.job {
        if !job.effort_estimate.is_empty() {
            pretty_kv(w, "effort", &job.effort_estimate)?;
        }
        if !job.start_date.is_empty() {
            pretty_kv(w, "start", &job.start_date)?;
        }
        if !job.end_date.is_empty() {
            pretty_kv(w, "end", &job.end_date)?;
        }
    }
    for (key, value) in &node.extra_attributes {
        pretty_kv(w, key, value)?;
    }

    let sections = [
        ("Summary", node.summary.as_deref()),
        ("Description", node.description.as_deref()),
        (
            "Job content",
            node.job
                .as_ref()
                .map(|j| j.job_content.as_str())
                .filter(|c| !c.is_empty()),
        ),
    ];
    for (heading, body) in sections {
        if let Some(body) = body {
            writeln!(w)?;
            pretty_section(w, heading)?;
            for line in body.lines() {
                writeln!(w, "{line}")?;
            }
        }
    }
    Ok(())
}

fn render_show_text(d: &NodeDetails, w: &mut dyn Write) -> std::io::Result<()> {
    let node = &d.node;
    writeln!(w, "id:          {}", node.id)?;
    writeln!(w, "type:        {}", node.node_type)?;
    writeln!(w, "title:       {}", node.title)?;
    writeln!(w, "status:      {}", node.status)?;
    writeln!(w, "priority:    {}", node.priority)?;
    if !node.team.is_empty() {
        writeln!(w, "team:        {}", node.team)?;
    }
    if !node.owner.is_empty() {
        writeln!(w, "owner:       {}", node.owner)?;
    }
    if let Some(parent) = &d.parent_id {
        writeln!(w, "parent:      {parent}")?;
    }
    writeln!(w, "children:    {}", d.child_count)?;
    if let Some(summary) = &node.summary {
        writeln!(w, "summary:     {summary}")?;
    }
    if let Some(desc) = &node.description {
        writeln!(w, "description: {desc}")?;
    }
    if let Some(job) = &node.job {
        if !job.effort_estimate.is_empty() {
            writeln!(w, "effort:      {}", job.effort_estimate)?;
        }
        if !job.job_content.is_empty() {
            writeln!(w, "job_content: {}", job.job_content)?;
        }
    }
    Ok(())
}
