//! `pt ask`: put a question about the tree to the configured AI backend.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use ptree_bridge::{AskRequest, ContextSnapshot, from_config};
use ptree_core::config::Config;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cmd::tree_file;
use crate::output::{OutputMode, fail, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Product tree XML or snapshot JSON.
    pub file: PathBuf,

    /// The question, e.g. "what should we prioritize?".
    pub question: String,

    /// Focus the context on this node instead of the whole tree.
    #[arg(long)]
    pub node: Option<String>,

    /// Send the question without any tree context.
    #[arg(long, conflicts_with = "node")]
    pub no_context: bool,
}

#[derive(Debug, Serialize)]
pub struct AskAnswer {
    pub backend: &'static str,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
    pub answer: String,
}

#[instrument(skip_all, fields(backend = %config.ai.backend))]
pub fn run_ask(args: &AskArgs, output: OutputMode, config: &Config) -> anyhow::Result<()> {
    let loaded = tree_file::load(&args.file, output)?;
    let tree = &loaded.tree;

    let context = if args.no_context {
        None
    } else if let Some(id) = &args.node {
        Some(ContextSnapshot::for_node(tree, id, &config.ai.context).map_err(|err| fail(output, err))?)
    } else {
        Some(ContextSnapshot::overview(tree, &config.ai.context))
    };
    debug!(
        context_chars = context.as_ref().map_or(0, |c| c.text.len()),
        "built question context"
    );

    let backend = from_config(config);
    let request = AskRequest::new(&args.question)
        .with_context(context.as_ref())
        .with_tree(tree);
    let answer = backend.ask(&request).map_err(|err| fail(output, err))?;

    let result = AskAnswer {
        backend: backend.name(),
        question: args.question.clone(),
        focus: context.and_then(|c| c.focus),
        answer,
    };
    render_mode(
        output,
        &result,
        |a, w| writeln!(w, "{}", a.answer.trim_end()),
        |a, w| {
            pretty_section(w, &format!("Answer ({})", a.backend))?;
            writeln!(w, "{}", a.answer.trim_end())
        },
    )
}
