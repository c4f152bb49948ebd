//! `pt import`: parse a product tree file and summarise it.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use ptree_bridge::{BridgeError, push_snapshot};
use ptree_core::config::Config;
use ptree_core::ErrorCode;
use serde::Serialize;
use tracing::warn;

use crate::cmd::tree_file;
use crate::output::{
    CliError, OutputMode, pretty_kv, pretty_section, render_error, render_mode,
};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Product tree XML (or snapshot JSON) to import.
    pub file: PathBuf,

    /// Also write the tree to this path (`.json` for a snapshot, else XML).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Push the snapshot to `[service] import_url`.
    #[arg(long)]
    pub push: bool,
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub file: String,
    pub format: &'static str,
    pub nodes: usize,
    pub roots: Vec<String>,
    pub by_type: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pushed: Option<String>,
    /// Set when the push was attempted and failed; the import still succeeds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_error: Option<PushFailure>,
}

#[derive(Debug, Serialize)]
pub struct PushFailure {
    pub message: String,
    pub error_code: &'static str,
}

impl From<&BridgeError> for PushFailure {
    fn from(err: &BridgeError) -> Self {
        Self {
            message: err.to_string(),
            error_code: err.error_code().code(),
        }
    }
}

pub fn run_import(args: &ImportArgs, output: OutputMode, config: &Config) -> anyhow::Result<()> {
    let loaded = tree_file::load(&args.file, output)?;
    let tree = &loaded.tree;

    let mut by_type = BTreeMap::new();
    for node in tree.iter() {
        *by_type.entry(node.node_type.to_string()).or_insert(0) += 1;
    }

    let written = match &args.out {
        Some(out) => Some(loaded.save(Some(out), output)?.display().to_string()),
        None => None,
    };

    let url = config.service.import_url.as_deref();
    if config.service.push_on_import && !args.push && url.is_none() {
        warn!("push_on_import is set without [service] import_url; skipping push");
    }
    let pushed = if args.push || (config.service.push_on_import && url.is_some()) {
        let Some(url) = url else {
            render_error(
                output,
                &CliError::with_details(
                    "no import service configured",
                    "set [service] import_url in ptree.toml",
                    ErrorCode::BackendDisabled.code(),
                ),
            )?;
            anyhow::bail!("no import service configured");
        };
        let timeout = Duration::from_secs(config.service.timeout_secs);
        match push_snapshot(url, &tree.to_snapshot(), timeout) {
            Ok(receipt) if receipt.message.is_empty() => Some(Ok(format!("pushed to {url}"))),
            Ok(receipt) => Some(Ok(receipt.message)),
            Err(err) => {
                warn!(url, error = %err, "bulk import push failed");
                Some(Err(err))
            }
        }
    } else {
        None
    };
    let (pushed, push_error) = match pushed {
        Some(Ok(message)) => (Some(message), None),
        Some(Err(err)) => (None, Some(PushFailure::from(&err))),
        None => (None, None),
    };

    if tree.is_empty() {
        warn!(path = %args.file.display(), "imported tree is empty");
    }

    let summary = ImportSummary {
        file: args.file.display().to_string(),
        format: loaded.format.as_str(),
        nodes: tree.len(),
        roots: tree.root_ids().to_vec(),
        by_type,
        written,
        pushed,
        push_error,
    };

    render_mode(
        output,
        &summary,
        |s, w| {
            writeln!(w, "imported {} nodes from {} ({})", s.nodes, s.file, s.format)?;
            for (kind, count) in &s.by_type {
                writeln!(w, "{kind}\t{count}")?;
            }
            if let Some(path) = &s.written {
                writeln!(w, "wrote {path}")?;
            }
            if let Some(msg) = &s.pushed {
                writeln!(w, "{msg}")?;
            }
            if let Some(failure) = &s.push_error {
                writeln!(w, "push failed [{}]: {}", failure.error_code, failure.message)?;
            }
            Ok(())
        },
        |s, w| {
            pretty_section(w, &format!("Imported {}", s.file))?;
            pretty_kv(w, "format", s.format)?;
            pretty_kv(w, "nodes", s.nodes.to_string())?;
            pretty_kv(w, "roots", s.roots.join(", "))?;
            for (kind, count) in &s.by_type {
                pretty_kv(w, kind, count.to_string())?;
            }
            if let Some(path) = &s.written {
                writeln!(w, "✓ wrote {path}")?;
            }
            if let Some(msg) = &s.pushed {
                writeln!(w, "✓ {msg}")?;
            }
            if let Some(failure) = &s.push_error {
                writeln!(w, "✗ push failed [{}]: {}", failure.error_code, failure.message)?;
            }
            Ok(())
        },
    )
}

