//! `pt analyze`: structural diagnostics for a tree file.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use ptree_analyze::{AnalysisReport, analyze};
use ptree_core::config::{AnalysisConfig, Config};
use ptree_core::read_snapshot;

use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Product tree XML or snapshot JSON.
    pub file: PathBuf,

    /// Flag nodes with more parents than this.
    #[arg(long)]
    pub in_threshold: Option<usize>,

    /// Flag nodes with more children than this.
    #[arg(long)]
    pub out_threshold: Option<usize>,
}

pub fn run_analyze(args: &AnalyzeArgs, output: OutputMode, config: &Config) -> anyhow::Result<()> {
    // Raw snapshot: cycles, shared children and dangling edges are findings here.
    let (snapshot, _) = read_snapshot(&args.file).map_err(|err| fail(output, err))?;
    let thresholds = AnalysisConfig {
        in_threshold: args.in_threshold.unwrap_or(config.analysis.in_threshold),
        out_threshold: args.out_threshold.unwrap_or(config.analysis.out_threshold),
    };
    let report = analyze(&snapshot, &thresholds);
    render_mode(
        output,
        &report,
        |r, w| render_report_text(r, w),
        |r, w| render_report_pretty(r, w),
    )
}

/// One finding per line, or `ok` when there are none.
pub fn render_report_text(report: &AnalysisReport, w: &mut dyn Write) -> std::io::Result<()> {
    let s = &report.stats;
    writeln!(
        w,
        "nodes {} edges {} roots {} leaves {} depth {}",
        s.node_count, s.edge_count, s.root_count, s.leaf_count, s.max_depth
    )?;
    let findings = report.findings();
    if findings.is_empty() {
        writeln!(w, "ok")?;
    }
    for finding in findings {
        writeln!(w, "{finding}")?;
    }
    Ok(())
}

pub fn render_report_pretty(report: &AnalysisReport, w: &mut dyn Write) -> std::io::Result<()> {
    let s = &report.stats;
    pretty_section(w, "Structure")?;
    pretty_kv(w, "nodes", s.node_count.to_string())?;
    pretty_kv(w, "edges", s.edge_count.to_string())?;
    pretty_kv(w, "roots", s.root_count.to_string())?;
    pretty_kv(w, "leaves", s.leaf_count.to_string())?;
    pretty_kv(w, "max depth", s.max_depth.to_string())?;
    pretty_kv(w, "fan-out", format!("{:.2}", s.average_fanout))?;
    pretty_kv(w, "hash", &report.content_hash)?;

    writeln!(w)?;
    pretty_section(w, "Distribution")?;
    for (label, counts) in [
        ("type", &report.by_type),
        ("status", &report.by_status),
        ("priority", &report.by_priority),
    ] {
        let line: Vec<String> = counts.iter().map(|(k, v)| format!("{k} {v}")).collect();
        pretty_kv(w, label, line.join(", "))?;
    }

    writeln!(w)?;
    let findings = report.findings();
    pretty_section(w, &format!("Findings ({})", findings.len()))?;
    if findings.is_empty() {
        writeln!(w, "✓ no duplicates, cycles, orphans or overloaded nodes")?;
    }
    for finding in findings {
        writeln!(w, "⚠ {finding}")?;
    }
    Ok(())
}
