//! `pt status`: check whether the configured AI backend is reachable.

use std::io::Write;

use clap::Args;
use ptree_bridge::{HealthStatus, from_config};
use ptree_core::config::Config;

use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, render_error, render_mode};

#[derive(Args, Debug, Default)]
pub struct StatusArgs {}

pub fn run_status(_args: &StatusArgs, output: OutputMode, config: &Config) -> anyhow::Result<()> {
    let backend = from_config(config);
    let status = match backend.health() {
        Ok(status) => status,
        Err(err) => {
            let unhealthy = HealthStatus {
                backend: backend.name().to_string(),
                endpoint: backend.endpoint().to_string(),
                healthy: false,
                detail: err.to_string(),
            };
            render_status(output, &unhealthy)?;
            render_error(output, &CliError::from(&err))?;
            anyhow::bail!(err);
        }
    };
    render_status(output, &status)?;
    if !status.healthy {
        anyhow::bail!("{} backend is not ready: {}", status.backend, status.detail);
    }
    Ok(())
}

fn render_status(output: OutputMode, status: &HealthStatus) -> anyhow::Result<()> {
    render_mode(
        output,
        status,
        |s, w| {
            writeln!(
                w,
                "{} {} {} ({})",
                s.backend,
                if s.healthy { "ok" } else { "down" },
                s.endpoint,
                s.detail
            )
        },
        |s, w| {
            pretty_section(w, "AI backend")?;
            pretty_kv(w, "backend", &s.backend)?;
            pretty_kv(w, "endpoint", &s.endpoint)?;
            pretty_kv(w, "status", if s.healthy { "✓ healthy" } else { "✗ unavailable" })?;
            pretty_kv(w, "detail", &s.detail)
        },
    )
}
