//! `pt backend`: start, stop and inspect a locally launched AI service.
//!
//! `start` spawns `[launcher] command` detached, records it in the PID file
//! and polls the health URL until it answers or `startup_timeout_secs`
//! elapses. Output from the child goes to `backend.log` beside the PID file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args, Subcommand};
use ptree_bridge::{health_url, probe};
use ptree_core::ErrorCode;
use ptree_core::config::{Config, LauncherConfig};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, render, render_error};
use crate::pid_file::{PidFile, PidInfo, Signal, is_running, send_signal};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const STOP_GRACE: Duration = Duration::from_secs(5);

#[derive(Args, Debug)]
pub struct BackendArgs {
    #[command(subcommand)]
    pub command: BackendCommand,
}

#[derive(Subcommand, Debug)]
pub enum BackendCommand {
    /// Launch the configured backend and wait until it is healthy.
    Start,
    /// Stop a backend started with `pt backend start`.
    Stop {
        /// Send SIGKILL instead of SIGTERM.
        #[arg(long)]
        force: bool,
    },
    /// Report whether the launched process is alive and healthy.
    Status,
}

#[derive(Debug, Serialize)]
struct LauncherReport {
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    health_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    healthy: Option<bool>,
    pid_file: String,
}

pub fn run_backend(
    args: &BackendArgs,
    output: OutputMode,
    config: &Config,
    project_root: &Path,
) -> anyhow::Result<()> {
    let launcher = &config.launcher;
    let pid_file = PidFile::new(resolve(project_root, &launcher.pid_file));
    let health = launcher
        .health_url
        .clone()
        .or_else(|| health_url(&config.ai));

    let report = match args.command {
        BackendCommand::Start => start(launcher, &pid_file, health, project_root, output)?,
        BackendCommand::Stop { force } => stop(&pid_file, force, output)?,
        BackendCommand::Status => status(&pid_file, health)?,
    };
    render(output, &report, |r, w| {
        pretty_section(w, "Backend launcher")?;
        pretty_kv(w, "state", r.state)?;
        if let Some(pid) = r.pid {
            pretty_kv(w, "pid", pid.to_string())?;
        }
        if let Some(command) = &r.command {
            pretty_kv(w, "command", command)?;
        }
        if let Some(url) = &r.health_url {
            let mark = match r.healthy {
                Some(true) => " ✓",
                Some(false) => " ✗",
                None => "",
            };
            pretty_kv(w, "health", format!("{url}{mark}"))?;
        }
        pretty_kv(w, "pid file", &r.pid_file)
    })
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn launcher_error(output: OutputMode, message: String) -> anyhow::Error {
    if let Err(err) = render_error(output, &CliError::coded(&message, ErrorCode::LauncherFailed)) {
        return err;
    }
    anyhow::anyhow!(message)
}

fn start(
    launcher: &LauncherConfig,
    pid_file: &PidFile,
    health: Option<String>,
    project_root: &Path,
    output: OutputMode,
) -> anyhow::Result<LauncherReport> {
    let Some(program) = launcher.command.as_deref() else {
        return Err(launcher_error(
            output,
            "no backend command configured; set [launcher] command in ptree.toml".into(),
        ));
    };

    if let Some(existing) = pid_file.read()? {
        if is_running(existing.pid) {
            return Err(launcher_error(
                output,
                format!("backend already running (pid {})", existing.pid),
            ));
        }
        debug!(pid = existing.pid, "removing stale PID file");
        pid_file.delete()?;
    }

    let log_path = pid_file.path().with_file_name("backend.log");
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log = File::create(&log_path)?;
    let cwd = launcher
        .cwd
        .as_deref()
        .map_or_else(|| project_root.to_path_buf(), |cwd| resolve(project_root, cwd));

    let mut child = Command::new(program)
        .args(&launcher.args)
        .current_dir(&cwd)
        .stdin(Stdio::null())
        .stdout(log.try_clone()?)
        .stderr(log)
        .spawn()
        .map_err(|err| launcher_error(output, format!("failed to spawn '{program}': {err}")))?;

    let command_line = std::iter::once(program)
        .chain(launcher.args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    pid_file.write(&PidInfo {
        pid: child.id(),
        command: command_line.clone(),
        started: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    })?;
    info!(pid = child.id(), command = %command_line, "backend spawned");

    let healthy = match &health {
        Some(url) => {
            let deadline = Instant::now() + Duration::from_secs(launcher.startup_timeout_secs);
            loop {
                if let Some(status) = child.try_wait()? {
                    pid_file.delete()?;
                    return Err(launcher_error(
                        output,
                        format!(
                            "backend exited during startup ({status}); see {}",
                            log_path.display()
                        ),
                    ));
                }
                if probe(url, PROBE_TIMEOUT).is_ok() {
                    break Some(true);
                }
                if Instant::now() >= deadline {
                    warn!(url = %url, "backend did not become healthy, stopping it");
                    let _ = child.kill();
                    let _ = child.wait();
                    pid_file.delete()?;
                    return Err(launcher_error(
                        output,
                        format!(
                            "backend not healthy after {}s at {url}; see {}",
                            launcher.startup_timeout_secs,
                            log_path.display()
                        ),
                    ));
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
        None => None,
    };

    Ok(LauncherReport {
        state: "running",
        pid: Some(child.id()),
        command: Some(command_line),
        health_url: health,
        healthy,
        pid_file: pid_file.path().display().to_string(),
    })
}

fn stop(pid_file: &PidFile, force: bool, output: OutputMode) -> anyhow::Result<LauncherReport> {
    let not_running = |state: &'static str| LauncherReport {
        state,
        pid: None,
        command: None,
        health_url: None,
        healthy: None,
        pid_file: pid_file.path().display().to_string(),
    };

    let Some(info) = pid_file.read()? else {
        return Ok(not_running("not_running"));
    };
    if !is_running(info.pid) {
        pid_file.delete()?;
        return Ok(not_running("stale_pid_removed"));
    }

    let signal = if force { Signal::Kill } else { Signal::Term };
    if !send_signal(info.pid, signal) {
        return Err(launcher_error(
            output,
            format!("failed to signal backend (pid {})", info.pid),
        ));
    }
    let deadline = Instant::now() + STOP_GRACE;
    while is_running(info.pid) && Instant::now() < deadline {
        thread::sleep(POLL_INTERVAL);
    }
    if is_running(info.pid) {
        return Err(launcher_error(
            output,
            format!(
                "backend (pid {}) still running after {}s; retry with --force",
                info.pid,
                STOP_GRACE.as_secs()
            ),
        ));
    }
    pid_file.delete()?;
    info!(pid = info.pid, "backend stopped");

    Ok(LauncherReport {
        state: "stopped",
        pid: Some(info.pid),
        command: Some(info.command),
        health_url: None,
        healthy: None,
        pid_file: pid_file.path().display().to_string(),
    })
}

fn status(pid_file: &PidFile, health: Option<String>) -> anyhow::Result<LauncherReport> {
    let info = pid_file.read()?;
    let alive = info.as_ref().is_some_and(|i| is_running(i.pid));
    let healthy = health.as_deref().map(|url| probe(url, PROBE_TIMEOUT).is_ok());
    let state = match (&info, alive) {
        (Some(_), true) => "running",
        (Some(_), false) => "stale",
        (None, _) => "not_running",
    };
    Ok(LauncherReport {
        state,
        pid: info.as_ref().map(|i| i.pid),
        command: info.map(|i| i.command),
        health_url: health,
        healthy,
        pid_file: pid_file.path().display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn relative_paths_resolve_against_project_root() {
        let root = Path::new("/work/project");
        assert_eq!(
            resolve(root, Path::new(".ptree/backend.pid")),
            PathBuf::from("/work/project/.ptree/backend.pid")
        );
        assert_eq!(resolve(root, Path::new("/tmp/x.pid")), PathBuf::from("/tmp/x.pid"));
    }

    #[test]
    fn stop_without_pid_file_reports_not_running() {
        let dir = TempDir::new().expect("tempdir");
        let pid_file = PidFile::new(dir.path().join("backend.pid"));
        let report = stop(&pid_file, false, OutputMode::Text).expect("stop");
        assert_eq!(report.state, "not_running");
    }

    #[test]
    fn status_flags_stale_pid_file() {
        let dir = TempDir::new().expect("tempdir");
        let pid_file = PidFile::new(dir.path().join("backend.pid"));
        pid_file
            .write(&PidInfo {
                pid: 99_999_999,
                command: "gone".into(),
                started: String::new(),
            })
            .expect("write");
        let report = status(&pid_file, None).expect("status");
        assert_eq!(report.state, "stale");
        assert_eq!(report.pid, Some(99_999_999));
    }
}
