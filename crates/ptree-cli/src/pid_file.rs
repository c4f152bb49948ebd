//! PID file tracking for a backend process started with `pt backend start`.
//!
//! The file lives at `[launcher] pid_file` (default `.ptree/backend.pid`)
//! and holds simple `KEY=VALUE` lines:
//!
//! ```text
//! PID=12345
//! COMMAND=ollama serve
//! STARTED=2026-01-05T10:00:00Z
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidInfo {
    pub pid: u32,
    pub command: String,
    pub started: String,
}

#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `info`, creating the parent directory if needed.
    pub fn write(&self, info: &PidInfo) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = format!(
            "PID={}\nCOMMAND={}\nSTARTED={}\n",
            info.pid, info.command, info.started
        );
        let mut file = fs::File::create(&self.path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    }

    /// `Ok(None)` when no PID file exists.
    pub fn read(&self) -> io::Result<Option<PidInfo>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => parse_contents(&contents).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Remove the file; a missing file is not an error.
    pub fn delete(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn parse_contents(contents: &str) -> io::Result<PidInfo> {
    let mut pid = None;
    let mut command = String::new();
    let mut started = String::new();

    for line in contents.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "PID" => {
                pid = Some(value.parse().map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidData, "invalid PID value")
                })?);
            }
            "COMMAND" => command = value.to_string(),
            "STARTED" => started = value.to_string(),
            _ => {}
        }
    }

    let pid = pid.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing PID field"))?;
    Ok(PidInfo {
        pid,
        command,
        started,
    })
}

// ---------------------------------------------------------------------------
// Process signals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub enum Signal {
    Term,
    Kill,
    /// Existence probe; delivers nothing.
    Probe,
}

/// Send `signal` to `pid`. Returns false if the process doesn't exist.
#[cfg(unix)]
pub fn send_signal(pid: u32, signal: Signal) -> bool {
    let flag = match signal {
        Signal::Term => "-TERM",
        Signal::Kill => "-KILL",
        Signal::Probe => "-0",
    };
    Command::new("kill")
        .args([flag, &pid.to_string()])
        .output()
        .is_ok_and(|out| out.status.success())
}

#[cfg(windows)]
pub fn send_signal(pid: u32, signal: Signal) -> bool {
    let pid = pid.to_string();
    let out = match signal {
        Signal::Probe => Command::new("tasklist")
            .args(["/FI", &format!("PID eq {pid}"), "/NH"])
            .output()
            .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid)),
        Signal::Term => Command::new("taskkill")
            .args(["/PID", &pid])
            .output()
            .map(|out| out.status.success()),
        Signal::Kill => Command::new("taskkill")
            .args(["/F", "/PID", &pid])
            .output()
            .map(|out| out.status.success()),
    };
    out.unwrap_or(false)
}

pub fn is_running(pid: u32) -> bool {
    send_signal(pid, Signal::Probe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> PidInfo {
        PidInfo {
            pid: 4242,
            command: "ollama serve".into(),
            started: "2026-01-05T10:00:00Z".into(),
        }
    }

    #[test]
    fn write_then_read() {
        let dir = TempDir::new().expect("tempdir");
        let file = PidFile::new(dir.path().join("nested/backend.pid"));
        file.write(&sample()).expect("write");
        assert_eq!(file.read().expect("read"), Some(sample()));
    }

    #[test]
    fn missing_file_reads_none_and_deletes_cleanly() {
        let dir = TempDir::new().expect("tempdir");
        let file = PidFile::new(dir.path().join("backend.pid"));
        assert_eq!(file.read().expect("read"), None);
        file.delete().expect("delete missing");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let info = parse_contents("PID=7\nPORT=99\n").expect("parse");
        assert_eq!(info.pid, 7);
        assert!(info.command.is_empty());
    }

    #[test]
    fn missing_pid_is_invalid_data() {
        let err = parse_contents("COMMAND=x\n").expect_err("no pid");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[cfg(unix)]
    #[test]
    fn current_process_is_running() {
        assert!(is_running(std::process::id()));
    }
}
