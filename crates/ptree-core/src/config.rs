//! Layered TOML configuration.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults.
//! 2. User config at `<config dir>/ptree/config.toml`.
//! 3. Project config at `./ptree.toml` (or `./.ptree/config.toml`), or the
//!    file passed with `--config`.
//! 4. `PTREE_AI_*` environment variables.
//!
//! Tables are merged key by key, so a project file can override a single
//! setting without restating the rest.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ErrorCode;

pub const PROJECT_CONFIG_FILES: [&str; 2] = ["ptree.toml", ".ptree/config.toml"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value '{value}' for {key}")]
    InvalidEnv { key: String, value: String },
}

impl ConfigError {
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::FileUnreadable,
            Self::Parse { .. } | Self::InvalidEnv { .. } => ErrorCode::ConfigParseError,
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub launcher: LauncherConfig,
}

/// Which AI backend answers questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local Ollama runtime (`/api/generate`).
    #[default]
    Ollama,
    /// Any OpenAI-compatible server (`/v1/chat/completions`).
    Openai,
    /// A chat service speaking `{message, context} -> {response}`.
    Service,
    /// Rule-based answers computed locally.
    Offline,
}

impl BackendKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Openai => "openai",
            Self::Service => "service",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::Openai),
            "service" => Ok(Self::Service),
            "offline" | "internal" => Ok(Self::Offline),
            other => Err(format!(
                "unknown backend '{other}' (expected ollama, openai, service or offline)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default)]
    pub context: ContextConfig,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_ai_timeout(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            chat_path: default_chat_path(),
            health_path: default_health_path(),
            context: ContextConfig::default(),
        }
    }
}

/// Caps on how much of the tree is embedded in a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_max_children")]
    pub max_children: usize,
    #[serde(default = "default_max_siblings")]
    pub max_siblings: usize,
    #[serde(default = "default_max_overview_nodes")]
    pub max_overview_nodes: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_children: default_max_children(),
            max_siblings: default_max_siblings(),
            max_overview_nodes: default_max_overview_nodes(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Flag nodes with more incoming edges than this.
    #[serde(default = "default_in_threshold")]
    pub in_threshold: usize,
    /// Flag nodes with more outgoing edges than this.
    #[serde(default = "default_out_threshold")]
    pub out_threshold: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            in_threshold: default_in_threshold(),
            out_threshold: default_out_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_reporter")]
    pub reporter: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            reporter: default_reporter(),
        }
    }
}

/// External analysis service that receives bulk imports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub import_url: Option<String>,
    #[serde(default)]
    pub push_on_import: bool,
    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            import_url: None,
            push_on_import: false,
            timeout_secs: default_service_timeout(),
        }
    }
}

/// How `pt backend start` spawns a local AI service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Polled until it answers 2xx; defaults to the AI backend's health URL.
    #[serde(default)]
    pub health_url: Option<String>,
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            cwd: None,
            health_url: None,
            pid_file: default_pid_file(),
            startup_timeout_secs: default_startup_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:3b".to_string()
}

const fn default_ai_timeout() -> u64 {
    15
}

const fn default_temperature() -> f64 {
    0.7
}

const fn default_top_p() -> f64 {
    0.9
}

const fn default_max_tokens() -> u32 {
    1000
}

fn default_chat_path() -> String {
    "/chat".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

const fn default_max_children() -> usize {
    5
}

const fn default_max_siblings() -> usize {
    3
}

const fn default_max_overview_nodes() -> usize {
    5
}

const fn default_in_threshold() -> usize {
    2
}

const fn default_out_threshold() -> usize {
    5
}

fn default_reporter() -> String {
    crate::export::jira::DEFAULT_REPORTER.to_string()
}

const fn default_service_timeout() -> u64 {
    5
}

fn default_pid_file() -> PathBuf {
    PathBuf::from(".ptree/backend.pid")
}

const fn default_startup_timeout() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Path of the user-level config file, if a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ptree/config.toml"))
}

/// First existing project config file under `project_root`.
pub fn project_config_path(project_root: &Path) -> Option<PathBuf> {
    PROJECT_CONFIG_FILES
        .iter()
        .map(|name| project_root.join(name))
        .find(|p| p.is_file())
}

fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<toml::Table>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Recursively overlay `top` onto `base`.
fn merge_tables(base: &mut toml::Table, top: toml::Table) {
    for (key, value) in top {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

/// Build a config from the given files (lowest precedence first) and an
/// environment lookup.
///
/// Missing files are skipped.
///
/// # Errors
///
/// Returns [`ConfigError`] if a present file cannot be read or parsed, or an
/// environment override is invalid.
pub fn load_layers(
    files: &[PathBuf],
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let mut merged = toml::Table::new();
    let mut last_path = PathBuf::new();
    for path in files.iter().filter(|p| p.is_file()) {
        merge_tables(&mut merged, read_table(path)?);
        last_path.clone_from(path);
    }
    let mut config: Config = toml::Value::Table(merged)
        .try_into()
        .map_err(|source| ConfigError::Parse {
            path: last_path,
            source,
        })?;
    apply_env(&mut config, env)?;
    tracing::debug!(backend = %config.ai.backend, endpoint = %config.ai.endpoint, "resolved config");
    Ok(config)
}

/// Resolve the effective config for `project_root`.
///
/// `explicit` replaces project config discovery (the `--config` flag).
///
/// # Errors
///
/// See [`load_layers`].
pub fn load_config(project_root: &Path, explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut files = Vec::new();
    if let Some(user) = user_config_path() {
        files.push(user);
    }
    match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                });
            }
            files.push(path.to_path_buf());
        }
        None => files.extend(project_config_path(project_root)),
    }
    load_layers(&files, |key| std::env::var(key).ok())
}

fn apply_env(config: &mut Config, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
    if let Some(raw) = env("PTREE_AI_BACKEND") {
        config.ai.backend = raw.parse().map_err(|_| ConfigError::InvalidEnv {
            key: "PTREE_AI_BACKEND".into(),
            value: raw.clone(),
        })?;
    }
    if let Some(raw) = env("PTREE_AI_ENDPOINT") {
        config.ai.endpoint = raw;
    }
    if let Some(raw) = env("PTREE_AI_MODEL") {
        config.ai.model = raw;
    }
    if let Some(raw) = env("PTREE_AI_TIMEOUT_SECS") {
        config.ai.timeout_secs = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            key: "PTREE_AI_TIMEOUT_SECS".into(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}
