//! Swappable AI backends behind one trait.
//!
//! The backend is chosen by `ai.backend` in the configuration:
//!
//! | kind      | ask                                  | health              |
//! |-----------|--------------------------------------|---------------------|
//! | `ollama`  | `POST /api/generate`                 | `GET /api/tags`     |
//! | `openai`  | `POST /v1/chat/completions`          | `GET /v1/models`    |
//! | `service` | `POST {chat_path}` `{message,context}` | `GET {health_path}` |
//! | `offline` | rule-based, computed locally         | always healthy      |

pub mod offline;
pub mod ollama;
pub mod openai;
pub mod service;

use ptree_core::ProductTree;
use ptree_core::config::{AiConfig, BackendKind, Config};
use serde::Serialize;

use crate::context::ContextSnapshot;
use crate::error::BridgeError;
use crate::http::join_url;
use crate::prompt::build_prompt;

pub use offline::OfflineBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use service::ChatServiceBackend;

/// One question for a backend.
#[derive(Debug, Clone, Copy)]
pub struct AskRequest<'a> {
    pub question: &'a str,
    pub context: Option<&'a ContextSnapshot>,
    /// The loaded tree, for backends that answer locally.
    pub tree: Option<&'a ProductTree>,
}

impl<'a> AskRequest<'a> {
    #[must_use]
    pub const fn new(question: &'a str) -> Self {
        Self {
            question,
            context: None,
            tree: None,
        }
    }

    #[must_use]
    pub const fn with_context(mut self, context: Option<&'a ContextSnapshot>) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub const fn with_tree(mut self, tree: &'a ProductTree) -> Self {
        self.tree = Some(tree);
        self
    }

    /// Full prompt text for completion-style backends.
    #[must_use]
    pub fn prompt(&self) -> String {
        build_prompt(self.question, self.context)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub backend: String,
    pub endpoint: String,
    pub healthy: bool,
    pub detail: String,
}

pub trait AiBackend {
    /// Short backend name, e.g. `ollama`.
    fn name(&self) -> &'static str;

    /// Base URL, or a description for local backends.
    fn endpoint(&self) -> &str;

    /// Send one question; exactly one request, no retry.
    fn ask(&self, request: &AskRequest<'_>) -> Result<String, BridgeError>;

    fn health(&self) -> Result<HealthStatus, BridgeError>;
}

/// Build the backend selected by `config.ai.backend`.
#[must_use]
pub fn from_config(config: &Config) -> Box<dyn AiBackend> {
    match config.ai.backend {
        BackendKind::Ollama => Box::new(OllamaBackend::new(&config.ai)),
        BackendKind::Openai => Box::new(OpenAiBackend::new(&config.ai)),
        BackendKind::Service => Box::new(ChatServiceBackend::new(&config.ai)),
        BackendKind::Offline => Box::new(OfflineBackend::new(config.analysis)),
    }
}

/// URL whose 2xx answer means the configured backend is up.
///
/// `None` for the offline backend, which has nothing to probe.
#[must_use]
pub fn health_url(ai: &AiConfig) -> Option<String> {
    let path = match ai.backend {
        BackendKind::Ollama => "/api/tags",
        BackendKind::Openai => "/v1/models",
        BackendKind::Service => ai.health_path.as_str(),
        BackendKind::Offline => return None,
    };
    Some(join_url(&ai.endpoint, path))
}

/// Pull a non-empty string out of a decoded response.
pub(crate) fn require_text(
    url: &str,
    value: Option<&serde_json::Value>,
    field: &str,
) -> Result<String, BridgeError> {
    match value.and_then(serde_json::Value::as_str) {
        Some(text) => Ok(text.trim().to_string()),
        None => Err(BridgeError::malformed(
            url,
            format!("response has no string field '{field}'"),
        )),
    }
}
