//! Chat service speaking `{message, context} -> {response}`.
//!
//! The service composes its own prompt, so the question and the rendered
//! context travel separately.

use std::time::Duration;

use ptree_core::config::AiConfig;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use super::{AiBackend, AskRequest, HealthStatus, require_text};
use crate::error::BridgeError;
use crate::http::{HttpClient, join_url};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
}

#[derive(Debug)]
pub struct ChatServiceBackend {
    client: HttpClient,
    endpoint: String,
    chat_path: String,
    health_path: String,
}

impl ChatServiceBackend {
    #[must_use]
    pub fn new(config: &AiConfig) -> Self {
        Self {
            client: HttpClient::new(Duration::from_secs(config.timeout_secs)),
            endpoint: config.endpoint.clone(),
            chat_path: config.chat_path.clone(),
            health_path: config.health_path.clone(),
        }
    }
}

impl AiBackend for ChatServiceBackend {
    fn name(&self) -> &'static str {
        "service"
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    fn ask(&self, request: &AskRequest<'_>) -> Result<String, BridgeError> {
        let url = join_url(&self.endpoint, &self.chat_path);
        let body = ChatRequest {
            message: request.question,
            context: request.context.map(|ctx| ctx.text.as_str()),
        };
        let answer: Value = self.client.post_json(&url, &body)?;
        let text = require_text(&url, answer.get("response"), "response")?;
        info!(chars = text.len(), "service answered");
        Ok(text)
    }

    fn health(&self) -> Result<HealthStatus, BridgeError> {
        let url = join_url(&self.endpoint, &self.health_path);
        let answer: Value = self.client.get_json(&url)?;
        let status = answer
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        Ok(HealthStatus {
            backend: self.name().to_string(),
            endpoint: self.endpoint.clone(),
            healthy: status != "error",
            detail: status,
        })
    }
}
