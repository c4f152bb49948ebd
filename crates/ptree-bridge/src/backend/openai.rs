//! OpenAI-compatible chat completion servers (LM Studio, vLLM, llama.cpp).

use std::time::Duration;

use ptree_core::config::AiConfig;
use serde_json::{Value, json};
use tracing::{info, instrument};

use super::{AiBackend, AskRequest, HealthStatus, require_text};
use crate::error::BridgeError;
use crate::http::{HttpClient, join_url};

const SYSTEM_MESSAGE: &str =
    "You are an expert product management assistant specializing in product tree analysis.";

#[derive(Debug)]
pub struct OpenAiBackend {
    client: HttpClient,
    endpoint: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl OpenAiBackend {
    #[must_use]
    pub fn new(config: &AiConfig) -> Self {
        Self {
            client: HttpClient::new(Duration::from_secs(config.timeout_secs)),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_MESSAGE},
                {"role": "user", "content": prompt},
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }
}

impl AiBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(skip_all, fields(model = %self.model))]
    fn ask(&self, request: &AskRequest<'_>) -> Result<String, BridgeError> {
        let url = join_url(&self.endpoint, "/v1/chat/completions");
        let body = self.request_body(&request.prompt());
        let answer: Value = self.client.post_json(&url, &body)?;
        let content = answer
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"));
        let text = require_text(&url, content, "choices[0].message.content")?;
        info!(chars = text.len(), "completion received");
        Ok(text)
    }

    fn health(&self) -> Result<HealthStatus, BridgeError> {
        let url = join_url(&self.endpoint, "/v1/models");
        let models: Value = self.client.get_json(&url)?;
        let count = models
            .get("data")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        Ok(HealthStatus {
            backend: self.name().to_string(),
            endpoint: self.endpoint.clone(),
            healthy: true,
            detail: format!("{count} models served"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_has_system_and_user_messages() {
        let backend = OpenAiBackend::new(&AiConfig::default());
        let body = backend.request_body("hello");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["max_tokens"], 1000);
    }
}
