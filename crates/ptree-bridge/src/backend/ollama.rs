//! Local Ollama runtime.

use std::time::Duration;

use ptree_core::config::AiConfig;
use serde_json::{Value, json};
use tracing::{info, instrument};

use super::{AiBackend, AskRequest, HealthStatus, require_text};
use crate::error::BridgeError;
use crate::http::{HttpClient, join_url};

#[derive(Debug)]
pub struct OllamaBackend {
    client: HttpClient,
    endpoint: String,
    model: String,
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
}

impl OllamaBackend {
    #[must_use]
    pub fn new(config: &AiConfig) -> Self {
        Self {
            client: HttpClient::new(Duration::from_secs(config.timeout_secs)),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "top_p": self.top_p,
                "num_predict": self.max_tokens,
            }
        })
    }
}

impl AiBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(skip_all, fields(model = %self.model))]
    fn ask(&self, request: &AskRequest<'_>) -> Result<String, BridgeError> {
        let url = join_url(&self.endpoint, "/api/generate");
        let body = self.request_body(&request.prompt());
        let answer: Value = self.client.post_json(&url, &body)?;
        let text = require_text(&url, answer.get("response"), "response")?;
        info!(chars = text.len(), "ollama answered");
        Ok(text)
    }

    fn health(&self) -> Result<HealthStatus, BridgeError> {
        let url = join_url(&self.endpoint, "/api/tags");
        let tags: Value = self.client.get_json(&url)?;
        let models: Vec<&str> = tags
            .get("models")
            .and_then(Value::as_array)
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        let has_model = models.iter().any(|name| *name == self.model);
        let detail = if has_model {
            format!("model {} available", self.model)
        } else {
            format!(
                "model {} not pulled ({} models available)",
                self.model,
                models.len()
            )
        };
        Ok(HealthStatus {
            backend: self.name().to_string(),
            endpoint: self.endpoint.clone(),
            healthy: has_model,
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_disables_streaming() {
        let backend = OllamaBackend::new(&AiConfig::default());
        let body = backend.request_body("hello");
        assert_eq!(body["model"], "llama3.2:3b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 1000);
    }
}
