use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{http_failure, Provider};
use crate::config::Config;
use crate::credential::Credential;
use crate::errors::Failure;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI chat completions; the prompt goes out as a single user message.
pub struct OpenAIProvider {
    model: String,
    client: Client,
    base_url: String,
    timeout_secs: u64,
    temperature: f32,
    max_output_tokens: u32,
}

impl OpenAIProvider {
    pub fn new(model: String, cfg: &Config) -> Self {
        Self {
            model,
            client: Client::new(),
            base_url: cfg.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            timeout_secs: cfg.timeout_secs,
            temperature: cfg.temperature,
            max_output_tokens: cfg.max_output_tokens,
        }
    }
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

fn extract_text(body: &str) -> Result<String, Failure> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| Failure::Transport(format!("Failed to parse OpenAI response: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Failure::Transport("OpenAI returned no content".into()))
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, credential: &Credential) -> Result<String, Failure> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_output_tokens,
        });
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(%url, "openai: POST chat/completions");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(credential.expose())
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        debug!(%status, bytes = text.len(), "openai: response received");

        if !status.is_success() {
            return Err(http_failure("openai", status, &text));
        }
        extract_text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"first"}},{"message":{"content":"second"}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "first");
    }

    #[test]
    fn null_content_is_transport_failure() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert!(matches!(extract_text(body), Err(Failure::Transport(_))));
    }

    #[test]
    fn garbage_envelope_is_transport_failure() {
        assert!(matches!(extract_text("<html>"), Err(Failure::Transport(_))));
    }
}
