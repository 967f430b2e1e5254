use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{http_failure, Provider};
use crate::config::Config;
use crate::credential::Credential;
use crate::errors::Failure;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct Anthropic {
    pub model: String,
    pub timeout: Duration,
    pub api_base: String,
    pub max_tokens: u32,
    pub temperature: f32,
    client: Client,
}

impl Anthropic {
    pub fn new(model: String, cfg: &Config) -> Self {
        Self {
            model,
            timeout: Duration::from_secs(cfg.timeout_secs),
            api_base: cfg.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            max_tokens: cfg.max_output_tokens,
            temperature: cfg.temperature,
            client: Client::new(),
        }
    }
}

#[derive(Serialize)]
struct MsgRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Msg<'a>>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MsgResponse {
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    text: String,
    #[serde(default)]
    r#type: String,
}

fn extract_text(body: &str) -> Result<String, Failure> {
    let parsed: MsgResponse = serde_json::from_str(body)
        .map_err(|e| Failure::Transport(format!("anthropic response parse error: {e}")))?;
    let text: String = parsed
        .content
        .into_iter()
        .filter(|b| b.r#type == "text")
        .map(|b| b.text)
        .collect();
    if text.is_empty() {
        return Err(Failure::Transport("anthropic: empty content".into()));
    }
    Ok(text)
}

#[async_trait]
impl Provider for Anthropic {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, credential: &Credential) -> Result<String, Failure> {
        let url = format!("{}/v1/messages", self.api_base.trim_end_matches('/'));
        let body = MsgRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Msg { role: "user", content: prompt }],
        };
        debug!(%url, "anthropic: POST messages");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", credential.expose())
            .header("anthropic-version", API_VERSION)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        debug!(%status, bytes = text.len(), "anthropic: response received");

        if !status.is_success() {
            return Err(http_failure("anthropic", status, &text));
        }
        extract_text(&text)
    }
}
