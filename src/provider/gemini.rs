use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{http_failure, Provider};
use crate::config::Config;
use crate::credential::Credential;
use crate::errors::Failure;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini `generateContent`.
pub struct GeminiProvider {
    model: String,
    client: Client,
    base_url: String,
    timeout: Duration,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiProvider {
    pub fn new(model: String, cfg: &Config) -> Self {
        Self {
            model,
            client: Client::new(),
            base_url: cfg.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            timeout: Duration::from_secs(cfg.timeout_secs),
            temperature: cfg.temperature,
            max_output_tokens: cfg.max_output_tokens,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<OutPart>,
}

#[derive(Deserialize)]
struct OutPart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Concatenated text of the first candidate.
fn extract_text(body: &str) -> Result<String, Failure> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| Failure::Transport(format!("failed to parse Gemini response: {e}")))?;

    let Some(first) = parsed.candidates.into_iter().next() else {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".into());
        return Err(Failure::Transport(format!("Gemini returned no content: {reason}")));
    };

    let text: String = first
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        let reason = first.finish_reason.unwrap_or_else(|| "empty reply".into());
        return Err(Failure::Transport(format!("Gemini returned no content: {reason}")));
    }
    if first.finish_reason.as_deref() == Some("MAX_TOKENS") {
        return Err(Failure::Transport(
            "Gemini reply was truncated at max_output_tokens; raise max_output_tokens in the config".into(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, credential: &Credential) -> Result<String, Failure> {
        let body = GenerateRequest {
            contents: vec![Content { role: "user", parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };
        let url = self.url();
        debug!(%url, "gemini: POST generateContent");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", credential.expose())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        debug!(%status, bytes = text.len(), "gemini: response received");

        if !status.is_success() {
            return Err(http_failure("gemini", status, &text));
        }
        extract_text(&text)
    }
}
