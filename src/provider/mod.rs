use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::cli::ProviderKind;
use crate::config::Config;
use crate::credential::Credential;
use crate::errors::Failure;

pub mod anthropic;
pub mod gemini;
pub mod openai;

/// A hosted text-generation service: one prompt in, one text reply out.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;
    fn model(&self) -> &str;
    async fn complete(&self, prompt: &str, credential: &Credential) -> Result<String, Failure>;
}

pub type DynProvider = Box<dyn Provider + Send + Sync>;

pub fn make_provider(kind: ProviderKind, cfg: &Config) -> Result<DynProvider> {
    let model = cfg.model.clone();
    let provider: DynProvider = match kind {
        ProviderKind::Gemini => Box::new(gemini::GeminiProvider::new(model, cfg)),
        ProviderKind::OpenAI => Box::new(openai::OpenAIProvider::new(model, cfg)),
        ProviderKind::Anthropic => Box::new(anthropic::Anthropic::new(model, cfg)),
    };
    Ok(provider)
}

/// Turn a non-success HTTP reply into a transport failure, preferring the
/// provider's own `error.message` when the body carries one.
pub(crate) fn http_failure(provider: &str, status: StatusCode, body: &str) -> Failure {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());
    Failure::Transport(format!("{provider} API error ({status}): {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_failure_prefers_structured_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        let f = http_failure("gemini", StatusCode::BAD_REQUEST, body);
        assert_eq!(
            f,
            Failure::Transport("gemini API error (400 Bad Request): API key not valid.".into())
        );
    }

    #[test]
    fn http_failure_falls_back_to_raw_body() {
        let f = http_failure("openai", StatusCode::BAD_GATEWAY, " upstream down \n");
        assert_eq!(
            f,
            Failure::Transport("openai API error (502 Bad Gateway): upstream down".into())
        );
    }

    #[test]
    fn factory_honours_kind_and_model() {
        let mut cfg = Config::default();
        cfg.model = "gpt-4.1-mini".into();
        let p = make_provider(ProviderKind::OpenAI, &cfg).unwrap();
        assert_eq!(p.name(), "openai");
        assert_eq!(p.model(), "gpt-4.1-mini");
    }
}
