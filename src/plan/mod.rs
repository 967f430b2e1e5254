use crate::errors::Failure;
use crate::prompt::OFF_TOPIC_MESSAGE;
use crate::wire::extract_fenced_json;

/// Free-form Markdown plan returned by the planning call. Opaque to the
/// orchestrator apart from the non-empty check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanDocument(String);

impl PlanDocument {
    /// Accept the raw planning reply verbatim, unless it is empty or the
    /// model answered with the off-topic sentinel.
    pub fn from_reply(text: &str) -> Result<Self, Failure> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Failure::MalformedResponse("the AI returned an empty plan".into()));
        }
        if let Some(reason) = sentinel_refusal(trimmed) {
            return Err(Failure::Refused(reason));
        }
        Ok(Self(text.to_string()))
    }

    pub fn from_edit(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Recognise `"error": "..."` either bare, wrapped in braces, or inside a
/// json fence.
fn sentinel_refusal(text: &str) -> Option<String> {
    let body = extract_fenced_json(text).unwrap_or(text).trim();
    let inner = body
        .strip_prefix('{')
        .and_then(|b| b.strip_suffix('}'))
        .unwrap_or(body)
        .trim();
    if !inner.starts_with("\"error\"") {
        return None;
    }
    let wrapped = format!("{{{inner}}}");
    let reason = serde_json::from_str::<serde_json::Value>(&wrapped)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| OFF_TOPIC_MESSAGE.to_string());
    Some(reason)
}
