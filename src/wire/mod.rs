use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::errors::Failure;

/// ========================================
/// Final-generation reply protocol
/// ========================================

pub const REQUIRED_FIELDS: [&str; 4] = ["title", "html", "css", "javascript"];

/// The four-field result of a successful site generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteArtifact {
    pub title: String,
    pub html: String,
    pub css: String,
    pub javascript: String,
}

/// Why a reply could not become a `SiteArtifact`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyError {
    /// No ```json fenced block in the reply text.
    NoFencedBlock,
    /// A block was found but is not a JSON object with string fields.
    Decode(String),
    MissingFields(Vec<&'static str>),
    /// The model declined the request; carries its stated reason.
    Refused(String),
}

impl From<ReplyError> for Failure {
    fn from(e: ReplyError) -> Self {
        match e {
            ReplyError::NoFencedBlock => Failure::MalformedResponse(
                "The AI response was not in the expected JSON format.".into(),
            ),
            ReplyError::Decode(msg) => Failure::MalformedResponse(msg),
            ReplyError::MissingFields(fields) => Failure::MalformedResponse(format!(
                "reply is missing required field(s): {}",
                fields.join(", ")
            )),
            ReplyError::Refused(reason) => Failure::Refused(reason),
        }
    }
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("static regex"))
}

/// Contents of the first ```json fenced block, trimmed.
pub fn extract_fenced_json(text: &str) -> Option<&str> {
    fence_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
}

/// Decode an extracted block. An `error` member takes precedence over the
/// four artifact fields.
pub fn decode_site_reply(block: &str) -> Result<SiteArtifact, ReplyError> {
    let value: Value = serde_json::from_str(block)
        .map_err(|e| ReplyError::Decode(format!("invalid JSON in reply: {e}")))?;
    let obj = match value {
        Value::Object(m) => m,
        other => {
            return Err(ReplyError::Decode(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            )))
        }
    };

    if let Some(reason) = refusal(&obj) {
        return Err(ReplyError::Refused(reason));
    }

    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|f| !obj.contains_key(*f))
        .collect();
    if !missing.is_empty() {
        return Err(ReplyError::MissingFields(missing));
    }

    let field = |name: &str| -> Result<String, ReplyError> {
        match &obj[name] {
            Value::String(s) => Ok(s.clone()),
            other => Err(ReplyError::Decode(format!(
                "field `{name}` must be a string, got {}",
                json_type(other)
            ))),
        }
    };

    Ok(SiteArtifact {
        title: field("title")?,
        html: field("html")?,
        css: field("css")?,
        javascript: field("javascript")?,
    })
}

/// Extract then decode.
pub fn parse_site_response(text: &str) -> Result<SiteArtifact, ReplyError> {
    let block = extract_fenced_json(text).ok_or(ReplyError::NoFencedBlock)?;
    decode_site_reply(block)
}

fn refusal(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAKERY: &str = "Sure! Here it is:\n```json\n{\"title\":\"Sweet Bakery\",\"html\":\"<h1>Hi</h1>\",\"css\":\"h1{color:red}\",\"javascript\":\"console.log(1)\"}\n```\nEnjoy.";

    #[test]
    fn parses_first_fenced_block() {
        let a = parse_site_response(BAKERY).unwrap();
        assert_eq!(a.title, "Sweet Bakery");
        assert_eq!(a.html, "<h1>Hi</h1>");
        assert_eq!(a.css, "h1{color:red}");
        assert_eq!(a.javascript, "console.log(1)");
    }

    #[test]
    fn only_first_block_is_used() {
        let text = "```json\n{\"error\":\"first\"}\n```\n```json\n{\"title\":\"t\",\"html\":\"\",\"css\":\"\",\"javascript\":\"\"}\n```";
        assert_eq!(
            parse_site_response(text),
            Err(ReplyError::Refused("first".into()))
        );
    }

    #[test]
    fn no_block_is_distinct_from_bad_json() {
        assert_eq!(
            parse_site_response("{\"title\":\"bare\"}"),
            Err(ReplyError::NoFencedBlock)
        );
        assert!(matches!(
            parse_site_response("```json\n{not json}\n```"),
            Err(ReplyError::Decode(_))
        ));
    }

    #[test]
    fn untagged_fence_is_not_accepted() {
        let text = "```\n{\"title\":\"a\",\"html\":\"b\",\"css\":\"c\",\"javascript\":\"d\"}\n```";
        assert_eq!(parse_site_response(text), Err(ReplyError::NoFencedBlock));
    }

    #[test]
    fn error_field_wins_over_artifact_fields() {
        let block = r#"{"error":"The provided prompt is not related to website development.","title":"x","html":"","css":"","javascript":""}"#;
        assert_eq!(
            decode_site_reply(block),
            Err(ReplyError::Refused(
                "The provided prompt is not related to website development.".into()
            ))
        );
    }

    #[test]
    fn falsy_error_member_is_ignored() {
        for falsy in ["null", "false", "0", "0.0", "\"\""] {
            let block = format!(
                r#"{{"error":{falsy},"title":"t","html":"h","css":"c","javascript":"j"}}"#
            );
            let a = decode_site_reply(&block).unwrap();
            assert_eq!(a.title, "t", "error = {falsy}");
        }
        assert_eq!(
            decode_site_reply(r#"{"error":1}"#),
            Err(ReplyError::Refused("1".into()))
        );
    }

    #[test]
    fn reports_every_missing_field() {
        assert_eq!(
            decode_site_reply(r#"{"title":"only"}"#),
            Err(ReplyError::MissingFields(vec!["html", "css", "javascript"]))
        );
    }

    #[test]
    fn non_string_field_is_rejected() {
        let err = decode_site_reply(r#"{"title":1,"html":"","css":"","javascript":""}"#).unwrap_err();
        assert_eq!(
            err,
            ReplyError::Decode("field `title` must be a string, got number".into())
        );
    }

    #[test]
    fn array_reply_is_rejected() {
        assert!(matches!(decode_site_reply("[1,2]"), Err(ReplyError::Decode(_))));
    }

    #[test]
    fn reply_errors_map_to_failures() {
        assert!(matches!(
            Failure::from(ReplyError::NoFencedBlock),
            Failure::MalformedResponse(_)
        ));
        assert_eq!(
            Failure::from(ReplyError::Refused("nope".into())),
            Failure::Refused("nope".into())
        );
    }
}
