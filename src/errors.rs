use thiserror::Error;

/// Every way a generation run can fail. All variants are recoverable:
/// the session returns to `AwaitingPrompt` and the user may retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    #[error("{0}")] Validation(String),
    #[error("malformed response: {0}")] MalformedResponse(String),
    #[error("{0}")] Refused(String),
    #[error("{0}")] Transport(String),
}

impl Failure {
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::Validation(_) => "validation",
            Failure::MalformedResponse(_) => "malformed_response",
            Failure::Refused(_) => "refused",
            Failure::Transport(_) => "transport",
        }
    }
}

impl From<reqwest::Error> for Failure {
    fn from(e: reqwest::Error) -> Self {
        Failure::Transport(e.to_string())
    }
}
