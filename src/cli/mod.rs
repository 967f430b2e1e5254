use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(alias = "google")]
    Gemini,
    #[value(name = "openai", alias = "open-ai")]
    OpenAI,
    #[value(alias = "claude")]
    Anthropic,
}

impl ProviderKind {
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.5-flash",
            ProviderKind::OpenAI => "gpt-4.1-mini",
            ProviderKind::Anthropic => "claude-sonnet-4-5",
        }
    }

    /// Environment variable consulted when no `--api-key` is given.
    pub fn key_env(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::OpenAI => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "vibe_sitegen", version, about = "Describe a website, get a single-page HTML document back")]
pub struct Args {
    /// What the website should be. Asked for interactively when omitted.
    #[arg(long)]
    pub task: Option<String>,

    #[arg(long, value_enum)]
    pub provider: Option<ProviderKind>,

    #[arg(long)]
    pub model: Option<String>,

    /// Falls back to the provider's *_API_KEY environment variable.
    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub base_url: Option<String>,

    /// Ask for a reviewable plan before generating (default).
    #[arg(long, default_value_t = false, conflicts_with = "no_plan")]
    pub plan: bool,

    /// Generate the site directly from the prompt.
    #[arg(long, default_value_t = false)]
    pub no_plan: bool,

    /// Accept the generated plan without review.
    #[arg(long, default_value_t = false)]
    pub auto_approve: bool,

    /// Where the assembled HTML document is written.
    #[arg(long)]
    pub out: Option<String>,

    /// Open the written document in the system browser.
    #[arg(long, default_value_t = false)]
    pub open: bool,

    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn provider_aliases_parse() {
        let a = Args::parse_from(["vibe_sitegen", "--provider", "claude"]);
        assert_eq!(a.provider, Some(ProviderKind::Anthropic));
        let a = Args::parse_from(["vibe_sitegen", "--provider", "openai"]);
        assert_eq!(a.provider, Some(ProviderKind::OpenAI));
    }

    #[test]
    fn plan_flags_conflict() {
        assert!(Args::try_parse_from(["vibe_sitegen", "--plan", "--no-plan"]).is_err());
    }
}
