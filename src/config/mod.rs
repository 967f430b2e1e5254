use anyhow::{Context, Result};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cli::{Args, ProviderKind};

/// Runtime settings. Credentials never live here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,
    pub model: String,
    /// Overrides the provider's public endpoint (proxies, local gateways).
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub use_planning: bool,
    pub out: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            model: ProviderKind::Gemini.default_model().into(),
            base_url: None,
            timeout_secs: 600,
            temperature: 0.7,
            max_output_tokens: 16_384,
            use_planning: true,
            out: "site.html".into(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        toml::from_str(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// File (if any) first, then command-line flags on top.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut cfg = match &args.config {
            Some(p) => Self::load(Path::new(p))?,
            None => Self::default(),
        };

        if let Some(kind) = args.provider {
            if kind != cfg.provider && args.model.is_none() {
                cfg.model = kind.default_model().into();
            }
            cfg.provider = kind;
        }
        if let Some(m) = &args.model {
            cfg.model = m.clone();
        }
        if let Some(url) = &args.base_url {
            cfg.base_url = Some(url.clone());
        }
        if let Some(t) = args.timeout_secs {
            cfg.timeout_secs = t;
        }
        if let Some(out) = &args.out {
            cfg.out = out.clone();
        }
        if args.no_plan {
            cfg.use_planning = false;
        } else if args.plan {
            cfg.use_planning = true;
        }
        Ok(cfg)
    }
}
