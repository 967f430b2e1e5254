use std::fmt;

use crate::errors::Failure;

/// API key for the text-generation provider. Never printed, never persisted.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Resolve the key from an explicit flag value, falling back to `env_var`.
    pub fn resolve(explicit: Option<&str>, env_var: &str) -> Self {
        match explicit {
            Some(k) if !k.trim().is_empty() => Self::new(k.trim()),
            _ => Self::new(std::env::var(env_var).unwrap_or_default().trim()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn require(&self) -> Result<&Self, Failure> {
        if self.is_empty() {
            return Err(Failure::Validation("Please enter your API key.".into()));
        }
        Ok(self)
    }

    /// Raw secret, for building the outbound request only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}
