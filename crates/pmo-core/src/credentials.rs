//! API key lookup for the tracker endpoint.
//!
//! The key is looked up lazily, only when a request is about to go out, so
//! adapters that reject their input never touch the environment or the
//! secrets file. Each configured name is tried in the environment first; the
//! secrets file is consulted only when none of them is set.

use crate::config::CredentialsConfig;
use crate::error::{PmoError, Result};
use regex::Regex;
use std::fmt;
use std::path::PathBuf;

#[derive(Clone)]
pub struct KeySource {
    names: Vec<String>,
    secrets_file: Option<PathBuf>,
    fixed: Option<String>,
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySource")
            .field("names", &self.names)
            .field("secrets_file", &self.secrets_file)
            .field("fixed", &self.fixed.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl KeySource {
    pub fn new(names: Vec<String>, secrets_file: Option<PathBuf>) -> Self {
        Self {
            names,
            secrets_file,
            fixed: None,
        }
    }

    /// A source that always yields `key`.
    pub fn fixed(key: impl Into<String>) -> Self {
        Self {
            names: Vec::new(),
            secrets_file: None,
            fixed: Some(key.into()),
        }
    }

    pub fn from_config(config: &CredentialsConfig) -> Self {
        Self::new(config.key_names.clone(), config.secrets_path())
    }

    pub fn resolve(&self) -> Result<String> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    pub fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<String> {
        if let Some(key) = &self.fixed {
            return Ok(key.clone());
        }
        for name in &self.names {
            if let Some(value) = env(name).filter(|v| !v.trim().is_empty()) {
                tracing::debug!(name = %name, "api key taken from environment");
                return Ok(value.trim().to_string());
            }
        }

        if let Some(path) = &self.secrets_file {
            if let Ok(text) = std::fs::read_to_string(path) {
                for name in &self.names {
                    if let Some(value) = find_assignment(&text, name) {
                        tracing::debug!(name = %name, file = %path.display(), "api key taken from secrets file");
                        return Ok(value);
                    }
                }
            }
        }

        Err(self.missing())
    }

    fn missing(&self) -> PmoError {
        PmoError::CredentialMissing {
            names: self.names.join(" or "),
            file: self
                .secrets_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "the secrets file".to_string()),
        }
    }
}

/// Value of the first `NAME=value` line in `text`, allowing an `export`
/// prefix and single or double quotes.
pub fn find_assignment(text: &str, name: &str) -> Option<String> {
    let pattern = format!(
        r#"(?m)^\s*(?:export\s+)?{}=["']?([^"'\n]+)["']?"#,
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}
