use crate::error::{PmoError, Result};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Agent-runtime home, relative to the user's home directory.
pub const CLAUDE_DIR: &str = ".claude";
pub const CONFIG_FILE: &str = "pmo.yaml";
pub const SECRETS_FILE: &str = "secrets.env";

pub const CONFIG_ENV: &str = "PMO_CONFIG";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn claude_dir() -> Result<PathBuf> {
    home::home_dir()
        .map(|h| h.join(CLAUDE_DIR))
        .ok_or(PmoError::HomeNotFound)
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(claude_dir()?.join(CONFIG_FILE))
}

pub fn default_secrets_path() -> Result<PathBuf> {
    Ok(claude_dir()?.join(SECRETS_FILE))
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &std::path::Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
