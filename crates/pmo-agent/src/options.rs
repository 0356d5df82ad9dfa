use std::collections::HashMap;
use std::path::PathBuf;

/// Environment variables removed before launching so the agent falls back to
/// its own subscription login and does not think it is nested in a session.
pub const DEFAULT_STRIPPED_ENV: &[&str] = &["ANTHROPIC_API_KEY", "CLAUDECODE"];

/// Options for one detached agent launch.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Binary name or path (default: `"claude"`)
    pub executable: String,
    /// Model alias passed as `--model`
    pub model: Option<String>,
    /// Turn ceiling passed as `--max-turns`
    pub max_turns: Option<u32>,
    /// Tool patterns passed as `--disallowedTools`
    pub disallowed_tools: Vec<String>,
    /// Pass `--dangerously-skip-permissions`; the agent runs unattended
    pub skip_permissions: bool,
    /// Working directory for the agent (its rules files live there)
    pub cwd: Option<PathBuf>,
    /// Variables removed from the inherited environment
    pub strip_env: Vec<String>,
    /// Extra variables set on the child
    pub env: HashMap<String, String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            executable: "claude".to_string(),
            model: None,
            max_turns: None,
            disallowed_tools: Vec::new(),
            skip_permissions: true,
            cwd: None,
            strip_env: DEFAULT_STRIPPED_ENV.iter().map(|s| s.to_string()).collect(),
            env: HashMap::new(),
        }
    }
}
