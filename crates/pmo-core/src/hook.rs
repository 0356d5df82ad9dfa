//! Hook payload as delivered on stdin by the agent runtime.
//!
//! Both naming styles are accepted: `triggerKind`/`rawInput`/`rawOutput` and
//! the runtime's own `tool_name`/`tool_input`/`tool_output`. Nothing is
//! validated; absent fields read as empty and usually end in a silent
//! rejection by every adapter.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// A completed shell command (`Bash`).
    ShellExec,
    /// A completed named sub-task (`Skill`).
    SubTask,
    /// End of an agent session.
    SessionEnd,
    Other,
}

impl TriggerKind {
    pub fn parse(tag: &str) -> TriggerKind {
        match tag {
            "shell_exec" | "Bash" => TriggerKind::ShellExec,
            "sub_task" | "Skill" => TriggerKind::SubTask,
            "session_end" | "SessionEnd" => TriggerKind::SessionEnd,
            _ => TriggerKind::Other,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HookInput {
    #[serde(alias = "tool_name")]
    pub trigger_kind: Option<String>,
    #[serde(alias = "tool_input")]
    pub raw_input: Value,
    #[serde(alias = "tool_output", alias = "tool_response")]
    pub raw_output: Value,
    #[serde(alias = "session_id")]
    pub session_id: Option<String>,
    #[serde(alias = "cwd")]
    pub working_directory: Option<String>,
    #[serde(alias = "transcript_path")]
    pub transcript_path: Option<String>,
    pub reason: Option<String>,
    #[serde(alias = "hook_event_name")]
    pub hook_event_name: Option<String>,
}

impl HookInput {
    /// Parse a payload. Malformed JSON reads as "no payload".
    pub fn parse(text: &str) -> Option<HookInput> {
        match serde_json::from_str(text) {
            Ok(input) => Some(input),
            Err(e) => {
                tracing::debug!(error = %e, "hook payload is not valid JSON");
                None
            }
        }
    }

    pub fn trigger(&self) -> TriggerKind {
        match self.trigger_kind.as_deref() {
            Some(tag) => TriggerKind::parse(tag),
            None => match self.hook_event_name.as_deref() {
                Some("SessionEnd") => TriggerKind::SessionEnd,
                _ => TriggerKind::Other,
            },
        }
    }

    pub fn session_id(&self) -> &str {
        self.session_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown")
    }

    pub fn cwd(&self) -> &str {
        self.working_directory.as_deref().unwrap_or_default()
    }

    fn input_str(&self, keys: &[&str]) -> &str {
        keys.iter()
            .find_map(|k| self.raw_input.get(*k).and_then(Value::as_str))
            .unwrap_or_default()
    }

    /// Shell command line, for shell triggers.
    pub fn command(&self) -> &str {
        match &self.raw_input {
            Value::String(s) => s,
            _ => self.input_str(&["command"]),
        }
    }

    /// Sub-task name, for sub-task triggers.
    pub fn skill(&self) -> &str {
        self.input_str(&["skill", "name"])
    }

    /// Sub-task arguments as text.
    pub fn args(&self) -> String {
        match self.raw_input.get("args") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => self.input_str(&["text"]).to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// The string adapters match their markers against.
    pub fn descriptor(&self) -> &str {
        match self.trigger() {
            TriggerKind::ShellExec => self.command(),
            TriggerKind::SubTask => self.skill(),
            _ => "",
        }
    }

    /// Output as text; structured output is stringified.
    pub fn output_text(&self) -> String {
        match &self.raw_output {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
