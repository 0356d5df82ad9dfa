use crate::error::{PmoError, Result};
use crate::io;
use crate::paths;
use crate::types::{BusinessUnit, Phase, PhaseAction, StateKey};
use chrono_tz::Tz;
use pmo_agent::LaunchOptions;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// RemoteConfig
// ---------------------------------------------------------------------------

pub const DEFAULT_ENDPOINT: &str = "https://api.linear.app/graphql";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// `curl` subprocess
    #[default]
    Curl,
    /// In-process blocking HTTP client
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub transport: TransportKind,
    pub timeout_secs: u64,
    /// Maximum correlated candidates fetched per search.
    pub search_limit: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            transport: TransportKind::Curl,
            timeout_secs: 15,
            search_limit: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// CredentialsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Variable names tried in order, first in the environment and then in
    /// the secrets file.
    pub key_names: Vec<String>,
    /// Defaults to `~/.claude/secrets.env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets_file: Option<PathBuf>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            key_names: vec!["REMOTE_API_KEY".to_string(), "LINEAR_API_KEY".to_string()],
            secrets_file: None,
        }
    }
}

impl CredentialsConfig {
    pub fn secrets_path(&self) -> Option<PathBuf> {
        match &self.secrets_file {
            Some(p) => Some(paths::expand_home(p)),
            None => paths::default_secrets_path().ok(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectRule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ProjectRule {
    /// Case-insensitive keyword containment.
    pub fn matches(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && haystack.contains(&k.to_lowercase()))
    }
}

// ---------------------------------------------------------------------------
// LifecycleStep
// ---------------------------------------------------------------------------

/// One tracked sub-task and the phase it signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleStep {
    pub skill: String,
    pub phase: Phase,
    pub action: PhaseAction,
    /// Timeline line appended to the record.
    pub note: String,
}

fn step(skill: &str, phase: Phase, action: PhaseAction, note: &str) -> LifecycleStep {
    LifecycleStep {
        skill: skill.to_string(),
        phase,
        action,
        note: note.to_string(),
    }
}

pub fn default_lifecycle() -> Vec<LifecycleStep> {
    vec![
        step(
            "superpowers:brainstorming",
            Phase::Requirements,
            PhaseAction::CreateOrUpdate,
            "Requirements analysed",
        ),
        step(
            "superpowers:writing-plans",
            Phase::Planning,
            PhaseAction::AppendPlan,
            "Implementation plan written",
        ),
        step(
            "superpowers:using-git-worktrees",
            Phase::Development,
            PhaseAction::SetInProgress,
            "Development started",
        ),
        step(
            "superpowers:test-driven-development",
            Phase::Development,
            PhaseAction::LogActivity,
            "TDD in progress",
        ),
        step(
            "superpowers:requesting-code-review",
            Phase::Review,
            PhaseAction::SetInReview,
            "Code review requested",
        ),
        step(
            "superpowers:verification-before-completion",
            Phase::Verification,
            PhaseAction::LogVerification,
            "Verification passed, awaiting release",
        ),
        step(
            "superpowers:finishing-a-development-branch",
            Phase::Completion,
            PhaseAction::SetReadyForRelease,
            "Development branch finished, awaiting release",
        ),
    ]
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Summaries shorter than this are not worth a record.
    pub min_summary_chars: usize,
    /// Transcripts with fewer lines are ignored at the adapter.
    pub min_transcript_lines: usize,
    /// Transcript lines considered, counted from the end.
    pub tail_lines: usize,
    pub max_messages: usize,
    pub message_chars: usize,
    /// Summary length handed to the sink.
    pub summary_chars: usize,
    /// Summary length echoed in a `needs_processing` outcome.
    pub marker_summary_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_summary_chars: 100,
            min_transcript_lines: 10,
            tail_lines: 50,
            max_messages: 20,
            message_chars: 300,
            summary_chars: 2000,
            marker_summary_chars: 500,
        }
    }
}

// ---------------------------------------------------------------------------
// AgentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub executable: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    /// Agent working directory; its rules files decide how records look.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    pub disallowed_tools: Vec<String>,
    pub strip_env: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            executable: "claude".to_string(),
            model: Some("haiku".to_string()),
            max_turns: Some(10),
            cwd: None,
            disallowed_tools: vec!["Skill".to_string()],
            strip_env: pmo_agent::options::DEFAULT_STRIPPED_ENV
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl AgentConfig {
    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            executable: paths::expand_home(Path::new(&self.executable))
                .to_string_lossy()
                .into_owned(),
            model: self.model.clone(),
            max_turns: self.max_turns,
            disallowed_tools: self.disallowed_tools.clone(),
            skip_permissions: true,
            cwd: self.cwd.as_deref().map(paths::expand_home),
            strip_env: self.strip_env.clone(),
            env: Default::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

/// Where a classified event goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Route and mutate the tracker in-process.
    Direct,
    /// Hand the event to the detached reasoning agent.
    Agent,
}

impl SinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SinkKind::Direct => "direct",
            SinkKind::Agent => "agent",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterOverride {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink: Option<SinkKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markers: Option<Vec<String>>,
}

impl Default for AdapterOverride {
    fn default() -> Self {
        Self {
            enabled: true,
            sink: None,
            markers: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

fn default_version() -> u32 {
    1
}

fn default_timezone() -> String {
    "Asia/Shanghai".to_string()
}

fn default_failure_markers() -> Vec<String> {
    ["失败", "error", "Error"].iter().map(|s| s.to_string()).collect()
}

fn default_trade_markers() -> Vec<String> {
    ["买入", "卖出", "成交", "BUY", "SELL", "FILLED"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// IANA zone for title prefixes and timeline stamps.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub teams: BTreeMap<BusinessUnit, String>,
    #[serde(default)]
    pub states: BTreeMap<StateKey, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub projects: BTreeMap<BusinessUnit, Vec<ProjectRule>>,
    #[serde(default = "default_lifecycle")]
    pub lifecycle: Vec<LifecycleStep>,
    /// Output substrings that mark a failed upstream command. Substring
    /// matching only; wording outside this list slips through.
    #[serde(default = "default_failure_markers")]
    pub failure_markers: Vec<String>,
    #[serde(default = "default_trade_markers")]
    pub trade_markers: Vec<String>,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub adapters: BTreeMap<String, AdapterOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            remote: RemoteConfig::default(),
            credentials: CredentialsConfig::default(),
            timezone: default_timezone(),
            teams: BTreeMap::new(),
            states: BTreeMap::new(),
            labels: BTreeMap::new(),
            projects: BTreeMap::new(),
            lifecycle: default_lifecycle(),
            failure_markers: default_failure_markers(),
            trade_markers: default_trade_markers(),
            session: SessionConfig::default(),
            agent: AgentConfig::default(),
            adapters: BTreeMap::new(),
            log_file: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PmoError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    /// Load an explicitly named file (which must exist), or the default
    /// location if present, or built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match paths::default_config_path() {
            Ok(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Typed lookups
    // -----------------------------------------------------------------------

    pub fn team_id(&self, unit: BusinessUnit) -> Result<&str> {
        self.teams
            .get(&unit)
            .map(String::as_str)
            .filter(|id| !id.trim().is_empty())
            .ok_or(PmoError::TeamNotConfigured(unit))
    }

    pub fn state_id(&self, key: StateKey) -> Result<&str> {
        self.states
            .get(&key)
            .map(String::as_str)
            .filter(|id| !id.trim().is_empty())
            .ok_or(PmoError::StateNotConfigured(key))
    }

    pub fn label_id(&self, name: &str) -> Result<&str> {
        self.labels
            .get(name)
            .map(String::as_str)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| PmoError::LabelNotConfigured(name.to_string()))
    }

    /// First project of `unit` whose keywords occur in `text`.
    pub fn classify_project(&self, unit: BusinessUnit, text: &str) -> Option<&ProjectRule> {
        self.projects
            .get(&unit)
            .and_then(|rules| rules.iter().find(|r| r.matches(text)))
    }

    pub fn lifecycle_step(&self, skill: &str) -> Option<&LifecycleStep> {
        self.lifecycle.iter().find(|s| s.skill == skill)
    }

    /// Configured zone, falling back to UTC when the name does not parse.
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }

    pub fn adapter_enabled(&self, name: &str) -> bool {
        self.adapters.get(name).map(|a| a.enabled).unwrap_or(true)
    }

    pub fn adapter_sink(&self, name: &str, default: SinkKind) -> SinkKind {
        self.adapters
            .get(name)
            .and_then(|a| a.sink)
            .unwrap_or(default)
    }

    pub fn adapter_markers(&self, name: &str) -> Option<&[String]> {
        self.adapters
            .get(name)
            .and_then(|a| a.markers.as_deref())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.timezone.parse::<Tz>().is_err() {
            warnings.push(ConfigWarning::error(format!(
                "unknown timezone '{}'",
                self.timezone
            )));
        }

        if self.remote.endpoint.trim().is_empty() {
            warnings.push(ConfigWarning::error("remote.endpoint is empty"));
        }
        if self.remote.timeout_secs == 0 {
            warnings.push(ConfigWarning::error("remote.timeout_secs must be greater than zero"));
        }
        if self.remote.search_limit == 0 {
            warnings.push(ConfigWarning::error("remote.search_limit must be greater than zero"));
        }
        if self.credentials.key_names.is_empty() {
            warnings.push(ConfigWarning::error("credentials.key_names is empty"));
        }

        for (unit, id) in &self.teams {
            if id.trim().is_empty() {
                warnings.push(ConfigWarning::warning(format!("teams.{unit} has an empty id")));
            }
        }
        for unit in [
            BusinessUnit::Product,
            BusinessUnit::Content,
            BusinessUnit::Investment,
        ] {
            if !self.teams.contains_key(&unit) {
                warnings.push(ConfigWarning::warning(format!(
                    "no team configured for '{unit}'; its events will fail"
                )));
            }
        }

        let mut seen = BTreeSet::new();
        for step in &self.lifecycle {
            if !seen.insert(step.skill.as_str()) {
                warnings.push(ConfigWarning::error(format!(
                    "lifecycle skill '{}' is listed more than once",
                    step.skill
                )));
            }
            if let Some(state) = step.action.target_state() {
                if self.state_id(state).is_err() {
                    warnings.push(ConfigWarning::warning(format!(
                        "lifecycle action '{}' targets state '{state}' which has no id",
                        step.action
                    )));
                }
            }
        }

        if self.failure_markers.iter().any(|m| m.is_empty()) {
            warnings.push(ConfigWarning::error(
                "failure_markers contains an empty string, which matches every output",
            ));
        }

        for (name, unit) in self
            .projects
            .iter()
            .flat_map(|(unit, rules)| rules.iter().map(move |r| (&r.name, unit)))
        {
            if !self.teams.contains_key(unit) {
                warnings.push(ConfigWarning::warning(format!(
                    "project '{name}' belongs to '{unit}' which has no team"
                )));
            }
        }

        let known = crate::adapters::names();
        for name in self.adapters.keys() {
            if !known.contains(&name.as_str()) {
                warnings.push(ConfigWarning::warning(format!(
                    "adapters.{name} does not name a known adapter"
                )));
            }
        }

        warnings
    }
}
