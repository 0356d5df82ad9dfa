use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// BusinessUnit
// ---------------------------------------------------------------------------

/// Team or context an event originates from.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BusinessUnit {
    Product,
    Content,
    Investment,
    Pmo,
    #[default]
    #[serde(other)]
    Unknown,
}

impl BusinessUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            BusinessUnit::Product => "product",
            BusinessUnit::Content => "content",
            BusinessUnit::Investment => "investment",
            BusinessUnit::Pmo => "pmo",
            BusinessUnit::Unknown => "unknown",
        }
    }

    /// Infer the unit from a working directory. Unit directories follow the
    /// `<unit>-bu` naming; the tracking office lives under `pmo`.
    pub fn detect(cwd: &str) -> BusinessUnit {
        if cwd.contains("product-bu") {
            BusinessUnit::Product
        } else if cwd.contains("content-bu") {
            BusinessUnit::Content
        } else if cwd.contains("investment-bu") {
            BusinessUnit::Investment
        } else if cwd.contains("pmo") {
            BusinessUnit::Pmo
        } else {
            BusinessUnit::Unknown
        }
    }
}

impl std::str::FromStr for BusinessUnit {
    type Err = crate::error::PmoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(BusinessUnit::Product),
            "content" => Ok(BusinessUnit::Content),
            "investment" => Ok(BusinessUnit::Investment),
            "pmo" => Ok(BusinessUnit::Pmo),
            _ => Err(crate::error::PmoError::UnknownBusinessUnit(s.to_string())),
        }
    }
}

impl fmt::Display for BusinessUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Content publishing platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Xiaohongshu,
    Bilibili,
    X,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Xiaohongshu => "xiaohongshu",
            Platform::Bilibili => "bilibili",
            Platform::X => "x",
        }
    }

    /// Name used in record titles.
    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Xiaohongshu => "Xiaohongshu",
            Platform::Bilibili => "Bilibili",
            Platform::X => "X",
        }
    }

    /// Heading of the link section left for later backfill.
    pub fn link_heading(self) -> &'static str {
        match self {
            Platform::Xiaohongshu => "Note link",
            Platform::Bilibili => "Video link",
            Platform::X => "Post link",
        }
    }

    /// Columns of the empty engagement table appended to publish records.
    pub fn metric_columns(self) -> &'static [&'static str] {
        match self {
            Platform::Xiaohongshu => &["Likes", "Saves", "Comments"],
            Platform::Bilibili => &["Views", "Likes", "Coins", "Saves"],
            Platform::X => &["Views", "Likes", "Reposts", "Replies"],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StateKey
// ---------------------------------------------------------------------------

/// Lifecycle states of a product record, in workflow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKey {
    Backlog,
    Todo,
    InProgress,
    InReview,
    ReadyForQa,
    ReadyForRelease,
    Done,
}

impl StateKey {
    pub fn all() -> &'static [StateKey] {
        &[
            StateKey::Backlog,
            StateKey::Todo,
            StateKey::InProgress,
            StateKey::InReview,
            StateKey::ReadyForQa,
            StateKey::ReadyForRelease,
            StateKey::Done,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StateKey::Backlog => "backlog",
            StateKey::Todo => "todo",
            StateKey::InProgress => "in_progress",
            StateKey::InReview => "in_review",
            StateKey::ReadyForQa => "ready_for_qa",
            StateKey::ReadyForRelease => "ready_for_release",
            StateKey::Done => "done",
        }
    }

    /// Human label reported in outcomes.
    pub fn label(self) -> &'static str {
        match self {
            StateKey::Backlog => "Backlog",
            StateKey::Todo => "Todo",
            StateKey::InProgress => "In Progress",
            StateKey::InReview => "In Review",
            StateKey::ReadyForQa => "Ready for QA",
            StateKey::ReadyForRelease => "Ready for Release",
            StateKey::Done => "Done",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Phase / PhaseAction
// ---------------------------------------------------------------------------

/// Product lifecycle phases, in order. Order is intent only; nothing rejects
/// an out-of-order signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Requirements,
    Planning,
    Development,
    Review,
    Verification,
    Completion,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Requirements => "requirements",
            Phase::Planning => "planning",
            Phase::Development => "development",
            Phase::Review => "review",
            Phase::Verification => "verification",
            Phase::Completion => "completion",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutation applied to the correlated record for a phase signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseAction {
    /// Append to the correlated record, or create it on first sighting.
    CreateOrUpdate,
    AppendPlan,
    SetInProgress,
    LogActivity,
    SetInReview,
    LogVerification,
    SetReadyForRelease,
}

impl PhaseAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseAction::CreateOrUpdate => "create_or_update",
            PhaseAction::AppendPlan => "append_plan",
            PhaseAction::SetInProgress => "set_in_progress",
            PhaseAction::LogActivity => "log_activity",
            PhaseAction::SetInReview => "set_in_review",
            PhaseAction::LogVerification => "log_verification",
            PhaseAction::SetReadyForRelease => "set_ready_for_release",
        }
    }

    /// State the record moves to. `CreateOrUpdate` only applies it on create.
    pub fn target_state(self) -> Option<StateKey> {
        match self {
            PhaseAction::CreateOrUpdate => Some(StateKey::Backlog),
            PhaseAction::AppendPlan | PhaseAction::LogActivity => None,
            PhaseAction::SetInProgress => Some(StateKey::InProgress),
            PhaseAction::SetInReview => Some(StateKey::InReview),
            PhaseAction::LogVerification | PhaseAction::SetReadyForRelease => {
                Some(StateKey::ReadyForRelease)
            }
        }
    }
}

impl fmt::Display for PhaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EventType
// ---------------------------------------------------------------------------

/// Closed set of event types the router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    LifecyclePhaseEvent,
    WorkspaceBranchCreated,
    DeploymentEvent,
    ContentPublishEvent,
    TradeExecuted,
    ResearchCompleted,
    SessionEnded,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::LifecyclePhaseEvent => "lifecycle_phase_event",
            EventType::WorkspaceBranchCreated => "workspace_branch_created",
            EventType::DeploymentEvent => "deployment_event",
            EventType::ContentPublishEvent => "content_publish_event",
            EventType::TradeExecuted => "trade_executed",
            EventType::ResearchCompleted => "research_completed",
            EventType::SessionEnded => "session_ended",
        }
    }

    /// Resolve a type tag, including the older per-source names. Publish
    /// aliases also pin the platform.
    pub fn parse(tag: &str) -> Option<(EventType, Option<Platform>)> {
        let resolved = match tag {
            "lifecycle_phase_event" | "superpower_event" => (EventType::LifecyclePhaseEvent, None),
            "workspace_branch_created" | "git_worktree" => {
                (EventType::WorkspaceBranchCreated, None)
            }
            "deployment_event" | "deploy_web" | "deploy_testflight" => {
                (EventType::DeploymentEvent, None)
            }
            "content_publish_event" => (EventType::ContentPublishEvent, None),
            "xhs_publish" => (EventType::ContentPublishEvent, Some(Platform::Xiaohongshu)),
            "bilibili_publish" => (EventType::ContentPublishEvent, Some(Platform::Bilibili)),
            "x_publish" => (EventType::ContentPublishEvent, Some(Platform::X)),
            "trade_executed" | "trade" => (EventType::TradeExecuted, None),
            "research_completed" | "research" => (EventType::ResearchCompleted, None),
            "session_ended" | "session_end" => (EventType::SessionEnded, None),
            _ => return None,
        };
        Some(resolved)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
