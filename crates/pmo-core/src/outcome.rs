use serde::{Deserialize, Serialize};

use crate::types::BusinessUnit;

/// Short reference to a tracked record as reported back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRef {
    pub id: String,
    #[serde(default)]
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Result of one pipeline invocation, printed as a single JSON line with a
/// `result` tag. Failures travel here too; the process still exits 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Created {
        issue: IssueRef,
    },
    #[serde(rename_all = "camelCase")]
    Updated {
        issue: IssueRef,
        action: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Found {
        issue_key: String,
        issue: IssueRef,
    },
    #[serde(rename_all = "camelCase")]
    NotFound {
        issue_key: String,
    },
    #[serde(rename_all = "camelCase")]
    NewBranch {
        branch: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    NeedsProcessing {
        business_unit: BusinessUnit,
        session_id: String,
        summary: String,
    },
    #[serde(rename_all = "camelCase")]
    AgentSpawned {
        event_type: String,
        business_unit: BusinessUnit,
        session_id: String,
        pid: u32,
    },
    Skipped {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
    },
    Ignored {
        reason: String,
    },
    Failed {
        error: String,
    },
    Error {
        error: String,
    },
}

impl Outcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Outcome::Skipped {
            reason: reason.into(),
            prompt: None,
        }
    }

    pub fn ignored(reason: impl Into<String>) -> Self {
        Outcome::Ignored {
            reason: reason.into(),
        }
    }

    pub fn error(error: impl std::fmt::Display) -> Self {
        Outcome::Error {
            error: error.to_string(),
        }
    }

    /// The `result` tag as printed.
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::Created { .. } => "created",
            Outcome::Updated { .. } => "updated",
            Outcome::Found { .. } => "found",
            Outcome::NotFound { .. } => "not_found",
            Outcome::NewBranch { .. } => "new_branch",
            Outcome::NeedsProcessing { .. } => "needs_processing",
            Outcome::AgentSpawned { .. } => "agent_spawned",
            Outcome::Skipped { .. } => "skipped",
            Outcome::Ignored { .. } => "ignored",
            Outcome::Failed { .. } => "failed",
            Outcome::Error { .. } => "error",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. } | Outcome::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_result_tag() {
        let json = serde_json::to_value(Outcome::skipped("Summary too short")).unwrap();
        assert_eq!(json, serde_json::json!({"result": "skipped", "reason": "Summary too short"}));
    }

    #[test]
    fn tag_matches_serialized_result() {
        let outcomes = [
            Outcome::Created {
                issue: IssueRef::default(),
            },
            Outcome::NotFound {
                issue_key: "P-1".into(),
            },
            Outcome::NeedsProcessing {
                business_unit: BusinessUnit::Content,
                session_id: "s".into(),
                summary: "x".into(),
            },
            Outcome::error("boom"),
        ];
        for outcome in outcomes {
            let json = serde_json::to_value(&outcome).unwrap();
            assert_eq!(json["result"], outcome.tag());
        }
    }

    #[test]
    fn camel_case_fields() {
        let json = serde_json::to_value(Outcome::AgentSpawned {
            event_type: "session_ended".into(),
            business_unit: BusinessUnit::Product,
            session_id: "s1".into(),
            pid: 42,
        })
        .unwrap();
        assert_eq!(json["eventType"], "session_ended");
        assert_eq!(json["businessUnit"], "product");
        assert_eq!(json["sessionId"], "s1");
    }
}
