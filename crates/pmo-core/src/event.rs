//! The transient `Event` handed from an adapter to a sink, plus the typed
//! payloads carried in its `data` field.
//!
//! The wire shape is `{type, businessUnit, sessionId, data}`. `type` stays a
//! plain string so unknown tags survive until the router reports them as
//! ignored; `data` is decoded per type by the handler that owns it, with every
//! field defaulted so a sparse payload still routes.

use crate::types::{BusinessUnit, EventType, Phase, PhaseAction, Platform};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, alias = "bu")]
    pub business_unit: BusinessUnit,
    #[serde(default = "unknown_session", alias = "session_id")]
    pub session_id: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

fn unknown_session() -> String {
    "unknown".to_string()
}

impl Event {
    pub fn new<T: Serialize>(
        event_type: EventType,
        business_unit: BusinessUnit,
        session_id: impl Into<String>,
        data: &T,
    ) -> Self {
        Self {
            event_type: event_type.as_str().to_string(),
            business_unit,
            session_id: session_id.into(),
            // Payload structs are plain data; serialization cannot fail.
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Decode `data` into the payload type for this event. A null payload
    /// decodes to the payload's defaults.
    pub fn payload<T: DeserializeOwned + Default>(&self) -> serde_json::Result<T> {
        if self.data.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(self.data.clone())
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseSignal {
    pub skill: String,
    pub phase: Option<Phase>,
    pub action: Option<PhaseAction>,
    pub description: String,
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BranchCreated {
    pub branch: String,
    pub worktree_path: Option<String>,
    pub issue_key: Option<String>,
    pub project: Option<String>,
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Deployment {
    pub platform: Option<String>,
    pub cwd: Option<String>,
    pub output: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentPublish {
    pub platform: Option<Platform>,
    pub title: Option<String>,
    /// Body text (note copy, post text).
    pub content: Option<String>,
    /// Short description passed to the uploader.
    #[serde(alias = "desc")]
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub image_count: u32,
    pub is_video: bool,
    /// Platform category (e.g. a Bilibili `tid`).
    #[serde(alias = "tid")]
    pub category: Option<String>,
    /// Platform content identifier (e.g. a Bilibili `BV…` id).
    #[serde(alias = "bvid")]
    pub content_id: Option<String>,
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradeReport {
    pub output: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResearchReport {
    pub topic: Option<String>,
    pub output: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSummary {
    pub summary: String,
    pub cwd: Option<String>,
    #[serde(alias = "transcript_path")]
    pub transcript_path: Option<String>,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_accepts_legacy_field_names() {
        let event: Event = serde_json::from_str(
            r#"{"type":"trade","bu":"investment","sessionId":"s1","data":{"output":"买入 100"}}"#,
        )
        .unwrap();
        assert_eq!(event.business_unit, BusinessUnit::Investment);
        let report: TradeReport = event.payload().unwrap();
        assert_eq!(report.output, "买入 100");
    }

    #[test]
    fn missing_session_defaults_to_unknown() {
        let event: Event = serde_json::from_str(r#"{"type":"deployment_event"}"#).unwrap();
        assert_eq!(event.session_id, "unknown");
        let deployment: Deployment = event.payload().unwrap();
        assert_eq!(deployment, Deployment::default());
    }

    #[test]
    fn content_publish_reads_uploader_aliases() {
        let publish: ContentPublish = serde_json::from_value(serde_json::json!({
            "title": "My Clip",
            "desc": "short",
            "tid": "17",
            "bvid": "BV1xx",
            "tags": ["a", "b"]
        }))
        .unwrap();
        assert_eq!(publish.summary.as_deref(), Some("short"));
        assert_eq!(publish.category.as_deref(), Some("17"));
        assert_eq!(publish.content_id.as_deref(), Some("BV1xx"));
    }

    #[test]
    fn new_serializes_camel_case_payload() {
        let event = Event::new(
            EventType::WorkspaceBranchCreated,
            BusinessUnit::Product,
            "s1",
            &BranchCreated {
                branch: "feat/P-15-login".into(),
                worktree_path: Some("../wt".into()),
                ..Default::default()
            },
        );
        assert_eq!(event.event_type, "workspace_branch_created");
        assert_eq!(event.data["worktreePath"], "../wt");
    }
}
