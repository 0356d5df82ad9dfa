//! Record store abstraction over the remote tracker.
//!
//! The correlation lookup is a description substring search. The store gives
//! no uniqueness guarantee and no atomic append, so two concurrent pipelines
//! for the same session can both create, or both rewrite the description
//! with the last write winning.

pub mod graphql;
pub mod memory;

use crate::error::Result;
use crate::outcome::IssueRef;
use serde::{Deserialize, Serialize};

pub use graphql::GraphqlStore;
pub use memory::MemoryStore;

/// A ticket as returned by searches and lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedRecord {
    pub id: String,
    pub identifier: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl TrackedRecord {
    pub fn to_issue_ref(&self) -> IssueRef {
        IssueRef {
            id: self.id.clone(),
            identifier: self.identifier.clone(),
            url: self.url.clone(),
        }
    }
}

/// Input for a new record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDraft {
    pub team_id: String,
    pub title: String,
    pub description: String,
    pub label_ids: Vec<String>,
    pub project_id: Option<String>,
    pub state_id: Option<String>,
}

pub trait IssueStore {
    /// Up to `limit` records of `team_id` whose description contains `needle`,
    /// in whatever order the store returns them.
    fn search_by_description(
        &self,
        team_id: &str,
        needle: &str,
        limit: u32,
    ) -> Result<Vec<TrackedRecord>>;

    /// Look a record up by its short identifier (`P-15`). `None` when the
    /// store does not know it.
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<TrackedRecord>>;

    fn create(&self, draft: &RecordDraft) -> Result<IssueRef>;

    fn update_state(&self, id: &str, state_id: &str) -> Result<IssueRef>;

    fn description(&self, id: &str) -> Result<String>;

    fn set_description(&self, id: &str, description: &str) -> Result<IssueRef>;

    /// Read-modify-write append. Not atomic.
    fn append_description(&self, id: &str, addition: &str) -> Result<IssueRef> {
        let current = self.description(id)?;
        let updated = if current.is_empty() {
            addition.to_string()
        } else {
            format!("{current}\n\n{addition}")
        };
        self.set_description(id, &updated)
    }
}
