use super::{IssueStore, RecordDraft, TrackedRecord};
use crate::error::{PmoError, Result};
use crate::outcome::IssueRef;
use std::sync::Mutex;

/// Number of calls made per store operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub searches: usize,
    pub lookups: usize,
    pub creates: usize,
    pub state_updates: usize,
    pub description_reads: usize,
    pub description_writes: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.searches
            + self.lookups
            + self.creates
            + self.state_updates
            + self.description_reads
            + self.description_writes
    }
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<(String, TrackedRecord)>,
    next: u32,
    calls: CallCounts,
    failure: Option<String>,
}

/// In-process store. Serves unit tests and `--dry-run`.
#[derive(Debug)]
pub struct MemoryStore {
    prefix: String,
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_prefix("MEM")
    }

    /// Identifiers are issued as `<prefix>-<n>`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Make every later call fail with a transport error.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.lock().failure = Some(message.into());
    }

    /// Seed a record under `team_id`.
    pub fn insert(&self, team_id: &str, record: TrackedRecord) {
        self.lock().records.push((team_id.to_string(), record));
    }

    pub fn records(&self) -> Vec<TrackedRecord> {
        self.lock().records.iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<TrackedRecord> {
        self.lock()
            .records
            .iter()
            .find(|(_, r)| r.id == id)
            .map(|(_, r)| r.clone())
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means another test thread panicked mid-call.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(inner: &Inner) -> Result<()> {
        match &inner.failure {
            Some(msg) => Err(PmoError::Transport(msg.clone())),
            None => Ok(()),
        }
    }

    fn record_mut<'a>(inner: &'a mut Inner, id: &str) -> Result<&'a mut TrackedRecord> {
        inner
            .records
            .iter_mut()
            .map(|(_, r)| r)
            .find(|r| r.id == id)
            .ok_or_else(|| PmoError::Graphql(format!("Entity not found: Issue {id}")))
    }
}

impl IssueStore for MemoryStore {
    fn search_by_description(
        &self,
        team_id: &str,
        needle: &str,
        limit: u32,
    ) -> Result<Vec<TrackedRecord>> {
        let mut inner = self.lock();
        inner.calls.searches += 1;
        Self::check(&inner)?;
        Ok(inner
            .records
            .iter()
            .filter(|(team, r)| team == team_id && r.description.contains(needle))
            .take(limit as usize)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn find_by_identifier(&self, identifier: &str) -> Result<Option<TrackedRecord>> {
        let mut inner = self.lock();
        inner.calls.lookups += 1;
        Self::check(&inner)?;
        Ok(inner
            .records
            .iter()
            .find(|(_, r)| r.identifier == identifier)
            .map(|(_, r)| r.clone()))
    }

    fn create(&self, draft: &RecordDraft) -> Result<IssueRef> {
        let mut inner = self.lock();
        inner.calls.creates += 1;
        Self::check(&inner)?;
        inner.next += 1;
        let n = inner.next;
        let record = TrackedRecord {
            id: format!("{}-id-{n}", self.prefix.to_lowercase()),
            identifier: format!("{}-{n}", self.prefix),
            title: draft.title.clone(),
            description: draft.description.clone(),
            state: draft.state_id.clone(),
            labels: draft.label_ids.clone(),
            project: draft.project_id.clone(),
            url: None,
        };
        let issue = record.to_issue_ref();
        inner.records.push((draft.team_id.clone(), record));
        Ok(issue)
    }

    fn update_state(&self, id: &str, state_id: &str) -> Result<IssueRef> {
        let mut inner = self.lock();
        inner.calls.state_updates += 1;
        Self::check(&inner)?;
        let record = Self::record_mut(&mut inner, id)?;
        record.state = Some(state_id.to_string());
        Ok(record.to_issue_ref())
    }

    fn description(&self, id: &str) -> Result<String> {
        let mut inner = self.lock();
        inner.calls.description_reads += 1;
        Self::check(&inner)?;
        Ok(Self::record_mut(&mut inner, id)?.description.clone())
    }

    fn set_description(&self, id: &str, description: &str) -> Result<IssueRef> {
        let mut inner = self.lock();
        inner.calls.description_writes += 1;
        Self::check(&inner)?;
        let record = Self::record_mut(&mut inner, id)?;
        record.description = description.to_string();
        Ok(record.to_issue_ref())
    }
}
