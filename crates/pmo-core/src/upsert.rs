use crate::error::{PmoError, Result};
use crate::outcome::Outcome;
use crate::store::{IssueStore, RecordDraft, TrackedRecord};
use crate::templates::{carries_marker, correlation_marker};
use crate::types::StateKey;

/// First record of `team_id` whose description carries the session's
/// correlation marker.
pub fn find_correlated(
    store: &dyn IssueStore,
    team_id: &str,
    session_id: &str,
    limit: u32,
) -> Result<Option<TrackedRecord>> {
    let candidates = store.search_by_description(team_id, &correlation_marker(session_id), limit)?;
    tracing::debug!(
        session = %session_id,
        candidates = candidates.len(),
        "correlation search"
    );
    Ok(candidates
        .into_iter()
        .find(|record| carries_marker(&record.description, session_id)))
}

pub fn create(store: &dyn IssueStore, draft: &RecordDraft) -> Result<Outcome> {
    let issue = store.create(draft)?;
    tracing::info!(identifier = %issue.identifier, title = %draft.title, "record created");
    Ok(Outcome::Created { issue })
}

pub fn append(
    store: &dyn IssueStore,
    record: &TrackedRecord,
    text: &str,
    action: &str,
) -> Result<Outcome> {
    let issue = store.append_description(&record.id, text)?;
    tracing::info!(identifier = %record.identifier, action, "record updated");
    Ok(Outcome::Updated {
        issue,
        action: action.to_string(),
        state: None,
    })
}

/// Move the record to `state` and append `text`. The two mutations are
/// independent; a failed append after a successful transition is reported
/// as the error.
pub fn transition(
    store: &dyn IssueStore,
    record: &TrackedRecord,
    state: StateKey,
    state_id: &str,
    text: &str,
    action: &str,
) -> Result<Outcome> {
    store.update_state(&record.id, state_id)?;
    let issue = store.append_description(&record.id, text)?;
    tracing::info!(identifier = %record.identifier, state = %state, action, "record moved");
    Ok(Outcome::Updated {
        issue,
        action: action.to_string(),
        state: Some(state.label().to_string()),
    })
}

/// Fold a handler result into an outcome. Only fatal errors stay `Err`;
/// rejected mutations become `failed`, everything else `error`.
pub fn settle(result: Result<Outcome>) -> Result<Outcome> {
    match result {
        Ok(outcome) => Ok(outcome),
        Err(e) if e.is_fatal() => Err(e),
        Err(e @ (PmoError::MutationRejected(_) | PmoError::Graphql(_))) => {
            tracing::warn!(error = %e, "remote rejected the request");
            Ok(Outcome::Failed {
                error: e.to_string(),
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "event handling failed");
            Ok(Outcome::error(e))
        }
    }
}
