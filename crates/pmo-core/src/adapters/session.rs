use super::Adapter;
use crate::config::{Config, SinkKind};
use crate::event::{Event, SessionSummary};
use crate::hook::{HookInput, TriggerKind};
use crate::io::clip;
use crate::transcript::extract_summary;
use crate::types::{BusinessUnit, EventType};
use std::path::Path;

pub(super) fn session_end() -> Adapter {
    Adapter {
        name: "session-end",
        trigger: TriggerKind::SessionEnd,
        markers: &[],
        sink: SinkKind::Agent,
        extract: extract_session,
    }
}

fn extract_session(input: &HookInput, config: &Config) -> Option<Event> {
    let transcript = input.transcript_path.as_deref().filter(|p| !p.is_empty())?;
    let Some(summary) = extract_summary(Path::new(transcript), &config.session) else {
        tracing::debug!(transcript, "no usable transcript");
        return None;
    };
    let cwd = input.cwd();

    Some(Event::new(
        EventType::SessionEnded,
        BusinessUnit::detect(cwd),
        input.session_id(),
        &SessionSummary {
            summary: clip(&summary, config.session.summary_chars).to_string(),
            cwd: (!cwd.is_empty()).then(|| cwd.to_string()),
            transcript_path: Some(transcript.to_string()),
            reason: input.reason.clone(),
        },
    ))
}
