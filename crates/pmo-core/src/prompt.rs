use crate::config::Config;
use crate::event::Event;
use crate::templates::{correlation_marker, title_prefix};
use crate::types::{BusinessUnit, EventType};
use chrono::DateTime;
use chrono_tz::Tz;

/// Natural-language task handed to the delegated agent. The agent's own
/// rules files decide the record layout; this only frames the event.
pub fn render(event: &Event, config: &Config, now: &DateTime<Tz>) -> String {
    let event_json =
        serde_json::to_string_pretty(event).unwrap_or_else(|_| format!("{event:?}"));
    let kind = EventType::parse(&event.event_type).map(|(t, _)| t);

    let mut out = String::new();
    out.push_str(
        "You are the project management office agent. Record the event below in the \
         issue tracker following the rules in this directory.\n",
    );
    out.push_str(
        "The work it describes has already happened. Do not publish, deploy, trade or \
         re-run anything; only create or update tracking records.\n\n",
    );

    out.push_str(&format!("Session: {}\n", event.session_id));
    out.push_str(&format!("Business unit: {}\n", event.business_unit));
    out.push_str(&format!("Event type: {}\n\n", event.event_type));

    out.push_str("Event:\n```json\n");
    out.push_str(&event_json);
    out.push_str("\n```\n\n");

    out.push_str("Instructions:\n");
    match kind {
        Some(EventType::SessionEnded) => {
            out.push_str(
                "1. Read the session summary and decide whether it is worth a record.\n\
                 2. If it is, pick the owning business unit from the working directory.\n\
                 3. Create or update the record.\n\
                 4. Report what you did.\n",
            );
        }
        _ => {
            out.push_str(&format!(
                "- Title format: `{} <platform or category>: <title>` (at most 60 characters of title).\n",
                title_prefix(now)
            ));
            if let Some(team) = team_for(event.business_unit, config) {
                out.push_str(&format!("- Team id: {team}\n"));
            }
            if kind == Some(EventType::ContentPublishEvent) {
                if let Ok(label) = config.label_id("publish") {
                    out.push_str(&format!("- Apply the publish label: {label}\n"));
                }
            }
            out.push_str("- Leave a placeholder for the published link and an empty metrics table.\n");
        }
    }
    out.push_str(&format!(
        "- The description must contain the line `{}` so later events for this session find the record. \
         Search for it first and update the existing record instead of creating a duplicate.\n",
        correlation_marker(&event.session_id)
    ));
    out
}

fn team_for(unit: BusinessUnit, config: &Config) -> Option<&str> {
    config.team_id(unit).ok()
}
