//! Sinks: where a classified event ends up.
//!
//! [`DirectSink`] routes the event through the in-process handlers against an
//! [`IssueStore`]. [`AgentSink`] hands it to the detached reasoning agent and
//! returns as soon as the process is spawned.

use crate::config::Config;
use crate::error::{PmoError, Result};
use crate::event::Event;
use crate::outcome::Outcome;
use crate::prompt;
use crate::router::{self, handle_event, HandlerContext};
use crate::store::IssueStore;
use chrono::Utc;
use pmo_agent::LaunchOptions;

pub trait IssueSink {
    fn record_event(&self, event: &Event) -> Result<Outcome>;
}

// ---------------------------------------------------------------------------
// DirectSink
// ---------------------------------------------------------------------------

pub struct DirectSink<'a> {
    config: &'a Config,
    store: &'a dyn IssueStore,
}

impl<'a> DirectSink<'a> {
    pub fn new(config: &'a Config, store: &'a dyn IssueStore) -> Self {
        Self { config, store }
    }
}

impl IssueSink for DirectSink<'_> {
    fn record_event(&self, event: &Event) -> Result<Outcome> {
        let ctx = HandlerContext::new(self.config, self.store);
        handle_event(event, &ctx)
    }
}

// ---------------------------------------------------------------------------
// AgentSink
// ---------------------------------------------------------------------------

pub struct AgentSink<'a> {
    config: &'a Config,
    options: LaunchOptions,
    dry_run: bool,
}

impl<'a> AgentSink<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            options: config.agent.launch_options(),
            dry_run: false,
        }
    }

    /// Render the prompt but do not spawn anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_options(mut self, options: LaunchOptions) -> Self {
        self.options = options;
        self
    }
}

impl IssueSink for AgentSink<'_> {
    fn record_event(&self, event: &Event) -> Result<Outcome> {
        if let Some(outcome) = router::precheck(event, self.config) {
            tracing::debug!(event_type = %event.event_type, "agent not launched");
            return Ok(outcome);
        }

        let now = Utc::now().with_timezone(&self.config.tz());
        let prompt = prompt::render(event, self.config, &now);

        if self.dry_run {
            return Ok(Outcome::Skipped {
                reason: "dry run".to_string(),
                prompt: Some(prompt),
            });
        }

        match pmo_agent::launch_detached(&prompt, &self.options) {
            Ok(launched) => Ok(Outcome::AgentSpawned {
                event_type: event.event_type.clone(),
                business_unit: event.business_unit,
                session_id: event.session_id.clone(),
                pid: launched.pid,
            }),
            Err(e) => {
                tracing::warn!(error = %e, event_type = %event.event_type, "agent launch failed");
                Ok(Outcome::error(PmoError::AgentLaunch(e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::detect;
    use crate::event::{Deployment, SessionSummary};
    use crate::hook::HookInput;
    use crate::store::MemoryStore;
    use crate::types::{BusinessUnit, EventType};

    fn deployment() -> Event {
        Event::new(
            EventType::DeploymentEvent,
            BusinessUnit::Product,
            "s1",
            &Deployment {
                platform: Some("Vercel".into()),
                output: "Production: https://app.vercel.app".into(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn direct_sink_creates_record() {
        let mut config = Config::default();
        config.teams.insert(BusinessUnit::Product, "team-p".into());
        let store = MemoryStore::new();
        let outcome = DirectSink::new(&config, &store)
            .record_event(&deployment())
            .unwrap();
        assert_eq!(outcome.tag(), "created");
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn direct_sink_reports_missing_team() {
        let store = MemoryStore::new();
        let outcome = DirectSink::new(&Config::default(), &store)
            .record_event(&deployment())
            .unwrap();
        assert_eq!(outcome.tag(), "error");
        assert_eq!(store.calls().total(), 0);
    }

    #[test]
    fn dry_run_returns_prompt() {
        let config = Config::default();
        let outcome = AgentSink::new(&config)
            .dry_run(true)
            .record_event(&deployment())
            .unwrap();
        match outcome {
            Outcome::Skipped { reason, prompt } => {
                assert_eq!(reason, "dry run");
                assert!(prompt.unwrap().contains("sessionId: s1"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_agent_binary_is_error_outcome() {
        let config = Config::default();
        let options = LaunchOptions {
            executable: "definitely-not-an-agent-binary-xyz".into(),
            ..Default::default()
        };
        let outcome = AgentSink::new(&config)
            .with_options(options)
            .record_event(&deployment())
            .unwrap();
        assert_eq!(outcome.tag(), "error");
    }

    fn unlaunchable() -> LaunchOptions {
        LaunchOptions {
            executable: "definitely-not-an-agent-binary-xyz".into(),
            ..Default::default()
        }
    }

    #[test]
    fn short_session_summary_never_reaches_agent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("session.jsonl");
        let line = r#"{"type":"user","message":{"content":"hi"}}"#;
        std::fs::write(&path, vec![line; 10].join("\n")).unwrap();
        let payload: HookInput = serde_json::from_value(serde_json::json!({
            "hook_event_name": "SessionEnd",
            "session_id": "s-short",
            "transcript_path": path.to_string_lossy(),
        }))
        .unwrap();

        let config = Config::default();
        let detection = detect(&payload, &config, None).unwrap();
        let summary: SessionSummary = detection.event.payload().unwrap();
        assert!(summary.summary.chars().count() < config.session.min_summary_chars);

        // A launch attempt would come back as an error outcome.
        for dry_run in [false, true] {
            let outcome = AgentSink::new(&config)
                .with_options(unlaunchable())
                .dry_run(dry_run)
                .record_event(&detection.event)
                .unwrap();
            assert_eq!(outcome, Outcome::skipped("Summary too short"));
        }
    }

    #[test]
    fn long_session_summary_goes_to_agent() {
        let config = Config::default();
        let event = Event::new(
            EventType::SessionEnded,
            BusinessUnit::Pmo,
            "s-long",
            &SessionSummary {
                summary: "User: refactor the importer\n\n".repeat(10),
                ..Default::default()
            },
        );
        let outcome = AgentSink::new(&config)
            .with_options(unlaunchable())
            .record_event(&event)
            .unwrap();
        assert_eq!(outcome.tag(), "error");
    }

    #[cfg(unix)]
    #[test]
    fn spawned_agent_reports_pid() {
        let config = Config::default();
        let options = LaunchOptions {
            executable: "true".into(),
            skip_permissions: false,
            ..Default::default()
        };
        let outcome = AgentSink::new(&config)
            .with_options(options)
            .record_event(&deployment())
            .unwrap();
        match outcome {
            Outcome::AgentSpawned {
                event_type,
                business_unit,
                pid,
                ..
            } => {
                assert_eq!(event_type, "deployment_event");
                assert_eq!(business_unit, BusinessUnit::Product);
                assert!(pid > 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
