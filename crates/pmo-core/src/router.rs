//! Event router: one handler per event type, `ignored` for anything else.
//!
//! Handlers never propagate downstream failures; they come back as `error`
//! or `failed` outcomes. Missing credentials are the one exception.

use crate::config::Config;
use crate::error::Result;
use crate::event::{
    BranchCreated, ContentPublish, Deployment, Event, PhaseSignal, ResearchReport, SessionSummary,
    TradeReport,
};
use crate::io::clip;
use crate::lifecycle;
use crate::outcome::Outcome;
use crate::store::{IssueStore, RecordDraft};
use crate::templates;
use crate::types::{BusinessUnit, EventType, Platform};
use crate::upsert;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

/// Everything a handler needs besides the event.
pub struct HandlerContext<'a> {
    pub config: &'a Config,
    pub store: &'a dyn IssueStore,
    pub now: DateTime<Tz>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(config: &'a Config, store: &'a dyn IssueStore) -> Self {
        Self {
            config,
            store,
            now: Utc::now().with_timezone(&config.tz()),
        }
    }

    /// Pin the clock.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now.with_timezone(&self.config.tz());
        self
    }
}

static ISSUE_KEY: OnceLock<Regex> = OnceLock::new();

/// Short identifier (`P-15`, `C-3`) embedded in a branch name.
pub fn issue_key_in(text: &str) -> Option<&str> {
    let re = ISSUE_KEY.get_or_init(|| Regex::new(r"[PC]-\d+").expect("valid regex"));
    re.find(text).map(|m| m.as_str())
}

pub fn handle_event(event: &Event, ctx: &HandlerContext<'_>) -> Result<Outcome> {
    let Some((event_type, pinned_platform)) = EventType::parse(&event.event_type) else {
        tracing::debug!(event_type = %event.event_type, "ignoring unknown event type");
        return Ok(Outcome::ignored(format!(
            "Unknown event type: {}",
            event.event_type
        )));
    };

    let result = match event_type {
        EventType::LifecyclePhaseEvent => with_payload(event, |signal: PhaseSignal| {
            lifecycle::handle_phase(ctx, &event.session_id, &signal)
        }),
        EventType::WorkspaceBranchCreated => {
            with_payload(event, |branch: BranchCreated| handle_branch(ctx, branch))
        }
        EventType::DeploymentEvent => with_payload(event, |deployment: Deployment| {
            let fallback = if event.event_type == "deploy_testflight" {
                "TestFlight"
            } else {
                "Vercel"
            };
            handle_deployment(ctx, &event.session_id, deployment, fallback)
        }),
        EventType::ContentPublishEvent => with_payload(event, |publish: ContentPublish| {
            handle_publish(ctx, &event.session_id, pinned_platform, publish)
        }),
        EventType::TradeExecuted => {
            with_payload(event, |trade: TradeReport| handle_trade(ctx, &event.session_id, trade))
        }
        EventType::ResearchCompleted => with_payload(event, |research: ResearchReport| {
            handle_research(ctx, &event.session_id, research)
        }),
        EventType::SessionEnded => with_payload(event, |summary: SessionSummary| {
            Ok(handle_session_end(ctx, &event.session_id, summary))
        }),
    };
    upsert::settle(result)
}

/// Local checks that hold whichever sink records the event. `Some` means the
/// event stops here with that outcome.
pub fn precheck(event: &Event, config: &Config) -> Option<Outcome> {
    match EventType::parse(&event.event_type) {
        Some((EventType::SessionEnded, _)) => {
            let summary: SessionSummary = event.payload().ok()?;
            short_summary(&summary, config)
        }
        _ => None,
    }
}

fn short_summary(summary: &SessionSummary, config: &Config) -> Option<Outcome> {
    (summary.summary.chars().count() < config.session.min_summary_chars)
        .then(|| Outcome::skipped("Summary too short"))
}

fn with_payload<T, F>(event: &Event, handler: F) -> Result<Outcome>
where
    T: DeserializeOwned + Default,
    F: FnOnce(T) -> Result<Outcome>,
{
    match event.payload::<T>() {
        Ok(payload) => handler(payload),
        Err(e) => Ok(Outcome::error(format!(
            "invalid {} payload: {e}",
            event.event_type
        ))),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn handle_branch(ctx: &HandlerContext<'_>, branch: BranchCreated) -> Result<Outcome> {
    let key = branch
        .issue_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| issue_key_in(&branch.branch).map(str::to_string));

    let Some(issue_key) = key else {
        return Ok(Outcome::NewBranch {
            branch: branch.branch,
            project: branch.project,
        });
    };

    Ok(match ctx.store.find_by_identifier(&issue_key)? {
        Some(record) => Outcome::Found {
            issue_key,
            issue: record.to_issue_ref(),
        },
        None => Outcome::NotFound { issue_key },
    })
}

fn handle_deployment(
    ctx: &HandlerContext<'_>,
    session_id: &str,
    deployment: Deployment,
    fallback_platform: &str,
) -> Result<Outcome> {
    let team_id = ctx.config.team_id(BusinessUnit::Product)?;
    let platform = deployment
        .platform
        .clone()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| fallback_platform.to_string());
    let project_id = deployment
        .cwd
        .as_deref()
        .and_then(|cwd| ctx.config.classify_project(BusinessUnit::Product, cwd))
        .and_then(|p| p.id.clone());

    let draft = RecordDraft {
        team_id: team_id.to_string(),
        title: templates::deployment_title(&ctx.now, &platform),
        description: templates::deployment_description(&ctx.now, session_id, &platform, &deployment),
        project_id,
        ..Default::default()
    };
    upsert::create(ctx.store, &draft)
}

fn handle_publish(
    ctx: &HandlerContext<'_>,
    session_id: &str,
    pinned: Option<Platform>,
    publish: ContentPublish,
) -> Result<Outcome> {
    let Some(platform) = pinned.or(publish.platform) else {
        return Ok(Outcome::error("content publish event without a platform"));
    };
    let team_id = ctx.config.team_id(BusinessUnit::Content)?;

    let label_ids = match ctx.config.label_id("publish") {
        Ok(id) => vec![id.to_string()],
        Err(e) => {
            tracing::warn!(error = %e, "creating publish record without label");
            Vec::new()
        }
    };

    let tags = publish.tags.join(" ");
    let haystack = [
        publish.title.as_deref().unwrap_or_default(),
        tags.as_str(),
        publish.content.as_deref().unwrap_or_default(),
    ]
    .join(" ");
    let project_id = ctx
        .config
        .classify_project(BusinessUnit::Content, &haystack)
        .and_then(|p| p.id.clone());

    let draft = RecordDraft {
        team_id: team_id.to_string(),
        title: templates::publish_title(&ctx.now, platform, &publish),
        description: templates::publish_description(&ctx.now, session_id, platform, &publish),
        label_ids,
        project_id,
        state_id: None,
    };
    upsert::create(ctx.store, &draft)
}

fn handle_trade(ctx: &HandlerContext<'_>, session_id: &str, trade: TradeReport) -> Result<Outcome> {
    let has_marker = ctx
        .config
        .trade_markers
        .iter()
        .any(|m| trade.output.contains(m.as_str()));
    if !has_marker {
        return Ok(Outcome::skipped("No trade marker in output"));
    }
    let team_id = ctx.config.team_id(BusinessUnit::Investment)?;
    let draft = RecordDraft {
        team_id: team_id.to_string(),
        title: templates::trade_title(&ctx.now),
        description: templates::trade_description(&ctx.now, session_id, &trade),
        ..Default::default()
    };
    upsert::create(ctx.store, &draft)
}

fn handle_research(
    ctx: &HandlerContext<'_>,
    session_id: &str,
    research: ResearchReport,
) -> Result<Outcome> {
    let team_id = ctx.config.team_id(BusinessUnit::Investment)?;
    let draft = RecordDraft {
        team_id: team_id.to_string(),
        title: templates::research_title(&ctx.now, &research),
        description: templates::research_description(&ctx.now, session_id, &research),
        ..Default::default()
    };
    upsert::create(ctx.store, &draft)
}

/// Threshold check only; the record itself is left to the agent.
fn handle_session_end(
    ctx: &HandlerContext<'_>,
    session_id: &str,
    summary: SessionSummary,
) -> Outcome {
    if let Some(skipped) = short_summary(&summary, ctx.config) {
        return skipped;
    }
    let limits = &ctx.config.session;
    let business_unit = match summary.cwd.as_deref().map(BusinessUnit::detect) {
        Some(BusinessUnit::Unknown) | None => BusinessUnit::Pmo,
        Some(unit) => unit,
    };
    Outcome::NeedsProcessing {
        business_unit,
        session_id: session_id.to_string(),
        summary: clip(&summary.summary, limits.marker_summary_chars).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, TrackedRecord};
    use crate::types::StateKey;
    use chrono::TimeZone;
    use serde_json::json;

    fn config() -> Config {
        let mut config = Config::default();
        config.teams.insert(BusinessUnit::Product, "team-p".into());
        config.teams.insert(BusinessUnit::Content, "team-c".into());
        config.teams.insert(BusinessUnit::Investment, "team-i".into());
        for key in StateKey::all() {
            config.states.insert(*key, format!("state-{key}"));
        }
        config.labels.insert("publish".into(), "label-publish".into());
        config
    }

    fn event(value: serde_json::Value) -> Event {
        serde_json::from_value(value).unwrap()
    }

    fn run(config: &Config, store: &MemoryStore, value: serde_json::Value) -> Outcome {
        let now = Utc.with_ymd_and_hms(2026, 3, 7, 1, 0, 0).unwrap();
        let ctx = HandlerContext::new(config, store).at(now);
        handle_event(&event(value), &ctx).unwrap()
    }

    #[test]
    fn unknown_type_is_ignored_without_io() {
        let store = MemoryStore::new();
        let outcome = run(&config(), &store, json!({"type": "code_change", "sessionId": "s"}));
        assert_eq!(
            outcome,
            Outcome::ignored("Unknown event type: code_change")
        );
        assert_eq!(store.calls().total(), 0);
    }

    #[test]
    fn short_session_summary_is_skipped_without_io() {
        let store = MemoryStore::new();
        let outcome = run(
            &config(),
            &store,
            json!({"type": "session_ended", "sessionId": "s", "data": {"summary": "too short"}}),
        );
        assert_eq!(outcome.tag(), "skipped");
        assert_eq!(store.calls().total(), 0);
    }

    #[test]
    fn long_session_summary_needs_processing() {
        let store = MemoryStore::new();
        let summary = "a".repeat(700);
        let outcome = run(
            &config(),
            &store,
            json!({"type": "session_end", "sessionId": "s7",
                   "data": {"summary": summary, "cwd": "/home/u/pac/content-bu/notes"}}),
        );
        match outcome {
            Outcome::NeedsProcessing {
                business_unit,
                session_id,
                summary,
            } => {
                assert_eq!(business_unit, BusinessUnit::Content);
                assert_eq!(session_id, "s7");
                assert_eq!(summary.len(), 500);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(store.calls().total(), 0);
    }

    #[test]
    fn deployments_never_correlate() {
        let store = MemoryStore::new();
        let config = config();
        for platform in ["Vercel", "Cloudflare"] {
            let outcome = run(
                &config,
                &store,
                json!({"type": "deployment_event", "sessionId": "s1",
                       "data": {"platform": platform, "output": "ok"}}),
            );
            assert_eq!(outcome.tag(), "created");
        }
        assert_eq!(store.records().len(), 2);
        assert_eq!(store.calls().searches, 0);
        assert!(store.records()[1].title.ends_with("Deploy: Cloudflare"));
    }

    #[test]
    fn testflight_alias_sets_platform() {
        let store = MemoryStore::new();
        run(&config(), &store, json!({"type": "deploy_testflight", "sessionId": "s1"}));
        assert!(store.records()[0].title.contains("TestFlight"));
    }

    #[test]
    fn publish_records_tags_and_label() {
        let store = MemoryStore::new();
        let outcome = run(
            &config(),
            &store,
            json!({"type": "bilibili_publish", "sessionId": "s1",
                   "data": {"title": "My Clip", "tags": ["a", "b"], "bvid": "BV123"}}),
        );
        assert_eq!(outcome.tag(), "created");
        let record = &store.records()[0];
        assert!(record.title.contains("My Clip"));
        assert!(record.description.contains("sessionId: s1"));
        assert!(record.description.contains("a, b"));
        assert_eq!(record.labels, vec!["label-publish".to_string()]);
    }

    #[test]
    fn publish_without_label_config_still_creates() {
        let mut config = config();
        config.labels.clear();
        let store = MemoryStore::new();
        let outcome = run(
            &config,
            &store,
            json!({"type": "content_publish_event", "sessionId": "s1",
                   "data": {"platform": "x", "content": "hello world"}}),
        );
        assert_eq!(outcome.tag(), "created");
        assert!(store.records()[0].labels.is_empty());
    }

    #[test]
    fn publish_picks_project_by_keyword() {
        let mut config = config();
        config.projects.insert(
            BusinessUnit::Content,
            vec![crate::config::ProjectRule {
                name: "Quotes".into(),
                id: Some("proj-quotes".into()),
                keywords: vec!["quote".into()],
            }],
        );
        let store = MemoryStore::new();
        run(
            &config,
            &store,
            json!({"type": "xhs_publish", "sessionId": "s1",
                   "data": {"title": "Daily Quote #3"}}),
        );
        assert_eq!(store.records()[0].project.as_deref(), Some("proj-quotes"));
    }

    #[test]
    fn trade_requires_marker() {
        let store = MemoryStore::new();
        let skipped = run(
            &config(),
            &store,
            json!({"type": "trade_executed", "sessionId": "s", "data": {"output": "quote only"}}),
        );
        assert_eq!(skipped.tag(), "skipped");
        let created = run(
            &config(),
            &store,
            json!({"type": "trade", "sessionId": "s", "data": {"output": "BUY 100 AAPL FILLED"}}),
        );
        assert_eq!(created.tag(), "created");
    }

    #[test]
    fn research_goes_to_investment_team() {
        let store = MemoryStore::new();
        run(
            &config(),
            &store,
            json!({"type": "research_completed", "sessionId": "s",
                   "data": {"topic": "Semiconductors", "output": "summary"}}),
        );
        let hits = store
            .search_by_description("team-i", "sessionId: s", 5)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].title.ends_with("Research: Semiconductors"));
    }

    #[test]
    fn branch_key_lookup() {
        let store = MemoryStore::new();
        store.insert(
            "team-p",
            TrackedRecord {
                id: "i15".into(),
                identifier: "P-15".into(),
                ..Default::default()
            },
        );
        let found = run(
            &config(),
            &store,
            json!({"type": "git_worktree", "sessionId": "s",
                   "data": {"branch": "feat/P-15-login"}}),
        );
        assert_eq!(found.tag(), "found");
        let missing = run(
            &config(),
            &store,
            json!({"type": "workspace_branch_created", "sessionId": "s",
                   "data": {"branch": "feat/C-99-x"}}),
        );
        assert_eq!(
            missing,
            Outcome::NotFound {
                issue_key: "C-99".into()
            }
        );
        let fresh = run(
            &config(),
            &store,
            json!({"type": "workspace_branch_created", "sessionId": "s",
                   "data": {"branch": "feat/login", "project": "viva"}}),
        );
        assert_eq!(fresh.tag(), "new_branch");
    }

    #[test]
    fn missing_team_is_error_outcome() {
        let store = MemoryStore::new();
        let outcome = run(
            &Config::default(),
            &store,
            json!({"type": "research_completed", "sessionId": "s", "data": {}}),
        );
        assert_eq!(outcome.tag(), "error");
        assert_eq!(store.calls().total(), 0);
    }

    #[test]
    fn store_failure_is_error_outcome() {
        let store = MemoryStore::new();
        store.fail_with("connection reset");
        let outcome = run(
            &config(),
            &store,
            json!({"type": "deployment_event", "sessionId": "s"}),
        );
        assert!(outcome.is_failure());
    }

    #[test]
    fn title_prefix_uses_configured_zone() {
        let store = MemoryStore::new();
        // 01:00 UTC is 09:00 in Asia/Shanghai.
        run(&config(), &store, json!({"type": "deployment_event", "sessionId": "s"}));
        assert!(store.records()[0].title.starts_with("[0307-09]"));
    }
}
