//! Product lifecycle phases applied to the session's correlated record.
//!
//! Phases only move forward by convention. A late or repeated signal is
//! applied as-is: nothing checks the record's current state first.

use crate::error::Result;
use crate::event::PhaseSignal;
use crate::outcome::Outcome;
use crate::router::HandlerContext;
use crate::store::RecordDraft;
use crate::templates;
use crate::types::{BusinessUnit, Phase, PhaseAction, StateKey};
use crate::upsert;
use regex::Regex;
use std::sync::OnceLock;

static PRODUCT_DIR: OnceLock<Regex> = OnceLock::new();

/// Project name for a new feature record: the directory under `product-bu/`,
/// else a product keyword match, else `product`.
pub fn project_from_cwd(ctx: &HandlerContext<'_>, cwd: Option<&str>) -> String {
    let Some(cwd) = cwd.filter(|c| !c.is_empty()) else {
        return "product".to_string();
    };
    let re = PRODUCT_DIR.get_or_init(|| Regex::new(r"product-bu/([^/]+)").expect("valid regex"));
    if let Some(dir) = re.captures(cwd).and_then(|c| c.get(1)) {
        return dir.as_str().to_string();
    }
    ctx.config
        .classify_project(BusinessUnit::Product, cwd)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "product".to_string())
}

pub fn handle_phase(
    ctx: &HandlerContext<'_>,
    session_id: &str,
    signal: &PhaseSignal,
) -> Result<Outcome> {
    let step = ctx.config.lifecycle_step(&signal.skill);
    let Some(action) = signal.action.or(step.map(|s| s.action)) else {
        return Ok(Outcome::ignored(format!(
            "Untracked skill: {}",
            signal.skill
        )));
    };
    let phase = signal.phase.or(step.map(|s| s.phase));
    let note = if signal.description.trim().is_empty() {
        step.map(|s| s.note.as_str()).unwrap_or(action.as_str())
    } else {
        signal.description.as_str()
    };

    let team_id = ctx.config.team_id(BusinessUnit::Product)?;
    let existing = upsert::find_correlated(
        ctx.store,
        team_id,
        session_id,
        ctx.config.remote.search_limit,
    )?;

    if action == PhaseAction::CreateOrUpdate {
        return match existing {
            Some(record) => {
                let section = templates::phase_section(&ctx.now, "Requirements", note);
                upsert::append(ctx.store, &record, &section, action.as_str())
            }
            None => create_feature(ctx, session_id, signal, phase, note),
        };
    }

    let Some(record) = existing else {
        tracing::debug!(session = %session_id, action = %action, "no correlated record");
        return Ok(Outcome::skipped(format!("No existing record for {action}")));
    };

    let text = match action {
        PhaseAction::AppendPlan => templates::phase_section(&ctx.now, "Implementation plan", note),
        _ => templates::timeline_line(&ctx.now, note),
    };

    match action.target_state() {
        Some(state) => {
            let state_id = ctx.config.state_id(state)?;
            upsert::transition(ctx.store, &record, state, state_id, &text, action.as_str())
        }
        None => upsert::append(ctx.store, &record, &text, action.as_str()),
    }
}

fn create_feature(
    ctx: &HandlerContext<'_>,
    session_id: &str,
    signal: &PhaseSignal,
    phase: Option<Phase>,
    note: &str,
) -> Result<Outcome> {
    let team_id = ctx.config.team_id(BusinessUnit::Product)?;
    let project = project_from_cwd(ctx, signal.cwd.as_deref());
    let project_id = signal
        .cwd
        .as_deref()
        .and_then(|cwd| ctx.config.classify_project(BusinessUnit::Product, cwd))
        .and_then(|p| p.id.clone());
    // The backlog state is optional on create; the tracker's default applies.
    let state_id = ctx.config.state_id(StateKey::Backlog).ok().map(str::to_string);

    let draft = RecordDraft {
        team_id: team_id.to_string(),
        title: templates::feature_title(&ctx.now, &project),
        description: templates::feature_description(
            &ctx.now,
            session_id,
            phase.unwrap_or(Phase::Requirements),
            "",
            note,
        ),
        label_ids: Vec::new(),
        project_id,
        state_id,
    };
    upsert::create(ctx.store, &draft)
}
