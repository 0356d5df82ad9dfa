use super::Adapter;
use crate::config::{Config, SinkKind};
use crate::event::{BranchCreated, Deployment, Event, PhaseSignal};
use crate::hook::{HookInput, TriggerKind};
use crate::io::clip;
use crate::router::issue_key_in;
use crate::types::{BusinessUnit, EventType};
use regex::Regex;
use std::sync::OnceLock;

const DEPLOY_OUTPUT_CHARS: usize = 500;

static WORKTREE_ADD: OnceLock<Regex> = OnceLock::new();

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn deployment_event(input: &HookInput, platform: &str) -> Event {
    let output = input.output_text();
    Event::new(
        EventType::DeploymentEvent,
        BusinessUnit::Product,
        input.session_id(),
        &Deployment {
            platform: Some(platform.to_string()),
            cwd: non_empty(input.cwd()),
            output: clip(&output, DEPLOY_OUTPUT_CHARS).to_string(),
        },
    )
}

// ---------------------------------------------------------------------------
// Deployments
// ---------------------------------------------------------------------------

pub(super) fn web_deploy() -> Adapter {
    Adapter {
        name: "web-deploy",
        trigger: TriggerKind::SubTask,
        markers: &["deploy-static", "vercel"],
        sink: SinkKind::Direct,
        extract: extract_web_deploy,
    }
}

fn extract_web_deploy(input: &HookInput, _config: &Config) -> Option<Event> {
    let platform = if input.output_text().contains("cloudflare") {
        "Cloudflare"
    } else {
        "Vercel"
    };
    Some(deployment_event(input, platform))
}

pub(super) fn testflight() -> Adapter {
    Adapter {
        name: "testflight",
        trigger: TriggerKind::ShellExec,
        markers: &["eas submit", "xcrun altool", "fastlane pilot"],
        sink: SinkKind::Direct,
        extract: |input, _| Some(deployment_event(input, "TestFlight")),
    }
}

// ---------------------------------------------------------------------------
// Git worktree
// ---------------------------------------------------------------------------

pub(super) fn git_worktree() -> Adapter {
    Adapter {
        name: "git-worktree",
        trigger: TriggerKind::ShellExec,
        markers: &["git worktree"],
        sink: SinkKind::Direct,
        extract: extract_worktree,
    }
}

fn extract_worktree(input: &HookInput, _config: &Config) -> Option<Event> {
    let re = WORKTREE_ADD.get_or_init(|| {
        Regex::new(r"git worktree add\s+(\S+)\s+(?:-b\s+)?(\S+)").expect("valid regex")
    });
    let caps = re.captures(input.command())?;
    let path = caps.get(1)?.as_str();
    let branch = caps.get(2)?.as_str();

    Some(Event::new(
        EventType::WorkspaceBranchCreated,
        BusinessUnit::Product,
        input.session_id(),
        &BranchCreated {
            branch: branch.to_string(),
            worktree_path: Some(path.to_string()),
            issue_key: issue_key_in(branch).map(str::to_string),
            project: None,
            cwd: non_empty(input.cwd()),
        },
    ))
}

// ---------------------------------------------------------------------------
// Lifecycle skills
// ---------------------------------------------------------------------------

pub(super) fn lifecycle() -> Adapter {
    Adapter {
        name: "lifecycle",
        trigger: TriggerKind::SubTask,
        markers: &["superpowers:"],
        sink: SinkKind::Direct,
        extract: extract_phase,
    }
}

/// Only skills in the configured lifecycle table, and only inside the
/// product unit.
fn extract_phase(input: &HookInput, config: &Config) -> Option<Event> {
    let skill = input.skill();
    let step = config.lifecycle_step(skill)?;
    let unit = BusinessUnit::detect(input.cwd());
    if unit != BusinessUnit::Product {
        tracing::debug!(skill, unit = %unit, "lifecycle skill outside the product unit");
        return None;
    }

    Some(Event::new(
        EventType::LifecyclePhaseEvent,
        BusinessUnit::Product,
        input.session_id(),
        &PhaseSignal {
            skill: skill.to_string(),
            phase: Some(step.phase),
            action: Some(step.action),
            description: step.note.clone(),
            cwd: non_empty(input.cwd()),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::detect;
    use crate::types::{Phase, PhaseAction};
    use serde_json::json;

    fn input(value: serde_json::Value) -> HookInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn web_deploy_picks_platform_from_output() {
        let cloudflare = input(json!({
            "tool_name": "Skill",
            "tool_input": {"skill": "api-deploy-static"},
            "tool_response": "Deployed to https://site.pages.dev via cloudflare",
            "session_id": "s1",
            "cwd": "/pac/product-bu/site"
        }));
        let detection = detect(&cloudflare, &Config::default(), None).unwrap();
        assert_eq!(detection.adapter, "web-deploy");
        let data: Deployment = detection.event.payload().unwrap();
        assert_eq!(data.platform.as_deref(), Some("Cloudflare"));
        assert_eq!(data.cwd.as_deref(), Some("/pac/product-bu/site"));

        let vercel = input(json!({
            "tool_name": "Skill",
            "tool_input": {"skill": "vercel"},
            "tool_response": "Production: https://site.vercel.app"
        }));
        let data: Deployment = detect(&vercel, &Config::default(), None)
            .unwrap()
            .event
            .payload()
            .unwrap();
        assert_eq!(data.platform.as_deref(), Some("Vercel"));
    }

    #[test]
    fn testflight_submission() {
        let payload = input(json!({
            "tool_name": "Bash",
            "tool_input": {"command": "eas submit -p ios --latest"},
            "tool_response": "Submitted to App Store Connect"
        }));
        let detection = detect(&payload, &Config::default(), None).unwrap();
        assert_eq!(detection.adapter, "testflight");
        let data: Deployment = detection.event.payload().unwrap();
        assert_eq!(data.platform.as_deref(), Some("TestFlight"));
    }

    #[test]
    fn worktree_add_with_issue_key() {
        let payload = input(json!({
            "tool_name": "Bash",
            "tool_input": {"command": "git worktree add ../wt-login -b feat/P-15-login"},
            "tool_response": "Preparing worktree (new branch 'feat/P-15-login')",
            "session_id": "s2"
        }));
        let detection = detect(&payload, &Config::default(), None).unwrap();
        assert_eq!(detection.event.event_type, "workspace_branch_created");
        let data: BranchCreated = detection.event.payload().unwrap();
        assert_eq!(data.branch, "feat/P-15-login");
        assert_eq!(data.worktree_path.as_deref(), Some("../wt-login"));
        assert_eq!(data.issue_key.as_deref(), Some("P-15"));
    }

    #[test]
    fn worktree_list_is_rejected() {
        let payload = input(json!({
            "tool_name": "Bash",
            "tool_input": {"command": "git worktree list"},
            "tool_response": ""
        }));
        assert!(detect(&payload, &Config::default(), None).is_none());
    }

    #[test]
    fn lifecycle_skill_in_product_unit() {
        let payload = input(json!({
            "tool_name": "Skill",
            "tool_input": {"skill": "superpowers:requesting-code-review"},
            "session_id": "s3",
            "cwd": "/pac/product-bu/viva-app"
        }));
        let detection = detect(&payload, &Config::default(), None).unwrap();
        assert_eq!(detection.adapter, "lifecycle");
        let signal: PhaseSignal = detection.event.payload().unwrap();
        assert_eq!(signal.phase, Some(Phase::Review));
        assert_eq!(signal.action, Some(PhaseAction::SetInReview));
        assert_eq!(signal.description, "Code review requested");
    }

    #[test]
    fn lifecycle_skill_elsewhere_is_rejected() {
        let content = input(json!({
            "tool_name": "Skill",
            "tool_input": {"skill": "superpowers:brainstorming"},
            "cwd": "/pac/content-bu/notes"
        }));
        assert!(detect(&content, &Config::default(), None).is_none());

        let untracked = input(json!({
            "tool_name": "Skill",
            "tool_input": {"skill": "superpowers:dispatching-agents"},
            "cwd": "/pac/product-bu/app"
        }));
        assert!(detect(&untracked, &Config::default(), None).is_none());
    }
}
