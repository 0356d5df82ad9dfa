//! Hook payload → [`Event`] classification.
//!
//! Each adapter is a fn-pointer row: a trigger kind, descriptor markers, a
//! default sink and an extraction function. [`detect`] walks the table in
//! order and the first adapter that both passes the common filter and
//! extracts an event wins. Everything else is a silent rejection.

mod content;
mod investment;
mod product;
mod session;

use crate::config::{Config, SinkKind};
use crate::event::Event;
use crate::hook::{HookInput, TriggerKind};

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

pub struct Adapter {
    pub name: &'static str,
    pub trigger: TriggerKind,
    /// Substrings of the descriptor (command line or skill name). Empty
    /// accepts any descriptor.
    pub markers: &'static [&'static str],
    pub sink: SinkKind,
    pub extract: fn(&HookInput, &Config) -> Option<Event>,
}

impl Adapter {
    /// Trigger, marker and failure-marker checks shared by every adapter.
    pub fn accepts(&self, input: &HookInput, config: &Config) -> bool {
        if !config.adapter_enabled(self.name) {
            return false;
        }
        if input.trigger() != self.trigger {
            return false;
        }

        let descriptor = input.descriptor();
        let marker_hit = match config.adapter_markers(self.name) {
            Some(markers) => markers.is_empty() || markers.iter().any(|m| descriptor.contains(m.as_str())),
            None => self.markers.is_empty() || self.markers.iter().any(|m| descriptor.contains(*m)),
        };
        if !marker_hit {
            return false;
        }

        let output = input.output_text();
        if let Some(marker) = config
            .failure_markers
            .iter()
            .find(|m| output.contains(m.as_str()))
        {
            tracing::debug!(adapter = self.name, marker = %marker, "output carries a failure marker");
            return false;
        }
        true
    }

    pub fn sink(&self, config: &Config) -> SinkKind {
        config.adapter_sink(self.name, self.sink)
    }
}

/// A classified hook payload and where it should go.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub adapter: &'static str,
    pub sink: SinkKind,
    pub event: Event,
}

// ---------------------------------------------------------------------------
// Registry (priority-ordered)
// ---------------------------------------------------------------------------

pub fn registry() -> Vec<Adapter> {
    vec![
        content::bilibili(),
        content::xiaohongshu(),
        content::x(),
        product::web_deploy(),
        product::testflight(),
        product::git_worktree(),
        investment::trade(),
        investment::research(),
        product::lifecycle(),
        session::session_end(),
    ]
}

pub fn find(name: &str) -> Option<Adapter> {
    registry().into_iter().find(|a| a.name == name)
}

pub fn names() -> Vec<&'static str> {
    registry().iter().map(|a| a.name).collect()
}

/// Classify `input`. With `only`, just that adapter is consulted.
pub fn detect(input: &HookInput, config: &Config, only: Option<&str>) -> Option<Detection> {
    let adapters: Vec<Adapter> = match only {
        Some(name) => find(name).into_iter().collect(),
        None => registry(),
    };
    adapters.into_iter().find_map(|adapter| {
        if !adapter.accepts(input, config) {
            return None;
        }
        let event = (adapter.extract)(input, config)?;
        tracing::debug!(adapter = adapter.name, event_type = %event.event_type, "hook payload classified");
        Some(Detection {
            adapter: adapter.name,
            sink: adapter.sink(config),
            event,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterOverride;
    use serde_json::json;

    fn input(value: serde_json::Value) -> HookInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn names_are_unique() {
        let mut names = names();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn every_adapter_rejects_wrong_trigger() {
        let config = Config::default();
        let payload = input(json!({
            "triggerKind": "other",
            "rawInput": {"command": "biliup upload --title \"x\"", "skill": "superpowers:brainstorming"},
            "rawOutput": "OK",
            "sessionId": "s1",
            "workingDirectory": "/pac/product-bu/app"
        }));
        for adapter in registry() {
            assert!(!adapter.accepts(&payload, &config), "{} accepted", adapter.name);
        }
        assert!(detect(&payload, &config, None).is_none());
    }

    #[test]
    fn failure_marker_suppresses_detection() {
        let config = Config::default();
        let payload = input(json!({
            "triggerKind": "shell_exec",
            "rawInput": {"command": "biliup upload --title \"My Clip\""},
            "rawOutput": "上传失败",
            "sessionId": "s1"
        }));
        assert!(detect(&payload, &config, None).is_none());
    }

    /// One payload per adapter that is detected while its output is clean.
    fn accepted_payloads(transcript: &str) -> Vec<(&'static str, serde_json::Value)> {
        vec![
            ("bilibili", json!({"triggerKind": "shell_exec",
                "rawInput": {"command": "biliup upload --title \"Clip\""}, "rawOutput": "OK BV1"})),
            ("xiaohongshu", json!({"triggerKind": "sub_task",
                "rawInput": {"skill": "xiaohongshu", "args": "标题: Spring"}, "rawOutput": "published"})),
            ("x", json!({"triggerKind": "sub_task",
                "rawInput": {"skill": "x-post", "args": "hello"}, "rawOutput": "posted"})),
            ("web-deploy", json!({"triggerKind": "sub_task",
                "rawInput": {"skill": "deploy-static"}, "rawOutput": "deployed"})),
            ("testflight", json!({"triggerKind": "shell_exec",
                "rawInput": {"command": "eas submit -p ios"}, "rawOutput": "Submitted"})),
            ("git-worktree", json!({"triggerKind": "shell_exec",
                "rawInput": {"command": "git worktree add ../wt -b feat/login"}, "rawOutput": "Preparing"})),
            ("trade", json!({"triggerKind": "sub_task",
                "rawInput": {"skill": "futu"}, "rawOutput": "BUY 100 FILLED"})),
            ("research", json!({"triggerKind": "sub_task",
                "rawInput": {"skill": "research", "args": "chips"}, "rawOutput": "report ready",
                "workingDirectory": "/pac/investment-bu/notes"})),
            ("lifecycle", json!({"triggerKind": "sub_task",
                "rawInput": {"skill": "superpowers:brainstorming"}, "rawOutput": "ok",
                "workingDirectory": "/pac/product-bu/app"})),
            ("session-end", json!({"hook_event_name": "SessionEnd",
                "transcript_path": transcript, "rawOutput": "bye"})),
        ]
    }

    #[test]
    fn every_adapter_honours_failure_markers() {
        let dir = tempfile::TempDir::new().unwrap();
        let transcript = dir.path().join("session.jsonl");
        let turn = r#"{"type":"user","message":{"content":"rework the nightly importer job"}}"#;
        std::fs::write(&transcript, vec![turn; 12].join("\n")).unwrap();

        let config = Config::default();
        let payloads = accepted_payloads(&transcript.to_string_lossy());
        assert_eq!(payloads.len(), registry().len());

        for (name, payload) in payloads {
            assert!(
                detect(&input(payload.clone()), &config, Some(name)).is_some(),
                "{name} should accept its clean payload"
            );
            for marker in ["error", "Error", "失败"] {
                let mut failed = payload.clone();
                let clean = failed["rawOutput"].as_str().unwrap().to_string();
                failed["rawOutput"] = json!(format!("{clean} {marker}"));
                assert!(
                    detect(&input(failed), &config, Some(name)).is_none(),
                    "{name} accepted output with {marker:?}"
                );
            }
        }
    }

    #[test]
    fn first_match_wins_and_carries_sink() {
        let config = Config::default();
        let payload = input(json!({
            "triggerKind": "shell_exec",
            "rawInput": {"command": "biliup upload --title \"My Clip\" --tag \"a,b\""},
            "rawOutput": "OK BV123",
            "sessionId": "s1"
        }));
        let detection = detect(&payload, &config, None).unwrap();
        assert_eq!(detection.adapter, "bilibili");
        assert_eq!(detection.sink, SinkKind::Agent);
        assert_eq!(detection.event.event_type, "content_publish_event");
    }

    #[test]
    fn only_restricts_to_named_adapter() {
        let config = Config::default();
        let payload = input(json!({
            "triggerKind": "shell_exec",
            "rawInput": {"command": "biliup upload --title \"My Clip\""},
            "rawOutput": "OK"
        }));
        assert!(detect(&payload, &config, Some("git-worktree")).is_none());
        assert!(detect(&payload, &config, Some("bilibili")).is_some());
        assert!(detect(&payload, &config, Some("no-such-adapter")).is_none());
    }

    #[test]
    fn config_overrides_apply() {
        let mut config = Config::default();
        config.adapters.insert(
            "bilibili".into(),
            AdapterOverride {
                enabled: true,
                sink: Some(SinkKind::Direct),
                markers: Some(vec!["my-uploader".into()]),
            },
        );
        let payload = input(json!({
            "triggerKind": "shell_exec",
            "rawInput": {"command": "my-uploader --title \"Clip\""},
            "rawOutput": "done"
        }));
        let detection = detect(&payload, &config, None).unwrap();
        assert_eq!(detection.adapter, "bilibili");
        assert_eq!(detection.sink, SinkKind::Direct);

        config.adapters.get_mut("bilibili").unwrap().enabled = false;
        assert!(detect(&payload, &config, None).is_none());
    }
}
