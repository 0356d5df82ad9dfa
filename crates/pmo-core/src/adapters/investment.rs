use super::Adapter;
use crate::config::{Config, SinkKind};
use crate::event::{Event, ResearchReport, TradeReport};
use crate::hook::{HookInput, TriggerKind};
use crate::io::clip;
use crate::types::{BusinessUnit, EventType};

const OUTPUT_CHARS: usize = 500;
const TOPIC_CHARS: usize = 100;

pub(super) fn trade() -> Adapter {
    Adapter {
        name: "trade",
        trigger: TriggerKind::SubTask,
        markers: &["futu"],
        sink: SinkKind::Direct,
        extract: extract_trade,
    }
}

/// Quotes and position queries share the skill; only fills are tracked.
fn extract_trade(input: &HookInput, config: &Config) -> Option<Event> {
    let output = input.output_text();
    if !config.trade_markers.iter().any(|m| output.contains(m.as_str())) {
        tracing::debug!("trading sub-task without a fill");
        return None;
    }
    Some(Event::new(
        EventType::TradeExecuted,
        BusinessUnit::Investment,
        input.session_id(),
        &TradeReport {
            output: clip(&output, OUTPUT_CHARS).to_string(),
        },
    ))
}

pub(super) fn research() -> Adapter {
    Adapter {
        name: "research",
        trigger: TriggerKind::SubTask,
        markers: &["research"],
        sink: SinkKind::Direct,
        extract: extract_research,
    }
}

fn extract_research(input: &HookInput, _config: &Config) -> Option<Event> {
    if BusinessUnit::detect(input.cwd()) != BusinessUnit::Investment {
        return None;
    }
    let args = input.args();
    let topic = args.trim();
    let output = input.output_text();
    Some(Event::new(
        EventType::ResearchCompleted,
        BusinessUnit::Investment,
        input.session_id(),
        &ResearchReport {
            topic: (!topic.is_empty()).then(|| clip(topic, TOPIC_CHARS).to_string()),
            output: clip(&output, OUTPUT_CHARS).to_string(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::detect;
    use serde_json::json;

    fn input(value: serde_json::Value) -> HookInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn trade_needs_fill_marker() {
        let quote = input(json!({
            "tool_name": "Skill",
            "tool_input": {"skill": "futu-trade", "args": "quote HK.00700"},
            "tool_response": "HK.00700 last 388.2",
            "cwd": "/pac/investment-bu"
        }));
        assert!(detect(&quote, &Config::default(), None).is_none());

        let fill = input(json!({
            "tool_name": "Skill",
            "tool_input": {"skill": "futu-trade", "args": "buy HK.00700 100"},
            "tool_response": "订单已成交: 买入 HK.00700 100 股",
            "session_id": "s1",
            "cwd": "/pac/investment-bu"
        }));
        let detection = detect(&fill, &Config::default(), None).unwrap();
        assert_eq!(detection.adapter, "trade");
        assert_eq!(detection.event.business_unit, BusinessUnit::Investment);
        let report: TradeReport = detection.event.payload().unwrap();
        assert!(report.output.contains("买入"));
    }

    #[test]
    fn research_only_inside_investment_unit() {
        let payload = |cwd: &str| {
            input(json!({
                "tool_name": "Skill",
                "tool_input": {"skill": "deep-research", "args": "EV battery supply chain"},
                "tool_response": "Report written to notes/ev.md",
                "session_id": "s2",
                "cwd": cwd
            }))
        };
        assert!(detect(&payload("/pac/product-bu/app"), &Config::default(), None).is_none());

        let detection = detect(&payload("/pac/investment-bu/notes"), &Config::default(), None).unwrap();
        assert_eq!(detection.adapter, "research");
        let report: ResearchReport = detection.event.payload().unwrap();
        assert_eq!(report.topic.as_deref(), Some("EV battery supply chain"));
    }

    #[test]
    fn research_topic_is_clipped() {
        let payload = input(json!({
            "tool_name": "Skill",
            "tool_input": {"skill": "research", "args": "t".repeat(150)},
            "cwd": "/pac/investment-bu"
        }));
        let event = extract_research(&payload, &Config::default()).unwrap();
        let report: ResearchReport = event.payload().unwrap();
        assert_eq!(report.topic.unwrap().len(), TOPIC_CHARS);
    }
}
