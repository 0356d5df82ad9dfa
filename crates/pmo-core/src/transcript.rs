use crate::config::SessionConfig;
use crate::io::clip;
use serde_json::Value;
use std::path::Path;

/// Condense a JSONL session transcript into `User:`/`Assistant:` lines.
///
/// Returns `None` when the file is missing or has fewer lines than
/// `min_transcript_lines`. Only the last `tail_lines` entries are read;
/// unparseable lines are skipped.
pub fn extract_summary(path: &Path, limits: &SessionConfig) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let lines: Vec<&str> = content.trim().lines().collect();
    if lines.len() < limits.min_transcript_lines {
        tracing::debug!(lines = lines.len(), "transcript too short");
        return None;
    }

    let start = lines.len().saturating_sub(limits.tail_lines);
    let messages: Vec<String> = lines[start..]
        .iter()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter_map(|entry| message_line(&entry, limits.message_chars))
        .take(limits.max_messages)
        .collect();

    Some(messages.join("\n\n"))
}

fn message_line(entry: &Value, max_chars: usize) -> Option<String> {
    let content = entry.get("message")?.get("content")?;
    match entry.get("type")?.as_str()? {
        "user" => {
            let text = text_of(content)?;
            Some(format!("User: {}", clip(&text, max_chars)))
        }
        "assistant" => {
            let text = text_of(content)?;
            Some(format!("Assistant: {}", clip(&text, max_chars)))
        }
        _ => None,
    }
}

/// Plain string content, or the `text` blocks of a content array joined by
/// spaces.
fn text_of(content: &Value) -> Option<String> {
    let text = match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => return None,
    };
    (!text.trim().is_empty()).then_some(text)
}
