//! Record titles and description bodies.
//!
//! Every description starts with the correlation marker line so a later
//! search for the session finds it. All functions take the current time
//! explicitly, already converted to the configured zone.

use crate::event::{ContentPublish, Deployment, ResearchReport, TradeReport};
use crate::io::clip;
use crate::types::{Phase, Platform};
use chrono::DateTime;
use chrono_tz::Tz;

pub const TITLE_CHARS: usize = 60;
pub const X_TITLE_CHARS: usize = 30;
const PREVIEW_CHARS: usize = 100;
const PENDING_LINK: &str = "Pending backfill";
const NONE: &str = "(none)";

/// `sessionId: <value>`, embedded verbatim in every description.
pub fn correlation_marker(session_id: &str) -> String {
    format!("sessionId: {session_id}")
}

/// Whether `description` carries the marker as a line of its own. The
/// remote search is a plain substring match, so `s1` also hits `s10`.
pub fn carries_marker(description: &str, session_id: &str) -> bool {
    let marker = correlation_marker(session_id);
    description
        .lines()
        .any(|line| line.trim().trim_matches('`') == marker)
}

/// `[MMDD-HH]`
pub fn title_prefix(now: &DateTime<Tz>) -> String {
    now.format("[%m%d-%H]").to_string()
}

pub fn timestamp(now: &DateTime<Tz>) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn or_none(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => NONE,
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        format!("{}...", clip(text, PREVIEW_CHARS))
    } else {
        text.to_string()
    }
}

// ---------------------------------------------------------------------------
// Content publishing
// ---------------------------------------------------------------------------

pub fn publish_title(
    now: &DateTime<Tz>,
    platform: Platform,
    publish: &ContentPublish,
) -> String {
    let subject = match platform {
        Platform::X => publish
            .content
            .as_deref()
            .or(publish.title.as_deref())
            .filter(|s| !s.trim().is_empty())
            .map(|s| clip(s.trim(), X_TITLE_CHARS).trim_end())
            .unwrap_or("post"),
        _ => publish
            .title
            .as_deref()
            .map(|s| clip(s.trim(), TITLE_CHARS))
            .unwrap_or("untitled"),
    };
    format!(
        "{} {}: {}",
        title_prefix(now),
        platform.display_name(),
        subject
    )
}

/// Empty engagement table to be filled in after publishing.
pub fn metrics_table(platform: Platform) -> String {
    let columns = platform.metric_columns();
    let mut out = String::from("| Time |");
    for c in columns {
        out.push_str(&format!(" {c} |"));
    }
    out.push_str("\n|------|");
    for _ in columns {
        out.push_str("------|");
    }
    out.push_str("\n| At publish |");
    for _ in columns {
        out.push_str(" - |");
    }
    out.push('\n');
    out
}

pub fn publish_description(
    now: &DateTime<Tz>,
    session_id: &str,
    platform: Platform,
    publish: &ContentPublish,
) -> String {
    let mut out = correlation_marker(session_id);
    out.push_str("\n\n## Publish details\n");
    out.push_str(&format!("- **Platform**: {}\n", platform.display_name()));
    if platform != Platform::X {
        out.push_str(&format!("- **Title**: {}\n", or_none(publish.title.as_deref())));
    }
    if !publish.tags.is_empty() {
        out.push_str(&format!("- **Tags**: {}\n", publish.tags.join(", ")));
    }
    if platform == Platform::Xiaohongshu {
        out.push_str(&format!("- **Images**: {}\n", publish.image_count));
        if publish.is_video {
            out.push_str("- **Format**: video\n");
        }
    }
    if let Some(category) = publish.category.as_deref() {
        out.push_str(&format!("- **Category**: {category}\n"));
    }
    if let Some(id) = publish.content_id.as_deref() {
        out.push_str(&format!("- **Content id**: {id}\n"));
    }
    out.push_str(&format!("- **Published**: {}\n", timestamp(now)));

    let body = publish
        .content
        .as_deref()
        .or(publish.summary.as_deref())
        .filter(|s| !s.trim().is_empty());
    out.push_str("\n## Content\n");
    match (platform, body) {
        (Platform::X, Some(text)) => out.push_str(text),
        (_, Some(text)) => out.push_str(&preview(text)),
        (_, None) => out.push_str(NONE),
    }
    out.push('\n');

    out.push_str(&format!("\n## {}\n{PENDING_LINK}\n", platform.link_heading()));
    out.push_str("\n## Metrics\n");
    out.push_str(&metrics_table(platform));
    out
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

pub fn deployment_title(now: &DateTime<Tz>, platform: &str) -> String {
    format!("{} Deploy: {}", title_prefix(now), clip(platform, TITLE_CHARS))
}

pub fn deployment_description(
    now: &DateTime<Tz>,
    session_id: &str,
    platform: &str,
    deployment: &Deployment,
) -> String {
    format!(
        "{}\n\n## Deployment\n- **Platform**: {platform}\n- **Time**: {}\n- **Directory**: {}\n\n## Output\n{}\n",
        correlation_marker(session_id),
        timestamp(now),
        deployment.cwd.as_deref().unwrap_or("unknown"),
        or_none(Some(deployment.output.as_str())),
    )
}

/// `[MMDD-HH] <project> feature work`
pub fn feature_title(now: &DateTime<Tz>, project: &str) -> String {
    format!("{} {} feature work", title_prefix(now), clip(project, TITLE_CHARS))
}

pub fn feature_description(
    now: &DateTime<Tz>,
    session_id: &str,
    phase: Phase,
    details: &str,
    note: &str,
) -> String {
    let mut out = correlation_marker(session_id);
    out.push_str(&format!("\n\n## Phase: {phase}\n\n"));
    if !details.trim().is_empty() {
        out.push_str(details.trim());
        out.push_str("\n\n");
    }
    out.push_str("## Timeline\n");
    out.push_str(&timeline_line(now, note));
    out
}

/// A dated section appended to an existing record.
pub fn phase_section(now: &DateTime<Tz>, heading: &str, body: &str) -> String {
    format!("## {} - {heading}\n{}", timestamp(now), body.trim())
}

/// `- <timestamp>: <note>`
pub fn timeline_line(now: &DateTime<Tz>, note: &str) -> String {
    format!("- {}: {note}", timestamp(now))
}

// ---------------------------------------------------------------------------
// Investment
// ---------------------------------------------------------------------------

pub fn trade_title(now: &DateTime<Tz>) -> String {
    format!("{} Trade record", title_prefix(now))
}

pub fn trade_description(
    now: &DateTime<Tz>,
    session_id: &str,
    trade: &TradeReport,
) -> String {
    format!(
        "{}\n\n## Trade\n- **Time**: {}\n\n## Details\n{}\n",
        correlation_marker(session_id),
        timestamp(now),
        or_none(Some(trade.output.as_str())),
    )
}

pub fn research_title(now: &DateTime<Tz>, research: &ResearchReport) -> String {
    let topic = research
        .topic
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(|t| clip(t.trim(), TITLE_CHARS))
        .unwrap_or("in-depth research");
    format!("{} Research: {topic}", title_prefix(now))
}

pub fn research_description(
    now: &DateTime<Tz>,
    session_id: &str,
    research: &ResearchReport,
) -> String {
    format!(
        "{}\n\n## Topic\n{}\n\n## Summary\n{}\n\n- Recorded: {}\n",
        correlation_marker(session_id),
        research.topic.as_deref().unwrap_or("unknown"),
        or_none(Some(research.output.as_str())),
        timestamp(now),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Shanghai;

    fn now() -> DateTime<Tz> {
        Shanghai.with_ymd_and_hms(2026, 3, 7, 9, 5, 0).unwrap()
    }

    #[test]
    fn prefix_is_month_day_hour() {
        assert_eq!(title_prefix(&now()), "[0307-09]");
    }

    #[test]
    fn publish_title_clips_user_title() {
        let publish = ContentPublish {
            title: Some("x".repeat(80)),
            ..Default::default()
        };
        let title = publish_title(&now(), Platform::Bilibili, &publish);
        assert!(title.starts_with("[0307-09] Bilibili: "));
        assert!(title.ends_with(&"x".repeat(TITLE_CHARS)));
        assert!(!title.contains(&"x".repeat(TITLE_CHARS + 1)));
    }

    #[test]
    fn x_title_uses_post_text() {
        let publish = ContentPublish {
            content: Some("Shipping a new release of the tracker today, details inside".into()),
            ..Default::default()
        };
        let title = publish_title(&now(), Platform::X, &publish);
        assert_eq!(title, "[0307-09] X: Shipping a new release of the");
    }

    #[test]
    fn publish_description_layout() {
        let publish = ContentPublish {
            title: Some("My Clip".into()),
            tags: vec!["a".into(), "b".into()],
            content_id: Some("BV123".into()),
            ..Default::default()
        };
        let text = publish_description(&now(), "s1", Platform::Bilibili, &publish);
        assert!(text.starts_with("sessionId: s1\n"));
        assert!(text.contains("- **Tags**: a, b"));
        assert!(text.contains("- **Content id**: BV123"));
        assert!(text.contains("## Video link\nPending backfill"));
        assert!(text.contains("| Time | Views | Likes | Coins | Saves |"));
    }

    #[test]
    fn metrics_table_shape() {
        let table = metrics_table(Platform::Xiaohongshu);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "| At publish | - | - | - |");
    }

    #[test]
    fn marker_must_be_its_own_line() {
        assert!(carries_marker("sessionId: s1\n\nbody", "s1"));
        assert!(carries_marker("intro\n  `sessionId: s1`  \n", "s1"));
        assert!(!carries_marker("sessionId: s10\n", "s1"));
        assert!(!carries_marker("see sessionId: s1 above", "s1"));
    }

    #[test]
    fn feature_description_has_timeline() {
        let text = feature_description(&now(), "s9", Phase::Requirements, "", "Requirements analysed");
        assert!(text.starts_with("sessionId: s9\n\n## Phase: requirements"));
        assert!(text.ends_with("- 2026-03-07 09:05:00: Requirements analysed"));
    }

    #[test]
    fn long_preview_is_clipped() {
        let publish = ContentPublish {
            title: Some("t".into()),
            content: Some("字".repeat(150)),
            ..Default::default()
        };
        let text = publish_description(&now(), "s", Platform::Xiaohongshu, &publish);
        assert!(text.contains(&format!("{}...", "字".repeat(100))));
    }
}
