use super::Adapter;
use crate::config::{Config, SinkKind};
use crate::event::{ContentPublish, Event};
use crate::hook::{HookInput, TriggerKind};
use crate::io::clip;
use crate::types::{BusinessUnit, EventType, Platform};
use regex::Regex;
use std::sync::OnceLock;

const CONTENT_CHARS: usize = 500;
const POST_CHARS: usize = 280;
const POST_OUTPUT_CHARS: usize = 300;

static QUOTED_TITLE: OnceLock<Regex> = OnceLock::new();
static QUOTED_DESC: OnceLock<Regex> = OnceLock::new();
static QUOTED_TAG: OnceLock<Regex> = OnceLock::new();
static TID: OnceLock<Regex> = OnceLock::new();
static BVID: OnceLock<Regex> = OnceLock::new();
static NOTE_TITLE: OnceLock<Regex> = OnceLock::new();
static NOTE_TAGS: OnceLock<Regex> = OnceLock::new();
static HASHTAG: OnceLock<Regex> = OnceLock::new();
static IMAGE_EXT: OnceLock<Regex> = OnceLock::new();
static VIDEO: OnceLock<Regex> = OnceLock::new();
static NOTE_BODY: OnceLock<Regex> = OnceLock::new();

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex"))
}

fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

fn publish_event(input: &HookInput, publish: &ContentPublish) -> Event {
    Event::new(
        EventType::ContentPublishEvent,
        BusinessUnit::Content,
        input.session_id(),
        publish,
    )
}

// ---------------------------------------------------------------------------
// Bilibili (video uploader on the shell)
// ---------------------------------------------------------------------------

pub(super) fn bilibili() -> Adapter {
    Adapter {
        name: "bilibili",
        trigger: TriggerKind::ShellExec,
        markers: &["biliup", "upload --title"],
        sink: SinkKind::Agent,
        extract: extract_bilibili,
    }
}

fn extract_bilibili(input: &HookInput, _config: &Config) -> Option<Event> {
    let command = input.command();
    let title = capture(regex(&QUOTED_TITLE, r#"--title\s+["']([^"']+)["']"#), command)?;
    let output = input.output_text();

    let tags = capture(regex(&QUOTED_TAG, r#"--tag\s+["']([^"']+)["']"#), command)
        .map(|list| split_tags(list, &[',']))
        .unwrap_or_default();

    let publish = ContentPublish {
        platform: Some(Platform::Bilibili),
        title: Some(title.to_string()),
        summary: capture(regex(&QUOTED_DESC, r#"--desc\s+["']([^"']+)["']"#), command)
            .map(str::to_string),
        tags,
        is_video: true,
        category: capture(regex(&TID, r"--tid\s+(\d+)"), command).map(str::to_string),
        content_id: regex(&BVID, r"BV[a-zA-Z0-9]+")
            .find(&output)
            .map(|m| m.as_str().to_string()),
        output: Some(clip(&output, CONTENT_CHARS).to_string()),
        ..Default::default()
    };
    Some(publish_event(input, &publish))
}

fn split_tags(list: &str, separators: &[char]) -> Vec<String> {
    list.split(separators)
        .map(|t| t.trim().trim_start_matches('#').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Xiaohongshu (note publishing sub-task)
// ---------------------------------------------------------------------------

const NOTE_PUBLISH_MARKERS: &[&str] = &["标题", "--title", "发布", "title:"];

pub(super) fn xiaohongshu() -> Adapter {
    Adapter {
        name: "xiaohongshu",
        trigger: TriggerKind::SubTask,
        markers: &["xiaohongshu"],
        sink: SinkKind::Agent,
        extract: extract_xiaohongshu,
    }
}

fn extract_xiaohongshu(input: &HookInput, _config: &Config) -> Option<Event> {
    let args = input.args();
    if !NOTE_PUBLISH_MARKERS.iter().any(|m| args.contains(*m)) {
        tracing::debug!("xiaohongshu sub-task is not a publish");
        return None;
    }
    let note = parse_note(&args);
    let title = note.title?;

    let publish = ContentPublish {
        platform: Some(Platform::Xiaohongshu),
        title: Some(title),
        content: note.body.map(|b| clip(&b, CONTENT_CHARS).to_string()),
        tags: note.tags,
        image_count: note.image_count,
        is_video: note.is_video,
        ..Default::default()
    };
    Some(publish_event(input, &publish))
}

#[derive(Debug, Default, PartialEq)]
struct Note {
    title: Option<String>,
    body: Option<String>,
    tags: Vec<String>,
    image_count: u32,
    is_video: bool,
}

/// Pull the publish fields out of free-form sub-task arguments.
fn parse_note(args: &str) -> Note {
    let title = capture(regex(&NOTE_TITLE, r"标题[：:]\s*([^\n]+)"), args)
        .or_else(|| capture(regex(&QUOTED_TITLE, r#"--title\s+["']([^"']+)["']"#), args))
        .map(str::to_string);

    let mut tags = capture(regex(&NOTE_TAGS, r"标签[：:]?\s*([^\n]+)"), args)
        .map(|list| split_tags(list, &[',', '，', '、']))
        .unwrap_or_default();
    if tags.is_empty() {
        tags = regex(&HASHTAG, r"#(\S+)")
            .captures_iter(args)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect();
    }

    let image_count = regex(&IMAGE_EXT, r"(?i)\.(jpg|jpeg|png|gif|webp)")
        .find_iter(args)
        .count() as u32;
    let is_video = regex(&VIDEO, r"(?i)视频|video|\.mp4|\.mov").is_match(args);

    Note {
        title,
        body: note_body(args),
        tags,
        image_count,
        is_video,
    }
}

/// Text after `文案：` up to a blank line or the next tags/images section.
fn note_body(args: &str) -> Option<String> {
    let start = regex(&NOTE_BODY, r"文案[：:]\s*").find(args)?.end();
    let rest = &args[start..];
    let end = ["\n\n", "标签", "图片"]
        .iter()
        .filter_map(|stop| rest.find(*stop))
        .min()
        .unwrap_or(rest.len());
    let body = rest[..end].trim();
    (!body.is_empty()).then(|| body.to_string())
}

// ---------------------------------------------------------------------------
// X (post sub-task)
// ---------------------------------------------------------------------------

pub(super) fn x() -> Adapter {
    Adapter {
        name: "x",
        trigger: TriggerKind::SubTask,
        markers: &["x-post", "twitter"],
        sink: SinkKind::Direct,
        extract: extract_x,
    }
}

fn extract_x(input: &HookInput, _config: &Config) -> Option<Event> {
    let text = input.args();
    let output = input.output_text();
    let publish = ContentPublish {
        platform: Some(Platform::X),
        content: Some(clip(&text, POST_CHARS).to_string()),
        output: Some(clip(&output, POST_OUTPUT_CHARS).to_string()),
        ..Default::default()
    };
    Some(publish_event(input, &publish))
}
