//! Block payload rendering
//!
//! Turns a raw Notion block into the markdown-style payload stored in the
//! destination. Asset-bearing blocks render as links the reconciler parses
//! back: `![name](url)` for images, `[caption](url)` for bookmarks and
//! embeds. Labels are stripped of bracket and parenthesis characters so
//! the first `(...)` group is always the URL.

use serde_json::Value;

use crate::client::RawBlock;

/// Alt text used when an image has neither caption nor file name
const DEFAULT_IMAGE_NAME: &str = "image";

/// Renders a rich text array with its inline annotations
pub fn render_rich_text(items: &[Value]) -> String {
    items.iter().map(render_span).collect()
}

fn render_span(item: &Value) -> String {
    let text = item
        .get("plain_text")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if text.is_empty() {
        return String::new();
    }

    let flag = |name: &str| {
        item.pointer(&format!("/annotations/{name}"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };

    let mut out = text.to_string();
    if flag("code") {
        out = format!("`{out}`");
    }
    if flag("bold") {
        out = format!("**{out}**");
    }
    if flag("italic") {
        out = format!("_{out}_");
    }
    if flag("strikethrough") {
        out = format!("~~{out}~~");
    }
    if let Some(href) = item.get("href").and_then(Value::as_str) {
        out = format!("[{out}]({href})");
    }
    out
}

/// Plain text of a rich text array, annotations ignored
pub fn plain_text(items: &[Value]) -> String {
    items
        .iter()
        .filter_map(|i| i.get("plain_text").and_then(Value::as_str))
        .collect()
}

fn rich_text_of<'a>(payload: Option<&'a Value>, key: &str) -> &'a [Value] {
    payload
        .and_then(|p| p.get(key))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn label(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '[' | ']' | '(' | ')'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// URL of a file object (`{"type": "file"|"external", ...}`)
fn file_url(payload: &Value) -> Option<&str> {
    payload
        .pointer("/file/url")
        .or_else(|| payload.pointer("/external/url"))
        .and_then(Value::as_str)
}

/// Last path segment of a URL, query string ignored
fn file_name_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let name = parsed.path_segments()?.last()?;
    (!name.is_empty()).then(|| name.to_string())
}

/// Renders one block into its stored payload
///
/// Unknown block types render as an empty string.
pub fn render_block(block: &RawBlock) -> String {
    let payload = block.payload();
    let text = || render_rich_text(rich_text_of(payload, "rich_text"));

    match block.block_type.as_str() {
        "paragraph" | "toggle" => text(),
        "heading_1" => format!("# {}", text()),
        "heading_2" => format!("## {}", text()),
        "heading_3" => format!("### {}", text()),
        "bulleted_list_item" => format!("- {}", text()),
        "numbered_list_item" => format!("1. {}", text()),
        "to_do" => {
            let checked = payload
                .and_then(|p| p.get("checked"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            format!("- [{}] {}", if checked { "x" } else { " " }, text())
        }
        "quote" => format!("> {}", text()),
        "callout" => {
            let emoji = payload
                .and_then(|p| p.pointer("/icon/emoji"))
                .and_then(Value::as_str);
            match emoji {
                Some(e) => format!("> {e} {}", text()),
                None => format!("> {}", text()),
            }
        }
        "code" => {
            let language = payload
                .and_then(|p| p.get("language"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            format!(
                "```{language}\n{}\n```",
                plain_text(rich_text_of(payload, "rich_text"))
            )
        }
        "divider" => "---".to_string(),
        "image" => {
            let Some(url) = payload.and_then(file_url) else {
                return String::new();
            };
            let caption = label(&plain_text(rich_text_of(payload, "caption")));
            let name = if caption.is_empty() {
                file_name_of(url)
                    .map(|n| label(&n))
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_string())
            } else {
                caption
            };
            format!("![{name}]({url})")
        }
        "bookmark" | "embed" => {
            let Some(url) = payload.and_then(|p| p.get("url")).and_then(Value::as_str) else {
                return String::new();
            };
            let caption = label(&plain_text(rich_text_of(payload, "caption")));
            let caption = if caption.is_empty() {
                label(url)
            } else {
                caption
            };
            format!("[{caption}]({url})")
        }
        "child_page" => payload
            .and_then(|p| p.get("title"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}
