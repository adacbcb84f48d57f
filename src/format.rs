// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Formatting of message content into HTML or Markdown markup.
//!
//! A message body is either a plain string or a list of content items
//! (text, image, tool invocation, tool result, or something unrecognized).
//! [`format_content`] renders each item for the chosen [`Target`] and
//! reports whether any tool-related item was present, which the renderer
//! uses to pick an icon.

use crate::parser::{Content, ContentItem};
use base64::prelude::*;
use serde_json::Value;
use snafu::prelude::*;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const DEFAULT_MEDIA_TYPE: &str = "image/png";

/// Error type for content formatting failures.
#[derive(Debug, Snafu)]
pub enum FormatError {
    /// An embedded image is not valid base64.
    #[snafu(display("failed to decode embedded image: {source}"))]
    DecodeImage {
        /// The underlying decoding error.
        source: base64::DecodeError,
    },

    /// An image side file could not be written.
    #[snafu(display("failed to write image {}: {source}", path.display()))]
    WriteImage {
        /// The file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// The markup format to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// Self-contained HTML. Images are always inlined as data URIs.
    Html,

    /// Markdown. When `assets` is set, images are written there as side files.
    Markdown {
        /// Directory for image side files.
        assets: Option<&'a Path>,
    },
}

/// Markup for one message body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormattedContent {
    /// The rendered markup.
    pub markup: String,

    /// Whether a tool invocation or tool result was present.
    pub has_tools: bool,
}

/// Formats a message body for the given target.
///
/// # Errors
///
/// Only Markdown output with an assets directory can fail: when an image
/// payload is not valid base64 or its side file cannot be written.
pub fn format_content(content: &Content, target: Target<'_>) -> Result<FormattedContent, FormatError> {
    match content {
        Content::Empty => Ok(FormattedContent::default()),
        Content::Text(text) => Ok(FormattedContent {
            markup: escape_for(target, text),
            has_tools: false,
        }),
        Content::Items(items) => {
            let mut out = FormattedContent::default();
            for item in items {
                if matches!(item, ContentItem::ToolUse { .. } | ContentItem::ToolResult { .. }) {
                    out.has_tools = true;
                }
                match target {
                    Target::Html => format_item_html(&mut out.markup, item),
                    Target::Markdown { assets } => format_item_markdown(&mut out.markup, item, assets)?,
                }
            }
            Ok(out)
        }
    }
}

fn escape_for(target: Target<'_>, text: &str) -> String {
    match target {
        Target::Html => escape_html(text),
        Target::Markdown { .. } => escape_markdown(text),
    }
}

fn format_item_html(out: &mut String, item: &ContentItem) {
    match item {
        ContentItem::Text { text } => out.push_str(&escape_html(text)),
        ContentItem::Image { media_type, data } => {
            let media_type = media_type.as_deref().unwrap_or(DEFAULT_MEDIA_TYPE);
            write!(
                out,
                r#"<div class="image-container"><img src="data:{};base64,{}" alt="Image" class="message-image" /></div>"#,
                escape_html(media_type),
                escape_html(data)
            )
            .unwrap();
        }
        ContentItem::ToolUse { name, input } => {
            write!(
                out,
                concat!(
                    r#"<div class="tool-toggle">"#,
                    r#"<div class="tool-toggle-header" onclick="toggleTool(this)">"#,
                    r#"<span>🔧 Tool: {}</span><span class="toggle-arrow">▶</span></div>"#,
                    r#"<div class="tool-toggle-content"><strong>Input:</strong> <pre>{}</pre></div>"#,
                    "</div>"
                ),
                escape_html(name.as_deref().unwrap_or("Unknown")),
                escape_html(&pretty_json(input))
            )
            .unwrap();
        }
        ContentItem::ToolResult { content, is_error } => {
            write!(
                out,
                concat!(
                    r#"<div class="tool-toggle">"#,
                    r#"<div class="tool-toggle-header" onclick="toggleTool(this)">"#,
                    r#"<span>{}</span><span class="toggle-arrow">▶</span></div>"#,
                    r#"<div class="tool-toggle-content"><pre>{}</pre></div>"#,
                    "</div>"
                ),
                tool_result_label(*is_error),
                escape_html(&tool_result_text(content.as_ref()))
            )
            .unwrap();
        }
        ContentItem::Unknown(value) => {
            write!(
                out,
                r#"<div class="unknown-content"><pre>{}</pre></div>"#,
                escape_html(&pretty_json(value))
            )
            .unwrap();
        }
    }
}

fn format_item_markdown(out: &mut String, item: &ContentItem, assets: Option<&Path>) -> Result<(), FormatError> {
    match item {
        ContentItem::Text { text } => out.push_str(&escape_markdown(text)),
        ContentItem::Image { media_type, data } => {
            let media_type = media_type.as_deref().unwrap_or(DEFAULT_MEDIA_TYPE);
            let target = match assets {
                Some(dir) => write_image(dir, media_type, data)?,
                None => format!("data:{media_type};base64,{data}"),
            };
            write!(out, "\n\n![Image]({target})\n\n").unwrap();
        }
        ContentItem::ToolUse { name, input } => {
            let label = format!("🔧 Tool: {}", escape_html(name.as_deref().unwrap_or("Unknown")));
            details(out, &label, &pretty_json(input), "json");
        }
        ContentItem::ToolResult { content, is_error } => {
            details(out, tool_result_label(*is_error), &tool_result_text(content.as_ref()), "");
        }
        ContentItem::Unknown(value) => {
            details(out, "❓ Unknown content", &pretty_json(value), "json");
        }
    }
    Ok(())
}

/// Decodes an image payload into `dir` and returns the side file's name.
fn write_image(dir: &Path, media_type: &str, data: &str) -> Result<String, FormatError> {
    let bytes = BASE64_STANDARD.decode(data.trim()).context(DecodeImageSnafu)?;
    let name = format!("{}.{}", Uuid::new_v4(), image_extension(media_type));
    let path = dir.join(&name);
    std::fs::write(&path, bytes).context(WriteImageSnafu { path })?;
    Ok(name)
}

/// Maps an image media type to a file extension.
#[must_use]
pub fn image_extension(media_type: &str) -> &'static str {
    match media_type {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        m if m.contains("svg") => "svg",
        _ => "jpg",
    }
}

/// Appends a collapsible `<details>` block holding a fenced code block.
fn details(out: &mut String, label: &str, body: &str, lang: &str) {
    let longest_run = body
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    write!(
        out,
        "\n\n<details>\n<summary>{label}</summary>\n\n{fence}{lang}\n{body}\n{fence}\n\n</details>\n\n"
    )
    .unwrap();
}

const fn tool_result_label(is_error: bool) -> &'static str {
    if is_error {
        "📋 Tool Result (error)"
    } else {
        "📋 Tool Result"
    }
}

/// Returns the displayable text of a tool result payload.
fn tool_result_text(content: Option<&Value>) -> String {
    match content {
        None => "No content".to_owned(),
        Some(Value::String(text)) if text.is_empty() => "No content".to_owned(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(blocks)) if !blocks.is_empty() && blocks.iter().all(is_text_block) => blocks
            .iter()
            .filter_map(|block| block.get("text")?.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => pretty_json(other),
    }
}

fn is_text_block(block: &Value) -> bool {
    block.get("type").and_then(Value::as_str) == Some("text") && block.get("text").is_some_and(Value::is_string)
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Escapes the five HTML-significant characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + s.len() / 4);
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

/// Backslash-escapes characters that carry meaning in Markdown.
#[must_use]
pub fn escape_markdown(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + s.len() / 4);
    for c in s.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '|') {
            result.push('\\');
        }
        result.push(c);
    }
    result
}
