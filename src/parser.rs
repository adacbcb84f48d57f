// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Parsing for Claude Code session transcripts.
//!
//! A session file is line-delimited JSON: every non-blank line is one
//! self-describing record discriminated by its `type` field. This module
//! turns that text into typed [`Record`] values.
//!
//! # Format Overview
//!
//! The records this crate cares about are:
//! - `user` and `assistant` turns, each carrying a `message` with a `role`
//!   and a `content` that is either a plain string or a list of content items
//! - `summary` annotations, whose `summary` text becomes the document title
//!
//! Every other record kind (`system`, `progress`, `file-history-snapshot`,
//! ...) is kept as [`Record::Other`] so its timestamp and working directory
//! still count toward session metadata.
//!
//! # Example
//!
//! ```
//! use ccsession::parser::{parse_session, Record};
//!
//! let text = r#"{"type":"summary","summary":"Demo"}
//! {"type":"user","message":{"role":"user","content":"Hi"},"timestamp":"2024-01-01T00:00:00Z"}"#;
//!
//! let records = parse_session(text).unwrap();
//! assert_eq!(records.len(), 2);
//! assert!(matches!(records[1], Record::User(_)));
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use snafu::prelude::*;

/// Error type for transcript parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// A line is not a valid JSON record.
    #[snafu(display("malformed record on line {line}: {source}"))]
    MalformedRecord {
        /// The 1-based line number of the offending record.
        line: usize,
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// One line of a session transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A turn typed by the user (this includes tool results fed back to the model).
    User(Turn),

    /// A turn produced by the assistant.
    Assistant(Turn),

    /// A summary annotation describing the session.
    Summary(SummaryRecord),

    /// Any record kind that is not rendered.
    Other {
        /// The raw `type` value (empty when the record has none).
        kind: String,
        /// ISO-8601 timestamp, if present.
        timestamp: Option<String>,
        /// Working directory, if present.
        cwd: Option<String>,
    },
}

/// The payload shared by `user` and `assistant` records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Turn {
    /// The message body. Absent on some bookkeeping turns.
    pub message: Option<Message>,

    /// ISO-8601 timestamp of the turn.
    pub timestamp: Option<String>,

    /// Working directory the session was running in.
    pub cwd: Option<String>,
}

/// A `summary` record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SummaryRecord {
    /// The summary text.
    pub summary: Option<String>,

    /// ISO-8601 timestamp, if present.
    pub timestamp: Option<String>,

    /// Working directory, if present.
    pub cwd: Option<String>,
}

/// A message inside a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The declared role (`user` or `assistant`).
    pub role: Option<String>,

    /// The message body.
    pub content: Content,
}

/// The body of a message.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Content {
    /// No content (missing or `null`).
    #[default]
    Empty,

    /// A plain string.
    Text(String),

    /// A list of heterogeneous content items.
    Items(Vec<ContentItem>),
}

/// A unit inside a structured message body.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    /// Plain text.
    Text {
        /// The text itself.
        text: String,
    },

    /// A base64-encoded image.
    Image {
        /// Declared media type (e.g. `image/png`), if any.
        media_type: Option<String>,
        /// Base64 payload without a `data:` prefix.
        data: String,
    },

    /// A tool invocation requested by the assistant.
    ToolUse {
        /// The tool's declared name.
        name: Option<String>,
        /// The input payload. A missing input is an empty object.
        input: Value,
    },

    /// The result of a tool invocation.
    ToolResult {
        /// The result payload, `None` when absent or `null`.
        content: Option<Value>,
        /// Whether the tool reported a failure.
        is_error: bool,
    },

    /// Anything else, kept verbatim.
    Unknown(Value),
}

impl Record {
    /// Returns the record's `type` as it appeared in the input.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::User(_) => "user",
            Self::Assistant(_) => "assistant",
            Self::Summary(_) => "summary",
            Self::Other { kind, .. } => kind,
        }
    }

    /// Returns the record's timestamp, if it carries one.
    #[must_use]
    pub fn timestamp(&self) -> Option<&str> {
        match self {
            Self::User(turn) | Self::Assistant(turn) => turn.timestamp.as_deref(),
            Self::Summary(summary) => summary.timestamp.as_deref(),
            Self::Other { timestamp, .. } => timestamp.as_deref(),
        }
    }

    /// Returns the record's working directory, if it carries one.
    #[must_use]
    pub fn cwd(&self) -> Option<&str> {
        match self {
            Self::User(turn) | Self::Assistant(turn) => turn.cwd.as_deref(),
            Self::Summary(summary) => summary.cwd.as_deref(),
            Self::Other { cwd, .. } => cwd.as_deref(),
        }
    }

    /// Returns the turn for `user` and `assistant` records.
    #[must_use]
    pub const fn turn(&self) -> Option<&Turn> {
        match self {
            Self::User(turn) | Self::Assistant(turn) => Some(turn),
            Self::Summary(_) | Self::Other { .. } => None,
        }
    }
}

impl Content {
    /// Returns `true` if the content list carries a tool result.
    #[must_use]
    pub fn has_tool_result(&self) -> bool {
        match self {
            Self::Items(items) => items
                .iter()
                .any(|item| matches!(item, ContentItem::ToolResult { .. })),
            Self::Empty | Self::Text(_) => false,
        }
    }

    fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Empty,
            Some(Value::String(text)) => Self::Text(text.clone()),
            Some(Value::Array(items)) => Self::Items(items.iter().map(ContentItem::from_value).collect()),
            // A lone content block instead of a list
            Some(item @ Value::Object(_)) => Self::Items(vec![ContentItem::from_value(item)]),
            Some(other) => Self::Text(other.to_string()),
        }
    }
}

impl ContentItem {
    fn from_value(value: &Value) -> Self {
        match get_str(value, &["type"]) {
            Some("text") => {
                if let Some(text) = get_string(value, &["text"]) {
                    return Self::Text { text };
                }
            }
            Some("image") => {
                if let Some(data) = get_string(value, &["source", "data"]) {
                    return Self::Image {
                        media_type: get_string(value, &["source", "media_type"]),
                        data,
                    };
                }
            }
            Some("tool_use") => {
                return Self::ToolUse {
                    name: get_string(value, &["name"]),
                    input: value
                        .get("input")
                        .filter(|input| !input.is_null())
                        .cloned()
                        .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
                };
            }
            Some("tool_result") => {
                return Self::ToolResult {
                    content: value.get("content").filter(|c| !c.is_null()).cloned(),
                    is_error: value
                        .get("is_error")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                };
            }
            _ => {}
        }

        Self::Unknown(value.clone())
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Err(D::Error::custom("expected a JSON object"));
        }

        let timestamp = get_string(&value, &["timestamp"]);
        let cwd = get_string(&value, &["cwd"]).or_else(|| get_string(&value, &["workingDirectory"]));

        Ok(match get_str(&value, &["type"]).unwrap_or_default() {
            "user" => Self::User(Turn::from_value(&value, timestamp, cwd)),
            "assistant" => Self::Assistant(Turn::from_value(&value, timestamp, cwd)),
            "summary" => Self::Summary(SummaryRecord {
                summary: get_string(&value, &["summary"]),
                timestamp,
                cwd,
            }),
            other => Self::Other {
                kind: other.to_owned(),
                timestamp,
                cwd,
            },
        })
    }
}

impl Turn {
    fn from_value(value: &Value, timestamp: Option<String>, cwd: Option<String>) -> Self {
        let message = value.get("message").filter(|m| m.is_object()).map(|m| Message {
            role: get_string(m, &["role"]),
            content: Content::from_value(m.get("content")),
        });

        Self {
            message,
            timestamp,
            cwd,
        }
    }
}

/// Navigates a JSON path and returns the string value at the end.
fn get_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str()
}

/// Like [`get_str`] but returns an owned `String`.
fn get_string(value: &Value, path: &[&str]) -> Option<String> {
    get_str(value, path).map(str::to_owned)
}

/// Parses the text of a session file into its records.
///
/// Blank lines are skipped. Every other line must hold exactly one JSON
/// object.
///
/// # Errors
///
/// Returns [`ParseError::MalformedRecord`] for the first line that is not a
/// JSON object.
pub fn parse_session(text: &str) -> Result<Vec<Record>, ParseError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| serde_json::from_str(line).context(MalformedRecordSnafu { line: idx + 1 }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_one(json: &str) -> Record {
        serde_json::from_str(json).unwrap()
    }

    fn items_of(record: &Record) -> &[ContentItem] {
        match &record.turn().unwrap().message.as_ref().unwrap().content {
            Content::Items(items) => items,
            other => panic!("Expected Items, got {other:?}"),
        }
    }

    #[test]
    fn parses_summary_record() {
        let record = parse_one(r#"{"type":"summary","summary":"Demo","leafUuid":"abc"}"#);

        match record {
            Record::Summary(summary) => assert_eq!(summary.summary.as_deref(), Some("Demo")),
            other => panic!("Expected Summary, got {other:?}"),
        }
    }

    #[test]
    fn parses_user_turn_with_string_content() {
        let record = parse_one(
            r#"{"type":"user","message":{"role":"user","content":"Hi"},"timestamp":"2024-01-01T00:00:00Z","cwd":"/home/me/app"}"#,
        );

        assert_eq!(record.kind(), "user");
        assert_eq!(record.timestamp(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(record.cwd(), Some("/home/me/app"));
        let message = record.turn().unwrap().message.as_ref().unwrap();
        assert_eq!(message.role.as_deref(), Some("user"));
        assert_eq!(message.content, Content::Text("Hi".into()));
    }

    #[test]
    fn accepts_working_directory_alias() {
        let record = parse_one(r#"{"type":"assistant","workingDirectory":"/srv"}"#);
        assert_eq!(record.cwd(), Some("/srv"));
    }

    #[test]
    fn parses_all_content_item_kinds() {
        let record = parse_one(
            r#"{"type":"assistant","message":{"role":"assistant","content":[
                {"type":"text","text":"hello"},
                {"type":"image","source":{"type":"base64","media_type":"image/gif","data":"R0lG"}},
                {"type":"tool_use","id":"t1","name":"Bash","input":{"command":"ls"}},
                {"type":"tool_result","tool_use_id":"t1","content":"ok","is_error":true},
                {"type":"thinking","thinking":"hmm"}
            ]}}"#,
        );

        let items = items_of(&record);
        assert_eq!(items.len(), 5);
        assert_eq!(items[0], ContentItem::Text { text: "hello".into() });
        assert_eq!(
            items[1],
            ContentItem::Image {
                media_type: Some("image/gif".into()),
                data: "R0lG".into()
            }
        );
        assert_eq!(
            items[2],
            ContentItem::ToolUse {
                name: Some("Bash".into()),
                input: json!({"command": "ls"})
            }
        );
        assert_eq!(
            items[3],
            ContentItem::ToolResult {
                content: Some(json!("ok")),
                is_error: true
            }
        );
        assert!(matches!(items[4], ContentItem::Unknown(_)));
    }

    #[test]
    fn items_missing_required_fields_are_unknown() {
        let record = parse_one(
            r#"{"type":"user","message":{"role":"user","content":[
                {"type":"text"},
                {"type":"image","source":{"media_type":"image/png"}}
            ]}}"#,
        );

        let items = items_of(&record);
        assert!(items.iter().all(|item| matches!(item, ContentItem::Unknown(_))));
    }

    #[test]
    fn tool_use_without_input_gets_empty_object() {
        let record = parse_one(r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Read"}]}}"#);

        assert_eq!(
            items_of(&record)[0],
            ContentItem::ToolUse {
                name: Some("Read".into()),
                input: json!({})
            }
        );
    }

    #[test]
    fn null_tool_result_content_is_absent() {
        let record = parse_one(r#"{"type":"user","message":{"content":[{"type":"tool_result","content":null}]}}"#);

        assert_eq!(
            items_of(&record)[0],
            ContentItem::ToolResult {
                content: None,
                is_error: false
            }
        );
        assert!(record.turn().unwrap().message.as_ref().unwrap().content.has_tool_result());
    }

    #[test]
    fn missing_or_null_content_is_empty() {
        let a = parse_one(r#"{"type":"user","message":{"role":"user"}}"#);
        let b = parse_one(r#"{"type":"user","message":{"role":"user","content":null}}"#);

        for record in [a, b] {
            assert_eq!(record.turn().unwrap().message.as_ref().unwrap().content, Content::Empty);
        }
    }

    #[test]
    fn turn_without_message() {
        let record = parse_one(r#"{"type":"assistant","timestamp":"2024-01-01T00:00:00Z"}"#);
        assert!(record.turn().unwrap().message.is_none());
    }

    #[test]
    fn unknown_kinds_are_kept_as_other() {
        let record = parse_one(r#"{"type":"system","timestamp":"2024-01-01T00:00:00Z","cwd":"/tmp"}"#);

        assert_eq!(record.kind(), "system");
        assert_eq!(record.timestamp(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(record.cwd(), Some("/tmp"));
        assert!(record.turn().is_none());
    }

    #[test]
    fn record_without_type_is_other() {
        let record = parse_one(r#"{"foo":1}"#);
        assert_eq!(record.kind(), "");
    }

    #[test]
    fn skips_blank_lines() {
        let text = "\n{\"type\":\"summary\",\"summary\":\"a\"}\n   \n{\"type\":\"summary\",\"summary\":\"b\"}\n";
        assert_eq!(parse_session(text).unwrap().len(), 2);
    }

    #[test]
    fn reports_line_of_malformed_record() {
        let text = "{\"type\":\"summary\"}\n\nnot json\n";
        let err = parse_session(text).unwrap_err();

        match err {
            ParseError::MalformedRecord { line, .. } => assert_eq!(line, 3),
        }
    }

    #[test]
    fn rejects_non_object_records() {
        assert!(parse_session("[1,2,3]").is_err());
        assert!(parse_session("42").is_err());
    }

    #[test]
    fn empty_input_has_no_records() {
        assert!(parse_session("").unwrap().is_empty());
    }
}
