// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Document rendering for parsed sessions.
//!
//! This module turns a [`RenderContext`] into either an HTML document, by
//! substituting into a [`Template`], or a Markdown document assembled
//! directly.
//!
//! # Output Format
//!
//! Only `user` and `assistant` records are shown. A user turn that carries
//! a tool result is shown as an assistant message.
//!
//! # Example
//!
//! ```
//! use ccsession::parser::parse_session;
//! use ccsession::renderer::{render_html, RenderContext, Template};
//! use ccsession::session::Session;
//!
//! let text = r#"{"type":"summary","summary":"Demo"}
//! {"type":"user","message":{"role":"user","content":"Hi"},"timestamp":"2024-01-01T00:00:00Z"}"#;
//! let session = Session::new("abc", parse_session(text).unwrap());
//! let meta = session.meta();
//!
//! let template = Template::from_source("<title>{{TITLE}}</title>{{MESSAGES}}");
//! let html = render_html(&RenderContext::for_session(&session, &meta), &template).unwrap();
//!
//! assert!(html.starts_with("<title>Demo</title>"));
//! ```

use crate::format::{FormatError, Target, escape_html, escape_markdown, format_content};
use crate::parser::{Content, Record};
use crate::session::{MergedSession, Session, SessionBoundary, SessionMeta, parse_timestamp};
use snafu::prelude::*;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Error type for rendering failures.
#[derive(Debug, Snafu)]
pub enum RenderError {
    /// The named HTML template does not exist.
    #[snafu(display("template not found: {}", path.display()))]
    TemplateNotFound {
        /// The path the template was expected at.
        path: PathBuf,
    },

    /// The template exists but could not be read.
    #[snafu(display("failed to read template {}: {source}", path.display()))]
    ReadTemplate {
        /// The template path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A message body could not be formatted.
    #[snafu(display("failed to format message: {source}"))]
    Format {
        /// The underlying formatting error.
        source: FormatError,
    },
}

/// Everything the renderer needs to produce one document.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Document title.
    pub title: &'a str,

    /// Session identifier, or the project name for merged output.
    pub session_id: &'a str,

    /// Working directory.
    pub cwd: &'a str,

    /// ISO-8601 timestamp for the document header.
    pub timestamp: &'a str,

    /// Records to render, in order.
    pub records: &'a [Record],

    /// Session starts to mark in merged output.
    pub boundaries: &'a [SessionBoundary],
}

impl<'a> RenderContext<'a> {
    /// Builds a context for a single session.
    #[must_use]
    pub fn for_session(session: &'a Session, meta: &'a SessionMeta) -> Self {
        Self {
            title: &meta.title,
            session_id: &session.id,
            cwd: &meta.cwd,
            timestamp: &meta.timestamp,
            records: &session.records,
            boundaries: &[],
        }
    }

    /// Builds a context for merged sessions of a project.
    #[must_use]
    pub fn for_merged(project_name: &'a str, merged: &'a MergedSession) -> Self {
        Self {
            title: &merged.meta.title,
            session_id: project_name,
            cwd: &merged.meta.cwd,
            timestamp: &merged.meta.timestamp,
            records: &merged.records,
            boundaries: &merged.boundaries,
        }
    }

    /// Iterates over displayable messages, each with the boundary label that
    /// precedes it (if any).
    fn messages(&self) -> impl Iterator<Item = (Option<&'a str>, Message<'a>)> + 'a {
        let boundaries = self.boundaries;
        let mut pending: Option<&'a str> = None;
        self.records.iter().enumerate().filter_map(move |(idx, record)| {
            if let Some(b) = boundaries.iter().find(|b| b.index == idx) {
                pending = Some(&b.label);
            }
            let message = Message::from_record(record)?;
            Some((pending.take(), message))
        })
    }
}

/// A record that is displayed as a message.
struct Message<'a> {
    role: &'a str,
    content: &'a Content,
    timestamp: String,
}

impl<'a> Message<'a> {
    fn from_record(record: &'a Record) -> Option<Self> {
        let role = display_role(record)?;
        let turn = record.turn()?;
        Some(Self {
            role,
            content: turn.message.as_ref().map_or(&Content::Empty, |m| &m.content),
            timestamp: turn.timestamp.as_deref().map(display_timestamp).unwrap_or_default(),
        })
    }
}

/// Returns the role a record is displayed with, or `None` if it is not shown.
///
/// Content carrying a tool result is always shown as `assistant`.
#[must_use]
pub fn display_role(record: &Record) -> Option<&str> {
    let turn = record.turn()?;
    let message = turn.message.as_ref();
    if message.is_some_and(|m| m.content.has_tool_result()) {
        return Some("assistant");
    }
    Some(message.and_then(|m| m.role.as_deref()).unwrap_or_else(|| record.kind()))
}

/// Formats an ISO-8601 timestamp for display.
///
/// Unparseable values are shown as they are.
#[must_use]
pub fn display_timestamp(ts: &str) -> String {
    parse_timestamp(ts).map_or_else(
        || ts.to_owned(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

/// A parameterized HTML document.
///
/// The placeholders `{{TITLE}}`, `{{SUMMARY}}`, `{{SESSION_ID}}`, `{{CWD}}`,
/// `{{TIMESTAMP}}` and `{{MESSAGES}}` are each replaced once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
}

/// Templates compiled into the binary, by name.
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("default", include_str!("../templates/default.html")),
    ("compact", include_str!("../templates/compact.html")),
];

impl Template {
    /// Loads the template called `name`.
    ///
    /// `<dir>/<name>.html` is read when it exists. Otherwise, or when no
    /// directory is given, a built-in template of that name is used.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::TemplateNotFound`] if there is neither a file
    /// nor a built-in template, or [`RenderError::ReadTemplate`] if the file
    /// cannot be read.
    pub fn load(dir: Option<&Path>, name: &str) -> Result<Self, RenderError> {
        let file_name = format!("{name}.html");
        if let Some(dir) = dir {
            let path = dir.join(&file_name);
            if path.is_file() {
                let source = std::fs::read_to_string(&path).context(ReadTemplateSnafu { path: &path })?;
                return Ok(Self { source });
            }
            return Self::builtin(name).context(TemplateNotFoundSnafu { path });
        }
        Self::builtin(name).context(TemplateNotFoundSnafu { path: file_name })
    }

    /// Returns the built-in template called `name`, if there is one.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        BUILTIN_TEMPLATES
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, source)| Self::from_source(*source))
    }

    /// Creates a template from its text.
    #[must_use]
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Replaces the first occurrence of each token in a single pass.
    ///
    /// Substituted values are never rescanned, so a title containing
    /// `{{CWD}}` stays literal.
    fn substitute(&self, values: &[(&str, &str)]) -> String {
        let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
        let mut out = String::with_capacity(self.source.len() + extra);
        let mut used = vec![false; values.len()];
        let mut rest = self.source.as_str();

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let hit = values
                .iter()
                .enumerate()
                .find(|(i, (token, _))| !used[*i] && tail.starts_with(token));
            if let Some((i, (token, value))) = hit {
                used[i] = true;
                out.push_str(value);
                rest = &tail[token.len()..];
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

/// Renders a context as an HTML document.
///
/// # Errors
///
/// Returns an error if a message body cannot be formatted.
pub fn render_html(ctx: &RenderContext<'_>, template: &Template) -> Result<String, RenderError> {
    let mut messages = String::new();

    for (boundary, message) in ctx.messages() {
        if let Some(label) = boundary {
            write!(messages, "\n<div class=\"session-divider\">{}</div>\n", escape_html(label)).unwrap();
        }

        let formatted = format_content(message.content, Target::Html).context(FormatSnafu)?;
        let icon = if message.role == "user" {
            "user-icon"
        } else if formatted.has_tools {
            "wrench-icon"
        } else {
            "robot-icon"
        };
        let role = escape_html(message.role);

        write!(
            messages,
            r#"
<div class="message {role}">
    <div class="message-header">
        <span class="message-role"><span class="message-icon {icon}"></span>{role}</span>
        <span class="message-timestamp">{timestamp}</span>
    </div>
    <div class="message-content">{markup}</div>
</div>
"#,
            timestamp = escape_html(&message.timestamp),
            markup = formatted.markup,
        )
        .unwrap();
    }

    let title = escape_html(ctx.title);
    let session_id = escape_html(ctx.session_id);
    let cwd = escape_html(ctx.cwd);
    let timestamp = escape_html(&display_timestamp(ctx.timestamp));

    Ok(template.substitute(&[
        ("{{TITLE}}", title.as_str()),
        ("{{SUMMARY}}", title.as_str()),
        ("{{SESSION_ID}}", session_id.as_str()),
        ("{{CWD}}", cwd.as_str()),
        ("{{TIMESTAMP}}", timestamp.as_str()),
        ("{{MESSAGES}}", messages.as_str()),
    ]))
}

/// Renders a context as a Markdown document.
///
/// Images are written into `assets` when given, otherwise inlined.
///
/// # Errors
///
/// Returns an error if an image cannot be decoded or written.
pub fn render_markdown(ctx: &RenderContext<'_>, assets: Option<&Path>) -> Result<String, RenderError> {
    let mut out = String::new();

    writeln!(out, "# {}\n", escape_markdown(ctx.title)).unwrap();
    writeln!(out, "- **Session ID:** {}", escape_markdown(ctx.session_id)).unwrap();
    writeln!(out, "- **Working Directory:** {}", escape_markdown(ctx.cwd)).unwrap();
    writeln!(out, "- **Date:** {}\n", display_timestamp(ctx.timestamp)).unwrap();
    writeln!(out, "---\n").unwrap();

    for (boundary, message) in ctx.messages() {
        if let Some(label) = boundary {
            writeln!(out, "> **{}**\n", escape_markdown(label)).unwrap();
        }

        let formatted = format_content(message.content, Target::Markdown { assets }).context(FormatSnafu)?;
        let heading = if message.role == "user" {
            "👤 User"
        } else {
            "🤖 Assistant"
        };

        writeln!(out, "## {heading}\n").unwrap();
        if !message.timestamp.is_empty() {
            writeln!(out, "*{}*\n", message.timestamp).unwrap();
        }
        writeln!(out, "{}\n", formatted.markup.trim()).unwrap();
        writeln!(out, "---\n").unwrap();
    }

    Ok(out)
}
