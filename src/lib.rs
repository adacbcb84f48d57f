// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Export Claude Code session transcripts to HTML or Markdown.
//!
//! Claude Code stores every conversation as a line-delimited JSON file under
//! `~/.claude/projects/<project>/`. This crate turns those transcripts into
//! standalone documents for reading and archiving.
//!
//! # Overview
//!
//! 1. [`parser`] reads the transcript into typed records
//! 2. [`format`] renders message content (text, images, tool calls) as markup
//! 3. [`session`] derives titles and timestamps, and merges sessions
//! 4. [`renderer`] produces the HTML or Markdown document
//! 5. [`export`] finds session files and writes the results
//!
//! # Example
//!
//! ```
//! use ccsession::parser::parse_session;
//! use ccsession::renderer::{render_markdown, RenderContext};
//! use ccsession::session::Session;
//!
//! let text = r#"{"type":"user","message":{"role":"user","content":"Hello!"},"timestamp":"2024-01-01T00:00:00Z"}"#;
//! let session = Session::new("abc", parse_session(text).unwrap());
//! let meta = session.meta();
//!
//! let markdown = render_markdown(&RenderContext::for_session(&session, &meta), None).unwrap();
//!
//! assert!(markdown.starts_with("# Claude Code Session"));
//! assert!(markdown.contains("Hello!"));
//! ```
//!
//! # Modules
//!
//! - [`config`]: settings from flags, config file and defaults
//! - [`export`]: project resolution and per-file or merged export
//! - [`format`]: content formatting and escaping
//! - [`parser`]: transcript parsing and record types
//! - [`renderer`]: HTML template substitution and Markdown assembly
//! - [`session`]: session metadata and chronological merging

#![deny(missing_docs)]

pub mod config;
pub mod export;
pub mod format;
pub mod parser;
pub mod renderer;
pub mod session;
