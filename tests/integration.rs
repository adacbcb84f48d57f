// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Integration tests for ccsession exporting.

use base64::prelude::*;
use ccsession::config::{ExportConfig, OutputFormat};
use ccsession::export::{self, Mode, Outcome};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PROJECT: &str = "-home-me-app";

/// A fake `~/.claude/projects` tree plus an output directory.
struct Fixture {
    root: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            root: tempfile::tempdir().expect("Failed to create temp dir"),
        };
        fs::create_dir_all(fixture.project_dir()).unwrap();
        fixture
    }

    fn project_dir(&self) -> PathBuf {
        self.root.path().join("projects").join(PROJECT)
    }

    fn output_dir(&self) -> PathBuf {
        self.root.path().join("out").join("nested")
    }

    fn add_session(&self, id: &str, lines: &[&str]) {
        fs::write(self.project_dir().join(format!("{id}.jsonl")), lines.join("\n")).unwrap();
    }

    fn config(&self, format: OutputFormat) -> ExportConfig {
        ExportConfig {
            projects_dir: self.root.path().join("projects"),
            output_dir: self.output_dir(),
            template_dir: Some(Path::new(env!("CARGO_MANIFEST_DIR")).join("templates")),
            template: "default".into(),
            format,
            project: None,
            current_dir: "/home/me/app".into(),
        }
    }

    fn outputs(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.output_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<_> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn user_line(text: &str, ts: &str) -> String {
    format!(r#"{{"type":"user","message":{{"role":"user","content":"{text}"}},"timestamp":"{ts}","cwd":"/home/me/app"}}"#)
}

/// The documented scenario: a summary title and an escaped user message.
#[test]
fn exports_demo_session_to_html() {
    let fx = Fixture::new();
    fx.add_session(
        "demo",
        &[
            r#"{"type":"summary","summary":"Demo"}"#,
            r#"{"type":"user","message":{"role":"user","content":"Hi <b>there</b>"},"timestamp":"2024-01-01T00:00:00Z"}"#,
        ],
    );

    let outcome = export::run(&fx.config(OutputFormat::Html), Mode::Each).unwrap();
    let Outcome::Each(report) = outcome else {
        panic!("Expected per-file outcome");
    };
    assert_eq!(report.written.len(), 1);
    assert!(report.failed.is_empty());

    let html = fs::read_to_string(fx.output_dir().join("demo.html")).unwrap();
    assert!(html.contains("<title>Demo</title>"));
    assert_eq!(html.matches(r#"<div class="message user">"#).count(), 1);
    assert!(html.contains("Hi &lt;b&gt;there&lt;/b&gt;"));
    assert!(html.contains("<dd>Unknown</dd>"), "working directory should default");
    assert!(!html.contains("{{"), "all placeholders should be replaced");
}

#[test]
fn per_file_export_skips_malformed_session() {
    let fx = Fixture::new();
    fx.add_session("one", &[&user_line("first", "2024-01-01T00:00:00Z")]);
    fx.add_session("two", &[&user_line("second", "2024-01-02T00:00:00Z"), "{not json"]);
    fx.add_session("three", &[&user_line("third", "2024-01-03T00:00:00Z")]);

    let Outcome::Each(report) = export::run(&fx.config(OutputFormat::Html), Mode::Each).unwrap() else {
        panic!("Expected per-file outcome");
    };

    assert_eq!(report.written.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("two.jsonl"));
    assert!(matches!(report.failed[0].1, export::Error::ParseFile { .. }));
    assert_eq!(fx.outputs(), ["one.html", "three.html"]);
}

#[test]
fn merged_export_aborts_on_malformed_session() {
    let fx = Fixture::new();
    fx.add_session("one", &[&user_line("first", "2024-01-01T00:00:00Z")]);
    fx.add_session("two", &["{not json"]);
    fx.add_session("three", &[&user_line("third", "2024-01-03T00:00:00Z")]);

    let result = export::run(&fx.config(OutputFormat::Html), Mode::Merged);

    assert!(matches!(result, Err(export::Error::ParseFile { .. })));
    assert!(fx.outputs().is_empty(), "merge should write nothing");
}

#[test]
fn merged_export_orders_sessions_chronologically() {
    let fx = Fixture::new();
    // Listing order (a, b, c) differs from chronological order (c, a, b)
    fx.add_session("a", &[&user_line("middle", "2024-02-01T00:00:00Z")]);
    fx.add_session("b", &[&user_line("latest", "2024-03-01T00:00:00Z")]);
    fx.add_session("c", &[&user_line("earliest", "2024-01-01T00:00:00Z")]);

    let Outcome::Merged(path) = export::run(&fx.config(OutputFormat::Html), Mode::Merged).unwrap() else {
        panic!("Expected merged outcome");
    };

    assert_eq!(path, fx.output_dir().join("app.html"));
    let html = fs::read_to_string(&path).unwrap();

    let earliest = html.find(">earliest<").unwrap();
    let middle = html.find(">middle<").unwrap();
    let latest = html.find(">latest<").unwrap();
    assert!(earliest < middle && middle < latest);

    assert!(html.contains("<title>app - All Sessions</title>"));
    assert!(html.contains("Session 2: a"));
    assert!(html.contains("Session 3: b"));
    assert!(html.contains("/home/me/app"));
}

#[test]
fn markdown_export_writes_image_side_files() {
    let fx = Fixture::new();
    let image = BASE64_STANDARD.encode(b"\x89PNG fake");
    let line = format!(
        r#"{{"type":"assistant","message":{{"role":"assistant","content":[{{"type":"text","text":"Look:"}},{{"type":"image","source":{{"type":"base64","media_type":"image/png","data":"{image}"}}}}]}},"timestamp":"2024-01-01T00:00:00Z"}}"#
    );
    fx.add_session("pic", &[&line]);

    export::run(&fx.config(OutputFormat::Markdown), Mode::Each).unwrap();

    let outputs = fx.outputs();
    assert_eq!(outputs.len(), 2);
    assert!(outputs.contains(&"pic.md".to_owned()));
    let image_name = outputs.iter().find(|n| n.ends_with(".png")).unwrap();
    assert_eq!(fs::read(fx.output_dir().join(image_name)).unwrap(), b"\x89PNG fake");

    let md = fs::read_to_string(fx.output_dir().join("pic.md")).unwrap();
    assert!(md.starts_with("# Claude Code Session\n"));
    assert!(md.contains("## 🤖 Assistant"));
    assert!(md.contains(&format!("![Image]({image_name})")));
}

#[test]
fn tool_results_render_as_assistant_messages() {
    let fx = Fixture::new();
    fx.add_session(
        "tools",
        &[
            r#"{"type":"assistant","message":{"role":"assistant","content":[{"type":"tool_use","id":"t1","name":"Bash","input":{"command":"ls"}}]},"timestamp":"2024-01-01T00:00:00Z"}"#,
            r#"{"type":"user","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"t1","content":"file.txt"}]},"timestamp":"2024-01-01T00:00:01Z"}"#,
        ],
    );

    export::run(&fx.config(OutputFormat::Html), Mode::Each).unwrap();
    let html = fs::read_to_string(fx.output_dir().join("tools.html")).unwrap();

    assert!(!html.contains(r#"<div class="message user">"#));
    assert_eq!(html.matches(r#"<div class="message assistant">"#).count(), 2);
    assert_eq!(html.matches("message-icon wrench-icon").count(), 2);
    assert!(html.contains("🔧 Tool: Bash"));
    assert!(html.contains("file.txt"));
}

/// Every session is reported as failed, but the batch itself succeeds.
#[test]
fn missing_template_fails_each_session() {
    let fx = Fixture::new();
    fx.add_session("one", &[&user_line("first", "2024-01-01T00:00:00Z")]);
    fx.add_session("two", &[&user_line("second", "2024-01-02T00:00:00Z")]);
    let mut config = fx.config(OutputFormat::Html);
    config.template = "does-not-exist".into();

    let Outcome::Each(report) = export::run(&config, Mode::Each).unwrap() else {
        panic!("Expected per-file outcome");
    };

    assert!(report.written.is_empty());
    assert_eq!(report.failed.len(), 2);
    for (_, err) in &report.failed {
        assert!(matches!(err, export::Error::TemplateUnavailable { template } if template == "does-not-exist"));
    }
    assert!(fx.outputs().is_empty());
}

#[test]
fn missing_template_aborts_merge() {
    let fx = Fixture::new();
    fx.add_session("one", &[&user_line("first", "2024-01-01T00:00:00Z")]);
    let mut config = fx.config(OutputFormat::Html);
    config.template = "does-not-exist".into();

    let err = export::run(&config, Mode::Merged).unwrap_err();

    assert!(err.to_string().contains("does-not-exist.html"));
    assert!(fx.outputs().is_empty());
}

/// Markdown output never loads a template.
#[test]
fn markdown_export_ignores_template_name() {
    let fx = Fixture::new();
    fx.add_session("one", &[&user_line("first", "2024-01-01T00:00:00Z")]);
    let mut config = fx.config(OutputFormat::Markdown);
    config.template = "does-not-exist".into();

    let Outcome::Each(report) = export::run(&config, Mode::Each).unwrap() else {
        panic!("Expected per-file outcome");
    };

    assert!(report.failed.is_empty());
    assert_eq!(fx.outputs(), ["one.md"]);
}

/// Without a template directory the built-in default template is used.
#[test]
fn exports_with_builtin_template() {
    let fx = Fixture::new();
    fx.add_session("one", &[&user_line("first", "2024-01-01T00:00:00Z")]);
    let mut config = fx.config(OutputFormat::Html);
    config.template_dir = None;

    let Outcome::Each(report) = export::run(&config, Mode::Each).unwrap() else {
        panic!("Expected per-file outcome");
    };

    assert!(report.failed.is_empty());
    let html = fs::read_to_string(fx.output_dir().join("one.html")).unwrap();
    assert!(html.contains("function toggleTool"));
    assert!(html.contains(">first<"));
}

#[test]
fn missing_project_directory_is_reported() {
    let fx = Fixture::new();
    let mut config = fx.config(OutputFormat::Html);
    config.current_dir = "/home/me/other".into();

    let err = export::run(&config, Mode::Each).unwrap_err();

    assert!(matches!(err, export::Error::ProjectNotFound { .. }));
    assert!(err.to_string().contains(PROJECT));
}

#[test]
fn project_without_sessions_is_reported() {
    let fx = Fixture::new();

    let err = export::run(&fx.config(OutputFormat::Html), Mode::Each).unwrap_err();

    assert!(matches!(err, export::Error::NoSessionsFound { .. }));
}

#[test]
fn shipped_templates_contain_every_placeholder() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
    for name in ["default.html", "compact.html"] {
        let template = fs::read_to_string(dir.join(name)).unwrap();
        for token in [
            "{{TITLE}}",
            "{{SUMMARY}}",
            "{{SESSION_ID}}",
            "{{CWD}}",
            "{{TIMESTAMP}}",
            "{{MESSAGES}}",
        ] {
            assert_eq!(template.matches(token).count(), 1, "{token} in {name}");
        }
    }
}
