// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Locating session files and writing exported documents.
//!
//! Session files live in `<projects_dir>/<project>/*.jsonl`, where the
//! project directory name is the working directory with every path
//! separator replaced by `-` (`/home/me/app` → `-home-me-app`).
//!
//! Two modes are offered. [`export_each`] writes one document per session
//! and keeps going when a file fails. [`export_merged`] writes a single
//! document for the whole project and aborts on the first failure.

use crate::config::{ExportConfig, OutputFormat};
use crate::parser::{self, parse_session};
use crate::renderer::{self, RenderContext, Template, render_html, render_markdown};
use crate::session::{self, Session};
use log::{debug, error, info};
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of session transcript files.
pub const SESSION_EXTENSION: &str = "jsonl";

/// Error type for export failures.
#[derive(Debug, Snafu)]
pub enum Error {
    /// The project's session directory does not exist.
    #[snafu(display(
        "no sessions found for project {project}\nexpected path: {}\n{}",
        path.display(),
        describe_available(available)
    ))]
    ProjectNotFound {
        /// The project name that was looked up.
        project: String,
        /// The directory that was expected.
        path: PathBuf,
        /// Project directories that do exist.
        available: Vec<String>,
    },

    /// The project directory holds no session files.
    #[snafu(display("no session files found in {}", path.display()))]
    NoSessionsFound {
        /// The project directory.
        path: PathBuf,
    },

    /// The project directory could not be listed.
    #[snafu(display("failed to list {}: {source}", path.display()))]
    ListSessions {
        /// The project directory.
        path: PathBuf,
        /// The underlying directory walk error.
        source: walkdir::Error,
    },

    /// The output directory could not be created.
    #[snafu(display("failed to create output directory {}: {source}", path.display()))]
    CreateOutputDir {
        /// The output directory.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A session file could not be read.
    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        /// The session file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A session file holds a malformed record.
    #[snafu(display("failed to parse {}: {source}", path.display()))]
    ParseFile {
        /// The session file.
        path: PathBuf,
        /// The underlying parse error.
        source: parser::ParseError,
    },

    /// The HTML template could not be loaded.
    #[snafu(display("{source}"))]
    LoadTemplate {
        /// The underlying render error.
        source: renderer::RenderError,
    },

    /// A session was skipped because the HTML template failed to load.
    #[snafu(display("template {template} is unavailable"))]
    TemplateUnavailable {
        /// The template name.
        template: String,
    },

    /// A document could not be rendered.
    #[snafu(display("failed to render {}: {source}", path.display()))]
    Render {
        /// The document being rendered.
        path: PathBuf,
        /// The underlying render error.
        source: renderer::RenderError,
    },

    /// A document could not be written.
    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        /// The output path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

fn describe_available(available: &[String]) -> String {
    if available.is_empty() {
        "no projects with sessions exist".to_owned()
    } else {
        format!("available projects:\n  {}", available.join("\n  "))
    }
}

/// A project whose session directory exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Display name, used for merged output.
    pub name: String,
    /// Directory holding the session files.
    pub dir: PathBuf,
}

/// Which documents to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One document per session.
    Each,
    /// One document for all sessions of the project.
    Merged,
}

/// What a run produced.
#[derive(Debug)]
pub enum Outcome {
    /// Result of [`export_each`].
    Each(ExportReport),
    /// Path of the merged document.
    Merged(PathBuf),
}

/// Result of a per-session export.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Documents written.
    pub written: Vec<PathBuf>,
    /// Session files that failed, with the reason.
    pub failed: Vec<(PathBuf, Error)>,
}

/// Maps a working directory to its project directory name.
#[must_use]
pub fn project_dir_name(path: &Path) -> String {
    path.to_string_lossy()
        .chars()
        .map(|c| if std::path::is_separator(c) { '-' } else { c })
        .collect()
}

/// Finds the session directory for the configured project.
///
/// # Errors
///
/// Returns [`Error::ProjectNotFound`] if the directory does not exist.
pub fn resolve_project(config: &ExportConfig) -> Result<Project, Error> {
    let (name, dir_name) = match &config.project {
        Some(project) => (project.clone(), project.clone()),
        None => (
            config.current_dir.file_name().map_or_else(
                || project_dir_name(&config.current_dir),
                |n| n.to_string_lossy().into_owned(),
            ),
            project_dir_name(&config.current_dir),
        ),
    };

    let dir = config.projects_dir.join(&dir_name);
    debug!("Resolved project {name} to {}", dir.display());
    ensure!(
        dir.is_dir(),
        ProjectNotFoundSnafu {
            project: &name,
            path: &dir,
            available: available_projects(&config.projects_dir),
        }
    );

    Ok(Project { name, dir })
}

/// Lists project directory names under `projects_dir`, sorted.
fn available_projects(projects_dir: &Path) -> Vec<String> {
    WalkDir::new(projects_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect()
}

/// Lists the session files directly inside `dir`, sorted by name.
///
/// # Errors
///
/// Returns [`Error::NoSessionsFound`] if there are none, or
/// [`Error::ListSessions`] if the directory cannot be read.
pub fn list_sessions(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.context(ListSessionsSnafu { path: dir })?;
        if !entry.file_type().is_dir()
            && entry
                .path()
                .extension()
                .is_some_and(|ext| ext == SESSION_EXTENSION)
        {
            files.push(entry.into_path());
        }
    }

    ensure!(!files.is_empty(), NoSessionsFoundSnafu { path: dir });
    Ok(files)
}

/// Returns a session's identifier: its file name without extension.
#[must_use]
pub fn session_id(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| path.to_string_lossy(), |s| s.to_string_lossy())
        .into_owned()
}

/// Reads and parses one session file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds a malformed record.
pub fn read_session(path: &Path) -> Result<Session, Error> {
    let text = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
    let records = parse_session(&text).context(ParseFileSnafu { path })?;
    Ok(Session::new(session_id(path), records))
}

/// How documents are rendered for this run.
enum Output {
    Html(Template),
    Markdown,
}

impl Output {
    fn prepare(config: &ExportConfig) -> Result<Self, Error> {
        Ok(match config.format {
            OutputFormat::Html => {
                Self::Html(Template::load(config.template_dir.as_deref(), &config.template).context(LoadTemplateSnafu)?)
            }
            OutputFormat::Markdown => Self::Markdown,
        })
    }

    fn write(&self, ctx: &RenderContext<'_>, out_dir: &Path, name: &str) -> Result<PathBuf, Error> {
        let (document, ext) = match self {
            Self::Html(template) => (render_html(ctx, template), OutputFormat::Html.extension()),
            Self::Markdown => (render_markdown(ctx, Some(out_dir)), OutputFormat::Markdown.extension()),
        };
        let path = out_dir.join(format!("{name}.{ext}"));
        let document = document.context(RenderSnafu { path: &path })?;
        std::fs::write(&path, document).context(WriteFileSnafu { path: &path })?;
        Ok(path)
    }
}

/// Creates the output directory, including missing parents.
fn ensure_output_dir(dir: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(dir).context(CreateOutputDirSnafu { path: dir })
}

/// Exports each session file to its own document.
///
/// A file that fails is logged and recorded in the report; the remaining
/// files are still exported. If the HTML template cannot be loaded, the
/// error is logged once and every file is recorded as failed.
///
/// # Errors
///
/// Returns an error only if the output directory cannot be created.
pub fn export_each(config: &ExportConfig, files: &[PathBuf]) -> Result<ExportReport, Error> {
    ensure_output_dir(&config.output_dir)?;

    info!("Exporting {} individual sessions...", files.len());
    let mut report = ExportReport::default();
    let output = match Output::prepare(config) {
        Ok(output) => output,
        Err(e) => {
            error!("{e}; skipping {} session(s)", files.len());
            report.failed = files
                .iter()
                .map(|file| {
                    let template = config.template.clone();
                    (file.clone(), Error::TemplateUnavailable { template })
                })
                .collect();
            return Ok(report);
        }
    };

    for (i, file) in files.iter().enumerate() {
        info!("   [{}/{}] Processing {}...", i + 1, files.len(), session_id(file));
        match export_one(file, config, &output) {
            Ok(path) => {
                info!("Exported session to: {}", path.display());
                report.written.push(path);
            }
            Err(e) => {
                error!("Error exporting {}: {e}", file.display());
                report.failed.push((file.clone(), e));
            }
        }
    }

    info!("All sessions exported to: {}", config.output_dir.display());
    Ok(report)
}

fn export_one(file: &Path, config: &ExportConfig, output: &Output) -> Result<PathBuf, Error> {
    let session = read_session(file)?;
    let meta = session.meta();
    let ctx = RenderContext::for_session(&session, &meta);
    output.write(&ctx, &config.output_dir, &session.id)
}

/// Exports all session files of a project into one chronological document.
///
/// # Errors
///
/// Any failure aborts the whole merge. Nothing is written unless every
/// session was read and parsed.
pub fn export_merged(config: &ExportConfig, project_name: &str, files: &[PathBuf]) -> Result<PathBuf, Error> {
    info!("Merging {} sessions chronologically...", files.len());

    let sessions = files
        .iter()
        .map(|f| read_session(f))
        .collect::<Result<Vec<_>, _>>()?;

    ensure_output_dir(&config.output_dir)?;
    let output = Output::prepare(config)?;

    let merged = session::merge(project_name, sessions);
    let ctx = RenderContext::for_merged(project_name, &merged);
    let path = output.write(&ctx, &config.output_dir, project_name)?;

    info!("Merged session exported to: {}", path.display());
    Ok(path)
}

/// Resolves the project, lists its sessions and exports them.
///
/// # Errors
///
/// Returns an error if the project or its sessions cannot be found, or if
/// any fatal export error occurs (see [`export_each`] and
/// [`export_merged`]).
pub fn run(config: &ExportConfig, mode: Mode) -> Result<Outcome, Error> {
    let project = resolve_project(config)?;
    info!("Looking for Claude sessions in: {}", project.name);

    let files = list_sessions(&project.dir)?;
    info!("Found {} session(s) for {}", files.len(), project.name);

    match mode {
        Mode::Each => export_each(config, &files).map(Outcome::Each),
        Mode::Merged => export_merged(config, &project.name, &files).map(Outcome::Merged),
    }
}
