// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Export configuration.
//!
//! Settings are resolved in order: command-line flag, then the config file
//! (`<config_dir>/ccsession/config.toml` or `--config <path>`), then the
//! built-in default.
//!
//! ```toml
//! output_dir = "/home/me/notes/sessions"
//! template = "compact"
//! markdown = false
//! ```

use serde::Deserialize;
use snafu::prelude::*;
use std::path::{Path, PathBuf};

/// Default output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "/tmp/claude-sessions";

/// Default HTML template name.
pub const DEFAULT_TEMPLATE: &str = "default";

/// Environment variable that overrides the default template directory.
pub const TEMPLATE_DIR_ENV: &str = "CCSESSION_TEMPLATE_DIR";

/// Error type for configuration failures.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[snafu(display("config file not found: {}", path.display()))]
    ConfigNotFound {
        /// The requested path.
        path: PathBuf,
    },

    /// The config file could not be read.
    #[snafu(display("failed to read config {}: {source}", path.display()))]
    ReadConfig {
        /// The config path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this tool.
    #[snafu(display("failed to parse config {}: {source}", path.display()))]
    ParseConfig {
        /// The config path.
        path: PathBuf,
        /// The underlying TOML error.
        source: toml::de::Error,
    },

    /// The sessions directory could not be located.
    #[snafu(display("could not determine the home directory; set projects_dir in config.toml"))]
    NoHomeDir,
}

/// Document format to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// HTML from a template.
    #[default]
    Html,
    /// Markdown with image side files.
    Markdown,
}

impl OutputFormat {
    /// File extension for documents in this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Markdown => "md",
        }
    }
}

/// Settings read from the config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileConfig {
    /// Root holding one directory of session files per project.
    pub projects_dir: Option<PathBuf>,
    /// Where documents are written.
    pub output_dir: Option<PathBuf>,
    /// Where HTML templates are looked up.
    pub template_dir: Option<PathBuf>,
    /// HTML template name.
    pub template: Option<String>,
    /// Produce Markdown instead of HTML.
    pub markdown: Option<bool>,
}

/// Settings given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// `--output <dir>`.
    pub output_dir: Option<PathBuf>,
    /// `--template <name>`.
    pub template: Option<String>,
    /// `--project <name>`.
    pub project: Option<String>,
    /// `--markdown`.
    pub markdown: bool,
}

/// Fully resolved settings for one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Root holding one directory of session files per project.
    pub projects_dir: PathBuf,
    /// Where documents (and Markdown image side files) are written.
    pub output_dir: PathBuf,
    /// Where HTML templates are looked up. Built-in templates are used
    /// when unset or when the named file is missing.
    pub template_dir: Option<PathBuf>,
    /// HTML template name, without the `.html` extension.
    pub template: String,
    /// Document format.
    pub format: OutputFormat,
    /// Project directory name overriding the one derived from `current_dir`.
    pub project: Option<String>,
    /// The directory the tool was started from.
    pub current_dir: PathBuf,
}

impl ExportConfig {
    /// Combines command-line flags, the config file and defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDir`] if no projects directory is
    /// configured and the home directory is unknown.
    pub fn resolve(cli: CliOverrides, file: FileConfig, current_dir: PathBuf) -> Result<Self, ConfigError> {
        let projects_dir = match file.projects_dir {
            Some(dir) => dir,
            None => default_projects_dir().context(NoHomeDirSnafu)?,
        };

        let format = if cli.markdown || file.markdown.unwrap_or(false) {
            OutputFormat::Markdown
        } else {
            OutputFormat::Html
        };

        Ok(Self {
            projects_dir,
            output_dir: cli
                .output_dir
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            template_dir: file.template_dir.or_else(default_template_dir),
            template: cli
                .template
                .or(file.template)
                .unwrap_or_else(|| DEFAULT_TEMPLATE.to_owned()),
            format,
            project: cli.project,
            current_dir,
        })
    }
}

/// `~/.claude/projects`.
#[must_use]
pub fn default_projects_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude").join("projects"))
}

/// Template directory used when none is configured: `$CCSESSION_TEMPLATE_DIR`.
#[must_use]
pub fn default_template_dir() -> Option<PathBuf> {
    std::env::var_os(TEMPLATE_DIR_ENV).map(PathBuf::from)
}

/// Loads the config file.
///
/// With an explicit path the file must exist. Otherwise the default
/// location is tried and a missing file yields an empty config.
///
/// # Errors
///
/// Returns an error if the file is missing (explicit path only),
/// unreadable, or not valid TOML.
pub fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let path = if let Some(p) = explicit_path {
        ensure!(p.exists(), ConfigNotFoundSnafu { path: p });
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("ccsession").join("config.toml"))
            .filter(|p| p.exists())
    };

    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    log::debug!("Loading config from {}", path.display());
    let content = std::fs::read_to_string(&path).context(ReadConfigSnafu { path: &path })?;
    toml::from_str(&content).context(ParseConfigSnafu { path })
}
