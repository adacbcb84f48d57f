// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for ccsession.
//!
//! This binary provides the `ccsession` command for exporting the Claude
//! Code sessions of the current project to HTML or Markdown.

use ccsession::config::{self, CliOverrides, ExportConfig};
use ccsession::export::{self, Mode, Outcome};
use lexopt::prelude::*;
use snafu::prelude::*;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Default, PartialEq, Eq)]
struct Cli {
    merge: bool,
    markdown: bool,
    template: Option<String>,
    project: Option<String>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    quiet: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(Cli),
    Help,
    Version,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("failed to determine current directory: {source}"))]
    CurrentDir { source: std::io::Error },

    #[snafu(display("{source}"))]
    Config { source: config::ConfigError },

    #[snafu(display("{source}"))]
    Export { source: export::Error },
}

fn print_help() {
    println!(
        "\
{name} {version}
Export Claude Code sessions to HTML or Markdown

Usage: {name} [OPTIONS]

Options:
      --merge              Merge all sessions into a single document (chronological order)
      --template <NAME>    Use template <template-dir>/<NAME>.html (default: default)
      --project <NAME>     Use ~/.claude/projects/<NAME> instead of the current directory
      --markdown           Write Markdown instead of HTML (--template is ignored)
  -o, --output <DIR>       Output directory (default: {output})
      --config <PATH>      Read settings from PATH instead of the default config file
  -q, --quiet              Only report warnings and errors
  -h, --help               Print help
  -V, --version            Print version

Examples:
  {name}                        # Export each session to a separate HTML file
  {name} --merge                # Merge all sessions into one HTML file
  {name} --template compact     # Use the compact.html template
  {name} --markdown --merge     # Merge all sessions into one Markdown file

Templates are read from ${env} when set; the built-in default and compact
templates are used otherwise.",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        output = config::DEFAULT_OUTPUT_DIR,
        env = config::TEMPLATE_DIR_ENV,
    );
}

fn parse_args<I>(args: I) -> Result<Command, lexopt::Error>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let mut cli = Cli::default();

    let mut parser = lexopt::Parser::from_iter(args);
    while let Some(arg) = parser.next()? {
        match arg {
            Long("merge") => cli.merge = true,
            Long("markdown") => cli.markdown = true,
            Long("template") => cli.template = Some(parser.value()?.string()?),
            Long("project") => cli.project = Some(parser.value()?.string()?),
            Short('o') | Long("output") => cli.output = Some(parser.value()?.into()),
            Long("config") => cli.config = Some(parser.value()?.into()),
            Short('q') | Long("quiet") => cli.quiet = true,
            Short('h') | Long("help") => return Ok(Command::Help),
            Short('V') | Long("version") => return Ok(Command::Version),
            // Unknown options and stray arguments are ignored, along with
            // an attached `=value`
            Short(_) | Long(_) => {
                parser.optional_value();
            }
            Value(_) => {}
        }
    }

    Ok(Command::Run(cli))
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), Error> {
    let file_cfg = config::load_file_config(cli.config.as_deref()).context(ConfigSnafu)?;
    let current_dir = std::env::current_dir().context(CurrentDirSnafu)?;

    let overrides = CliOverrides {
        output_dir: cli.output,
        template: cli.template,
        project: cli.project,
        markdown: cli.markdown,
    };
    let config = ExportConfig::resolve(overrides, file_cfg, current_dir).context(ConfigSnafu)?;

    let mode = if cli.merge { Mode::Merged } else { Mode::Each };
    match export::run(&config, mode).context(ExportSnafu)? {
        Outcome::Each(report) if !report.failed.is_empty() => {
            log::warn!(
                "{} of {} sessions could not be exported",
                report.failed.len(),
                report.failed.len() + report.written.len()
            );
        }
        Outcome::Each(_) | Outcome::Merged(_) => {}
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = match parse_args(std::env::args_os()).context(ParseArgsSnafu) {
        Ok(Command::Run(cli)) => cli,
        Ok(Command::Help) => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Ok(Command::Version) => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
