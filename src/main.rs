//! Application entry point.
//!
//! Parses command-line arguments and delegates execution to [`runner::run`].

use azstack::manifest::ManifestError;
use azstack::{cli::Cli, runner};
use clap::Parser;
use miette::{Diagnostic, GraphicalReportHandler};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt;

/// Render the first diagnostic in `err`'s chain, if it carries one.
fn render_diagnostic(err: &anyhow::Error) -> Option<String> {
    let diagnostic: &dyn Diagnostic = err.chain().find_map(|cause| {
        cause
            .downcast_ref::<ManifestError>()
            .map(|d| d as &dyn Diagnostic)
            .or_else(|| {
                cause
                    .downcast_ref::<runner::RunnerError>()
                    .map(|d| d as &dyn Diagnostic)
            })
    })?;
    let mut out = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut out, diagnostic)
        .ok()?;
    Some(out)
}

fn main() -> ExitCode {
    let cli = Cli::parse().with_default_command();
    let max_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::ERROR
    };
    fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .init();
    match runner::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match render_diagnostic(&err) {
                Some(report) => tracing::error!("{err:#}\n{report}"),
                None => tracing::error!("{err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
