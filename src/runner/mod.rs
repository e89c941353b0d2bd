//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! loads the Stackfile, builds and validates the resource graph, and then
//! either reports on it or hands the generated program to the engine.

mod engine;
mod error;
mod io;
mod redaction;

pub use engine::{Engine, EngineAction, PULUMI_PROGRAM, resolve_pulumi_program};
pub use engine_env::PULUMI_ENV;
pub use error::RunnerError;
pub use io::{is_stdout_path, write_stdout, write_text_file};
pub use redaction::{CommandArg, redact_argument, redact_sensitive_args};

use crate::ast::{DeploymentMode, StackManifest};
use crate::cli::{Cli, Commands};
use crate::hasher::GraphHasher;
use crate::ir::{
    BuildContext, PreviewAttributes, Resolution, ResourceGraph, ResourceKind, apply_waves,
    teardown_waves,
};
use crate::{dot_gen, manifest, program_gen};
use anyhow::{Context, Result};
use itertools::Itertools;
use mockable::DefaultEnv;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the generated engine program.
pub const PROGRAM_FILE: &str = "Pulumi.yaml";

/// Placeholder printed for outputs only known after deployment.
pub const COMPUTED: &str = "<computed>";

const REFERENCE_STACK: &str = include_str!("../../Stackfile");
const IMPORT_STACK: &str = include_str!("../../stacks/import.yml");
const FIXED_NAMES_STACK: &str = include_str!("../../stacks/fixed-names.yml");

/// Execute the parsed [`Cli`] command.
///
/// # Errors
///
/// Returns an error if the Stackfile cannot be loaded, the graph is invalid,
/// output cannot be written, or the engine fails.
pub fn run(cli: &Cli) -> Result<()> {
    let command = cli.command.clone().unwrap_or(Commands::Plan);
    match command {
        Commands::Check => write_stdout(&summary(&load_graph(cli)?)),
        Commands::Plan => write_stdout(&plan(&load_graph(cli)?)?),
        Commands::Emit { file } => {
            let program = program_gen::generate(&load_graph(cli)?);
            if is_stdout_path(&file) {
                write_stdout(&program)
            } else {
                write_text_file(&resolve_output_path(cli, &file), &program)
            }
        }
        Commands::Graph => write_stdout(&dot_gen::generate(&load_graph(cli)?)),
        Commands::Outputs => write_stdout(&outputs(&load_graph(cli)?)),
        Commands::Init {
            mode,
            fixed_names,
            force,
            file,
        } => init(&resolve_output_path(cli, &file), mode, fixed_names, force),
        Commands::Preview => deploy(cli, EngineAction::Preview),
        Commands::Up => deploy(cli, EngineAction::Up),
        Commands::Destroy => deploy(cli, EngineAction::Destroy),
    }
}

/// Determine the Stackfile path respecting the CLI's directory option.
fn resolve_manifest_path(cli: &Cli) -> PathBuf {
    cli.directory
        .as_ref()
        .map_or_else(|| cli.file.clone(), |dir| dir.join(&cli.file))
}

/// Resolve an output path relative to the CLI working directory.
fn resolve_output_path<'a>(cli: &Cli, path: &'a Path) -> Cow<'a, Path> {
    match &cli.directory {
        Some(dir) if path.is_relative() => Cow::Owned(dir.join(path)),
        _ => Cow::Borrowed(path),
    }
}

fn load_manifest(cli: &Cli, path: &Path) -> Result<StackManifest> {
    if !path.exists() {
        let directory = cli.directory.as_ref().map_or_else(
            || "the current directory".to_owned(),
            |dir| dir.display().to_string(),
        );
        return Err(RunnerError::ManifestNotFound {
            path: path.to_path_buf(),
            directory,
        }
        .into());
    }
    let manifest = manifest::from_path(path)
        .with_context(|| format!("loading {}", path.display()))?;
    if tracing::enabled!(tracing::Level::DEBUG) {
        let ast_json =
            serde_json::to_string_pretty(&manifest).context("serialising manifest")?;
        debug!("AST:\n{ast_json}");
    }
    Ok(manifest)
}

/// Load the Stackfile named by `cli` and build its validated graph.
///
/// # Errors
///
/// Returns an error if the Stackfile is missing or invalid, a secret cannot
/// be bound, or the graph breaks a stack rule.
pub fn load_graph(cli: &Cli) -> Result<ResourceGraph> {
    let path = resolve_manifest_path(cli);
    let manifest = load_manifest(cli, &path)?;
    let env = DefaultEnv::new();
    let ctx = BuildContext::new(&env)
        .with_mode(cli.mode)
        .with_naming(cli.naming)
        .with_stack(cli.stack.clone())
        .with_subscription(cli.subscription_id.clone());
    ResourceGraph::from_manifest(&manifest, &ctx).context("building resource graph")
}

fn summary(graph: &ResourceGraph) -> String {
    let resources = graph
        .nodes
        .values()
        .filter(|node| node.kind != ResourceKind::RandomPassword)
        .count();
    format!(
        "{}/{}: {resources} resources, {} secrets, {} outputs\nmode: {}, naming: {}\n",
        graph.project,
        graph.stack,
        graph.secrets.len(),
        graph.outputs.len(),
        label(&graph.mode),
        label(&graph.naming),
    )
}

fn label<T: clap::ValueEnum>(value: &T) -> String {
    value
        .to_possible_value()
        .map_or_else(String::new, |v| v.get_name().to_owned())
}

/// Apply waves followed by the graph digest.
fn plan(graph: &ResourceGraph) -> Result<String> {
    let waves = apply_waves(graph).context("ordering resources")?;
    let digest = GraphHasher::digest(graph).context("hashing resource graph")?;
    let mut out = String::new();
    for (idx, wave) in waves.iter().enumerate() {
        writeln!(out, "wave {}: {}", idx + 1, wave.iter().join(", "))?;
    }
    writeln!(out, "digest: {digest}")?;
    Ok(out)
}

/// Stack outputs as predicted before deployment.
fn outputs(graph: &ResourceGraph) -> String {
    PreviewAttributes::new(graph)
        .outputs()
        .into_iter()
        .map(|(name, resolution)| match resolution {
            Resolution::Known(value) => format!("{name} = {value}\n"),
            Resolution::Pending(_) => format!("{name} = {COMPUTED}\n"),
        })
        .collect()
}

fn starter(mode: DeploymentMode, fixed_names: bool) -> &'static str {
    match (mode, fixed_names) {
        (DeploymentMode::Import, _) => IMPORT_STACK,
        (DeploymentMode::Create, true) => FIXED_NAMES_STACK,
        (DeploymentMode::Create, false) => REFERENCE_STACK,
    }
}

fn init(path: &Path, mode: DeploymentMode, fixed_names: bool, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(RunnerError::AlreadyExists {
            path: path.display().to_string(),
        }
        .into());
    }
    write_text_file(path, starter(mode, fixed_names))
}

/// Write the program into the work directory and drive the engine.
fn deploy(cli: &Cli, action: EngineAction) -> Result<()> {
    let graph = load_graph(cli)?;
    if action == EngineAction::Destroy {
        for (idx, wave) in teardown_waves(&graph)?.iter().enumerate() {
            debug!("teardown wave {}: {}", idx + 1, wave.iter().join(", "));
        }
    }
    let manifest_path = resolve_manifest_path(cli);
    let work_dir = engine::work_dir_for(
        &manifest_path,
        cli.work_dir
            .as_deref()
            .map(|dir| resolve_output_path(cli, dir))
            .as_deref(),
    );
    write_text_file(&work_dir.join(PROGRAM_FILE), &program_gen::generate(&graph))?;
    info!(stack = %graph.stack, ?action, "handing program to the engine");
    let program = resolve_pulumi_program();
    Engine::new(&program, &work_dir)
        .run(&graph, action)
        .with_context(|| format!("running {} for stack {}", program.display(), graph.stack))
}

#[cfg(test)]
mod tests;
