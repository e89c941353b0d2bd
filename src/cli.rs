//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. Flags take
//! precedence over environment variables, which take precedence over values
//! in the Stackfile.

use crate::ast::{DeploymentMode, NamingStrategy};
use clap::{Parser, Subcommand};
use engine_env::{STACK_ENV, SUBSCRIPTION_ENV};
use std::path::PathBuf;

/// Default manifest file name.
pub const DEFAULT_MANIFEST: &str = "Stackfile";

/// Declare the Azure resources of a Django stack and hand them to Pulumi.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the Stackfile to use.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_MANIFEST)]
    pub file: PathBuf,

    /// Run as if started in this directory.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the deployment mode declared in the Stackfile.
    #[arg(long, value_enum)]
    pub mode: Option<DeploymentMode>,

    /// Override the naming strategy declared in the Stackfile.
    #[arg(long, value_enum)]
    pub naming: Option<NamingStrategy>,

    /// Azure subscription used to build import ids.
    #[arg(long, value_name = "ID", env = SUBSCRIPTION_ENV)]
    pub subscription_id: Option<String>,

    /// Engine stack name; overrides the Stackfile's `stack`.
    #[arg(long, value_name = "NAME", env = STACK_ENV)]
    pub stack: Option<String>,

    /// Directory holding the generated program for engine commands.
    ///
    /// Defaults to `.azstack` next to the Stackfile.
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Optional subcommand to execute; defaults to `plan` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Plan);
        }
        self
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_MANIFEST),
            directory: None,
            verbose: false,
            mode: None,
            naming: None,
            subscription_id: None,
            stack: None,
            work_dir: None,
            command: None,
        }
        .with_default_command()
    }
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Validate the Stackfile and print a summary of the resource graph.
    Check,

    /// Print the apply waves and the graph digest (default).
    Plan,

    /// Write the Pulumi program to FILE, or to stdout for `-`.
    Emit {
        /// Output path for the generated program.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the resource graph in DOT format.
    Graph,

    /// Print stack outputs, marking values only known after deployment.
    Outputs,

    /// Write a starter Stackfile.
    Init {
        /// Deployment mode of the starter stack.
        #[arg(long, value_enum, default_value_t = DeploymentMode::Create)]
        mode: DeploymentMode,

        /// Start from the fixed-name variant of the create stack.
        #[arg(long)]
        fixed_names: bool,

        /// Replace an existing file.
        #[arg(long)]
        force: bool,

        /// Destination path.
        #[arg(value_name = "FILE", default_value = DEFAULT_MANIFEST)]
        file: PathBuf,
    },

    /// Ask the engine for a preview of the changes.
    Preview,

    /// Apply the stack through the engine.
    Up,

    /// Destroy every resource of the stack through the engine.
    Destroy,
}
