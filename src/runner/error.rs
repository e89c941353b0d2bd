//! Error types for the runner module.

// miette/thiserror derives trip unused_assignments on some toolchains only,
// so `#[expect]` cannot be used here.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The Stackfile does not exist at the expected path.
    #[error("{} not found in {directory}", path.display())]
    #[diagnostic(
        code(azstack::runner::manifest_not_found),
        help("create one with `azstack init` or point to it with --file")
    )]
    ManifestNotFound {
        /// The path that was attempted.
        path: PathBuf,
        /// Directory description.
        directory: String,
    },

    /// A path given on the command line is not valid UTF-8.
    #[error("path {} is not valid UTF-8", path.display())]
    #[diagnostic(code(azstack::runner::non_utf8_path))]
    NonUtf8Path {
        /// Offending path.
        path: PathBuf,
    },

    /// `init` refuses to replace an existing file.
    #[error("{path} already exists")]
    #[diagnostic(
        code(azstack::runner::exists),
        help("pass --force to overwrite it")
    )]
    AlreadyExists {
        /// Existing file.
        path: String,
    },

    /// The engine exited unsuccessfully.
    #[error("{command} exited with {status}")]
    #[diagnostic(code(azstack::runner::engine))]
    EngineFailed {
        /// Redacted command line.
        command: String,
        /// Exit status reported by the engine.
        status: ExitStatus,
    },
}
