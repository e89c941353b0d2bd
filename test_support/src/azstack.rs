//! Helpers for invoking the built `azstack` binary in tests.
//!
//! These utilities use `assert_cmd` to locate the current workspace's
//! `azstack` executable and run it in a controlled working directory,
//! capturing stdout/stderr for assertions.

use anyhow::{Context, Result};
use assert_cmd::Command;
use std::path::Path;

/// Captured output from an `azstack` invocation.
#[derive(Debug)]
pub struct AzstackRun {
    /// Captured stdout (lossy UTF-8).
    pub stdout: String,
    /// Captured stderr (lossy UTF-8).
    pub stderr: String,
    /// Whether the command exited successfully.
    pub success: bool,
}

/// Run `azstack` in `current_dir` with the supplied args and extra
/// environment.
///
/// Engine and subscription overrides inherited from the host are cleared so
/// tests never reach a real deployment.
///
/// # Errors
///
/// Returns an error when `azstack` cannot be located or the process cannot be
/// spawned.
pub fn run_azstack_in(
    current_dir: &Path,
    args: &[&str],
    env: &[(&str, &str)],
) -> Result<AzstackRun> {
    let mut cmd = Command::cargo_bin("azstack").context("locate azstack binary")?;
    cmd.current_dir(current_dir)
        .env_remove(engine_env::PULUMI_ENV)
        .env_remove(engine_env::STACK_ENV)
        .env_remove(engine_env::SUBSCRIPTION_ENV)
        .args(args);
    for (key, value) in env {
        cmd.env(key, value);
    }
    let output = cmd.output().context("run azstack command")?;
    Ok(AzstackRun {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
    })
}
