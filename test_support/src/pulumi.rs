//! A stand-in `pulumi` executable that records how it was called.
//!
//! Each invocation appends one line to `calls.log`:
//! `<args> | stdin=<stdin>`. The script exits with the configured code once
//! the command matching `fail_on` runs, and with zero otherwise.

use crate::exec::write_exec;
use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// A fake engine living in its own temporary directory.
#[derive(Debug)]
pub struct FakePulumi {
    dir: TempDir,
    path: Utf8PathBuf,
}

impl FakePulumi {
    /// Path of the executable, suitable for `AZSTACK_PULUMI`.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Recorded invocations, one per line.
    ///
    /// # Errors
    ///
    /// Returns an error when the log cannot be read. A missing log means the
    /// engine never ran and yields no calls.
    pub fn calls(&self) -> Result<Vec<String>> {
        let log = self.dir.path().join("calls.log");
        if !log.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&log).context("read fake pulumi log")?;
        Ok(text.lines().map(str::to_owned).collect())
    }
}

/// Create a fake engine that exits with `exit_code` when its first argument
/// equals `fail_on`, and succeeds otherwise.
///
/// # Errors
///
/// Returns an error when the temporary directory or script cannot be created.
pub fn fake_pulumi(fail_on: &str, exit_code: i32) -> Result<FakePulumi> {
    let dir = TempDir::new().context("temp dir")?;
    let root = Utf8Path::from_path(dir.path())
        .ok_or_else(|| anyhow!("temporary directory is not UTF-8"))?
        .to_owned();
    let log = root.join("calls.log");
    let script = format!(
        concat!(
            "#!/bin/sh\n",
            "input=\"\"\n",
            "if [ \"$1\" = config ]; then input=$(cat); fi\n",
            "echo \"$* | stdin=$input\" >> '{log}'\n",
            "echo \"engine $1\"\n",
            "if [ \"$1\" = '{fail_on}' ]; then exit {code}; fi\n",
            "exit 0\n",
        ),
        log = log,
        fail_on = fail_on,
        code = exit_code,
    );
    let path = write_exec(&root, "pulumi", &script)?;
    Ok(FakePulumi { dir, path })
}
