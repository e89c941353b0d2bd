//! File and stdout helpers for generated text.
//!
//! Files are written through capability-based directory handles: the nearest
//! existing ancestor of the target is opened and the remainder created
//! beneath it.

use super::RunnerError;
use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8 as cap_fs};
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

/// Return `true` when `path` is the CLI sentinel for "write to stdout".
#[must_use]
pub fn is_stdout_path(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Convert `path` to UTF-8 or report it.
pub(super) fn utf8_path(path: &Path) -> Result<&Utf8Path> {
    Utf8Path::from_path(path).ok_or_else(|| {
        RunnerError::NonUtf8Path {
            path: path.to_path_buf(),
        }
        .into()
    })
}

fn write_file_in(dir: &cap_fs::Dir, path: &Utf8Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        dir.create_dir_all(parent)
            .with_context(|| format!("create directory {parent}"))?;
    }
    let mut file = dir
        .create(path)
        .with_context(|| format!("create {path}"))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("write {path}"))?;
    file.flush().with_context(|| format!("flush {path}"))?;
    file.sync_all().with_context(|| format!("sync {path}"))?;
    Ok(())
}

fn derive_dir_and_relative(path: &Utf8Path) -> Result<(cap_fs::Dir, Utf8PathBuf)> {
    if path.is_relative() {
        let dir = cap_fs::Dir::open_ambient_dir(".", ambient_authority())
            .context("open current directory")?;
        return Ok((dir, path.to_owned()));
    }
    let (base, dir) = path
        .ancestors()
        .skip(1)
        .find_map(|candidate| {
            cap_fs::Dir::open_ambient_dir(candidate, ambient_authority())
                .ok()
                .map(|dir| (candidate.to_owned(), dir))
        })
        .ok_or_else(|| anyhow!("no existing ancestor directory for {path}"))?;
    let relative = path
        .strip_prefix(&base)
        .context("derive path relative to its ancestor")?
        .to_owned();
    Ok((dir, relative))
}

/// Write `content` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the path is not UTF-8 or the file cannot be written.
pub fn write_text_file(path: &Path, content: &str) -> Result<()> {
    let utf8 = utf8_path(path)?;
    let (dir, relative) = derive_dir_and_relative(utf8)?;
    write_file_in(&dir, &relative, content)?;
    info!("Wrote {utf8}");
    Ok(())
}

fn ignore_broken_pipe(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Write `content` to stdout, treating a closed pipe as success.
///
/// # Errors
///
/// Returns an error if stdout cannot be written for any other reason.
pub fn write_stdout(content: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    ignore_broken_pipe(stdout.write_all(content.as_bytes())).context("write to stdout")?;
    ignore_broken_pipe(stdout.flush()).context("flush stdout")?;
    Ok(())
}
