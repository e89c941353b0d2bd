//! Pulumi subprocess handling.
//!
//! Every engine command runs against the work directory holding the
//! generated `Pulumi.yaml`, without prompts, with its output streamed back to
//! the user. Environment-sourced secrets are handed over through
//! `pulumi config set --secret` on stdin so they never appear on a command
//! line.

use super::RunnerError;
use super::redaction::{CommandArg, redact_sensitive_args};
use crate::ir::ResourceGraph;
use crate::secrets::{SecretBinding, SecretValue};
use anyhow::{Context, Result};
use engine_env::PULUMI_ENV;
use std::ffi::OsString;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::{env, thread};
use tracing::info;

/// Default engine executable.
pub const PULUMI_PROGRAM: &str = "pulumi";

/// Engine operation requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineAction {
    /// Show the changes an update would make.
    Preview,
    /// Create or update the stack's resources.
    Up,
    /// Delete the stack's resources.
    Destroy,
}

impl EngineAction {
    fn args(self) -> &'static [&'static str] {
        match self {
            Self::Preview => &["preview"],
            Self::Up => &["up", "--yes"],
            Self::Destroy => &["destroy", "--yes"],
        }
    }
}

fn resolve_pulumi_program_with<F>(mut read_env: F) -> PathBuf
where
    F: FnMut(&str) -> Option<OsString>,
{
    read_env(PULUMI_ENV)
        .filter(|value| !value.is_empty())
        .map_or_else(|| PathBuf::from(PULUMI_PROGRAM), PathBuf::from)
}

/// Engine executable, honouring the `AZSTACK_PULUMI` override.
#[must_use]
pub fn resolve_pulumi_program() -> PathBuf {
    resolve_pulumi_program_with(|key| env::var_os(key))
}

/// An engine bound to a work directory.
#[derive(Debug, Clone)]
pub struct Engine {
    program: PathBuf,
    work_dir: PathBuf,
}

impl Engine {
    /// Drive `program` inside `work_dir`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            work_dir: work_dir.into(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .arg("--cwd")
            .arg(&self.work_dir)
            .arg("--non-interactive")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Select `graph`'s stack, supply its secrets and run `action`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be started or any step exits
    /// unsuccessfully; later steps are not attempted.
    pub fn run(&self, graph: &ResourceGraph, action: EngineAction) -> Result<()> {
        let select = self.command(&["stack", "select", "--create", graph.stack.as_str()]);
        self.execute(select, None)?;
        for (name, binding) in &graph.secrets {
            if let SecretBinding::Env { value, .. } = binding {
                let mut cmd = self.command(&["config", "set", "--secret", name.as_str()]);
                cmd.stdin(Stdio::piped());
                self.execute(cmd, Some(value))
                    .with_context(|| format!("storing secret '{name}'"))?;
            }
        }
        self.execute(self.command(action.args()), None)
    }

    fn execute(&self, mut cmd: Command, stdin: Option<&SecretValue>) -> Result<()> {
        let line = command_line(&cmd);
        info!("Running command: {line}");
        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to start {}", self.program.display()))?;
        if let Some(secret) = stdin {
            feed_stdin(&mut child, secret)?;
        }
        let status = spawn_and_stream_output(child)?;
        check_exit_status(status, line)
    }
}

fn command_line(cmd: &Command) -> String {
    let args: Vec<CommandArg> = std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|a| CommandArg::new(a.to_string_lossy().into_owned()))
        .collect();
    redact_sensitive_args(&args)
        .iter()
        .map(CommandArg::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

fn feed_stdin(child: &mut Child, secret: &SecretValue) -> Result<()> {
    let Some(mut stdin) = child.stdin.take() else {
        terminate_child(child, "stdin pipe unavailable");
        return Err(io::Error::other("child process missing stdin pipe").into());
    };
    stdin
        .write_all(secret.expose().as_bytes())
        .context("writing secret to engine stdin")?;
    Ok(())
}

fn check_exit_status(status: ExitStatus, command: String) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(RunnerError::EngineFailed { command, status }.into())
    }
}

fn handle_forwarding_thread_result(result: thread::Result<ForwardStats>, stream_name: &str) {
    match result {
        Ok(stats) if stats.write_failed => {
            tracing::debug!("{stream_name} forwarding encountered closed pipe; output truncated");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!("{stream_name} forwarding thread panicked: {err:?}"),
    }
}

fn spawn_and_stream_output(mut child: Child) -> io::Result<ExitStatus> {
    let Some(stdout) = child.stdout.take() else {
        terminate_child(&mut child, "stdout pipe unavailable");
        return Err(io::Error::other("child process missing stdout pipe"));
    };
    let Some(stderr) = child.stderr.take() else {
        terminate_child(&mut child, "stderr pipe unavailable");
        return Err(io::Error::other("child process missing stderr pipe"));
    };

    let out_handle = thread::spawn(move || {
        let mut lock = io::stdout().lock();
        forward_child_output(BufReader::new(stdout), &mut lock, "stdout")
    });
    let err_handle = thread::spawn(move || {
        let mut lock = io::stderr().lock();
        forward_child_output(BufReader::new(stderr), &mut lock, "stderr")
    });

    let status = child.wait()?;
    handle_forwarding_thread_result(out_handle.join(), "stdout");
    handle_forwarding_thread_result(err_handle.join(), "stderr");
    Ok(status)
}

fn terminate_child(child: &mut Child, context: &str) {
    if let Err(err) = child.kill() {
        tracing::debug!("failed to kill child after {context}: {err}");
    }
    if let Err(err) = child.wait() {
        tracing::debug!("failed to reap child after {context}: {err}");
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ForwardStats {
    bytes_read: usize,
    bytes_written: usize,
    write_failed: bool,
}

struct CountingReader<'a, R> {
    inner: &'a mut R,
    read: u64,
}

impl<R: Read> Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        self.read = self.read.saturating_add(count as u64);
        Ok(count)
    }
}

struct CountingWriter<'a, W> {
    inner: &'a mut W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let count = self.inner.write(buf)?;
        self.written = self.written.saturating_add(count as u64);
        Ok(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn clamp_u64_to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

/// Copy child output to `writer`, draining the child even if `writer` closes.
fn forward_child_output<R, W>(
    mut reader: R,
    mut writer: W,
    stream_name: &'static str,
) -> ForwardStats
where
    R: Read,
    W: Write,
{
    let mut counting_reader = CountingReader {
        inner: &mut reader,
        read: 0,
    };
    let mut counting_writer = CountingWriter {
        inner: &mut writer,
        written: 0,
    };
    let write_failed = match io::copy(&mut counting_reader, &mut counting_writer) {
        Ok(_) => false,
        Err(err) => {
            tracing::debug!(
                "Failed to write engine {stream_name} to parent: {err}; discarding remaining bytes"
            );
            if let Err(drain_err) = io::copy(&mut counting_reader, &mut io::sink()) {
                tracing::debug!("Failed to drain engine {stream_name}: {drain_err}");
            }
            true
        }
    };
    ForwardStats {
        bytes_read: clamp_u64_to_usize(counting_reader.read),
        bytes_written: clamp_u64_to_usize(counting_writer.written),
        write_failed,
    }
}

/// Resolve the directory engine commands run in.
pub(super) fn work_dir_for(manifest: &Path, explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(
        || {
            manifest
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(".azstack")
        },
        Path::to_path_buf,
    )
}
