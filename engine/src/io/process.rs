//! Child-process execution with a hard deadline and bounded capture.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Raw captured output of a finished (or killed) child process.
#[derive(Debug)]
pub struct CommandOutput {
    /// Exit status; `None` when the deadline expired and the child was
    /// killed before it could finish.
    pub status: Option<ExitStatus>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Bytes discarded beyond the capture limit, across both streams.
    pub truncated_bytes: usize,
}

impl CommandOutput {
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }
}

/// Spawn `cmd` and wait at most `timeout` for it to finish.
///
/// stdout and stderr are drained on reader threads while the child runs so
/// a chatty child cannot deadlock on a full pipe; `output_limit_bytes`
/// bounds what is kept per stream (the pipes are still drained fully).
/// When the deadline expires the child is killed and reaped before this
/// returns, so no orphan survives the call.
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd.spawn().context("spawn command")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_limited(stderr, output_limit_bytes));

    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => Some(status),
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command deadline expired, killing"
            );
            kill_and_reap(&mut child)?;
            None
        }
    };

    let (stdout, stdout_dropped) = join_reader(stdout_handle).context("join stdout reader")?;
    let (stderr, stderr_dropped) = join_reader(stderr_handle).context("join stderr reader")?;
    let truncated_bytes = stdout_dropped + stderr_dropped;
    if truncated_bytes > 0 {
        warn!(truncated_bytes, "captured output truncated");
    }

    debug!(
        exit_code = ?status.and_then(|s| s.code()),
        timed_out = status.is_none(),
        "command finished"
    );
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        truncated_bytes,
    })
}

fn kill_and_reap(child: &mut Child) -> Result<()> {
    child.kill().context("kill command")?;
    child.wait().context("reap command after kill")?;
    Ok(())
}

fn join_reader(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

/// Read a stream to EOF, keeping at most `limit` bytes and counting the rest.
fn read_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut dropped = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            dropped += n.saturating_sub(keep);
        } else {
            dropped += n;
        }
    }

    Ok((buf, dropped))
}
