//! Child process management for sandbox runners.
//!
//! Provides [`run_command`], which spawns a fully configured
//! [`tokio::process::Command`], captures stdout/stderr, and enforces a
//! wall-clock timeout by killing the child.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::executor::{RunnerError, RunnerResult};

/// Maximum stdout or stderr size captured per stream (10 MiB).
///
/// Output exceeding this limit is truncated to prevent memory exhaustion
/// from extremely verbose scripts.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// How long to wait for the output pipes to drain after the child exits.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Spawn `cmd`, capture its output, and kill it if it outlives `timeout`.
///
/// Stdin is closed. A timeout is reported through
/// [`RunnerResult::timed_out`], not as an error; only failing to spawn or
/// wait on the child is an `Err`.
pub async fn run_command(cmd: &mut Command, timeout: Duration) -> Result<RunnerResult, RunnerError> {
    // `kill_on_drop(true)` also covers the caller's future being dropped
    // mid-wait (e.g. an HTTP-level timeout).
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    let start = Instant::now();

    let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn {
        runner: program,
        source,
    })?;

    // Read both pipes in spawned tasks so `child.wait()` can borrow `&mut child`.
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    let (exit_code, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => (status.code().unwrap_or(-1), false),
        Ok(Err(e)) => return Err(RunnerError::Io(e)),
        Err(_elapsed) => {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                "Sandboxed process exceeded its time limit, killing it"
            );
            if let Err(e) = child.start_kill() {
                tracing::warn!(error = %e, "Failed to signal timed-out process");
            }
            let code = match child.wait().await {
                Ok(status) => status.code().unwrap_or(-1),
                Err(_) => -1,
            };
            (code, true)
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    let stdout_bytes = drain(stdout_task).await;
    let stderr_bytes = drain(stderr_task).await;

    Ok(RunnerResult {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
        timed_out,
        duration_ms,
    })
}

/// Collect a reader task's bytes, giving up after [`DRAIN_TIMEOUT`].
///
/// A grandchild that inherited the pipe can hold it open after the direct
/// child is gone.
async fn drain(task: tokio::task::JoinHandle<Vec<u8>>) -> Vec<u8> {
    let abort = task.abort_handle();
    match tokio::time::timeout(DRAIN_TIMEOUT, task).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(_)) => Vec::new(),
        Err(_) => {
            abort.abort();
            Vec::new()
        }
    }
}

/// Read an entire output stream into a byte buffer, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
