//! Subprocess spawning and output capture.
//!
//! [`run_command`] takes a fully prepared [`tokio::process::Command`],
//! spawns it, captures stdout/stderr, and waits for exit. There is no
//! timeout: a hung process holds its caller until it exits.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::executor::{CommandOutput, RunError};

/// Maximum stdout or stderr size captured per stream (10 MiB).
///
/// Output past this limit is read and discarded so the child never blocks
/// on a full pipe.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Spawn `cmd`, capture its output streams, and wait for it to exit.
///
/// Stdin is closed. A non-zero exit is returned as `Ok` with the exit code;
/// only spawn and wait failures are errors.
pub async fn run_command(cmd: &mut Command) -> Result<CommandOutput, RunError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();

    let mut child = cmd.spawn().map_err(RunError::IoError)?;

    // Read both streams in spawned tasks so `child.wait()` can borrow the
    // child while they drain.
    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let status = child.wait().await.map_err(RunError::IoError)?;

    let duration_ms = elapsed_ms(start.elapsed());
    let stdout_bytes = stdout_task.await.unwrap_or_default();
    let stderr_bytes = stderr_task.await.unwrap_or_default();

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
        exit_code: status.code().unwrap_or(-1),
        duration_ms,
    })
}

/// Read a stream into memory up to [`MAX_OUTPUT_BYTES`], then drain the rest.
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(h) = handle {
        let mut limited = h.take(MAX_OUTPUT_BYTES as u64);
        let _ = limited.read_to_end(&mut buf).await;
        let mut rest = limited.into_inner();
        let _ = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await;
    }
    buf
}

/// Whole milliseconds in `elapsed`, saturating at `u64::MAX`.
fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
