//! Bounded parallel execution of a command batch.
//!
//! Every command line is an independent unit of work. At most
//! `max_workers` run at once; slots are taken in line order, so submission
//! order follows the batch while completion order is whatever the
//! processes make it. A failing command is logged and recorded, and never
//! stops its siblings. There is no retry, no timeout and no checkpointing:
//! running the same batch again runs everything again.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use turntable_core::command_builder::CommandBatch;

use crate::error::DispatchError;
use crate::runner::CommandRunner;

/// Default number of concurrently running commands.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Trailing characters of captured output kept for logs and failure records.
const OUTPUT_TAIL_CHARS: usize = 4096;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Inputs for a dispatch run.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Command batch file, one command per line.
    pub file: PathBuf,
    /// Upper bound on concurrently running commands. Must be at least 1.
    pub max_workers: usize,
    /// Optional path for a JSON report of the run.
    pub report: Option<PathBuf>,
}

impl DispatchConfig {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            max_workers: DEFAULT_MAX_WORKERS,
            report: None,
        }
    }
}

/// Why a command failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// The process ran and exited non-zero.
    NonZeroExit { exit_code: i32 },
    /// The process could not be started.
    Spawn,
    /// The worker running the command panicked.
    Panicked,
}

/// One failed unit of work.
#[derive(Debug, Clone, Serialize)]
pub struct CommandFailure {
    /// 0-based position of the command in the batch.
    pub index: usize,
    pub command: String,
    #[serde(flatten)]
    pub kind: FailureKind,
    /// Captured stderr (stdout when stderr is empty) or the spawn error.
    pub error: String,
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Failed commands, ordered by batch position.
    pub failures: Vec<CommandFailure>,
}

impl DispatchSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Execute `commands` with at most `max_workers` running concurrently.
///
/// Returns once every command has finished. Individual failures are
/// collected into the summary; only a broken pool is an error.
pub async fn dispatch<R>(
    commands: Vec<String>,
    max_workers: usize,
    runner: Arc<R>,
) -> Result<DispatchSummary, DispatchError>
where
    R: CommandRunner + 'static,
{
    validate_max_workers(max_workers)?;

    let total = commands.len();
    let slots = Arc::new(Semaphore::new(max_workers));
    let mut workers = JoinSet::new();

    for (index, command) in commands.into_iter().enumerate() {
        // Taking the slot before spawning keeps submission in line order.
        let permit = Arc::clone(&slots)
            .acquire_owned()
            .await
            .map_err(|_| DispatchError::PoolClosed)?;
        let runner = Arc::clone(&runner);

        tracing::debug!(index, command = %command, "Submitting command");
        workers.spawn(async move {
            let _permit = permit;
            let outcome = AssertUnwindSafe(execute(runner.as_ref(), index, &command))
                .catch_unwind()
                .await;
            outcome.unwrap_or_else(|_| {
                tracing::error!(index, command = %command, "Worker panicked while executing command");
                Some(CommandFailure {
                    index,
                    command,
                    kind: FailureKind::Panicked,
                    error: "worker panicked".to_string(),
                })
            })
        });
    }

    let mut summary = DispatchSummary {
        total,
        ..Default::default()
    };
    while let Some(joined) = workers.join_next().await {
        match joined? {
            None => summary.succeeded += 1,
            Some(failure) => summary.failures.push(failure),
        }
    }
    summary.failures.sort_by_key(|f| f.index);

    Ok(summary)
}

/// Run one command and turn its outcome into an optional failure record.
async fn execute<R: CommandRunner>(runner: &R, index: usize, command: &str) -> Option<CommandFailure> {
    match runner.run(command).await {
        Ok(output) if output.success() => {
            tracing::debug!(
                index,
                duration_ms = output.duration_ms,
                stdout = %tail(output.stdout.trim_end(), OUTPUT_TAIL_CHARS),
                "Command succeeded",
            );
            None
        }
        Ok(output) => {
            let error = failure_text(&output.stdout, &output.stderr);
            tracing::error!(
                index,
                command = %command,
                exit_code = output.exit_code,
                error = %error,
                "Error executing command",
            );
            Some(CommandFailure {
                index,
                command: command.to_string(),
                kind: FailureKind::NonZeroExit {
                    exit_code: output.exit_code,
                },
                error,
            })
        }
        Err(e) => {
            tracing::error!(index, command = %command, error = %e, "Failed to start command");
            Some(CommandFailure {
                index,
                command: command.to_string(),
                kind: FailureKind::Spawn,
                error: e.to_string(),
            })
        }
    }
}

/// Read the batch named by `config`, dispatch it, and write the optional
/// report.
pub async fn run<R>(config: &DispatchConfig, runner: Arc<R>) -> Result<DispatchSummary, DispatchError>
where
    R: CommandRunner + 'static,
{
    validate_max_workers(config.max_workers)?;

    let batch = CommandBatch::read_from(&config.file)?;
    tracing::info!(
        file = %config.file.display(),
        commands = batch.len(),
        max_workers = config.max_workers,
        "Dispatching command batch",
    );

    let summary = dispatch(batch.commands, config.max_workers, runner).await?;
    tracing::info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed(),
        "Batch complete",
    );

    if let Some(path) = &config.report {
        write_report(path, &summary).await?;
    }

    Ok(summary)
}

/// Error text for a failed command: its stderr, or the tail of its stdout
/// when stderr is empty.
fn failure_text(stdout: &str, stderr: &str) -> String {
    let stderr = stderr.trim();
    let text = if stderr.is_empty() { stdout.trim() } else { stderr };
    tail(text, OUTPUT_TAIL_CHARS).to_string()
}

/// The last `max_chars` characters of `text`.
fn tail(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    match text.char_indices().rev().nth(max_chars - 1) {
        Some((start, _)) => &text[start..],
        None => text,
    }
}

fn validate_max_workers(max_workers: usize) -> Result<(), DispatchError> {
    if max_workers == 0 {
        return Err(DispatchError::Validation(
            "max_workers must be at least 1".to_string(),
        ));
    }
    Ok(())
}

async fn write_report(path: &Path, summary: &DispatchSummary) -> Result<(), DispatchError> {
    let json = serde_json::to_vec_pretty(summary)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| DispatchError::Report {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!(path = %path.display(), "Wrote dispatch report");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
