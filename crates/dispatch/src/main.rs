//! `render-parallel` -- execute a command batch with a bounded worker pool.
//!
//! Each line of the batch file is run through the system shell. Failures
//! are logged and do not stop the rest of the batch; the process exits 0
//! once every command has finished. Only configuration problems (unreadable
//! batch, invalid worker count) produce a non-zero exit.
//!
//! # Flags / environment variables
//!
//! | Flag            | Variable                   | Default | Description                        |
//! |-----------------|----------------------------|---------|------------------------------------|
//! | `--file`        | `TURNTABLE_COMMANDS_FILE`  | --      | Command batch, one command per line |
//! | `--max_workers` | `TURNTABLE_MAX_WORKERS`    | `5`     | Concurrently running commands      |
//! | `--report`      | `TURNTABLE_REPORT`         | --      | Optional JSON report path          |

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turntable_dispatch::pool::{self, DispatchConfig, DEFAULT_MAX_WORKERS};
use turntable_dispatch::runner::ShellRunner;

#[derive(Debug, Parser)]
#[command(name = "render-parallel", about = "Execute a command batch in parallel")]
struct Args {
    /// File containing the commands to execute, one per line.
    #[arg(long, env = "TURNTABLE_COMMANDS_FILE")]
    file: PathBuf,

    /// Maximum number of commands running at once.
    #[arg(
        long = "max_workers",
        alias = "max-workers",
        env = "TURNTABLE_MAX_WORKERS",
        default_value_t = DEFAULT_MAX_WORKERS
    )]
    max_workers: usize,

    /// Write a JSON summary of the run (including failed commands) here.
    #[arg(long, env = "TURNTABLE_REPORT")]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turntable_dispatch=info,render_parallel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = DispatchConfig {
        file: args.file,
        max_workers: args.max_workers,
        report: args.report,
    };

    match pool::run(&config, Arc::new(ShellRunner)).await {
        Ok(summary) => {
            if summary.failed() > 0 {
                tracing::warn!(
                    failed = summary.failed(),
                    total = summary.total,
                    "Some commands failed; re-run them manually",
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Dispatch aborted");
            ExitCode::FAILURE
        }
    }
}
