//! `fix-mtl` -- invert the `d` (dissolve) values of material files.
//!
//! Rewrites every `d <value>` statement in the `.mtl` files of a directory
//! to `d <1 - value>`. Without `--output_folder` the files are overwritten
//! in place.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turntable_core::material::{self, FixerConfig};

#[derive(Debug, Parser)]
#[command(name = "fix-mtl", about = "Fix the transparency of .mtl material files")]
struct Args {
    /// Directory containing the .mtl files.
    #[arg(long, env = "TURNTABLE_MTL_DIRECTORY")]
    directory: PathBuf,

    /// Directory for the fixed files. Overwrites the originals if omitted.
    #[arg(long = "output_folder", alias = "output-folder", env = "TURNTABLE_MTL_OUTPUT")]
    output_folder: Option<PathBuf>,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turntable_core=info,fix_mtl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = FixerConfig {
        directory: args.directory,
        output_folder: args.output_folder,
    };

    match material::fix_directory(&config) {
        Ok(summary) => {
            tracing::info!(
                files = summary.files,
                rewritten = summary.lines_rewritten,
                skipped = summary.skipped.len(),
                "Done",
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Material fix failed");
            ExitCode::FAILURE
        }
    }
}
