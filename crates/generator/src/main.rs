//! `generate-commands` -- build the render command batch from the metadata table.
//!
//! Reads the model metadata table, keeps the rows that have a unit, and
//! writes one renderer invocation per row to the commands file.
//!
//! # Flags / environment variables
//!
//! | Flag                    | Variable                    | Default        |
//! |-------------------------|-----------------------------|----------------|
//! | `--metadata`            | `TURNTABLE_METADATA`        | --             |
//! | `--obj_directory`       | `TURNTABLE_OBJ_DIRECTORY`   | --             |
//! | `--render_blender_path` | `TURNTABLE_RENDER_SCRIPT`   | --             |
//! | `--output_directory`    | `TURNTABLE_OUTPUT_DIRECTORY`| --             |
//! | `--commands_file`       | `TURNTABLE_COMMANDS_FILE`   | `commands.txt` |
//! | `--blender`             | `TURNTABLE_BLENDER`         | `blender`      |
//! | `--views`               | `TURNTABLE_VIEWS`           | renderer's own |
//! | `--engine`              | `TURNTABLE_ENGINE`          | renderer's own |

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turntable_core::command_builder::{self, BuilderConfig, DEFAULT_BLENDER, DEFAULT_COMMANDS_FILE};

#[derive(Debug, Parser)]
#[command(
    name = "generate-commands",
    about = "Generate the list of render commands from the model metadata table"
)]
struct Args {
    /// Path to the metadata table.
    #[arg(long, env = "TURNTABLE_METADATA")]
    metadata: PathBuf,

    /// Directory containing the `.obj` files.
    #[arg(long = "obj_directory", alias = "obj-directory", env = "TURNTABLE_OBJ_DIRECTORY")]
    obj_directory: PathBuf,

    /// Path to the render script run inside the host application.
    #[arg(
        long = "render_blender_path",
        alias = "render-blender-path",
        env = "TURNTABLE_RENDER_SCRIPT"
    )]
    render_blender_path: PathBuf,

    /// Directory the renders are written to.
    #[arg(
        long = "output_directory",
        alias = "output-directory",
        env = "TURNTABLE_OUTPUT_DIRECTORY"
    )]
    output_directory: PathBuf,

    /// Where to write the command batch.
    #[arg(
        long = "commands_file",
        alias = "commands-file",
        env = "TURNTABLE_COMMANDS_FILE",
        default_value = DEFAULT_COMMANDS_FILE
    )]
    commands_file: PathBuf,

    /// Host application executable.
    #[arg(long, env = "TURNTABLE_BLENDER", default_value = DEFAULT_BLENDER)]
    blender: String,

    /// Turntable positions to render, forwarded to the render script.
    #[arg(long, env = "TURNTABLE_VIEWS")]
    views: Option<u32>,

    /// Render engine, forwarded to the render script (e.g. `CYCLES`).
    #[arg(long, env = "TURNTABLE_ENGINE")]
    engine: Option<String>,
}

impl From<Args> for BuilderConfig {
    fn from(args: Args) -> Self {
        Self {
            metadata: args.metadata,
            obj_directory: args.obj_directory,
            render_script: args.render_blender_path,
            output_directory: args.output_directory,
            commands_file: args.commands_file,
            blender: args.blender,
            views: args.views,
            engine: args.engine,
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turntable_core=info,generate_commands=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BuilderConfig::from(Args::parse());

    match command_builder::run(&config) {
        Ok(summary) => {
            tracing::info!(
                rows = summary.total_rows,
                skipped = summary.skipped_rows,
                commands = summary.commands,
                duplicates = summary.duplicate_models.len(),
                "Command batch generated",
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Command generation failed");
            ExitCode::FAILURE
        }
    }
}
