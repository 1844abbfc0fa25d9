//! Command batch generation.
//!
//! Turns the metadata table into one renderer invocation per model that has
//! a scale factor, and persists the result as a command batch: a UTF-8 text
//! file with one command line per line. The batch is the only hand-off
//! between generation and the parallel dispatcher.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::metadata::{self, MetadataRow};
use crate::number::format_float;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default batch file name, relative to the working directory.
pub const DEFAULT_COMMANDS_FILE: &str = "commands.txt";

/// Default host application executable.
pub const DEFAULT_BLENDER: &str = "blender";

/// Extension appended to the model name to locate its geometry file.
const MODEL_EXTENSION: &str = "obj";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Inputs for a command generation run.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Metadata table (CSV with a header row).
    pub metadata: PathBuf,
    /// Directory holding `<model>.obj` files.
    pub obj_directory: PathBuf,
    /// Render script passed to the host application via `--python`.
    pub render_script: PathBuf,
    /// Directory the renderer writes its per-model output folders into.
    pub output_directory: PathBuf,
    /// Where the batch is written.
    pub commands_file: PathBuf,
    /// Host application executable.
    pub blender: String,
    /// Turntable view count forwarded to the renderer, if set.
    pub views: Option<u32>,
    /// Render engine name forwarded to the renderer, if set.
    pub engine: Option<String>,
}

impl BuilderConfig {
    /// Config with the four required paths and defaults for everything else.
    pub fn new(
        metadata: impl Into<PathBuf>,
        obj_directory: impl Into<PathBuf>,
        render_script: impl Into<PathBuf>,
        output_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            metadata: metadata.into(),
            obj_directory: obj_directory.into(),
            render_script: render_script.into(),
            output_directory: output_directory.into(),
            commands_file: PathBuf::from(DEFAULT_COMMANDS_FILE),
            blender: DEFAULT_BLENDER.to_string(),
            views: None,
            engine: None,
        }
    }

    /// Command prefix shared by every line of the batch.
    fn prefix(&self) -> String {
        let mut line = format!(
            "{} --background --python {} -- --output_folder {}",
            self.blender,
            self.render_script.display(),
            self.output_directory.display(),
        );
        if let Some(views) = self.views {
            line.push_str(&format!(" --views {views}"));
        }
        if let Some(engine) = &self.engine {
            line.push_str(&format!(" --engine {engine}"));
        }
        line
    }
}

// ---------------------------------------------------------------------------
// Command batch
// ---------------------------------------------------------------------------

/// Ordered list of command lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    pub commands: Vec<String>,
}

impl CommandBatch {
    /// Parse batch text: every non-empty line (trimmed) is one command.
    pub fn parse(text: &str) -> Self {
        let commands = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { commands }
    }

    /// Read and parse the batch file at `path`.
    pub fn read_from(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        Ok(Self::parse(&text))
    }

    /// Serialized form: one command per line, each terminated by `\n`.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for command in &self.commands {
            text.push_str(command);
            text.push('\n');
        }
        text
    }

    /// Write the batch to `path`, replacing any previous content.
    pub fn write_to(&self, path: &Path) -> Result<(), CoreError> {
        std::fs::write(path, self.to_text()).map_err(|e| CoreError::io(path, e))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Outcome of a generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    /// Data rows read from the table.
    pub total_rows: usize,
    /// Rows skipped because they have no unit.
    pub skipped_rows: usize,
    /// Command lines written.
    pub commands: usize,
    /// Model names produced by more than one row. Their renders share an
    /// output folder.
    pub duplicate_models: Vec<String>,
}

/// Build the command line for `row`, or `None` when the row has no unit.
///
/// Orientation flags are emitted only for fields the row actually carries,
/// so the renderer falls back to its own defaults for the rest.
pub fn build_command(config: &BuilderConfig, row: &MetadataRow) -> Result<Option<String>, CoreError> {
    let Some(unit) = row.unit else {
        return Ok(None);
    };

    let mut line = config.prefix();
    push_flag(&mut line, "up", row.up.as_deref());
    push_flag(&mut line, "front", row.front.as_deref());
    push_flag(&mut line, "aligned_dims", row.aligned_dims.as_deref());
    push_flag(&mut line, "unit", Some(&format_float(unit)));

    let model_path = model_path(&config.obj_directory, row.model_name()?);
    line.push(' ');
    line.push_str(&model_path.display().to_string());

    Ok(Some(line))
}

/// Build the batch for `rows`, preserving table order.
pub fn build_batch(config: &BuilderConfig, rows: &[MetadataRow]) -> Result<CommandBatch, CoreError> {
    let eligible = rows.iter().filter(|r| r.is_eligible()).count();
    let mut commands = Vec::with_capacity(eligible);

    for row in rows {
        if let Some(command) = build_command(config, row)? {
            commands.push(command);
            tracing::debug!(row = row.row, "{} out of {}", commands.len(), eligible);
        }
    }

    Ok(CommandBatch { commands })
}

/// Run a full generation: validate inputs, load the table, build the
/// batch, and write it to `config.commands_file`.
pub fn run(config: &BuilderConfig) -> Result<BuildSummary, CoreError> {
    if !config.obj_directory.is_dir() {
        return Err(CoreError::Config(format!(
            "model directory does not exist: {}",
            config.obj_directory.display()
        )));
    }

    let rows = metadata::load_metadata(&config.metadata)?;
    let batch = build_batch(config, &rows)?;

    let duplicate_models = find_duplicate_models(&rows)?;
    for model in &duplicate_models {
        tracing::warn!(model = %model, "Several rows render the same model into one output folder");
    }

    tracing::info!(path = %config.commands_file.display(), commands = batch.len(), "Saving command batch");
    batch.write_to(&config.commands_file)?;

    Ok(BuildSummary {
        total_rows: rows.len(),
        skipped_rows: rows.len() - batch.len(),
        commands: batch.len(),
        duplicate_models,
    })
}

/// Path of the geometry file for `model_name`.
fn model_path(obj_directory: &Path, model_name: &str) -> PathBuf {
    obj_directory.join(format!("{model_name}.{MODEL_EXTENSION}"))
}

fn push_flag(line: &mut String, flag: &str, value: Option<&str>) {
    if let Some(value) = value {
        line.push_str(&format!(" --{flag} {value}"));
    }
}

/// Model names that more than one eligible row resolves to, sorted.
fn find_duplicate_models(rows: &[MetadataRow]) -> Result<Vec<String>, CoreError> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.is_eligible()) {
        *counts.entry(row.model_name()?).or_default() += 1;
    }
    Ok(counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn config() -> BuilderConfig {
        BuilderConfig::new(
            "/data/metadata.csv",
            "/data/models",
            "/opt/render_blender.py",
            "/out",
        )
    }

    fn row(id: &str, unit: Option<f64>) -> MetadataRow {
        MetadataRow {
            row: 1,
            id: id.to_string(),
            up: None,
            front: None,
            aligned_dims: None,
            unit,
        }
    }

    #[test]
    fn full_row_emits_every_flag() {
        let mut r = row("wss.abc", Some(0.0254));
        r.up = Some(r"0\,0\,1".to_string());
        r.front = Some(r"-1\,0\,0".to_string());
        r.aligned_dims = Some(r"10\,20\,30".to_string());

        let line = build_command(&config(), &r).expect("build").expect("eligible");
        assert_eq!(
            line,
            r"blender --background --python /opt/render_blender.py -- --output_folder /out --up 0\,0\,1 --front -1\,0\,0 --aligned_dims 10\,20\,30 --unit 0.0254 /data/models/abc.obj"
        );
    }

    #[test]
    fn absent_fields_omit_their_flags() {
        let line = build_command(&config(), &row("wss.abc", Some(1.0)))
            .expect("build")
            .expect("eligible");
        assert!(!line.contains("--up"));
        assert!(!line.contains("--front"));
        assert!(!line.contains("--aligned_dims"));
        assert!(line.ends_with("--unit 1.0 /data/models/abc.obj"));
    }

    #[test]
    fn row_without_unit_yields_nothing() {
        assert_eq!(build_command(&config(), &row("wss.abc", None)).expect("build"), None);
    }

    #[test]
    fn row_without_unit_is_skipped_even_if_id_is_malformed() {
        assert_eq!(build_command(&config(), &row("garbage", None)).expect("build"), None);
    }

    #[test]
    fn malformed_identifier_fails_fast() {
        let result = build_command(&config(), &row("noseparator", Some(1.0)));
        assert_matches!(result, Err(CoreError::MalformedRow { .. }));
    }

    #[test]
    fn renderer_options_follow_output_folder() {
        let mut cfg = config();
        cfg.blender = "/opt/blender/blender".to_string();
        cfg.views = Some(12);
        cfg.engine = Some("CYCLES".to_string());
        let line = build_command(&cfg, &row("wss.abc", Some(1.0)))
            .expect("build")
            .expect("eligible");
        assert!(line.starts_with(
            "/opt/blender/blender --background --python /opt/render_blender.py -- --output_folder /out --views 12 --engine CYCLES --unit 1.0"
        ));
    }

    #[test]
    fn batch_keeps_table_order_and_skips_unitless_rows() {
        let rows = vec![row("wss.first", Some(1.0)), row("wss.second", None), row("wss.third", Some(1.0))];
        let batch = build_batch(&config(), &rows).expect("build");
        assert_eq!(batch.len(), 2);
        assert!(batch.commands[0].ends_with("first.obj"));
        assert!(batch.commands[1].ends_with("third.obj"));
    }

    #[test]
    fn batch_text_is_newline_terminated() {
        let batch = CommandBatch {
            commands: vec!["echo a".to_string(), "echo b".to_string()],
        };
        assert_eq!(batch.to_text(), "echo a\necho b\n");
        assert_eq!(CommandBatch::parse(&batch.to_text()), batch);
    }

    #[test]
    fn parse_skips_blank_lines_and_trims() {
        let batch = CommandBatch::parse("echo a\r\n\n   \n  echo b  \n");
        assert_eq!(batch.commands, vec!["echo a", "echo b"]);
    }

    #[test]
    fn duplicates_are_detected_among_eligible_rows() {
        let rows = vec![
            row("wss.same", Some(1.0)),
            row("other.same", Some(2.0)),
            row("wss.unique", Some(1.0)),
            row("wss.unique", None),
        ];
        assert_eq!(find_duplicate_models(&rows).expect("dups"), vec!["same"]);
    }

    #[test]
    fn run_rejects_missing_model_directory() {
        let mut cfg = config();
        cfg.obj_directory = PathBuf::from("/nonexistent/models");
        assert_matches!(run(&cfg), Err(CoreError::Config(_)));
    }
}
