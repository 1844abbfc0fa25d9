//! Integration tests for command batch generation.
//!
//! Drive `command_builder::run` against metadata tables on disk and check
//! the written batch artifact.

use std::path::Path;

use assert_matches::assert_matches;
use turntable_core::command_builder::{self, BuilderConfig, CommandBatch};
use turntable_core::error::CoreError;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lay out a metadata table, a model directory, and a config pointing at
/// them inside `root`.
fn setup(root: &Path, metadata: &str) -> BuilderConfig {
    let models = root.join("models");
    std::fs::create_dir_all(&models).expect("create models dir");
    let metadata_path = root.join("metadata.csv");
    std::fs::write(&metadata_path, metadata).expect("write metadata");

    let mut config = BuilderConfig::new(
        metadata_path,
        models,
        "/opt/render_blender.py",
        "/renders",
    );
    config.commands_file = root.join("commands.txt");
    config
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("read batch")
        .lines()
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Three rows where the middle one has no unit produce two lines, in order.
#[test]
fn unitless_rows_are_filtered_in_order() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = setup(
        dir.path(),
        "fullId,up,front,aligned.dims,unit\n\
         wss.one,,,,1.0\n\
         wss.two,,,,\n\
         wss.three,,,,1.0\n",
    );

    let summary = command_builder::run(&config).expect("run");
    assert_eq!(summary.total_rows, 3);
    assert_eq!(summary.skipped_rows, 1);
    assert_eq!(summary.commands, 2);

    let lines = read_lines(&config.commands_file);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("one.obj"), "first line: {}", lines[0]);
    assert!(lines[1].ends_with("three.obj"), "second line: {}", lines[1]);
}

/// Generated lines carry only the flags whose fields are present.
#[test]
fn flags_follow_present_fields() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = setup(
        dir.path(),
        "fullId,up,front,aligned.dims,unit\n\
         wss.full,\"0\\,0\\,1\",\"-1\\,0\\,0\",\"1\\,2\\,3\",0.5\n\
         wss.bare,,,,2\n",
    );

    command_builder::run(&config).expect("run");
    let lines = read_lines(&config.commands_file);

    let models = dir.path().join("models");
    assert_eq!(
        lines[0],
        format!(
            r"blender --background --python /opt/render_blender.py -- --output_folder /renders --up 0\,0\,1 --front -1\,0\,0 --aligned_dims 1\,2\,3 --unit 0.5 {}",
            models.join("full.obj").display()
        )
    );
    assert_eq!(
        lines[1],
        format!(
            "blender --background --python /opt/render_blender.py -- --output_folder /renders --unit 2.0 {}",
            models.join("bare.obj").display()
        )
    );
    assert!(!lines[1].contains("--up "));
}

/// Re-running against unchanged inputs rewrites a byte-identical artifact.
#[test]
fn rerun_is_byte_identical() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = setup(
        dir.path(),
        "fullId,up,unit\nwss.a,\"0\\,1\\,0\",1\nwss.b,,0.0254\n",
    );

    command_builder::run(&config).expect("first run");
    let first = std::fs::read(&config.commands_file).expect("read first");
    command_builder::run(&config).expect("second run");
    let second = std::fs::read(&config.commands_file).expect("read second");

    assert_eq!(first, second);
}

/// The batch replaces whatever the commands file held before.
#[test]
fn existing_batch_is_overwritten() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = setup(dir.path(), "fullId,unit\nwss.a,1\n");
    std::fs::write(&config.commands_file, "stale\nstale\nstale\n").expect("seed");

    command_builder::run(&config).expect("run");

    let batch = CommandBatch::read_from(&config.commands_file).expect("read");
    assert_eq!(batch.len(), 1);
    assert!(!batch.commands[0].contains("stale"));
}

/// Rows resolving to the same model are kept and reported.
#[test]
fn duplicate_models_are_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = setup(dir.path(), "fullId,unit\nwss.a,1\nother.a,1\nwss.b,1\n");

    let summary = command_builder::run(&config).expect("run");
    assert_eq!(summary.commands, 3);
    assert_eq!(summary.duplicate_models, vec!["a".to_string()]);
}

/// An eligible row with an undotted identifier aborts the build.
#[test]
fn malformed_identifier_aborts_without_writing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = setup(dir.path(), "fullId,unit\nwss.a,1\nbroken,1\n");

    let result = command_builder::run(&config);
    assert_matches!(result, Err(CoreError::MalformedRow { row: 2, .. }));
    assert!(!config.commands_file.exists());
}

/// A missing metadata file is a fatal configuration error.
#[test]
fn missing_metadata_is_fatal() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut config = setup(dir.path(), "fullId,unit\n");
    config.metadata = dir.path().join("absent.csv");

    assert_matches!(command_builder::run(&config), Err(CoreError::Io { .. }));
}
