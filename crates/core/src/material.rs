//! Material file (`.mtl`) transparency repair.
//!
//! Some exported material libraries store the `d` (dissolve) statement as
//! transparency instead of opacity. Fixing a file rewrites every `d <value>`
//! statement to `d <1 - value>` and leaves all other lines byte for byte.

use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::number::format_float;

/// File extension of material libraries, without the dot.
pub const MTL_EXTENSION: &str = "mtl";

/// Statement keyword carrying the dissolve value.
const DISSOLVE_KEYWORD: &str = "d";

/// Inputs for a directory fix run.
#[derive(Debug, Clone)]
pub struct FixerConfig {
    /// Directory scanned (non-recursively) for `.mtl` files.
    pub directory: PathBuf,
    /// Destination directory. `None` overwrites the source files in place.
    pub output_folder: Option<PathBuf>,
}

/// Result of fixing one file's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedMtl {
    pub text: String,
    /// Number of `d` statements rewritten.
    pub rewritten: usize,
}

/// Outcome of a directory fix run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixSummary {
    /// Files written.
    pub files: usize,
    /// `d` statements rewritten across all files.
    pub lines_rewritten: usize,
    /// Files left alone because they are not valid UTF-8.
    pub skipped: Vec<PathBuf>,
}

/// Invert the dissolve value of every `d` statement in `text`.
pub fn fix_mtl_text(text: &str) -> FixedMtl {
    let mut out = String::with_capacity(text.len());
    let mut rewritten = 0;

    for piece in text.split_inclusive('\n') {
        let (body, terminator) = split_terminator(piece);
        match fix_line(body) {
            Some(fixed) => {
                out.push_str(&fixed);
                rewritten += 1;
            }
            None => out.push_str(body),
        }
        out.push_str(terminator);
    }

    FixedMtl {
        text: out,
        rewritten,
    }
}

/// Rewrite a single `d <value> ...` line, or `None` if it is not one.
fn fix_line(body: &str) -> Option<String> {
    let mut tokens = body.split_whitespace();
    if tokens.next()? != DISSOLVE_KEYWORD {
        return None;
    }
    let value: f64 = tokens.next()?.parse().ok()?;

    let indent = &body[..body.len() - body.trim_start().len()];
    let mut line = format!("{indent}{DISSOLVE_KEYWORD} {}", format_float(1.0 - value));
    for rest in tokens {
        line.push(' ');
        line.push_str(rest);
    }
    Some(line)
}

fn split_terminator(piece: &str) -> (&str, &str) {
    if let Some(body) = piece.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = piece.strip_suffix('\n') {
        (body, "\n")
    } else {
        (piece, "")
    }
}

/// Fix every `.mtl` file in `config.directory`.
///
/// Files are processed in name order. When an output folder is configured it
/// is created if needed and receives files of the same name; otherwise the
/// sources are overwritten.
pub fn fix_directory(config: &FixerConfig) -> Result<FixSummary, CoreError> {
    if !config.directory.is_dir() {
        return Err(CoreError::Config(format!(
            "material directory does not exist: {}",
            config.directory.display()
        )));
    }

    let files = list_mtl_files(&config.directory)?;

    if let Some(output) = &config.output_folder {
        std::fs::create_dir_all(output).map_err(|e| CoreError::io(output, e))?;
    }

    let mut summary = FixSummary::default();

    for input in files {
        let bytes = std::fs::read(&input).map_err(|e| CoreError::io(&input, e))?;
        let Ok(text) = String::from_utf8(bytes) else {
            tracing::warn!(path = %input.display(), "Skipping material file that is not valid UTF-8");
            summary.skipped.push(input);
            continue;
        };

        let fixed = fix_mtl_text(&text);
        let output = match &config.output_folder {
            Some(dir) => match input.file_name() {
                Some(name) => dir.join(name),
                None => continue,
            },
            None => input.clone(),
        };

        std::fs::write(&output, fixed.text).map_err(|e| CoreError::io(&output, e))?;
        tracing::info!(path = %output.display(), rewritten = fixed.rewritten, "Fixed and saved");

        summary.files += 1;
        summary.lines_rewritten += fixed.rewritten;
    }

    Ok(summary)
}

/// Regular files in `dir` with the `.mtl` extension, sorted by path.
fn list_mtl_files(dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let entries = std::fs::read_dir(dir).map_err(|e| CoreError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::io(dir, e))?;
        let path = entry.path();
        let is_mtl = path.extension().is_some_and(|ext| ext == MTL_EXTENSION);
        if is_mtl && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
