//! Metadata table loading.
//!
//! The table is a comma-separated file with a header row, one record per
//! model. Only five columns matter here: `fullId`, `up`, `front`,
//! `aligned.dims` and `unit`; every other column is ignored.
//!
//! Present cells are kept exactly as written, surrounding whitespace
//! included; trimming only applies when deciding whether a cell is missing
//! and when parsing the unit.

use std::path::Path;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Column holding the dotted model identifier (e.g. `wss.1a2b3c`).
pub const COLUMN_ID: &str = "fullId";

/// Column holding the semantic "up" vector.
pub const COLUMN_UP: &str = "up";

/// Column holding the semantic "front" vector.
pub const COLUMN_FRONT: &str = "front";

/// Column holding the aligned model dimensions.
pub const COLUMN_ALIGNED_DIMS: &str = "aligned.dims";

/// Column holding the virtual-unit-to-meters scale factor.
pub const COLUMN_UNIT: &str = "unit";

/// Cell contents that mean "no value", matched after trimming.
///
/// Mirrors the default missing-value markers of common dataframe readers so
/// that tables exported by those tools load the same way here.
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One model's record from the metadata table.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRow {
    /// 1-based data row number (the header is not counted).
    pub row: usize,
    /// Dotted model identifier from the `fullId` column.
    pub id: String,
    /// Raw `up` vector text, e.g. `0\,0\,1`.
    pub up: Option<String>,
    /// Raw `front` vector text.
    pub front: Option<String>,
    /// Raw `aligned.dims` text.
    pub aligned_dims: Option<String>,
    /// Parsed scale factor. Rows without one are not renderable.
    pub unit: Option<f64>,
}

impl MetadataRow {
    /// Whether this row carries a scale factor and can be rendered.
    pub fn is_eligible(&self) -> bool {
        self.unit.is_some()
    }

    /// The model file name: the second dot-separated segment of the id.
    pub fn model_name(&self) -> Result<&str, CoreError> {
        match self.id.split('.').nth(1) {
            Some(name) if !name.trim().is_empty() => Ok(name.trim()),
            _ => Err(CoreError::MalformedRow {
                row: self.row,
                reason: format!(
                    "identifier '{}' is not of the form '<source>.<model>'",
                    self.id
                ),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read and parse the metadata table at `path`.
pub fn load_metadata(path: &Path) -> Result<Vec<MetadataRow>, CoreError> {
    let text = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    let rows = parse_metadata(&text)?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "Loaded metadata table");
    Ok(rows)
}

/// Parse metadata table text into rows, in table order.
///
/// The first record is the header. `fullId` and `unit` are required
/// columns; `up`, `front` and `aligned.dims` may be absent, in which case
/// every row treats them as missing.
pub fn parse_metadata(text: &str) -> Result<Vec<MetadataRow>, CoreError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = parse_records(text)?.into_iter();

    let headers: Vec<String> = records
        .next()
        .ok_or_else(|| CoreError::Validation("Metadata table is empty".to_string()))?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let id_col = column(COLUMN_ID).ok_or(CoreError::MissingColumn(COLUMN_ID))?;
    let unit_col = column(COLUMN_UNIT).ok_or(CoreError::MissingColumn(COLUMN_UNIT))?;
    let up_col = column(COLUMN_UP);
    let front_col = column(COLUMN_FRONT);
    let dims_col = column(COLUMN_ALIGNED_DIMS);

    let mut rows = Vec::new();

    for (index, values) in records.enumerate() {
        let row = index + 1;
        let cell = |col: Option<usize>| -> Option<String> {
            col.and_then(|c| values.get(c))
                .filter(|v| !is_missing(v.trim()))
                .cloned()
        };

        let unit = match cell(Some(unit_col)) {
            Some(raw) => Some(parse_unit(&raw, row)?),
            None => None,
        };

        rows.push(MetadataRow {
            row,
            id: cell(Some(id_col)).unwrap_or_default(),
            up: cell(up_col),
            front: cell(front_col),
            aligned_dims: cell(dims_col),
            unit,
        });
    }

    Ok(rows)
}

/// Whether a trimmed cell value counts as missing.
fn is_missing(value: &str) -> bool {
    MISSING_MARKERS.contains(&value)
}

fn parse_unit(raw: &str, row: usize) -> Result<f64, CoreError> {
    match raw.trim().parse::<f64>() {
        Ok(unit) if unit.is_finite() => Ok(unit),
        _ => Err(CoreError::MalformedRow {
            row,
            reason: format!("unit '{raw}' is not a finite number"),
        }),
    }
}

// ---------------------------------------------------------------------------
// CSV records
// ---------------------------------------------------------------------------

/// Split CSV text into records of fields.
///
/// A double quote opens a quoted field only at the start of a field; a
/// quoted field may contain commas, line breaks, and `""` escapes. A quote
/// anywhere else is kept literally, as are backslashes. Blank lines are
/// skipped. A quoted field still open at the end of the text is an error.
fn parse_records(text: &str) -> Result<Vec<Vec<String>>, CoreError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    // Escaped quote.
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
            continue;
        }

        match ch {
            '"' if field_start => in_quotes = true,
            ',' => {
                record.push(std::mem::take(&mut current));
                field_start = true;
                continue;
            }
            '\r' if chars.peek() == Some(&'\n') => continue,
            '\n' => {
                finish_record(&mut records, &mut record, &mut current);
                field_start = true;
                continue;
            }
            _ => current.push(ch),
        }
        field_start = false;
    }

    if in_quotes {
        return Err(CoreError::Validation(format!(
            "unterminated quoted field in record {}",
            records.len() + 1
        )));
    }
    finish_record(&mut records, &mut record, &mut current);

    Ok(records)
}

fn finish_record(records: &mut Vec<Vec<String>>, record: &mut Vec<String>, current: &mut String) {
    record.push(std::mem::take(current));
    let fields = std::mem::take(record);
    let blank = fields.len() == 1 && fields[0].trim().is_empty();
    if !blank {
        records.push(fields);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
