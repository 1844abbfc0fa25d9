//! Canonical text rendering for floating-point values.
//!
//! Both the command builder (`--unit`) and the material fixer (`d` values)
//! emit numbers that downstream tooling parses again, so they share one
//! formatting rule: shortest round-trip digits, always with a fractional
//! part or an exponent.

/// Magnitudes below this switch to scientific notation.
const SCIENTIFIC_BELOW: f64 = 1e-4;

/// Magnitudes at or above this switch to scientific notation.
const SCIENTIFIC_FROM: f64 = 1e16;

/// Render `value` as canonical float text.
///
/// - `1.0` stays `1.0` (never `1`).
/// - `0.0254` stays `0.0254`.
/// - `0.00001` becomes `1e-05`; `1e16` becomes `1e+16`.
/// - Non-finite values render as `nan`, `inf`, and `-inf`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(SCIENTIFIC_BELOW..SCIENTIFIC_FROM).contains(&magnitude) {
        return format_scientific(value);
    }

    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

/// Scientific form with an explicit exponent sign and at least two digits.
fn format_scientific(value: f64) -> String {
    let raw = format!("{value:e}");
    match raw.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.abs())
            }
            Err(_) => raw,
        },
        None => raw,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
