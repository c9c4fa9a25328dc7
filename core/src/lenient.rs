//! Tolerant readers for JSON produced by external collaborators.
//!
//! Language models emit numbers as strings, floats where integers are
//! expected, and occasionally negative counts. These helpers normalise the
//! shapes the engine accepts and return `None` for everything else so callers
//! can treat the field as absent.

use serde_json::Value;

/// Reads a non-negative whole count.
///
/// Accepts integers, non-negative floats (truncated) and numeric strings.
#[must_use]
pub fn count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => {
            if let Some(unsigned) = number.as_u64() {
                return Some(unsigned);
            }
            let float = number.as_f64()?;
            if float.is_finite() && float >= 0.0 {
                Some(float as u64)
            } else {
                None
            }
        }
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Reads a finite floating point number from a number or numeric string.
#[must_use]
pub fn number(value: &Value) -> Option<f32> {
    let parsed = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed as f32)
}

/// Reads a non-empty, trimmed string.
#[must_use]
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        _ => None,
    }
}

/// Normalises a user-facing key: lowercase, trimmed, spaces and dashes as `_`.
#[must_use]
pub fn key(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}
