//! Cell canonicalization shared by key building, discrepancy counting and
//! monetary comparison.

use crate::model::CellValue;

/// Canonical comparable form of a cell.
///
/// `Zero` stands in for blank-ish cells (`null`, `""`, `"-"`). It reads as `0`
/// for comparison and arithmetic; callers that need the original text keep the
/// raw record around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedValue {
    Zero,
    Text(String),
}

impl NormalizedValue {
    pub fn as_text(&self) -> &str {
        match self {
            Self::Zero => "0",
            Self::Text(s) => s,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Zero)
    }

    pub fn as_number(&self) -> f64 {
        match self {
            Self::Zero => 0.0,
            Self::Text(s) => parse_amount(s),
        }
    }
}

impl From<NormalizedValue> for CellValue {
    fn from(v: NormalizedValue) -> Self {
        match v {
            NormalizedValue::Zero => CellValue::Null,
            NormalizedValue::Text(s) => CellValue::Text(s),
        }
    }
}

/// Canonicalize a raw cell. Never touches separators inside the text, so
/// identifiers like `25-26/0001` survive unchanged.
pub fn normalize(value: &CellValue) -> NormalizedValue {
    match value {
        CellValue::Null => NormalizedValue::Zero,
        CellValue::Number(n) => NormalizedValue::Text(format_number(*n)),
        CellValue::Text(s) => normalize_str(s),
    }
}

pub fn normalize_str(raw: &str) -> NormalizedValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        NormalizedValue::Zero
    } else {
        NormalizedValue::Text(trimmed.to_string())
    }
}

/// Shortest decimal rendering: `100.0` → `100`, `100.5` → `100.5`.
fn format_number(n: f64) -> String {
    if n == 0.0 {
        // folds -0.0
        return "0".to_string();
    }
    format!("{n}")
}

/// Equality form used by both exact and partial matching: normalized,
/// trimmed, lower-cased, with ISO timestamps collapsed to their date.
pub fn comparable(value: &CellValue) -> String {
    let normalized = normalize(value);
    let text = collapse_timestamp(normalized.as_text().trim());
    text.to_lowercase()
}

/// `2024-01-15T00:00:00.000Z` → `2024-01-15`. Anything else is returned as is.
pub fn collapse_timestamp(s: &str) -> &str {
    let b = s.as_bytes();
    let looks_iso = b.len() > 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
        && (b[10] == b'T' || b[10] == b't');
    if looks_iso { &s[..10] } else { s }
}

/// Parse a money-ish string by keeping only digits, `.` and `-`.
/// Unparsable input is `0.0`.
pub fn parse_amount(raw: &str) -> f64 {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    kept.parse::<f64>().unwrap_or(0.0)
}
