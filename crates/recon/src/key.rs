use serde::Serialize;

use crate::model::Record;
use crate::normalize::comparable;

/// Joins key components. Components escape it, so it never appears inside one.
pub const KEY_SEPARATOR: char = '|';

/// Equality fingerprint of a record over a list of mapped columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MatchKey(String);

impl MatchKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Comparable form of each listed column, in order.
pub fn key_parts(record: &Record, columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| comparable(record.get(c))).collect()
}

/// Join already-comparable parts into a key.
pub fn key_from_parts(parts: &[String]) -> MatchKey {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(KEY_SEPARATOR);
        }
        for ch in part.chars() {
            if ch == KEY_SEPARATOR || ch == '\\' {
                out.push('\\');
            }
            out.push(ch);
        }
    }
    MatchKey(out)
}

/// Project a record through the mapped columns into a single key. Two records
/// are key-equal iff every mapped field is equal after normalization.
pub fn build_key(record: &Record, columns: &[&str]) -> MatchKey {
    key_from_parts(&key_parts(record, columns))
}
