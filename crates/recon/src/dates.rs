//! Date detection and conversion for the invoice-date column.
//!
//! Heuristics, not calendar validation: a spreadsheet serial is any number
//! strictly between [`SERIAL_MIN`] and [`SERIAL_MAX`], and textual dates accept
//! day 1-31 regardless of month. Downstream matching depends on exactly this
//! tolerance.

use chrono::{Duration, NaiveDate};

use crate::model::{CellValue, DateConversionFailure, Record};
use crate::normalize::normalize;

pub const SERIAL_MIN: f64 = 30000.0;
pub const SERIAL_MAX: f64 = 50000.0;

/// Rows inspected by [`detect_date_column`].
pub const DETECTION_SAMPLE_ROWS: usize = 10;

const YEAR_MIN: u32 = 1900;
const YEAR_MAX: u32 = 2100;

/// Only a column named "invoice date" (case and spacing ignored) is eligible.
pub fn is_date_column_name(name: &str) -> bool {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase() == "invoice date"
}

fn serial_value(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => s.trim().parse::<f64>().ok(),
        CellValue::Null => None,
    }
}

fn in_serial_range(n: f64) -> bool {
    n > SERIAL_MIN && n < SERIAL_MAX
}

/// Split `A-B-C` / `A/B/C` (mixed separators allowed) and resolve which part
/// is the year. Returns `(year, month, day)`.
fn parse_parts(raw: &str) -> Option<(u32, u32, u32)> {
    // "2024-01-15 00:00:00" and "2024-01-15T00:00:00" keep only the date
    let head = raw.trim().split(['T', ' ']).next()?;
    let parts: Vec<&str> = head.split(['-', '/']).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }

    let short_ok = |p: &str| p.len() <= 2;
    let num = |p: &str| p.parse::<u32>().ok();

    let (year, first, second, year_first) = if parts[0].len() == 4 && short_ok(parts[1]) && short_ok(parts[2]) {
        (num(parts[0])?, num(parts[1])?, num(parts[2])?, true)
    } else if parts[2].len() == 4 && short_ok(parts[0]) && short_ok(parts[1]) {
        (num(parts[2])?, num(parts[0])?, num(parts[1])?, false)
    } else {
        return None;
    };

    if !(YEAR_MIN..=YEAR_MAX).contains(&year) {
        return None;
    }

    let valid = |month: u32, day: u32| (1..=12).contains(&month) && (1..=31).contains(&day);

    // Year-first reads as Y-M-D, year-last as D/M/Y; fall back to the swap.
    let (preferred, swapped) = if year_first {
        ((first, second), (second, first))
    } else {
        ((second, first), (first, second))
    };
    if valid(preferred.0, preferred.1) {
        Some((year, preferred.0, preferred.1))
    } else if valid(swapped.0, swapped.1) {
        Some((year, swapped.0, swapped.1))
    } else {
        None
    }
}

/// Whether a single value looks like a date (serial or 3-part text).
pub fn is_date_like(value: &CellValue) -> bool {
    if let Some(n) = serial_value(value) {
        return in_serial_range(n);
    }
    match value {
        CellValue::Text(s) => parse_parts(s).is_some(),
        _ => false,
    }
}

/// Classify a column from up to the first [`DETECTION_SAMPLE_ROWS`] rows.
/// Every non-empty sampled value must be date-like and at least one must exist.
pub fn detect_date_column(sample: &[Record], column: &str) -> bool {
    let mut seen = false;
    for record in sample.iter().take(DETECTION_SAMPLE_ROWS) {
        let value = record.get(column);
        if normalize(value).is_zero() {
            continue;
        }
        if !is_date_like(value) {
            return false;
        }
        seen = true;
    }
    seen
}

/// Spreadsheet serial → `YYYY-MM-DD`. Day 1 is 1900-01-01; serials past 59
/// skip the phantom 1900-02-29. The fractional (time) part is ignored.
pub fn serial_to_date(serial: f64) -> Option<String> {
    if !serial.is_finite() {
        return None;
    }
    let mut days = serial.floor() as i64;
    if days > 59 {
        days -= 1;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 31)?;
    let date = epoch.checked_add_signed(Duration::days(days))?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Convert a date-column value to `YYYY-MM-DD`, or `None` if it is not a
/// recognizable date.
pub fn convert_to_standard_date(value: &CellValue) -> Option<String> {
    if let Some(n) = serial_value(value) {
        return if in_serial_range(n) { serial_to_date(n) } else { None };
    }
    let CellValue::Text(s) = value else {
        return None;
    };
    let (year, month, day) = parse_parts(s)?;
    Some(format!("{year:04}-{month:02}-{day:02}"))
}

/// Outcome of rewriting the detected date columns of one side.
#[derive(Debug, Default)]
pub struct DatePass {
    pub converted_columns: Vec<String>,
    pub failures: Vec<DateConversionFailure>,
}

/// Detect and rewrite eligible date columns in place. Values that fail
/// conversion are left untouched and reported.
pub fn apply_date_columns(records: &mut [Record], columns: &[&str]) -> DatePass {
    let mut pass = DatePass::default();

    for &column in columns {
        if !is_date_column_name(column) || pass.converted_columns.iter().any(|c| c == column) {
            continue;
        }
        if !detect_date_column(records, column) {
            tracing::debug!(column, "invoice date column not classified as dates");
            continue;
        }

        for record in records.iter_mut() {
            let value = record.get(column);
            if normalize(value).is_zero() {
                continue;
            }
            match convert_to_standard_date(value) {
                Some(date) => record.set(column, CellValue::Text(date)),
                None => {
                    let raw = normalize(value).as_text().to_string();
                    tracing::warn!(record = %record.id, column, value = %raw, "cannot convert date");
                    pass.failures.push(DateConversionFailure {
                        record_id: record.id.clone(),
                        column: column.to_string(),
                        value: raw,
                    });
                }
            }
        }
        pass.converted_columns.push(column.to_string());
    }

    pass
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::from(s)
    }

    #[test]
    fn column_name_policy() {
        assert!(is_date_column_name("Invoice Date"));
        assert!(is_date_column_name("  invoice   DATE "));
        assert!(!is_date_column_name("Invoice date (dd-mm-yyyy)"));
        assert!(!is_date_column_name("Date"));
    }

    #[test]
    fn serial_range_is_exclusive() {
        assert!(is_date_like(&CellValue::Number(45000.0)));
        assert!(is_date_like(&text("45000")));
        assert!(!is_date_like(&CellValue::Number(30000.0)));
        assert!(!is_date_like(&CellValue::Number(50000.0)));
        assert!(!is_date_like(&CellValue::Number(100.0)));
    }

    #[test]
    fn textual_dates() {
        assert!(is_date_like(&text("15/01/2024")));
        assert!(is_date_like(&text("2024-01-15")));
        assert!(is_date_like(&text("1-2-2024")));
        assert!(is_date_like(&text("15-01/2024")));
        assert!(!is_date_like(&text("25-26/0001")));
        assert!(!is_date_like(&text("32/01/2024")));
        assert!(!is_date_like(&text("15/13/2024")));
        assert!(!is_date_like(&text("15/01/1899")));
        assert!(!is_date_like(&text("15/01/24")));
        assert!(!is_date_like(&text("INV-01-2024")));
        assert!(!is_date_like(&CellValue::Null));
    }

    #[test]
    fn day_range_not_month_aware() {
        assert_eq!(convert_to_standard_date(&text("31/02/2024")).as_deref(), Some("2024-02-31"));
    }

    #[test]
    fn conversion_round_trips() {
        assert_eq!(convert_to_standard_date(&text("15/01/2024")).as_deref(), Some("2024-01-15"));
        assert_eq!(convert_to_standard_date(&text("2024-01-15")).as_deref(), Some("2024-01-15"));
        assert_eq!(convert_to_standard_date(&text("2024/1/5")).as_deref(), Some("2024-01-05"));
        assert_eq!(
            convert_to_standard_date(&text("2024-01-15T00:00:00.000Z")).as_deref(),
            Some("2024-01-15")
        );
    }

    #[test]
    fn ambiguous_day_month_prefers_day_first() {
        assert_eq!(convert_to_standard_date(&text("03/04/2024")).as_deref(), Some("2024-04-03"));
        // only month-first is valid
        assert_eq!(convert_to_standard_date(&text("12/31/2024")).as_deref(), Some("2024-12-31"));
    }

    #[test]
    fn invalid_dates_yield_none() {
        assert_eq!(convert_to_standard_date(&text("hello")), None);
        assert_eq!(convert_to_standard_date(&text("13/13/2024")), None);
        assert_eq!(convert_to_standard_date(&CellValue::Number(12.0)), None);
        assert_eq!(convert_to_standard_date(&CellValue::Null), None);
    }

    #[test]
    fn serial_conversion() {
        assert_eq!(serial_to_date(45000.0).as_deref(), Some("2023-03-15"));
        assert_eq!(serial_to_date(45000.75).as_deref(), Some("2023-03-15"));
        assert_eq!(serial_to_date(1.0).as_deref(), Some("1900-01-01"));
        assert_eq!(serial_to_date(59.0).as_deref(), Some("1900-02-28"));
        assert_eq!(serial_to_date(61.0).as_deref(), Some("1900-03-01"));
        assert_eq!(serial_to_date(f64::NAN), None);
        assert_eq!(convert_to_standard_date(&CellValue::Number(45000.0)).as_deref(), Some("2023-03-15"));
    }

    fn rows(values: &[CellValue]) -> Vec<Record> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Record::from_pairs(format!("gst:{i}"), [("Invoice Date", v.clone())]))
            .collect()
    }

    #[test]
    fn detection_requires_all_non_empty_samples() {
        assert!(detect_date_column(&rows(&[text("15/01/2024"), text(""), CellValue::Number(45000.0)]), "Invoice Date"));
        assert!(!detect_date_column(&rows(&[text("15/01/2024"), text("INV-7")]), "Invoice Date"));
        assert!(!detect_date_column(&rows(&[text(""), CellValue::Null, text("-")]), "Invoice Date"));
        assert!(!detect_date_column(&[], "Invoice Date"));
    }

    #[test]
    fn detection_only_samples_first_rows() {
        let mut values = vec![text("15/01/2024"); DETECTION_SAMPLE_ROWS];
        values.push(text("not a date"));
        assert!(detect_date_column(&rows(&values), "Invoice Date"));
    }

    #[test]
    fn apply_rewrites_and_reports_failures() {
        let mut values = vec![text("15/01/2024"); DETECTION_SAMPLE_ROWS];
        values.push(text("garbage"));
        values.push(text(""));
        let mut records = rows(&values);

        let pass = apply_date_columns(&mut records, &["Invoice Date"]);
        assert_eq!(pass.converted_columns, vec!["Invoice Date"]);
        assert_eq!(records[0].get("Invoice Date"), &text("2024-01-15"));
        assert_eq!(records[10].get("Invoice Date"), &text("garbage"));
        assert_eq!(records[11].get("Invoice Date"), &text(""));
        assert_eq!(pass.failures.len(), 1);
        assert_eq!(pass.failures[0].record_id, "gst:10");
    }

    #[test]
    fn apply_ignores_ineligible_columns() {
        let mut records = vec![Record::from_pairs("gst:0", [("Invoice No", "15/01/2024")])];
        let pass = apply_date_columns(&mut records, &["Invoice No"]);
        assert!(pass.converted_columns.is_empty());
        assert_eq!(records[0].get("Invoice No"), &text("15/01/2024"));
    }
}
