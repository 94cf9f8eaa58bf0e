//! Per-bucket CSV export for a finished reconciliation.
//!
//! Writes into the target directory:
//!   exact_matches.csv    gst_id, tally_id, then gst:/tally: value pairs per mapped column
//!   partial_matches.csv  same, plus discrepancy count, max delta, severity and a readable diff
//!   gst_only.csv         id plus the mapped GST columns
//!   tally_only.csv       id plus the mapped Tally columns

use std::path::{Path, PathBuf};

use gst_recon::model::{CellValue, ColumnMapping, PartialMatch, Record, ReconReport};

use crate::exit_codes::EXIT_RECON_RUNTIME;
use crate::CliError;

pub const EXACT_FILE: &str = "exact_matches.csv";
pub const PARTIAL_FILE: &str = "partial_matches.csv";
pub const GST_ONLY_FILE: &str = "gst_only.csv";
pub const TALLY_ONLY_FILE: &str = "tally_only.csv";

fn export_err(path: &Path, e: impl std::fmt::Display) -> CliError {
    CliError {
        code: EXIT_RECON_RUNTIME,
        message: format!("cannot write {}: {e}", path.display()),
        hint: None,
    }
}

/// Write all four bucket files, creating `dir` if needed. Empty buckets still
/// get a header row.
pub fn write_bucket_csvs(report: &ReconReport, dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    std::fs::create_dir_all(dir).map_err(|e| export_err(dir, e))?;
    let mapping = &report.mapping;

    let exact_rows = report.exact_matches.iter().map(|m| {
        let mut row = vec![m.gst.id.clone(), m.tally.id.clone()];
        row.extend(paired_values(&m.gst, &m.tally, mapping));
        row
    });
    let partial_rows = report.partial_matches.iter().map(|m| partial_row(m, mapping));
    let gst_rows = report.gst_only.iter().map(|r| side_row(r, &mapping.gst_columns()));
    let tally_rows = report.tally_only.iter().map(|r| side_row(r, &mapping.tally_columns()));

    let mut pair_header = vec!["gst_id".to_string(), "tally_id".to_string()];
    pair_header.extend(paired_headers(mapping));

    let mut partial_header = vec![
        "gst_id".to_string(),
        "tally_id".to_string(),
        "discrepancy_count".to_string(),
        "max_discrepancy".to_string(),
        "severity".to_string(),
        "discrepancies".to_string(),
    ];
    partial_header.extend(paired_headers(mapping));

    let written = vec![
        write_csv(&dir.join(EXACT_FILE), pair_header, exact_rows)?,
        write_csv(&dir.join(PARTIAL_FILE), partial_header, partial_rows)?,
        write_csv(&dir.join(GST_ONLY_FILE), side_header(&mapping.gst_columns()), gst_rows)?,
        write_csv(&dir.join(TALLY_ONLY_FILE), side_header(&mapping.tally_columns()), tally_rows)?,
    ];
    tracing::debug!(dir = %dir.display(), files = written.len(), "bucket CSVs written");
    Ok(written)
}

fn write_csv<I>(path: &Path, header: Vec<String>, rows: I) -> Result<PathBuf, CliError>
where
    I: Iterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_path(path).map_err(|e| export_err(path, e))?;
    writer.write_record(&header).map_err(|e| export_err(path, e))?;
    for row in rows {
        writer.write_record(&row).map_err(|e| export_err(path, e))?;
    }
    writer.flush().map_err(|e| export_err(path, e))?;
    Ok(path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Row builders
// ---------------------------------------------------------------------------

/// Cell as it appeared in the source, after date normalization.
fn cell_text(value: &CellValue) -> String {
    match value {
        CellValue::Null => String::new(),
        CellValue::Number(n) => n.to_string(),
        CellValue::Text(s) => s.clone(),
    }
}

fn paired_headers(mapping: &ColumnMapping) -> Vec<String> {
    mapping
        .pairs
        .iter()
        .flat_map(|p| [format!("gst:{}", p.gst), format!("tally:{}", p.tally)])
        .collect()
}

fn paired_values(gst: &Record, tally: &Record, mapping: &ColumnMapping) -> Vec<String> {
    mapping
        .pairs
        .iter()
        .flat_map(|p| [cell_text(gst.get(&p.gst)), cell_text(tally.get(&p.tally))])
        .collect()
}

fn partial_row(m: &PartialMatch, mapping: &ColumnMapping) -> Vec<String> {
    let severity = if m.is_minor { "minor" } else { "major" };
    let diff = m
        .discrepancies
        .iter()
        .map(|d| format!("{}/{}: {} -> {}", d.gst_column, d.tally_column, d.gst_value, d.tally_value))
        .collect::<Vec<_>>()
        .join("; ");

    let mut row = vec![
        m.gst.id.clone(),
        m.tally.id.clone(),
        m.discrepancy_count().to_string(),
        format!("{:.2}", m.max_discrepancy),
        severity.to_string(),
        diff,
    ];
    row.extend(paired_values(&m.gst, &m.tally, mapping));
    row
}

fn side_header(columns: &[&str]) -> Vec<String> {
    std::iter::once("id".to_string())
        .chain(columns.iter().map(|c| c.to_string()))
        .collect()
}

fn side_row(record: &Record, columns: &[&str]) -> Vec<String> {
    std::iter::once(record.id.clone())
        .chain(columns.iter().map(|c| cell_text(record.get(c))))
        .collect()
}
