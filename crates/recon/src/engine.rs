use crate::dates::apply_date_columns;
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::matcher::{match_exact, match_partial, PartialPolicy};
use crate::model::{CellValue, ColumnMapping, DateColumns, Record, ReconMeta, ReconReport};

/// Knobs for one reconciliation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconOptions {
    pub name: String,
    pub partial: PartialPolicy,
    /// Rewrite detected "invoice date" columns to `YYYY-MM-DD` before matching.
    pub detect_dates: bool,
}

impl Default for ReconOptions {
    fn default() -> Self {
        Self {
            name: "gst-vs-tally".into(),
            partial: PartialPolicy::default(),
            detect_dates: true,
        }
    }
}

/// Reconcile GST against Tally with default options.
pub fn reconcile(gst: &[Record], tally: &[Record], mapping: &ColumnMapping) -> Result<ReconReport, ReconError> {
    reconcile_with(gst, tally, mapping, &ReconOptions::default())
}

/// Run the full pipeline: dates → exact → partial → residual → summary.
///
/// Every input record lands in exactly one bucket of the report.
pub fn reconcile_with(
    gst: &[Record],
    tally: &[Record],
    mapping: &ColumnMapping,
    options: &ReconOptions,
) -> Result<ReconReport, ReconError> {
    let mapping = mapping.active()?;
    if options.partial.budget == 0 {
        return Err(ReconError::Configuration("partial budget must be at least 1".into()));
    }

    let mut gst_rows = gst.to_vec();
    let mut tally_rows = tally.to_vec();

    let mut date_columns = DateColumns::default();
    let mut date_failures = Vec::new();
    if options.detect_dates {
        let gst_pass = apply_date_columns(&mut gst_rows, &mapping.gst_columns());
        let tally_pass = apply_date_columns(&mut tally_rows, &mapping.tally_columns());
        date_columns.gst = gst_pass.converted_columns;
        date_columns.tally = tally_pass.converted_columns;
        date_failures.extend(gst_pass.failures);
        date_failures.extend(tally_pass.failures);
    }

    tracing::debug!(
        gst = gst_rows.len(),
        tally = tally_rows.len(),
        columns = mapping.len(),
        "starting reconciliation"
    );

    let exact_out = match_exact(gst_rows, tally_rows, &mapping);
    tracing::debug!(
        exact = exact_out.exact.len(),
        remaining_gst = exact_out.remaining_gst.len(),
        remaining_tally = exact_out.remaining_tally.len(),
        "exact matching done"
    );

    let partial_out = match_partial(
        exact_out.remaining_gst,
        exact_out.remaining_tally,
        &mapping,
        &options.partial,
    );
    tracing::debug!(
        partial = partial_out.partial.len(),
        gst_only = partial_out.gst_only.len(),
        tally_only = partial_out.tally_only.len(),
        "partial matching done"
    );

    let summary = compute_summary(
        &exact_out.exact,
        &partial_out.partial,
        partial_out.gst_only.len(),
        partial_out.tally_only.len(),
        date_failures.len(),
    );

    Ok(ReconReport {
        meta: ReconMeta {
            name: options.name.clone(),
            mapped_columns: mapping.len(),
            partial_budget: options.partial.budget,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        mapping,
        date_columns,
        date_failures,
        exact_matches: exact_out.exact,
        partial_matches: partial_out.partial,
        gst_only: partial_out.gst_only,
        tally_only: partial_out.tally_only,
    })
}

/// Load CSV text (header row required) into records with ids `<side>:<row>`.
/// Empty cells become `Null`; short rows leave trailing columns missing.
pub fn load_csv_records(side: &str, csv_data: &str) -> Result<Vec<Record>, ReconError> {
    let csv_err = |e: csv::Error| ReconError::Csv {
        side: side.to_string(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let raw = result.map_err(csv_err)?;
        let mut record = Record::new(format!("{side}:{row}"));
        for (header, value) in headers.iter().zip(raw.iter()) {
            if header.is_empty() {
                continue;
            }
            let cell = if value.trim().is_empty() {
                CellValue::Null
            } else {
                CellValue::Text(value.to_string())
            };
            record.set(header.clone(), cell);
        }
        records.push(record);
    }

    tracing::debug!(side, rows = records.len(), columns = headers.len(), "loaded CSV");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReconBucket;

    fn scenario_mapping() -> ColumnMapping {
        ColumnMapping::from_pairs([("Invoice No", "Inv"), ("Amount", "Amt")])
    }

    fn money_options() -> ReconOptions {
        ReconOptions {
            partial: PartialPolicy::default().with_monetary_columns(["Amount"]),
            ..ReconOptions::default()
        }
    }

    fn gst_row(id: &str, inv: &str, amount: &str) -> Record {
        Record::from_pairs(id, [("Invoice No", inv), ("Amount", amount)])
    }

    fn tally_row(id: &str, inv: &str, amt: &str) -> Record {
        Record::from_pairs(id, [("Inv", inv), ("Amt", amt)])
    }

    #[test]
    fn load_csv_basic() {
        let csv = "\
Invoice No,Invoice Date,Taxable Value
25-26/0001,15/01/2024,1000
INV-2,,500.50
";
        let rows = load_csv_records("gst", csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "gst:0");
        assert_eq!(rows[0].get("Invoice No"), &CellValue::from("25-26/0001"));
        assert_eq!(rows[1].get("Invoice Date"), &CellValue::Null);
        assert_eq!(rows[1].get("Taxable Value"), &CellValue::from("500.50"));
    }

    #[test]
    fn load_csv_short_rows() {
        let csv = "a,b,c\n1,2\n";
        let rows = load_csv_records("tally", csv).unwrap();
        assert_eq!(rows[0].get("b"), &CellValue::from("2"));
        assert_eq!(rows[0].get("c"), &CellValue::Null);
    }

    #[test]
    fn scenario_a_exact_match() {
        let report = reconcile(
            &[gst_row("g0", "INV1", "100")],
            &[tally_row("t0", "INV1", "100")],
            &scenario_mapping(),
        )
        .unwrap();
        assert_eq!(report.summary.exact_matches, 1);
        assert!(report.partial_matches.is_empty());
        assert!(report.gst_only.is_empty());
        assert!(report.tally_only.is_empty());
        assert!(report.summary.is_clean());
    }

    #[test]
    fn scenario_b_minor_partial() {
        let report = reconcile_with(
            &[gst_row("g0", "INV1", "100")],
            &[tally_row("t0", "INV1", "100.50")],
            &scenario_mapping(),
            &money_options(),
        )
        .unwrap();
        assert_eq!(report.partial_matches.len(), 1);
        let m = &report.partial_matches[0];
        assert_eq!(m.discrepancy_count(), 1);
        assert_eq!(m.max_discrepancy, 0.5);
        assert!(m.is_minor);
        assert_eq!(report.summary.minor_partials, 1);
    }

    #[test]
    fn scenario_c_major_partial() {
        let report = reconcile_with(
            &[gst_row("g0", "INV1", "100")],
            &[tally_row("t0", "INV1", "150")],
            &scenario_mapping(),
            &money_options(),
        )
        .unwrap();
        let m = &report.partial_matches[0];
        assert_eq!(m.max_discrepancy, 50.0);
        assert!(!m.is_minor);
        assert_eq!(report.summary.major_partials, 1);
    }

    #[test]
    fn scenario_d_no_tally() {
        let gst = vec![gst_row("g0", "INV1", "100"), gst_row("g1", "INV2", "200")];
        let report = reconcile(&gst, &[], &scenario_mapping()).unwrap();
        assert_eq!(report.gst_only.len(), 2);
        assert_eq!(report.summary.bucket_counts["gst_only"], 2);
        assert!(report.results().iter().all(|r| r.bucket() == ReconBucket::GstOnly));
    }

    #[test]
    fn scenario_e_duplicate_keys() {
        let gst = vec![gst_row("g0", "INV1", "100"), gst_row("g1", "INV1", "100")];
        let tally = vec![tally_row("t0", "INV1", "100"), tally_row("t1", "INV1", "100")];
        let report = reconcile(&gst, &tally, &scenario_mapping()).unwrap();
        assert_eq!(report.exact_matches.len(), 2);
        assert!(report.partial_matches.is_empty());
        assert!(report.gst_only.is_empty());
        assert!(report.tally_only.is_empty());
    }

    #[test]
    fn empty_mapping_is_configuration_error() {
        let err = reconcile(&[], &[], &ColumnMapping::from_pairs([("", "Inv")])).unwrap_err();
        assert!(matches!(err, ReconError::Configuration(_)));
    }

    #[test]
    fn zero_budget_is_configuration_error() {
        let options = ReconOptions {
            partial: PartialPolicy { budget: 0, ..PartialPolicy::default() },
            ..ReconOptions::default()
        };
        let err = reconcile_with(&[], &[], &scenario_mapping(), &options).unwrap_err();
        assert!(matches!(err, ReconError::Configuration(_)));
    }

    #[test]
    fn dates_normalized_before_matching() {
        let mapping = ColumnMapping::from_pairs([("Invoice No", "Inv"), ("Invoice Date", "invoice  date")]);
        let gst = vec![Record::from_pairs("g0", [("Invoice No", CellValue::from("INV1")), ("Invoice Date", CellValue::from("15/01/2024"))])];
        let tally = vec![Record::from_pairs("t0", [("Inv", CellValue::from("INV1")), ("invoice  date", CellValue::Number(45306.0))])];
        let report = reconcile(&gst, &tally, &mapping).unwrap();
        assert_eq!(report.exact_matches.len(), 1, "{report:#?}");
        assert_eq!(report.date_columns.gst, vec!["Invoice Date"]);
        assert_eq!(report.date_columns.tally, vec!["invoice  date"]);
        assert_eq!(report.exact_matches[0].tally.get("invoice  date"), &CellValue::from("2024-01-15"));
    }

    #[test]
    fn date_detection_can_be_disabled() {
        let mapping = ColumnMapping::from_pairs([("Invoice No", "Inv"), ("Invoice Date", "Invoice Date")]);
        let gst = vec![Record::from_pairs("g0", [("Invoice No", "INV1"), ("Invoice Date", "15/01/2024")])];
        let tally = vec![Record::from_pairs("t0", [("Inv", "INV1"), ("Invoice Date", "2024-01-15")])];
        let options = ReconOptions { detect_dates: false, ..ReconOptions::default() };
        let report = reconcile_with(&gst, &tally, &mapping, &options).unwrap();
        assert_eq!(report.partial_matches.len(), 1);
        assert!(report.date_columns.gst.is_empty());
    }

    #[test]
    fn invoice_numbers_with_separators_survive() {
        let mapping = ColumnMapping::from_pairs([("Invoice No", "Inv")]);
        let gst = vec![Record::from_pairs("g0", [("Invoice No", "25-26/0001")])];
        let tally = vec![Record::from_pairs("t0", [("Inv", "25-26/0001")])];
        let report = reconcile(&gst, &tally, &mapping).unwrap();
        assert_eq!(report.exact_matches[0].gst.get("Invoice No"), &CellValue::from("25-26/0001"));
    }
}
