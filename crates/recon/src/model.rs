use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A raw spreadsheet cell as handed over by the parsing layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

static NULL_CELL: CellValue = CellValue::Null;

/// One source row. Missing columns read as `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub fields: BTreeMap<String, CellValue>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<K, V, I>(id: impl Into<String>, pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<CellValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            id: id.into(),
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> &CellValue {
        self.fields.get(column).unwrap_or(&NULL_CELL)
    }

    pub fn set(&mut self, column: impl Into<String>, value: CellValue) {
        self.fields.insert(column.into(), value);
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// A GST column declared equivalent to a Tally column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPair {
    pub gst: String,
    pub tally: String,
}

impl ColumnPair {
    pub fn new(gst: impl Into<String>, tally: impl Into<String>) -> Self {
        Self {
            gst: gst.into(),
            tally: tally.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.gst.trim().is_empty() && !self.tally.trim().is_empty()
    }
}

/// Ordered list of mapped columns. Its length is the number of compared features.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    pub pairs: Vec<ColumnPair>,
}

impl ColumnMapping {
    pub fn new(pairs: Vec<ColumnPair>) -> Self {
        Self { pairs }
    }

    pub fn from_pairs<G, T, I>(pairs: I) -> Self
    where
        G: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = (G, T)>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(g, t)| ColumnPair::new(g, t))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn gst_columns(&self) -> Vec<&str> {
        self.pairs.iter().map(|p| p.gst.as_str()).collect()
    }

    pub fn tally_columns(&self) -> Vec<&str> {
        self.pairs.iter().map(|p| p.tally.as_str()).collect()
    }

    /// Drop pairs with an empty side. Fails when nothing usable remains.
    pub fn active(&self) -> Result<ColumnMapping, ReconError> {
        let pairs: Vec<ColumnPair> = self.pairs.iter().filter(|p| p.is_valid()).cloned().collect();
        let dropped = self.pairs.len() - pairs.len();
        if dropped > 0 {
            tracing::warn!(dropped, "ignoring column pairs with an empty side");
        }
        if pairs.is_empty() {
            return Err(ReconError::Configuration(
                "column mapping has no pair with both a GST and a Tally column".into(),
            ));
        }
        Ok(ColumnMapping { pairs })
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A single mapped column on which a GST/Tally pair disagrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    pub field_index: usize,
    pub gst_column: String,
    pub tally_column: String,
    pub gst_value: String,
    pub tally_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExactMatch {
    pub gst: Record,
    pub tally: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialMatch {
    pub gst: Record,
    pub tally: Record,
    pub discrepancies: Vec<Discrepancy>,
    /// Largest absolute delta across monetary columns, 0 when none differ.
    pub max_discrepancy: f64,
    pub is_minor: bool,
}

impl PartialMatch {
    pub fn discrepancy_count(&self) -> usize {
        self.discrepancies.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconBucket {
    ExactMatch,
    PartialMatch,
    GstOnly,
    TallyOnly,
}

impl std::fmt::Display for ReconBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactMatch => write!(f, "exact_match"),
            Self::PartialMatch => write!(f, "partial_match"),
            Self::GstOnly => write!(f, "gst_only"),
            Self::TallyOnly => write!(f, "tally_only"),
        }
    }
}

/// Flat view of one reconciliation outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchResult {
    ExactMatch(ExactMatch),
    PartialMatch(PartialMatch),
    GstOnly { record: Record },
    TallyOnly { record: Record },
}

impl MatchResult {
    pub fn bucket(&self) -> ReconBucket {
        match self {
            Self::ExactMatch(_) => ReconBucket::ExactMatch,
            Self::PartialMatch(_) => ReconBucket::PartialMatch,
            Self::GstOnly { .. } => ReconBucket::GstOnly,
            Self::TallyOnly { .. } => ReconBucket::TallyOnly,
        }
    }

    /// Ids of every record this result accounts for.
    pub fn record_ids(&self) -> Vec<&str> {
        match self {
            Self::ExactMatch(m) => vec![m.gst.id.as_str(), m.tally.id.as_str()],
            Self::PartialMatch(m) => vec![m.gst.id.as_str(), m.tally.id.as_str()],
            Self::GstOnly { record } | Self::TallyOnly { record } => vec![record.id.as_str()],
        }
    }
}

/// A date-column value that could not be converted to `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateConversionFailure {
    pub record_id: String,
    pub column: String,
    pub value: String,
}

/// Columns on each side that were detected as dates and rewritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DateColumns {
    pub gst: Vec<String>,
    pub tally: Vec<String>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconSummary {
    pub gst_records: usize,
    pub tally_records: usize,
    pub exact_matches: usize,
    pub partial_matches: usize,
    pub minor_partials: usize,
    pub major_partials: usize,
    pub gst_only: usize,
    pub tally_only: usize,
    pub date_failures: usize,
    pub bucket_counts: BTreeMap<String, usize>,
}

impl ReconSummary {
    /// True when every record found an exact counterpart.
    pub fn is_clean(&self) -> bool {
        self.partial_matches == 0 && self.gst_only == 0 && self.tally_only == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconMeta {
    pub name: String,
    pub mapped_columns: usize,
    pub partial_budget: usize,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub mapping: ColumnMapping,
    pub date_columns: DateColumns,
    pub date_failures: Vec<DateConversionFailure>,
    pub exact_matches: Vec<ExactMatch>,
    pub partial_matches: Vec<PartialMatch>,
    pub gst_only: Vec<Record>,
    pub tally_only: Vec<Record>,
}

impl ReconReport {
    /// Flatten the four buckets into tagged results, bucket by bucket.
    pub fn results(&self) -> Vec<MatchResult> {
        let mut out = Vec::with_capacity(
            self.exact_matches.len()
                + self.partial_matches.len()
                + self.gst_only.len()
                + self.tally_only.len(),
        );
        out.extend(self.exact_matches.iter().cloned().map(MatchResult::ExactMatch));
        out.extend(self.partial_matches.iter().cloned().map(MatchResult::PartialMatch));
        out.extend(
            self.gst_only
                .iter()
                .cloned()
                .map(|record| MatchResult::GstOnly { record }),
        );
        out.extend(
            self.tally_only
                .iter()
                .cloned()
                .map(|record| MatchResult::TallyOnly { record }),
        );
        out
    }

    /// Every GST record held by the report, in bucket order.
    pub fn gst_records(&self) -> Vec<&Record> {
        self.exact_matches
            .iter()
            .map(|m| &m.gst)
            .chain(self.partial_matches.iter().map(|m| &m.gst))
            .chain(self.gst_only.iter())
            .collect()
    }

    /// Every Tally record held by the report, in bucket order.
    pub fn tally_records(&self) -> Vec<&Record> {
        self.exact_matches
            .iter()
            .map(|m| &m.tally)
            .chain(self.partial_matches.iter().map(|m| &m.tally))
            .chain(self.tally_only.iter())
            .collect()
    }
}
