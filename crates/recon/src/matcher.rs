use std::collections::{HashMap, VecDeque};

use serde::Deserialize;

use crate::key::{build_key, key_parts, MatchKey};
use crate::model::{ColumnMapping, Discrepancy, ExactMatch, PartialMatch, Record};
use crate::normalize::{normalize, parse_amount};

/// Tax/monetary column name fragments subject to tolerance classification.
pub const DEFAULT_MONETARY_FRAGMENTS: [&str; 7] = [
    "taxable_value",
    "igst",
    "cgst",
    "sgst",
    "integrated_tax",
    "central_tax",
    "state_ut_tax",
];

pub const DEFAULT_PARTIAL_BUDGET: usize = 3;
pub const DEFAULT_MINOR_THRESHOLD: f64 = 1.0;

// ---------------------------------------------------------------------------
// Exact
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ExactOutput {
    pub exact: Vec<ExactMatch>,
    pub remaining_gst: Vec<Record>,
    pub remaining_tally: Vec<Record>,
}

/// Hash-join GST and Tally on the full mapped-column key.
///
/// Each GST record takes the first not-yet-consumed Tally record with the same
/// key, so duplicate keys pair up 1:1 in input order. Leftovers keep their
/// input order.
pub fn match_exact(gst: Vec<Record>, tally: Vec<Record>, mapping: &ColumnMapping) -> ExactOutput {
    let gst_cols = mapping.gst_columns();
    let tally_cols = mapping.tally_columns();

    let mut index: HashMap<MatchKey, VecDeque<usize>> = HashMap::with_capacity(tally.len());
    for (i, record) in tally.iter().enumerate() {
        index.entry(build_key(record, &tally_cols)).or_default().push_back(i);
    }

    let mut tally_slots: Vec<Option<Record>> = tally.into_iter().map(Some).collect();
    let mut exact = Vec::new();
    let mut remaining_gst = Vec::new();

    for record in gst {
        let key = build_key(&record, &gst_cols);
        let partner = index
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .and_then(|ti| tally_slots[ti].take());

        match partner {
            Some(tally_record) => exact.push(ExactMatch {
                gst: record,
                tally: tally_record,
            }),
            None => remaining_gst.push(record),
        }
    }

    let remaining_tally: Vec<Record> = tally_slots.into_iter().flatten().collect();

    ExactOutput {
        exact,
        remaining_gst,
        remaining_tally,
    }
}

// ---------------------------------------------------------------------------
// Partial
// ---------------------------------------------------------------------------

/// Discrepancy budget and monetary tolerance for partial matching.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PartialPolicy {
    /// Most mismatched columns a candidate may have.
    pub budget: usize,
    /// Monetary deltas below this are minor.
    pub minor_threshold: f64,
    pub monetary_fragments: Vec<String>,
}

impl Default for PartialPolicy {
    fn default() -> Self {
        Self {
            budget: DEFAULT_PARTIAL_BUDGET,
            minor_threshold: DEFAULT_MINOR_THRESHOLD,
            monetary_fragments: DEFAULT_MONETARY_FRAGMENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PartialPolicy {
    /// Default policy plus extra monetary column fragments.
    pub fn with_monetary_columns<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for fragment in extra {
            let fragment: String = fragment.into();
            let fragment = storage_name(fragment.trim());
            if !fragment.is_empty() && !self.monetary_fragments.contains(&fragment) {
                self.monetary_fragments.push(fragment);
            }
        }
        self
    }
}

#[derive(Debug)]
pub struct PartialOutput {
    pub partial: Vec<PartialMatch>,
    pub gst_only: Vec<Record>,
    pub tally_only: Vec<Record>,
}

/// Lower-cased name with every run of non-alphanumerics folded to `_`, the
/// way the storage layer names mapped columns (`Taxable Value (₹)` →
/// `taxable_value_`).
fn storage_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut gap = false;
    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            out.push(ch);
            gap = false;
        } else if !gap {
            out.push('_');
            gap = true;
        }
    }
    out
}

/// Whether a column carries a currency amount, judged by name.
pub fn is_monetary_column(name: &str, fragments: &[String]) -> bool {
    let lower = name.to_lowercase();
    let storage = storage_name(name);
    fragments
        .iter()
        .any(|f| lower.contains(f.as_str()) || storage.contains(f.as_str()))
}

/// Column-by-column disagreements between two records.
pub fn discrepancies(gst: &Record, tally: &Record, mapping: &ColumnMapping) -> Vec<Discrepancy> {
    let gst_parts = key_parts(gst, &mapping.gst_columns());
    let tally_parts = key_parts(tally, &mapping.tally_columns());
    collect_discrepancies(gst, tally, mapping, &gst_parts, &tally_parts)
}

fn collect_discrepancies(
    gst: &Record,
    tally: &Record,
    mapping: &ColumnMapping,
    gst_parts: &[String],
    tally_parts: &[String],
) -> Vec<Discrepancy> {
    mapping
        .pairs
        .iter()
        .enumerate()
        .filter(|(i, _)| gst_parts[*i] != tally_parts[*i])
        .map(|(i, pair)| Discrepancy {
            field_index: i,
            gst_column: pair.gst.clone(),
            tally_column: pair.tally.clone(),
            gst_value: normalize(gst.get(&pair.gst)).as_text().to_string(),
            tally_value: normalize(tally.get(&pair.tally)).as_text().to_string(),
        })
        .collect()
}

/// Mismatch count, giving up as soon as it exceeds `limit`.
fn count_mismatches(gst_parts: &[String], tally_parts: &[String], limit: usize) -> Option<usize> {
    let mut count = 0;
    for (g, t) in gst_parts.iter().zip(tally_parts) {
        if g != t {
            count += 1;
            if count > limit {
                return None;
            }
        }
    }
    Some(count)
}

/// `(max_discrepancy, is_minor)` over the monetary discrepancies.
///
/// Minor means at least one monetary column differs and every monetary delta
/// stays under the policy threshold. No monetary discrepancy gives `(0, false)`.
pub fn classify_severity(discrepancies: &[Discrepancy], policy: &PartialPolicy) -> (f64, bool) {
    let mut max_delta: f64 = 0.0;
    for d in discrepancies {
        let monetary = is_monetary_column(&d.gst_column, &policy.monetary_fragments)
            || is_monetary_column(&d.tally_column, &policy.monetary_fragments);
        if !monetary {
            continue;
        }
        let delta = (parse_amount(&d.gst_value) - parse_amount(&d.tally_value)).abs();
        if delta > max_delta {
            max_delta = delta;
        }
    }
    let is_minor = max_delta > 0.0 && max_delta < policy.minor_threshold;
    (max_delta, is_minor)
}

/// Pair leftover records under a bounded discrepancy budget.
///
/// GST records are visited in input order. Each takes the unconsumed Tally
/// record with the fewest mismatched columns in `1..=budget`; the first record
/// to reach a count wins ties.
pub fn match_partial(
    gst: Vec<Record>,
    tally: Vec<Record>,
    mapping: &ColumnMapping,
    policy: &PartialPolicy,
) -> PartialOutput {
    let gst_cols = mapping.gst_columns();
    let tally_cols = mapping.tally_columns();
    let tally_parts: Vec<Vec<String>> = tally.iter().map(|r| key_parts(r, &tally_cols)).collect();

    let mut tally_slots: Vec<Option<Record>> = tally.into_iter().map(Some).collect();
    let mut partial = Vec::new();
    let mut gst_only = Vec::new();

    for record in gst {
        let parts = key_parts(&record, &gst_cols);

        let mut best: Option<(usize, usize)> = None;
        for (ti, candidate) in tally_parts.iter().enumerate() {
            if tally_slots[ti].is_none() {
                continue;
            }
            let Some(count) = count_mismatches(&parts, candidate, policy.budget) else {
                continue;
            };
            if count == 0 {
                continue;
            }
            if best.map_or(true, |(_, b)| count < b) {
                best = Some((ti, count));
                if count == 1 {
                    break;
                }
            }
        }

        let partner = best.and_then(|(ti, _)| tally_slots[ti].take().map(|t| (ti, t)));
        match partner {
            Some((ti, tally_record)) => {
                let discrepancies =
                    collect_discrepancies(&record, &tally_record, mapping, &parts, &tally_parts[ti]);
                let (max_discrepancy, is_minor) = classify_severity(&discrepancies, policy);
                partial.push(PartialMatch {
                    gst: record,
                    tally: tally_record,
                    discrepancies,
                    max_discrepancy,
                    is_minor,
                });
            }
            None => gst_only.push(record),
        }
    }

    let tally_only: Vec<Record> = tally_slots.into_iter().flatten().collect();

    PartialOutput {
        partial,
        gst_only,
        tally_only,
    }
}
