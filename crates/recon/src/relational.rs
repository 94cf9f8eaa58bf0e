//! Set-operation formulation of matching, for callers that push the work into
//! a query engine.
//!
//! `exact_match_set` is the multiset intersection of projected key tuples
//! (`INTERSECT ALL`). `partial_candidates` selects rows whose identifying
//! prefix (first two mapped columns) meets the other side while their full
//! tuple does not. The exact set must equal the in-memory matcher's.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::key::{build_key, MatchKey};
use crate::model::{ColumnMapping, ExactMatch, Record, ReconReport};

/// Number of leading mapped columns that identify an invoice.
pub const PREFIX_COLUMNS: usize = 2;

fn key_counts<'a, I>(records: I, columns: &[&str]) -> BTreeMap<MatchKey, usize>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut counts = BTreeMap::new();
    for r in records {
        *counts.entry(build_key(r, columns)).or_insert(0) += 1;
    }
    counts
}

/// Multiset intersection of GST and Tally key tuples: key → number of pairs.
pub fn exact_match_set<'a, G, T>(gst: G, tally: T, mapping: &ColumnMapping) -> BTreeMap<MatchKey, usize>
where
    G: IntoIterator<Item = &'a Record>,
    T: IntoIterator<Item = &'a Record>,
{
    let gst_counts = key_counts(gst, &mapping.gst_columns());
    let tally_counts = key_counts(tally, &mapping.tally_columns());

    gst_counts
        .into_iter()
        .filter_map(|(key, g)| {
            let t = tally_counts.get(&key).copied().unwrap_or(0);
            let n = g.min(t);
            (n > 0).then_some((key, n))
        })
        .collect()
}

/// Record ids that qualify for partial matching under the set formulation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandidateSets {
    pub gst: Vec<String>,
    pub tally: Vec<String>,
}

/// Rows whose prefix columns intersect across sides but whose full tuples
/// differ from every row on the other side.
pub fn partial_candidates(gst: &[Record], tally: &[Record], mapping: &ColumnMapping) -> CandidateSets {
    let gst_cols = mapping.gst_columns();
    let tally_cols = mapping.tally_columns();
    let width = PREFIX_COLUMNS.min(mapping.len());

    let gst_full: BTreeSet<MatchKey> = gst.iter().map(|r| build_key(r, &gst_cols)).collect();
    let tally_full: BTreeSet<MatchKey> = tally.iter().map(|r| build_key(r, &tally_cols)).collect();
    let gst_prefix: BTreeSet<MatchKey> = gst.iter().map(|r| build_key(r, &gst_cols[..width])).collect();
    let tally_prefix: BTreeSet<MatchKey> =
        tally.iter().map(|r| build_key(r, &tally_cols[..width])).collect();

    CandidateSets {
        gst: pick_candidates(gst, &gst_cols, width, &tally_prefix, &tally_full),
        tally: pick_candidates(tally, &tally_cols, width, &gst_prefix, &gst_full),
    }
}

fn pick_candidates(
    records: &[Record],
    cols: &[&str],
    width: usize,
    other_prefix: &BTreeSet<MatchKey>,
    other_full: &BTreeSet<MatchKey>,
) -> Vec<String> {
    records
        .iter()
        .filter(|r| {
            other_prefix.contains(&build_key(r, &cols[..width])) && !other_full.contains(&build_key(r, cols))
        })
        .map(|r| r.id.clone())
        .collect()
}

/// Key multiset of the pairs an in-memory run produced.
pub fn matched_key_counts(exact: &[ExactMatch], mapping: &ColumnMapping) -> BTreeMap<MatchKey, usize> {
    key_counts(exact.iter().map(|m| &m.gst), &mapping.gst_columns())
}

/// Check the report's exact matches against the set formulation over the
/// same (date-normalized) records.
pub fn exact_sets_agree(report: &ReconReport) -> bool {
    let expected = exact_match_set(report.gst_records(), report.tally_records(), &report.mapping);
    let actual = matched_key_counts(&report.exact_matches, &report.mapping);
    if expected != actual {
        tracing::warn!(
            expected = expected.values().sum::<usize>(),
            actual = actual.values().sum::<usize>(),
            "exact match set disagrees with set formulation"
        );
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> ColumnMapping {
        ColumnMapping::from_pairs([("Invoice No", "Inv"), ("GSTIN", "Party"), ("IGST", "Tax")])
    }

    fn g(id: &str, inv: &str, gstin: &str, igst: &str) -> Record {
        Record::from_pairs(id, [("Invoice No", inv), ("GSTIN", gstin), ("IGST", igst)])
    }

    fn t(id: &str, inv: &str, party: &str, tax: &str) -> Record {
        Record::from_pairs(id, [("Inv", inv), ("Party", party), ("Tax", tax)])
    }

    #[test]
    fn intersection_counts_duplicates_as_multiset() {
        let gst = vec![g("g0", "A", "X", "1"), g("g1", "A", "X", "1"), g("g2", "B", "X", "1")];
        let tally = vec![t("t0", "a", "x", "1"), t("t1", "C", "X", "1")];
        let set = exact_match_set(&gst, &tally, &mapping());
        assert_eq!(set.len(), 1);
        assert_eq!(set.values().sum::<usize>(), 1);
    }

    #[test]
    fn candidates_share_prefix_but_not_tuple() {
        let gst = vec![g("g0", "A", "X", "1"), g("g1", "B", "X", "5"), g("g2", "Z", "Z", "1")];
        let tally = vec![t("t0", "A", "X", "1"), t("t1", "B", "X", "6"), t("t2", "Q", "Q", "1")];
        let c = partial_candidates(&gst, &tally, &mapping());
        assert_eq!(c.gst, vec!["g1"]);
        assert_eq!(c.tally, vec!["t1"]);
    }

    #[test]
    fn single_column_mapping_uses_one_prefix_column() {
        let m = ColumnMapping::from_pairs([("Invoice No", "Inv")]);
        let gst = vec![g("g0", "A", "X", "1")];
        let tally = vec![t("t0", "A", "Y", "2")];
        let c = partial_candidates(&gst, &tally, &m);
        assert!(c.gst.is_empty());
        assert!(c.tally.is_empty());
    }
}
