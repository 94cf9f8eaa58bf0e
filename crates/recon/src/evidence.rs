use std::collections::BTreeMap;

use crate::model::{ExactMatch, PartialMatch, ReconBucket, ReconSummary};

/// Compute summary statistics from the four buckets.
pub fn compute_summary(
    exact: &[ExactMatch],
    partial: &[PartialMatch],
    gst_only: usize,
    tally_only: usize,
    date_failures: usize,
) -> ReconSummary {
    let minor_partials = partial.iter().filter(|m| m.is_minor).count();

    let mut bucket_counts: BTreeMap<String, usize> = BTreeMap::new();
    for (bucket, n) in [
        (ReconBucket::ExactMatch, exact.len()),
        (ReconBucket::PartialMatch, partial.len()),
        (ReconBucket::GstOnly, gst_only),
        (ReconBucket::TallyOnly, tally_only),
    ] {
        bucket_counts.insert(bucket.to_string(), n);
    }

    ReconSummary {
        gst_records: exact.len() + partial.len() + gst_only,
        tally_records: exact.len() + partial.len() + tally_only,
        exact_matches: exact.len(),
        partial_matches: partial.len(),
        minor_partials,
        major_partials: partial.len() - minor_partials,
        gst_only,
        tally_only,
        date_failures,
        bucket_counts,
    }
}
