//! Check orchestration.

pub mod context;
pub mod full;
pub mod incremental;

pub use context::CheckContext;
pub use full::FullCheck;
pub use incremental::IncrementalCheck;

use std::collections::BTreeMap;

use metrics::counter;
use tracing::{info, warn};

use crate::bail;
use crate::bucket::{Bucket, align_buckets, build_buckets};
use crate::diff::{DifferenceSet, compare_buckets};
use crate::error::{CheckResult, ErrorKind};
use crate::metrics::{
    CHECKS_COMPLETED_TOTAL, DIFF_KEYS_TOTAL, OUTCOME_LABEL, ROWS_COMPARED_TOTAL, TABLE_LABEL,
};
use crate::report::{CheckReport, ReportSink};
use crate::types::RowDataHash;

/// Compares two bucket maps that went through alignment.
///
/// The count check is defensive: alignment guarantees equal bucket-number
/// sets, so unequal counts here mean the two sides are too divergent to trust
/// a partial result — fatal, no bucket-level comparison is attempted.
pub fn compare_after_alignment(
    source: BTreeMap<u32, Bucket>,
    sink: BTreeMap<u32, Bucket>,
) -> CheckResult<DifferenceSet> {
    if source.len() != sink.len() {
        bail!(
            ErrorKind::LargeDataDiff,
            "Bucket counts diverged after alignment, table requires resynchronization",
            format!("source={} sink={}", source.len(), sink.len())
        );
    }

    compare_buckets(source, sink)
}

/// Buckets both row sets, aligns them, and computes the difference.
///
/// The single comparison path shared by the full check and both phases of the
/// incremental check.
pub fn bucket_align_compare(
    source_rows: Vec<RowDataHash>,
    sink_rows: Vec<RowDataHash>,
    capacity: u32,
) -> CheckResult<DifferenceSet> {
    let mut source_buckets = build_buckets(source_rows, capacity)?;
    let mut sink_buckets = build_buckets(sink_rows, capacity)?;
    align_buckets(&mut source_buckets, &mut sink_buckets);

    compare_after_alignment(source_buckets, sink_buckets)
}

/// Assembles and emits the report for one finished run.
///
/// This is the always-executed tail of every orchestrator: a report is
/// written whether the run computed a diff or aborted with a fatal error, and
/// the per-run accumulators are released on every path.
pub(crate) async fn emit_report<R>(
    reports: &R,
    mut ctx: CheckContext,
    outcome: CheckResult<()>,
) -> CheckResult<CheckReport>
where
    R: ReportSink + Send + Sync,
{
    let report = match outcome {
        Ok(()) => ctx.to_report(None),
        Err(ref err) => {
            warn!(
                table = %ctx.table,
                partition = ctx.partition,
                error = %err,
                "check run failed"
            );
            ctx.to_report(Some(err))
        }
    };

    counter!(
        CHECKS_COMPLETED_TOTAL,
        TABLE_LABEL => report.table.clone(),
        OUTCOME_LABEL => report.status.as_str()
    )
    .increment(1);
    counter!(ROWS_COMPARED_TOTAL, TABLE_LABEL => report.table.clone())
        .increment(ctx.rows_compared());
    counter!(DIFF_KEYS_TOTAL, TABLE_LABEL => report.table.clone())
        .increment(report.diff_key_count() as u64);

    reports.emit(&report).await?;
    ctx.clear_accumulators();

    info!(
        check_id = %report.check_id,
        table = %report.table,
        partition = report.partition,
        status = ?report.status,
        diff_keys = report.diff_key_count(),
        "check report emitted"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::hash_primary_key;

    fn rows(range: std::ops::Range<u64>) -> Vec<RowDataHash> {
        range
            .map(|i| {
                let (primary_key, primary_key_hash) = hash_primary_key(&[&i.to_string()]);
                RowDataHash {
                    primary_key,
                    primary_key_hash,
                    row_hash: i * 3 + 7,
                }
            })
            .collect()
    }

    #[test]
    fn unequal_bucket_counts_are_fatal() {
        let source = build_buckets(rows(0..30), 4).unwrap();
        let sink = build_buckets(rows(0..3000), 128).unwrap();

        let err = compare_after_alignment(source, sink).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LargeDataDiff);
    }

    #[test]
    fn bucket_align_compare_finds_no_diff_on_identical_rows() {
        let diff = bucket_align_compare(rows(0..200), rows(0..200), 16).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn bucket_align_compare_survives_disjoint_bucket_sets() {
        // Disjoint key ranges can produce disjoint bucket numbers; alignment
        // keeps that a data diff instead of a shape mismatch.
        let diff = bucket_align_compare(rows(0..5), rows(100..105), 4096).unwrap();
        assert_eq!(diff.only_on_source.len(), 5);
        assert_eq!(diff.only_on_sink.len(), 5);
    }
}
