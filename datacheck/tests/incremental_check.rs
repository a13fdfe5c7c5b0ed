use std::collections::BTreeSet;
use std::sync::Arc;

use datacheck::check::IncrementalCheck;
use datacheck::endpoint::memory::MemoryEndpoint;
use datacheck::report::{CheckStatus, MemoryReportSink};
use datacheck::test_utils::endpoints::seeded_pair;
use datacheck::test_utils::rows::{row_hash, row_hashes, with_changed_row};
use datacheck::types::ChangeLogEntry;
use datacheck_config::shared::{CheckConfig, TableCheckConfig};
use datacheck_telemetry::tracing::init_test_tracing;
use rand::random;

fn test_config(table: &str) -> CheckConfig {
    CheckConfig {
        schema: "public".to_string(),
        tables: vec![TableCheckConfig {
            name: table.to_string(),
            estimated_rows: 0,
        }],
        bucket_capacity: 4,
        max_check_workers: 2,
        max_rows_per_task: 100_000,
        result_dir: "check_result".to_string(),
        enable_repair: false,
        extraction_poll_retries: 5,
        extraction_poll_delay_ms: 10,
    }
}

fn change_log(table: &str, keys: &[&str]) -> ChangeLogEntry {
    ChangeLogEntry {
        table_name: table.to_string(),
        composite_primary_key_columns: vec!["id".to_string()],
        composite_primary_key_values: keys.iter().map(|k| k.to_string()).collect(),
    }
}

fn incremental_check(
    table: &str,
    source: MemoryEndpoint,
    sink: MemoryEndpoint,
    reports: MemoryReportSink,
) -> IncrementalCheck<MemoryEndpoint, MemoryEndpoint, MemoryReportSink> {
    IncrementalCheck::new(
        format!("test-{}", random::<u32>()),
        Arc::new(test_config(table)),
        source,
        sink,
        reports,
    )
}

#[tokio::test]
async fn matching_changed_rows_report_consistent() {
    init_test_tracing();

    let rows = row_hashes(100);
    let (source, sink) = seeded_pair("users", rows.clone(), rows).await;
    let keys: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    source.set_changed_keys("users", keys.clone()).await;
    sink.set_changed_keys("users", keys).await;

    let reports = MemoryReportSink::new();
    let check = incremental_check("users", source, sink, reports.clone());

    let report = check
        .run_table(&change_log(
            "users",
            &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"],
        ))
        .await
        .unwrap();

    assert_eq!(report.status, CheckStatus::Consistent);
    assert_eq!(report.diff_key_count(), 0);
}

#[tokio::test]
async fn persistent_divergence_survives_the_secondary_check() {
    init_test_tracing();

    let rows = row_hashes(100);
    let sink_rows = with_changed_row(&rows, "5");
    let (source, sink) = seeded_pair("users", rows, sink_rows).await;
    let keys = vec!["5".to_string(), "6".to_string()];
    source.set_changed_keys("users", keys.clone()).await;
    sink.set_changed_keys("users", keys).await;

    let reports = MemoryReportSink::new();
    let check = incremental_check("users", source, sink, reports.clone());

    let report = check
        .run_table(&change_log("users", &["5", "6"]))
        .await
        .unwrap();

    // Phase one flags "5"; phase two re-fetches it and still sees the
    // divergence, so it stays in the report.
    assert_eq!(report.status, CheckStatus::Divergent);
    assert_eq!(report.update_keys, BTreeSet::from(["5".to_string()]));
    assert!(report.insert_keys.is_empty());
    assert!(report.delete_keys.is_empty());
}

#[tokio::test]
async fn racy_false_positive_converges_in_phase_two() {
    init_test_tracing();

    let rows = row_hashes(200);
    let (source, sink) = seeded_pair("users", rows.clone(), rows.clone()).await;
    let keys = vec!["99".to_string(), "100".to_string()];
    source.set_changed_keys("users", keys.clone()).await;
    sink.set_changed_keys("users", keys).await;

    // The sink's increment stream still carries a hash computed before the
    // row settled; the live row already matches the source.
    let stale = row_hash("99", 0xDEAD_0000_BEEF);
    sink.set_increment_override("users", stale).await;

    let reports = MemoryReportSink::new();
    let check = incremental_check("users", source, sink, reports.clone());

    let report = check
        .run_table(&change_log("users", &["99", "100"]))
        .await
        .unwrap();

    assert_eq!(report.status, CheckStatus::Consistent);
    assert!(!report.update_keys.contains("99"));
    assert_eq!(report.diff_key_count(), 0);
}

#[tokio::test]
async fn deleted_row_shows_up_from_the_change_log() {
    init_test_tracing();

    let rows = row_hashes(50);
    let (source, sink) = seeded_pair("users", rows.clone(), rows).await;
    sink.remove_row("users", "7").await;
    let keys = vec!["7".to_string(), "8".to_string()];
    source.set_changed_keys("users", keys.clone()).await;
    sink.set_changed_keys("users", keys).await;

    let reports = MemoryReportSink::new();
    let check = incremental_check("users", source, sink, reports.clone());

    let report = check
        .run_table(&change_log("users", &["7", "8"]))
        .await
        .unwrap();

    assert_eq!(report.status, CheckStatus::Divergent);
    assert_eq!(report.insert_keys, BTreeSet::from(["7".to_string()]));
}

#[tokio::test]
async fn structural_mismatch_is_fatal_and_distinct() {
    init_test_tracing();

    let source = MemoryEndpoint::new();
    let sink = MemoryEndpoint::new();
    source.add_table("users", "id", 0x1111).await;
    sink.add_table("users", "id", 0x2222).await;
    source.upsert_rows("users", row_hashes(10)).await;
    sink.upsert_rows("users", row_hashes(10)).await;

    let reports = MemoryReportSink::new();
    let check = incremental_check("users", source, sink, reports.clone());

    let report = check.run_table(&change_log("users", &["1"])).await.unwrap();

    assert_eq!(report.status, CheckStatus::Failed);
    let cause = report.failure_cause.unwrap();
    assert!(cause.contains("TableStructureMismatch"));
    assert_eq!(report.insert_keys.len() + report.update_keys.len(), 0);
}

#[tokio::test]
async fn missing_table_is_fatal_before_any_row_comparison() {
    init_test_tracing();

    let source = MemoryEndpoint::new();
    let sink = MemoryEndpoint::new();
    source.add_table("users", "id", 0x1111).await;
    // The table was never created on the sink.

    let reports = MemoryReportSink::new();
    let check = incremental_check("users", source, sink, reports.clone());

    let report = check.run_table(&change_log("users", &["1"])).await.unwrap();

    assert_eq!(report.status, CheckStatus::Failed);
    assert!(report.failure_cause.unwrap().contains("TableMissing"));
}

#[tokio::test]
async fn batch_isolates_failing_tables() {
    init_test_tracing();

    let rows = row_hashes(20);
    let (source, sink) = seeded_pair("healthy", rows.clone(), rows).await;
    source.add_table("broken", "id", 0xAAAA).await;
    sink.add_table("broken", "id", 0xBBBB).await;
    let keys = vec!["1".to_string()];
    source.set_changed_keys("healthy", keys.clone()).await;
    sink.set_changed_keys("healthy", keys).await;

    let reports = MemoryReportSink::new();
    let check = incremental_check("healthy", source, sink, reports.clone());

    let emitted = check
        .run_batch(&[change_log("broken", &["1"]), change_log("healthy", &["1"])])
        .await
        .unwrap();

    assert_eq!(emitted.len(), 2);
    assert_eq!(emitted[0].status, CheckStatus::Failed);
    assert_eq!(emitted[1].status, CheckStatus::Consistent);
    assert_eq!(reports.reports().await.len(), 2);
}
