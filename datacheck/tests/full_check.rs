use std::collections::{BTreeSet, HashMap};

use datacheck::check::FullCheck;
use datacheck::hashing::RowHasher;
use datacheck::endpoint::memory::MemoryEndpoint;
use datacheck::pipeline::CheckPipeline;
use datacheck::report::{CheckStatus, FileReportSink, MemoryReportSink};
use datacheck::test_utils::endpoints::seeded_pair;
use datacheck::test_utils::rows::{row_hashes, with_changed_row, without_row};
use datacheck_config::shared::{CheckConfig, TableCheckConfig};
use datacheck_telemetry::tracing::init_test_tracing;
use rand::random;
use std::sync::Arc;

fn test_config(tables: Vec<TableCheckConfig>) -> CheckConfig {
    CheckConfig {
        schema: "public".to_string(),
        tables,
        bucket_capacity: 4,
        max_check_workers: 2,
        max_rows_per_task: 100_000,
        result_dir: "check_result".to_string(),
        enable_repair: false,
        extraction_poll_retries: 5,
        extraction_poll_delay_ms: 10,
    }
}

fn table(name: &str, estimated_rows: u64) -> TableCheckConfig {
    TableCheckConfig {
        name: name.to_string(),
        estimated_rows,
    }
}

fn process_id() -> String {
    format!("test-{}", random::<u32>())
}

#[tokio::test]
async fn identical_tables_report_consistent() {
    init_test_tracing();

    let rows = row_hashes(10_000);
    let (source, sink) = seeded_pair("users", rows.clone(), rows).await;
    let reports = MemoryReportSink::new();
    let check = FullCheck::new(
        process_id(),
        Arc::new(test_config(vec![table("users", 10_000)])),
        source,
        sink,
        reports.clone(),
    );

    let report = check.run("users", 0).await.unwrap();

    assert_eq!(report.status, CheckStatus::Consistent);
    assert!(report.insert_keys.is_empty());
    assert!(report.update_keys.is_empty());
    assert!(report.delete_keys.is_empty());
    assert_eq!(reports.reports().await.len(), 1);
}

#[tokio::test]
async fn single_updated_row_is_reported() {
    init_test_tracing();

    let rows = row_hashes(5000);
    let sink_rows = with_changed_row(&rows, "42");
    let (source, sink) = seeded_pair("users", rows, sink_rows).await;
    let reports = MemoryReportSink::new();
    let check = FullCheck::new(
        process_id(),
        Arc::new(test_config(vec![table("users", 5000)])),
        source,
        sink,
        reports.clone(),
    );

    let report = check.run("users", 0).await.unwrap();

    assert_eq!(report.status, CheckStatus::Divergent);
    assert_eq!(report.update_keys, BTreeSet::from(["42".to_string()]));
    assert!(report.insert_keys.is_empty());
    assert!(report.delete_keys.is_empty());
}

#[tokio::test]
async fn deleted_row_is_reported_as_insert_key() {
    init_test_tracing();

    let rows = row_hashes(1000);
    let sink_rows = without_row(&rows, "7");
    let (source, sink) = seeded_pair("users", rows, sink_rows).await;
    let reports = MemoryReportSink::new();
    let check = FullCheck::new(
        process_id(),
        Arc::new(test_config(vec![table("users", 1000)])),
        source,
        sink,
        reports.clone(),
    );

    let report = check.run("users", 0).await.unwrap();

    assert_eq!(report.status, CheckStatus::Divergent);
    assert_eq!(report.insert_keys, BTreeSet::from(["7".to_string()]));
    assert!(report.update_keys.is_empty());
    assert!(report.delete_keys.is_empty());
}

#[tokio::test]
async fn empty_tables_are_consistent() {
    init_test_tracing();

    let (source, sink) = seeded_pair("empty", Vec::new(), Vec::new()).await;
    let reports = MemoryReportSink::new();
    let check = FullCheck::new(
        process_id(),
        Arc::new(test_config(vec![table("empty", 0)])),
        source,
        sink,
        reports.clone(),
    );

    let report = check.run("empty", 0).await.unwrap();

    assert_eq!(report.status, CheckStatus::Consistent);
    assert_eq!(report.diff_key_count(), 0);
}

#[tokio::test]
async fn missing_table_produces_a_failed_report() {
    init_test_tracing();

    let source = MemoryEndpoint::new();
    let sink = MemoryEndpoint::new();
    source.add_table("users", "id", 1).await;
    source.upsert_rows("users", row_hashes(10)).await;
    // The sink endpoint never learns about the table.

    let reports = MemoryReportSink::new();
    let check = FullCheck::new(
        process_id(),
        Arc::new(test_config(vec![table("users", 10)])),
        source,
        sink,
        reports.clone(),
    );

    let report = check.run("users", 0).await.unwrap();

    assert_eq!(report.status, CheckStatus::Failed);
    assert!(report.failure_cause.is_some());
    assert_eq!(report.diff_key_count(), 0);
    // The failed run still left exactly one report in the sink.
    assert_eq!(reports.reports().await.len(), 1);
}

#[tokio::test]
async fn repair_statements_are_attached_when_enabled() {
    init_test_tracing();

    let rows = row_hashes(100);
    let sink_rows = with_changed_row(&without_row(&rows, "7"), "42");
    let (source, sink) = seeded_pair("users", rows, sink_rows).await;
    let reports = MemoryReportSink::new();
    let mut config = test_config(vec![table("users", 100)]);
    config.enable_repair = true;
    let check = FullCheck::new(process_id(), Arc::new(config), source, sink, reports.clone());

    let report = check.run("users", 0).await.unwrap();

    assert_eq!(report.status, CheckStatus::Divergent);
    assert_eq!(report.repair_statements.len(), 2);
    assert!(
        report
            .repair_statements
            .iter()
            .any(|s| s.starts_with("INSERT") && s.contains("'7'"))
    );
    assert!(
        report
            .repair_statements
            .iter()
            .any(|s| s.starts_with("UPDATE") && s.contains("'42'"))
    );
}

#[tokio::test]
async fn report_file_is_appended_per_partition() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    let rows = row_hashes(50);
    let (source, sink) = seeded_pair("orders", rows.clone(), rows).await;
    let sink_reports = FileReportSink::new(dir.path());
    let check = FullCheck::new(
        process_id(),
        Arc::new(test_config(vec![table("orders", 50)])),
        source,
        sink,
        sink_reports.clone(),
    );

    check.run("orders", 0).await.unwrap();
    check.run("orders", 0).await.unwrap();

    let path = sink_reports.result_path("orders", 0);
    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let report: datacheck::report::CheckReport = serde_json::from_str(line).unwrap();
        assert_eq!(report.status, CheckStatus::Consistent);
        assert_eq!(report.table, "orders");
    }
}

#[tokio::test]
async fn pipeline_checks_all_partitions_of_all_tables() {
    init_test_tracing();

    // 2500 estimated rows with 1000 rows per task: three partitions.
    let partitions = 3;
    let source = MemoryEndpoint::with_layout(partitions, 100);
    let sink = MemoryEndpoint::with_layout(partitions, 100);
    let rows = row_hashes(2500);
    source.add_table("orders", "id", 1).await;
    sink.add_table("orders", "id", 1).await;
    source.upsert_rows("orders", rows.clone()).await;
    sink.upsert_rows("orders", with_changed_row(&rows, "13")).await;

    let mut config = test_config(vec![table("orders", 2500)]);
    config.max_rows_per_task = 1000;
    config.bucket_capacity = 8;

    let reports = MemoryReportSink::new();
    let mut pipeline = CheckPipeline::new(process_id(), config, source, sink, reports.clone());
    pipeline.start().await.unwrap();
    pipeline.registry().complete_table("orders");
    pipeline.wait().await.unwrap();

    let emitted = reports.reports().await;
    assert_eq!(emitted.len(), partitions as usize);

    let divergent: Vec<_> = emitted
        .iter()
        .filter(|r| r.status == CheckStatus::Divergent)
        .collect();
    assert_eq!(divergent.len(), 1);
    assert_eq!(divergent[0].update_keys, BTreeSet::from(["13".to_string()]));
    for report in &emitted {
        assert_eq!(report.table, "orders");
    }
}

#[tokio::test]
async fn hashed_column_data_flows_through_the_check() {
    init_test_tracing();

    let hasher = RowHasher::new(
        vec!["id".to_string(), "name".to_string(), "email".to_string()],
        vec!["id".to_string()],
    )
    .unwrap();

    let make_row = |id: &str, name: &str, email: &str| {
        let row: HashMap<String, String> = [
            ("id".to_string(), id.to_string()),
            ("name".to_string(), name.to_string()),
            ("email".to_string(), email.to_string()),
        ]
        .into();
        hasher.hash_row(&row).unwrap()
    };

    let source_rows = vec![
        make_row("1", "ada", "ada@example.com"),
        make_row("2", "grace", "grace@example.com"),
        make_row("3", "edsger", "edsger@example.com"),
    ];
    // The sink endpoint hashed the same rows independently, except one row
    // was updated after replication.
    let sink_rows = vec![
        make_row("1", "ada", "ada@example.com"),
        make_row("2", "grace", "grace@corp.example.com"),
        make_row("3", "edsger", "edsger@example.com"),
    ];

    let (source, sink) = seeded_pair("accounts", source_rows, sink_rows).await;
    let reports = MemoryReportSink::new();
    let check = FullCheck::new(
        process_id(),
        Arc::new(test_config(vec![table("accounts", 3)])),
        source,
        sink,
        reports.clone(),
    );

    let report = check.run("accounts", 0).await.unwrap();

    assert_eq!(report.status, CheckStatus::Divergent);
    assert_eq!(report.update_keys, BTreeSet::from(["2".to_string()]));
}

#[tokio::test]
async fn extraction_timeout_fails_the_table_but_not_the_pipeline() {
    init_test_tracing();

    let rows = row_hashes(10);
    let (source, sink) = seeded_pair("users", rows.clone(), rows).await;
    source.add_table("lagging", "id", 1).await;
    sink.add_table("lagging", "id", 1).await;

    let mut config = test_config(vec![table("users", 10), table("lagging", 10)]);
    config.extraction_poll_retries = 2;
    config.extraction_poll_delay_ms = 5;

    let reports = MemoryReportSink::new();
    let mut pipeline = CheckPipeline::new(process_id(), config, source, sink, reports.clone());
    pipeline.start().await.unwrap();
    // Only one of the two tables ever finishes extraction.
    pipeline.registry().complete_table("users");
    pipeline.wait().await.unwrap();

    let emitted = reports.reports().await;
    assert_eq!(emitted.len(), 2);

    let users = emitted.iter().find(|r| r.table == "users").unwrap();
    let lagging = emitted.iter().find(|r| r.table == "lagging").unwrap();
    assert_eq!(users.status, CheckStatus::Consistent);
    assert_eq!(lagging.status, CheckStatus::Failed);
    assert!(lagging.failure_cause.is_some());
}
