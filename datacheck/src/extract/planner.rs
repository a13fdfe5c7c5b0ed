//! Shard planning for table extraction.
//!
//! A table's extraction is split into tasks bounded by a maximum row count,
//! one task per Kafka-style partition, so the hash streams the endpoints
//! publish are partition-aligned with the check workers consuming them.

use xxhash_rust::xxh3::xxh3_64;

use crate::bail;
use crate::error::{CheckResult, ErrorKind};
use crate::types::EndpointRole;

/// One extraction shard of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractTask {
    /// Table being extracted.
    pub table: String,
    /// Zero-based shard index; doubles as the stream partition number.
    pub division: u32,
    /// Total number of shards the table was split into.
    pub divisions_total: u32,
    /// First row offset covered by this shard.
    pub offset: u64,
    /// Number of rows covered by this shard.
    pub row_count: u64,
    /// Stream the shard's row hashes are published to.
    pub topic: String,
}

/// Returns the number of partitions a table's extraction is split into.
///
/// At least one partition; grows with the estimated row count so no single
/// task exceeds `max_rows_per_task`.
pub fn partition_count(estimated_rows: u64, max_rows_per_task: u64) -> u32 {
    if max_rows_per_task == 0 || estimated_rows == 0 {
        return 1;
    }

    estimated_rows.div_ceil(max_rows_per_task).min(u32::MAX as u64) as u32
}

/// Derives the deterministic stream name for one process/role/table triple.
///
/// The base name is lowercased so it survives case-insensitive storage; the
/// suffix hashes the exact-case table name, so two tables that differ only in
/// case still get distinct, reproducible topics.
pub fn topic_name(process_id: &str, role: EndpointRole, table: &str) -> String {
    let case_suffix = xxh3_64(table.as_bytes());

    format!(
        "check_{}_{}_{}_{:016x}",
        process_id,
        role.as_str(),
        table.to_lowercase(),
        case_suffix
    )
}

/// Plans the extraction shards for one table on one endpoint.
///
/// Shards partition `0..estimated_rows` into contiguous ranges of at most
/// `max_rows_per_task` rows. An empty table still yields one shard so the
/// downstream check has a stream to drain (it will simply be empty).
pub fn plan_extraction_tasks(
    process_id: &str,
    table: &str,
    estimated_rows: u64,
    max_rows_per_task: u64,
    role: EndpointRole,
) -> CheckResult<Vec<ExtractTask>> {
    if max_rows_per_task == 0 {
        bail!(
            ErrorKind::ConfigError,
            "Maximum rows per extraction task cannot be zero"
        );
    }

    let divisions_total = partition_count(estimated_rows, max_rows_per_task);
    let topic = topic_name(process_id, role, table);

    let mut tasks = Vec::with_capacity(divisions_total as usize);
    let mut remaining = estimated_rows;
    for division in 0..divisions_total {
        let row_count = remaining.min(max_rows_per_task);
        tasks.push(ExtractTask {
            table: table.to_string(),
            division,
            divisions_total,
            offset: u64::from(division) * max_rows_per_task,
            row_count,
            topic: topic.clone(),
        });
        remaining = remaining.saturating_sub(row_count);
    }

    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_count_respects_the_row_bound() {
        assert_eq!(partition_count(0, 1000), 1);
        assert_eq!(partition_count(999, 1000), 1);
        assert_eq!(partition_count(1000, 1000), 1);
        assert_eq!(partition_count(1001, 1000), 2);
        assert_eq!(partition_count(10_000, 1000), 10);
    }

    #[test]
    fn tasks_cover_the_table_without_overlap() {
        let tasks =
            plan_extraction_tasks("p1", "orders", 2500, 1000, EndpointRole::Source).unwrap();

        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].offset, 0);
        assert_eq!(tasks[0].row_count, 1000);
        assert_eq!(tasks[1].offset, 1000);
        assert_eq!(tasks[2].offset, 2000);
        assert_eq!(tasks[2].row_count, 500);
        let total: u64 = tasks.iter().map(|t| t.row_count).sum();
        assert_eq!(total, 2500);
    }

    #[test]
    fn empty_table_still_gets_one_shard() {
        let tasks = plan_extraction_tasks("p1", "empty", 0, 1000, EndpointRole::Sink).unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].row_count, 0);
    }

    #[test]
    fn topic_names_are_deterministic_and_case_distinct() {
        let a = topic_name("p1", EndpointRole::Source, "Users");
        let b = topic_name("p1", EndpointRole::Source, "Users");
        let c = topic_name("p1", EndpointRole::Source, "users");
        let d = topic_name("p1", EndpointRole::Sink, "Users");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        // The lowercased base collides across cases; the suffix must not.
        assert!(a.contains("_users_"));
        assert!(c.contains("_users_"));
    }
}
