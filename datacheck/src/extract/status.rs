//! Shared extraction-status registry.
//!
//! When a table's extraction is split into shards, the check worker for that
//! table must not start draining streams until every shard has been published.
//! The registry is the one place where tasks coordinate: shard completion is
//! recorded with an atomic read-modify-write under a single lock, and the
//! consumer polls with bounded retries and a fixed delay — readiness is
//! registry state, not an event.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use crate::check_error;
use crate::error::{CheckResult, ErrorKind};

/// Completion state of one table's extraction.
#[derive(Debug, Default)]
struct TableExtractionStatus {
    expected_shards: u32,
    completed_shards: HashSet<u32>,
}

impl TableExtractionStatus {
    fn is_complete(&self) -> bool {
        self.completed_shards.len() >= self.expected_shards as usize
    }
}

/// Concurrency-safe registry tracking shard completion per table.
///
/// Clones share the same underlying map. The lock is a standard mutex and is
/// never held across an await point.
#[derive(Debug, Clone, Default)]
pub struct ExtractionStatusRegistry {
    inner: Arc<Mutex<HashMap<String, TableExtractionStatus>>>,
}

impl ExtractionStatusRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table with the number of shards its extraction plan holds.
    ///
    /// Re-registering resets the completion state for that table.
    pub fn register_table(&self, table: &str, expected_shards: u32) {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.insert(
            table.to_string(),
            TableExtractionStatus {
                expected_shards,
                completed_shards: HashSet::new(),
            },
        );
    }

    /// Marks one shard of a table as fully published.
    ///
    /// Returns true when the table became complete with this update. Unknown
    /// tables are created on the fly so publishers and planners do not need
    /// to agree on registration order.
    pub fn mark_shard_complete(&self, table: &str, shard: u32) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let status = inner.entry(table.to_string()).or_default();
        status.completed_shards.insert(shard);

        status.is_complete()
    }

    /// Marks every expected shard of a table as published.
    pub fn complete_table(&self, table: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let status = inner.entry(table.to_string()).or_default();
        for shard in 0..status.expected_shards {
            status.completed_shards.insert(shard);
        }
    }

    /// Returns true when every expected shard of the table has been published.
    ///
    /// Unknown tables are not complete.
    pub fn is_table_complete(&self, table: &str) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner
            .get(table)
            .map(TableExtractionStatus::is_complete)
            .unwrap_or(false)
    }

    /// Polls until the table's extraction is complete.
    ///
    /// Checks the registry up to `max_retries + 1` times with a fixed delay
    /// between attempts. Exhausting the retries fails the current run with
    /// [`ErrorKind::ExtractionIncomplete`]; the next scheduled run may
    /// succeed once the extraction catches up.
    pub async fn wait_table_complete(
        &self,
        table: &str,
        max_retries: u32,
        delay: Duration,
    ) -> CheckResult<()> {
        for attempt in 0..=max_retries {
            if self.is_table_complete(table) {
                debug!(table, attempt, "table extraction complete");
                return Ok(());
            }

            if attempt < max_retries {
                tokio::time::sleep(delay).await;
            }
        }

        warn!(table, max_retries, "table extraction did not complete in time");

        Err(check_error!(
            ErrorKind::ExtractionIncomplete,
            "Table extraction did not complete in time",
            format!("table '{table}' after {max_retries} retries")
        ))
    }
}
