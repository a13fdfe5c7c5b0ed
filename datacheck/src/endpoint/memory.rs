use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::bail;
use crate::endpoint::Endpoint;
use crate::error::{CheckResult, ErrorKind};
use crate::repair::RepairKind;
use crate::types::{ChangeLogEntry, RowDataHash};

/// Per-table state held by a [`MemoryEndpoint`].
#[derive(Debug)]
struct TableState {
    metadata_hash: u64,
    primary_key_column: String,
    /// Live rows keyed by rendered primary key.
    rows: BTreeMap<String, RowDataHash>,
    /// Primary keys the change log reported as modified.
    changed_keys: Vec<String>,
    /// Stale hash records served by the increment stream instead of the live
    /// row, emulating a hash computed before the row changed again.
    increment_overrides: HashMap<String, RowDataHash>,
}

#[derive(Debug)]
struct Inner {
    tables: HashMap<String, TableState>,
    partitions: u32,
    page_size: usize,
}

/// In-memory endpoint for testing and development purposes.
///
/// [`MemoryEndpoint`] serves row-hash streams from seeded in-memory tables,
/// making it ideal for exercising check runs without databases or transport.
/// All data is held in memory and lost when the process terminates.
#[derive(Debug, Clone)]
pub struct MemoryEndpoint {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryEndpoint {
    /// Creates an endpoint serving a single partition with the default page
    /// size.
    pub fn new() -> Self {
        Self::with_layout(1, 1000)
    }

    /// Creates an endpoint with an explicit partition count and page size.
    ///
    /// Rows are assigned to partitions by `primary_key_hash % partitions`,
    /// mirroring how a partition-aligned extraction would split a table.
    pub fn with_layout(partitions: u32, page_size: usize) -> Self {
        let inner = Inner {
            tables: HashMap::new(),
            partitions: partitions.max(1),
            page_size: page_size.max(1),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Registers a table with its structure hash and primary key column.
    pub async fn add_table(&self, name: &str, primary_key_column: &str, metadata_hash: u64) {
        let mut inner = self.inner.lock().await;
        inner.tables.insert(
            name.to_string(),
            TableState {
                metadata_hash,
                primary_key_column: primary_key_column.to_string(),
                rows: BTreeMap::new(),
                changed_keys: Vec::new(),
                increment_overrides: HashMap::new(),
            },
        );
    }

    /// Inserts or replaces rows in a table, creating the table on first use.
    pub async fn upsert_rows(&self, table: &str, rows: Vec<RowDataHash>) {
        let mut inner = self.inner.lock().await;
        let state = inner
            .tables
            .entry(table.to_string())
            .or_insert_with(|| TableState {
                metadata_hash: 0,
                primary_key_column: "id".to_string(),
                rows: BTreeMap::new(),
                changed_keys: Vec::new(),
                increment_overrides: HashMap::new(),
            });
        for row in rows {
            state.rows.insert(row.primary_key.clone(), row);
        }
    }

    /// Removes a row by primary key.
    pub async fn remove_row(&self, table: &str, primary_key: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(state) = inner.tables.get_mut(table) {
            state.rows.remove(primary_key);
        }
    }

    /// Sets the primary keys served by the increment stream.
    pub async fn set_changed_keys(&self, table: &str, keys: Vec<String>) {
        let mut inner = self.inner.lock().await;
        if let Some(state) = inner.tables.get_mut(table) {
            state.changed_keys = keys;
        }
    }

    /// Makes the increment stream serve a stale hash record for one key.
    ///
    /// The secondary check path is unaffected and keeps reading live rows, so
    /// this emulates the race between change capture and hash computation.
    pub async fn set_increment_override(&self, table: &str, row: RowDataHash) {
        let mut inner = self.inner.lock().await;
        if let Some(state) = inner.tables.get_mut(table) {
            state
                .increment_overrides
                .insert(row.primary_key.clone(), row);
        }
    }
}

impl Default for MemoryEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl Endpoint for MemoryEndpoint {
    async fn query_topic_data(
        &self,
        table: &str,
        partition: u32,
        page: usize,
    ) -> CheckResult<Vec<RowDataHash>> {
        let inner = self.inner.lock().await;
        let partitions = u64::from(inner.partitions);
        let page_size = inner.page_size;
        let Some(state) = inner.tables.get(table) else {
            bail!(
                ErrorKind::TableMissing,
                "Table is not present on this endpoint",
                format!("table '{table}'")
            );
        };

        let rows: Vec<RowDataHash> = state
            .rows
            .values()
            .filter(|row| row.primary_key_hash % partitions == u64::from(partition))
            .skip(page * page_size)
            .take(page_size)
            .cloned()
            .collect();

        debug!(
            table,
            partition,
            page,
            rows = rows.len(),
            "serving topic data page"
        );

        Ok(rows)
    }

    async fn query_increment_topic_data(&self, table: &str) -> CheckResult<Vec<RowDataHash>> {
        let inner = self.inner.lock().await;
        let Some(state) = inner.tables.get(table) else {
            bail!(
                ErrorKind::TableMissing,
                "Table is not present on this endpoint",
                format!("table '{table}'")
            );
        };

        let mut rows = Vec::new();
        for key in &state.changed_keys {
            if let Some(stale) = state.increment_overrides.get(key) {
                rows.push(stale.clone());
            } else if let Some(row) = state.rows.get(key) {
                rows.push(row.clone());
            }
            // A changed key with no live row was deleted; it simply yields no
            // record, exactly like a real extraction would.
        }

        Ok(rows)
    }

    async fn query_secondary_check_row_data(
        &self,
        log: &ChangeLogEntry,
    ) -> CheckResult<Vec<RowDataHash>> {
        let inner = self.inner.lock().await;
        let Some(state) = inner.tables.get(&log.table_name) else {
            bail!(
                ErrorKind::TableMissing,
                "Table is not present on this endpoint",
                format!("table '{}'", log.table_name)
            );
        };

        let rows = log
            .composite_primary_key_values
            .iter()
            .filter_map(|key| state.rows.get(key))
            .cloned()
            .collect();

        Ok(rows)
    }

    async fn query_table_metadata_hash(&self, table: &str) -> CheckResult<Option<u64>> {
        let inner = self.inner.lock().await;
        Ok(inner.tables.get(table).map(|state| state.metadata_hash))
    }

    async fn build_repair_dml(
        &self,
        schema: &str,
        table: &str,
        kind: RepairKind,
        keys: &BTreeSet<String>,
    ) -> CheckResult<Vec<String>> {
        let inner = self.inner.lock().await;
        let Some(state) = inner.tables.get(table) else {
            bail!(
                ErrorKind::TableMissing,
                "Table is not present on this endpoint",
                format!("table '{table}'")
            );
        };
        let pk = &state.primary_key_column;

        let statements = keys
            .iter()
            .map(|key| match kind {
                RepairKind::Insert => {
                    format!("INSERT INTO {schema}.{table} ({pk}) VALUES ('{key}');")
                }
                RepairKind::Update => {
                    format!("UPDATE {schema}.{table} SET {pk} = '{key}' WHERE {pk} = '{key}';")
                }
                RepairKind::Delete => {
                    format!("DELETE FROM {schema}.{table} WHERE {pk} = '{key}';")
                }
            })
            .collect();

        Ok(statements)
    }
}
