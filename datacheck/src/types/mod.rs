//! Core data types shared across the check engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hash record for a single extracted row.
///
/// [`RowDataHash`] is the only row-level information the engine ever sees:
/// the primary key rendering, the 64-bit hash of that key, and the 64-bit
/// hash of the full column set. It is immutable once computed, with one
/// instance per primary key per extraction pass per endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDataHash {
    /// Rendered primary key; composite keys are joined with
    /// [`crate::hashing::PRIMARY_KEY_DELIMITER`].
    pub primary_key: String,
    /// 64-bit hash of [`RowDataHash::primary_key`]; drives bucket assignment.
    pub primary_key_hash: u64,
    /// 64-bit hash of the full column set; drives content comparison.
    pub row_hash: u64,
}

/// Identifies which side of the check an endpoint serves.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointRole {
    /// The endpoint the data originates from.
    Source,
    /// The endpoint the data was replicated to.
    Sink,
}

impl EndpointRole {
    /// Returns the short role tag used in topic names.
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointRole::Source => "source",
            EndpointRole::Sink => "sink",
        }
    }
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A batch of changed rows for one table, to be re-verified.
///
/// Produced by the change-data-capture collaborator (or by phase one of an
/// incremental check when deriving the keys for the secondary check).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// Name of the table the changed rows belong to.
    pub table_name: String,
    /// Primary key column names, in canonical order.
    pub composite_primary_key_columns: Vec<String>,
    /// Rendered primary key values of the changed rows.
    pub composite_primary_key_values: Vec<String>,
}

/// Identifies one table partition processed by a single check worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TablePartition {
    /// Table name.
    pub table: String,
    /// Zero-based partition index within the table's extraction plan.
    pub partition: u32,
}

impl TablePartition {
    /// Creates a new table partition identifier.
    pub fn new(table: impl Into<String>, partition: u32) -> Self {
        Self {
            table: table.into(),
            partition,
        }
    }
}

impl fmt::Display for TablePartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.table, self.partition)
    }
}
