//! Check report types and sinks.

pub mod base;
pub mod file;
pub mod memory;

pub use base::ReportSink;
pub use file::FileReportSink;
pub use memory::MemoryReportSink;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal outcome class of one check run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Both sides hold identical data for this table partition.
    Consistent,
    /// Divergent primary keys were found; see the key sets.
    Divergent,
    /// The run aborted before a trustworthy diff could be computed.
    Failed,
}

impl CheckStatus {
    /// Returns the lowercase outcome tag used in metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Consistent => "consistent",
            CheckStatus::Divergent => "divergent",
            CheckStatus::Failed => "failed",
        }
    }
}

/// Terminal artifact of one check run for one table partition.
///
/// Written once to the report sink and never mutated afterward. Failed runs
/// are emitted too, with [`CheckStatus::Failed`] and a human-readable cause,
/// so every scheduled check leaves a trace in the result log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    /// Unique id of the check run that produced this report.
    pub check_id: Uuid,
    /// Table that was checked.
    pub table: String,
    /// Partition index within the table's extraction plan.
    pub partition: u32,
    /// Topic the row-hash streams were read from.
    pub topic: String,
    /// Schema the table belongs to.
    pub schema: String,
    /// When the report was assembled.
    pub created_at: DateTime<Utc>,
    /// Outcome class.
    pub status: CheckStatus,
    /// Keys present on the source only (missing on the sink).
    pub insert_keys: BTreeSet<String>,
    /// Keys present on both sides with differing content.
    pub update_keys: BTreeSet<String>,
    /// Keys present on the sink only.
    pub delete_keys: BTreeSet<String>,
    /// Collaborator-built repair statements, when repair output is enabled.
    pub repair_statements: Vec<String>,
    /// Human-readable failure cause for [`CheckStatus::Failed`] reports.
    pub failure_cause: Option<String>,
}

impl CheckReport {
    /// Returns the total number of divergent keys in this report.
    pub fn diff_key_count(&self) -> usize {
        self.insert_keys.len() + self.update_keys.len() + self.delete_keys.len()
    }
}
