//! Per-run check state.
//!
//! Every check run owns exactly one [`CheckContext`]; nothing about a run
//! lives in process-wide state. The accumulators are cleared through the emit
//! path at run end, on success and on error alike, so a reused worker never
//! observes a previous run's data.

use chrono::Utc;
use uuid::Uuid;

use crate::diff::DifferenceSet;
use crate::error::CheckError;
use crate::report::{CheckReport, CheckStatus};

/// Accumulator state for one check run of one table partition.
#[derive(Debug)]
pub struct CheckContext {
    /// Unique id of this run.
    pub check_id: Uuid,
    /// Table under check.
    pub table: String,
    /// Partition index under check.
    pub partition: u32,
    /// Topic the row-hash streams are read from.
    pub topic: String,
    /// Schema the table belongs to.
    pub schema: String,
    diff: DifferenceSet,
    repair_statements: Vec<String>,
    rows_compared: u64,
}

impl CheckContext {
    /// Creates a fresh context with empty accumulators.
    pub fn new(
        table: impl Into<String>,
        partition: u32,
        topic: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        Self {
            check_id: Uuid::new_v4(),
            table: table.into(),
            partition,
            topic: topic.into(),
            schema: schema.into(),
            diff: DifferenceSet::new(),
            repair_statements: Vec::new(),
            rows_compared: 0,
        }
    }

    /// Returns the accumulated difference.
    pub fn diff(&self) -> &DifferenceSet {
        &self.diff
    }

    /// Replaces the accumulated difference with a computed one.
    pub fn record_diff(&mut self, diff: DifferenceSet) {
        self.diff = diff;
    }

    /// Attaches collaborator-built repair statements.
    pub fn set_repair_statements(&mut self, statements: Vec<String>) {
        self.repair_statements = statements;
    }

    /// Adds to the count of row-hash records this run has compared.
    pub fn add_rows_compared(&mut self, rows: u64) {
        self.rows_compared = self.rows_compared.saturating_add(rows);
    }

    /// Returns the number of row-hash records compared so far.
    pub fn rows_compared(&self) -> u64 {
        self.rows_compared
    }

    /// Discards all per-run accumulators.
    ///
    /// Used between the phases of an incremental check and at run end.
    pub fn clear_accumulators(&mut self) {
        self.diff.clear();
        self.repair_statements.clear();
    }

    /// Assembles the terminal report for this run.
    ///
    /// A failed run emits empty key sets — a partial diff from an aborted run
    /// is not trustworthy — together with the failure cause.
    pub fn to_report(&self, failure: Option<&CheckError>) -> CheckReport {
        let (status, insert_keys, update_keys, delete_keys, repair_statements, failure_cause) =
            match failure {
                Some(err) => (
                    CheckStatus::Failed,
                    Default::default(),
                    Default::default(),
                    Default::default(),
                    Vec::new(),
                    Some(err.to_string()),
                ),
                None => {
                    let status = if self.diff.is_empty() {
                        CheckStatus::Consistent
                    } else {
                        CheckStatus::Divergent
                    };
                    (
                        status,
                        self.diff.only_on_source.keys().cloned().collect(),
                        self.diff.differing.keys().cloned().collect(),
                        self.diff.only_on_sink.keys().cloned().collect(),
                        self.repair_statements.clone(),
                        None,
                    )
                }
            };

        CheckReport {
            check_id: self.check_id,
            table: self.table.clone(),
            partition: self.partition,
            topic: self.topic.clone(),
            schema: self.schema.clone(),
            created_at: Utc::now(),
            status,
            insert_keys,
            update_keys,
            delete_keys,
            repair_statements,
            failure_cause,
        }
    }
}
