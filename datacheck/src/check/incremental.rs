//! Two-phase incremental verification driven by the change log.

use std::sync::Arc;

use datacheck_config::shared::CheckConfig;
use metrics::counter;
use tracing::{debug, info};

use crate::bail;
use crate::check::context::CheckContext;
use crate::check::{bucket_align_compare, emit_report};
use crate::endpoint::{Endpoint, dispatch_error};
use crate::error::{CheckResult, ErrorKind};
use crate::extract::topic_name;
use crate::metrics::{CHECKS_STARTED_TOTAL, TABLE_LABEL};
use crate::repair::build_repair_statements;
use crate::report::{CheckReport, ReportSink};
use crate::types::{ChangeLogEntry, EndpointRole};

/// Orchestrates the two-phase check for change-log batches.
///
/// Phase one buckets and compares the current hashes of the changed keys
/// only. Because a row can change again between change capture and hash
/// computation, phase one can report false positives; phase two re-fetches
/// exactly the keys phase one flagged — closer to comparison time — and its
/// result replaces the phase-one diff. The race window shrinks but does not
/// vanish; a residual false positive is resolved by the next scheduled run.
#[derive(Debug)]
pub struct IncrementalCheck<S, K, R> {
    process_id: String,
    config: Arc<CheckConfig>,
    source: S,
    sink: K,
    reports: R,
}

impl<S, K, R> IncrementalCheck<S, K, R>
where
    S: Endpoint + Send + Sync,
    K: Endpoint + Send + Sync,
    R: ReportSink + Send + Sync,
{
    /// Creates an incremental-check orchestrator for one source/sink pair.
    pub fn new(
        process_id: impl Into<String>,
        config: Arc<CheckConfig>,
        source: S,
        sink: K,
        reports: R,
    ) -> Self {
        Self {
            process_id: process_id.into(),
            config,
            source,
            sink,
            reports,
        }
    }

    /// Runs the incremental check for every table in the batch.
    ///
    /// Tables are independent: a fatal condition on one table becomes that
    /// table's failed report and does not stop the rest of the batch.
    pub async fn run_batch(&self, batch: &[ChangeLogEntry]) -> CheckResult<Vec<CheckReport>> {
        let mut reports = Vec::with_capacity(batch.len());
        for log in batch {
            reports.push(self.run_table(log).await?);
        }

        Ok(reports)
    }

    /// Runs the two-phase check for one table and emits its report.
    pub async fn run_table(&self, log: &ChangeLogEntry) -> CheckResult<CheckReport> {
        let topic = topic_name(&self.process_id, EndpointRole::Source, &log.table_name);
        let mut ctx = CheckContext::new(&log.table_name, 0, topic, self.config.schema.clone());

        info!(
            check_id = %ctx.check_id,
            table = %log.table_name,
            changed_keys = log.composite_primary_key_values.len(),
            "starting incremental check"
        );
        counter!(CHECKS_STARTED_TOTAL, TABLE_LABEL => log.table_name.clone()).increment(1);

        let outcome = self.execute(&mut ctx, log).await;
        emit_report(&self.reports, ctx, outcome).await
    }

    async fn execute(&self, ctx: &mut CheckContext, log: &ChangeLogEntry) -> CheckResult<()> {
        self.verify_table_structure(&log.table_name).await?;

        // Phase one: bucket check over the changed keys only.
        let source_rows = self
            .source
            .query_increment_topic_data(&log.table_name)
            .await
            .map_err(|err| dispatch_error(EndpointRole::Source, err))?;
        let sink_rows = self
            .sink
            .query_increment_topic_data(&log.table_name)
            .await
            .map_err(|err| dispatch_error(EndpointRole::Sink, err))?;
        ctx.add_rows_compared((source_rows.len() + sink_rows.len()) as u64);

        let phase_one = bucket_align_compare(source_rows, sink_rows, self.config.bucket_capacity)?;
        let diff_keys = phase_one.diff_keys();
        if diff_keys.is_empty() {
            ctx.record_diff(phase_one);
            return Ok(());
        }

        debug!(
            table = %log.table_name,
            flagged_keys = diff_keys.len(),
            "phase one flagged keys, running secondary check"
        );

        // Phase two: restart with cleared accumulators, restricted to exactly
        // the keys phase one flagged.
        ctx.clear_accumulators();
        let secondary_log = ChangeLogEntry {
            table_name: log.table_name.clone(),
            composite_primary_key_columns: log.composite_primary_key_columns.clone(),
            composite_primary_key_values: diff_keys.into_iter().collect(),
        };

        let source_rows = self
            .source
            .query_secondary_check_row_data(&secondary_log)
            .await
            .map_err(|err| dispatch_error(EndpointRole::Source, err))?;
        let sink_rows = self
            .sink
            .query_secondary_check_row_data(&secondary_log)
            .await
            .map_err(|err| dispatch_error(EndpointRole::Sink, err))?;
        ctx.add_rows_compared((source_rows.len() + sink_rows.len()) as u64);

        let phase_two = bucket_align_compare(source_rows, sink_rows, self.config.bucket_capacity)?;
        ctx.record_diff(phase_two);

        if self.config.enable_repair && !ctx.diff().is_empty() {
            let statements =
                build_repair_statements(&self.source, &ctx.schema, &log.table_name, ctx.diff())
                    .await?;
            ctx.set_repair_statements(statements);
        }

        Ok(())
    }

    /// Gate: the incremental check refuses to compare rows across differing
    /// table structures.
    ///
    /// A missing table and a structural mismatch are distinct fatal
    /// conditions; neither attempts any row comparison.
    async fn verify_table_structure(&self, table: &str) -> CheckResult<()> {
        let source_hash = self
            .source
            .query_table_metadata_hash(table)
            .await
            .map_err(|err| dispatch_error(EndpointRole::Source, err))?;
        let sink_hash = self
            .sink
            .query_table_metadata_hash(table)
            .await
            .map_err(|err| dispatch_error(EndpointRole::Sink, err))?;

        let (Some(source_hash), Some(sink_hash)) = (source_hash, sink_hash) else {
            bail!(
                ErrorKind::TableMissing,
                "Table is missing on at least one endpoint",
                format!(
                    "table '{table}': present on source: {}, present on sink: {}",
                    source_hash.is_some(),
                    sink_hash.is_some()
                )
            );
        };

        if source_hash != sink_hash {
            bail!(
                ErrorKind::TableStructureMismatch,
                "Table structures differ between endpoints",
                format!("table '{table}': {source_hash:#x} vs {sink_hash:#x}")
            );
        }

        Ok(())
    }
}
