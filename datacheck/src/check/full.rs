//! Full verification of one table partition.

use std::sync::Arc;

use datacheck_config::shared::CheckConfig;
use metrics::counter;
use tracing::info;

use crate::check::context::CheckContext;
use crate::check::{bucket_align_compare, emit_report};
use crate::endpoint::{Endpoint, dispatch_error};
use crate::error::{CheckError, CheckResult};
use crate::extract::topic_name;
use crate::metrics::{CHECKS_STARTED_TOTAL, TABLE_LABEL};
use crate::repair::build_repair_statements;
use crate::report::{CheckReport, ReportSink};
use crate::types::{EndpointRole, RowDataHash};

/// Orchestrates one full verification pass per table partition.
///
/// A run walks a fixed sequence — fetch both streams, bucket, align, compare,
/// emit — and is terminal on completion or fatal error. Fatal errors are
/// converted into failed reports at this boundary; they never propagate past
/// the emit step. The orchestrator is shared by all check workers of one
/// pipeline and holds no per-run state itself.
#[derive(Debug)]
pub struct FullCheck<S, K, R> {
    process_id: String,
    config: Arc<CheckConfig>,
    source: S,
    sink: K,
    reports: R,
}

impl<S, K, R> FullCheck<S, K, R>
where
    S: Endpoint + Send + Sync,
    K: Endpoint + Send + Sync,
    R: ReportSink + Send + Sync,
{
    /// Creates a full-check orchestrator for one source/sink pair.
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

    /// Runs one full check for a table partition and emits its report.
    ///
    /// Returns the emitted report; the result is an error only when the
    /// report itself could not be written.
    pub async fn run(&self, table: &str, partition: u32) -> CheckResult<CheckReport> {
        let topic = topic_name(&self.process_id, EndpointRole::Source, table);
        let mut ctx = CheckContext::new(table, partition, topic, self.config.schema.clone());

        info!(check_id = %ctx.check_id, table, partition, "starting full check");
        counter!(CHECKS_STARTED_TOTAL, TABLE_LABEL => table.to_string()).increment(1);

        let outcome = self.execute(&mut ctx, table, partition).await;
        emit_report(&self.reports, ctx, outcome).await
    }

    /// Emits a failed report for a run that could not begin.
    ///
    /// Used when a pre-condition outside this orchestrator (such as extraction
    /// readiness) fails: the emit step must still run so the table leaves a
    /// trace in the result log.
    pub(crate) async fn emit_failure(
        &self,
        table: &str,
        partition: u32,
        error: CheckError,
    ) -> CheckResult<CheckReport> {
        let topic = topic_name(&self.process_id, EndpointRole::Source, table);
        let ctx = CheckContext::new(table, partition, topic, self.config.schema.clone());

        emit_report(&self.reports, ctx, Err(error)).await
    }

    async fn execute(
        &self,
        ctx: &mut CheckContext,
        table: &str,
        partition: u32,
    ) -> CheckResult<()> {
        let source_rows = self
            .fetch_stream(&self.source, EndpointRole::Source, table, partition)
            .await?;
        let sink_rows = self
            .fetch_stream(&self.sink, EndpointRole::Sink, table, partition)
            .await?;
        ctx.add_rows_compared((source_rows.len() + sink_rows.len()) as u64);

        let diff = bucket_align_compare(source_rows, sink_rows, self.config.bucket_capacity)?;
        ctx.record_diff(diff);

        if self.config.enable_repair && !ctx.diff().is_empty() {
            let statements =
                build_repair_statements(&self.source, &ctx.schema, table, ctx.diff()).await?;
            ctx.set_repair_statements(statements);
        }

        Ok(())
    }

    /// Drains one endpoint's row-hash stream for a table partition.
    ///
    /// Pages are fetched until the first empty page; retries for transient
    /// stream hiccups belong to the endpoint implementation, not this layer.
    async fn fetch_stream<E>(
        &self,
        endpoint: &E,
        role: EndpointRole,
        table: &str,
        partition: u32,
    ) -> CheckResult<Vec<RowDataHash>>
    where
        E: Endpoint + Sync,
    {
        let mut rows = Vec::new();
        let mut page = 0;
        loop {
            let batch = endpoint
                .query_topic_data(table, partition, page)
                .await
                .map_err(|err| dispatch_error(role, err))?;
            if batch.is_empty() {
                break;
            }
            rows.extend(batch);
            page += 1;
        }

        info!(table, partition, %role, rows = rows.len(), "fetched row-hash stream");

        Ok(rows)
    }
}
