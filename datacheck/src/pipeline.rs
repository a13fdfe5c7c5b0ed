//! Pipeline wiring: one source/sink pair, many table checks.

use std::sync::Arc;

use datacheck_config::shared::CheckConfig;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::check::{FullCheck, IncrementalCheck};
use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::endpoint::Endpoint;
use crate::error::CheckResult;
use crate::extract::{ExtractionStatusRegistry, plan_extraction_tasks};
use crate::report::{CheckReport, ReportSink};
use crate::types::{ChangeLogEntry, EndpointRole, TablePartition};
use crate::workers::check::run_partition_check;
use crate::workers::pool::CheckWorkerPool;

#[derive(Debug)]
enum PipelineState {
    NotStarted,
    Started { pool: CheckWorkerPool },
}

/// Drives the verification of all configured tables against one source/sink
/// endpoint pair.
///
/// Starting the pipeline plans each table's extraction shards and spawns one
/// check worker per shard into a bounded pool. Incremental runs are driven
/// separately through [`CheckPipeline::run_incremental`] whenever the change
/// log delivers a batch.
#[derive(Debug)]
pub struct CheckPipeline<S, K, R> {
    process_id: String,
    config: Arc<CheckConfig>,
    source: S,
    sink: K,
    reports: R,
    registry: ExtractionStatusRegistry,
    state: PipelineState,
    shutdown_tx: ShutdownTx,
}

impl<S, K, R> CheckPipeline<S, K, R>
where
    S: Endpoint + Clone + Send + Sync + 'static,
    K: Endpoint + Clone + Send + Sync + 'static,
    R: ReportSink + Clone + Send + Sync + 'static,
{
    /// Creates a pipeline; no workers run until [`CheckPipeline::start`].
    pub fn new(
        process_id: impl Into<String>,
        config: CheckConfig,
        source: S,
        sink: K,
        reports: R,
    ) -> Self {
        // The receiver side is never stored; workers subscribe through the
        // transmitter as they are spawned.
        let (shutdown_tx, _) = create_shutdown_channel();

        Self {
            process_id: process_id.into(),
            config: Arc::new(config),
            source,
            sink,
            reports,
            registry: ExtractionStatusRegistry::new(),
            state: PipelineState::NotStarted,
            shutdown_tx,
        }
    }

    /// Returns the shared extraction-status registry.
    ///
    /// The extraction collaborator marks shards complete here; check workers
    /// poll it before draining streams.
    pub fn registry(&self) -> ExtractionStatusRegistry {
        self.registry.clone()
    }

    /// Returns a handle that can shut the pipeline down.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Plans all configured tables and spawns their check workers.
    pub async fn start(&mut self) -> CheckResult<()> {
        info!(
            process_id = %self.process_id,
            tables = self.config.tables.len(),
            "starting check pipeline"
        );

        let pool = CheckWorkerPool::new();
        let permits = Arc::new(Semaphore::new(self.config.max_check_workers as usize));
        let full_check = Arc::new(FullCheck::new(
            self.process_id.clone(),
            self.config.clone(),
            self.source.clone(),
            self.sink.clone(),
            self.reports.clone(),
        ));

        for table in &self.config.tables {
            let tasks = plan_extraction_tasks(
                &self.process_id,
                &table.name,
                table.estimated_rows,
                self.config.max_rows_per_task,
                EndpointRole::Source,
            )?;
            self.registry.register_table(&table.name, tasks.len() as u32);

            let mut pool_inner = pool.lock().await;
            for extract_task in tasks {
                let task = TablePartition::new(&table.name, extract_task.division);
                if pool_inner.has_active_worker(&task) {
                    warn!(%task, "check worker already scheduled, skipping duplicate");
                    continue;
                }

                let future = run_partition_check(
                    full_check.clone(),
                    self.registry.clone(),
                    self.config.clone(),
                    task.clone(),
                    permits.clone(),
                    self.shutdown_tx.subscribe(),
                );
                pool_inner.spawn(task, future);
            }
        }

        self.state = PipelineState::Started { pool };

        Ok(())
    }

    /// Runs a two-phase incremental check for a change-log batch.
    ///
    /// Independent of the full-check workers; reports go to the same sink.
    pub async fn run_incremental(
        &self,
        batch: &[ChangeLogEntry],
    ) -> CheckResult<Vec<CheckReport>> {
        let incremental = IncrementalCheck::new(
            self.process_id.clone(),
            self.config.clone(),
            self.source.clone(),
            self.sink.clone(),
            self.reports.clone(),
        );

        incremental.run_batch(batch).await
    }

    /// Waits for every check worker to complete.
    pub async fn wait(self) -> CheckResult<()> {
        let PipelineState::Started { pool } = self.state else {
            info!("pipeline was not started, nothing to wait for");

            return Ok(());
        };

        info!("waiting for check workers to complete");

        let result = pool.wait_all().await;
        if let Err(ref err) = result {
            info!("{} check workers failed with an error", err.kinds().len());
        }

        result
    }

    /// Signals every worker to shut down.
    pub fn shutdown(&self) {
        info!("trying to shut down the check pipeline");

        if let Err(err) = self.shutdown_tx.shutdown() {
            error!("failed to send shutdown signal to the pipeline: {}", err);
            return;
        }

        info!("shutdown signal successfully sent to all workers");
    }

    /// Signals shutdown and waits for the workers to finish.
    pub async fn shutdown_and_wait(self) -> CheckResult<()> {
        self.shutdown();
        self.wait().await
    }
}
