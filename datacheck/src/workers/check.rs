//! The per-partition check worker task.

use std::sync::Arc;
use std::time::Duration;

use datacheck_config::shared::CheckConfig;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::check::FullCheck;
use crate::check_error;
use crate::concurrency::shutdown::ShutdownRx;
use crate::endpoint::Endpoint;
use crate::error::{CheckResult, ErrorKind};
use crate::extract::ExtractionStatusRegistry;
use crate::report::ReportSink;
use crate::types::TablePartition;

/// Runs one table partition's full check inside a pooled worker.
///
/// The worker acquires a concurrency permit, waits for the table's extraction
/// to be complete, then hands over to the orchestrator. Execution within the
/// worker is strictly sequential; the only suspension points are the permit,
/// the registry poll, and the fetch inside the orchestrator. A shutdown
/// signal observed before the permit is granted abandons the task cleanly.
pub(crate) async fn run_partition_check<S, K, R>(
    check: Arc<FullCheck<S, K, R>>,
    registry: ExtractionStatusRegistry,
    config: Arc<CheckConfig>,
    task: TablePartition,
    permits: Arc<Semaphore>,
    mut shutdown_rx: ShutdownRx,
) -> CheckResult<()>
where
    S: Endpoint + Send + Sync + 'static,
    K: Endpoint + Send + Sync + 'static,
    R: ReportSink + Send + Sync + 'static,
{
    let _permit = tokio::select! {
        biased;

        _ = shutdown_rx.changed() => {
            info!(%task, "shutdown signal received, abandoning check before start");
            return Ok(());
        }

        permit = permits.clone().acquire_owned() => {
            permit.map_err(|_| {
                check_error!(ErrorKind::InvalidState, "Check worker semaphore closed")
            })?
        }
    };

    // Readiness is a pre-condition of the run; if it fails, the table still
    // gets a failed report in the result log.
    if let Err(err) = registry
        .wait_table_complete(
            &task.table,
            config.extraction_poll_retries,
            Duration::from_millis(config.extraction_poll_delay_ms),
        )
        .await
    {
        check.emit_failure(&task.table, task.partition, err).await?;
        return Ok(());
    }

    let report = check.run(&task.table, task.partition).await?;
    debug!(%task, status = ?report.status, "check worker finished");

    Ok(())
}
