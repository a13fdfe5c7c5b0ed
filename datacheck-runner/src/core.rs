use datacheck::endpoint::Endpoint;
use datacheck::endpoint::memory::MemoryEndpoint;
use datacheck::pipeline::CheckPipeline;
use datacheck::report::{FileReportSink, ReportSink};
use datacheck_config::shared::{EndpointConfig, RunnerConfig};
use datacheck_telemetry::metrics::init_metrics;
use tracing::{debug, error, info, warn};

use crate::config::load_runner_config;

pub async fn start_checker() -> anyhow::Result<()> {
    let runner_config = load_runner_config()?;
    runner_config.validate()?;

    let metrics_handle = init_metrics()?;

    let reports = FileReportSink::new(runner_config.check.result_dir.clone());

    // Each endpoint kind gets its own statically dispatched pipeline. Real
    // deployments implement the endpoint trait over their RPC layer and use
    // the library directly; the built-in memory endpoints make an empty
    // deployment runnable end to end.
    match (&runner_config.source, &runner_config.sink) {
        (EndpointConfig::Memory, EndpointConfig::Memory) => {
            let source = MemoryEndpoint::new();
            let sink = MemoryEndpoint::new();
            seed_memory_tables(&runner_config, &source, &sink).await;

            let pipeline = CheckPipeline::new(
                runner_config.process_id.clone(),
                runner_config.check.clone(),
                source,
                sink,
                reports,
            );
            run_pipeline(pipeline, &runner_config).await?;
        }
    }

    debug!("final metrics snapshot:\n{}", metrics_handle.render());

    Ok(())
}

/// Registers every configured table on both memory endpoints so the metadata
/// gate and the fetch paths behave like a real, freshly provisioned pair.
async fn seed_memory_tables(
    config: &RunnerConfig,
    source: &MemoryEndpoint,
    sink: &MemoryEndpoint,
) {
    for table in &config.check.tables {
        source.add_table(&table.name, "id", 0).await;
        sink.add_table(&table.name, "id", 0).await;
    }
}

async fn run_pipeline<S, K, R>(
    mut pipeline: CheckPipeline<S, K, R>,
    config: &RunnerConfig,
) -> anyhow::Result<()>
where
    S: Endpoint + Clone + Send + Sync + 'static,
    K: Endpoint + Clone + Send + Sync + 'static,
    R: ReportSink + Clone + Send + Sync + 'static,
{
    pipeline.start().await?;

    // Memory endpoints hold their full data set from the moment they are
    // seeded, so every extraction shard is immediately complete.
    let registry = pipeline.registry();
    for table in &config.check.tables {
        registry.complete_table(&table.name);
    }

    // Spawn a task to listen for Ctrl+C and trigger shutdown.
    let shutdown_tx = pipeline.shutdown_tx();
    let shutdown_handle = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {:?}", e);
            return;
        }

        info!("Ctrl+C received, shutting down check pipeline...");
        if let Err(e) = shutdown_tx.shutdown() {
            warn!("failed to send shutdown signal: {:?}", e);
        }
    });

    // Wait for the pipeline to finish (either normally or via shutdown).
    let result = pipeline.wait().await;

    // The pipeline may finish before Ctrl+C is ever pressed; the listener is
    // no longer needed either way.
    shutdown_handle.abort();
    let _ = shutdown_handle.await;

    result?;

    Ok(())
}
