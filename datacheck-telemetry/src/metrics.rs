//! Prometheus metrics recorder bootstrap.

use std::{sync::Mutex, time::Duration};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::trace;

// Global cache for the Prometheus handle used by [`init_metrics`].
//
// A [`Mutex`] is used instead of [`Once`] or [`OnceLock`] because the
// initialization code is fallible. The recorder can only be installed once
// per process; later calls must return the cached handle, which matters in
// tests where initialization runs repeatedly.
static PROMETHEUS_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Installs the global metrics recorder and returns a handle for rendering.
///
/// The caller decides where the rendered text goes — an HTTP endpoint, a log
/// line at shutdown, or nowhere. Initialization happens only once; subsequent
/// calls return cloned handles from the cache.
///
/// A background task periodically performs upkeep to avoid unbounded memory
/// growth in the recorder.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let mut prometheus_handle = PROMETHEUS_HANDLE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(handle) = &*prometheus_handle {
        return Ok(handle.clone());
    }

    let builder = PrometheusBuilder::new();

    let handle = builder.install_recorder()?;
    *prometheus_handle = Some(handle.clone());

    let handle_clone = handle.clone();
    tokio::spawn(async move {
        let upkeep_timeout = Duration::from_secs(5);
        loop {
            tokio::time::sleep(upkeep_timeout).await;
            trace!("running metrics upkeep");
            handle_clone.run_upkeep();
        }
    });

    Ok(handle)
}
