//! Tracing subscriber initialization.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Default filter directive when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

/// Initializes the global tracing subscriber for a binary.
///
/// The filter is taken from `RUST_LOG` when present, defaulting to `info`.
/// Must be called once, early in `main`, before any spans or events are
/// emitted.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

static TEST_TRACING: Once = Once::new();

/// Initializes tracing for tests.
///
/// Safe to call from every test; initialization happens once per process and
/// output is routed through the test writer so it interleaves correctly with
/// the test harness.
pub fn init_test_tracing() {
    TEST_TRACING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
