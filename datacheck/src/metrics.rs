//! Metric names and labels emitted by the check engine.
//!
//! Counters are incremented at orchestration boundaries; the recorder is
//! installed by the telemetry crate (or not at all, in which case the calls
//! are no-ops).

/// Number of check runs started, labeled by table.
pub const CHECKS_STARTED_TOTAL: &str = "datacheck_checks_started_total";

/// Number of check runs completed, labeled by table and outcome.
pub const CHECKS_COMPLETED_TOTAL: &str = "datacheck_checks_completed_total";

/// Number of row-hash records compared, labeled by table.
pub const ROWS_COMPARED_TOTAL: &str = "datacheck_rows_compared_total";

/// Number of divergent primary keys found, labeled by table.
pub const DIFF_KEYS_TOTAL: &str = "datacheck_diff_keys_total";

/// Label carrying the table name.
pub const TABLE_LABEL: &str = "table";

/// Label carrying the check outcome (`consistent`, `divergent`, `failed`).
pub const OUTCOME_LABEL: &str = "outcome";
