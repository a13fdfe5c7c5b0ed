use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// One table enrolled in verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TableCheckConfig {
    /// Table name, exactly as known to both endpoints.
    pub name: String,
    /// Estimated row count; drives how many extraction shards the table is
    /// split into.
    #[serde(default)]
    pub estimated_rows: u64,
}

/// Configuration for a consistency-check pipeline.
///
/// Contains all settings required to verify a set of tables between one
/// source and one sink endpoint: bucket sizing, worker limits, extraction
/// coordination, and report output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CheckConfig {
    /// Schema the checked tables belong to.
    pub schema: String,
    /// Tables to verify.
    pub tables: Vec<TableCheckConfig>,
    /// Number of bucket partitions rows are grouped into before tree
    /// comparison.
    #[serde(default = "default_bucket_capacity")]
    pub bucket_capacity: u32,
    /// Maximum number of check workers that can run at a time.
    #[serde(default = "default_max_check_workers")]
    pub max_check_workers: u16,
    /// Maximum number of rows a single extraction task may cover.
    #[serde(default = "default_max_rows_per_task")]
    pub max_rows_per_task: u64,
    /// Directory the per-partition result files are appended to.
    #[serde(default = "default_result_dir")]
    pub result_dir: String,
    /// Whether to attach collaborator-built repair DML to divergent reports.
    #[serde(default)]
    pub enable_repair: bool,
    /// Number of times a worker re-polls the extraction-status registry
    /// before giving up on a table.
    #[serde(default = "default_extraction_poll_retries")]
    pub extraction_poll_retries: u32,
    /// Fixed delay, in milliseconds, between extraction-status polls.
    #[serde(default = "default_extraction_poll_delay_ms")]
    pub extraction_poll_delay_ms: u64,
}

impl CheckConfig {
    /// Default number of bucket partitions.
    pub const DEFAULT_BUCKET_CAPACITY: u32 = 1024;

    /// Default maximum number of concurrent check workers.
    pub const DEFAULT_MAX_CHECK_WORKERS: u16 = 4;

    /// Default maximum rows per extraction task.
    pub const DEFAULT_MAX_ROWS_PER_TASK: u64 = 100_000;

    /// Default result directory.
    pub const DEFAULT_RESULT_DIR: &'static str = "check_result";

    /// Default extraction-status poll retries.
    pub const DEFAULT_EXTRACTION_POLL_RETRIES: u32 = 30;

    /// Default extraction-status poll delay in milliseconds.
    pub const DEFAULT_EXTRACTION_POLL_DELAY_MS: u64 = 1000;

    /// Validates check configuration settings.
    ///
    /// Checks sizing parameters are non-zero and table entries are named.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bucket_capacity == 0 {
            return Err(ValidationError::BucketCapacityZero);
        }

        if self.max_check_workers == 0 {
            return Err(ValidationError::MaxCheckWorkersZero);
        }

        if self.max_rows_per_task == 0 {
            return Err(ValidationError::MaxRowsPerTaskZero);
        }

        if self.schema.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "schema".to_string(),
                constraint: "must not be empty".to_string(),
            });
        }

        for table in &self.tables {
            if table.name.is_empty() {
                return Err(ValidationError::InvalidTable(
                    "table name must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn default_bucket_capacity() -> u32 {
    CheckConfig::DEFAULT_BUCKET_CAPACITY
}

fn default_max_check_workers() -> u16 {
    CheckConfig::DEFAULT_MAX_CHECK_WORKERS
}

fn default_max_rows_per_task() -> u64 {
    CheckConfig::DEFAULT_MAX_ROWS_PER_TASK
}

fn default_result_dir() -> String {
    CheckConfig::DEFAULT_RESULT_DIR.to_string()
}

fn default_extraction_poll_retries() -> u32 {
    CheckConfig::DEFAULT_EXTRACTION_POLL_RETRIES
}

fn default_extraction_poll_delay_ms() -> u64 {
    CheckConfig::DEFAULT_EXTRACTION_POLL_DELAY_MS
}
