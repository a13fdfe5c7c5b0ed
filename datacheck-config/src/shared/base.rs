use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Bucket capacity cannot be zero.
    #[error("`bucket_capacity` cannot be zero")]
    BucketCapacityZero,
    /// Maximum check workers cannot be zero.
    #[error("`max_check_workers` cannot be zero")]
    MaxCheckWorkersZero,
    /// Maximum rows per extraction task cannot be zero.
    #[error("`max_rows_per_task` cannot be zero")]
    MaxRowsPerTaskZero,
    /// A configured table entry is invalid.
    #[error("Invalid table entry: {0}")]
    InvalidTable(String),
    /// Generic constraint violation on a configuration field.
    #[error("Invalid value for `{field}`: {constraint}")]
    InvalidFieldValue {
        field: String,
        constraint: String,
    },
}
