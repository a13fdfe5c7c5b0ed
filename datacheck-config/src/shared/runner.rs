use serde::{Deserialize, Serialize};

use crate::load::Config;
use crate::shared::{CheckConfig, EndpointConfig, ValidationError};

/// Top-level configuration of the check runner binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunnerConfig {
    /// Process identifier; part of every derived stream name, so re-running
    /// the same process/table combination is reproducible.
    pub process_id: String,
    /// Check pipeline settings.
    pub check: CheckConfig,
    /// Source endpoint to verify from.
    pub source: EndpointConfig,
    /// Sink endpoint to verify against.
    pub sink: EndpointConfig,
}

impl RunnerConfig {
    /// Validates the runner configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.process_id.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "process_id".to_string(),
                constraint: "must not be empty".to_string(),
            });
        }

        self.check.validate()
    }
}

impl Config for RunnerConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}
