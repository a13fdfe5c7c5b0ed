//! Extraction planning and cross-task coordination.

pub mod planner;
pub mod status;

pub use planner::{ExtractTask, partition_count, plan_extraction_tasks, topic_name};
pub use status::ExtractionStatusRegistry;
