use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::CheckResult;
use crate::report::{CheckReport, ReportSink};

/// In-memory report sink for testing and development purposes.
///
/// Stores every emitted report in order so tests can inspect the full report
/// stream after a run.
#[derive(Debug, Clone, Default)]
pub struct MemoryReportSink {
    reports: Arc<Mutex<Vec<CheckReport>>>,
}

impl MemoryReportSink {
    /// Creates an empty memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all reports emitted so far.
    pub async fn reports(&self) -> Vec<CheckReport> {
        let reports = self.reports.lock().await;
        reports.clone()
    }
}

impl ReportSink for MemoryReportSink {
    async fn emit(&self, report: &CheckReport) -> CheckResult<()> {
        let mut reports = self.reports.lock().await;
        reports.push(report.clone());

        Ok(())
    }
}
