use std::future::Future;

use crate::error::CheckResult;
use crate::report::CheckReport;

/// Trait for systems that persist check reports.
///
/// [`ReportSink`] implementations define where the terminal artifact of each
/// check run goes. The emit step of every orchestrator runs unconditionally,
/// including for failed runs, so implementations must be prepared to receive
/// reports with any [`crate::report::CheckStatus`]. Reports are append-only;
/// a sink must never rewrite previously emitted reports.
pub trait ReportSink {
    /// Appends one report to the sink.
    fn emit(&self, report: &CheckReport) -> impl Future<Output = CheckResult<()>> + Send;
}
