use std::path::PathBuf;

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::CheckResult;
use crate::report::{CheckReport, ReportSink};

/// Report sink appending JSON lines to per-partition result files.
///
/// Each report becomes one JSON-serialized line in
/// `<result_dir>/<table>_<partition>.txt`. The directory is created on first
/// use (idempotent); files are opened in append mode and never rewritten.
#[derive(Debug, Clone)]
pub struct FileReportSink {
    result_dir: PathBuf,
}

impl FileReportSink {
    /// Creates a sink writing below the given result directory.
    pub fn new(result_dir: impl Into<PathBuf>) -> Self {
        Self {
            result_dir: result_dir.into(),
        }
    }

    /// Returns the result file path for one table partition.
    pub fn result_path(&self, table: &str, partition: u32) -> PathBuf {
        self.result_dir.join(format!("{table}_{partition}.txt"))
    }
}

impl ReportSink for FileReportSink {
    async fn emit(&self, report: &CheckReport) -> CheckResult<()> {
        fs::create_dir_all(&self.result_dir).await?;

        let path = self.result_path(&report.table, report.partition);
        let mut line = serde_json::to_string(report)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %path.display(), status = ?report.status, "appended check report");

        Ok(())
    }
}
