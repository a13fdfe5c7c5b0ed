use std::collections::BTreeSet;
use std::future::Future;

use crate::error::CheckResult;
use crate::repair::RepairKind;
use crate::types::{ChangeLogEntry, RowDataHash};

/// RPC surface of one extraction endpoint (source or sink).
///
/// [`Endpoint`] is the boundary between the check engine and the services that
/// actually touch the databases. Implementations are expected to be cheap to
/// clone (the engine clones them into worker tasks) and safe for concurrent
/// use. The engine never sees raw row contents through this trait — only
/// primary keys and 64-bit hashes.
pub trait Endpoint {
    /// Returns one page of the full-check row-hash stream for a table
    /// partition.
    ///
    /// Callers fetch pages starting at zero and stop at the first empty page.
    /// The stream must be stable and replayable for the duration of one check
    /// run.
    fn query_topic_data(
        &self,
        table: &str,
        partition: u32,
        page: usize,
    ) -> impl Future<Output = CheckResult<Vec<RowDataHash>>> + Send;

    /// Returns the incremental row-hash stream: current hashes for the rows
    /// the change log reported as modified since the last check.
    fn query_increment_topic_data(
        &self,
        table: &str,
    ) -> impl Future<Output = CheckResult<Vec<RowDataHash>>> + Send;

    /// Returns current row hashes for exactly the primary keys named by the
    /// change log entry; used by the secondary (phase-two) check.
    fn query_secondary_check_row_data(
        &self,
        log: &ChangeLogEntry,
    ) -> impl Future<Output = CheckResult<Vec<RowDataHash>>> + Send;

    /// Returns the table-structure hash, or `None` if the table does not
    /// exist on this endpoint.
    fn query_table_metadata_hash(
        &self,
        table: &str,
    ) -> impl Future<Output = CheckResult<Option<u64>>> + Send;

    /// Builds repair DML statements of the given kind for the given primary
    /// keys.
    ///
    /// The endpoint owns the schema knowledge required to render SQL; the
    /// engine treats the returned statements as opaque strings attached to
    /// the check report.
    fn build_repair_dml(
        &self,
        schema: &str,
        table: &str,
        kind: RepairKind,
        keys: &BTreeSet<String>,
    ) -> impl Future<Output = CheckResult<Vec<String>>> + Send;
}
