//! Pre-seeded endpoint pairs for tests.

use crate::endpoint::memory::MemoryEndpoint;
use crate::types::RowDataHash;

/// Default structure hash used by seeded tables.
pub const TEST_METADATA_HASH: u64 = 0xABCD_EF01;

/// Creates a source/sink pair serving the given rows for one table.
///
/// Both endpoints use a single partition and the default page size; tests
/// that exercise partitioned fetches build their endpoints explicitly with
/// [`MemoryEndpoint::with_layout`].
pub async fn seeded_pair(
    table: &str,
    source_rows: Vec<RowDataHash>,
    sink_rows: Vec<RowDataHash>,
) -> (MemoryEndpoint, MemoryEndpoint) {
    let source = MemoryEndpoint::new();
    let sink = MemoryEndpoint::new();

    source.add_table(table, "id", TEST_METADATA_HASH).await;
    sink.add_table(table, "id", TEST_METADATA_HASH).await;
    source.upsert_rows(table, source_rows).await;
    sink.upsert_rows(table, sink_rows).await;

    (source, sink)
}
