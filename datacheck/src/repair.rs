//! Repair statement collection.
//!
//! The engine detects divergence; it never constructs SQL. When repair output
//! is enabled, the source endpoint is asked to render DML for each non-empty
//! diff set and the statements are attached to the check report verbatim.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diff::DifferenceSet;
use crate::endpoint::{Endpoint, dispatch_error};
use crate::error::CheckResult;
use crate::types::EndpointRole;

/// The kind of DML a repair statement performs against the sink.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairKind {
    /// Row exists on the source only; insert it into the sink.
    Insert,
    /// Row content differs; overwrite the sink row from the source.
    Update,
    /// Row exists on the sink only; delete it from the sink.
    Delete,
}

impl fmt::Display for RepairKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairKind::Insert => f.write_str("insert"),
            RepairKind::Update => f.write_str("update"),
            RepairKind::Delete => f.write_str("delete"),
        }
    }
}

/// Collects repair DML for every non-empty diff set, in insert/update/delete
/// order.
///
/// Repair replays source truth into the sink, so the source endpoint renders
/// the statements.
pub async fn build_repair_statements<E: Endpoint>(
    source: &E,
    schema: &str,
    table: &str,
    diff: &DifferenceSet,
) -> CheckResult<Vec<String>> {
    let mut statements = Vec::new();

    let inserts: BTreeSet<String> = diff.only_on_source.keys().cloned().collect();
    let updates = diff.differing.keys().cloned().collect();
    let deletes = diff.only_on_sink.keys().cloned().collect();

    for (kind, keys) in [
        (RepairKind::Insert, &inserts),
        (RepairKind::Update, &updates),
        (RepairKind::Delete, &deletes),
    ] {
        if keys.is_empty() {
            continue;
        }
        let built = source
            .build_repair_dml(schema, table, kind, keys)
            .await
            .map_err(|err| dispatch_error(EndpointRole::Source, err))?;
        statements.extend(built);
    }

    Ok(statements)
}
