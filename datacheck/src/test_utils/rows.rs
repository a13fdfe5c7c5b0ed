//! Deterministic row-hash generators for tests.

use crate::hashing::hash_primary_key;
use crate::types::RowDataHash;

/// Builds a row-hash record for a single-column primary key.
///
/// The content hash is supplied explicitly so tests can make two sides agree
/// or disagree on specific keys.
pub fn row_hash(primary_key: &str, row_hash: u64) -> RowDataHash {
    let (primary_key, primary_key_hash) = hash_primary_key(&[primary_key]);

    RowDataHash {
        primary_key,
        primary_key_hash,
        row_hash,
    }
}

/// Builds `count` rows with keys `"0".."count"` and content hashes derived
/// deterministically from the key.
pub fn row_hashes(count: u64) -> Vec<RowDataHash> {
    (0..count)
        .map(|i| row_hash(&i.to_string(), i.wrapping_mul(2654435761).wrapping_add(17)))
        .collect()
}

/// Returns a copy of `rows` with the content hash of one key flipped.
pub fn with_changed_row(rows: &[RowDataHash], primary_key: &str) -> Vec<RowDataHash> {
    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            if row.primary_key == primary_key {
                row.row_hash ^= 0x5555_5555_5555_5555;
            }
            row
        })
        .collect()
}

/// Returns a copy of `rows` without the given key.
pub fn without_row(rows: &[RowDataHash], primary_key: &str) -> Vec<RowDataHash> {
    rows.iter()
        .filter(|row| row.primary_key != primary_key)
        .cloned()
        .collect()
}
