//! Deterministic row hashing.
//!
//! Both endpoints must produce bit-identical [`RowDataHash`] records for
//! identical rows, so the hash function, the column concatenation order, and
//! the delimiters below are part of the wire contract, not implementation
//! details. The hash is xxh3 (64-bit, non-cryptographic); speed matters here,
//! adversarial collision resistance does not.

use std::collections::HashMap;

use xxhash_rust::xxh3::{Xxh3, xxh3_64};

use crate::bail;
use crate::error::{CheckResult, ErrorKind};
use crate::types::RowDataHash;

/// Delimiter inserted between column values before hashing the full row.
///
/// Unit separator; cannot occur in the textual rendering of a column value.
pub const COLUMN_DELIMITER: char = '\u{001F}';

/// Delimiter joining the values of a composite primary key.
///
/// Record separator; distinct from [`COLUMN_DELIMITER`] so a composite key
/// rendering can never collide with a column concatenation.
pub const PRIMARY_KEY_DELIMITER: char = '\u{001E}';

/// Computes [`RowDataHash`] records from extracted rows.
///
/// A hasher is built once per table from the canonical column order and the
/// primary key column list, then applied to every row of that table. Both
/// endpoints must canonicalize column order identically for the hashes to be
/// comparable.
#[derive(Debug, Clone)]
pub struct RowHasher {
    columns: Vec<String>,
    primary_key_columns: Vec<String>,
}

impl RowHasher {
    /// Creates a hasher for the given canonical column order.
    ///
    /// Fails with [`ErrorKind::ConfigError`] if the column list is empty or if
    /// a primary key column is not part of the column list.
    pub fn new(columns: Vec<String>, primary_key_columns: Vec<String>) -> CheckResult<Self> {
        if columns.is_empty() {
            bail!(ErrorKind::ConfigError, "Column list is empty");
        }
        if primary_key_columns.is_empty() {
            bail!(ErrorKind::ConfigError, "Primary key column list is empty");
        }
        for pk_column in &primary_key_columns {
            if !columns.contains(pk_column) {
                bail!(
                    ErrorKind::ConfigError,
                    "Primary key column is not in the column list",
                    format!("column '{pk_column}' is missing")
                );
            }
        }

        Ok(Self {
            columns,
            primary_key_columns,
        })
    }

    /// Hashes one row given as a column name to value mapping.
    ///
    /// Fails with [`ErrorKind::InvalidRow`] if the row is missing any of the
    /// canonical columns; the extraction layer renders NULL as an explicit
    /// value, so an absent column is a contract violation, not data.
    pub fn hash_row(&self, row: &HashMap<String, String>) -> CheckResult<RowDataHash> {
        let mut hasher = Xxh3::new();
        for (index, column) in self.columns.iter().enumerate() {
            let Some(value) = row.get(column) else {
                bail!(
                    ErrorKind::InvalidRow,
                    "Row is missing a column",
                    format!("column '{column}' has no value")
                );
            };

            if index > 0 {
                // Both delimiters are single-byte ASCII control characters.
                hasher.update(&[COLUMN_DELIMITER as u8]);
            }
            hasher.update(value.as_bytes());
        }
        let row_hash = hasher.digest();

        let mut key_values = Vec::with_capacity(self.primary_key_columns.len());
        for pk_column in &self.primary_key_columns {
            let Some(value) = row.get(pk_column) else {
                bail!(
                    ErrorKind::InvalidRow,
                    "Row is missing a primary key column",
                    format!("column '{pk_column}' has no value")
                );
            };
            key_values.push(value.as_str());
        }
        let (primary_key, primary_key_hash) = hash_primary_key(&key_values);

        Ok(RowDataHash {
            primary_key,
            primary_key_hash,
            row_hash,
        })
    }
}

/// Renders and hashes a (possibly composite) primary key.
///
/// Returns the joined key string and its 64-bit hash. The rendering is the
/// canonical primary key form used everywhere in the engine.
pub fn hash_primary_key(values: &[&str]) -> (String, u64) {
    let mut rendered = String::new();
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            rendered.push(PRIMARY_KEY_DELIMITER);
        }
        rendered.push_str(value);
    }
    let hash = xxh3_64(rendered.as_bytes());

    (rendered, hash)
}
