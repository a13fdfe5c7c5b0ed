//! Bucket construction and alignment.
//!
//! Rows are partitioned into fixed-capacity buckets by
//! `primary_key_hash % capacity`; the sorted bucket list is the leaf sequence
//! of the Merkle tree. Alignment synthesizes empty buckets so both sides hold
//! congruent bucket-number sequences before tree construction.

use std::collections::{BTreeMap, HashMap};

use xxhash_rust::xxh3::Xxh3;

use crate::bail;
use crate::error::{CheckResult, ErrorKind};
use crate::types::RowDataHash;

/// A fixed-partition group of rows sharing `primary_key_hash % capacity`.
///
/// The bucket number is a partition index, not a count. Entries are keyed by
/// the rendered primary key; insertion order is irrelevant, the signature is
/// computed over a sorted view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    number: u32,
    entries: HashMap<String, RowDataHash>,
}

impl Bucket {
    /// Creates an empty bucket with the given partition number.
    pub fn new(number: u32) -> Self {
        Self {
            number,
            entries: HashMap::new(),
        }
    }

    /// Returns this bucket's partition number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Returns the number of rows held by this bucket.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the bucket holds no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries keyed by rendered primary key.
    pub fn entries(&self) -> &HashMap<String, RowDataHash> {
        &self.entries
    }

    /// Inserts a row, replacing any previous record for the same primary key.
    pub fn insert(&mut self, row: RowDataHash) {
        self.entries.insert(row.primary_key.clone(), row);
    }

    /// Computes the bucket's aggregate signature.
    ///
    /// The signature covers the bucket number and all entries sorted by
    /// primary key hash, so it is insensitive to the order rows were fetched
    /// from the endpoint. An empty bucket still has a well-defined signature
    /// derived from its number alone.
    pub fn signature(&self) -> u64 {
        let mut pairs: Vec<(u64, u64)> = self
            .entries
            .values()
            .map(|row| (row.primary_key_hash, row.row_hash))
            .collect();
        pairs.sort_unstable();

        let mut hasher = Xxh3::new();
        hasher.update(&u64::from(self.number).to_le_bytes());
        for (primary_key_hash, row_hash) in pairs {
            hasher.update(&primary_key_hash.to_le_bytes());
            hasher.update(&row_hash.to_le_bytes());
        }

        hasher.digest()
    }
}

/// Partitions rows into buckets keyed by `primary_key_hash % capacity`.
///
/// Buckets are created on first use; an empty input yields an empty map, which
/// callers must treat as automatic success when both sides are empty. The
/// returned map iterates in ascending bucket-number order.
pub fn build_buckets(
    rows: impl IntoIterator<Item = RowDataHash>,
    capacity: u32,
) -> CheckResult<BTreeMap<u32, Bucket>> {
    if capacity == 0 {
        bail!(ErrorKind::ConfigError, "Bucket capacity cannot be zero");
    }

    let mut buckets: BTreeMap<u32, Bucket> = BTreeMap::new();
    for row in rows {
        let number = (row.primary_key_hash % u64::from(capacity)) as u32;
        buckets.entry(number).or_insert_with(|| Bucket::new(number)).insert(row);
    }

    Ok(buckets)
}

/// Reconciles the bucket-number sets produced by the two endpoints.
///
/// For every bucket number present on exactly one side, an empty bucket with
/// that number is synthesized on the other side. Afterwards both maps hold
/// identical key sets, enabling positional pairing for Merkle construction —
/// without this, a legitimate row-count difference would masquerade as a
/// tree-shape mismatch.
pub fn align_buckets(source: &mut BTreeMap<u32, Bucket>, sink: &mut BTreeMap<u32, Bucket>) {
    let missing_in_sink: Vec<u32> = source
        .keys()
        .filter(|number| !sink.contains_key(number))
        .copied()
        .collect();
    let missing_in_source: Vec<u32> = sink
        .keys()
        .filter(|number| !source.contains_key(number))
        .copied()
        .collect();

    for number in missing_in_sink {
        sink.insert(number, Bucket::new(number));
    }
    for number in missing_in_source {
        source.insert(number, Bucket::new(number));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::hash_primary_key;

    fn row(pk: &str, row_hash: u64) -> RowDataHash {
        let (primary_key, primary_key_hash) = hash_primary_key(&[pk]);
        RowDataHash {
            primary_key,
            primary_key_hash,
            row_hash,
        }
    }

    #[test]
    fn rows_land_in_the_bucket_their_key_hash_selects() {
        let rows: Vec<RowDataHash> = (0..100).map(|i| row(&i.to_string(), i)).collect();
        let buckets = build_buckets(rows.clone(), 8).unwrap();

        for row in &rows {
            let number = (row.primary_key_hash % 8) as u32;
            assert!(buckets[&number].entries().contains_key(&row.primary_key));
        }
        let total: usize = buckets.values().map(Bucket::len).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn empty_input_yields_empty_map() {
        let buckets = build_buckets(Vec::new(), 8).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = build_buckets(vec![row("1", 1)], 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[test]
    fn alignment_equalizes_bucket_number_sets() {
        let mut source = build_buckets((0..50).map(|i| row(&i.to_string(), i)), 16).unwrap();
        let mut sink = build_buckets((25..60).map(|i| row(&i.to_string(), i)), 16).unwrap();

        align_buckets(&mut source, &mut sink);

        let source_numbers: Vec<u32> = source.keys().copied().collect();
        let sink_numbers: Vec<u32> = sink.keys().copied().collect();
        assert_eq!(source_numbers, sink_numbers);
    }

    #[test]
    fn signature_ignores_insertion_order() {
        let mut forward = Bucket::new(3);
        let mut reverse = Bucket::new(3);
        let rows: Vec<RowDataHash> = (0..20).map(|i| row(&i.to_string(), i * 7)).collect();

        for r in rows.iter() {
            forward.insert(r.clone());
        }
        for r in rows.iter().rev() {
            reverse.insert(r.clone());
        }

        assert_eq!(forward.signature(), reverse.signature());
    }

    #[test]
    fn signature_reflects_content_and_number() {
        let mut a = Bucket::new(1);
        let mut b = Bucket::new(1);
        a.insert(row("7", 100));
        b.insert(row("7", 101));

        assert_ne!(a.signature(), b.signature());
        assert_ne!(Bucket::new(1).signature(), Bucket::new(2).signature());
    }
}
