//! Three-way difference computation between two bucket maps.
//!
//! Small inputs are compared bucket-by-bucket; anything with at least two
//! buckets per side goes through Merkle trees so identical subtrees are pruned
//! without visiting their leaves.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::bail;
use crate::bucket::Bucket;
use crate::error::{CheckResult, ErrorKind};
use crate::merkle::{MerkleNode, MerkleTree, NodeDetail};
use crate::types::RowDataHash;

/// The three-way difference between source and sink for one table partition.
///
/// A non-empty difference set is a normal, successful-completion outcome — it
/// is the product the engine exists to compute, not an error. Accumulated
/// across all divergent leaf-bucket pairs of one run; owned by that run and
/// cleared at its end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifferenceSet {
    /// Rows present on the source only (missing on the sink).
    pub only_on_source: HashMap<String, RowDataHash>,
    /// Rows present on the sink only (missing on the source).
    pub only_on_sink: HashMap<String, RowDataHash>,
    /// Rows present on both sides with differing content hashes.
    pub differing: HashMap<String, (RowDataHash, RowDataHash)>,
}

impl DifferenceSet {
    /// Creates an empty difference set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the two sides were found identical.
    pub fn is_empty(&self) -> bool {
        self.only_on_source.is_empty() && self.only_on_sink.is_empty() && self.differing.is_empty()
    }

    /// Returns the total number of divergent primary keys.
    pub fn len(&self) -> usize {
        self.only_on_source.len() + self.only_on_sink.len() + self.differing.len()
    }

    /// Returns the sorted union of all divergent primary keys.
    pub fn diff_keys(&self) -> BTreeSet<String> {
        self.only_on_source
            .keys()
            .chain(self.only_on_sink.keys())
            .chain(self.differing.keys())
            .cloned()
            .collect()
    }

    /// Discards all accumulated differences.
    pub fn clear(&mut self) {
        self.only_on_source.clear();
        self.only_on_sink.clear();
        self.differing.clear();
    }
}

/// Compares two aligned bucket maps and returns their difference.
///
/// Entry policy: with fewer than two buckets on either side the (at most one)
/// bucket pair is compared directly — two empty maps are trivial success.
/// Otherwise both Merkle trees are built and traversed simultaneously;
/// subtrees with equal signatures are pruned. A tree depth mismatch means the
/// bucket lists differ too substantially for leaf-by-leaf comparison and is
/// fatal for the run ([`ErrorKind::MerkleDepthMismatch`]).
pub fn compare_buckets(
    source: BTreeMap<u32, Bucket>,
    sink: BTreeMap<u32, Bucket>,
) -> CheckResult<DifferenceSet> {
    let mut diff = DifferenceSet::new();

    if source.len().min(sink.len()) < 2 {
        let mut sink = sink;
        for (number, source_bucket) in source {
            match sink.remove(&number) {
                Some(sink_bucket) => compare_bucket_pair(&source_bucket, &sink_bucket, &mut diff),
                None => compare_bucket_pair(&source_bucket, &Bucket::new(number), &mut diff),
            }
        }
        for (number, sink_bucket) in sink {
            compare_bucket_pair(&Bucket::new(number), &sink_bucket, &mut diff);
        }

        return Ok(diff);
    }

    let source_tree = MerkleTree::build(source.into_values().collect())?;
    let sink_tree = MerkleTree::build(sink.into_values().collect())?;

    if source_tree.depth() != sink_tree.depth() {
        bail!(
            ErrorKind::MerkleDepthMismatch,
            "Merkle tree depths differ, table requires resynchronization",
            format!(
                "source depth {} vs sink depth {}",
                source_tree.depth(),
                sink_tree.depth()
            )
        );
    }

    compare_nodes(source_tree.root(), sink_tree.root(), &mut diff)?;

    Ok(diff)
}

/// Recursive simultaneous pre-order traversal of both trees.
///
/// Equal signatures prune the whole subtree; divergent leaves are compared
/// bucket-by-bucket; divergent internal nodes recurse into both child pairs.
fn compare_nodes(
    source: &MerkleNode,
    sink: &MerkleNode,
    diff: &mut DifferenceSet,
) -> CheckResult<()> {
    if source.signature() == sink.signature() {
        return Ok(());
    }

    match (source.detail(), sink.detail()) {
        (NodeDetail::Leaf { bucket: source_bucket }, NodeDetail::Leaf { bucket: sink_bucket }) => {
            compare_bucket_pair(source_bucket, sink_bucket, diff);
            Ok(())
        }
        (
            NodeDetail::Internal {
                left: source_left,
                right: source_right,
            },
            NodeDetail::Internal {
                left: sink_left,
                right: sink_right,
            },
        ) => {
            compare_nodes(source_left, sink_left, diff)?;
            compare_nodes(source_right, sink_right, diff)?;
            Ok(())
        }
        // Equal leaf counts produce identical shapes; reaching this arm means
        // the depth guard was bypassed.
        _ => bail!(
            ErrorKind::InvalidState,
            "Merkle tree shapes diverged during traversal"
        ),
    }
}

/// Set-difference between one pair of buckets.
///
/// Keys on exactly one side land in the corresponding only-on map; keys on
/// both sides with unequal row hashes land in `differing`. The primary key
/// hash is by definition equal for matching keys and is not compared.
fn compare_bucket_pair(source: &Bucket, sink: &Bucket, diff: &mut DifferenceSet) {
    for (key, source_row) in source.entries() {
        match sink.entries().get(key) {
            Some(sink_row) => {
                if source_row.row_hash != sink_row.row_hash {
                    diff.differing
                        .insert(key.clone(), (source_row.clone(), sink_row.clone()));
                }
            }
            None => {
                diff.only_on_source.insert(key.clone(), source_row.clone());
            }
        }
    }

    for (key, sink_row) in sink.entries() {
        if !source.entries().contains_key(key) {
            diff.only_on_sink.insert(key.clone(), sink_row.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::build_buckets;
    use crate::hashing::hash_primary_key;

    fn row(pk: &str, row_hash: u64) -> RowDataHash {
        let (primary_key, primary_key_hash) = hash_primary_key(&[pk]);
        RowDataHash {
            primary_key,
            primary_key_hash,
            row_hash,
        }
    }

    fn rows(range: std::ops::Range<u64>) -> Vec<RowDataHash> {
        range.map(|i| row(&i.to_string(), i * 13 + 1)).collect()
    }

    #[test]
    fn empty_sides_are_trivially_identical() {
        let diff = compare_buckets(BTreeMap::new(), BTreeMap::new()).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn identical_sides_produce_an_empty_difference() {
        let source = build_buckets(rows(0..1000), 16).unwrap();
        let sink = build_buckets(rows(0..1000), 16).unwrap();

        let diff = compare_buckets(source, sink).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn a_changed_row_is_reported_as_differing() {
        let source = build_buckets(rows(0..500), 8).unwrap();
        let mut altered = rows(0..500);
        for r in altered.iter_mut() {
            if r.primary_key == "42" {
                r.row_hash ^= 0xDEAD_BEEF;
            }
        }
        let sink = build_buckets(altered, 8).unwrap();

        let diff = compare_buckets(source, sink).unwrap();
        assert_eq!(diff.differing.len(), 1);
        assert!(diff.differing.contains_key("42"));
        assert!(diff.only_on_source.is_empty());
        assert!(diff.only_on_sink.is_empty());
    }

    #[test]
    fn a_missing_row_is_reported_on_the_surviving_side() {
        let source = build_buckets(rows(0..100), 4).unwrap();
        let sink_rows: Vec<RowDataHash> = rows(0..100)
            .into_iter()
            .filter(|r| r.primary_key != "7")
            .collect();
        let sink = build_buckets(sink_rows, 4).unwrap();

        let diff = compare_buckets(source, sink).unwrap();
        assert_eq!(diff.only_on_source.len(), 1);
        assert!(diff.only_on_source.contains_key("7"));
        assert!(diff.differing.is_empty());
    }

    #[test]
    fn every_key_lands_in_exactly_one_set() {
        let source = build_buckets(rows(0..300), 8).unwrap();
        let mut sink_rows = rows(50..350);
        for r in sink_rows.iter_mut() {
            if r.primary_key == "100" {
                r.row_hash = 0;
            }
        }
        let mut source = source;
        let mut sink = build_buckets(sink_rows, 8).unwrap();
        crate::bucket::align_buckets(&mut source, &mut sink);

        let diff = compare_buckets(source, sink).unwrap();

        let mut seen = BTreeSet::new();
        for key in diff.only_on_source.keys() {
            assert!(seen.insert(key.clone()));
        }
        for key in diff.only_on_sink.keys() {
            assert!(seen.insert(key.clone()));
        }
        for key in diff.differing.keys() {
            assert!(seen.insert(key.clone()));
        }

        // 0..50 only on source, 300..350 only on sink, "100" differing.
        assert_eq!(diff.only_on_source.len(), 50);
        assert_eq!(diff.only_on_sink.len(), 50);
        assert_eq!(diff.differing.len(), 1);
    }

    #[test]
    fn depth_mismatch_is_fatal() {
        let source = build_buckets(rows(0..64), 4).unwrap();
        let sink = build_buckets(rows(0..4096), 512).unwrap();
        assert!(source.len() >= 2 && sink.len() >= 2);

        let err = compare_buckets(source, sink).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MerkleDepthMismatch);
    }

    #[test]
    fn single_bucket_sides_bypass_tree_construction() {
        let source = build_buckets(rows(0..10), 1).unwrap();
        let mut sink_rows = rows(0..10);
        sink_rows.remove(3);
        let sink = build_buckets(sink_rows, 1).unwrap();

        let diff = compare_buckets(source, sink).unwrap();
        assert_eq!(diff.only_on_source.len(), 1);
    }
}
