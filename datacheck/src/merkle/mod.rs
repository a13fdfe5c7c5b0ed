//! Binary hash tree over an ordered bucket list.
//!
//! The tree exists to localize divergent buckets in O(log n) signature
//! comparisons instead of comparing every bucket pair. Leaves carry bucket
//! signatures; an internal node's signature hashes its children's signatures.
//! The pairing policy only needs to be internally consistent — trees are
//! compared position-by-position, never across differently-built trees.

use xxhash_rust::xxh3::Xxh3;

use crate::bail;
use crate::bucket::Bucket;
use crate::error::{CheckResult, ErrorKind};

/// Signature stored at every Merkle node.
pub type Signature = u64;

/// A node in the bucket Merkle tree.
#[derive(Debug)]
pub struct MerkleNode {
    signature: Signature,
    detail: NodeDetail,
}

/// Leaf or internal payload of a [`MerkleNode`].
#[derive(Debug)]
pub enum NodeDetail {
    /// Leaf node owning the bucket it summarizes.
    Leaf { bucket: Bucket },
    /// Internal node hashing its two children.
    Internal {
        left: Box<MerkleNode>,
        right: Box<MerkleNode>,
    },
}

impl MerkleNode {
    fn leaf(bucket: Bucket) -> Self {
        Self {
            signature: bucket.signature(),
            detail: NodeDetail::Leaf { bucket },
        }
    }

    fn internal(left: MerkleNode, right: MerkleNode) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(&left.signature.to_le_bytes());
        hasher.update(&right.signature.to_le_bytes());
        let signature = hasher.digest();

        Self {
            signature,
            detail: NodeDetail::Internal {
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    /// Returns this node's signature.
    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Returns the leaf/internal payload of this node.
    pub fn detail(&self) -> &NodeDetail {
        &self.detail
    }
}

/// Binary hash tree built bottom-up over a sorted bucket list.
#[derive(Debug)]
pub struct MerkleTree {
    root: MerkleNode,
    depth: usize,
}

impl MerkleTree {
    /// Builds a tree from buckets sorted ascending by bucket number.
    ///
    /// Requires at least two buckets; smaller inputs must be routed through
    /// direct bucket comparison by the caller, so fewer than two here is a
    /// caller error. Adjacent leaves are paired level by level; an unpaired
    /// node at the end of a level is promoted to the next level unmodified.
    pub fn build(buckets: Vec<Bucket>) -> CheckResult<Self> {
        if buckets.len() < 2 {
            bail!(
                ErrorKind::InvalidState,
                "Merkle tree construction requires at least two buckets",
                format!("got {} bucket(s)", buckets.len())
            );
        }

        let mut level: Vec<MerkleNode> = buckets.into_iter().map(MerkleNode::leaf).collect();
        let mut depth = 1;

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut nodes = level.into_iter();
            while let Some(left) = nodes.next() {
                match nodes.next() {
                    Some(right) => next.push(MerkleNode::internal(left, right)),
                    // Odd node count: promote the unpaired node as-is.
                    None => next.push(left),
                }
            }
            level = next;
            depth += 1;
        }

        // The loop leaves exactly one node; guarded by the len() >= 2 check.
        let Some(root) = level.pop() else {
            bail!(ErrorKind::InvalidState, "Merkle tree build produced no root");
        };

        Ok(Self { root, depth })
    }

    /// Returns the root node.
    pub fn root(&self) -> &MerkleNode {
        &self.root
    }

    /// Returns the number of levels in the tree.
    ///
    /// Two trees built from equally many buckets always have equal depth;
    /// a depth mismatch therefore signals bucket lists too divergent to
    /// compare leaf-by-leaf.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::hash_primary_key;
    use crate::types::RowDataHash;

    fn bucket(number: u32, keys: &[&str]) -> Bucket {
        let mut bucket = Bucket::new(number);
        for key in keys {
            let (primary_key, primary_key_hash) = hash_primary_key(&[key]);
            bucket.insert(RowDataHash {
                primary_key,
                primary_key_hash,
                row_hash: primary_key_hash.wrapping_mul(31),
            });
        }
        bucket
    }

    fn buckets(count: u32) -> Vec<Bucket> {
        (0..count)
            .map(|n| bucket(n, &[&format!("k{n}a"), &format!("k{n}b")]))
            .collect()
    }

    #[test]
    fn fewer_than_two_buckets_is_a_caller_error() {
        assert_eq!(
            MerkleTree::build(vec![]).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            MerkleTree::build(buckets(1)).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
    }

    #[test]
    fn depth_grows_logarithmically() {
        assert_eq!(MerkleTree::build(buckets(2)).unwrap().depth(), 2);
        assert_eq!(MerkleTree::build(buckets(3)).unwrap().depth(), 3);
        assert_eq!(MerkleTree::build(buckets(4)).unwrap().depth(), 3);
        assert_eq!(MerkleTree::build(buckets(8)).unwrap().depth(), 4);
        assert_eq!(MerkleTree::build(buckets(9)).unwrap().depth(), 5);
    }

    #[test]
    fn identical_bucket_lists_yield_identical_roots() {
        let a = MerkleTree::build(buckets(7)).unwrap();
        let b = MerkleTree::build(buckets(7)).unwrap();

        assert_eq!(a.root().signature(), b.root().signature());
        assert_eq!(a.depth(), b.depth());
    }

    #[test]
    fn a_single_changed_bucket_changes_the_root() {
        let mut altered = buckets(6);
        altered[3] = bucket(3, &["k3a", "k3b", "extra"]);

        let original = MerkleTree::build(buckets(6)).unwrap();
        let changed = MerkleTree::build(altered).unwrap();

        assert_ne!(original.root().signature(), changed.root().signature());
    }
}
