//! Merkle roots, the coinbase authentication path, and the witness
//! commitment.
//!
//! All hashing is SHA-256d over the 64-byte concatenation of two nodes;
//! levels with an odd node count duplicate their last node. The coinbase
//! always sits at leaf index 0, so every element of its path lies outside
//! the coinbase's own subtree: the path is computed once per template and
//! reused unchanged while the coinbase mutates.

use smelter_chains::types::ScriptPubkey;
use smelter_core::hashes::{hash256, Hash256Digest};

/// The BIP-141 commitment header bytes.
pub const WITNESS_COMMITMENT_HEADER: [u8; 4] = [0xaa, 0x21, 0xa9, 0xed];

fn combine(left: &Hash256Digest, right: &Hash256Digest) -> Hash256Digest {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_ref());
    buf[32..].copy_from_slice(right.as_ref());
    hash256(&buf)
}

fn reduce(level: &[Hash256Digest]) -> Vec<Hash256Digest> {
    let mut next = Vec::with_capacity((level.len() + 1) / 2);
    for pair in level.chunks(2) {
        let right = if pair.len() == 2 { &pair[1] } else { &pair[0] };
        next.push(combine(&pair[0], right));
    }
    next
}

/// The merkle root over `leaves`. A single leaf is its own root; no leaves
/// yield the null digest.
pub fn merkle_root(leaves: &[Hash256Digest]) -> Hash256Digest {
    if leaves.is_empty() {
        return Hash256Digest::default();
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = reduce(&level);
    }
    level[0]
}

/// The authentication path for leaf index 0: at each level the node's
/// sibling, or the node itself where the duplication rule applies. Excludes
/// the leaf and the root.
pub fn coinbase_path(leaves: &[Hash256Digest]) -> Vec<Hash256Digest> {
    let mut path = vec![];
    if leaves.is_empty() {
        return path;
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        // leaf 0's sibling is node 1; the node stands in for itself only at
        // the single-node level, which ends the loop
        path.push(level[1]);
        level = reduce(&level);
    }
    path
}

/// Fold a leaf up its authentication path to the root. The coinbase leaf is
/// always on the left.
pub fn root_from_path(leaf: Hash256Digest, path: &[Hash256Digest]) -> Hash256Digest {
    path.iter().fold(leaf, |acc, sibling| combine(&acc, sibling))
}

/// The witness commitment: the merkle root over `wtxid_leaves` (the null
/// coinbase placeholder first, then each selected transaction's wtxid)
/// hashed together with the 32-byte zero witness reserved value.
pub fn witness_commitment(wtxid_leaves: &[Hash256Digest]) -> Hash256Digest {
    let root = merkle_root(wtxid_leaves);
    combine(&root, &Hash256Digest::default())
}

/// The 38-byte commitment output script:
/// `OP_RETURN 0x24 0xaa21a9ed <commitment>`.
pub fn witness_commitment_script(commitment: &Hash256Digest) -> ScriptPubkey {
    let mut payload = Vec::with_capacity(36);
    payload.extend_from_slice(&WITNESS_COMMITMENT_HEADER);
    payload.extend_from_slice(commitment.as_ref());
    ScriptPubkey::op_return(&payload)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn a_single_leaf_is_its_own_root() {
        let leaf = Hash256Digest([0x42; 32]);
        assert_eq!(merkle_root(&[leaf]), leaf);
        assert!(coinbase_path(&[leaf]).is_empty());
        assert_eq!(root_from_path(leaf, &[]), leaf);
    }

    #[test]
    fn two_leaves_hash_pairwise() {
        let a = Hash256Digest([0x11; 32]);
        let b = Hash256Digest([0x22; 32]);
        assert_eq!(merkle_root(&[a, b]), combine(&a, &b));
        assert_eq!(coinbase_path(&[a, b]), vec![b]);
    }

    #[test]
    fn odd_levels_duplicate_the_last_node() {
        let a = Hash256Digest([0x11; 32]);
        let b = Hash256Digest([0x22; 32]);
        let c = Hash256Digest([0x33; 32]);
        let expected = combine(&combine(&a, &b), &combine(&c, &c));
        assert_eq!(merkle_root(&[a, b, c]), expected);
    }

    #[test]
    fn the_path_reproduces_the_root_for_any_leaf_count() {
        for n in 1..=9usize {
            let leaves: Vec<_> = (0..n)
                .map(|i| Hash256Digest([i as u8 + 1; 32]))
                .collect();
            let path = coinbase_path(&leaves);
            assert_eq!(
                root_from_path(leaves[0], &path),
                merkle_root(&leaves),
                "leaf count {n}"
            );
        }
    }

    #[test]
    fn the_path_does_not_depend_on_the_coinbase_leaf() {
        let mut leaves: Vec<_> = (0..5).map(|i| Hash256Digest([i as u8; 32])).collect();
        let before = coinbase_path(&leaves);
        leaves[0] = Hash256Digest([0xff; 32]);
        assert_eq!(coinbase_path(&leaves), before);
    }

    #[test]
    fn the_commitment_script_is_canonical() {
        let commitment = Hash256Digest([0xab; 32]);
        let script = witness_commitment_script(&commitment);
        let bytes = script.items();
        assert_eq!(bytes.len(), 38);
        assert_eq!(bytes[0], 0x6a);
        assert_eq!(bytes[1], 0x24);
        assert_eq!(&bytes[2..6], &WITNESS_COMMITMENT_HEADER);
        assert_eq!(&bytes[6..], commitment.as_ref());
    }

    #[test]
    fn a_coinbase_only_commitment_hashes_two_null_digests() {
        let commitment = witness_commitment(&[Hash256Digest::default()]);
        assert_eq!(
            commitment,
            combine(&Hash256Digest::default(), &Hash256Digest::default())
        );
    }
}
