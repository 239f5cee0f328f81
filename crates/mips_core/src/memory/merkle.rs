//! Binary Merkle tree helpers shared by the in-page leaf tree and the
//! global page-index tree.
//!
//! A leaf is simply the raw 32-byte content at that position — there is no
//! extra hashing step for leaves, only for internal nodes, which keeps the
//! empty-subtree table ([`ZeroHashes`]) usable at every level uniformly.

use mips_util::hash::{tagged_hash, Digest32, ZeroHashes};

pub const LEAF_SIZE: usize = 32;
pub const PAGE_SIZE: usize = 4096;
pub const LEAVES_PER_PAGE: usize = PAGE_SIZE / LEAF_SIZE;
/// log2(LEAVES_PER_PAGE): height of the in-page leaf tree.
pub const PAGE_HEIGHT: u32 = 7;

/// Fold a page's 4096 bytes into its 32-byte root, bottom-up.
pub fn page_root(bytes: &[u8; PAGE_SIZE]) -> Digest32 {
    let mut level: Vec<Digest32> = (0..LEAVES_PER_PAGE)
        .map(|i| {
            let mut leaf = [0u8; LEAF_SIZE];
            leaf.copy_from_slice(&bytes[i * LEAF_SIZE..(i + 1) * LEAF_SIZE]);
            leaf
        })
        .collect();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| tagged_hash(&pair[0], &pair[1]))
            .collect();
    }
    level[0]
}

/// Sibling hashes from a leaf up to (excluding) the page root, bottom-up.
pub fn page_proof(bytes: &[u8; PAGE_SIZE], leaf_index: usize) -> ([u8; LEAF_SIZE], Vec<Digest32>) {
    let mut leaf = [0u8; LEAF_SIZE];
    leaf.copy_from_slice(&bytes[leaf_index * LEAF_SIZE..(leaf_index + 1) * LEAF_SIZE]);

    let mut level: Vec<Digest32> = (0..LEAVES_PER_PAGE)
        .map(|i| {
            let mut l = [0u8; LEAF_SIZE];
            l.copy_from_slice(&bytes[i * LEAF_SIZE..(i + 1) * LEAF_SIZE]);
            l
        })
        .collect();

    let mut idx = leaf_index;
    let mut siblings = Vec::with_capacity(PAGE_HEIGHT as usize);
    while level.len() > 1 {
        let sibling_idx = idx ^ 1;
        siblings.push(level[sibling_idx]);
        level = level
            .chunks(2)
            .map(|pair| tagged_hash(&pair[0], &pair[1]))
            .collect();
        idx /= 2;
    }
    (leaf, siblings)
}

/// Root of a sparse tree of `height` levels given the sorted, deduplicated
/// set of non-empty `(index, hash)` leaves. Missing subtrees use the
/// precomputed zero hash for their height.
///
/// `entries` must be sorted ascending by `index` and each index must fit in
/// `height` bits.
pub fn sparse_root(entries: &[(u64, Digest32)], height: u32, zero: &ZeroHashes) -> Digest32 {
    if height == 0 {
        return entries.first().map(|(_, h)| *h).unwrap_or_else(|| zero.get(0));
    }
    if entries.is_empty() {
        return zero.get(height);
    }
    let bit = height - 1;
    let split = entries.partition_point(|(idx, _)| (idx >> bit) & 1 == 0);
    let (left, right) = entries.split_at(split);
    let l = sparse_root(left, height - 1, zero);
    let r = sparse_root(right, height - 1, zero);
    tagged_hash(&l, &r)
}

/// Sibling hashes from leaf `index` up to (excluding) the root of a sparse
/// tree of `height` levels, top-down order matching the recursion above
/// reversed into bottom-up (leaf-adjacent sibling first).
pub fn sparse_proof(
    entries: &[(u64, Digest32)],
    index: u64,
    height: u32,
    zero: &ZeroHashes,
) -> Vec<Digest32> {
    let mut siblings = vec![[0u8; 32]; height as usize];
    sparse_proof_rec(entries, index, height, zero, &mut siblings);
    siblings
}

fn sparse_proof_rec(
    entries: &[(u64, Digest32)],
    index: u64,
    height: u32,
    zero: &ZeroHashes,
    out: &mut [Digest32],
) {
    if height == 0 {
        return;
    }
    let bit = height - 1;
    let split = entries.partition_point(|(idx, _)| (idx >> bit) & 1 == 0);
    let (left, right) = entries.split_at(split);
    let went_right = (index >> bit) & 1 == 1;
    let (own, sibling) = if went_right { (right, left) } else { (left, right) };
    out[height as usize - 1] = sparse_root(sibling, height - 1, zero);
    sparse_proof_rec(own, index, height - 1, zero, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_root_matches_zero_hash_at_page_height() {
        let bytes = [0u8; PAGE_SIZE];
        let table = ZeroHashes::new(PAGE_HEIGHT);
        assert_eq!(page_root(&bytes), table.get(PAGE_HEIGHT));
    }

    #[test]
    fn page_proof_recomputes_root() {
        let mut bytes = [0u8; PAGE_SIZE];
        bytes[64] = 0xAB;
        let (leaf, siblings) = page_proof(&bytes, 2);
        let mut cur = leaf;
        let mut idx = 2usize;
        for sib in siblings {
            cur = if idx % 2 == 0 {
                tagged_hash(&cur, &sib)
            } else {
                tagged_hash(&sib, &cur)
            };
            idx /= 2;
        }
        assert_eq!(cur, page_root(&bytes));
    }

    #[test]
    fn sparse_root_empty_is_zero_hash() {
        let zero = ZeroHashes::new(20);
        assert_eq!(sparse_root(&[], 20, &zero), zero.get(20));
    }

    #[test]
    fn sparse_proof_recomputes_root() {
        let zero = ZeroHashes::new(8);
        let entries: Vec<(u64, Digest32)> = vec![(3, [9u8; 32]), (7, [4u8; 32])];
        let proof = sparse_proof(&entries, 3, 8, &zero);
        let mut cur = [9u8; 32];
        let mut idx = 3u64;
        for (level, sib) in proof.iter().enumerate() {
            let bit = (idx >> level) & 1;
            cur = if bit == 0 {
                tagged_hash(&cur, sib)
            } else {
                tagged_hash(sib, &cur)
            };
        }
        assert_eq!(cur, sparse_root(&entries, 8, &zero));
    }
}
