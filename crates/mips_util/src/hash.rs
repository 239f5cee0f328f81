//! SHA-256 tagging helpers shared by the paged memory Merkle tree and the
//! canonical state hash.

use sha2::{Digest, Sha256};

pub const DIGEST_LEN: usize = 32;
pub type Digest32 = [u8; DIGEST_LEN];

/// Combine two 32-byte digests into their parent node's digest.
///
/// Used for every internal node of the page-content tree, the global
/// page-index tree, and the final state hash fold.
pub fn tagged_hash(left: &Digest32, right: &Digest32) -> Digest32 {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    let out = hasher.finalize();
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&out);
    digest
}

/// Hash an arbitrary byte slice, used for leaf content (32-byte memory
/// words) and for the preimage oracle's key derivation.
pub fn hash_bytes(bytes: &[u8]) -> Digest32 {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&out);
    digest
}

/// Precomputed hashes of all-zero subtrees, indexed by tree height (0 is a
/// single zeroed leaf). Avoids rehashing untouched pages and subtrees.
pub struct ZeroHashes {
    levels: Vec<Digest32>,
}

impl ZeroHashes {
    /// Builds the table up to and including `max_height`.
    pub fn new(max_height: u32) -> Self {
        let mut levels = Vec::with_capacity(max_height as usize + 1);
        levels.push([0u8; DIGEST_LEN]);
        for i in 1..=max_height {
            let prev = levels[i as usize - 1];
            levels.push(tagged_hash(&prev, &prev));
        }
        Self { levels }
    }

    pub fn get(&self, height: u32) -> Digest32 {
        self.levels[height as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hashes_monotonic_distinct() {
        let table = ZeroHashes::new(4);
        for h in 0..4 {
            assert_ne!(table.get(h), table.get(h + 1));
        }
    }

    #[test]
    fn tagged_hash_is_order_sensitive() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_ne!(tagged_hash(&a, &b), tagged_hash(&b, &a));
    }

    #[test]
    fn tagged_hash_deterministic() {
        let a = [7u8; 32];
        let b = [9u8; 32];
        assert_eq!(tagged_hash(&a, &b), tagged_hash(&a, &b));
    }
}
