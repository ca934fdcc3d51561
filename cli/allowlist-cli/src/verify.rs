//! Proof verification.
//!
//! Needs only the leaf, the sibling list and the claimed root, never the tree,
//! so it mirrors what an on-chain verifier does: fold the siblings into the
//! leaf with the same sort-pairs rule the builder used and compare.

use crate::hasher::{Hash, Hasher, Keccak256Hasher};

/// Outcome of checking one proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationResult {
    pub valid: bool,
    pub computed_root: Hash,
}

/// Folds `siblings` into `leaf`, bottom-up.
pub fn recompute_root<H: Hasher>(leaf: &Hash, siblings: &[Hash]) -> Hash {
    siblings
        .iter()
        .fold(*leaf, |current, sibling| H::digest_sorted_pair(&current, sibling))
}

pub fn check<H: Hasher>(leaf: &Hash, siblings: &[Hash], root: &Hash) -> VerificationResult {
    let computed_root = recompute_root::<H>(leaf, siblings);
    VerificationResult {
        valid: &computed_root == root,
        computed_root,
    }
}

pub fn verify_with<H: Hasher>(leaf: &Hash, siblings: &[Hash], root: &Hash) -> bool {
    check::<H>(leaf, siblings, root).valid
}

/// Verifies a keccak-256 proof.
pub fn verify(leaf: &Hash, siblings: &[Hash], root: &Hash) -> bool {
    verify_with::<Keccak256Hasher>(leaf, siblings, root)
}
