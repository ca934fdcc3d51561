//! Binary Merkle tree over a positional list of leaf hashes.
//!
//! `levels[0]` holds the leaves in input order and the last level holds the
//! root. Level `i + 1` has `ceil(len(level_i) / 2)` nodes: adjacent pairs are
//! combined with [`Hasher::digest_sorted_pair`], and a trailing unpaired node
//! is handled according to [`OddNodePolicy`].

use std::marker::PhantomData;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::AllowlistError;
use crate::hasher::{Hash, Hasher, Keccak256Hasher};

/// Levels at least this wide hash their pairs on the rayon pool.
const PARALLEL_LEVEL_THRESHOLD: usize = 1 << 12;

/// What happens to the last node of an odd-length level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OddNodePolicy {
    /// Carry the node up unchanged. It contributes no sibling to proofs at
    /// that level.
    #[default]
    Promote,
    /// Pair the node with a copy of itself and hash the pair.
    Duplicate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeOptions {
    pub odd_node: OddNodePolicy,
    /// Sort leaves by byte value before building, so the root depends only
    /// on the set of leaves and not on their order.
    pub sort_leaves: bool,
}

/// An immutable Merkle tree that keeps every level for proof lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree<H: Hasher = Keccak256Hasher> {
    levels: Vec<Vec<Hash>>,
    options: TreeOptions,
    _hasher: PhantomData<fn() -> H>,
}

impl MerkleTree<Keccak256Hasher> {
    /// Builds a keccak-256 tree with the default options.
    pub fn build(leaves: Vec<Hash>) -> Result<Self, AllowlistError> {
        Self::build_with(leaves, TreeOptions::default())
    }
}

impl<H: Hasher> MerkleTree<H> {
    /// Builds a tree from `leaves`, taken in the given order unless
    /// `options.sort_leaves` is set.
    ///
    /// # Errors
    /// Returns [`AllowlistError::EmptyInput`] if `leaves` is empty
    pub fn build_with(mut leaves: Vec<Hash>, options: TreeOptions) -> Result<Self, AllowlistError> {
        if leaves.is_empty() {
            return Err(AllowlistError::EmptyInput);
        }
        if options.sort_leaves {
            leaves.sort_unstable();
        }

        let mut levels = vec![leaves];
        while let Some(level) = levels.last().filter(|level| level.len() > 1) {
            let next_level = next_level::<H>(level, options.odd_node);
            trace!(
                level = levels.len(),
                width = next_level.len(),
                "built tree level"
            );
            levels.push(next_level);
        }

        debug!(
            leaves = levels[0].len(),
            depth = levels.len() - 1,
            ?options,
            "built merkle tree"
        );

        Ok(Self {
            levels,
            options,
            _hasher: PhantomData,
        })
    }

    pub fn root(&self) -> Hash {
        // Construction guarantees a non-empty top level.
        self.levels[self.levels.len() - 1][0]
    }

    pub fn levels(&self) -> &[Vec<Hash>] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&[Hash]> {
        self.levels.get(index).map(Vec::as_slice)
    }

    /// Number of levels above the leaves. Zero for a single-leaf tree.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn leaves(&self) -> &[Hash] {
        &self.levels[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    pub fn options(&self) -> TreeOptions {
        self.options
    }

    /// Index of the first leaf equal to `leaf`.
    pub fn position(&self, leaf: &Hash) -> Option<usize> {
        self.levels[0].iter().position(|candidate| candidate == leaf)
    }

    pub fn contains(&self, leaf: &Hash) -> bool {
        self.position(leaf).is_some()
    }
}

fn combine<H: Hasher>(chunk: &[Hash], odd_node: OddNodePolicy) -> Hash {
    match (chunk, odd_node) {
        ([left, right], _) => H::digest_sorted_pair(left, right),
        ([single], OddNodePolicy::Promote) => *single,
        ([single], OddNodePolicy::Duplicate) => H::digest_sorted_pair(single, single),
        _ => unreachable!("chunks(2) yields one or two nodes"),
    }
}

fn next_level<H: Hasher>(level: &[Hash], odd_node: OddNodePolicy) -> Vec<Hash> {
    if level.len() >= PARALLEL_LEVEL_THRESHOLD {
        level
            .par_chunks(2)
            .map(|chunk| combine::<H>(chunk, odd_node))
            .collect()
    } else {
        level
            .chunks(2)
            .map(|chunk| combine::<H>(chunk, odd_node))
            .collect()
    }
}
