use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::common::hex_encode;
use crate::error::AllowlistError;
use crate::hasher::{strip_line_terminators, Hash, LeafEncoding, LeafHasher};
use crate::proof::MerkleProof;
use crate::report::{ProofOutcome, Report, ReportEntry};
use crate::tree::{MerkleTree, TreeOptions};
use crate::verify::verify;

/// Splits newline-delimited text into records, stripping line terminators and
/// dropping empty lines.
pub fn parse_records(text: &str) -> Vec<String> {
    text.split('\n')
        .map(strip_line_terminators)
        .filter(|record| !record.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads records from a newline-delimited UTF-8 file.
pub fn load_records(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records from {}", path.display()))?;
    let records = parse_records(&text);
    debug!(path = %path.display(), records = records.len(), "loaded records");
    Ok(records)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub encoding: LeafEncoding,
    pub tree: TreeOptions,
}

/// A claim for one record: everything a verifier needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub merkle_root: String,
    pub record: String,
    pub leaf: String,
    pub leaf_index: usize,
    pub merkle_proof: MerkleProof,
    /// How `record` was hashed into `leaf`. Older claims without it are UTF-8.
    #[serde(default)]
    pub leaf_encoding: LeafEncoding,
}

/// The built tree together with the records it was built from.
#[derive(Debug, Clone)]
pub struct Allowlist {
    records: Vec<String>,
    leaves: Vec<Hash>,
    tree: MerkleTree,
    /// Leaf hash to its first position in level 0.
    index: HashMap<Hash, usize>,
    hasher: LeafHasher,
}

impl Allowlist {
    /// Hashes `records` and builds the tree over them.
    ///
    /// # Errors
    /// Returns [`AllowlistError::EmptyInput`] when there are no records and
    /// [`AllowlistError::InvalidRecord`] when a record cannot be encoded
    pub fn from_records(
        records: Vec<String>,
        options: PipelineOptions,
    ) -> Result<Self, AllowlistError> {
        if records.is_empty() {
            return Err(AllowlistError::EmptyInput);
        }
        let hasher = LeafHasher::new(options.encoding);
        let leaves = hasher.hash_all(&records)?;
        let tree = MerkleTree::build_with(leaves.clone(), options.tree)?;

        let mut index = HashMap::with_capacity(tree.leaf_count());
        for (position, leaf) in tree.leaves().iter().enumerate() {
            index.entry(*leaf).or_insert(position);
        }

        info!(
            records = records.len(),
            depth = tree.depth(),
            root = %hex_encode(tree.root()),
            "allow-list tree built"
        );

        Ok(Self {
            records,
            leaves,
            tree,
            index,
            hasher,
        })
    }

    pub fn root(&self) -> Hash {
        self.tree.root()
    }

    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    pub fn records(&self) -> &[String] {
        &self.records
    }

    /// Leaf hashes in input order (the tree may hold them sorted).
    pub fn leaves(&self) -> &[Hash] {
        &self.leaves
    }

    /// Position of the first occurrence of `leaf` in the tree's leaf level.
    pub fn leaf_index(&self, leaf: &Hash) -> Option<usize> {
        self.index.get(leaf).copied()
    }

    /// Proves and self-verifies every record, in input order.
    ///
    /// Records whose proof cannot be produced are kept as
    /// [`ProofOutcome::Unprocessable`] instead of aborting the batch.
    pub fn report(&self) -> Report {
        let root = self.tree.root();
        let entries: Vec<ReportEntry> = self
            .records
            .par_iter()
            .zip(self.leaves.par_iter())
            .map(|(record, leaf)| self.entry(record, leaf, &root))
            .collect();

        let report = Report { root, entries };
        let verified = report.verified_count();
        if verified < report.entries.len() {
            warn!(
                verified,
                total = report.entries.len(),
                "some records did not produce a valid proof"
            );
        }
        report
    }

    /// Builds the claim for a single record.
    ///
    /// # Errors
    /// Returns [`AllowlistError::LeafNotFound`] if the record is not listed
    pub fn claim(&self, record: &str) -> Result<Claim, AllowlistError> {
        let record = strip_line_terminators(record);
        let leaf = self.hasher.hash(record)?;
        let leaf_index = self
            .leaf_index(&leaf)
            .ok_or(AllowlistError::LeafNotFound(leaf))?;
        let merkle_proof = self.tree.proof_at(leaf_index)?;

        Ok(Claim {
            merkle_root: hex_encode(self.tree.root()),
            record: record.to_string(),
            leaf: hex_encode(leaf),
            leaf_index,
            merkle_proof,
            leaf_encoding: self.hasher.encoding(),
        })
    }

    fn entry(&self, record: &str, leaf: &Hash, root: &Hash) -> ReportEntry {
        let leaf_index = self.leaf_index(leaf);
        let outcome = match leaf_index.map(|index| self.tree.proof_at(index)) {
            Some(Ok(proof)) => {
                let verified = verify(leaf, proof.siblings(), root);
                ProofOutcome::Proven { proof, verified }
            }
            Some(Err(err)) => ProofOutcome::Unprocessable(err.to_string()),
            None => ProofOutcome::Unprocessable(AllowlistError::LeafNotFound(*leaf).to_string()),
        };
        ReportEntry {
            record: record.to_string(),
            leaf: *leaf,
            leaf_index,
            outcome,
        }
    }
}
