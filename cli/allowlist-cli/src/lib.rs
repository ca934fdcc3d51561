//! Merkle allow-lists: commit to a list of addresses with a single keccak-256
//! root and prove membership of any one of them.

pub mod common;
pub mod error;
pub mod hasher;
pub mod logging;
pub mod pipeline;
pub mod proof;
pub mod report;
pub mod tree;
pub mod verify;

pub use common::{hex_encode, parse_hash, write_file_atomic};
pub use error::AllowlistError;
pub use hasher::{hash_leaf, Hash, Hasher, Keccak256Hasher, LeafEncoding, LeafHasher};
pub use pipeline::{load_records, parse_records, Allowlist, Claim, PipelineOptions};
pub use proof::MerkleProof;
pub use report::{ProofOutcome, Report, ReportEntry, ReportWriter, WriteMode};
pub use tree::{MerkleTree, OddNodePolicy, TreeOptions};
pub use verify::{check, recompute_root, verify, verify_with, VerificationResult};
