use std::path::PathBuf;

use thiserror::Error;

use crate::common::hex_encode;
use crate::hasher::Hash;

/// Errors from building an allow-list tree and exporting its proofs.
#[derive(Debug, Error)]
pub enum AllowlistError {
    #[error("cannot build a Merkle tree from zero records")]
    EmptyInput,
    #[error("leaf {} is not part of the tree", hex_encode(.0))]
    LeafNotFound(Hash),
    #[error("leaf index {index} is out of bounds for tree with {leaf_count} leaves")]
    LeafIndexOutOfBounds { index: usize, leaf_count: usize },
    #[error("invalid record {record:?}: {reason}")]
    InvalidRecord { record: String, reason: String },
    #[error("invalid hash {value:?}: {reason}")]
    InvalidHash { value: String, reason: String },
    #[error("failed to write report to {}: {source}", .path.display())]
    SinkWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
