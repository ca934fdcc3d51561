//! Leaf hashing and the hash strategy shared by the tree and the verifier.
//!
//! Every node in the tree is a [`Hash`]: leaves are `H(record)`, internal
//! nodes are `H(lo || hi)` where `(lo, hi)` is the child pair ordered by byte
//! value. The ordering makes pair hashing commutative, so proofs carry no
//! left/right flags.

use std::borrow::Cow;
use std::marker::PhantomData;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::error::AllowlistError;

/// A 32-byte node value.
pub type Hash = [u8; 32];

/// Hash function used for leaves and internal nodes.
pub trait Hasher {
    /// Hashes `data` once.
    fn digest(data: &[u8]) -> Hash;

    /// Hashes the pair ordered by byte value: `H(min(a, b) || max(a, b))`.
    fn digest_sorted_pair(a: &Hash, b: &Hash) -> Hash {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(lo);
        buf[32..].copy_from_slice(hi);
        Self::digest(&buf)
    }
}

/// Keccak-256, as used by the EVM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Keccak256Hasher;

impl Hasher for Keccak256Hasher {
    fn digest(data: &[u8]) -> Hash {
        Keccak256::digest(data).into()
    }

    fn digest_sorted_pair(a: &Hash, b: &Hash) -> Hash {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Keccak256::new()
            .chain_update(lo)
            .chain_update(hi)
            .finalize()
            .into()
    }
}

/// How a record is turned into the bytes that get hashed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LeafEncoding {
    /// The record's UTF-8 bytes.
    #[default]
    Utf8,
    /// The record is a hex literal (optional `0x` prefix) decoded to raw bytes.
    Hex,
}

impl LeafEncoding {
    /// Returns the bytes to hash for an already-trimmed record.
    pub fn leaf_bytes<'a>(&self, record: &'a str) -> Result<Cow<'a, [u8]>, AllowlistError> {
        match self {
            Self::Utf8 => Ok(Cow::Borrowed(record.as_bytes())),
            Self::Hex => {
                let cleaned = record.strip_prefix("0x").unwrap_or(record);
                hex::decode(cleaned)
                    .map(Cow::Owned)
                    .map_err(|e| AllowlistError::InvalidRecord {
                        record: record.to_string(),
                        reason: e.to_string(),
                    })
            }
        }
    }
}

/// Strips leading and trailing `\r` / `\n` from a record.
pub fn strip_line_terminators(record: &str) -> &str {
    record.trim_matches(|c: char| c == '\r' || c == '\n')
}

/// Hashes raw record bytes with keccak-256. No prefixing, no double hashing.
pub fn hash_leaf(record: &[u8]) -> Hash {
    Keccak256Hasher::digest(record)
}

/// Maps input records to leaf hashes.
#[derive(Debug, Clone, Copy)]
pub struct LeafHasher<H: Hasher = Keccak256Hasher> {
    encoding: LeafEncoding,
    _hasher: PhantomData<fn() -> H>,
}

impl Default for LeafHasher<Keccak256Hasher> {
    fn default() -> Self {
        Self::new(LeafEncoding::default())
    }
}

impl<H: Hasher> LeafHasher<H> {
    pub fn new(encoding: LeafEncoding) -> Self {
        Self {
            encoding,
            _hasher: PhantomData,
        }
    }

    pub fn encoding(&self) -> LeafEncoding {
        self.encoding
    }

    /// Hashes one record after stripping line terminators.
    ///
    /// The empty record is valid and hashes to `H("")`.
    pub fn hash(&self, record: &str) -> Result<Hash, AllowlistError> {
        let bytes = self.encoding.leaf_bytes(strip_line_terminators(record))?;
        Ok(H::digest(&bytes))
    }

    /// Hashes every record, in parallel, keeping input order.
    pub fn hash_all<S>(&self, records: &[S]) -> Result<Vec<Hash>, AllowlistError>
    where
        S: AsRef<str> + Sync,
    {
        records
            .par_iter()
            .map(|record| self.hash(record.as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::parse_hash;

    const KECCAK_EMPTY: &str = "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470";
    const KECCAK_ABC: &str = "0x4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45";

    #[test]
    fn test_hash_leaf_known_vectors() {
        assert_eq!(hash_leaf(b""), parse_hash(KECCAK_EMPTY).unwrap());
        assert_eq!(hash_leaf(b"abc"), parse_hash(KECCAK_ABC).unwrap());
    }

    #[test]
    fn test_empty_record_is_valid() {
        let hasher: LeafHasher = LeafHasher::default();
        assert_eq!(hasher.hash("").unwrap(), parse_hash(KECCAK_EMPTY).unwrap());
    }

    #[test]
    fn test_line_terminators_are_stripped() {
        let hasher: LeafHasher = LeafHasher::default();
        let expected = hash_leaf(b"0xabc");
        assert_eq!(hasher.hash("0xabc\r").unwrap(), expected);
        assert_eq!(hasher.hash("0xabc\r\n").unwrap(), expected);
        assert_eq!(hasher.hash("\n0xabc").unwrap(), expected);
        assert_ne!(hasher.hash(" 0xabc").unwrap(), expected);
    }

    #[test]
    fn test_sorted_pair_is_commutative() {
        let a = hash_leaf(b"A");
        let b = hash_leaf(b"B");
        assert_eq!(
            Keccak256Hasher::digest_sorted_pair(&a, &b),
            Keccak256Hasher::digest_sorted_pair(&b, &a)
        );
    }

    #[test]
    fn test_sorted_pair_matches_concatenation() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let mut concat = Vec::with_capacity(64);
        concat.extend_from_slice(&a);
        concat.extend_from_slice(&b);
        assert_eq!(
            Keccak256Hasher::digest_sorted_pair(&b, &a),
            hash_leaf(&concat)
        );
    }

    #[test]
    fn test_hex_encoding_hashes_decoded_bytes() {
        let hasher: LeafHasher = LeafHasher::new(LeafEncoding::Hex);
        assert_eq!(hasher.hash("0x616263").unwrap(), hash_leaf(b"abc"));
        assert_eq!(hasher.hash("616263\r").unwrap(), hash_leaf(b"abc"));
    }

    #[test]
    fn test_hex_encoding_rejects_garbage() {
        let hasher: LeafHasher = LeafHasher::new(LeafEncoding::Hex);
        let result = hasher.hash("0xnothex");
        assert!(matches!(result, Err(AllowlistError::InvalidRecord { .. })));
    }

    #[test]
    fn test_hash_all_keeps_order() {
        let records: Vec<String> = (0..64).map(|i| format!("record-{i}")).collect();
        let hasher: LeafHasher = LeafHasher::default();
        let hashes = hasher.hash_all(&records).unwrap();
        for (record, hash) in records.iter().zip(&hashes) {
            assert_eq!(*hash, hash_leaf(record.as_bytes()));
        }
    }
}
