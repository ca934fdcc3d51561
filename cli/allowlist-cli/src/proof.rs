use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{hex_encode, parse_hash};
use crate::error::AllowlistError;
use crate::hasher::{Hash, Hasher};
use crate::tree::{MerkleTree, OddNodePolicy};

/// Sibling hashes from the leaf level up to, but excluding, the root.
///
/// Holds copies of the hashes, so it stays valid after the tree is dropped.
/// Serializes as a list of `0x`-prefixed hex strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct MerkleProof {
    siblings: Vec<Hash>,
}

impl MerkleProof {
    pub fn new(siblings: Vec<Hash>) -> Self {
        Self { siblings }
    }

    pub fn siblings(&self) -> &[Hash] {
        &self.siblings
    }

    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }

    pub fn into_inner(self) -> Vec<Hash> {
        self.siblings
    }
}

/// Formats as `[0x..,0x..]`, the form used in the text report.
impl fmt::Display for MerkleProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, sibling) in self.siblings.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(&hex_encode(sibling))?;
        }
        f.write_str("]")
    }
}

impl From<MerkleProof> for Vec<String> {
    fn from(proof: MerkleProof) -> Self {
        proof.siblings.iter().map(hex_encode).collect()
    }
}

impl TryFrom<Vec<String>> for MerkleProof {
    type Error = AllowlistError;

    fn try_from(values: Vec<String>) -> Result<Self, Self::Error> {
        values
            .iter()
            .map(|value| parse_hash(value))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }
}

impl<H: Hasher> MerkleTree<H> {
    /// Generates the proof for `target`, looked up by value in the leaf level.
    ///
    /// When the same leaf appears more than once, the first occurrence is used.
    ///
    /// # Errors
    /// Returns [`AllowlistError::LeafNotFound`] if `target` is not a leaf
    pub fn proof(&self, target: &Hash) -> Result<MerkleProof, AllowlistError> {
        let index = self
            .position(target)
            .ok_or(AllowlistError::LeafNotFound(*target))?;
        self.proof_at(index)
    }

    /// Generates the proof for the leaf at `leaf_index`.
    ///
    /// # Errors
    /// Returns [`AllowlistError::LeafIndexOutOfBounds`] if the index is past the
    /// last leaf
    pub fn proof_at(&self, leaf_index: usize) -> Result<MerkleProof, AllowlistError> {
        if leaf_index >= self.leaf_count() {
            return Err(AllowlistError::LeafIndexOutOfBounds {
                index: leaf_index,
                leaf_count: self.leaf_count(),
            });
        }

        let levels = self.levels();
        let mut siblings = Vec::with_capacity(self.depth());
        let mut current_index = leaf_index;

        // The root level has no siblings.
        for level in &levels[..levels.len() - 1] {
            let sibling_index = if current_index.is_multiple_of(2) {
                current_index + 1
            } else {
                current_index - 1
            };

            if let Some(sibling) = level.get(sibling_index) {
                siblings.push(*sibling);
            } else if self.options().odd_node == OddNodePolicy::Duplicate {
                siblings.push(level[current_index]);
            }

            current_index /= 2;
        }

        Ok(MerkleProof::new(siblings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::{hash_leaf, Keccak256Hasher};
    use crate::tree::TreeOptions;

    fn leaves(count: usize) -> Vec<Hash> {
        (0..count)
            .map(|i| hash_leaf(format!("wallet-{i}").as_bytes()))
            .collect()
    }

    #[test]
    fn test_get_merkle_proof() {
        let tree = MerkleTree::build(leaves(4)).unwrap();
        let level1 = tree.level(1).unwrap();

        let proof = tree.proof_at(0).unwrap();
        assert_eq!(proof.len(), 2);
        assert_eq!(proof.siblings()[0], tree.leaves()[1]);
        assert_eq!(proof.siblings()[1], level1[1]);
    }

    #[test]
    fn test_proof_for_promoted_leaf() {
        let a = hash_leaf(b"A");
        let b = hash_leaf(b"B");
        let c = hash_leaf(b"C");
        let tree = MerkleTree::build(vec![a, b, c]).unwrap();
        let level1 = tree.level(1).unwrap();

        let proof = tree.proof(&c).unwrap();
        assert_eq!(proof.siblings(), &[level1[0]]);
    }

    #[test]
    fn test_proof_for_duplicated_leaf_includes_itself() {
        let a = hash_leaf(b"A");
        let b = hash_leaf(b"B");
        let c = hash_leaf(b"C");
        let options = TreeOptions {
            odd_node: OddNodePolicy::Duplicate,
            ..TreeOptions::default()
        };
        let tree: MerkleTree = MerkleTree::build_with(vec![a, b, c], options).unwrap();
        let level1 = tree.level(1).unwrap();

        let proof = tree.proof(&c).unwrap();
        assert_eq!(proof.siblings(), &[c, level1[0]]);
    }

    #[test]
    fn test_single_leaf_proof_is_empty() {
        let leaf = hash_leaf(b"solo");
        let tree = MerkleTree::build(vec![leaf]).unwrap();
        assert!(tree.proof(&leaf).unwrap().is_empty());
    }

    #[test]
    fn test_proof_leaf_not_found() {
        let tree = MerkleTree::build(leaves(3)).unwrap();
        let missing = hash_leaf(b"not-listed");
        let result = tree.proof(&missing);
        assert!(matches!(result, Err(AllowlistError::LeafNotFound(hash)) if hash == missing));
    }

    #[test]
    fn test_proof_out_of_bounds() {
        let tree = MerkleTree::build(leaves(2)).unwrap();
        let result = tree.proof_at(5);
        assert!(matches!(
            result,
            Err(AllowlistError::LeafIndexOutOfBounds {
                index: 5,
                leaf_count: 2
            })
        ));
    }

    #[test]
    fn test_proof_length_bound() {
        for count in 1..=40usize {
            let tree = MerkleTree::build(leaves(count)).unwrap();
            let bound = count.next_power_of_two().trailing_zeros() as usize;
            for index in 0..count {
                assert!(tree.proof_at(index).unwrap().len() <= bound);
            }
        }
    }

    #[test]
    fn test_display_format() {
        assert_eq!(MerkleProof::default().to_string(), "[]");
        let proof = MerkleProof::new(vec![[0x11u8; 32], [0x22u8; 32]]);
        let expected = format!("[0x{},0x{}]", "11".repeat(32), "22".repeat(32));
        assert_eq!(proof.to_string(), expected);
    }

    #[test]
    fn test_json_shape() {
        let proof = MerkleProof::new(vec![Keccak256Hasher::digest(b"x")]);
        let json = serde_json::to_value(&proof).unwrap();
        assert_eq!(json, serde_json::json!([hex_encode(proof.siblings()[0])]));

        let back: MerkleProof = serde_json::from_value(json).unwrap();
        assert_eq!(back, proof);
    }

    #[test]
    fn test_json_rejects_bad_hash() {
        let result: Result<MerkleProof, _> = serde_json::from_str(r#"["0x1234"]"#);
        assert!(result.is_err());
    }
}
