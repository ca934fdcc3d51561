use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use allowlist_cli::{
    check, hex_encode, parse_hash, Claim, Hash, Keccak256Hasher, LeafEncoding, LeafHasher,
};

#[derive(Parser, Debug)]
#[command(name = "verify")]
#[command(about = "Verify a claim JSON against a published Merkle root", long_about = None)]
#[command(group(ArgGroup::new("published_root").required(true).args(["root", "root_file"])))]
pub struct Cli {
    /// Input claim JSON file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Published Merkle root (hex format)
    #[arg(short, long)]
    pub root: Option<String>,

    /// File holding the published Merkle root, as written by `build-tree --root-output`
    #[arg(long)]
    pub root_file: Option<PathBuf>,

    /// Override the leaf encoding recorded in the claim
    #[arg(long, value_enum)]
    pub leaf_encoding: Option<LeafEncoding>,
}

impl Cli {
    /// The root to verify against. Never taken from the claim itself.
    fn published_root(&self) -> Result<Hash> {
        if let Some(root) = &self.root {
            return parse_hash(root).context("Invalid Merkle root");
        }
        let Some(path) = &self.root_file else {
            anyhow::bail!("A published root is required: pass --root or --root-file");
        };
        let contents = fs::read_to_string(path).context("Failed to read root file")?;
        parse_hash(&contents).context("Invalid Merkle root in root file")
    }
}

/// Recomputes the root from the claim and reports whether it matches `root`.
///
/// The leaf is always re-derived from the record, so a claim cannot smuggle in
/// a leaf that does not belong to its record. `encoding` falls back to the one
/// recorded in the claim.
pub fn verify_claim(claim: &Claim, root: &Hash, encoding: Option<LeafEncoding>) -> Result<bool> {
    let encoding = encoding.unwrap_or(claim.leaf_encoding);
    let leaf = LeafHasher::<Keccak256Hasher>::new(encoding)
        .hash(&claim.record)
        .context("Invalid record in claim")?;

    if hex_encode(leaf) != claim.leaf {
        warn!(
            claimed = %claim.leaf,
            computed = %hex_encode(leaf),
            ?encoding,
            "claimed leaf does not match record; using recomputed leaf"
        );
    }
    if parse_hash(&claim.merkle_root).ok().as_ref() != Some(root) {
        warn!(
            claimed = %claim.merkle_root,
            published = %hex_encode(root),
            "claim was issued for a different root"
        );
    }

    let result = check::<Keccak256Hasher>(&leaf, claim.merkle_proof.siblings(), root);
    if !result.valid {
        warn!(
            computed_root = %hex_encode(result.computed_root),
            "proof recomputes a different root"
        );
    }
    Ok(result.valid)
}

pub fn run(cli: &Cli) -> Result<()> {
    let root = cli.published_root()?;

    println!("Reading claim from {:?}...", cli.input);
    let claim_content = fs::read_to_string(&cli.input).context("Failed to read claim file")?;
    let claim: Claim =
        serde_json::from_str(&claim_content).context("Failed to parse claim JSON")?;

    let valid = verify_claim(&claim, &root, cli.leaf_encoding)?;
    println!("Root = {}", hex_encode(root));
    println!("Wallet Address : {}", claim.record);
    println!("Verify result : {valid}");

    if !valid {
        anyhow::bail!("Proof does not verify against the published Merkle root");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use allowlist_cli::{hash_leaf, Allowlist, MerkleProof, PipelineOptions};

    fn records() -> Vec<String> {
        vec!["0xaaa".to_string(), "0xbbb".to_string(), "0xccc".to_string()]
    }

    fn claim() -> (Claim, Hash) {
        let allowlist = Allowlist::from_records(records(), PipelineOptions::default()).unwrap();
        (allowlist.claim("0xbbb").unwrap(), allowlist.root())
    }

    fn cli(input: PathBuf, root: Option<String>, root_file: Option<PathBuf>) -> Cli {
        Cli {
            input,
            root,
            root_file,
            leaf_encoding: None,
        }
    }

    #[test]
    fn test_verify_claim_valid() {
        let (claim, root) = claim();
        assert!(verify_claim(&claim, &root, None).unwrap());
    }

    #[test]
    fn test_verify_claim_wrong_root() {
        let (claim, _) = claim();
        assert!(!verify_claim(&claim, &[7u8; 32], None).unwrap());
    }

    #[test]
    fn test_verify_claim_swapped_record() {
        let (mut claim, root) = claim();
        claim.record = "0xddd".to_string();
        assert!(!verify_claim(&claim, &root, None).unwrap());
    }

    #[test]
    fn test_self_rooted_claim_is_rejected() {
        let (_, published_root) = claim();
        let record = "0xnot-on-any-list";
        let forged = Claim {
            merkle_root: hex_encode(hash_leaf(record.as_bytes())),
            record: record.to_string(),
            leaf: hex_encode(hash_leaf(record.as_bytes())),
            leaf_index: 0,
            merkle_proof: MerkleProof::default(),
            leaf_encoding: LeafEncoding::Utf8,
        };
        assert!(!verify_claim(&forged, &published_root, None).unwrap());
    }

    #[test]
    fn test_hex_claim_verifies_with_recorded_encoding() {
        let records = vec!["0x0a".to_string(), "0x0b".to_string(), "0x0c".to_string()];
        let options = PipelineOptions {
            encoding: LeafEncoding::Hex,
            ..PipelineOptions::default()
        };
        let allowlist = Allowlist::from_records(records, options).unwrap();
        let claim = allowlist.claim("0x0c").unwrap();

        let json = serde_json::to_string(&claim).unwrap();
        let claim: Claim = serde_json::from_str(&json).unwrap();
        assert!(verify_claim(&claim, &allowlist.root(), None).unwrap());
        assert!(!verify_claim(&claim, &allowlist.root(), Some(LeafEncoding::Utf8)).unwrap());
    }

    #[test]
    fn test_root_is_required() {
        let result = Cli::try_parse_from(["verify", "-i", "claim.json"]);
        assert!(result.is_err());

        let parsed =
            Cli::try_parse_from(["verify", "-i", "claim.json", "--root-file", "root.txt"]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_run_with_root_file() {
        let dir = tempfile::tempdir().unwrap();
        let (claim, root) = claim();
        let claim_path = dir.path().join("claim.json");
        fs::write(&claim_path, serde_json::to_string(&claim).unwrap()).unwrap();
        let root_path = dir.path().join("root.txt");
        fs::write(&root_path, format!("{}\n", hex_encode(root))).unwrap();

        assert!(run(&cli(claim_path, None, Some(root_path))).is_ok());
    }

    #[test]
    fn test_run_ignores_root_inside_claim() {
        let dir = tempfile::tempdir().unwrap();
        let (mut forged, published_root) = claim();
        let record = "0xnot-on-any-list";
        forged.record = record.to_string();
        forged.merkle_proof = MerkleProof::default();
        forged.merkle_root = hex_encode(hash_leaf(record.as_bytes()));
        let path = dir.path().join("claim.json");
        fs::write(&path, serde_json::to_string(&forged).unwrap()).unwrap();

        let published = hex_encode(published_root);
        assert!(run(&cli(path, Some(published), None)).is_err());
    }
}
