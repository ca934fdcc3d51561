use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use allowlist_cli::{hex_encode, load_records, parse_hash, write_file_atomic, Allowlist, Claim};

use crate::build_tree::TreeArgs;

#[derive(Parser, Debug)]
#[command(name = "claim")]
#[command(about = "Generate the membership proof for one address", long_about = None)]
pub struct Cli {
    /// Input file containing addresses (one per line)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Address to prove, exactly as it appears in the input file
    #[arg(short = 'a', long)]
    pub record: String,

    /// Output JSON file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Expected Merkle root (hex format); the claim is refused on mismatch
    #[arg(short, long)]
    pub root: Option<String>,

    #[command(flatten)]
    pub tree: TreeArgs,
}

fn check_expected_root(expected: Option<&str>, allowlist: &Allowlist) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let expected = parse_hash(expected).context("Invalid Merkle root")?;
    if expected != allowlist.root() {
        anyhow::bail!(
            "Merkle root mismatch: expected {}, input file produces {}",
            hex_encode(expected),
            hex_encode(allowlist.root())
        );
    }
    Ok(())
}

pub fn run(cli: Cli) -> Result<()> {
    println!("Reading addresses from {:?}...", cli.input);
    let records = load_records(&cli.input)?;

    println!("Building Merkle tree...");
    let allowlist = Allowlist::from_records(records, cli.tree.pipeline_options())
        .context("Failed to build Merkle tree")?;
    check_expected_root(cli.root.as_deref(), &allowlist)?;

    println!("Generating Merkle proof...");
    let claim: Claim = allowlist
        .claim(&cli.record)
        .context("Address not found in allow-list")?;
    debug!(leaf = %claim.leaf, leaf_index = claim.leaf_index, "claim generated");

    println!("Writing claim JSON to {:?}...", cli.output);
    let json_output = serde_json::to_string_pretty(&claim).context("Failed to serialize JSON")?;
    write_file_atomic(&cli.output, &json_output).context("Failed to write claim file")?;

    println!("\nClaim generated successfully!");
    println!("Merkle root: {}", claim.merkle_root);
    println!("Leaf: {}", claim.leaf);
    println!("Proof length: {} nodes", claim.merkle_proof.len());

    Ok(())
}
