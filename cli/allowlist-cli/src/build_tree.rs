use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::error;

use allowlist_cli::{
    hex_encode, load_records, write_file_atomic, Allowlist, LeafEncoding, OddNodePolicy,
    PipelineOptions, ReportWriter, TreeOptions, WriteMode,
};

/// Options that change the shape of the tree, shared by every subcommand that
/// builds one.
#[derive(clap::Args, Debug, Clone)]
pub struct TreeArgs {
    /// How a trailing unpaired node is carried to the next level
    #[arg(long, value_enum, default_value_t = OddNodePolicy::Promote)]
    pub odd_node: OddNodePolicy,

    /// Sort leaves before building so the root ignores input order
    #[arg(long)]
    pub sort_leaves: bool,

    /// How each record is turned into bytes before hashing
    #[arg(long, value_enum, default_value_t = LeafEncoding::Utf8)]
    pub leaf_encoding: LeafEncoding,
}

impl TreeArgs {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            encoding: self.leaf_encoding,
            tree: TreeOptions {
                odd_node: self.odd_node,
                sort_leaves: self.sort_leaves,
            },
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "build-tree")]
#[command(about = "Build the Merkle tree and a proof report for every record", long_about = None)]
pub struct Cli {
    /// Input file containing addresses (one per line)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file for the text proof report
    #[arg(short, long, default_value = "merkletree.dat")]
    pub report: PathBuf,

    /// Append to the report instead of replacing it
    #[arg(long)]
    pub append: bool,

    /// Output file for the report as JSON
    #[arg(short, long)]
    pub json: Option<PathBuf>,

    /// Output file for the Merkle root
    #[arg(long)]
    pub root_output: Option<PathBuf>,

    #[command(flatten)]
    pub tree: TreeArgs,
}

pub fn run(cli: Cli) -> Result<()> {
    println!("Reading addresses from {:?}...", cli.input);
    let records = load_records(&cli.input)?;
    println!("Total addresses: {}", records.len());

    println!("Building Merkle tree...");
    let allowlist = Allowlist::from_records(records, cli.tree.pipeline_options())
        .context("Failed to build Merkle tree")?;

    let root = hex_encode(allowlist.root());
    println!("Merkle root: {root}");

    if let Some(root_path) = &cli.root_output {
        write_file_atomic(root_path, &format!("{root}\n")).context("Failed to write root")?;
    }

    println!("Generating proofs...");
    let report = allowlist.report();
    println!(
        "Verified {}/{} proofs",
        report.verified_count(),
        report.entries.len()
    );

    // A failed report write is logged, not fatal: the root is already published.
    let mode = if cli.append {
        WriteMode::Append
    } else {
        WriteMode::Truncate
    };
    let writer = ReportWriter::new(&cli.report, mode);
    match writer.write(&report) {
        Ok(()) => println!("Report written to {:?}", writer.path()),
        Err(err) => error!(error = %err, "There was an error writing the report"),
    }

    if let Some(json_path) = &cli.json {
        match ReportWriter::write_json(json_path, &report) {
            Ok(()) => println!("JSON report written to {:?}", json_path),
            Err(err) => error!(error = %err, "There was an error writing the JSON report"),
        }
    }

    println!("Done!");
    Ok(())
}
