#![forbid(unsafe_code)]
#![allow(unreachable_pub)]

use clap::{ArgAction, Parser, Subcommand};

use allowlist_cli::logging::{self, LogLevel};

mod build_tree;
mod claim;
mod verify_claim;

#[derive(Parser, Debug)]
#[command(name = "allowlist")]
#[command(about = "Merkle allow-list tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease log verbosity (-q warn, -qq error)
    #[arg(short, long, action = ArgAction::Count, global = true, conflicts_with = "verbose")]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    BuildTree(build_tree::Cli),
    Claim(claim::Cli),
    Verify(verify_claim::Cli),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(err) = logging::try_init(LogLevel::from_flags(cli.verbose, cli.quiet)) {
        eprintln!("Failed to initialize logging: {err}");
    }

    match cli.command {
        Commands::BuildTree(args) => build_tree::run(args)?,
        Commands::Claim(args) => claim::run(args)?,
        Commands::Verify(args) => verify_claim::run(&args)?,
    }

    Ok(())
}
