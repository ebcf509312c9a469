//! peddi-tooling - which PRs are in branch A but missing from branch B?
//!
//! Wraps `git` subprocess calls and the GitHub GraphQL API to diff the merged
//! PRs of two branches, plus filtered views into GitHub Projects boards.

mod commands;
mod render;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{PrsArgs, ProjectsArgs};

/// Tooling for Peddi git tasks
#[derive(Parser, Debug)]
#[command(name = "peddi-tooling")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List PRs merged into branchA that are not yet in branchB
    Prs(PrsArgs),

    /// List and filter issues/cards from GitHub Projects
    Projects(ProjectsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Prs(args) => args.execute().await?,
        Commands::Projects(args) => args.execute().await?,
    }

    Ok(())
}
