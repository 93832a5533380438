//! Taxofile CLI
//!
//! Command-line interface for:
//! - Generating a taxonomy (`hierarchy.json`) from an existing folder tree
//! - Classifying a document into that taxonomy with repeated LLM sampling
//! - Re-evaluating recorded samples offline (audits, threshold tuning)
//!
//! Nothing here moves files or creates folders; the output says where an
//! item should go and whether that answer is safe to act on unattended.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod classify;
mod excerpt;
mod hierarchy;
mod report;

pub(crate) const TAXOFILE_LOG_ENV: &str = "TAXOFILE_LOG";

#[derive(Parser)]
#[command(name = "taxofile")]
#[command(
    author,
    version,
    about = "Taxofile: file documents into a folder taxonomy by multi-sample LLM consensus"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a folder tree and write it as a taxonomy JSON file.
    Hierarchy(hierarchy::HierarchyArgs),

    /// Classify a document into a taxonomy.
    ///
    /// The oracle is sampled several times; the merged ranking is reported
    /// together with a verdict on whether it is safe to act on without review.
    Classify(classify::ClassifyArgs),

    /// Re-run aggregation and the dominance decision over recorded samples.
    ///
    /// Accepts a saved classification result (`classify --out`) or a bare
    /// JSON array of samples.
    Decide(classify::DecideArgs),
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(TAXOFILE_LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Hierarchy(args) => hierarchy::run(args),
        Commands::Classify(args) => classify::run_classify(args),
        Commands::Decide(args) => classify::run_decide(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_hierarchy_args() {
        let cli = Cli::try_parse_from([
            "taxofile",
            "hierarchy",
            "/tmp/docs",
            "--max-depth",
            "2",
            "--stop",
            "Projects/big-repo",
            "--stop",
            "Archive",
        ])
        .unwrap();
        let Commands::Hierarchy(args) = cli.command else {
            panic!("expected hierarchy command");
        };
        assert_eq!(args.root, PathBuf::from("/tmp/docs"));
        assert_eq!(args.max_depth, Some(2));
        assert_eq!(args.stop.len(), 2);
        assert_eq!(args.out, PathBuf::from("hierarchy.json"));
    }
}
