//! `taxofile hierarchy`: build a taxonomy from a real folder tree.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use taxofile_core::{scan_directory, ScanOptions};

#[derive(Args, Debug)]
pub struct HierarchyArgs {
    /// Folder to scan
    pub root: PathBuf,
    /// Output taxonomy JSON
    #[arg(short, long, default_value = "hierarchy.json")]
    pub out: PathBuf,
    /// Maximum folder depth below the root (default: unlimited)
    #[arg(long)]
    pub max_depth: Option<usize>,
    /// Folder to list but not descend into (repeatable; relative to the root or absolute)
    #[arg(long, value_name = "PATH")]
    pub stop: Vec<PathBuf>,
    /// Include folders whose name starts with `.`
    #[arg(long)]
    pub include_hidden: bool,
}

pub fn run(args: HierarchyArgs) -> Result<()> {
    let options = ScanOptions {
        max_depth: args.max_depth,
        stop_paths: args.stop.into_iter().collect(),
        include_hidden: args.include_hidden,
    };

    println!("{} {}", "Scanning".green().bold(), args.root.display());
    let tree = scan_directory(&args.root, &options)
        .with_context(|| format!("failed to scan {}", args.root.display()))?;
    tree.save(&args.out)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    println!(
        "{} {} ({} folders, {} leaves, depth {})",
        "wrote".green().bold(),
        args.out.display().to_string().bold(),
        tree.len(),
        tree.leaf_count(),
        tree.depth()
    );
    Ok(())
}
