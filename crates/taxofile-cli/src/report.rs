//! Human-readable ranking and verdict output.

use colored::Colorize;
use taxofile_core::{RankedCandidate, Verdict};

fn display_path(candidate: &RankedCandidate) -> String {
    let existing = if candidate.path.is_empty() {
        "/".to_string()
    } else {
        candidate.path.join("/")
    };
    if candidate.is_new_segment {
        format!("{existing} + {} (new)", candidate.new_path.join("/"))
    } else {
        existing
    }
}

pub fn print_ranking<'a>(
    ranked: impl Iterator<Item = &'a RankedCandidate>,
    verdict: &Verdict,
    sample_count: usize,
) {
    for (i, candidate) in ranked.enumerate() {
        let line = format!(
            "{:>2}. {:<48} {:>6.1}%  ({}/{} samples)",
            i + 1,
            display_path(candidate),
            candidate.normalized_confidence,
            candidate.occurrence_count,
            sample_count
        );
        if i == 0 {
            println!("{}", line.bold());
        } else {
            println!("{line}");
        }
    }

    println!();
    if verdict.is_dominant {
        println!("{} top choice is dominant", "auto".green().bold());
    } else {
        println!("{} confirm before acting", "review".yellow().bold());
        for reason in &verdict.reasons {
            println!("  {} {}", "→".yellow(), reason.describe());
        }
    }
}
