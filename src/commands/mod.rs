//! # CLI Command Implementations
//!
//! One file per subcommand of `corpus-reconcile`. Each module holds an `Args`
//! struct derived with `clap` and an `execute` function that receives the
//! resolved [`CorpusConfig`](corpus_reconcile::config::CorpusConfig) and the
//! global `--color` value, then calls into the `corpus_reconcile` library.
//!
//! Report printing shared by `merge`, `rebuild` and `audit` lives here.

pub mod align;
pub mod audit;
pub mod completions;
pub mod merge;
pub mod prune;
pub mod rebuild;
pub mod scan;
pub mod stage;
pub mod tree;

use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use corpus_reconcile::audit::CoverageReport;
use corpus_reconcile::output::{alarming, emoji, heading, OutputConfig};

/// Affected names listed per issue kind before eliding the rest.
const AFFECTED_SHOWN: usize = 10;

/// Spinner shown on stderr while a run is in progress; hidden without color.
pub fn spinner(out: &OutputConfig, message: &str) -> Result<ProgressBar> {
    if !out.use_color {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Prints the coverage report: counts, stage boundaries, then every issue
/// kind with its count and affected fragments.
pub fn print_report(out: &OutputConfig, report: &CoverageReport) {
    println!("\n{} {}", emoji(out, "📊", "[INFO]"), heading(out, "Coverage"));
    println!("   Fragments processed: {}", report.fragments_processed);
    println!(
        "   Translated fragments without original: {}",
        alarming(out, report.fragments_unmatched)
    );
    println!("   Originals without translation: {}", report.originals_ignored);
    println!(
        "   Untranslated publications in matched pairs: {}",
        report.untranslated_in_pairs
    );
    println!("   Publications merged: {}", report.publications_merged);
    if report.publications_carried > 0 {
        println!(
            "   Publications kept from earlier runs: {}",
            report.publications_carried
        );
    }
    println!(
        "   Publications without original content: {}",
        alarming(out, report.publications_without_original)
    );
    println!(
        "   Publications without translated content: {}",
        report.publications_without_translation
    );

    for boundary in &report.boundaries {
        let marker = if boundary.delta() == 0 {
            emoji(out, "✅", "[OK]")
        } else {
            emoji(out, "❌", "[ERR]")
        };
        println!(
            "   {} {}: {} -> {}",
            marker, boundary.stage, boundary.before, boundary.after
        );
    }

    let grouped = report.by_kind();
    if grouped.is_empty() {
        println!("\n{} No issues", emoji(out, "✅", "[OK]"));
        return;
    }

    println!("\n{} {}", emoji(out, "⚠️", "[WARN]"), heading(out, "Issues"));
    for (kind, issues) in grouped {
        let affected = report.affected(kind);
        println!(
            "   {}: {} ({} affected)",
            kind,
            alarming(out, issues.len()),
            affected.len()
        );
        for issue in issues.iter().take(AFFECTED_SHOWN) {
            println!("      - {}", issue);
        }
        if issues.len() > AFFECTED_SHOWN {
            println!("      ... and {} more", issues.len() - AFFECTED_SHOWN);
        }
    }
}
