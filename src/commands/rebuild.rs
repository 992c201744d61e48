//! # Rebuild Command Implementation
//!
//! Rebuilds the corpus file from the `_merged.json` aggregates already in the
//! base directory, without looking at the working fragments. The aggregates
//! are the authoritative record set; the corpus is discarded and rebuilt, never
//! patched.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use corpus_reconcile::config::CorpusConfig;
use corpus_reconcile::output::{emoji, OutputConfig};
use corpus_reconcile::phases::orchestrator::{self, MergeOptions};
use corpus_reconcile::visit;

use super::{print_report, spinner};

/// Rebuild the corpus from existing aggregates
#[derive(Args, Debug)]
pub struct RebuildArgs {
    /// Build the corpus in memory without writing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Prior corpus file; themes that shrank against it count as loss
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,
}

pub fn execute(args: RebuildArgs, config: &CorpusConfig, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let options = MergeOptions {
        dry_run: args.dry_run,
        archive: false,
        snapshot: args.snapshot,
    };

    let pb = spinner(&out, "Rebuilding corpus")?;
    let result = orchestrator::execute_rebuild(config, &options);
    pb.finish_and_clear();
    let outcome = result.map_err(|e| anyhow::anyhow!("Rebuild failed: {}", e))?;

    let counts = visit::count(&outcome.corpus);
    println!(
        "{} Rebuilt from {} aggregate(s): {} volumes, {} themes, {} title groups, {} publications",
        emoji(&out, "🌳", "[TREE]"),
        outcome.aggregates.len(),
        counts.volumes,
        counts.themes,
        counts.title_groups,
        counts.publications
    );
    if args.dry_run {
        println!(
            "{} Dry run: {} not written",
            emoji(&out, "🔎", "[DRY-RUN]"),
            config.corpus_path().display()
        );
    } else {
        println!(
            "{} Wrote {}",
            emoji(&out, "✅", "[OK]"),
            config.corpus_path().display()
        );
    }

    print_report(&out, &outcome.report);
    Ok(())
}
