//! # Prune Command Implementation
//!
//! Deletes `_merged.json` aggregates in which not a single publication has
//! translated content. Such aggregates come from groups merged before any
//! translation existed and only inflate the corpus.

use anyhow::Result;
use clap::Args;

use corpus_reconcile::config::CorpusConfig;
use corpus_reconcile::output::{emoji, OutputConfig};
use corpus_reconcile::phases::archive;

/// Delete aggregates without any translation
#[derive(Args, Debug)]
pub struct PruneArgs {
    /// List the aggregates without deleting them
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

pub fn execute(args: PruneArgs, config: &CorpusConfig, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let removed = archive::prune(config, args.dry_run)
        .map_err(|e| anyhow::anyhow!("Prune failed: {}", e))?;

    if removed.is_empty() {
        println!(
            "{} Every aggregate has translated content",
            emoji(&out, "✅", "[OK]")
        );
        return Ok(());
    }

    let verb = if args.dry_run { "Would remove" } else { "Removed" };
    for path in &removed {
        println!("{} {} {}", emoji(&out, "🗑️", "[DEL]"), verb, path.display());
    }
    println!("\n{} {} aggregate(s)", verb, removed.len());
    Ok(())
}
