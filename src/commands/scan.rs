//! # Scan Command Implementation
//!
//! Lists the fragments of the working directory grouped by their key, with
//! the number of original, translated and already-merged parts in each
//! group. Names that do not follow the fragment convention are reported.
//!
//! This command is read-only.

use anyhow::Result;
use clap::Args;

use corpus_reconcile::config::CorpusConfig;
use corpus_reconcile::output::{emoji, heading, OutputConfig};
use corpus_reconcile::phases::discovery;

/// List fragments grouped by key
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Also list every fragment file of each group
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn execute(args: ScanArgs, config: &CorpusConfig, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let parts = config.parts_path();
    println!("{} Scanning {}", emoji(&out, "🔍", "[SCAN]"), parts.display());

    let catalog = discovery::execute(config)
        .map_err(|e| anyhow::anyhow!("Failed to scan {}: {}", parts.display(), e))?;

    if catalog.groups.is_empty() {
        println!("{} No fragments found", emoji(&out, "📭", "[EMPTY]"));
    }

    for group in catalog.groups.values() {
        println!(
            "\n{} {}",
            emoji(&out, "📁", "[GROUP]"),
            heading(&out, &group.key)
        );
        println!(
            "   originals: {}, translated: {}, merged: {}",
            group.originals.len(),
            group.translated.len(),
            group.merged.len()
        );
        if args.verbose {
            for fragment in group
                .originals
                .iter()
                .chain(&group.translated)
                .chain(&group.merged)
            {
                println!("      {}", fragment.name);
            }
        }
    }

    println!(
        "\n{} {} fragments in {} groups",
        emoji(&out, "📊", "[INFO]"),
        catalog.fragment_count(),
        catalog.groups.len()
    );

    if !catalog.issues.is_empty() {
        println!(
            "\n{} {} file(s) skipped:",
            emoji(&out, "⚠️", "[WARN]"),
            catalog.issues.len()
        );
        for issue in &catalog.issues {
            println!("   {}: {}", issue.kind, issue);
        }
    }
    Ok(())
}
