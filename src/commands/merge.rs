//! # Merge Command Implementation
//!
//! Runs the full reconciliation: scan the working directory, align, merge
//! every group into its `_merged.json` aggregate, rebuild the corpus from all
//! aggregates and write both atomically. The coverage report is printed at
//! the end.
//!
//! ## Archival
//!
//! With `--archive` (or `archive.enabled` in the configuration) the merged
//! fragments are moved to the backup directories afterwards. Archival is
//! refused when the report detected loss; in that case the command fails
//! after writing, leaving every fragment in place.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use corpus_reconcile::config::CorpusConfig;
use corpus_reconcile::output::{emoji, OutputConfig};
use corpus_reconcile::phases::orchestrator::{self, MergeOptions};

use super::{print_report, spinner};

/// Merge fragments and rebuild the corpus
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Show what would be written without touching any file
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Move merged fragments to the backup directories after a clean run
    #[arg(long, conflicts_with = "dry_run")]
    pub archive: bool,

    /// Prior corpus file; themes that shrank against it count as loss
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,
}

pub fn execute(args: MergeArgs, config: &CorpusConfig, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let options = MergeOptions {
        dry_run: args.dry_run,
        archive: args.archive || (config.archive.enabled && !args.dry_run),
        snapshot: args.snapshot,
    };

    println!(
        "{} Merging fragments from {}",
        emoji(&out, "🔄", "[MERGE]"),
        config.parts_path().display()
    );
    let pb = spinner(&out, "Reconciling fragments")?;
    let result = orchestrator::execute_merge(config, &options);
    pb.finish_and_clear();
    let outcome = result.map_err(|e| anyhow::anyhow!("Merge failed: {}", e))?;

    if let Some(reconciliation) = &outcome.reconciliation {
        for group in &reconciliation.merging.groups {
            println!(
                "   {} {} ({} publications)",
                emoji(&out, "📄", "-"),
                group.file_name(),
                group.doc.publications.len()
            );
        }
    }

    if options.dry_run {
        println!(
            "\n{} Dry run: would write {} file(s)",
            emoji(&out, "🔎", "[DRY-RUN]"),
            outcome.staged.len()
        );
        for path in outcome.staged.list_files() {
            println!("   {}", path.display());
        }
    } else {
        println!(
            "\n{} Wrote {} file(s), corpus at {}",
            emoji(&out, "✅", "[OK]"),
            outcome.written.len(),
            config.corpus_path().display()
        );
    }

    print_report(&out, &outcome.report);

    if let Some(moves) = &outcome.archive {
        println!(
            "\n{} Archived {} fragment(s)",
            emoji(&out, "📦", "[ARCHIVE]"),
            moves.moved.len()
        );
        for (group, reason) in &moves.skipped {
            println!("   kept {}: {}", group, reason);
        }
        for (planned, reason) in &moves.failed {
            println!(
                "   {} {}: {}",
                emoji(&out, "❌", "[ERR]"),
                planned.from.display(),
                reason
            );
        }
    }

    if let Some(reason) = &outcome.archive_blocked {
        println!(
            "\n{} Archival blocked: {}",
            emoji(&out, "🛑", "[BLOCKED]"),
            reason
        );
        return Err(anyhow::anyhow!("Archival blocked: {}", reason));
    }
    Ok(())
}
