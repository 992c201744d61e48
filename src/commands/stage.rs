//! # Stage Command Implementation
//!
//! Translators hand back files named `X copy.json`. Staging renames each of
//! them to `X_pt.json` in the working directory so the catalog recognises it
//! as a translated fragment. An existing `X_pt.json` is never replaced; the
//! copy is left in place and reported instead.

use anyhow::Result;
use clap::Args;

use corpus_reconcile::config::CorpusConfig;
use corpus_reconcile::output::{emoji, OutputConfig};
use corpus_reconcile::phases::archive;

/// Stage translator copies as translated fragments
#[derive(Args, Debug)]
pub struct StageArgs {
    /// List the renames without performing them
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

pub fn execute(args: StageArgs, config: &CorpusConfig, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let parts = config.parts_path();
    let outcome = archive::stage_copies(&parts, args.dry_run)
        .map_err(|e| anyhow::anyhow!("Failed to stage copies in {}: {}", parts.display(), e))?;

    if outcome.moved.is_empty() && outcome.failed.is_empty() {
        println!("{} No copies to stage", emoji(&out, "📭", "[EMPTY]"));
        return Ok(());
    }

    let verb = if args.dry_run { "Would stage" } else { "Staged" };
    for planned in &outcome.moved {
        println!(
            "{} {} {} -> {}",
            emoji(&out, "✅", "[OK]"),
            verb,
            planned.from.display(),
            planned.to.display()
        );
    }
    for (planned, reason) in &outcome.failed {
        println!(
            "{} {}: {}",
            emoji(&out, "❌", "[ERR]"),
            planned.from.display(),
            reason
        );
    }
    if !outcome.failed.is_empty() {
        return Err(anyhow::anyhow!(
            "{} copy(ies) could not be staged",
            outcome.failed.len()
        ));
    }
    Ok(())
}
