//! # Align Command Implementation
//!
//! Matches every translated fragment with an original and reports those
//! whose part number disagrees with the part they matched. Each report
//! carries a suggested rename.
//!
//! Nothing is renamed unless `--apply` is given, and even then only after a
//! confirmation prompt (skipped with `--yes`). Renames never overwrite an
//! existing file.

use anyhow::Result;
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm};

use corpus_reconcile::config::{AlignMode, CorpusConfig};
use corpus_reconcile::output::{emoji, OutputConfig};
use corpus_reconcile::phases::{alignment, apply_renames, discovery};

/// Detect renumbered translations
#[derive(Args, Debug)]
pub struct AlignArgs {
    /// Match by publication titles only, ignoring equal part numbers
    #[arg(long)]
    pub by_titles: bool,

    /// Rename misaligned translations to their suggested names
    #[arg(long)]
    pub apply: bool,

    /// Do not ask for confirmation before renaming
    #[arg(short, long, requires = "apply")]
    pub yes: bool,
}

pub fn execute(args: AlignArgs, config: &CorpusConfig, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let mut config = config.clone();
    if args.by_titles {
        config.align_mode = AlignMode::TitlesOnly;
    }

    let parts = config.parts_path();
    println!(
        "{} Aligning fragments in {}",
        emoji(&out, "🔍", "[SCAN]"),
        parts.display()
    );
    let loaded = discovery::execute(&config)
        .map_err(|e| anyhow::anyhow!("Failed to scan {}: {}", parts.display(), e))?
        .load();
    let aligned = alignment::execute(&config, &loaded.groups);

    for group in &aligned.groups {
        for &orphan in &group.orphans {
            if let Some(g) = loaded.groups.iter().find(|g| g.key == group.key) {
                println!(
                    "{} No original found for {}",
                    emoji(&out, "⚠️", "[WARN]"),
                    g.translated[orphan].fragment.name
                );
            }
        }
    }

    let misaligned: Vec<_> = aligned.misalignments().collect();
    if misaligned.is_empty() {
        println!("{} All translations are aligned", emoji(&out, "✅", "[OK]"));
        return Ok(());
    }

    println!(
        "\n{} {} misaligned translation(s):",
        emoji(&out, "🔀", "[MISALIGNED]"),
        misaligned.len()
    );
    for m in &misaligned {
        println!(
            "   {} matches {} -> suggested {}",
            m.translated_name(),
            m.matched,
            m.suggested_name()
        );
    }

    if !args.apply {
        println!(
            "\n{} Run with --apply to rename them",
            emoji(&out, "💡", "[TIP]")
        );
        return Ok(());
    }

    if !args.yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Rename {} file(s)?", misaligned.len()))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Rename cancelled.");
            return Ok(());
        }
    }

    let outcome = apply_renames(misaligned);
    for (from, to) in &outcome.renamed {
        println!(
            "{} {} -> {}",
            emoji(&out, "✅", "[OK]"),
            from.display(),
            to.display()
        );
    }
    for (from, to, reason) in &outcome.refused {
        println!(
            "{} {} -> {}: {}",
            emoji(&out, "❌", "[ERR]"),
            from.display(),
            to.display(),
            reason
        );
    }
    if !outcome.refused.is_empty() {
        return Err(anyhow::anyhow!(
            "{} rename(s) refused",
            outcome.refused.len()
        ));
    }
    Ok(())
}
