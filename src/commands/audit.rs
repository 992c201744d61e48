//! # Audit Command Implementation
//!
//! Produces the coverage report without writing anything. When the working
//! directory exists the audit covers a full dry merge; otherwise it covers a
//! dry rebuild from the aggregates. A prior corpus can be given as a
//! snapshot to detect themes that lost publications.
//!
//! The report is advisory. `--strict` turns detected loss into a failing exit
//! status, for use in scripts.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use corpus_reconcile::audit::IssueKind;
use corpus_reconcile::config::CorpusConfig;
use corpus_reconcile::output::{emoji, OutputConfig};
use corpus_reconcile::phases::orchestrator;

use super::{print_report, spinner};

/// Report coverage without writing
#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Prior corpus file to compare per-theme counts against
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Fail when loss is detected
    #[arg(long)]
    pub strict: bool,
}

pub fn execute(args: AuditArgs, config: &CorpusConfig, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!(
        "{} Auditing {}",
        emoji(&out, "🔍", "[SCAN]"),
        config.base_dir.display()
    );

    let pb = spinner(&out, "Auditing")?;
    let result = orchestrator::execute_audit(config, args.snapshot);
    pb.finish_and_clear();
    let outcome = result.map_err(|e| anyhow::anyhow!("Audit failed: {}", e))?;

    print_report(&out, &outcome.report);

    println!("\n{} Audit Result:", emoji(&out, "🎯", "[RESULT]"));
    if outcome.report.loss_detected() {
        println!(
            "{} Loss detected in {} place(s); archival would be refused",
            emoji(&out, "❌", "[ERR]"),
            outcome.report.count(IssueKind::LossDetected)
        );
        if args.strict {
            return Err(anyhow::anyhow!("Audit failed: loss detected"));
        }
    } else {
        println!("{} No loss detected", emoji(&out, "✅", "[OK]"));
    }
    Ok(())
}
