//! Orchestrator for complete runs
//!
//! This module coordinates the phases into the operations the CLI exposes:
//! a full merge run, a rebuild of the corpus from existing aggregates, and a
//! read-only audit.

use std::path::PathBuf;

use log::info;

use super::alignment::{self, Alignment};
use super::archive::{self, MoveOutcome};
use super::building;
use super::discovery::{self, FragmentGroup, LoadedFragment};
use super::merging::{self, Merging};
use super::write;
use crate::audit::{Auditor, CoverageReport};
use crate::config::CorpusConfig;
use crate::error::{Error, Result};
use crate::filesystem::MemoryFS;
use crate::model::Corpus;

/// Matcher, merger and tree builder applied to loaded fragments, in memory.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub alignment: Alignment,
    pub merging: Merging,
    /// Tree of the groups merged in this run only.
    pub tree: Corpus,
}

/// Runs phases 2 to 4 over loaded groups. Reads the aggregates earlier
/// runs left in the base directory and writes nothing.
pub fn reconcile(
    config: &CorpusConfig,
    groups: &[FragmentGroup<LoadedFragment>],
) -> Result<Reconciliation> {
    let alignment = alignment::execute(config, groups);
    let merging = merging::execute(config, groups, &alignment)?;
    let tree = building::build(&config.volume_names, merging.records());
    Ok(Reconciliation {
        alignment,
        merging,
        tree,
    })
}

/// Options of a merge run.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Stage everything but write nothing.
    pub dry_run: bool,
    /// Move merged fragments to the backup directories afterwards.
    pub archive: bool,
    /// Prior corpus to compare per-theme counts against.
    pub snapshot: Option<PathBuf>,
}

/// Everything a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub reconciliation: Option<Reconciliation>,
    pub corpus: Corpus,
    pub aggregates: Vec<String>,
    pub report: CoverageReport,
    pub staged: MemoryFS,
    pub written: Vec<PathBuf>,
    pub archive: Option<MoveOutcome>,
    pub archive_blocked: Option<String>,
}

/// Full run: discover, align, merge, rebuild, audit, write and optionally
/// archive.
pub fn execute_merge(config: &CorpusConfig, options: &MergeOptions) -> Result<RunOutcome> {
    let mut auditor = Auditor::new();
    let mut staged = MemoryFS::new();

    // Phase 1: Discovery
    let loaded = discovery::execute(config)?.load();
    auditor.record_issues(loaded.issues.iter().cloned());

    // Phases 2-4: Alignment, Merging, Tree Building
    let reconciliation = reconcile(config, &loaded.groups)?;
    auditor.after_matching(&loaded.groups, &reconciliation.alignment, config.orphans);
    auditor.carried_forward(reconciliation.merging.carried_publications());
    auditor.record_issues(reconciliation.alignment.issues.iter().cloned());
    auditor.record_issues(reconciliation.merging.issues.iter().cloned());
    auditor.after_building(&reconciliation.tree);
    merging::stage(&reconciliation.merging, &mut staged)?;

    let mut outcome = finish_rebuild(config, auditor, staged, options)?;
    outcome.reconciliation = Some(reconciliation);

    if !options.dry_run {
        outcome.written = write::execute(&outcome.staged, &config.base_dir)?;
        info!("Wrote {} files", outcome.written.len());
    }

    if options.archive && !options.dry_run {
        if let Some(reconciliation) = &outcome.reconciliation {
            match archive::execute(config, &reconciliation.merging, &outcome.report) {
                Ok(moves) => outcome.archive = Some(moves),
                Err(Error::ArchiveBlocked { reason }) => outcome.archive_blocked = Some(reason),
                Err(e) => return Err(e),
            }
        }
    }

    Ok(outcome)
}

/// Rebuilds the corpus from the aggregates already in the base directory.
pub fn execute_rebuild(config: &CorpusConfig, options: &MergeOptions) -> Result<RunOutcome> {
    let mut outcome = finish_rebuild(config, Auditor::new(), MemoryFS::new(), options)?;
    if !options.dry_run {
        outcome.written = write::execute(&outcome.staged, &config.base_dir)?;
    }
    Ok(outcome)
}

/// Read-only audit: a dry merge run when the working directory exists,
/// otherwise a dry rebuild.
pub fn execute_audit(config: &CorpusConfig, snapshot: Option<PathBuf>) -> Result<RunOutcome> {
    let options = MergeOptions {
        dry_run: true,
        archive: false,
        snapshot,
    };
    if config.parts_path().is_dir() {
        execute_merge(config, &options)
    } else {
        execute_rebuild(config, &options)
    }
}

fn finish_rebuild(
    config: &CorpusConfig,
    mut auditor: Auditor,
    mut staged: MemoryFS,
    options: &MergeOptions,
) -> Result<RunOutcome> {
    let rebuilt = building::execute(config, &staged)?;
    auditor.record_issues(rebuilt.issues.iter().cloned());
    auditor.after_rebuild(rebuilt.aggregate_publications, &rebuilt.corpus);

    if let Some(snapshot) = &options.snapshot {
        let prior = Corpus::from_path(snapshot)?;
        auditor.against_snapshot(&prior, &rebuilt.corpus);
    }

    building::stage(config, &rebuilt.corpus, &mut staged)?;

    Ok(RunOutcome {
        corpus: rebuilt.corpus,
        aggregates: rebuilt.aggregates,
        report: auditor.finish(),
        staged,
        ..Default::default()
    })
}
