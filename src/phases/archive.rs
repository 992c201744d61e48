//! Phase 6: Directory Bookkeeping
//!
//! Every move the tool makes on fragment files lives here: staging the
//! translator's raw copies, archiving merged fragments, and pruning
//! aggregates that never received a translation. None of them overwrite an
//! existing file.
//!
//! Archival is the one irreversible step of a run. It is refused outright
//! when the coverage report detected loss, and it skips every group that
//! still has orphaned translations or publications without an original.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::building::aggregate_paths;
use super::merging::Merging;
use crate::audit::CoverageReport;
use crate::config::CorpusConfig;
use crate::error::{Error, Result};
use crate::model::FragmentDoc;

/// Renames `from` to `to`, refusing to replace an existing file.
pub fn move_no_clobber(from: &Path, to: &Path) -> Result<()> {
    let rename_error = |message: String| Error::Rename {
        src: from.display().to_string(),
        dst: to.display().to_string(),
        message,
    };
    if to.exists() {
        return Err(rename_error("destination exists".to_string()));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| rename_error(e.to_string()))?;
    }
    fs::rename(from, to).map_err(|e| rename_error(e.to_string()))
}

/// A planned or completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// What a bookkeeping step did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    pub moved: Vec<Move>,
    pub failed: Vec<(Move, String)>,
    /// Groups left in place, with the reason.
    pub skipped: Vec<(String, String)>,
}

impl MoveOutcome {
    fn apply(&mut self, planned: Move, dry_run: bool) {
        if dry_run {
            self.moved.push(planned);
            return;
        }
        match move_no_clobber(&planned.from, &planned.to) {
            Ok(()) => {
                info!("Moved {} -> {}", planned.from.display(), planned.to.display());
                self.moved.push(planned);
            }
            Err(e) => {
                warn!("{}", e);
                self.failed.push((planned, e.to_string()));
            }
        }
    }
}

/// Stages translator copies: `X copy.json` becomes `X_pt.json`.
pub fn stage_copies(dir: &Path, dry_run: bool) -> Result<MoveOutcome> {
    let mut outcome = MoveOutcome::default();
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    for from in entries {
        let Some(name) = from.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(stem) = name.strip_suffix(" copy.json") else {
            continue;
        };
        let to = from.with_file_name(format!("{}_pt.json", stem));
        outcome.apply(Move { from, to }, dry_run);
    }
    Ok(outcome)
}

/// Plans the archival moves of every archivable group.
pub fn plan(config: &CorpusConfig, merging: &Merging) -> (Vec<Move>, Vec<(String, String)>) {
    let backup = config.backup_path();
    let translations_backup = config.translations_backup_path();
    let mut moves = Vec::new();
    let mut skipped = Vec::new();

    for group in &merging.groups {
        if !group.archivable {
            skipped.push((
                group.key.clone(),
                "orphaned translations or publications without an original".to_string(),
            ));
            continue;
        }
        let target = |dir: &Path, from: &PathBuf| Move {
            from: from.clone(),
            to: dir.join(from.file_name().unwrap_or_default()),
        };
        moves.extend(group.consumed.originals.iter().map(|p| target(&backup, p)));
        moves.extend(group.consumed.merged.iter().map(|p| target(&backup, p)));
        moves.extend(
            group
                .consumed
                .translated
                .iter()
                .map(|p| target(&translations_backup, p)),
        );
    }
    (moves, skipped)
}

/// Executes Phase 6: archive merged fragments once the report allows it.
pub fn execute(config: &CorpusConfig, merging: &Merging, report: &CoverageReport) -> Result<MoveOutcome> {
    report.archive_gate(&config.archive)?;

    let (moves, skipped) = plan(config, merging);
    let mut outcome = MoveOutcome {
        skipped,
        ..Default::default()
    };
    for planned in moves {
        outcome.apply(planned, false);
    }
    info!(
        "Archived {} fragments, {} failed, {} groups kept in place",
        outcome.moved.len(),
        outcome.failed.len(),
        outcome.skipped.len()
    );
    Ok(outcome)
}

/// Aggregates in the base directory without any translated content.
pub fn untranslated_aggregates(config: &CorpusConfig) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for path in aggregate_paths(&config.base_dir)? {
        match FragmentDoc::from_path(&path) {
            Ok(doc) if !doc.publications.iter().any(|p| p.has_target_content()) => found.push(path),
            Ok(_) => {}
            Err(e) => warn!("{}", e),
        }
    }
    Ok(found)
}

/// Deletes aggregates that carry no translated content.
pub fn prune(config: &CorpusConfig, dry_run: bool) -> Result<Vec<PathBuf>> {
    let found = untranslated_aggregates(config)?;
    if !dry_run {
        for path in &found {
            fs::remove_file(path).map_err(|e| Error::Filesystem {
                message: format!("Failed to remove '{}': {}", path.display(), e),
            })?;
            info!("Removed {}", path.display());
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{Issue, IssueKind};
    use crate::model::{to_pretty_json, Publication};
    use crate::phases::merging::{Consumed, MergedGroup};
    use tempfile::TempDir;

    fn merged(key: &str, dir: &Path, archivable: bool) -> MergedGroup {
        let consumed = Consumed {
            originals: vec![dir.join(format!("{}_parte01.json", key))],
            translated: vec![dir.join(format!("{}_parte01_pt.json", key))],
            merged: vec![],
        };
        for path in consumed.originals.iter().chain(&consumed.translated) {
            fs::write(path, "{}").unwrap();
        }
        MergedGroup {
            key: key.to_string(),
            doc: FragmentDoc::default(),
            consumed,
            archivable,
            carried_prior: 0,
        }
    }

    fn setup() -> (TempDir, CorpusConfig) {
        let temp = TempDir::new().unwrap();
        let config = CorpusConfig::with_base_dir(temp.path());
        fs::create_dir_all(config.parts_path()).unwrap();
        (temp, config)
    }

    #[test]
    fn test_move_no_clobber_refuses_existing() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.json");
        let b = temp.path().join("b.json");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();
        let err = move_no_clobber(&a, &b).unwrap_err();
        assert!(err.to_string().contains("destination exists"));
        assert_eq!(fs::read_to_string(&b).unwrap(), "b");
    }

    #[test]
    fn test_stage_copies() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::write(dir.join("g_parte01 copy.json"), "1").unwrap();
        fs::write(dir.join("g_parte02 copy.json"), "2").unwrap();
        fs::write(dir.join("g_parte02_pt.json"), "existing").unwrap();
        fs::write(dir.join("g_parte03.json"), "3").unwrap();

        let outcome = stage_copies(dir, false).unwrap();
        assert_eq!(outcome.moved.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(fs::read_to_string(dir.join("g_parte01_pt.json")).unwrap(), "1");
        assert_eq!(fs::read_to_string(dir.join("g_parte02_pt.json")).unwrap(), "existing");
        assert!(dir.join("g_parte02 copy.json").exists());
    }

    #[test]
    fn test_stage_copies_dry_run_moves_nothing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("g_parte01 copy.json"), "1").unwrap();
        let outcome = stage_copies(temp.path(), true).unwrap();
        assert_eq!(outcome.moved.len(), 1);
        assert!(temp.path().join("g_parte01 copy.json").exists());
    }

    #[test]
    fn test_archive_moves_archivable_groups_only() {
        let (_temp, config) = setup();
        let parts = config.parts_path();
        let merging = Merging {
            groups: vec![merged("ok", &parts, true), merged("held", &parts, false)],
            issues: vec![],
        };

        let outcome = execute(&config, &merging, &CoverageReport::default()).unwrap();
        assert_eq!(outcome.moved.len(), 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert!(config.backup_path().join("ok_parte01.json").exists());
        assert!(config
            .translations_backup_path()
            .join("ok_parte01_pt.json")
            .exists());
        assert!(parts.join("held_parte01.json").exists());
    }

    #[test]
    fn test_archive_blocked_by_loss() {
        let (_temp, config) = setup();
        let parts = config.parts_path();
        let merging = Merging {
            groups: vec![merged("ok", &parts, true)],
            issues: vec![],
        };
        let report = CoverageReport {
            issues: vec![Issue::raise(IssueKind::LossDetected, "matching -> tree", "-2")],
            ..Default::default()
        };

        let err = execute(&config, &merging, &report).unwrap_err();
        assert!(matches!(err, Error::ArchiveBlocked { .. }));
        assert!(parts.join("ok_parte01.json").exists());
    }

    #[test]
    fn test_archive_never_overwrites_backup() {
        let (_temp, config) = setup();
        let parts = config.parts_path();
        fs::create_dir_all(config.backup_path()).unwrap();
        fs::write(config.backup_path().join("ok_parte01.json"), "older").unwrap();
        let merging = Merging {
            groups: vec![merged("ok", &parts, true)],
            issues: vec![],
        };

        let outcome = execute(&config, &merging, &CoverageReport::default()).unwrap();
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(
            fs::read_to_string(config.backup_path().join("ok_parte01.json")).unwrap(),
            "older"
        );
        assert!(parts.join("ok_parte01.json").exists());
    }

    #[test]
    fn test_prune_untranslated_aggregates() {
        let (temp, config) = setup();
        let empty = FragmentDoc {
            publications: vec![Publication::default()],
            ..Default::default()
        };
        let translated = FragmentDoc {
            publications: vec![Publication {
                content_ptbr: Some("texto".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        fs::write(temp.path().join("a_merged.json"), to_pretty_json(&empty).unwrap()).unwrap();
        fs::write(temp.path().join("b_merged.json"), to_pretty_json(&translated).unwrap()).unwrap();

        let listed = prune(&config, true).unwrap();
        assert_eq!(listed, vec![temp.path().join("a_merged.json")]);
        assert!(temp.path().join("a_merged.json").exists());

        prune(&config, false).unwrap();
        assert!(!temp.path().join("a_merged.json").exists());
        assert!(temp.path().join("b_merged.json").exists());
    }
}
