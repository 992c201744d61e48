//! # Configuration Record and Parsing
//!
//! This module defines [`CorpusConfig`], the explicit configuration record that
//! every reconciliation component receives at construction. Nothing in the
//! library reads directories or tables from process-wide state; whatever the
//! components need is in this record.
//!
//! ## File format
//!
//! The record is read from YAML with kebab-case keys. Every key is optional:
//!
//! ```yaml
//! base-dir: data/temasSeparados
//! parts-dir: partes
//! backup-dir: bkp
//! translations-backup-dir: bkp_translations
//! corpus-file: ../corpus.json
//! volume-names:
//!   "3.信仰編": "3. Seção da Fé"
//! align-mode: key-first        # or titles-only
//! orphans: keep-aside          # or merge-empty
//! archive:
//!   enabled: false
//!   block-on-integrity-warnings: false
//! ```
//!
//! Relative directories resolve against `base-dir`.
//!
//! ## Lookup
//!
//! [`load`] applies the lookup order used by the CLI: an explicit path, then
//! `./.corpus-reconcile.yaml`, then the user configuration file, then the
//! built-in defaults.

use crate::defaults;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// How translated fragments are paired with originals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignMode {
    /// Accept an exact (group, part) match first, fall back to title overlap.
    #[default]
    KeyFirst,
    /// Always score by title overlap, even when a same-numbered original exists.
    TitlesOnly,
}

/// What happens to translated fragments with no original counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrphanPolicy {
    /// Leave the fragment in the working directory and out of the aggregate.
    #[default]
    KeepAside,
    /// Merge it with empty original-language fields (flagged by the audit).
    MergeEmpty,
}

/// Archival policy for source fragments after a successful merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ArchivePolicy {
    /// Move merged fragments out of the working directory.
    pub enabled: bool,
    /// Treat alignment-integrity warnings like detected loss.
    pub block_on_integrity_warnings: bool,
}

/// Static volume-name translation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeNames(BTreeMap<String, String>);

impl VolumeNames {
    pub fn new(table: BTreeMap<String, String>) -> Self {
        Self(table)
    }

    /// Translated volume name; unmapped names pass through unchanged.
    pub fn translate<'a>(&'a self, volume: &'a str) -> &'a str {
        self.0.get(volume).map(String::as_str).unwrap_or(volume)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for VolumeNames {
    fn default() -> Self {
        Self(defaults::volume_names())
    }
}

/// Configuration record passed into each reconciliation component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CorpusConfig {
    /// Directory holding the merged aggregates.
    pub base_dir: PathBuf,
    /// Working fragments directory.
    pub parts_dir: PathBuf,
    /// Archive for originals and already-merged fragments.
    pub backup_dir: PathBuf,
    /// Archive for translated fragments.
    pub translations_backup_dir: PathBuf,
    /// Rebuilt corpus output.
    pub corpus_file: PathBuf,
    pub volume_names: VolumeNames,
    pub align_mode: AlignMode,
    pub orphans: OrphanPolicy,
    pub archive: ArchivePolicy,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            parts_dir: PathBuf::from(defaults::PARTS_DIR),
            backup_dir: PathBuf::from(defaults::BACKUP_DIR),
            translations_backup_dir: PathBuf::from(defaults::TRANSLATIONS_BACKUP_DIR),
            corpus_file: PathBuf::from(defaults::CORPUS_FILE),
            volume_names: VolumeNames::default(),
            align_mode: AlignMode::default(),
            orphans: OrphanPolicy::default(),
            archive: ArchivePolicy::default(),
        }
    }
}

impl CorpusConfig {
    /// Configuration rooted at `base_dir` with every other value defaulted.
    pub fn with_base_dir<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn parts_path(&self) -> PathBuf {
        self.resolve(&self.parts_dir)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.resolve(&self.backup_dir)
    }

    pub fn translations_backup_path(&self) -> PathBuf {
        self.resolve(&self.translations_backup_dir)
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.resolve(&self.corpus_file)
    }
}

/// Parses a YAML string into a [`CorpusConfig`].
///
/// An empty document yields the defaults.
pub fn parse(yaml_content: &str) -> Result<CorpusConfig> {
    if yaml_content.trim().is_empty() {
        return Ok(CorpusConfig::default());
    }
    serde_yaml::from_str::<CorpusConfig>(yaml_content).map_err(|e| {
        let message = e.to_string();
        let hint = message
            .contains("unknown field")
            .then(|| "Valid keys: base-dir, parts-dir, backup-dir, translations-backup-dir, corpus-file, volume-names, align-mode, orphans, archive".to_string());
        Error::ConfigParse { message, hint }
    })
}

/// Reads and parses a configuration file.
///
/// A relative `base-dir` inside the file is resolved against the file's own
/// directory, so a project config works from any working directory.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<CorpusConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
        message: format!("Failed to read {}: {}", path.display(), e),
        hint: None,
    })?;
    let mut config = parse(&content)?;
    if config.base_dir.is_relative() {
        if let Some(parent) = path.parent() {
            config.base_dir = parent.join(&config.base_dir);
        }
    }
    Ok(config)
}

/// Loads the configuration following the lookup order.
///
/// 1. `explicit`, when given (an error if it cannot be read).
/// 2. `.corpus-reconcile.yaml` in `working_dir`.
/// 3. The user configuration file.
/// 4. Built-in defaults, rooted at `working_dir`.
pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<CorpusConfig> {
    if let Some(path) = explicit {
        log::debug!("Loading configuration from {}", path.display());
        return from_file(path);
    }

    let local = working_dir.join(defaults::CONFIG_FILE_NAME);
    if local.is_file() {
        log::debug!("Loading configuration from {}", local.display());
        return from_file(local);
    }

    if let Some(user) = defaults::user_config_path() {
        if user.is_file() {
            log::debug!("Loading user configuration from {}", user.display());
            let content = std::fs::read_to_string(&user)?;
            let mut config = parse(&content)?;
            // A user-wide file cannot know the project; keep it relative to the cwd.
            if config.base_dir.is_relative() {
                config.base_dir = working_dir.join(&config.base_dir);
            }
            return Ok(config);
        }
    }

    log::debug!("No configuration file found, using defaults");
    Ok(CorpusConfig::with_base_dir(working_dir))
}
