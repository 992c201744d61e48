//! Phase 1: Fragment Discovery
//!
//! This is the first phase of the reconciliation pipeline. It finds the
//! fragments in the working directory, decodes their naming key and groups
//! them by corpus group.
//!
//! ## Process
//!
//! 1.  **Scan (`Catalog::scan`)**: The working directory is listed in file-name
//!     order. Each `.json` name is matched against
//!     `{group}_parte{NN}[_pt|_merged].json`. The group key is everything before
//!     the *last* `_parte<digits>`, so punctuation and underscores inside volume
//!     or theme names are kept intact.
//!
//! 2.  **Grouping**: Fragments are partitioned per group into originals,
//!     translations and already-merged parts, each ordered by part number.
//!     When two files of one variant claim the same part, the first in listing
//!     order wins and the other is reported.
//!
//! 3.  **Loading (`Catalog::load`)**: Each fragment document is read exactly
//!     once. An unreadable document is reported and left out; the other
//!     fragments keep going.
//!
//! This phase has no side effects on disk. Names that do not follow the
//! convention are reported as `UnrecognizedFragmentName`, never merged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use regex::Regex;
use walkdir::WalkDir;

use crate::audit::{Issue, IssueKind};
use crate::config::CorpusConfig;
use crate::defaults;
use crate::error::{Error, Result};
use crate::model::FragmentDoc;

/// Language variant carried in a fragment name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variant {
    Original,
    Translated,
    Merged,
}

/// The naming key of one fragment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentKey {
    pub group: String,
    pub part: u32,
    /// Part digits exactly as written, e.g. `05`.
    pub part_label: String,
    pub variant: Variant,
}

/// Matcher for the fragment naming convention.
#[derive(Debug, Clone)]
pub struct NamePattern {
    regex: Regex,
    group: Regex,
}

impl NamePattern {
    pub fn new() -> Result<Self> {
        let regex =
            Regex::new(r"^(?P<group>.+)_parte(?P<part>\d+)(?:[._](?P<variant>pt|merged))?\.json$")?;
        let group = Regex::new(r"^\d+_(?P<volume>.+?)_\d+_(?P<theme>.+)$")?;
        Ok(Self { regex, group })
    }

    /// Splits a `{vi}_{volume}_{ti}_{theme}` group key into volume and theme.
    pub fn group_metadata(&self, key: &str) -> Option<(String, String)> {
        let caps = self.group.captures(key)?;
        Some((
            caps.name("volume")?.as_str().to_string(),
            caps.name("theme")?.as_str().to_string(),
        ))
    }

    /// Decodes a file name, or `None` when it does not follow the convention.
    pub fn parse(&self, name: &str) -> Option<FragmentKey> {
        let caps = self.regex.captures(name)?;
        let part_label = caps.name("part")?.as_str().to_string();
        let part = part_label.parse().ok()?;
        let variant = match caps.name("variant").map(|m| m.as_str()) {
            Some("pt") => Variant::Translated,
            Some("merged") => Variant::Merged,
            _ => Variant::Original,
        };
        Some(FragmentKey {
            group: caps.name("group")?.as_str().to_string(),
            part,
            part_label,
            variant,
        })
    }
}

/// A fragment file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub path: PathBuf,
    pub name: String,
    pub key: FragmentKey,
}

/// A fragment together with its decoded document.
#[derive(Debug, Clone)]
pub struct LoadedFragment {
    pub fragment: Fragment,
    pub doc: FragmentDoc,
}

/// Anything that wraps a [`Fragment`].
pub trait Keyed {
    fn fragment(&self) -> &Fragment;
}

impl Keyed for Fragment {
    fn fragment(&self) -> &Fragment {
        self
    }
}

impl Keyed for LoadedFragment {
    fn fragment(&self) -> &Fragment {
        &self.fragment
    }
}

/// Where a matched source lives inside its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceRef {
    Original(usize),
    Merged(usize),
}

/// All fragments of one corpus group, partitioned by variant.
#[derive(Debug, Clone)]
pub struct FragmentGroup<F = Fragment> {
    pub key: String,
    pub originals: Vec<F>,
    pub translated: Vec<F>,
    pub merged: Vec<F>,
}

impl<F> FragmentGroup<F> {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            originals: Vec::new(),
            translated: Vec::new(),
            merged: Vec::new(),
        }
    }

    pub fn fragment_count(&self) -> usize {
        self.originals.len() + self.translated.len() + self.merged.len()
    }

    pub fn variant(&self, variant: Variant) -> &[F] {
        match variant {
            Variant::Original => &self.originals,
            Variant::Translated => &self.translated,
            Variant::Merged => &self.merged,
        }
    }

    fn variant_mut(&mut self, variant: Variant) -> &mut Vec<F> {
        match variant {
            Variant::Original => &mut self.originals,
            Variant::Translated => &mut self.translated,
            Variant::Merged => &mut self.merged,
        }
    }

    /// The original or merged part a match points at.
    pub fn source(&self, source: SourceRef) -> &F {
        match source {
            SourceRef::Original(i) => &self.originals[i],
            SourceRef::Merged(i) => &self.merged[i],
        }
    }
}

impl<F: Keyed> FragmentGroup<F> {
    /// Adds a fragment unless its variant already holds the same part.
    /// Returns the name of the fragment that kept the slot on conflict.
    fn insert(&mut self, fragment: F) -> std::result::Result<(), String> {
        let key = fragment.fragment().key.clone();
        let slot = self.variant_mut(key.variant);
        if let Some(existing) = slot.iter().find(|f| f.fragment().key.part == key.part) {
            return Err(existing.fragment().name.clone());
        }
        slot.push(fragment);
        Ok(())
    }

    fn sort(&mut self) {
        for variant in [Variant::Original, Variant::Translated, Variant::Merged] {
            self.variant_mut(variant).sort_by(|a, b| {
                let (a, b) = (a.fragment(), b.fragment());
                (a.key.part, &a.name).cmp(&(b.key.part, &b.name))
            });
        }
    }
}

/// Result of scanning a working directory.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub groups: BTreeMap<String, FragmentGroup>,
    pub issues: Vec<Issue>,
}

/// Catalog whose documents have been read.
#[derive(Debug, Clone, Default)]
pub struct LoadedCatalog {
    pub groups: Vec<FragmentGroup<LoadedFragment>>,
    pub issues: Vec<Issue>,
}

impl Catalog {
    /// Scans `dir` (not recursively) for fragments.
    pub fn scan(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::Filesystem {
                message: format!("Fragments directory not found: {}", dir.display()),
            });
        }

        let pattern = NamePattern::new()?;
        let mut catalog = Catalog::default();

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            catalog.consider(&pattern, entry.path(), name);
        }

        for group in catalog.groups.values_mut() {
            group.sort();
        }
        debug!(
            "Catalogued {} fragments in {} groups under {}",
            catalog.fragment_count(),
            catalog.groups.len(),
            dir.display()
        );
        Ok(catalog)
    }

    fn consider(&mut self, pattern: &NamePattern, path: &Path, name: String) {
        if !name.ends_with(".json") {
            debug!("Skipping non-JSON file {}", name);
            return;
        }
        let Some(key) = pattern.parse(&name) else {
            if name.ends_with(" copy.json") {
                self.issues.push(Issue::raise(
                    IssueKind::UnrecognizedFragmentName,
                    name,
                    "unstaged translator copy; run `stage` first",
                ));
            } else if name.ends_with(defaults::MERGED_SUFFIX) {
                debug!("Skipping theme aggregate {}", name);
            } else {
                self.issues.push(Issue::raise(
                    IssueKind::UnrecognizedFragmentName,
                    name,
                    "does not match {group}_parte{NN}[_pt|_merged].json",
                ));
            }
            return;
        };

        let fragment = Fragment {
            path: path.to_path_buf(),
            name: name.clone(),
            key,
        };
        let group = self
            .groups
            .entry(fragment.key.group.clone())
            .or_insert_with(|| FragmentGroup::new(fragment.key.group.clone()));
        if let Err(kept) = group.insert(fragment) {
            self.issues.push(Issue::raise(
                IssueKind::DuplicatePartNumber,
                name,
                format!("part already provided by {}", kept),
            ));
        }
    }

    pub fn fragment_count(&self) -> usize {
        self.groups.values().map(FragmentGroup::fragment_count).sum()
    }

    /// Reads every fragment document once.
    pub fn load(self) -> LoadedCatalog {
        let mut issues = self.issues;
        let mut groups = Vec::with_capacity(self.groups.len());

        for (key, group) in self.groups {
            let mut loaded = FragmentGroup::new(key);
            for fragment in group
                .originals
                .into_iter()
                .chain(group.translated)
                .chain(group.merged)
            {
                match FragmentDoc::from_path(&fragment.path) {
                    Ok(doc) => {
                        // Slots were already deduplicated while scanning.
                        let _ = loaded.insert(LoadedFragment { fragment, doc });
                    }
                    Err(e) => issues.push(Issue::raise(
                        IssueKind::UnreadableFragment,
                        fragment.name,
                        e.to_string(),
                    )),
                }
            }
            loaded.sort();
            if loaded.fragment_count() > 0 {
                groups.push(loaded);
            }
        }

        LoadedCatalog { groups, issues }
    }
}

/// Executes Phase 1: scan the configured working directory.
pub fn execute(config: &CorpusConfig) -> Result<Catalog> {
    Catalog::scan(&config.parts_path())
}
