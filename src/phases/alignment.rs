//! Phase 2: Alignment
//!
//! Decides, for every translated fragment, which original fragment it was
//! translated from.
//!
//! ## Algorithm
//!
//! 1.  **Exact key**: in `key-first` mode, an original (or already-merged
//!     part) with the same group and part number is accepted at once with
//!     [`EXACT_KEY_SCORE`].
//! 2.  **Title overlap**: otherwise every candidate in the group is scored
//!     with [`crate::scoring::title_overlap`]. The highest score wins; ties go
//!     to the first candidate in file-name order. Zero means no match.
//! 3.  **Misalignment**: a match whose part number differs from the
//!     translated fragment's own is reported with a suggested re-numbering.
//!     Nothing is renamed here; [`apply_renames`] does that on request.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use log::{debug, info};

use super::archive::move_no_clobber;
use super::discovery::{FragmentGroup, LoadedFragment, SourceRef};
use crate::audit::{Issue, IssueKind};
use crate::config::{AlignMode, CorpusConfig};
use crate::scoring;

/// Score reported for an exact (group, part) match.
pub const EXACT_KEY_SCORE: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    ExactKey,
    TitleOverlap,
}

/// A translated fragment paired with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentMatch {
    /// Index into the group's translated fragments.
    pub translated: usize,
    pub source: SourceRef,
    pub score: u32,
    pub kind: MatchKind,
}

/// A match whose part numbers disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Misalignment {
    pub group: String,
    pub translated: PathBuf,
    pub translated_part: u32,
    pub matched: String,
    pub matched_part: u32,
    pub suggested: PathBuf,
}

impl Misalignment {
    pub fn translated_name(&self) -> String {
        file_name(&self.translated)
    }

    pub fn suggested_name(&self) -> String {
        file_name(&self.suggested)
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Alignment outcome for one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupAlignment {
    pub key: String,
    pub matches: Vec<FragmentMatch>,
    /// Translated fragments without any source.
    pub orphans: Vec<usize>,
    pub misalignments: Vec<Misalignment>,
    /// Originals no translated fragment claimed.
    pub ignored_originals: Vec<usize>,
    /// Already-merged parts no translated fragment claimed.
    pub carried_merged: Vec<usize>,
}

/// Alignment outcome for a whole catalog, one entry per group in order.
#[derive(Debug, Clone, Default)]
pub struct Alignment {
    pub groups: Vec<GroupAlignment>,
    pub issues: Vec<Issue>,
}

impl Alignment {
    pub fn misalignments(&self) -> impl Iterator<Item = &Misalignment> {
        self.groups.iter().flat_map(|g| g.misalignments.iter())
    }
}

/// Pairs translated fragments with their sources.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    mode: AlignMode,
}

impl Matcher {
    pub fn new(config: &CorpusConfig) -> Self {
        Self::with_mode(config.align_mode)
    }

    pub fn with_mode(mode: AlignMode) -> Self {
        Self { mode }
    }

    /// Candidate sources of a group, in file-name order.
    fn candidates(group: &FragmentGroup<LoadedFragment>) -> Vec<SourceRef> {
        let mut candidates: Vec<SourceRef> = (0..group.originals.len())
            .map(SourceRef::Original)
            .chain((0..group.merged.len()).map(SourceRef::Merged))
            .collect();
        candidates.sort_by(|a, b| {
            group
                .source(*a)
                .fragment
                .name
                .cmp(&group.source(*b).fragment.name)
        });
        candidates
    }

    /// Finds the best source for one translated fragment.
    pub fn best_match(
        &self,
        translated: &LoadedFragment,
        group: &FragmentGroup<LoadedFragment>,
    ) -> Option<(SourceRef, u32, MatchKind)> {
        let candidates = Self::candidates(group);

        if self.mode == AlignMode::KeyFirst {
            let part = translated.fragment.key.part;
            let exact = candidates
                .iter()
                .filter(|c| group.source(**c).fragment.key.part == part)
                .min_by_key(|c| matches!(c, SourceRef::Merged(_)));
            if let Some(&source) = exact {
                return Some((source, EXACT_KEY_SCORE, MatchKind::ExactKey));
            }
        }

        let haystacks: Vec<String> = translated
            .doc
            .publications
            .iter()
            .map(|p| {
                format!(
                    "{}\n{}",
                    p.publication_title,
                    p.publication_title_ptbr.as_deref().unwrap_or("")
                )
            })
            .collect();

        let mut best: Option<(SourceRef, u32)> = None;
        for source in candidates {
            let titles = group.source(source).doc.publication_titles();
            let score = scoring::title_overlap(&haystacks, &titles);
            debug!(
                "{} vs {}: score {}",
                translated.fragment.name,
                group.source(source).fragment.name,
                score
            );
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((source, score));
            }
        }
        best.map(|(source, score)| (source, score, MatchKind::TitleOverlap))
    }

    /// Aligns every translated fragment of a group.
    pub fn align_group(&self, group: &FragmentGroup<LoadedFragment>) -> (GroupAlignment, Vec<Issue>) {
        let mut aligned = GroupAlignment {
            key: group.key.clone(),
            ..Default::default()
        };
        let mut issues = Vec::new();
        let mut claims: BTreeMap<SourceRef, Vec<usize>> = BTreeMap::new();

        for (index, translated) in group.translated.iter().enumerate() {
            let Some((source, score, kind)) = self.best_match(translated, group) else {
                issues.push(Issue::raise(
                    IssueKind::NoOriginalMatch,
                    translated.fragment.name.clone(),
                    "no original fragment shares a title; kept aside",
                ));
                aligned.orphans.push(index);
                continue;
            };

            let matched = &group.source(source).fragment;
            if matched.key.part != translated.fragment.key.part {
                let suggested_name = format!("{}_parte{}_pt.json", group.key, matched.key.part_label);
                let suggested = translated.fragment.path.with_file_name(&suggested_name);
                issues.push(Issue::raise(
                    IssueKind::PartNumberMisalignment,
                    translated.fragment.name.clone(),
                    format!(
                        "matches {} (score {}); suggested rename to {}",
                        matched.name, score, suggested_name
                    ),
                ));
                aligned.misalignments.push(Misalignment {
                    group: group.key.clone(),
                    translated: translated.fragment.path.clone(),
                    translated_part: translated.fragment.key.part,
                    matched: matched.name.clone(),
                    matched_part: matched.key.part,
                    suggested,
                });
            }

            claims.entry(source).or_default().push(index);
            aligned.matches.push(FragmentMatch {
                translated: index,
                source,
                score,
                kind,
            });
        }

        for (source, claimants) in &claims {
            if claimants.len() > 1 {
                let names: Vec<&str> = claimants
                    .iter()
                    .map(|&i| group.translated[i].fragment.name.as_str())
                    .collect();
                issues.push(Issue::raise(
                    IssueKind::SharedOriginal,
                    group.source(*source).fragment.name.clone(),
                    format!("claimed by {}", names.join(", ")),
                ));
            }
        }

        aligned.ignored_originals = (0..group.originals.len())
            .filter(|i| !claims.contains_key(&SourceRef::Original(*i)))
            .collect();
        aligned.carried_merged = (0..group.merged.len())
            .filter(|i| !claims.contains_key(&SourceRef::Merged(*i)))
            .collect();

        (aligned, issues)
    }
}

/// Executes Phase 2 over every loaded group.
pub fn execute(config: &CorpusConfig, groups: &[FragmentGroup<LoadedFragment>]) -> Alignment {
    let matcher = Matcher::new(config);
    let mut alignment = Alignment::default();
    for group in groups {
        let (aligned, issues) = matcher.align_group(group);
        alignment.groups.push(aligned);
        alignment.issues.extend(issues);
    }
    info!(
        "Aligned {} groups, {} misalignments",
        alignment.groups.len(),
        alignment.misalignments().count()
    );
    alignment
}

/// What [`apply_renames`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameOutcome {
    pub renamed: Vec<(PathBuf, PathBuf)>,
    pub refused: Vec<(PathBuf, PathBuf, String)>,
}

/// Applies suggested re-numberings.
///
/// Renames run in reverse order so that shifting a run of parts up by one
/// frees each destination before it is needed. A rename is refused when two
/// suggestions share a destination, or when the destination still exists at
/// the moment of the move.
pub fn apply_renames<'a, I>(misalignments: I) -> RenameOutcome
where
    I: IntoIterator<Item = &'a Misalignment>,
{
    let planned: Vec<&Misalignment> = misalignments.into_iter().collect();
    let mut destinations: BTreeMap<&PathBuf, usize> = BTreeMap::new();
    for m in &planned {
        *destinations.entry(&m.suggested).or_insert(0) += 1;
    }
    let colliding: BTreeSet<&PathBuf> = destinations
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(p, _)| p)
        .collect();

    let mut outcome = RenameOutcome::default();
    for m in planned.iter().rev() {
        let pair = (m.translated.clone(), m.suggested.clone());
        if colliding.contains(&m.suggested) {
            outcome.refused.push((
                pair.0,
                pair.1,
                "another suggestion targets the same name".to_string(),
            ));
            continue;
        }
        match move_no_clobber(&m.translated, &m.suggested) {
            Ok(()) => {
                info!("Renamed {} -> {}", m.translated_name(), m.suggested_name());
                outcome.renamed.push(pair);
            }
            Err(e) => outcome.refused.push((pair.0, pair.1, e.to_string())),
        }
    }
    outcome
}
