//! # Coverage Auditor
//!
//! The auditor recounts publications at each stage boundary and collects the
//! recoverable diagnostics raised along the way into one [`CoverageReport`].
//! It never changes data. Its only teeth are [`CoverageReport::archive_gate`],
//! which the archive step consults before moving any source fragment.
//!
//! ## Stage boundaries
//!
//! - **matching -> tree**: publications the matcher committed to merging,
//!   plus those kept from earlier aggregates, against publications present
//!   in the tree built from this run.
//! - **aggregates -> corpus**: publications in the merged aggregates against
//!   publications in the rebuilt corpus.
//! - **snapshot -> corpus** (optional): per-theme counts of a prior corpus
//!   against the rebuilt one; any theme that shrank is loss.
//!
//! A non-zero delta at any boundary becomes a `LossDetected` issue.

use crate::config::{ArchivePolicy, OrphanPolicy};
use crate::error::{Error, Result};
use crate::model::Corpus;
use crate::phases::alignment::Alignment;
use crate::phases::discovery::{FragmentGroup, LoadedFragment};
use crate::visit;
use log::warn;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Classes of recoverable diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueKind {
    UnrecognizedFragmentName,
    UnreadableFragment,
    DuplicatePartNumber,
    NoOriginalMatch,
    PartNumberMisalignment,
    SharedOriginal,
    AlignmentIntegrityWarning,
    MetadataFallback,
    EmptyOriginalAfterMerge,
    EmptyTranslationAfterMerge,
    LossDetected,
}

impl IssueKind {
    pub fn label(self) -> &'static str {
        match self {
            IssueKind::UnrecognizedFragmentName => "unrecognized fragment name",
            IssueKind::UnreadableFragment => "unreadable fragment",
            IssueKind::DuplicatePartNumber => "duplicate part number",
            IssueKind::NoOriginalMatch => "no original match",
            IssueKind::PartNumberMisalignment => "part number misalignment",
            IssueKind::SharedOriginal => "shared original",
            IssueKind::AlignmentIntegrityWarning => "alignment integrity warning",
            IssueKind::MetadataFallback => "metadata fallback",
            IssueKind::EmptyOriginalAfterMerge => "empty original after merge",
            IssueKind::EmptyTranslationAfterMerge => "empty translation after merge",
            IssueKind::LossDetected => "loss detected",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One recoverable diagnostic, tied to the fragment (or theme) it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    pub fragment: String,
    pub detail: String,
}

impl Issue {
    /// Creates the issue and logs it at `warn` level.
    pub fn raise(kind: IssueKind, fragment: impl Into<String>, detail: impl Into<String>) -> Self {
        let issue = Self {
            kind,
            fragment: fragment.into(),
            detail: detail.into(),
        };
        warn!("{}: {}: {}", issue.kind, issue.fragment, issue.detail);
        issue
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.fragment, self.detail)
    }
}

/// Publication counts on both sides of one stage boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDelta {
    pub stage: &'static str,
    pub before: usize,
    pub after: usize,
}

impl StageDelta {
    pub fn delta(&self) -> i64 {
        self.after as i64 - self.before as i64
    }
}

/// Aggregated outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageReport {
    pub fragments_processed: usize,
    pub fragments_unmatched: usize,
    pub originals_ignored: usize,
    /// Original publications with no counterpart in their matched translation.
    pub untranslated_in_pairs: usize,
    pub publications_merged: usize,
    /// Publications kept from aggregates written by earlier runs.
    pub publications_carried: usize,
    pub publications_without_original: usize,
    pub publications_without_translation: usize,
    pub boundaries: Vec<StageDelta>,
    pub issues: Vec<Issue>,
}

impl CoverageReport {
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    pub fn loss_detected(&self) -> bool {
        self.count(IssueKind::LossDetected) > 0
    }

    /// Issues grouped by kind, in taxonomy order.
    pub fn by_kind(&self) -> BTreeMap<IssueKind, Vec<&Issue>> {
        let mut grouped: BTreeMap<IssueKind, Vec<&Issue>> = BTreeMap::new();
        for issue in &self.issues {
            grouped.entry(issue.kind).or_default().push(issue);
        }
        grouped
    }

    /// Distinct fragment names affected by one kind of issue.
    pub fn affected(&self, kind: IssueKind) -> BTreeSet<&str> {
        self.issues
            .iter()
            .filter(|i| i.kind == kind)
            .map(|i| i.fragment.as_str())
            .collect()
    }

    /// Refuses archival when loss was detected, or when integrity warnings
    /// exist and the policy treats them as blocking.
    pub fn archive_gate(&self, policy: &ArchivePolicy) -> Result<()> {
        if let Some(issue) = self
            .issues
            .iter()
            .find(|i| i.kind == IssueKind::LossDetected)
        {
            return Err(Error::ArchiveBlocked {
                reason: format!(
                    "{} loss issue(s), first: {}",
                    self.count(IssueKind::LossDetected),
                    issue
                ),
            });
        }
        let warnings = self.count(IssueKind::AlignmentIntegrityWarning);
        if policy.block_on_integrity_warnings && warnings > 0 {
            return Err(Error::ArchiveBlocked {
                reason: format!("{} alignment integrity warning(s)", warnings),
            });
        }
        Ok(())
    }
}

/// Collects counts and issues stage by stage.
#[derive(Debug, Default)]
pub struct Auditor {
    report: CoverageReport,
    expected: Option<usize>,
}

impl Auditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_issues<I: IntoIterator<Item = Issue>>(&mut self, issues: I) {
        self.report.issues.extend(issues);
    }

    /// Captures the matcher's commitments: which fragments are in, which are
    /// out, and how many publications the tree must end up holding.
    pub fn after_matching(
        &mut self,
        groups: &[FragmentGroup<LoadedFragment>],
        alignment: &Alignment,
        orphans: OrphanPolicy,
    ) {
        let mut expected = 0;
        for (group, aligned) in groups.iter().zip(&alignment.groups) {
            self.report.fragments_processed += group.fragment_count();
            self.report.fragments_unmatched += aligned.orphans.len();
            self.report.originals_ignored += aligned.ignored_originals.len();

            for m in &aligned.matches {
                let translated = group.translated[m.translated].doc.publications.len();
                let source = group.source(m.source).doc.publications.len();
                self.report.untranslated_in_pairs += source.saturating_sub(translated);
                expected += translated;
            }
            if orphans == OrphanPolicy::MergeEmpty {
                expected += aligned
                    .orphans
                    .iter()
                    .map(|&i| group.translated[i].doc.publications.len())
                    .sum::<usize>();
            }
            expected += aligned
                .carried_merged
                .iter()
                .map(|&i| group.merged[i].doc.publications.len())
                .sum::<usize>();
        }
        self.expected = Some(expected);
    }

    /// Publications the merger kept from earlier aggregates. They belong in
    /// this run's tree too.
    pub fn carried_forward(&mut self, publications: usize) {
        self.report.publications_carried += publications;
        if let Some(expected) = self.expected.as_mut() {
            *expected += publications;
        }
    }

    /// Counts the tree built from this run's merged records.
    pub fn after_building(&mut self, tree: &Corpus) {
        let counts = visit::count(tree);
        self.report.publications_merged = counts.publications;
        self.report.publications_without_original = counts.without_original;
        self.report.publications_without_translation = counts.without_translation;
        if let Some(expected) = self.expected.take() {
            self.report.boundaries.push(StageDelta {
                stage: "matching -> tree",
                before: expected,
                after: counts.publications,
            });
        }
    }

    /// Compares aggregate totals with the rebuilt corpus.
    pub fn after_rebuild(&mut self, aggregate_publications: usize, corpus: &Corpus) {
        self.report.boundaries.push(StageDelta {
            stage: "aggregates -> corpus",
            before: aggregate_publications,
            after: visit::count(corpus).publications,
        });
    }

    /// Flags every theme that holds fewer publications than in `prior`.
    pub fn against_snapshot(&mut self, prior: &Corpus, current: &Corpus) {
        let before = theme_counts(prior);
        let after = theme_counts(current);
        for ((volume, theme), &count) in &before {
            let now = after
                .get(&(volume.clone(), theme.clone()))
                .copied()
                .unwrap_or(0);
            if now < count {
                self.report.issues.push(Issue::raise(
                    IssueKind::LossDetected,
                    format!("{} / {}", volume, theme),
                    format!("theme shrank from {} to {} publications", count, now),
                ));
            }
        }
        self.report.boundaries.push(StageDelta {
            stage: "snapshot -> corpus",
            before: before.values().sum(),
            after: after.values().sum(),
        });
    }

    /// Turns boundary deltas into issues and returns the report.
    pub fn finish(mut self) -> CoverageReport {
        let losses: Vec<Issue> = self
            .report
            .boundaries
            .iter()
            .filter(|b| b.stage != "snapshot -> corpus" && b.delta() != 0)
            .map(|b| {
                Issue::raise(
                    IssueKind::LossDetected,
                    b.stage,
                    format!(
                        "{} publications before, {} after ({:+})",
                        b.before,
                        b.after,
                        b.delta()
                    ),
                )
            })
            .collect();
        self.report.issues.extend(losses);
        self.report
    }
}

fn theme_counts(corpus: &Corpus) -> BTreeMap<(String, String), usize> {
    let mut counts = BTreeMap::new();
    for record in visit::flatten(corpus) {
        *counts.entry((record.volume, record.theme)).or_insert(0) += record.publications.len();
    }
    counts
}
