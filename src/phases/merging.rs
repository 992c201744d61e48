//! Phase 3: Record Merging
//!
//! Combines each translated fragment with its matched source into bilingual
//! publications, then concatenates a group's fragments into one per-theme
//! aggregate.
//!
//! ## Field precedence
//!
//! Source-language fields (`title`, `publication_title`, `content`, `date`)
//! always come from the original. Target-language fields (`title_ptbr`,
//! `publication_title_ptbr`, `content_ptbr`) always come from the
//! translation. `has_translation` is recomputed from `content_ptbr`.
//!
//! ## Pairing inside a fragment
//!
//! A translated publication pairs with the original publication of equal
//! `pub_idx`; when the index is missing or unknown, the one at the same
//! position. When the translator recorded which original it worked from
//! (an `original_title` field or an `(Orig.: ...)` marker in the translated
//! title), that title is compared with the paired original ignoring
//! whitespace. A mismatch raises an `AlignmentIntegrityWarning` and the merge
//! goes on.
//!
//! ## Order
//!
//! A group's publications are concatenated by ascending part number of the
//! translated fragment. Carried-over merged parts slot in by their own part
//! number. Nothing downstream reorders them.
//!
//! ## Earlier runs
//!
//! A theme is translated piecemeal, so its aggregate may already exist from
//! a run whose fragments have since been archived. The aggregate records its
//! part layout; parts merged again now replace their earlier run and every
//! other part is kept. An aggregate that would end up smaller than the one
//! it replaces raises `LossDetected`.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use log::{debug, info};
use regex::Regex;

use super::alignment::{Alignment, GroupAlignment};
use super::discovery::{FragmentGroup, LoadedFragment, NamePattern, SourceRef};
use crate::audit::{Issue, IssueKind};
use crate::config::{CorpusConfig, OrphanPolicy};
use crate::defaults;
use crate::error::Result;
use crate::filesystem::MemoryFS;
use crate::model::{to_pretty_json, FragmentDoc, PartSpan, Publication, ThemeRecords};
use crate::scoring;

/// Fragment files a merged group was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Consumed {
    pub originals: Vec<PathBuf>,
    pub translated: Vec<PathBuf>,
    pub merged: Vec<PathBuf>,
}

/// The per-theme aggregate of one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedGroup {
    pub key: String,
    pub doc: FragmentDoc,
    pub consumed: Consumed,
    /// Safe to move the consumed fragments to the backup directories.
    pub archivable: bool,
    /// Publications kept from the aggregate an earlier run wrote.
    pub carried_prior: usize,
}

impl MergedGroup {
    pub fn file_name(&self) -> String {
        format!("{}{}", self.key, defaults::MERGED_SUFFIX)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Merging {
    pub groups: Vec<MergedGroup>,
    pub issues: Vec<Issue>,
}

impl Merging {
    /// Flat theme streams, ready for the tree builder.
    pub fn records(&self) -> Vec<ThemeRecords> {
        self.groups
            .iter()
            .map(|g| ThemeRecords::from_doc(g.doc.clone()))
            .collect()
    }

    pub fn publication_count(&self) -> usize {
        self.groups.iter().map(|g| g.doc.publications.len()).sum()
    }

    pub fn carried_publications(&self) -> usize {
        self.groups.iter().map(|g| g.carried_prior).sum()
    }
}

/// Merges matched fragment pairs.
#[derive(Debug, Clone)]
pub struct Merger {
    orphans: OrphanPolicy,
    orig_marker: Regex,
    names: NamePattern,
}

impl Merger {
    pub fn new(config: &CorpusConfig) -> Result<Self> {
        Ok(Self {
            orphans: config.orphans,
            orig_marker: Regex::new(r"\(Orig\.?:\s*([^)]+)\)")?,
            names: NamePattern::new()?,
        })
    }

    /// Builds one bilingual publication.
    pub fn merge_publication(original: Option<&Publication>, translated: &Publication) -> Publication {
        let empty = Publication::default();
        let source = original.unwrap_or(&empty);
        let mut merged = Publication {
            title: source.title.clone(),
            title_ptbr: translated.title_ptbr.clone(),
            pub_idx: translated.pub_idx.or(source.pub_idx),
            publication_title: source.publication_title.clone(),
            publication_title_ptbr: translated.publication_title_ptbr.clone(),
            content: source.content.clone(),
            content_ptbr: translated.content_ptbr.clone(),
            date: source.date.clone(),
            has_translation: false,
            original_title: None,
        };
        merged.refresh_translation_flag();
        merged
    }

    /// The original title the translator says it worked from.
    pub fn self_reported_title(&self, publication: &Publication) -> Option<String> {
        if let Some(title) = publication
            .original_title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
        {
            return Some(title.to_string());
        }
        let translated_title = publication.publication_title_ptbr.as_deref()?;
        self.orig_marker
            .captures(translated_title)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    }

    /// Merges one translated fragment with its source (if any).
    ///
    /// Returns the publications in translated order, the number of them that
    /// found no original publication, and the issues raised.
    pub fn merge_pair(
        &self,
        source: Option<&FragmentDoc>,
        translated: &LoadedFragment,
    ) -> (Vec<Publication>, usize, Vec<Issue>) {
        let mut issues = Vec::new();
        let name = &translated.fragment.name;

        let by_idx: HashMap<i64, &Publication> = source
            .map(|doc| {
                let mut map = HashMap::new();
                for p in &doc.publications {
                    if let Some(idx) = p.pub_idx {
                        map.entry(idx).or_insert(p);
                    }
                }
                map
            })
            .unwrap_or_default();

        let mut unmatched = 0;
        let mut publications = Vec::with_capacity(translated.doc.publications.len());
        for (position, tr) in translated.doc.publications.iter().enumerate() {
            let original = tr
                .pub_idx
                .and_then(|idx| by_idx.get(&idx).copied())
                .or_else(|| source.and_then(|doc| doc.publications.get(position)));

            match original {
                Some(orig) => {
                    if let Some(claimed) = self.self_reported_title(tr) {
                        if !scoring::same_title(&claimed, &orig.publication_title) {
                            issues.push(Issue::raise(
                                IssueKind::AlignmentIntegrityWarning,
                                name.clone(),
                                format!(
                                    "publication {}: translator names '{}', original is '{}'",
                                    tr.pub_idx.unwrap_or(position as i64),
                                    claimed,
                                    orig.publication_title
                                ),
                            ));
                        }
                    }
                }
                None => unmatched += 1,
            }
            publications.push(Self::merge_publication(original, tr));
        }

        let without_original = publications
            .iter()
            .filter(|p| p.lacks_original_content())
            .count();
        if without_original > 0 {
            issues.push(Issue::raise(
                IssueKind::EmptyOriginalAfterMerge,
                name.clone(),
                format!("{} publication(s) without original content", without_original),
            ));
        }
        let without_translation = publications
            .iter()
            .filter(|p| !p.has_translation)
            .count();
        if without_translation > 0 {
            issues.push(Issue::raise(
                IssueKind::EmptyTranslationAfterMerge,
                name.clone(),
                format!(
                    "{} publication(s) without translated content",
                    without_translation
                ),
            ));
        }

        (publications, unmatched, issues)
    }

    /// Builds the aggregate of one group, or `None` when nothing in the
    /// group is ready to merge.
    pub fn merge_group(
        &self,
        group: &FragmentGroup<LoadedFragment>,
        aligned: &GroupAlignment,
    ) -> (Option<MergedGroup>, Vec<Issue>) {
        self.merge_group_onto(group, aligned, None)
    }

    /// Same as [`Merger::merge_group`], on top of the aggregate an earlier
    /// run wrote for the group.
    pub fn merge_group_onto(
        &self,
        group: &FragmentGroup<LoadedFragment>,
        aligned: &GroupAlignment,
        prior: Option<&FragmentDoc>,
    ) -> (Option<MergedGroup>, Vec<Issue>) {
        let aggregate_name = format!("{}{}", group.key, defaults::MERGED_SUFFIX);
        let mut issues = Vec::new();
        let mut segments: Vec<(u32, &str, Vec<Publication>)> = Vec::new();
        let mut consumed = Consumed::default();
        let mut unmatched = 0;
        // Documents in metadata priority order.
        let mut translated_docs: Vec<&FragmentDoc> = Vec::new();
        let mut source_docs: Vec<&FragmentDoc> = Vec::new();

        for m in &aligned.matches {
            let translated = &group.translated[m.translated];
            let source = group.source(m.source);
            let (pubs, missing, pair_issues) = self.merge_pair(Some(&source.doc), translated);
            unmatched += missing;
            issues.extend(pair_issues);
            segments.push((translated.fragment.key.part, translated.fragment.name.as_str(), pubs));
            translated_docs.push(&translated.doc);
            source_docs.push(&source.doc);

            consumed.translated.push(translated.fragment.path.clone());
            let source_path = source.fragment.path.clone();
            let bucket = match m.source {
                SourceRef::Original(_) => &mut consumed.originals,
                SourceRef::Merged(_) => &mut consumed.merged,
            };
            if !bucket.contains(&source_path) {
                bucket.push(source_path);
            }
        }

        if self.orphans == OrphanPolicy::MergeEmpty {
            for &i in &aligned.orphans {
                let translated = &group.translated[i];
                let (pubs, missing, pair_issues) = self.merge_pair(None, translated);
                unmatched += missing;
                issues.extend(pair_issues);
                segments.push((translated.fragment.key.part, translated.fragment.name.as_str(), pubs));
                translated_docs.push(&translated.doc);
            }
        }

        for &i in &aligned.carried_merged {
            let part = &group.merged[i];
            let pubs = part
                .doc
                .publications
                .iter()
                .cloned()
                .map(|mut p| {
                    p.refresh_translation_flag();
                    p.original_title = None;
                    p
                })
                .collect();
            segments.push((part.fragment.key.part, part.fragment.name.as_str(), pubs));
            source_docs.push(&part.doc);
            consumed.merged.push(part.fragment.path.clone());
        }

        if segments.is_empty() {
            debug!("Group {} has nothing to merge", group.key);
            return (None, issues);
        }

        let mut carried_prior = 0;
        if let Some(prior) = prior {
            let remerged: BTreeSet<u32> = segments.iter().map(|s| s.0).collect();
            match prior.part_runs() {
                Some(runs) => {
                    for (part, pubs) in runs.into_iter().filter(|(part, _)| !remerged.contains(part)) {
                        carried_prior += pubs.len();
                        segments.push((part, aggregate_name.as_str(), pubs.to_vec()));
                    }
                }
                None => debug!("{} has no part layout, nothing carried over", aggregate_name),
            }
            source_docs.push(prior);
        }
        segments.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let parts: Vec<PartSpan> = segments
            .iter()
            .map(|(part, _, pubs)| PartSpan {
                part: *part,
                publications: pubs.len(),
            })
            .collect();

        let publications: Vec<Publication> =
            segments.into_iter().flat_map(|(_, _, pubs)| pubs).collect();

        let priority: Vec<&FragmentDoc> = translated_docs
            .iter()
            .chain(source_docs.iter())
            .copied()
            .collect();
        let mut doc = FragmentDoc {
            source_file: Some(format!("{}.json", group.key)),
            total_publications: Some(publications.len()),
            parts,
            publications,
            ..Default::default()
        };
        match priority.iter().find(|d| d.has_metadata()) {
            Some(meta) => {
                doc.volume = meta.volume.clone();
                doc.theme_name = meta.theme_name.clone();
            }
            None => {
                let (volume, theme) = self
                    .names
                    .group_metadata(&group.key)
                    .unwrap_or_else(|| (String::new(), group.key.clone()));
                issues.push(Issue::raise(
                    IssueKind::MetadataFallback,
                    group.key.clone(),
                    format!("no fragment names its volume or theme; using '{}' / '{}'", volume, theme),
                ));
                doc.volume = volume;
                doc.theme_name = theme;
            }
        }
        doc.theme_name_ptbr = priority.iter().find_map(|d| d.theme_name_ptbr.clone());

        if let Some(prior) = prior {
            if doc.publications.len() < prior.publications.len() {
                issues.push(Issue::raise(
                    IssueKind::LossDetected,
                    aggregate_name.clone(),
                    format!(
                        "aggregate shrinks from {} to {} publications",
                        prior.publications.len(),
                        doc.publications.len()
                    ),
                ));
            }
        }

        let archivable = aligned.orphans.is_empty() && unmatched == 0;
        (
            Some(MergedGroup {
                key: group.key.clone(),
                doc,
                consumed,
                archivable,
                carried_prior,
            }),
            issues,
        )
    }
}

/// Executes Phase 3 over every aligned group.
pub fn execute(
    config: &CorpusConfig,
    groups: &[FragmentGroup<LoadedFragment>],
    alignment: &Alignment,
) -> Result<Merging> {
    let merger = Merger::new(config)?;
    let mut merging = Merging::default();
    for (group, aligned) in groups.iter().zip(&alignment.groups) {
        let prior = match prior_aggregate(config, &group.key) {
            Ok(prior) => prior,
            Err(e) => {
                let name = format!("{}{}", group.key, defaults::MERGED_SUFFIX);
                merging.issues.push(Issue::raise(
                    IssueKind::UnreadableFragment,
                    name.clone(),
                    e.to_string(),
                ));
                merging.issues.push(Issue::raise(
                    IssueKind::LossDetected,
                    name,
                    "existing aggregate cannot be read; group left unmerged",
                ));
                continue;
            }
        };
        let (merged, issues) = merger.merge_group_onto(group, aligned, prior.as_ref());
        merging.issues.extend(issues);
        if let Some(merged) = merged {
            merging.groups.push(merged);
        }
    }
    info!(
        "Merged {} groups, {} publications",
        merging.groups.len(),
        merging.publication_count()
    );
    Ok(merging)
}

/// The aggregate an earlier run wrote for `key`, if any.
pub fn prior_aggregate(config: &CorpusConfig, key: &str) -> Result<Option<FragmentDoc>> {
    let path = config
        .base_dir
        .join(format!("{}{}", key, defaults::MERGED_SUFFIX));
    if !path.is_file() {
        return Ok(None);
    }
    FragmentDoc::from_path(&path).map(Some)
}

/// Stages every aggregate as `{group}_merged.json`, relative to the base
/// directory.
pub fn stage(merging: &Merging, fs: &mut MemoryFS) -> Result<()> {
    for group in &merging.groups {
        fs.add_file_string(Path::new(&group.file_name()), &to_pretty_json(&group.doc)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlignMode;
    use crate::phases::alignment::Matcher;
    use crate::phases::discovery::{Fragment, FragmentKey, Variant};

    fn publication(idx: Option<i64>, title: &str, content: &str) -> Publication {
        Publication {
            title: title.to_string(),
            pub_idx: idx,
            publication_title: title.to_string(),
            content: content.to_string(),
            date: "1950".to_string(),
            ..Default::default()
        }
    }

    fn translation(idx: Option<i64>, title_pt: &str, content_pt: &str) -> Publication {
        Publication {
            title_ptbr: Some(title_pt.to_string()),
            pub_idx: idx,
            publication_title_ptbr: Some(title_pt.to_string()),
            content_ptbr: Some(content_pt.to_string()).filter(|c| !c.is_empty()),
            has_translation: true,
            ..Default::default()
        }
    }

    fn fragment(part: u32, variant: Variant, pubs: Vec<Publication>) -> LoadedFragment {
        let suffix = if variant == Variant::Translated { "_pt" } else { "" };
        let name = format!("01_V_02_T_parte{:02}{}.json", part, suffix);
        LoadedFragment {
            fragment: Fragment {
                path: PathBuf::from(&name),
                name,
                key: FragmentKey {
                    group: "01_V_02_T".to_string(),
                    part,
                    part_label: format!("{:02}", part),
                    variant,
                },
            },
            doc: FragmentDoc {
                publications: pubs,
                ..Default::default()
            },
        }
    }

    fn merger(orphans: OrphanPolicy) -> Merger {
        let config = CorpusConfig {
            orphans,
            ..CorpusConfig::default()
        };
        Merger::new(&config).unwrap()
    }

    #[test]
    fn test_field_precedence() {
        let original = Publication {
            title: "A".to_string(),
            content: "jp-text".to_string(),
            title_ptbr: Some("stale".to_string()),
            pub_idx: Some(1),
            ..Default::default()
        };
        let translated = Publication {
            title: "ignored".to_string(),
            title_ptbr: Some("A-pt".to_string()),
            content: "ignored".to_string(),
            content_ptbr: Some("pt-text".to_string()),
            pub_idx: Some(1),
            has_translation: false,
            ..Default::default()
        };
        let merged = Merger::merge_publication(Some(&original), &translated);
        assert_eq!(merged.title, "A");
        assert_eq!(merged.title_ptbr.as_deref(), Some("A-pt"));
        assert_eq!(merged.content, "jp-text");
        assert_eq!(merged.content_ptbr.as_deref(), Some("pt-text"));
        assert!(merged.has_translation);
    }

    #[test]
    fn test_pair_by_pub_idx_then_position() {
        let source = FragmentDoc {
            publications: vec![
                publication(Some(10), "first", "c1"),
                publication(Some(20), "second", "c2"),
                publication(None, "third", "c3"),
            ],
            ..Default::default()
        };
        let translated = fragment(
            1,
            Variant::Translated,
            vec![
                translation(Some(20), "segundo", "p2"),
                translation(Some(10), "primeiro", "p1"),
                translation(None, "terceiro", "p3"),
            ],
        );
        let (pubs, unmatched, _) = merger(OrphanPolicy::KeepAside).merge_pair(Some(&source), &translated);
        assert_eq!(unmatched, 0);
        assert_eq!(pubs[0].content, "c2");
        assert_eq!(pubs[1].content, "c1");
        assert_eq!(pubs[2].content, "c3");
        assert_eq!(pubs[2].title_ptbr.as_deref(), Some("terceiro"));
    }

    #[test]
    fn test_integrity_warning_does_not_block() {
        let source = FragmentDoc {
            publications: vec![publication(Some(1), "御神書", "c")],
            ..Default::default()
        };
        let mut tr = translation(Some(1), "Escrita Divina (Orig.: 御 神 業)", "p");
        tr.original_title = None;
        let translated = fragment(1, Variant::Translated, vec![tr]);

        testing_logger::setup();
        let (pubs, _, issues) = merger(OrphanPolicy::KeepAside).merge_pair(Some(&source), &translated);
        assert_eq!(pubs.len(), 1);
        assert_eq!(pubs[0].content_ptbr.as_deref(), Some("p"));
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueKind::AlignmentIntegrityWarning));
        testing_logger::validate(|logs| {
            assert!(logs
                .iter()
                .any(|l| l.level == log::Level::Warn && l.body.contains("御 神 業")));
        });
    }

    #[test]
    fn test_self_reported_title_whitespace_is_ignored() {
        let source = FragmentDoc {
            publications: vec![publication(Some(1), "御神書", "c")],
            ..Default::default()
        };
        let mut tr = translation(Some(1), "Escrita", "p");
        tr.original_title = Some(" 御 神 書 ".to_string());
        let translated = fragment(1, Variant::Translated, vec![tr]);
        let (_, _, issues) = merger(OrphanPolicy::KeepAside).merge_pair(Some(&source), &translated);
        assert!(issues
            .iter()
            .all(|i| i.kind != IssueKind::AlignmentIntegrityWarning));
    }

    #[test]
    fn test_group_concatenates_by_part_and_counts() {
        let mut group = FragmentGroup::new("01_V_02_T");
        for (part, n) in [(1u32, 5usize), (2, 7), (3, 4)] {
            let originals = (0..n)
                .map(|i| publication(Some(i as i64), &format!("t{}-{}", part, i), "jp"))
                .collect();
            let translated = (0..n)
                .map(|i| translation(Some(i as i64), &format!("p{}-{}", part, i), "pt"))
                .collect();
            group.originals.push(fragment(part, Variant::Original, originals));
            group.translated.push(fragment(part, Variant::Translated, translated));
        }
        // Out-of-order translated listing must not change the output order.
        group.translated.swap(0, 2);

        let (aligned, _) = Matcher::with_mode(AlignMode::KeyFirst).align_group(&group);
        let (merged, _) = merger(OrphanPolicy::KeepAside).merge_group(&group, &aligned);
        let merged = merged.unwrap();
        assert_eq!(merged.doc.publications.len(), 16);
        assert_eq!(merged.doc.total_publications, Some(16));
        assert_eq!(merged.doc.publications[0].title, "t1-0");
        assert_eq!(merged.doc.publications[15].title, "t3-3");
        assert!(merged.archivable);
        assert_eq!(merged.consumed.originals.len(), 3);
        assert_eq!(merged.file_name(), "01_V_02_T_merged.json");
    }

    fn pair_group(parts: &[(u32, usize)]) -> FragmentGroup<LoadedFragment> {
        let mut group = FragmentGroup::new("01_V_02_T");
        for &(part, n) in parts {
            let originals = (0..n)
                .map(|i| publication(Some(i as i64), &format!("t{}-{}", part, i), "jp"))
                .collect();
            let translated = (0..n)
                .map(|i| translation(Some(i as i64), &format!("p{}-{}", part, i), "pt"))
                .collect();
            group.originals.push(fragment(part, Variant::Original, originals));
            group.translated.push(fragment(part, Variant::Translated, translated));
        }
        group
    }

    fn earlier_aggregate(layout: &[(u32, usize)]) -> FragmentDoc {
        let mut doc = FragmentDoc {
            volume: "V".to_string(),
            theme_name: "T".to_string(),
            ..Default::default()
        };
        for &(part, n) in layout {
            doc.parts.push(PartSpan { part, publications: n });
            doc.publications.extend(
                (0..n).map(|i| publication(Some(i as i64), &format!("old{}-{}", part, i), "jp")),
            );
        }
        doc
    }

    #[test]
    fn test_earlier_parts_are_kept() {
        let group = pair_group(&[(2, 2)]);
        let prior = earlier_aggregate(&[(1, 3), (2, 1)]);

        let (aligned, _) = Matcher::with_mode(AlignMode::KeyFirst).align_group(&group);
        let (merged, issues) =
            merger(OrphanPolicy::KeepAside).merge_group_onto(&group, &aligned, Some(&prior));
        let merged = merged.unwrap();

        let titles: Vec<&str> = merged.doc.publications.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["old1-0", "old1-1", "old1-2", "t2-0", "t2-1"]);
        assert_eq!(
            merged.doc.parts,
            [
                PartSpan { part: 1, publications: 3 },
                PartSpan { part: 2, publications: 2 }
            ]
        );
        assert_eq!(merged.doc.total_publications, Some(5));
        assert_eq!(merged.carried_prior, 3);
        assert!(merged.consumed.originals.iter().all(|p| !p.ends_with("01_V_02_T_merged.json")));
        assert!(!issues.iter().any(|i| i.kind == IssueKind::LossDetected));
    }

    #[test]
    fn test_shrinking_aggregate_is_loss() {
        let group = pair_group(&[(2, 2)]);
        let (aligned, _) = Matcher::with_mode(AlignMode::KeyFirst).align_group(&group);

        // No layout: nothing can be carried, so the replacement is smaller.
        let mut unlaid = earlier_aggregate(&[(1, 3), (2, 1)]);
        unlaid.parts.clear();
        let (merged, issues) =
            merger(OrphanPolicy::KeepAside).merge_group_onto(&group, &aligned, Some(&unlaid));
        assert_eq!(merged.unwrap().carried_prior, 0);
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueKind::LossDetected && i.fragment == "01_V_02_T_merged.json"));

        // Re-merging a part with fewer publications than before.
        let (merged, issues) = merger(OrphanPolicy::KeepAside).merge_group_onto(
            &group,
            &aligned,
            Some(&earlier_aggregate(&[(2, 4)])),
        );
        assert_eq!(merged.unwrap().doc.publications.len(), 2);
        assert!(issues.iter().any(|i| i.kind == IssueKind::LossDetected));
    }

    #[test]
    fn test_earlier_aggregate_alone_is_not_rewritten() {
        let mut group = pair_group(&[]);
        group.originals.push(fragment(3, Variant::Original, vec![publication(Some(0), "x", "jp")]));
        let (aligned, _) = Matcher::with_mode(AlignMode::KeyFirst).align_group(&group);
        let prior = earlier_aggregate(&[(1, 2)]);
        let (merged, _) =
            merger(OrphanPolicy::KeepAside).merge_group_onto(&group, &aligned, Some(&prior));
        assert!(merged.is_none());
    }

    #[test]
    fn test_metadata_fallback_from_group_key() {
        let mut group = FragmentGroup::new("01_V_02_T");
        group.originals.push(fragment(1, Variant::Original, vec![publication(Some(0), "a", "jp")]));
        group.translated.push(fragment(1, Variant::Translated, vec![translation(Some(0), "a", "pt")]));
        let (aligned, _) = Matcher::with_mode(AlignMode::KeyFirst).align_group(&group);
        let (merged, issues) = merger(OrphanPolicy::KeepAside).merge_group(&group, &aligned);
        let merged = merged.unwrap();
        assert_eq!(merged.doc.volume, "V");
        assert_eq!(merged.doc.theme_name, "T");
        assert!(issues.iter().any(|i| i.kind == IssueKind::MetadataFallback));
    }

    #[test]
    fn test_metadata_prefers_translation() {
        let mut group = FragmentGroup::new("01_V_02_T");
        let mut original = fragment(1, Variant::Original, vec![publication(Some(0), "a", "jp")]);
        original.doc.volume = "Vol".to_string();
        original.doc.theme_name = "Tema".to_string();
        let mut translated = fragment(1, Variant::Translated, vec![translation(Some(0), "a", "pt")]);
        translated.doc.theme_name_ptbr = Some("Tema-pt".to_string());
        group.originals.push(original);
        group.translated.push(translated);

        let (aligned, _) = Matcher::with_mode(AlignMode::KeyFirst).align_group(&group);
        let (merged, issues) = merger(OrphanPolicy::KeepAside).merge_group(&group, &aligned);
        let doc = merged.unwrap().doc;
        assert_eq!(doc.volume, "Vol");
        assert_eq!(doc.theme_name_ptbr.as_deref(), Some("Tema-pt"));
        assert!(issues.iter().all(|i| i.kind != IssueKind::MetadataFallback));
    }

    #[test]
    fn test_orphans_kept_aside_or_merged_empty() {
        let mut group = FragmentGroup::new("01_V_02_T");
        group.originals.push(fragment(1, Variant::Original, vec![publication(Some(0), "a", "jp")]));
        group.translated.push(fragment(1, Variant::Translated, vec![translation(Some(0), "a", "pt")]));
        group.translated.push(fragment(2, Variant::Translated, vec![translation(Some(0), "zzz", "pt")]));
        let (aligned, _) = Matcher::with_mode(AlignMode::KeyFirst).align_group(&group);
        assert_eq!(aligned.orphans, vec![1]);

        let (kept, _) = merger(OrphanPolicy::KeepAside).merge_group(&group, &aligned);
        let kept = kept.unwrap();
        assert_eq!(kept.doc.publications.len(), 1);
        assert!(!kept.archivable);

        let (merged, issues) = merger(OrphanPolicy::MergeEmpty).merge_group(&group, &aligned);
        let merged = merged.unwrap();
        assert_eq!(merged.doc.publications.len(), 2);
        assert_eq!(merged.doc.publications[1].content, "");
        assert!(!merged.archivable);
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueKind::EmptyOriginalAfterMerge));
    }

    #[test]
    fn test_group_without_translations_is_skipped() {
        let mut group = FragmentGroup::new("g");
        group.originals.push(fragment(1, Variant::Original, vec![publication(Some(0), "a", "jp")]));
        let (aligned, _) = Matcher::with_mode(AlignMode::KeyFirst).align_group(&group);
        let (merged, _) = merger(OrphanPolicy::KeepAside).merge_group(&group, &aligned);
        assert!(merged.is_none());
    }

    #[test]
    fn test_stage_writes_aggregate() {
        let merging = Merging {
            groups: vec![MergedGroup {
                key: "g".to_string(),
                doc: FragmentDoc::default(),
                consumed: Consumed::default(),
                archivable: true,
                carried_prior: 0,
            }],
            issues: vec![],
        };
        let mut fs = MemoryFS::new();
        stage(&merging, &mut fs).unwrap();
        assert!(fs.exists("g_merged.json"));
    }
}
