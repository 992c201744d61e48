//! Phase 4: Tree Building
//!
//! Folds flat per-theme publication streams into the nested
//! corpus -> volume -> theme -> title group -> publication tree.
//!
//! ## Rules
//!
//! - A title group starts whenever a publication's `title` differs from the
//!   previous one (plain string equality). Two separate runs of the same title
//!   become two groups.
//! - Each input stream becomes one theme, appended to its volume in input
//!   order.
//! - Volumes are sorted by their source-language name. Their translated name
//!   comes from the configured volume table.
//!
//! The tree is never patched: [`execute`] rebuilds it from every
//! `*_merged.json` aggregate in the base directory, in file-name order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glob::Pattern;
use log::{debug, info};

use super::discovery::NamePattern;
use crate::audit::{Issue, IssueKind};
use crate::config::{CorpusConfig, VolumeNames};
use crate::defaults;
use crate::error::Result;
use crate::filesystem::MemoryFS;
use crate::model::{to_pretty_json, Corpus, FragmentDoc, Publication, Theme, ThemeRecords, TitleGroup, Volume};

/// Splits a publication stream into runs of equal titles.
pub fn group_by_title(publications: Vec<Publication>) -> Vec<TitleGroup> {
    let mut groups: Vec<TitleGroup> = Vec::new();
    for publication in publications {
        match groups.last_mut() {
            Some(current) if current.title == publication.title => {
                current.publications.push(publication);
            }
            _ => groups.push(TitleGroup {
                title: publication.title.clone(),
                title_ptbr: publication.title_ptbr.clone(),
                publications: vec![publication],
            }),
        }
    }
    groups
}

/// Accumulates themes into volumes.
#[derive(Debug)]
pub struct TreeBuilder<'a> {
    names: &'a VolumeNames,
    volumes: BTreeMap<String, Vec<Theme>>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(names: &'a VolumeNames) -> Self {
        Self {
            names,
            volumes: BTreeMap::new(),
        }
    }

    pub fn add_theme(&mut self, records: ThemeRecords) {
        let theme = Theme {
            theme: records.theme,
            theme_ptbr: records.theme_ptbr,
            titles: group_by_title(records.publications),
        };
        self.volumes.entry(records.volume).or_default().push(theme);
    }

    pub fn build(self) -> Corpus {
        let names = self.names;
        Corpus {
            volumes: self
                .volumes
                .into_iter()
                .map(|(volume, themes)| Volume {
                    volume_ptbr: names.translate(&volume).to_string(),
                    volume,
                    themes,
                })
                .collect(),
        }
    }
}

/// Builds a tree from theme streams in one go.
pub fn build<I>(names: &VolumeNames, records: I) -> Corpus
where
    I: IntoIterator<Item = ThemeRecords>,
{
    let mut builder = TreeBuilder::new(names);
    for theme in records {
        builder.add_theme(theme);
    }
    builder.build()
}

/// Result of a full rebuild from aggregates.
#[derive(Debug, Clone, Default)]
pub struct Rebuilt {
    pub corpus: Corpus,
    /// Aggregate file names, in the order they were folded in.
    pub aggregates: Vec<String>,
    pub aggregate_publications: usize,
    pub issues: Vec<Issue>,
}

/// Lists `*_merged.json` aggregates in `base_dir`, sorted by file name.
pub fn aggregate_paths(base_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*{}",
        Pattern::escape(&base_dir.to_string_lossy()),
        defaults::MERGED_SUFFIX
    );
    let mut paths = Vec::new();
    for entry in glob::glob(&pattern)? {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => debug!("Skipping unreadable entry: {}", e),
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Executes Phase 4: rebuild the corpus from every aggregate on disk,
/// with `staged` aggregates taking precedence over files of the same name.
pub fn execute(config: &CorpusConfig, staged: &MemoryFS) -> Result<Rebuilt> {
    let names = NamePattern::new()?;
    let mut rebuilt = Rebuilt::default();
    let mut sources: BTreeMap<String, std::result::Result<FragmentDoc, String>> = BTreeMap::new();

    if config.base_dir.is_dir() {
        for path in aggregate_paths(&config.base_dir)? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            sources.insert(name, FragmentDoc::from_path(&path).map_err(|e| e.to_string()));
        }
    }
    for (path, file) in staged.files() {
        let name = path.to_string_lossy().into_owned();
        if !name.ends_with(defaults::MERGED_SUFFIX) || path.components().count() != 1 {
            continue;
        }
        let doc = file
            .as_str()
            .and_then(|json| FragmentDoc::parse(json, &name))
            .map_err(|e| e.to_string());
        sources.insert(name, doc);
    }

    let mut builder = TreeBuilder::new(&config.volume_names);
    for (name, doc) in sources {
        let mut doc = match doc {
            Ok(doc) => doc,
            Err(message) => {
                rebuilt
                    .issues
                    .push(Issue::raise(IssueKind::UnreadableFragment, name, message));
                continue;
            }
        };
        if !doc.has_metadata() {
            let key = name.trim_end_matches(defaults::MERGED_SUFFIX);
            if let Some((volume, theme)) = names.group_metadata(key) {
                rebuilt.issues.push(Issue::raise(
                    IssueKind::MetadataFallback,
                    name.clone(),
                    format!("volume and theme taken from the file name: '{}' / '{}'", volume, theme),
                ));
                if doc.volume.is_empty() {
                    doc.volume = volume;
                }
                if doc.theme_name.is_empty() {
                    doc.theme_name = theme;
                }
            }
        }
        rebuilt.aggregate_publications += doc.publications.len();
        builder.add_theme(ThemeRecords::from_doc(doc));
        rebuilt.aggregates.push(name);
    }
    rebuilt.corpus = builder.build();

    info!(
        "Rebuilt corpus from {} aggregates ({} publications)",
        rebuilt.aggregates.len(),
        rebuilt.aggregate_publications
    );
    Ok(rebuilt)
}

/// Stages the corpus at the configured path, relative to the base directory.
pub fn stage(config: &CorpusConfig, corpus: &Corpus, fs: &mut MemoryFS) -> Result<()> {
    fs.add_file_string(&config.corpus_file, &to_pretty_json(corpus)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visit;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn titled(titles: &[&str]) -> Vec<Publication> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| Publication {
                title: t.to_string(),
                pub_idx: Some(i as i64),
                ..Default::default()
            })
            .collect()
    }

    fn records(volume: &str, theme: &str, titles: &[&str]) -> ThemeRecords {
        ThemeRecords {
            volume: volume.to_string(),
            theme: theme.to_string(),
            theme_ptbr: None,
            publications: titled(titles),
        }
    }

    #[test]
    fn test_adjacency_grouping() {
        let groups = group_by_title(titled(&["A", "A", "B", "A"]));
        let shape: Vec<(&str, usize)> = groups
            .iter()
            .map(|g| (g.title.as_str(), g.publications.len()))
            .collect();
        assert_eq!(shape, vec![("A", 2), ("B", 1), ("A", 1)]);
    }

    #[test]
    fn test_grouping_is_not_normalized() {
        assert_eq!(group_by_title(titled(&["A", "A ", "a"])).len(), 3);
        assert!(group_by_title(Vec::new()).is_empty());
    }

    #[test]
    fn test_group_title_ptbr_comes_from_first_publication() {
        let mut pubs = titled(&["A", "A"]);
        pubs[0].title_ptbr = Some("A-pt".to_string());
        pubs[1].title_ptbr = Some("A-pt (2)".to_string());
        assert_eq!(group_by_title(pubs)[0].title_ptbr.as_deref(), Some("A-pt"));
    }

    #[test]
    fn test_volumes_sorted_and_translated() {
        let names = VolumeNames::default();
        let corpus = build(
            &names,
            vec![
                records("4.その他", "T1", &["A"]),
                records("3.信仰編", "T2", &["B"]),
                records("4.その他", "T3", &["C"]),
                records("9.未知", "T4", &["D"]),
            ],
        );
        let volumes: Vec<&str> = corpus.volumes.iter().map(|v| v.volume.as_str()).collect();
        assert_eq!(volumes, vec!["3.信仰編", "4.その他", "9.未知"]);
        assert_eq!(corpus.volumes[0].volume_ptbr, "3. Seção da Fé");
        assert_eq!(corpus.volumes[2].volume_ptbr, "9.未知");
        let themes: Vec<&str> = corpus.volumes[1].themes.iter().map(|t| t.theme.as_str()).collect();
        assert_eq!(themes, vec!["T1", "T3"]);
    }

    #[test]
    fn test_execute_reads_aggregates_and_prefers_staged() {
        let temp = TempDir::new().unwrap();
        let config = CorpusConfig::with_base_dir(temp.path());
        let doc = |theme: &str, n: usize| FragmentDoc {
            volume: "V".to_string(),
            theme_name: theme.to_string(),
            publications: titled(&vec!["A"; n]),
            ..Default::default()
        };
        fs::write(
            temp.path().join("02_V_01_B_merged.json"),
            to_pretty_json(&doc("B", 2)).unwrap(),
        )
        .unwrap();
        fs::write(
            temp.path().join("01_V_01_A_merged.json"),
            to_pretty_json(&doc("A-old", 1)).unwrap(),
        )
        .unwrap();
        fs::write(temp.path().join("broken_merged.json"), "[").unwrap();
        fs::write(temp.path().join("corpus.json"), "[]").unwrap();

        let mut staged = MemoryFS::new();
        staged
            .add_file_string("01_V_01_A_merged.json", &to_pretty_json(&doc("A", 3)).unwrap())
            .unwrap();

        let rebuilt = execute(&config, &staged).unwrap();
        assert_eq!(
            rebuilt.aggregates,
            vec!["01_V_01_A_merged.json", "02_V_01_B_merged.json"]
        );
        assert_eq!(rebuilt.aggregate_publications, 5);
        assert_eq!(rebuilt.corpus.volumes[0].themes[0].theme, "A");
        assert_eq!(rebuilt.issues.len(), 1);
        assert_eq!(rebuilt.issues[0].kind, IssueKind::UnreadableFragment);
    }

    #[test]
    fn test_execute_falls_back_to_file_name_metadata() {
        let temp = TempDir::new().unwrap();
        let config = CorpusConfig::with_base_dir(temp.path());
        let doc = FragmentDoc {
            publications: titled(&["A"]),
            ..Default::default()
        };
        fs::write(
            temp.path().join("01_3.信仰編_04_心得_merged.json"),
            to_pretty_json(&doc).unwrap(),
        )
        .unwrap();

        let rebuilt = execute(&config, &MemoryFS::new()).unwrap();
        assert_eq!(rebuilt.corpus.volumes[0].volume, "3.信仰編");
        assert_eq!(rebuilt.corpus.volumes[0].themes[0].theme, "心得");
        assert_eq!(rebuilt.issues[0].kind, IssueKind::MetadataFallback);
    }

    #[test]
    fn test_stage_uses_configured_corpus_path() {
        let mut config = CorpusConfig::default();
        config.corpus_file = PathBuf::from("../corpus.json");
        let mut fs = MemoryFS::new();
        stage(&config, &Corpus::default(), &mut fs).unwrap();
        assert_eq!(
            fs.get_file("../corpus.json").unwrap().as_str().unwrap(),
            "[]\n"
        );
    }

    fn arb_records() -> impl Strategy<Value = Vec<ThemeRecords>> {
        let theme = (
            prop::sample::select(vec!["V1", "V2", "V3"]),
            "[a-z]{1,4}",
            prop::collection::vec(prop::sample::select(vec!["A", "B", "C"]), 0..12),
        )
            .prop_map(|(volume, theme, titles)| records(volume, &theme, &titles));
        prop::collection::vec(theme, 0..8)
    }

    proptest! {
        #[test]
        fn prop_tree_holds_every_publication(input in arb_records()) {
            let expected: usize = input.iter().map(|r| r.publications.len()).sum();
            let corpus = build(&VolumeNames::default(), input);
            prop_assert_eq!(visit::count(&corpus).publications, expected);
        }

        #[test]
        fn prop_flatten_then_rebuild_is_identity(input in arb_records()) {
            let names = VolumeNames::default();
            let corpus = build(&names, input);
            let rebuilt = build(&names, visit::flatten(&corpus));
            prop_assert_eq!(rebuilt, corpus);
        }

        #[test]
        fn prop_adjacent_groups_differ(
            titles in prop::collection::vec(prop::sample::select(vec!["A", "B"]), 0..20),
        ) {
            let groups = group_by_title(titled(&titles));
            for pair in groups.windows(2) {
                prop_assert_ne!(&pair[0].title, &pair[1].title);
            }
        }
    }
}
