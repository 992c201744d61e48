//! Visitor over the corpus tree.
//!
//! The node set is closed: [`Corpus`], [`Volume`], [`Theme`], [`TitleGroup`]
//! and [`Publication`]. Implementors override the hooks they care about and
//! call the matching `walk_*` function to keep descending.

use crate::model::{Corpus, Publication, Theme, ThemeRecords, TitleGroup, Volume};

pub trait Visitor {
    fn visit_corpus(&mut self, corpus: &Corpus) {
        walk_corpus(self, corpus);
    }

    fn visit_volume(&mut self, volume: &Volume) {
        walk_volume(self, volume);
    }

    fn visit_theme(&mut self, _volume: &Volume, theme: &Theme) {
        walk_theme(self, theme);
    }

    fn visit_title_group(&mut self, group: &TitleGroup) {
        walk_title_group(self, group);
    }

    fn visit_publication(&mut self, _publication: &Publication) {}
}

pub fn walk_corpus<V: Visitor + ?Sized>(visitor: &mut V, corpus: &Corpus) {
    for volume in &corpus.volumes {
        visitor.visit_volume(volume);
    }
}

pub fn walk_volume<V: Visitor + ?Sized>(visitor: &mut V, volume: &Volume) {
    for theme in &volume.themes {
        visitor.visit_theme(volume, theme);
    }
}

pub fn walk_theme<V: Visitor + ?Sized>(visitor: &mut V, theme: &Theme) {
    for group in &theme.titles {
        visitor.visit_title_group(group);
    }
}

pub fn walk_title_group<V: Visitor + ?Sized>(visitor: &mut V, group: &TitleGroup) {
    for publication in &group.publications {
        visitor.visit_publication(publication);
    }
}

/// Node totals of a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub volumes: usize,
    pub themes: usize,
    pub title_groups: usize,
    pub publications: usize,
    pub without_original: usize,
    pub without_translation: usize,
}

impl Visitor for Counts {
    fn visit_volume(&mut self, volume: &Volume) {
        self.volumes += 1;
        walk_volume(self, volume);
    }

    fn visit_theme(&mut self, _volume: &Volume, theme: &Theme) {
        self.themes += 1;
        walk_theme(self, theme);
    }

    fn visit_title_group(&mut self, group: &TitleGroup) {
        self.title_groups += 1;
        walk_title_group(self, group);
    }

    fn visit_publication(&mut self, publication: &Publication) {
        self.publications += 1;
        if publication.lacks_original_content() {
            self.without_original += 1;
        }
        if !publication.has_target_content() {
            self.without_translation += 1;
        }
    }
}

/// Counts every node of `corpus`.
pub fn count(corpus: &Corpus) -> Counts {
    let mut counts = Counts::default();
    counts.visit_corpus(corpus);
    counts
}

/// Collects the flat per-theme streams back out of a tree.
#[derive(Debug, Default)]
struct Flatten {
    records: Vec<ThemeRecords>,
}

impl Visitor for Flatten {
    fn visit_theme(&mut self, volume: &Volume, theme: &Theme) {
        self.records.push(ThemeRecords {
            volume: volume.volume.clone(),
            theme: theme.theme.clone(),
            theme_ptbr: theme.theme_ptbr.clone(),
            publications: Vec::new(),
        });
        walk_theme(self, theme);
    }

    fn visit_publication(&mut self, publication: &Publication) {
        if let Some(current) = self.records.last_mut() {
            current.publications.push(publication.clone());
        }
    }
}

/// Flattens a tree into ordered theme streams.
///
/// Rebuilding the result with the same volume table reproduces `corpus`.
pub fn flatten(corpus: &Corpus) -> Vec<ThemeRecords> {
    let mut flatten = Flatten::default();
    flatten.visit_corpus(corpus);
    flatten.records
}
