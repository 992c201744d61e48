//! # Tree Command Implementation
//!
//! Displays the corpus file as a hierarchy: volumes, themes, title groups
//! and publications, each with its translated name when there is one.
//! `--depth` limits how far down the tree is printed.
//!
//! This command is read-only.

use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};

use corpus_reconcile::config::CorpusConfig;
use corpus_reconcile::model::{Corpus, Publication, Theme, TitleGroup, Volume};
use corpus_reconcile::output::{emoji, OutputConfig};

/// Display the corpus hierarchy
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Corpus file to display (defaults to the configured corpus file)
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Maximum depth to display.
    ///
    /// 1 shows volumes, 2 themes, 3 title groups, 4 publications.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,
}

pub fn execute(args: TreeArgs, config: &CorpusConfig, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let path = args.file.unwrap_or_else(|| config.corpus_path());
    println!("{} Corpus tree for: {}", emoji(&out, "🌳", "[TREE]"), path.display());

    let corpus = Corpus::from_path(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load corpus from {}: {}", path.display(), e))?;

    let root = corpus_node(&corpus, path.display().to_string(), args.depth.unwrap_or(usize::MAX));
    print_tree(&root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

fn bilingual(original: &str, translated: Option<&str>) -> String {
    match translated {
        Some(t) if t != original => format!("{} / {}", original, t),
        _ => original.to_string(),
    }
}

fn corpus_node(corpus: &Corpus, label: String, max_depth: usize) -> TreeNode {
    TreeNode::limited(label, max_depth, 0, || {
        corpus
            .volumes
            .iter()
            .map(|v| volume_node(v, max_depth))
            .collect()
    })
}

fn volume_node(volume: &Volume, max_depth: usize) -> TreeNode {
    let label = bilingual(&volume.volume, Some(&volume.volume_ptbr));
    TreeNode::limited(label, max_depth, 1, || {
        volume
            .themes
            .iter()
            .map(|t| theme_node(t, max_depth))
            .collect()
    })
}

fn theme_node(theme: &Theme, max_depth: usize) -> TreeNode {
    let label = bilingual(&theme.theme, theme.theme_ptbr.as_deref());
    TreeNode::limited(label, max_depth, 2, || {
        theme
            .titles
            .iter()
            .map(|g| title_node(g, max_depth))
            .collect()
    })
}

fn title_node(group: &TitleGroup, max_depth: usize) -> TreeNode {
    let label = format!(
        "{} [{}]",
        bilingual(&group.title, group.title_ptbr.as_deref()),
        group.publications.len()
    );
    TreeNode::limited(label, max_depth, 3, || {
        group.publications.iter().map(publication_node).collect()
    })
}

fn publication_node(publication: &Publication) -> TreeNode {
    let mut label = bilingual(
        &publication.publication_title,
        publication.publication_title_ptbr.as_deref(),
    );
    if !publication.date.is_empty() {
        label = format!("{} ({})", label, publication.date);
    }
    if !publication.has_translation {
        label.push_str(" *untranslated*");
    }
    TreeNode {
        label,
        children: vec![],
    }
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    /// Node at `depth` whose children are only built below `max_depth`.
    fn limited<F>(label: String, max_depth: usize, depth: usize, children: F) -> Self
    where
        F: FnOnce() -> Vec<TreeNode>,
    {
        let children = if depth >= max_depth { vec![] } else { children() };
        TreeNode { label, children }
    }
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}
