//! # Document Model
//!
//! Typed records for everything the engine reads and writes.
//!
//! - [`Publication`] is the atomic bilingual unit. It is the same shape in
//!   original fragments, translated fragments, merged aggregates and the
//!   rebuilt corpus.
//! - [`FragmentDoc`] is the on-disk document of a fragment or of a merged
//!   per-theme aggregate.
//! - [`ThemeRecords`] is the flat, ordered publication stream of one theme. It
//!   is what the merger produces and what the tree builder consumes.
//! - [`Corpus`], [`Volume`], [`Theme`] and [`TitleGroup`] form the nested tree.
//!
//! Target-language fields are `Option<String>`: absent, `null` and `""` all
//! decode to `None`, and `None` is written back as `""` so the output schema
//! keeps every key.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serde adapter for optional target-language text.
pub mod ptbr {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|s| !s.is_empty()))
    }
}

/// Serde adapter for source-language text that may be `null` upstream.
mod text {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
    }
}

/// A single bilingual publication record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    #[serde(default, deserialize_with = "text::deserialize")]
    pub title: String,
    #[serde(default, with = "ptbr")]
    pub title_ptbr: Option<String>,
    /// Stable identity within the owning fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_idx: Option<i64>,
    #[serde(default, deserialize_with = "text::deserialize")]
    pub publication_title: String,
    #[serde(default, with = "ptbr")]
    pub publication_title_ptbr: Option<String>,
    #[serde(default, deserialize_with = "text::deserialize")]
    pub content: String,
    #[serde(default, with = "ptbr")]
    pub content_ptbr: Option<String>,
    #[serde(default, deserialize_with = "text::deserialize")]
    pub date: String,
    #[serde(default)]
    pub has_translation: bool,
    /// Original title as asserted by the translator, when it recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
}

impl Publication {
    /// True when the target-language body has non-whitespace content.
    pub fn has_target_content(&self) -> bool {
        self.content_ptbr
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }

    /// True when the source-language body is empty or whitespace.
    pub fn lacks_original_content(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Recomputes `has_translation` from the target content.
    pub fn refresh_translation_flag(&mut self) {
        self.has_translation = self.has_target_content();
    }
}

/// A fragment or merged aggregate document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default, deserialize_with = "text::deserialize")]
    pub volume: String,
    #[serde(default, deserialize_with = "text::deserialize")]
    pub theme_name: String,
    #[serde(default, with = "ptbr")]
    pub theme_name_ptbr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_publications: Option<usize>,
    /// Part layout of an aggregate: consecutive runs of `publications`, one
    /// per merged part, in order. Empty for plain fragments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<PartSpan>,
    #[serde(default)]
    pub publications: Vec<Publication>,
}

/// A run of aggregate publications that came from one part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSpan {
    pub part: u32,
    pub publications: usize,
}

impl FragmentDoc {
    /// Decodes a document from JSON text.
    pub fn parse(json: &str, origin: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::FragmentParse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Reads and decodes a document from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FragmentParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Whether the document names both its volume and its theme.
    pub fn has_metadata(&self) -> bool {
        !self.volume.is_empty() && !self.theme_name.is_empty()
    }

    /// Splits the publications along `parts`. `None` when the layout is
    /// missing or does not cover the publications exactly.
    pub fn part_runs(&self) -> Option<Vec<(u32, &[Publication])>> {
        if self.parts.is_empty() {
            return None;
        }
        let mut runs = Vec::with_capacity(self.parts.len());
        let mut start = 0;
        for span in &self.parts {
            let end = start + span.publications;
            runs.push((span.part, self.publications.get(start..end)?));
            start = end;
        }
        (start == self.publications.len()).then_some(runs)
    }

    /// Publication titles in fragment order.
    pub fn publication_titles(&self) -> Vec<&str> {
        self.publications
            .iter()
            .map(|p| p.publication_title.as_str())
            .collect()
    }
}

/// The flat, ordered publication stream of one (volume, theme).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeRecords {
    pub volume: String,
    pub theme: String,
    pub theme_ptbr: Option<String>,
    pub publications: Vec<Publication>,
}

impl ThemeRecords {
    /// Takes the stream out of a merged aggregate.
    pub fn from_doc(doc: FragmentDoc) -> Self {
        Self {
            volume: doc.volume,
            theme: doc.theme_name,
            theme_ptbr: doc.theme_name_ptbr,
            publications: doc.publications,
        }
    }
}

/// Run of adjacent publications sharing one title string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleGroup {
    pub title: String,
    #[serde(default, with = "ptbr")]
    pub title_ptbr: Option<String>,
    pub publications: Vec<Publication>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub theme: String,
    #[serde(default, with = "ptbr")]
    pub theme_ptbr: Option<String>,
    pub titles: Vec<TitleGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub volume: String,
    pub volume_ptbr: String,
    pub themes: Vec<Theme>,
}

/// The rebuilt corpus: volumes sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Corpus {
    pub volumes: Vec<Volume>,
}

impl Corpus {
    /// Reads a previously written corpus file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| Error::FragmentParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Serializes a value as pretty JSON with a trailing newline.
///
/// Non-ASCII text is written as-is; field order follows the struct
/// declaration, so equal values always give byte-identical output.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value).map_err(|e| Error::Serialization {
        message: e.to_string(),
    })?;
    json.push('\n');
    Ok(json)
}
