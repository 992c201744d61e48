//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestFixture::new()
//!     .with_fragment(&fragments::part(1, ""), &fragments::original(&["A", "B"]));
//! fixture.command().arg("merge").assert().success();
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    #[allow(unused_imports)]
    pub use super::fragments;
    pub use super::TestFixture;
}

/// Configuration files used across tests.
#[allow(dead_code)]
pub mod configs {
    pub const TITLES_ONLY: &str = "align-mode: titles-only\n";

    pub const MERGE_EMPTY: &str = "orphans: merge-empty\n";

    pub const BLOCK_ON_WARNINGS: &str = r#"
archive:
  block-on-integrity-warnings: true
"#;

    pub const UNKNOWN_KEY: &str = "parts-directory: partes\n";
}

/// Fragment documents in the on-disk JSON schema.
#[allow(dead_code)]
pub mod fragments {
    use serde_json::{json, Value};

    pub const VOLUME: &str = "3.信仰編";
    pub const THEME: &str = "信仰";
    pub const GROUP: &str = "01_3.信仰編_02_信仰";

    /// File name of part `part` of the default group, with a variant suffix
    /// such as `""`, `"_pt"` or `"_merged"`.
    pub fn part(part: u32, suffix: &str) -> String {
        format!("{}_parte{:02}{}.json", GROUP, part, suffix)
    }

    fn publication(idx: usize, title: &str) -> Value {
        json!({
            "title": title,
            "title_ptbr": "",
            "pub_idx": idx,
            "publication_title": title,
            "publication_title_ptbr": "",
            "content": format!("jp-{}", title),
            "content_ptbr": "",
            "date": "1950",
            "has_translation": false
        })
    }

    /// Original fragment: one publication per title, `pub_idx` from 0.
    pub fn original<S: AsRef<str>>(titles: &[S]) -> Value {
        json!({
            "volume": VOLUME,
            "theme_name": THEME,
            "theme_name_ptbr": "",
            "publications": titles
                .iter()
                .enumerate()
                .map(|(i, t)| publication(i, t.as_ref()))
                .collect::<Vec<_>>()
        })
    }

    /// Translated fragment of `original(titles)`: target fields are
    /// `{title}-pt` and `pt-{title}`.
    pub fn translated<S: AsRef<str>>(titles: &[S]) -> Value {
        let publications: Vec<Value> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let t = t.as_ref();
                let mut p = publication(i, t);
                p["title_ptbr"] = json!(format!("{}-pt", t));
                p["publication_title_ptbr"] = json!(format!("{}-pt", t));
                p["content_ptbr"] = json!(format!("pt-{}", t));
                p["has_translation"] = json!(true);
                p
            })
            .collect();
        json!({
            "volume": VOLUME,
            "theme_name": THEME,
            "theme_name_ptbr": "Fé",
            "publications": publications
        })
    }

    /// `count` distinct titles starting with `prefix`.
    pub fn titles(prefix: &str, count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{}{:02}", prefix, i)).collect()
    }
}

/// A temporary base directory with a `partes/` working directory.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("partes")
            .create_dir_all()
            .expect("Failed to create partes/");
        Self { temp_dir }
    }

    /// Adds a `.corpus-reconcile.yaml` with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child(".corpus-reconcile.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Writes a fragment into `partes/`.
    pub fn with_fragment(self, name: &str, doc: &serde_json::Value) -> Self {
        let json = serde_json::to_string_pretty(doc).expect("Failed to serialize fragment");
        self.with_file(&format!("partes/{}", name), &json)
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn parts(&self) -> PathBuf {
        self.temp_dir.path().join("partes")
    }

    pub fn child(&self, path: impl AsRef<Path>) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Reads a JSON file under the base directory.
    pub fn read_json(&self, path: &str) -> serde_json::Value {
        let content = std::fs::read_to_string(self.path().join(path))
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e));
        serde_json::from_str(&content).expect("Invalid JSON")
    }

    /// A command running in this fixture's directory, without color.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("corpus-reconcile");
        cmd.current_dir(self.path())
            .env("NO_COLOR", "1")
            .env("XDG_CONFIG_HOME", self.path().join(".config"))
            .env_remove("CORPUS_RECONCILE_CONFIG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_parts_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.parts().is_dir());
    }

    #[test]
    fn test_fragment_helpers_follow_schema() {
        let doc = fragments::translated(&["A"]);
        assert_eq!(doc["publications"][0]["content_ptbr"], "pt-A");
        assert_eq!(doc["publications"][0]["pub_idx"], 0);
        assert_eq!(fragments::part(7, "_pt"), "01_3.信仰編_02_信仰_parte07_pt.json");
    }
}
