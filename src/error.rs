//! # Error Handling
//!
//! This module defines the fatal error type for the `corpus-reconcile`
//! engine. It uses the `thiserror` library to build an `Error` enum whose
//! variants carry enough context (paths, file names, hints) to act on.
//!
//! ## Errors versus diagnostics
//!
//! Most of what goes wrong during reconciliation is *not* an `Error`. An
//! unrecognized file name, an orphaned translation, a part-number drift or a
//! publication without content are all recoverable: they are recorded as
//! [`crate::audit::Issue`] values and the run continues with the next fragment
//! or group. `Error` is reserved for conditions that stop an operation:
//!
//! - Configuration parsing errors.
//! - A fragment document that cannot be read when the caller asked for it
//!   directly.
//! - Filesystem failures while staging, writing, renaming or archiving.
//! - Archival refused because the coverage audit detected loss.
//! - A translation caller that exhausted its retries.
//! - Wrapped I/O, JSON, YAML, regex, glob and directory-walk errors.
//!
//! The `Result` type alias is used throughout the library.

use thiserror::Error;

/// Main error type for corpus-reconcile operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file could not be parsed.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A fragment or aggregate document could not be decoded.
    #[error("Fragment parse error in {path}: {message}")]
    FragmentParse { path: String, message: String },

    /// A filesystem operation failed.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// A rename was refused or failed.
    #[error("Rename error: {src} -> {dst}: {message}")]
    Rename {
        src: String,
        dst: String,
        message: String,
    },

    /// Archival of source fragments was refused.
    #[error("Archival blocked: {reason}")]
    ArchiveBlocked { reason: String },

    /// An error occurred during serialization.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// The external translation caller gave up.
    #[error("Translation error: {message}")]
    Translation { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A directory traversal error, wrapped from `walkdir::Error`.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_parse() {
        let error = Error::ConfigParse {
            message: "unknown field `part-dir`".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration parsing error"));
        assert!(display.contains("part-dir"));
        assert!(!display.contains("hint:"));
    }

    #[test]
    fn test_error_display_config_parse_with_hint() {
        let error = Error::ConfigParse {
            message: "unknown field `part-dir`".to_string(),
            hint: Some("Did you mean `parts-dir`?".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("hint:"));
        assert!(display.contains("parts-dir"));
    }

    #[test]
    fn test_error_display_fragment_parse() {
        let error = Error::FragmentParse {
            path: "partes/01_a_01_b_parte01.json".to_string(),
            message: "expected value at line 1 column 1".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Fragment parse error"));
        assert!(display.contains("01_a_01_b_parte01.json"));
    }

    #[test]
    fn test_error_display_rename() {
        let error = Error::Rename {
            src: "x_parte05_pt.json".to_string(),
            dst: "x_parte07_pt.json".to_string(),
            message: "destination exists".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("x_parte05_pt.json -> x_parte07_pt.json"));
        assert!(display.contains("destination exists"));
    }

    #[test]
    fn test_error_display_archive_blocked() {
        let error = Error::ArchiveBlocked {
            reason: "2 publications lost between alignment and tree".to_string(),
        };
        assert!(error.to_string().starts_with("Archival blocked"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{unclosed").unwrap_err();
        let error: Error = json_error.into();
        assert!(error.to_string().contains("JSON error"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(error.to_string().contains("YAML parsing error"));
    }
}
