//! # Terminal Output
//!
//! Controls how reports look on the terminal. Markers and styling are only
//! used when color is wanted:
//! - `--color=never|always|auto` on the command line
//! - `NO_COLOR` set to anything disables color (https://no-color.org/)
//! - `CLICOLOR=0` disables color, `CLICOLOR_FORCE=1` forces it off a TTY
//! - `TERM=dumb` disables color
//!
//! ```rust,ignore
//! use corpus_reconcile::output::{emoji, OutputConfig};
//!
//! let out = OutputConfig::from_env_and_flag("auto");
//! println!("{} Scanning partes/", emoji(&out, "🔍", "[SCAN]"));
//! ```

use std::env;
use std::fmt::Display;

use console::style;

/// Whether reports may use color and emoji markers.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolves the `--color` flag ("always", "never" or "auto") against the
    /// environment.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// The emoji when color is on, the plain marker otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Bold section heading.
pub fn heading(config: &OutputConfig, text: impl Display) -> String {
    if config.use_color {
        style(text).bold().to_string()
    } else {
        text.to_string()
    }
}

/// A count, red when nonzero.
pub fn alarming(config: &OutputConfig, count: usize) -> String {
    if config.use_color && count > 0 {
        style(count).red().bold().to_string()
    } else {
        count.to_string()
    }
}
