//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use corpus_reconcile::config::{self, CorpusConfig};

use crate::commands;

/// Corpus Reconcile - Align, merge and rebuild a partitioned bilingual corpus
#[derive(Parser, Debug)]
#[command(name = "corpus-reconcile")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Configuration file to use instead of the usual lookup
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "CORPUS_RECONCILE_CONFIG"
    )]
    config: Option<PathBuf>,

    /// Directory holding the merged aggregates (overrides the configuration)
    #[arg(long, global = true, value_name = "DIR")]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the fragments of the working directory, grouped by key
    Scan(commands::scan::ScanArgs),

    /// Report translated fragments whose numbering drifted from their original
    Align(commands::align::AlignArgs),

    /// Merge fragments into aggregates and rebuild the corpus
    Merge(commands::merge::MergeArgs),

    /// Rebuild the corpus from the existing aggregates
    Rebuild(commands::rebuild::RebuildArgs),

    /// Report coverage without writing anything
    Audit(commands::audit::AuditArgs),

    /// Display the corpus hierarchy
    Tree(commands::tree::TreeArgs),

    /// Rename translator copies (`X copy.json`) to `X_pt.json`
    Stage(commands::stage::StageArgs),

    /// Delete aggregates that carry no translation
    Prune(commands::prune::PruneArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let color = self.color.as_str();
        match self.command {
            Commands::Completions(args) => commands::completions::execute(args),
            Commands::Scan(args) => {
                commands::scan::execute(args, &load(self.config, self.base_dir)?, color)
            }
            Commands::Align(args) => {
                commands::align::execute(args, &load(self.config, self.base_dir)?, color)
            }
            Commands::Merge(args) => {
                commands::merge::execute(args, &load(self.config, self.base_dir)?, color)
            }
            Commands::Rebuild(args) => {
                commands::rebuild::execute(args, &load(self.config, self.base_dir)?, color)
            }
            Commands::Audit(args) => {
                commands::audit::execute(args, &load(self.config, self.base_dir)?, color)
            }
            Commands::Tree(args) => {
                commands::tree::execute(args, &load(self.config, self.base_dir)?, color)
            }
            Commands::Stage(args) => {
                commands::stage::execute(args, &load(self.config, self.base_dir)?, color)
            }
            Commands::Prune(args) => {
                commands::prune::execute(args, &load(self.config, self.base_dir)?, color)
            }
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A second initialisation (tests driving the CLI in-process) is harmless.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

/// Resolves the configuration record, then applies `--base-dir`.
fn load(explicit: Option<PathBuf>, base_dir: Option<PathBuf>) -> Result<CorpusConfig> {
    let cwd = std::env::current_dir().context("Failed to determine the current directory")?;
    let mut config = config::load(explicit.as_deref(), &cwd).map_err(|e| match &explicit {
        Some(path) => anyhow::anyhow!("Failed to load config from {}: {}", path.display(), e),
        None => anyhow::anyhow!("Failed to load configuration: {}", e),
    })?;
    if let Some(dir) = base_dir {
        config.base_dir = if dir.is_absolute() { dir } else { cwd.join(dir) };
    }
    Ok(config)
}
