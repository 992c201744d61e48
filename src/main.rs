//! # Corpus Reconciliation CLI
//!
//! Binary entry point for the `corpus-reconcile` command-line tool. It parses
//! arguments with `clap` and hands off to the command implementations; the
//! reconciliation logic lives in the library crate.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
