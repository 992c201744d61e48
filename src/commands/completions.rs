//! # Completions Command Implementation
//!
//! Writes a shell completion script for `corpus-reconcile` to stdout,
//! generated by `clap_complete` from the command definition.
//!
//! ```bash
//! corpus-reconcile completions bash > ~/.local/share/bash-completion/completions/corpus-reconcile
//! corpus-reconcile completions zsh > ~/.zfunc/_corpus-reconcile
//! ```

use anyhow::Result;
use clap::{Args, CommandFactory, ValueEnum};
use clap_complete::{generate, Shell};
use std::io;

use crate::cli::Cli;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Shell::Bash,
            CompletionShell::Zsh => Shell::Zsh,
            CompletionShell::Fish => Shell::Fish,
            CompletionShell::PowerShell => Shell::PowerShell,
            CompletionShell::Elvish => Shell::Elvish,
        }
    }
}

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}

pub fn execute(args: CompletionsArgs) -> Result<()> {
    let shell: Shell = args.shell.into();
    generate(shell, &mut Cli::command(), "corpus-reconcile", &mut io::stdout());
    Ok(())
}
