//! `vaultfile completions` — generate shell completion scripts.
//!
//! Usage:
//!   vaultfile completions bash > ~/.bash_completion.d/vaultfile
//!   vaultfile completions zsh

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::Result;

/// Execute the `completions` command.
pub fn execute(shell: Shell) -> Result<()> {
    write_completions(shell, &mut io::stdout());
    Ok(())
}

/// Render the completion script for `shell` into `out`.
pub fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bash_script_mentions_subcommands() {
        let mut buf = Vec::new();
        write_completions(Shell::Bash, &mut buf);
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains("vaultfile"));
        assert!(script.contains("list"));
        assert!(script.contains("remove"));
    }

    #[test]
    fn every_shell_renders() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell, Shell::Elvish] {
            let mut buf = Vec::new();
            write_completions(shell, &mut buf);
            assert!(!buf.is_empty(), "{shell:?} produced no output");
        }
    }
}
