//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::config::Settings;
use crate::errors::{VaultError, Result};
use crate::vault::Vault;

/// Environment variable consulted for the vault key.
pub const KEY_ENV_VAR: &str = "VAULTFILE_KEY";

/// vaultfile CLI: a single encrypted file of named secrets.
#[derive(Parser)]
#[command(
    name = "vaultfile",
    about = "Encrypted single-file secret vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault file to use (default: .vaultfile/secrets.vault, see .vaultfile.toml)
    #[arg(short, long, global = true)]
    pub file: Option<String>,

    /// Encryption key for the vault (prompted for when omitted)
    #[arg(long, env = KEY_ENV_VAR, hide_env_values = true, global = true)]
    pub key: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// List all secrets as `name = value`
    #[command(visible_alias = "ls")]
    List,

    /// Set a secret (add or update)
    Set {
        /// Secret name (e.g. api)
        name: Option<String>,
        /// Secret value
        value: Option<String>,
    },

    /// Print a secret's value
    Get {
        /// Secret name
        name: String,
    },

    /// Remove a secret (no-op if it is not set)
    #[command(visible_alias = "rm")]
    Remove {
        /// Secret name
        name: String,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the vault key, trying in order:
/// 1. `--key` or the `VAULTFILE_KEY` env var
/// 2. Interactive hidden prompt
///
/// The returned string is moved into the `Vault`, which wipes it on drop.
pub fn encryption_key(cli: &Cli) -> Result<String> {
    if let Some(key) = cli.key.as_deref() {
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }

    dialoguer::Password::new()
        .with_prompt("Enter vault key")
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("key prompt: {e}")))
}

/// Resolve the vault file path from `--file` or the project settings.
///
/// Example: `<cwd>/.vaultfile/secrets.vault`
pub fn vault_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(file) = &cli.file {
        return Ok(PathBuf::from(file));
    }

    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    Ok(settings.vault_path(&cwd))
}

/// Build a `Vault` handle from the CLI arguments.
pub fn open_vault(cli: &Cli) -> Result<Vault> {
    let path = vault_path(cli)?;
    let key = encryption_key(cli)?;
    Ok(Vault::file(key, path))
}
