//! `vaultfile remove` — delete a secret from the vault.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `remove` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let vault = open_vault(cli)?;
    vault.remove(name)?;
    output::success(&format!("Removed secret '{name}'"));
    Ok(())
}
