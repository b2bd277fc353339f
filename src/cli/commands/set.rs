//! `vaultfile set` — add or update a secret in the vault.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::{VaultError, Result};

/// Execute the `set` command.
pub fn execute(cli: &Cli, name: Option<&str>, value: Option<&str>) -> Result<()> {
    let (name, value) = match (name, value) {
        (None, _) => {
            return Err(VaultError::CommandFailed(
                "secret name and value are required".into(),
            ))
        }
        (Some(_), None) => {
            return Err(VaultError::CommandFailed("secret value is required".into()))
        }
        (Some(name), Some(value)) => (name, value),
    };

    output::warning("Value provided on command line — it may appear in shell history.");

    let vault = open_vault(cli)?;
    vault
        .set(name, value)
        .map_err(|e| VaultError::CommandFailed(format!("value set error: {e}")))?;

    output::success("Value set successfully.");
    Ok(())
}
