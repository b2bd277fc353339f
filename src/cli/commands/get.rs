//! `vaultfile get` — retrieve and print a single secret's value.

use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `get` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let vault = open_vault(cli)?;

    // Print the bare value so it can be captured by scripts.
    let value = vault.get(name)?;
    println!("{value}");

    Ok(())
}
