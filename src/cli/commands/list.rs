//! `vaultfile list` — print every secret as `name = value`.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let vault = open_vault(cli)?;
    let entries = vault.list()?;
    output::print_entries(&entries);
    if !vault.exists() {
        output::tip(&format!(
            "The vault file will be created at {}",
            vault.path().display()
        ));
    }
    Ok(())
}
