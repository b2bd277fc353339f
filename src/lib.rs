pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod vault;

pub use errors::{Result, VaultError};
pub use vault::{Entries, Vault};
