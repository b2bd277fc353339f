//! Vault module — encrypted secret storage.
//!
//! This module provides:
//! - The plaintext record format and file helpers (`format`)
//! - The `Vault` handle with get/set/remove/list (`store`)

pub mod format;
pub mod store;

// Re-export the most commonly used items.
pub use format::Entries;
pub use store::Vault;
