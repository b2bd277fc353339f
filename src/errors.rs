use thiserror::Error;

/// All errors that can occur in vaultfile.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Crypto errors ---
    #[error("Crypto error: {0}")]
    Crypto(String),

    // --- Record errors ---
    #[error("Could not decode vault contents: {0}")]
    Decode(String),

    #[error("Could not encode vault contents: {0}")]
    Encode(String),

    // --- Vault errors ---
    #[error("No value set for '{0}'")]
    NotFound(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- CLI errors ---
    // Carries its own user-facing wording, printed as-is.
    #[error("{0}")]
    CommandFailed(String),
}

/// Convenience type alias for vaultfile results.
pub type Result<T> = std::result::Result<T, VaultError>;
