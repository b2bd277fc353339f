use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{VaultError, Result};

/// Project-level configuration, loaded from `.vaultfile.toml`.
///
/// Every field has a sensible default so vaultfile works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Directory (relative to project root) holding the vault file.
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,

    /// File name of the encrypted vault inside `vault_dir`.
    #[serde(default = "default_vault_file")]
    pub vault_file: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_dir() -> String {
    ".vaultfile".to_string()
}

fn default_vault_file() -> String {
    "secrets.vault".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_dir: default_vault_dir(),
            vault_file: default_vault_file(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".vaultfile.toml";

    /// Load settings from `<project_dir>/.vaultfile.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::Config(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Build the full path to the vault file.
    ///
    /// Example: `project_dir/.vaultfile/secrets.vault`
    pub fn vault_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_dir).join(&self.vault_file)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
