//! Project configuration loaded from `.vaultfile.toml`.

pub mod settings;

pub use settings::Settings;
