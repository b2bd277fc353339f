//! The vault handle used by CLI commands.
//!
//! A `Vault` never caches secrets between calls. Every operation reads
//! the encrypted file from disk, works on a fresh copy of the entries,
//! and (for mutations) writes the whole file back before returning.
//!
//! One reader-writer lock per instance orders the calls: `get` and
//! `list` take it shared, `set` and `remove` take it exclusive for the
//! full load-mutate-save. Nothing coordinates separate processes or
//! separate `Vault` values pointed at the same file.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::crypto::{decrypt_reader, encrypt_writer, is_stream_error};
use crate::errors::{VaultError, Result};

use super::format::{self, Entries};

/// Encrypted key-value store backed by a single file.
pub struct Vault {
    /// Path to the encrypted file on disk.
    path: PathBuf,

    /// Caller-supplied key string (zeroized on drop, never persisted).
    encryption_key: Zeroizing<String>,

    /// Shared for reads, exclusive for load-mutate-save.
    guard: RwLock<()>,
}

impl Vault {
    /// Create a handle for the vault file at `path`.
    ///
    /// Nothing touches the disk until the first operation; a missing
    /// file simply reads as an empty vault.
    pub fn file(encryption_key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encryption_key: Zeroizing::new(encryption_key.into()),
            guard: RwLock::new(()),
        }
    }

    // ------------------------------------------------------------------
    // Secret operations
    // ------------------------------------------------------------------

    /// Return the value stored under `name`.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn get(&self, name: &str) -> Result<String> {
        let _shared = self.read_guard();
        let mut entries = self.load()?;
        entries
            .remove(name)
            .ok_or_else(|| VaultError::NotFound(name.to_string()))
    }

    /// Insert or overwrite `name`, then persist.
    #[instrument(level = "debug", skip(self, value), fields(path = %self.path.display()))]
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        let _exclusive = self.write_guard();
        let mut entries = self.load()?;
        let replaced = entries
            .insert(name.to_string(), value.to_string())
            .is_some();
        self.save(&entries)?;
        debug!(replaced, "secret stored");
        Ok(())
    }

    /// Delete `name` if present, then persist. Removing an absent name
    /// is not an error.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn remove(&self, name: &str) -> Result<()> {
        let _exclusive = self.write_guard();
        let mut entries = self.load()?;
        let removed = entries.remove(name).is_some();
        self.save(&entries)?;
        debug!(removed, "secret removed");
        Ok(())
    }

    /// Snapshot of every entry, sorted by name.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn list(&self) -> Result<Entries> {
        let _shared = self.read_guard();
        self.load()
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the vault file is present on disk.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Read and decrypt the vault file.
    ///
    /// A missing file is an empty vault. Every other failure is an error:
    /// `Io` for the filesystem, `Crypto` for a bad key or a foreign file,
    /// `Decode` when the stream is truncated, the ciphertext does not
    /// authenticate or the plaintext is not a mapping.
    fn load(&self) -> Result<Entries> {
        if !self.path.try_exists()? {
            debug!("vault file absent, starting empty");
            return Ok(Entries::new());
        }

        let file = File::open(&self.path)?;
        let mut reader = decrypt_reader(&self.encryption_key, file)?;

        let mut plaintext = Zeroizing::new(Vec::new());
        reader.read_to_end(&mut plaintext).map_err(|e| {
            if is_stream_error(&e) {
                VaultError::Decode(e.to_string())
            } else {
                VaultError::Io(e)
            }
        })?;

        let entries = format::decode_entries(&plaintext)?;
        debug!(count = entries.len(), "vault loaded");
        Ok(entries)
    }

    /// Encrypt `entries` and replace the vault file **atomically**.
    ///
    /// 1. Encode the entries to JSON.
    /// 2. Stream them through the cipher into a fresh staging file
    ///    beside the vault.
    /// 3. Sync the staging file, then rename it over the target path.
    ///
    /// A crash at any point leaves either the old file or the new one.
    /// Concurrent writers each stage their own file, so the last rename
    /// wins and the vault is never a mix of two saves.
    fn save(&self, entries: &Entries) -> Result<()> {
        let plaintext = format::encode_entries(entries)?;

        fs::create_dir_all(format::parent_dir(&self.path))?;

        // Dropping `staged` on any early return deletes the staging file.
        let staged = format::stage_file(&self.path)?;
        let mut writer = encrypt_writer(&self.encryption_key, staged)?;
        writer.write_all(&plaintext).map_err(write_error)?;
        let staged = writer.finish().map_err(write_error)?;
        staged.as_file().sync_all()?;
        staged
            .persist(&self.path)
            .map_err(|e| VaultError::Io(e.error))?;

        debug!(count = entries.len(), "vault saved");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Locking
    // ------------------------------------------------------------------

    // A panic mid-operation cannot corrupt anything the lock protects:
    // the on-disk file is the state, and saves are atomic.
    fn read_guard(&self) -> RwLockReadGuard<'_, ()> {
        self.guard.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, ()> {
        self.guard.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn write_error(e: io::Error) -> VaultError {
    if is_stream_error(&e) {
        VaultError::Crypto(e.to_string())
    } else {
        VaultError::Io(e)
    }
}
