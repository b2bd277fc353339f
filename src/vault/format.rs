//! Plaintext record format and on-disk file helpers.
//!
//! Before encryption a vault is a single JSON object mapping secret
//! names to secret values:
//!
//! ```text
//! {"API_KEY":"abc123","DB_URL":"postgres://localhost/db"}
//! ```
//!
//! `Entries` is a `BTreeMap`, so keys are always emitted in sorted
//! order and the same mapping always encodes to the same bytes.

use std::collections::BTreeMap;
use std::path::Path;

use tempfile::NamedTempFile;
use zeroize::Zeroizing;

use crate::errors::{VaultError, Result};

/// The in-memory name -> value mapping held by a vault.
pub type Entries = BTreeMap<String, String>;

/// Serialize `entries` to JSON. The buffer is wiped when dropped.
pub fn encode_entries(entries: &Entries) -> Result<Zeroizing<Vec<u8>>> {
    serde_json::to_vec(entries)
        .map(Zeroizing::new)
        .map_err(|e| VaultError::Encode(format!("entries JSON: {e}")))
}

/// Parse decrypted plaintext back into `Entries`.
pub fn decode_entries(plaintext: &[u8]) -> Result<Entries> {
    serde_json::from_slice(plaintext)
        .map_err(|e| VaultError::Decode(format!("entries JSON: {e}")))
}

/// Create a uniquely named staging file beside `path`.
///
/// Each save gets its own file (`.<name>.XXXXXX.tmp`), so concurrent
/// writers never share an inode. It sits in the same directory so the
/// final rename stays on one filesystem and is atomic. The file is
/// owner-only on Unix and is deleted if dropped before `persist`.
pub fn stage_file(path: &Path) -> Result<NamedTempFile> {
    let prefix = format!(
        ".{}.",
        path.file_name().unwrap_or_default().to_string_lossy()
    );

    Ok(tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(parent_dir(path))?)
}

/// Directory containing `path`, with `.` standing in for a bare file name.
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
