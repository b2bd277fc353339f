//! Per-stream key derivation using HKDF-SHA256.
//!
//! The caller hands us an opaque key string. Every encrypted stream
//! carries its own random nonce in the header, and we expand the key
//! string with that nonce as HKDF salt so no two files share an AES key
//! even when the caller reuses the same string.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::errors::{VaultError, Result};

/// Length of the derived AES-256 key.
pub const KEY_LEN: usize = 32;

/// HKDF `info` binding the derived key to its purpose.
const STREAM_KEY_INFO: &[u8] = b"vaultfile-stream-key";

/// Derive the AES-256-GCM key for one stream.
///
/// Fails with `VaultError::Crypto` if `key` is empty. The returned key
/// is wiped from memory when dropped.
pub fn derive_stream_key(key: &str, stream_nonce: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    if key.is_empty() {
        return Err(VaultError::Crypto("encryption key must not be empty".into()));
    }

    let hk = Hkdf::<Sha256>::new(Some(stream_nonce), key.as_bytes());

    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(STREAM_KEY_INFO, &mut okm[..])
        .map_err(|e| VaultError::Crypto(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}
