//! Encryption adapter for vaultfile.
//!
//! This module provides:
//! - Streaming AES-256-GCM encrypt-on-write / decrypt-on-read wrappers (`stream`)
//! - HKDF-SHA256 derivation of the per-stream key from the caller's key string (`keys`)

pub mod keys;
pub mod stream;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt_writer, decrypt_reader, ...};
pub use keys::derive_stream_key;
pub use stream::{
    decrypt_reader, encrypt_writer, is_stream_error, DecryptingReader, EncryptingWriter,
    StreamError,
};
