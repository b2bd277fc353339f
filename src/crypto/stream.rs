//! Chunked AES-256-GCM stream encryption.
//!
//! `EncryptingWriter` and `DecryptingReader` decorate any `Write` /
//! `Read` so that bytes are encrypted on the way out and decrypted on
//! the way in. Layout of an encrypted stream:
//!
//! ```text
//! [VFST: 4 bytes][version: 1 byte][stream nonce: 12 bytes]
//! [chunk 0] [chunk 1] ... [final chunk]
//!
//! chunk = [chunk nonce: 12 bytes][ciphertext + 16-byte auth tag]
//! ```
//!
//! Plaintext is cut into 32 KiB chunks. Every chunk except the last is
//! exactly 32 KiB; the last holds whatever remains (possibly nothing).
//! The AAD of each chunk is `chunk_number (8 bytes BE) || stream nonce
//! || final flag`, so dropped, reordered or truncated chunks fail
//! authentication instead of yielding partial plaintext.

use std::fmt;
use std::io::{self, Read, Write};

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

use super::keys::derive_stream_key;
use crate::errors::{VaultError, Result};

/// Magic bytes at the start of every encrypted stream.
const MAGIC: &[u8; 4] = b"VFST";

/// Current stream format version.
pub const STREAM_VERSION: u8 = 1;

/// Size of an AES-GCM nonce.
const NONCE_LEN: usize = 12;

/// Size of the AES-GCM authentication tag.
const TAG_LEN: usize = 16;

/// 4 (magic) + 1 (version) + 12 (stream nonce).
pub const HEADER_LEN: usize = 4 + 1 + NONCE_LEN;

/// Plaintext bytes per chunk.
pub const CHUNK_LEN: usize = 32 * 1024;

/// On-disk size of a full chunk.
const SEALED_CHUNK_LEN: usize = NONCE_LEN + CHUNK_LEN + TAG_LEN;

/// Failures raised while a stream is being read or written.
///
/// These travel inside `io::Error` (kind `InvalidData`) so the adapters
/// can implement `Read` and `Write`. Callers that need to tell cipher
/// failures apart from disk failures use [`is_stream_error`].
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("chunk {0} failed authentication — wrong key or corrupted data")]
    Authentication(u64),

    #[error("encrypted stream is truncated")]
    Truncated,

    #[error("chunk {0} could not be encrypted")]
    Seal(u64),
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

/// Returns `true` if `err` was produced by the cipher layer rather than
/// by the underlying reader or writer.
pub fn is_stream_error(err: &io::Error) -> bool {
    err.get_ref()
        .is_some_and(|inner| inner.downcast_ref::<StreamError>().is_some())
}

/// Wrap `inner` so that everything written to it is encrypted with `key`.
///
/// Shorthand for [`EncryptingWriter::new`].
pub fn encrypt_writer<W: Write>(key: &str, inner: W) -> Result<EncryptingWriter<W>> {
    EncryptingWriter::new(key, inner)
}

/// Wrap `inner` so that reads yield the plaintext encrypted with `key`.
///
/// Shorthand for [`DecryptingReader::new`].
pub fn decrypt_reader<R: Read>(key: &str, inner: R) -> Result<DecryptingReader<R>> {
    DecryptingReader::new(key, inner)
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Encrypting decorator around a byte sink.
///
/// Plaintext is buffered until a full chunk is available. Call
/// [`finish`](Self::finish) once all data is written: it seals the
/// final chunk. A stream that is dropped without `finish` will not
/// decrypt.
pub struct EncryptingWriter<W: Write> {
    inner: W,
    cipher: Aes256Gcm,
    stream_nonce: [u8; NONCE_LEN],
    buffer: Zeroizing<Vec<u8>>,
    chunk_number: u64,
}

impl<W: Write> EncryptingWriter<W> {
    /// Derive the stream key and write the stream header to `inner`.
    pub fn new(key: &str, mut inner: W) -> Result<Self> {
        let mut stream_nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut stream_nonce);

        let cipher = stream_cipher(key, &stream_nonce)?;

        let mut header = [0u8; HEADER_LEN];
        header[..4].copy_from_slice(MAGIC);
        header[4] = STREAM_VERSION;
        header[5..].copy_from_slice(&stream_nonce);
        inner.write_all(&header)?;

        Ok(Self {
            inner,
            cipher,
            stream_nonce,
            buffer: Zeroizing::new(Vec::with_capacity(CHUNK_LEN)),
            chunk_number: 0,
        })
    }

    /// Seal the last chunk, flush, and hand back the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        let rest = Zeroizing::new(std::mem::take(&mut *self.buffer));
        self.seal_chunk(&rest, true)?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn seal_chunk(&mut self, plaintext: &[u8], last: bool) -> io::Result<()> {
        let mut chunk_nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut chunk_nonce);

        let aad = chunk_aad(self.chunk_number, &self.stream_nonce, last);
        let payload = Payload {
            msg: plaintext,
            aad: &aad,
        };

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&chunk_nonce), payload)
            .map_err(|_| StreamError::Seal(self.chunk_number))?;

        self.inner.write_all(&chunk_nonce)?;
        self.inner.write_all(&sealed)?;
        self.chunk_number += 1;
        Ok(())
    }
}

impl<W: Write> Write for EncryptingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // Keep at least one byte back: the final chunk is sealed by
        // `finish`, and it must never be empty unless the whole stream is.
        while self.buffer.len() > CHUNK_LEN {
            let chunk: Zeroizing<Vec<u8>> =
                Zeroizing::new(self.buffer.drain(..CHUNK_LEN).collect());
            self.seal_chunk(&chunk, false)?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> fmt::Debug for EncryptingWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptingWriter")
            .field("chunk_number", &self.chunk_number)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Decrypting decorator around a byte source.
///
/// Chunks are read and authenticated one at a time; no plaintext from a
/// chunk is released before its tag verifies.
pub struct DecryptingReader<R: Read> {
    inner: R,
    cipher: Aes256Gcm,
    stream_nonce: [u8; NONCE_LEN],
    chunk_number: u64,
    plaintext: Zeroizing<Vec<u8>>,
    pos: usize,
    /// First byte of the next chunk, read early to detect the end of stream.
    lookahead: Option<u8>,
    finished: bool,
}

impl<R: Read> DecryptingReader<R> {
    /// Read and validate the stream header, then derive the stream key.
    pub fn new(key: &str, mut inner: R) -> Result<Self> {
        let mut header = [0u8; HEADER_LEN];
        let n = read_full(&mut inner, &mut header)?;
        if n == 0 {
            return Err(VaultError::Crypto("empty stream, no header".into()));
        }
        // Whatever was read must agree with the marker before a short
        // read counts as truncation rather than a foreign file.
        let marked = n.min(MAGIC.len());
        if header[..marked] != MAGIC[..marked] {
            return Err(VaultError::Crypto("missing VFST stream marker".into()));
        }
        if n > 4 && header[4] != STREAM_VERSION {
            return Err(VaultError::Crypto(format!(
                "unsupported stream version {}, expected {STREAM_VERSION}",
                header[4]
            )));
        }
        if n < HEADER_LEN {
            return Err(VaultError::Decode(format!(
                "stream truncated inside header ({n} of {HEADER_LEN} bytes)"
            )));
        }

        let mut stream_nonce = [0u8; NONCE_LEN];
        stream_nonce.copy_from_slice(&header[5..]);
        let cipher = stream_cipher(key, &stream_nonce)?;

        Ok(Self {
            inner,
            cipher,
            stream_nonce,
            chunk_number: 0,
            plaintext: Zeroizing::new(Vec::new()),
            pos: 0,
            lookahead: None,
            finished: false,
        })
    }

    fn open_next_chunk(&mut self) -> io::Result<()> {
        let mut sealed = vec![0u8; SEALED_CHUNK_LEN];
        let mut filled = 0;
        if let Some(byte) = self.lookahead.take() {
            sealed[0] = byte;
            filled = 1;
        }
        filled += read_full(&mut self.inner, &mut sealed[filled..])?;
        sealed.truncate(filled);

        // A short chunk is always the last one. A full-size chunk is the
        // last one only if nothing follows it.
        let last = if filled < SEALED_CHUNK_LEN {
            true
        } else {
            let mut next = [0u8; 1];
            if read_full(&mut self.inner, &mut next)? == 0 {
                true
            } else {
                self.lookahead = Some(next[0]);
                false
            }
        };

        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(StreamError::Truncated.into());
        }

        let (chunk_nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let aad = chunk_aad(self.chunk_number, &self.stream_nonce, last);
        let payload = Payload {
            msg: ciphertext,
            aad: &aad,
        };

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(chunk_nonce), payload)
            .map_err(|_| StreamError::Authentication(self.chunk_number))?;

        self.plaintext = Zeroizing::new(plaintext);
        self.pos = 0;
        self.chunk_number += 1;
        self.finished = last;
        Ok(())
    }
}

impl<R: Read> Read for DecryptingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos == self.plaintext.len() {
            if self.finished {
                return Ok(0);
            }
            self.open_next_chunk()?;
        }

        let n = buf.len().min(self.plaintext.len() - self.pos);
        buf[..n].copy_from_slice(&self.plaintext[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl<R: Read> fmt::Debug for DecryptingReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptingReader")
            .field("chunk_number", &self.chunk_number)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn stream_cipher(key: &str, stream_nonce: &[u8; NONCE_LEN]) -> Result<Aes256Gcm> {
    let stream_key = derive_stream_key(key, stream_nonce)?;
    Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&stream_key[..])))
}

/// AAD: chunk_number (8 bytes BE) || stream nonce (12 bytes) || final flag.
fn chunk_aad(chunk_number: u64, stream_nonce: &[u8; NONCE_LEN], last: bool) -> [u8; 21] {
    let mut aad = [0u8; 21];
    aad[..8].copy_from_slice(&chunk_number.to_be_bytes());
    aad[8..20].copy_from_slice(stream_nonce);
    aad[20] = u8::from(last);
    aad
}

/// Fill `buf` from `reader` until it is full or the reader is exhausted.
/// Returns the number of bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seal(key: &str, plaintext: &[u8]) -> Vec<u8> {
        let mut w = encrypt_writer(key, Vec::new()).unwrap();
        w.write_all(plaintext).unwrap();
        w.finish().unwrap()
    }

    fn open(key: &str, sealed: &[u8]) -> io::Result<Vec<u8>> {
        let mut r = decrypt_reader(key, sealed).unwrap();
        let mut out = Vec::new();
        r.read_to_end(&mut out)?;
        Ok(out)
    }

    #[test]
    fn empty_stream_is_one_chunk() {
        let sealed = seal("k", b"");
        assert_eq!(sealed.len(), HEADER_LEN + NONCE_LEN + TAG_LEN);
        assert!(open("k", &sealed).unwrap().is_empty());
    }

    #[test]
    fn exact_chunk_boundary_roundtrips() {
        let data = vec![0x5Au8; CHUNK_LEN];
        let sealed = seal("k", &data);
        // One full final chunk, no trailing empty chunk.
        assert_eq!(sealed.len(), HEADER_LEN + SEALED_CHUNK_LEN);
        assert_eq!(open("k", &sealed).unwrap(), data);
    }

    #[test]
    fn multi_chunk_roundtrips_with_small_writes() {
        let data: Vec<u8> = (0..(CHUNK_LEN * 2 + 17)).map(|i| (i % 251) as u8).collect();
        let mut w = encrypt_writer("k", Vec::new()).unwrap();
        for piece in data.chunks(1000) {
            w.write_all(piece).unwrap();
        }
        let sealed = w.finish().unwrap();
        assert_eq!(open("k", &sealed).unwrap(), data);
    }

    #[test]
    fn dropping_trailing_chunk_is_detected() {
        let data = vec![1u8; CHUNK_LEN + 10];
        let sealed = seal("k", &data);
        let cut = &sealed[..HEADER_LEN + SEALED_CHUNK_LEN];
        let err = open("k", cut).unwrap_err();
        assert!(is_stream_error(&err));
    }

    #[test]
    fn header_only_is_truncated() {
        let sealed = seal("k", b"abc");
        let err = open("k", &sealed[..HEADER_LEN]).unwrap_err();
        assert!(is_stream_error(&err));
    }

    #[test]
    fn bad_marker_is_a_crypto_error() {
        let mut sealed = seal("k", b"abc");
        sealed[0] = b'X';
        let err = decrypt_reader("k", sealed.as_slice()).unwrap_err();
        assert!(matches!(err, VaultError::Crypto(_)));
    }

    #[test]
    fn cut_inside_header_is_a_decode_error() {
        let sealed = seal("k", b"abc");
        for cut in [1, 4, 5, HEADER_LEN - 1] {
            let err = decrypt_reader("k", &sealed[..cut]).unwrap_err();
            assert!(matches!(err, VaultError::Decode(_)), "cut {cut}: {err:?}");
        }
    }

    #[test]
    fn empty_or_foreign_short_input_is_a_crypto_error() {
        assert!(matches!(
            decrypt_reader("k", &b""[..]),
            Err(VaultError::Crypto(_))
        ));
        assert!(matches!(
            decrypt_reader("k", &b"{}"[..]),
            Err(VaultError::Crypto(_))
        ));
    }

    #[test]
    fn plain_io_errors_are_not_stream_errors() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(!is_stream_error(&err));
    }
}
