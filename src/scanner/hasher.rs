//! SHA-1 content hasher with streaming support.
//!
//! # Overview
//!
//! [`Hasher`] streams a reader through a SHA-1 digest in fixed-size chunks so
//! arbitrarily large files never have to fit in memory. The resulting
//! fingerprint is rendered as 40 lowercase hex characters and depends only on
//! the full byte sequence, never on how it was chunked.
//!
//! # Example
//!
//! ```
//! use stagedupe::scanner::Hasher;
//!
//! let hasher = Hasher::new();
//! let fingerprint = hasher.hash_reader(&b"hello"[..]).unwrap();
//! assert_eq!(fingerprint, "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use sha1::{Digest, Sha1};

use super::HashError;

/// Default read chunk size (256 KiB).
pub const CHUNK_SIZE: usize = 256 * 1024;

/// Length of a rendered fingerprint in hex characters (160-bit digest).
pub const FINGERPRINT_LEN: usize = 40;

/// Fingerprint of a file's full content, as lowercase hex.
pub type Fingerprint = String;

/// Streaming SHA-1 hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    chunk_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher reading [`CHUNK_SIZE`] bytes at a time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Create a hasher with a custom chunk size (clamped to at least 1 byte).
    #[must_use]
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// The configured chunk size in bytes.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Hash everything `reader` yields until EOF.
    ///
    /// # Errors
    ///
    /// Any read error other than [`ErrorKind::Interrupted`] is returned as-is.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> std::io::Result<Fingerprint> {
        let mut digest = Sha1::new();
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            digest.update(&buffer[..n]);
        }

        Ok(format!("{:x}", digest.finalize()))
    }

    /// Open `path` and hash its full content.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let fingerprint = self
            .hash_reader(file)
            .map_err(|e| HashError::from_io(path, e))?;
        log::trace!("Hashed {}: {}", path.display(), fingerprint);
        Ok(fingerprint)
    }
}

/// Check that `value` looks like a rendered fingerprint.
#[must_use]
pub fn is_fingerprint(value: &str) -> bool {
    value.len() == FINGERPRINT_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
