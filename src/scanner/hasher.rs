//! Streaming content hasher for exact-duplicate detection.
//!
//! # Overview
//! This module provides the [`ContentHasher`] which streams a file's bytes
//! through MD5, SHA-1 or SHA-256 and returns a lowercase hex digest together
//! with the file's size and modification time.
//!
//! Files are opened and read exactly once, in fixed-size chunks, so memory use
//! does not depend on file size.
//!
//! # Example
//!
//! ```no_run
//! use file_deduplicator::scanner::{ContentHasher, HashAlgorithm};
//! use std::path::Path;
//!
//! let hasher = ContentHasher::new(HashAlgorithm::from_name("sha1"));
//! let hash = hasher.hash_file(Path::new("file.bin")).unwrap();
//! assert_eq!(hash.digest.len(), 40);
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::SystemTime;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::HashError;

/// Read buffer size for streaming digests (64 KiB).
pub const BUFFER_SIZE: usize = 64 * 1024;

/// Supported content digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum HashAlgorithm {
    /// MD5 (32 hex characters). Fast, not collision resistant.
    Md5,
    /// SHA-1 (40 hex characters).
    Sha1,
    /// SHA-256 (64 hex characters).
    #[default]
    Sha256,
}

impl HashAlgorithm {
    /// Resolve an algorithm name.
    ///
    /// Matching is case-insensitive. Empty or unknown names fall back to
    /// SHA-256 so a typo never aborts a long scan.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "md5" => Self::Md5,
            "sha1" => Self::Sha1,
            "sha256" => Self::Sha256,
            other => {
                log::warn!(
                    "Unknown hash algorithm {:?}, falling back to sha256",
                    other
                );
                Self::Sha256
            }
        }
    }

    /// Length of the hex digest produced by this algorithm.
    #[must_use]
    pub fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
        }
    }

    /// Lowercase name as accepted by [`HashAlgorithm::from_name`].
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl From<String> for HashAlgorithm {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of hashing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHash {
    /// Lowercase hex digest
    pub digest: String,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

/// Streaming content hasher.
///
/// Cheap to construct and `Copy`; each call to [`ContentHasher::hash_file`]
/// creates its own digest state, so one hasher may be shared across workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
}

impl ContentHasher {
    /// Create a hasher for the given algorithm.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Get the algorithm used by this hasher.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash the full content of a file.
    ///
    /// # Errors
    ///
    /// Returns `HashError` if the file cannot be opened, stat'ed or read.
    pub fn hash_file(&self, path: &Path) -> Result<ContentHash, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let metadata = file.metadata().map_err(|e| HashError::from_io(path, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| HashError::from_io(path, e))?;

        let digest = self
            .digest_reader(&mut file)
            .map_err(|e| HashError::from_io(path, e))?;

        log::trace!("{} {}: {}", self.algorithm, path.display(), digest);

        Ok(ContentHash {
            digest,
            size: metadata.len(),
            modified,
        })
    }

    /// Digest everything readable from `reader`.
    ///
    /// # Errors
    ///
    /// Propagates read errors other than `Interrupted`.
    pub fn digest_reader<R: Read>(&self, reader: &mut R) -> io::Result<String> {
        match self.algorithm {
            HashAlgorithm::Md5 => stream_digest::<Md5, R>(reader),
            HashAlgorithm::Sha1 => stream_digest::<Sha1, R>(reader),
            HashAlgorithm::Sha256 => stream_digest::<Sha256, R>(reader),
        }
    }
}

fn stream_digest<D: Digest, R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(to_hex(&hasher.finalize()))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Digest an in-memory buffer.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Md5 => to_hex(&Md5::digest(bytes)),
        HashAlgorithm::Sha1 => to_hex(&Sha1::digest(bytes)),
        HashAlgorithm::Sha256 => to_hex(&Sha256::digest(bytes)),
    }
}
