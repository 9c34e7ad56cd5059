//! Scanner module for file discovery, content hashing and image fingerprinting.
//!
//! This module provides functionality for:
//! - Directory walking using walkdir (feeds the CLI; the engine takes plain paths)
//! - Content hashing with MD5, SHA-1 or SHA-256
//! - Perceptual fingerprinting of JPEG/PNG/GIF/WebP images
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: Streaming cryptographic digests
//! - [`perceptual`]: dHash / aHash / pHash fingerprints
//!
//! # Example
//!
//! ```no_run
//! use file_deduplicator::scanner::{ContentHasher, HashAlgorithm};
//! use std::path::Path;
//!
//! let hasher = ContentHasher::new(HashAlgorithm::Sha256);
//! match hasher.hash_file(Path::new("photo.jpg")) {
//!     Ok(hash) => println!("{} ({} bytes)", hash.digest, hash.size),
//!     Err(e) => eprintln!("Warning: {}", e),
//! }
//! ```

pub mod hasher;
pub mod perceptual;
pub mod walker;

use std::path::PathBuf;
use std::time::SystemTime;

// Re-export main types
pub use hasher::{hash_bytes, ContentHash, ContentHasher, HashAlgorithm};
pub use perceptual::{
    is_image_file, Fingerprint, PerceptualAlgorithm, PerceptualError, PerceptualHasher,
    Preprocessing, Strictness,
};
pub use walker::{WalkOptions, Walker};

/// Identity record for one scanned file.
///
/// Created once per file during the hashing phase and never mutated
/// afterwards. Records are discarded when grouping completes.
#[derive(Debug, Clone, PartialEq)]
pub struct HashedFile {
    /// Location of the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Lowercase hex digest of the full file content
    pub content_digest: String,
    /// Last modification time
    pub modified: SystemTime,
    /// Perceptual fingerprint, only for images in perceptual mode
    pub fingerprint: Option<Fingerprint>,
}

impl HashedFile {
    /// Create a record without a perceptual fingerprint.
    #[must_use]
    pub fn new(
        path: PathBuf,
        size: u64,
        content_digest: impl Into<String>,
        modified: SystemTime,
    ) -> Self {
        Self {
            path,
            size,
            content_digest: content_digest.into(),
            modified,
            fingerprint: None,
        }
    }

    /// Attach a perceptual fingerprint.
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Build a record from a computed content hash.
    #[must_use]
    pub fn from_content_hash(path: PathBuf, hash: ContentHash) -> Self {
        Self::new(path, hash.size, hash.digest, hash.modified)
    }

    /// Whether this file takes part in perceptual clustering.
    #[must_use]
    pub fn has_fingerprint(&self) -> bool {
        self.fingerprint.is_some()
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during file hashing.
///
/// Always scoped to a single file; the run continues without it.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error for the given path.
    #[must_use]
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Path of the file that failed.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Io { path: p, .. } => p,
        }
    }
}
