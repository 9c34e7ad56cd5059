//! Directory walker producing candidate paths for the engine.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct, a thin walkdir traversal that
//! turns a root directory into the flat list of file paths the duplicate
//! engine consumes. Filtering is deliberately small:
//!
//! - Recursive or top-level only
//! - Hidden file and directory skipping (names starting with `.`)
//! - Size filtering (min/max), empty files always skipped
//! - File name glob (`*.jpg`), matched against the base name only
//! - Optional symlink following (walkdir detects loops)
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use file_deduplicator::scanner::{Walker, WalkOptions};
//! use std::path::Path;
//!
//! let options = WalkOptions {
//!     min_size: Some(1024),
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("/home/user/Pictures"), options);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glob::Pattern;
use walkdir::{DirEntry, WalkDir};

use super::ScanError;

/// Options for directory walking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOptions {
    /// Descend into subdirectories.
    pub recursive: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,

    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,

    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,

    /// Only include files whose name matches this glob.
    pub pattern: Option<Pattern>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            skip_hidden: true,
            follow_symlinks: false,
            min_size: None,
            max_size: None,
            pattern: None,
        }
    }
}

impl WalkOptions {
    /// Check if a file passes size filters.
    #[must_use]
    pub fn passes_size_filter(&self, size: u64) -> bool {
        if let Some(min) = self.min_size {
            if size < min {
                return false;
            }
        }
        if let Some(max) = self.max_size {
            if size > max {
                return false;
            }
        }
        true
    }

    /// Check if a file name passes the pattern filter.
    #[must_use]
    pub fn passes_pattern_filter(&self, file_name: &str) -> bool {
        self.pattern
            .as_ref()
            .map_or(true, |pattern| pattern.matches(file_name))
    }
}

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walk options
    options: WalkOptions,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, options: WalkOptions) -> Self {
        Self {
            root: path.to_path_buf(),
            options,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Validate the root before walking.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::NotFound` or `ScanError::NotADirectory`.
    pub fn validate_root(&self) -> Result<(), ScanError> {
        match std::fs::metadata(&self.root) {
            Ok(m) if m.is_dir() => Ok(()),
            Ok(_) => Err(ScanError::NotADirectory(self.root.clone())),
            Err(e) => Err(io_to_scan_error(&self.root, e)),
        }
    }

    /// Walk the directory, yielding file paths in file-name order.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + '_ {
        let max_depth = if self.options.recursive { usize::MAX } else { 1 };
        let skip_hidden = self.options.skip_hidden;

        WalkDir::new(&self.root)
            .follow_links(self.options.follow_symlinks)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !(skip_hidden && entry.depth() > 0 && is_hidden(entry)))
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    false
                } else {
                    true
                }
            })
            .filter_map(move |entry| match entry {
                Ok(entry) => self.process_entry(&entry),
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), Path::to_path_buf);
                    log::warn!("Walker error for {}: {}", path.display(), e);
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                    Some(Err(io_to_scan_error(&path, source)))
                }
            })
    }

    /// Walk and split the results into paths and per-entry errors.
    #[must_use]
    pub fn collect_paths(&self) -> (Vec<PathBuf>, Vec<ScanError>) {
        let mut paths = Vec::new();
        let mut errors = Vec::new();
        for entry in self.walk() {
            match entry {
                Ok(path) => paths.push(path),
                Err(e) => errors.push(e),
            }
        }
        log::debug!(
            "Walked {}: {} files, {} errors",
            self.root.display(),
            paths.len(),
            errors.len()
        );
        (paths, errors)
    }

    fn process_entry(&self, entry: &DirEntry) -> Option<Result<PathBuf, ScanError>> {
        if !entry.file_type().is_file() && !(self.options.follow_symlinks && entry.path().is_file())
        {
            return None;
        }

        if !self
            .options
            .passes_pattern_filter(&entry.file_name().to_string_lossy())
        {
            log::trace!("Skipping non-matching file: {}", entry.path().display());
            return None;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                let path = entry.path().to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("metadata unavailable"));
                return Some(Err(io_to_scan_error(&path, source)));
            }
        };

        let size = metadata.len();
        if size == 0 {
            log::debug!("Skipping empty file: {}", entry.path().display());
            return None;
        }
        if !self.options.passes_size_filter(size) {
            log::trace!(
                "Skipping file due to size filter ({}): {}",
                size,
                entry.path().display()
            );
            return None;
        }

        Some(Ok(entry.path().to_path_buf()))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn io_to_scan_error(path: &Path, error: std::io::Error) -> ScanError {
    use std::io::ErrorKind;

    match error.kind() {
        ErrorKind::PermissionDenied => {
            log::warn!("Permission denied: {}", path.display());
            ScanError::PermissionDenied(path.to_path_buf())
        }
        ErrorKind::NotFound => {
            log::debug!("Path not found (may have been deleted): {}", path.display());
            ScanError::NotFound(path.to_path_buf())
        }
        _ => ScanError::Io {
            path: path.to_path_buf(),
            source: error,
        },
    }
}
