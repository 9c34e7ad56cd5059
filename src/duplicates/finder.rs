//! Parallel hashing dispatch and pipeline orchestration.
//!
//! # Overview
//!
//! Detection runs in two phases separated by a barrier:
//!
//! 1. **Hash**: every candidate path is digested on a rayon pool. Images also
//!    receive a perceptual fingerprint when perceptual mode is on.
//! 2. **Group**: once every worker has finished, the collected records are
//!    handed to [`find_groups`].
//!
//! Per-file failures never abort the run. Hash failures are collected with
//! their path; fingerprint failures are logged and the file is kept without
//! a fingerprint, so it still takes part in exact grouping.
//!
//! # Cancellation
//!
//! A shared `Arc<AtomicBool>` can be attached. Once set, workers skip any file
//! they have not started yet; hashes already in flight complete and whatever
//! was collected is returned with `interrupted` set.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use super::groups::{find_groups, DuplicateGroup};
use crate::config::EngineConfig;
use crate::progress::ProgressCallback;
use crate::scanner::{
    is_image_file, ContentHasher, HashAlgorithm, HashError, HashedFile, PerceptualHasher,
    ScanError, WalkOptions, Walker,
};

/// Configuration for the hashing phase.
#[derive(Clone)]
pub struct DispatchConfig {
    /// Content digest algorithm
    pub hash_algorithm: HashAlgorithm,
    /// Fingerprinter for images; `None` disables perceptual hashing
    pub perceptual: Option<PerceptualHasher>,
    /// Number of worker threads
    pub workers: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for DispatchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchConfig")
            .field("hash_algorithm", &self.hash_algorithm)
            .field("perceptual", &self.perceptual)
            .field("workers", &self.workers)
            .field("has_shutdown_flag", &self.shutdown_flag.is_some())
            .field("has_progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::default(),
            perceptual: None,
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl DispatchConfig {
    /// Derive dispatch settings from an engine configuration.
    #[must_use]
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self {
            hash_algorithm: config.hash_algorithm,
            perceptual: config.perceptual.then(|| config.perceptual_hasher()),
            workers: config.effective_workers(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set the number of worker threads (at least one).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Enable perceptual fingerprints for image files.
    #[must_use]
    pub fn with_perceptual(mut self, hasher: PerceptualHasher) -> Self {
        self.perceptual = Some(hasher);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Everything the hashing phase produced.
#[derive(Debug, Default)]
pub struct HashOutcome {
    /// Successfully hashed files, in no particular order
    pub files: Vec<HashedFile>,
    /// Files that could not be hashed
    pub errors: Vec<(PathBuf, HashError)>,
    /// Images whose fingerprint could not be computed
    pub fingerprint_failures: usize,
    /// Files never started because shutdown was requested
    pub skipped: usize,
    /// Whether shutdown was requested during the phase
    pub interrupted: bool,
}

enum FileResult {
    Hashed {
        file: HashedFile,
        fingerprint_failed: bool,
    },
    Failed(PathBuf, HashError),
    Skipped,
}

fn hash_one(
    path: PathBuf,
    hasher: &ContentHasher,
    perceptual: Option<&PerceptualHasher>,
) -> FileResult {
    let hash = match hasher.hash_file(&path) {
        Ok(hash) => hash,
        Err(e) => {
            log::warn!("Failed to hash {}: {}", path.display(), e);
            return FileResult::Failed(path, e);
        }
    };

    let mut fingerprint_failed = false;
    let fingerprint = match perceptual {
        Some(fp_hasher) if is_image_file(&path) => match fp_hasher.fingerprint_file(&path) {
            Ok(fp) => Some(fp),
            Err(e) => {
                log::warn!(
                    "Perceptual hash failed for {}, using exact match only: {}",
                    path.display(),
                    e
                );
                fingerprint_failed = true;
                None
            }
        },
        _ => None,
    };

    let mut file = HashedFile::from_content_hash(path, hash);
    file.fingerprint = fingerprint;
    FileResult::Hashed {
        file,
        fingerprint_failed,
    }
}

/// Hash every path on a worker pool.
///
/// Returns once every worker has finished; the result order is unspecified.
#[must_use]
pub fn hash_files(paths: Vec<PathBuf>, config: &DispatchConfig) -> HashOutcome {
    let mut outcome = HashOutcome::default();

    if paths.is_empty() {
        log::debug!("Hash phase: no files to process");
        return outcome;
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start("hash", paths.len());
    }

    log::info!(
        "Hashing {} files with {} worker(s) ({})",
        paths.len(),
        config.workers,
        config.hash_algorithm
    );

    let hasher = ContentHasher::new(config.hash_algorithm);
    let perceptual = config.perceptual.as_ref();

    let work = || -> Vec<FileResult> {
        paths
            .into_par_iter()
            .enumerate()
            .map(|(idx, path)| {
                if config.is_shutdown_requested() {
                    return FileResult::Skipped;
                }

                if let Some(ref callback) = config.progress_callback {
                    callback.on_progress(idx + 1, path.to_string_lossy().as_ref());
                }

                let result = hash_one(path, &hasher, perceptual);
                if let (Some(callback), FileResult::Hashed { file, .. }) =
                    (&config.progress_callback, &result)
                {
                    callback.on_item_completed(file.size);
                }
                result
            })
            .collect()
    };

    let results = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .build()
    {
        Ok(pool) => pool.install(work),
        Err(e) => {
            log::warn!(
                "Failed to create worker pool ({}), using global pool with {} threads",
                e,
                rayon::current_num_threads()
            );
            work()
        }
    };

    for result in results {
        match result {
            FileResult::Hashed {
                file,
                fingerprint_failed,
            } => {
                if fingerprint_failed {
                    outcome.fingerprint_failures += 1;
                }
                outcome.files.push(file);
            }
            FileResult::Failed(path, e) => outcome.errors.push((path, e)),
            FileResult::Skipped => outcome.skipped += 1,
        }
    }

    if config.is_shutdown_requested() {
        outcome.interrupted = true;
        log::info!(
            "Hash phase interrupted: {} hashed, {} skipped",
            outcome.files.len(),
            outcome.skipped
        );
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end("hash");
    }

    log::info!(
        "Hash phase complete: {} hashed, {} failed, {} fingerprint failure(s)",
        outcome.files.len(),
        outcome.errors.len(),
        outcome.fingerprint_failures
    );

    outcome
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Candidate paths handed to the engine
    pub total_files: usize,
    /// Files successfully hashed
    pub hashed_files: usize,
    /// Total size of all hashed files in bytes
    pub total_size: u64,
    /// Hashed files that carry a fingerprint
    pub image_files: usize,
    /// Images that fell back to exact matching
    pub fingerprint_failures: usize,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Groups formed by identical content
    pub exact_groups: usize,
    /// Groups formed by perceptual similarity
    pub perceptual_groups: usize,
    /// Files beyond the first in every group
    pub duplicate_files: usize,
    /// Bytes held by files beyond the first in every group
    pub reclaimable_space: u64,
    /// Time spent walking directories
    pub walk_duration: Duration,
    /// Time spent hashing
    pub hash_duration: Duration,
    /// Time spent grouping
    pub group_duration: Duration,
    /// Duration of the entire scan
    pub scan_duration: Duration,
    /// Files skipped after shutdown was requested
    pub skipped_files: usize,
    /// Whether the scan was interrupted
    pub interrupted: bool,
    /// Files that could not be hashed
    pub hash_errors: Vec<(PathBuf, HashError)>,
    /// Errors encountered while walking
    pub scan_errors: Vec<ScanError>,
}

impl ScanSummary {
    /// Percentage of the hashed bytes held by duplicates.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        bytesize::ByteSize::b(self.reclaimable_space).to_string()
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        bytesize::ByteSize::b(self.total_size).to_string()
    }

    /// Number of per-file and per-entry errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.hash_errors.len() + self.scan_errors.len()
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while validating the root.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A scan error occurred.
    #[error(transparent)]
    ScanError(#[from] ScanError),
}

/// Duplicate finder that runs hash → barrier → group.
///
/// # Example
///
/// ```no_run
/// use file_deduplicator::config::EngineConfig;
/// use file_deduplicator::duplicates::DuplicateFinder;
/// use file_deduplicator::scanner::WalkOptions;
/// use std::path::Path;
///
/// let finder = DuplicateFinder::new(EngineConfig::default());
/// let (groups, summary) = finder
///     .find_duplicates_in_dir(Path::new("."), &WalkOptions::default())
///     .unwrap();
///
/// println!("Found {} duplicate groups", groups.len());
/// println!("Reclaimable space: {}", summary.reclaimable_display());
/// ```
pub struct DuplicateFinder {
    config: EngineConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// The configuration this finder runs with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn dispatch_config(&self) -> DispatchConfig {
        let mut dispatch = DispatchConfig::from_engine(&self.config);
        if let Some(ref flag) = self.shutdown_flag {
            dispatch = dispatch.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = self.progress_callback {
            dispatch = dispatch.with_progress_callback(Arc::clone(callback));
        }
        dispatch
    }

    /// Find duplicates among an explicit list of paths.
    ///
    /// Interruption is reported through `ScanSummary::interrupted`; groups
    /// are still formed from the files hashed before shutdown.
    #[must_use]
    pub fn find_duplicates(&self, paths: Vec<PathBuf>) -> (Vec<DuplicateGroup>, ScanSummary) {
        let start_time = Instant::now();
        let mut summary = ScanSummary {
            total_files: paths.len(),
            ..Default::default()
        };

        let outcome = hash_files(paths, &self.dispatch_config());
        summary.hash_duration = start_time.elapsed();
        summary.hashed_files = outcome.files.len();
        summary.total_size = outcome.files.iter().map(|f| f.size).sum();
        summary.fingerprint_failures = outcome.fingerprint_failures;
        summary.skipped_files = outcome.skipped;
        summary.interrupted = outcome.interrupted;
        summary.hash_errors = outcome.errors;

        let group_start = Instant::now();
        let (groups, stats) = find_groups(outcome.files, &self.config.grouping_options());
        summary.group_duration = group_start.elapsed();

        summary.image_files = stats.image_files;
        summary.duplicate_groups = groups.len();
        summary.exact_groups = stats.exact_groups;
        summary.perceptual_groups = stats.perceptual_groups;
        summary.duplicate_files = stats.duplicate_files;
        summary.reclaimable_space = stats.reclaimable_bytes;
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} groups, {} duplicates, {} reclaimable in {:.2?}",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display(),
            summary.scan_duration
        );

        (groups, summary)
    }

    /// Walk a directory and find duplicates among its files.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The root does not exist or is not a directory
    /// - Shutdown was requested before hashing started
    pub fn find_duplicates_in_dir(
        &self,
        root: &Path,
        options: &WalkOptions,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();

        let mut walker = Walker::new(root, options.clone());
        walker.validate_root().map_err(|e| match e {
            ScanError::NotFound(p) => FinderError::PathNotFound(p),
            ScanError::NotADirectory(p) => FinderError::NotADirectory(p),
            other => FinderError::ScanError(other),
        })?;
        if let Some(ref flag) = self.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start("walking", 0);
        }
        let (paths, scan_errors) = walker.collect_paths();
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end("walking");
        }
        let walk_duration = start_time.elapsed();

        log::info!(
            "Found {} candidate files under {} ({} walk error(s))",
            paths.len(),
            root.display(),
            scan_errors.len()
        );

        if self.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let (groups, mut summary) = self.find_duplicates(paths);
        summary.walk_duration = walk_duration;
        summary.scan_duration = start_time.elapsed();
        summary.scan_errors = scan_errors;
        Ok((groups, summary))
    }
}
