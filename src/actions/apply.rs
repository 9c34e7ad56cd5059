//! Carrying out a plan: move, trash or delete.
//!
//! # Safety
//!
//! Before touching any member of a group the kept file is checked to still
//! exist; if it has vanished the whole group is skipped so no content is
//! lost. Every per-file failure is recorded and the batch continues.
//!
//! # Example
//!
//! ```no_run
//! use file_deduplicator::actions::{apply, Disposition};
//!
//! # let plans = Vec::new();
//! let report = apply(&plans, &Disposition::Trash, true);
//! println!("{}", report.summary());
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::plan::GroupPlan;

/// What to do with removal candidates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Disposition {
    /// Only report; touch nothing
    #[default]
    Report,
    /// Move into the given directory
    Move(PathBuf),
    /// Move to the system trash
    Trash,
    /// Delete permanently
    Delete,
}

impl Disposition {
    /// Past-tense verb used in logs and summaries.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Report => "reported",
            Self::Move(_) => "moved",
            Self::Trash => "trashed",
            Self::Delete => "deleted",
        }
    }
}

/// Error type for file actions.
#[derive(Debug, Error)]
pub enum ActionError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when modifying the file.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The kept member is gone, so its duplicates were left alone.
    #[error("kept file missing, group skipped: {0}")]
    KeepMissing(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// File that could not be trashed
        path: PathBuf,
        /// Message from the platform trash
        message: String,
    },

    /// Move into the target directory failed.
    #[error("move failed for {path} -> {target}: {source}")]
    MoveFailed {
        /// File being moved
        path: PathBuf,
        /// Destination path
        target: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A restore would overwrite a file that now exists at the original path.
    #[error("refusing to overwrite existing file: {0}")]
    Occupied(PathBuf),

    /// Any other I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ActionError {
    pub(crate) fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::KeepMissing(p)
            | Self::Occupied(p) => p,
            Self::TrashFailed { path, .. }
            | Self::MoveFailed { path, .. }
            | Self::Io { path, .. } => path,
        }
    }
}

/// One file that was (or, in a dry run, would be) acted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Original location
    pub path: PathBuf,
    /// Destination for moves
    pub target: Option<PathBuf>,
    /// File size in bytes
    pub bytes: u64,
}

/// Result of applying a set of plans.
#[derive(Debug, Default)]
pub struct ActionReport {
    /// Whether the filesystem was left untouched
    pub dry_run: bool,
    /// Files acted on
    pub completed: Vec<ActionOutcome>,
    /// Files that could not be acted on
    pub failures: Vec<ActionError>,
    /// Bytes freed (or that would be freed)
    pub bytes_reclaimed: u64,
    verb: &'static str,
}

impl ActionReport {
    pub(crate) fn new(verb: &'static str, dry_run: bool) -> Self {
        Self {
            dry_run,
            verb,
            ..Default::default()
        }
    }

    /// Number of files acted on.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.completed.len()
    }

    /// Number of failures.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Whether every file was handled.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let prefix = if self.dry_run { "[dry run] would have " } else { "" };
        let mut line = format!("{}{} {} file(s)", prefix, self.verb, self.completed.len());
        if self.bytes_reclaimed > 0 {
            line.push_str(&format!(
                ", {} reclaimed",
                bytesize::ByteSize::b(self.bytes_reclaimed)
            ));
        }
        if !self.failures.is_empty() {
            line.push_str(&format!(", {} failed", self.failures.len()));
        }
        line
    }
}

/// Apply a disposition to every plan.
///
/// `Disposition::Report` returns an empty report. With `dry_run` nothing on
/// disk changes but the report lists what would have happened, including the
/// collision-free move targets.
#[must_use]
pub fn apply(plans: &[GroupPlan], disposition: &Disposition, dry_run: bool) -> ActionReport {
    let mut report = ActionReport::new(disposition.verb(), dry_run);

    if *disposition == Disposition::Report {
        return report;
    }

    if let Disposition::Move(dir) = disposition {
        if !dry_run {
            if let Err(e) = fs::create_dir_all(dir) {
                log::error!("Cannot create move target {}: {}", dir.display(), e);
                report.failures.push(ActionError::from_io(dir, e));
                return report;
            }
        }
    }

    let mut reserved: HashSet<PathBuf> = HashSet::new();

    for plan in plans {
        if !dry_run && !plan.keep.path.exists() {
            log::warn!(
                "Kept file {} no longer exists, leaving its duplicates in place",
                plan.keep.path.display()
            );
            report
                .failures
                .push(ActionError::KeepMissing(plan.keep.path.clone()));
            continue;
        }

        for file in &plan.remove {
            let result = match disposition {
                Disposition::Move(dir) => {
                    let target = unique_target(dir, &file.path, &mut reserved);
                    if dry_run {
                        Ok(Some(target))
                    } else {
                        move_file(&file.path, &target).map(Some)
                    }
                }
                Disposition::Trash if dry_run => Ok(None),
                Disposition::Trash => trash_file(&file.path).map(|()| None),
                Disposition::Delete if dry_run => Ok(None),
                Disposition::Delete => delete_file(&file.path).map(|()| None),
                Disposition::Report => Ok(None),
            };

            match result {
                Ok(target) => {
                    report.bytes_reclaimed += file.size;
                    report.completed.push(ActionOutcome {
                        path: file.path.clone(),
                        target,
                        bytes: file.size,
                    });
                }
                Err(e) => {
                    log::warn!("Failed to process {}: {}", file.path.display(), e);
                    report.failures.push(e);
                }
            }
        }
    }

    log::info!("{}", report.summary());
    report
}

/// First free name in `dir` for `source`: `name.ext`, then `name_1.ext`,
/// `name_2.ext`, and so on.
fn unique_target(dir: &Path, source: &Path, reserved: &mut HashSet<PathBuf>) -> PathBuf {
    let file_name = source
        .file_name()
        .map_or_else(|| "file".into(), |n| n.to_os_string());
    let mut target = dir.join(&file_name);

    let stem = source
        .file_stem()
        .map_or_else(|| "file".to_string(), |s| s.to_string_lossy().into_owned());
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u64;
    while target.exists() || reserved.contains(&target) {
        target = dir.join(format!("{}_{}{}", stem, counter, ext));
        counter += 1;
    }

    reserved.insert(target.clone());
    target
}

pub(crate) fn move_file(path: &Path, target: &Path) -> Result<PathBuf, ActionError> {
    let moved = fs::rename(path, target).or_else(|rename_err| {
        // rename cannot cross filesystems; fall back to copy + remove
        log::debug!(
            "rename {} failed ({}), copying instead",
            path.display(),
            rename_err
        );
        fs::copy(path, target).and_then(|_| fs::remove_file(path))
    });

    match moved {
        Ok(()) => {
            log::info!("Moved {} -> {}", path.display(), target.display());
            Ok(target.to_path_buf())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound && !path.exists() => {
            Err(ActionError::NotFound(path.to_path_buf()))
        }
        Err(source) => Err(ActionError::MoveFailed {
            path: path.to_path_buf(),
            target: target.to_path_buf(),
            source,
        }),
    }
}

fn trash_file(path: &Path) -> Result<(), ActionError> {
    fs::metadata(path).map_err(|e| ActionError::from_io(path, e))?;

    trash::delete(path).map_err(|e| {
        log::error!("Trash operation failed for {}: {}", path.display(), e);
        ActionError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Moved to trash: {}", path.display());
    Ok(())
}

fn delete_file(path: &Path) -> Result<(), ActionError> {
    fs::remove_file(path).map_err(|e| ActionError::from_io(path, e))?;
    log::info!("Deleted {}", path.display());
    Ok(())
}
