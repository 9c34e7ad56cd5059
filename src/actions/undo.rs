//! Undo log for duplicates moved aside.
//!
//! A move pass appends every relocated file to a JSON log kept inside the
//! move directory. [`undo`] reads the log back and returns each file to its
//! original path, newest move first. Entries that cannot be restored stay in
//! the log so a later run can retry them.
//!
//! Trash and delete are not logged: deleted files cannot be brought back and
//! trashed ones are restored through the platform trash.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::apply::{move_file, ActionError, ActionOutcome, ActionReport};

/// Name of the undo log inside a move directory.
pub const UNDO_LOG_FILE: &str = ".file-deduplicator-undo.json";

/// Errors reading or writing the undo log.
#[derive(Debug, Error)]
pub enum UndoError {
    /// The directory has no undo log.
    #[error("no undo log found in {0}")]
    NoLog(PathBuf),

    /// The log exists but is not valid JSON of the expected shape.
    #[error("invalid undo log {path}: {source}")]
    Invalid {
        /// Path of the log
        path: PathBuf,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The log could not be read, written or removed.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path of the log
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// One file that was moved aside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoEntry {
    /// Where the file lived before the move
    pub path: PathBuf,
    /// Where the file was moved to
    pub target: PathBuf,
    /// File size in bytes
    pub bytes: u64,
    /// When the move happened
    pub moved_at: DateTime<Utc>,
}

/// Every move recorded for one move directory, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoLog {
    /// Recorded moves
    pub entries: Vec<UndoEntry>,
}

impl UndoLog {
    /// Location of the log for a move directory.
    #[must_use]
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(UNDO_LOG_FILE)
    }

    /// Read the log kept in `dir`.
    ///
    /// # Errors
    ///
    /// Returns `UndoError::NoLog` when there is no log, `Invalid` when it
    /// cannot be parsed and `Io` for other read failures.
    pub fn load(dir: &Path) -> Result<Self, UndoError> {
        let path = Self::path_in(dir);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(UndoError::NoLog(dir.to_path_buf()))
            }
            Err(source) => return Err(UndoError::Io { path, source }),
        };
        serde_json::from_str(&data).map_err(|source| UndoError::Invalid { path, source })
    }

    /// Write the log into `dir`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `UndoError` if the log cannot be serialized or written.
    pub fn save(&self, dir: &Path) -> Result<(), UndoError> {
        let path = Self::path_in(dir);
        let json = serde_json::to_string_pretty(self).map_err(|source| UndoError::Invalid {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| UndoError::Io { path, source })
    }

    /// Append the moves from a finished pass to the log in `dir`.
    ///
    /// Dry runs and passes without moves leave the log untouched. Returns the
    /// number of entries added.
    ///
    /// # Errors
    ///
    /// Returns `UndoError` if an existing log is unreadable or the new one
    /// cannot be written.
    pub fn record(dir: &Path, report: &ActionReport) -> Result<usize, UndoError> {
        if report.dry_run {
            return Ok(0);
        }

        let moved_at = Utc::now();
        let moved: Vec<UndoEntry> = report
            .completed
            .iter()
            .filter_map(|outcome| {
                outcome.target.as_ref().map(|target| UndoEntry {
                    path: outcome.path.clone(),
                    target: target.clone(),
                    bytes: outcome.bytes,
                    moved_at,
                })
            })
            .collect();
        if moved.is_empty() {
            return Ok(0);
        }

        let mut log = match Self::load(dir) {
            Ok(log) => log,
            Err(UndoError::NoLog(_)) => Self::default(),
            Err(e) => return Err(e),
        };
        let added = moved.len();
        log.entries.extend(moved);
        log.save(dir)?;

        log::info!(
            "Recorded {} move(s) in {}",
            added,
            Self::path_in(dir).display()
        );
        Ok(added)
    }
}

/// Move every file logged in `dir` back to its original path.
///
/// A restore never overwrites: if something already exists at the original
/// path the entry fails with `ActionError::Occupied`. With `dry_run` nothing
/// moves and the log is kept. Otherwise the log is removed once empty, or
/// rewritten with the entries that failed.
///
/// # Errors
///
/// Returns `UndoError` if the log cannot be read or updated. Per-file
/// failures are collected in the returned report.
pub fn undo(dir: &Path, dry_run: bool) -> Result<ActionReport, UndoError> {
    let log = UndoLog::load(dir)?;
    let mut report = ActionReport::new("restored", dry_run);
    let mut remaining = Vec::new();

    for entry in log.entries.iter().rev() {
        let result = if entry.path.exists() {
            Err(ActionError::Occupied(entry.path.clone()))
        } else if dry_run {
            if entry.target.exists() {
                Ok(())
            } else {
                Err(ActionError::NotFound(entry.target.clone()))
            }
        } else {
            restore(entry)
        };

        match result {
            Ok(()) => report.completed.push(ActionOutcome {
                path: entry.target.clone(),
                target: Some(entry.path.clone()),
                bytes: entry.bytes,
            }),
            Err(e) => {
                log::warn!("Cannot restore {}: {}", entry.path.display(), e);
                report.failures.push(e);
                remaining.push(entry.clone());
            }
        }
    }

    if !dry_run {
        let path = UndoLog::path_in(dir);
        if remaining.is_empty() {
            fs::remove_file(&path).map_err(|source| UndoError::Io { path, source })?;
        } else {
            remaining.reverse();
            UndoLog { entries: remaining }.save(dir)?;
        }
    }

    log::info!("{}", report.summary());
    Ok(report)
}

fn restore(entry: &UndoEntry) -> Result<(), ActionError> {
    if let Some(parent) = entry.path.parent() {
        fs::create_dir_all(parent).map_err(|e| ActionError::from_io(parent, e))?;
    }
    move_file(&entry.target, &entry.path).map(|_| ())
}
