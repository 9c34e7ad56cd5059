//! JSON output formatter for duplicate scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "key": "e3b0c442...",
//!       "kind": "exact",
//!       "similarity": 100.0,
//!       "keep": "/photos/a.jpg",
//!       "remove": ["/backup/a.jpg"],
//!       "reclaimable": 1024
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 100,
//!     "duplicate_groups": 1,
//!     "reclaimable_space": 1024,
//!     "interrupted": false,
//!     "exit_code": 0,
//!     "exit_code_name": "DD000"
//!   }
//! }
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::actions::GroupPlan;
use crate::duplicates::{MatchKind, ScanSummary};
use crate::error::ExitCode;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Digest (exact) or seed fingerprint (perceptual)
    pub key: String,
    /// How the group was matched
    pub kind: MatchKind,
    /// Similarity score in percent
    pub similarity: f64,
    /// Path of the kept file
    pub keep: String,
    /// Paths of the removal candidates
    pub remove: Vec<String>,
    /// Bytes freed by removing the candidates
    pub reclaimable: u64,
}

impl JsonDuplicateGroup {
    /// Convert a plan into its JSON form.
    #[must_use]
    pub fn from_plan(plan: &GroupPlan) -> Self {
        Self {
            key: plan.group_key.clone(),
            kind: plan.kind,
            similarity: plan.similarity_score,
            keep: normalize_path(&plan.keep.path),
            remove: plan.remove.iter().map(|f| normalize_path(&f.path)).collect(),
            reclaimable: plan.reclaimable,
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Candidate files handed to the engine
    pub total_files: usize,
    /// Files successfully hashed
    pub hashed_files: usize,
    /// Total size of hashed files in bytes
    pub total_size: u64,
    /// Files carrying a perceptual fingerprint
    pub image_files: usize,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Groups formed by identical content
    pub exact_groups: usize,
    /// Groups formed by perceptual similarity
    pub perceptual_groups: usize,
    /// Files marked for removal
    pub duplicate_files: usize,
    /// Bytes freed by removing every candidate under the keep policy
    pub reclaimable_space: u64,
    /// Files that could not be hashed
    pub hash_errors: usize,
    /// Images that fell back to exact matching
    pub fingerprint_failures: usize,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// Duration of the hash phase in milliseconds
    pub hash_duration_ms: u64,
    /// Duration of the grouping phase in milliseconds
    pub group_duration_ms: u64,
    /// Whether the scan was interrupted
    pub interrupted: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DD000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a scan summary and the planned removals.
    #[must_use]
    pub fn new(summary: &ScanSummary, plans: &[GroupPlan], exit_code: ExitCode) -> Self {
        let totals = crate::actions::totals(plans);
        Self {
            total_files: summary.total_files,
            hashed_files: summary.hashed_files,
            total_size: summary.total_size,
            image_files: summary.image_files,
            duplicate_groups: totals.groups,
            exact_groups: summary.exact_groups,
            perceptual_groups: summary.perceptual_groups,
            duplicate_files: totals.files_to_remove,
            reclaimable_space: totals.reclaimable,
            hash_errors: summary.hash_errors.len(),
            fingerprint_failures: summary.fingerprint_failures,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            hash_duration_ms: summary.hash_duration.as_millis() as u64,
            group_duration_ms: summary.group_duration.as_millis() as u64,
            interrupted: summary.interrupted,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// List of duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the output document.
    #[must_use]
    pub fn new(plans: &[GroupPlan], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            duplicates: plans.iter().map(JsonDuplicateGroup::from_plan).collect(),
            summary: JsonSummary::new(summary, plans, exit_code),
        }
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns `std::io::Error` if serialization or writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()
    }
}

/// Absolute path string where resolvable, lossy otherwise.
pub(crate) fn normalize_path(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}
