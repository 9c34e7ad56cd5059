//! CSV output formatter for duplicate scan results.
//!
//! One row is generated for each member of each group.
//!
//! # Columns
//!
//! - `group_id`: 1-based group number
//! - `kind`: `exact` or `perceptual`
//! - `key`: digest or seed fingerprint
//! - `similarity`: group similarity in percent
//! - `path`: absolute path to the file
//! - `size`: file size in bytes
//! - `modified`: last modified time (RFC 3339)
//! - `keep`: `true` for the member that survives

use std::io;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::json::normalize_path;
use crate::actions::GroupPlan;
use crate::duplicates::MatchKind;
use crate::scanner::HashedFile;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The buffered output was not valid UTF-8.
    #[error("CSV output is not valid UTF-8")]
    Utf8,
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    kind: MatchKind,
    key: &'a str,
    similarity: f64,
    path: String,
    size: u64,
    modified: String,
    keep: bool,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    plans: &'a [GroupPlan],
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(plans: &'a [GroupPlan]) -> Self {
        Self { plans }
    }

    /// Write the CSV output (with header) to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, plan) in self.plans.iter().enumerate() {
            let row = |file: &HashedFile, keep: bool| CsvRow {
                group_id: idx + 1,
                kind: plan.kind,
                key: &plan.group_key,
                similarity: plan.similarity_score,
                path: normalize_path(&file.path),
                size: file.size,
                modified: format_modified(file.modified),
                keep,
            };

            csv_writer.serialize(row(&plan.keep, true))?;
            for file in &plan.remove {
                csv_writer.serialize(row(file, false))?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_csv_string(&self) -> Result<String, CsvOutputError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        String::from_utf8(buf).map_err(|_| CsvOutputError::Utf8)
    }
}

fn format_modified(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}
