//! Output formatters for duplicate scan results.
//!
//! - [`text`]: human-readable report for terminals
//! - [`json`]: machine-readable document for automation
//! - [`csv`]: one row per file for spreadsheets
//!
//! All formatters take the keep/remove plans rather than raw groups, so the
//! kept member shown is always the one the actions would preserve.

pub mod csv;
pub mod json;
pub mod text;

pub use csv::{CsvOutput, CsvOutputError};
pub use json::JsonOutput;
