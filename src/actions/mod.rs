//! File actions module.
//!
//! This module turns duplicate groups into decisions and carries them out:
//! - [`plan`]: pick the member to keep in every group and list the rest
//! - [`apply`]: move, trash or delete the rest, or only report them
//! - [`undo`]: put files moved aside back where they were
//!
//! ```no_run
//! use file_deduplicator::actions::{apply, plan, Disposition};
//! use file_deduplicator::duplicates::KeepPolicy;
//!
//! # let groups = Vec::new();
//! let plans = plan(&groups, &KeepPolicy::Oldest);
//! let report = apply(&plans, &Disposition::Move("dupes".into()), false);
//! println!("{}", report.summary());
//! ```

pub mod apply;
pub mod plan;
pub mod undo;

pub use apply::{apply, ActionError, ActionOutcome, ActionReport, Disposition};
pub use plan::{plan, totals, GroupPlan, PlanTotals};
pub use undo::{undo, UndoEntry, UndoError, UndoLog, UNDO_LOG_FILE};
