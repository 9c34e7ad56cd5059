//! file-deduplicator: duplicate and visually similar file finder.
//!
//! The library is organised around a duplicate-detection engine:
//!
//! - [`scanner`]: content digests, perceptual fingerprints and directory walking
//! - [`duplicates`]: similarity, grouping, keep selection and parallel dispatch
//! - [`actions`]: keep/remove plans, move/trash/delete and undo of moves
//! - [`output`]: text, JSON and CSV reports
//!
//! The `file-deduplicator` binary is a thin shell over [`run_app`].
//!
//! # Example
//!
//! ```no_run
//! use file_deduplicator::config::EngineConfig;
//! use file_deduplicator::duplicates::DuplicateFinder;
//! use std::path::PathBuf;
//!
//! let config = EngineConfig {
//!     perceptual: true,
//!     ..Default::default()
//! };
//! let finder = DuplicateFinder::new(config);
//! let (groups, summary) = finder.find_duplicates(vec![
//!     PathBuf::from("a.jpg"),
//!     PathBuf::from("b.jpg"),
//! ]);
//! println!("{} group(s), {}", groups.len(), summary.reclaimable_display());
//! ```

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actions::{apply, plan, undo, Disposition, UndoLog};
use crate::cli::{Cli, Commands, CompareArgs, OutputFormat, ScanArgs, UndoArgs};
use crate::config::EngineConfig;
use crate::duplicates::{compare_all, compare_images, DuplicateFinder};
use crate::error::ExitCode;
use crate::output::{text, CsvOutput, JsonOutput};
use crate::progress::{Progress, ProgressCallback};

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for fatal conditions such as unreadable configuration,
/// a bad scan root, an interrupted walk, a missing undo log or a failure
/// writing the report.
/// Per-file problems are reported through the exit code instead.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Scan(ref args) => handle_scan(args, cli.quiet),
        Commands::Compare(ref args) => handle_compare(args),
        Commands::Undo(ref args) => handle_undo(args),
    }
}

fn handle_scan(args: &ScanArgs, quiet: bool) -> Result<ExitCode> {
    let mut config =
        EngineConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_to(&mut config);

    if let Some(ref path) = args.save_config {
        config
            .save(path)
            .with_context(|| format!("Failed to save configuration to {}", path.display()))?;
        log::info!("Saved configuration to {}", path.display());
    }

    if log::log_enabled!(log::Level::Debug) {
        if let Ok(rendered) = config.to_toml() {
            log::debug!(
                "Effective configuration (log level {}):\n{}",
                logging::current_level_name(),
                rendered
            );
        }
    }

    let handler = signal::install_handler()?;
    let mut finder = DuplicateFinder::new(config.clone()).with_shutdown_flag(handler.get_flag());
    if !quiet && !args.output.is_machine_readable() {
        let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(false));
        finder = finder.with_progress_callback(progress);
    }

    let (groups, summary) = finder
        .find_duplicates_in_dir(&args.path, &args.walk_options())
        .with_context(|| format!("Failed to scan {}", args.path.display()))?;

    let plans = plan(&groups, &config.keep);

    let disposition = args.disposition();
    let report = if summary.interrupted && disposition != Disposition::Report {
        log::warn!("Scan was interrupted; no files will be moved or deleted");
        None
    } else if disposition == Disposition::Report {
        None
    } else {
        Some(apply(&plans, &disposition, args.dry_run))
    };

    let mut action_failures = report.as_ref().map_or(0, |r| r.failure_count());
    if let (Disposition::Move(dir), Some(report)) = (&disposition, &report) {
        if let Err(e) = UndoLog::record(dir, report) {
            log::error!("Moves in {} cannot be undone: {}", dir.display(), e);
            action_failures += 1;
        }
    }
    let exit_code = ExitCode::for_scan(
        groups.len(),
        summary.error_count() + action_failures,
        summary.interrupted,
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => {
            text::write_report(&mut out, &plans, &summary)?;
            if let Some(ref report) = report {
                writeln!(out)?;
                text::write_actions(&mut out, report)?;
            }
        }
        OutputFormat::Json => {
            JsonOutput::new(&plans, &summary, exit_code).write_to(&mut out)?;
        }
        OutputFormat::Csv => {
            CsvOutput::new(&plans).write_to(&mut out)?;
        }
    }
    out.flush()?;

    if args.output.is_machine_readable() && !quiet {
        if let Some(ref report) = report {
            eprintln!("{}", report.summary());
        }
    }

    Ok(exit_code)
}

fn handle_compare(args: &CompareArgs) -> Result<ExitCode> {
    let mut config =
        EngineConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_to(&mut config);

    let context = || {
        format!(
            "Failed to compare {} and {}",
            args.first.display(),
            args.second.display()
        )
    };
    let comparisons = compare_all(&args.first, &args.second).with_context(context)?;
    let verdict = compare_images(
        &args.first,
        &args.second,
        &config.perceptual_hasher(),
        config.effective_threshold(),
    )
    .with_context(context)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    text::write_comparison(&mut out, &args.first, &args.second, &comparisons, &verdict)?;
    out.flush()?;

    Ok(if verdict.is_similar {
        ExitCode::Success
    } else {
        ExitCode::NoDuplicates
    })
}

fn handle_undo(args: &UndoArgs) -> Result<ExitCode> {
    let report = undo(&args.dir, args.dry_run)
        .with_context(|| format!("Failed to undo moves into {}", args.dir.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    text::write_actions(&mut out, &report)?;
    out.flush()?;

    Ok(if report.all_succeeded() {
        ExitCode::Success
    } else {
        ExitCode::PartialSuccess
    })
}
