//! Plain-text report for terminals.
//!
//! ```text
//! Group 1 (exact, 3 files, 2.0 MiB reclaimable)
//!   KEEP    /photos/beach.jpg  1.0 MiB  2024-05-01 10:22
//!   REMOVE  /backup/beach.jpg  1.0 MiB  2024-06-11 08:03
//! ```

use std::io::{self, Write};
use std::path::Path;

use bytesize::ByteSize;
use chrono::{DateTime, Local};

use crate::actions::{totals, ActionReport, GroupPlan};
use crate::duplicates::{ImageComparison, MatchKind, ScanSummary};
use crate::scanner::HashedFile;

/// Write the per-group listing followed by the summary.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_report<W: Write>(
    mut out: W,
    plans: &[GroupPlan],
    summary: &ScanSummary,
) -> io::Result<()> {
    for (idx, plan) in plans.iter().enumerate() {
        match plan.kind {
            MatchKind::Exact => writeln!(
                out,
                "Group {} (exact, {} files, {} reclaimable)",
                idx + 1,
                plan.len(),
                ByteSize::b(plan.reclaimable)
            )?,
            MatchKind::Perceptual => writeln!(
                out,
                "Group {} (similar images, ~{:.1}% similar, {} files, {} reclaimable)",
                idx + 1,
                plan.similarity_score,
                plan.len(),
                ByteSize::b(plan.reclaimable)
            )?,
        }
        write_member(&mut out, "KEEP  ", &plan.keep)?;
        for file in &plan.remove {
            write_member(&mut out, "REMOVE", file)?;
        }
        writeln!(out)?;
    }

    write_summary(out, plans, summary)
}

fn write_member<W: Write>(out: &mut W, label: &str, file: &HashedFile) -> io::Result<()> {
    writeln!(
        out,
        "  {}  {}  {}  {}",
        label,
        file.path.display(),
        ByteSize::b(file.size),
        DateTime::<Local>::from(file.modified).format("%Y-%m-%d %H:%M")
    )
}

/// Write the closing summary block.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_summary<W: Write>(
    mut out: W,
    plans: &[GroupPlan],
    summary: &ScanSummary,
) -> io::Result<()> {
    let totals = totals(plans);

    writeln!(out, "Summary")?;
    writeln!(
        out,
        "  Files scanned:     {} ({})",
        summary.hashed_files,
        summary.total_size_display()
    )?;
    if summary.image_files > 0 {
        writeln!(out, "  Images compared:   {}", summary.image_files)?;
    }
    writeln!(
        out,
        "  Duplicate groups:  {} ({} exact, {} similar)",
        totals.groups, summary.exact_groups, summary.perceptual_groups
    )?;
    writeln!(out, "  Duplicate files:   {}", totals.files_to_remove)?;
    writeln!(out, "  Reclaimable:       {}", ByteSize::b(totals.reclaimable))?;
    if summary.error_count() > 0 {
        writeln!(
            out,
            "  Errors:            {} (run with -v for details)",
            summary.error_count()
        )?;
    }
    if summary.fingerprint_failures > 0 {
        writeln!(
            out,
            "  Undecodable images: {} (matched by content only)",
            summary.fingerprint_failures
        )?;
    }
    writeln!(out, "  Elapsed:           {:.2?}", summary.scan_duration)?;
    if summary.interrupted {
        writeln!(
            out,
            "  Interrupted: results cover {} of {} files",
            summary.hashed_files, summary.total_files
        )?;
    }
    Ok(())
}

/// Write the outcome of an action pass.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_actions<W: Write>(mut out: W, report: &ActionReport) -> io::Result<()> {
    for outcome in &report.completed {
        match &outcome.target {
            Some(target) => writeln!(
                out,
                "  {} -> {}",
                outcome.path.display(),
                target.display()
            )?,
            None => writeln!(out, "  {}", outcome.path.display())?,
        }
    }
    for failure in &report.failures {
        writeln!(out, "  FAILED {}", failure)?;
    }
    writeln!(out, "{}", report.summary())
}

/// Write the per-algorithm comparison followed by the final verdict.
///
/// `verdict` is the comparison under the configured algorithm and
/// threshold; it alone decides the recommendation.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_comparison<W: Write>(
    mut out: W,
    first: &Path,
    second: &Path,
    comparisons: &[ImageComparison],
    verdict: &ImageComparison,
) -> io::Result<()> {
    writeln!(out, "Comparing:")?;
    writeln!(out, "  A: {}", first.display())?;
    writeln!(out, "  B: {}", second.display())?;
    writeln!(out)?;

    for cmp in comparisons {
        writeln!(out, "{} ({})", cmp.algorithm, cmp.algorithm.description())?;
        writeln!(out, "  A:          {}", cmp.first)?;
        writeln!(out, "  B:          {}", cmp.second)?;
        writeln!(out, "  Distance:   {}/64", cmp.distance)?;
        writeln!(out, "  Similarity: {:.1}%", cmp.similarity)?;
        writeln!(out, "  Threshold:  {}", cmp.threshold)?;
        writeln!(out, "  Result:     {}", verdict_word(cmp))?;
        writeln!(out)?;
    }

    writeln!(out, "Recommendation")?;
    writeln!(
        out,
        "Images are {} (using {}, threshold {})",
        verdict_word(verdict),
        verdict.algorithm,
        verdict.threshold
    )?;
    writeln!(
        out,
        "  Similarity: {:.1}% (distance: {})",
        verdict.similarity, verdict.distance
    )
}

fn verdict_word(cmp: &ImageComparison) -> &'static str {
    if cmp.is_similar {
        "SIMILAR"
    } else {
        "DIFFERENT"
    }
}
