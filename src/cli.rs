//! Command-line interface definitions.
//!
//! ```bash
//! # Exact duplicates, report only
//! file-deduplicator scan ~/Downloads
//!
//! # Similar photos, keep the largest, move the rest aside
//! file-deduplicator scan ~/Pictures --perceptual --keep largest --move-to ~/dupes
//!
//! # JSON for scripting
//! file-deduplicator scan ~/Downloads --output json
//!
//! # Compare two images with every fingerprint algorithm
//! file-deduplicator compare a.jpg b.jpg --algorithm phash
//!
//! # Put files moved by an earlier scan back where they were
//! file-deduplicator undo ~/dupes
//! ```
//!
//! Flags that are not given leave the loaded configuration untouched, so the
//! precedence is defaults < config file < `DEDUP_*` environment < flags.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use glob::Pattern;

use crate::actions::Disposition;
use crate::config::EngineConfig;
use crate::duplicates::{ClusterStrategy, KeepPolicy};
use crate::scanner::{HashAlgorithm, PerceptualAlgorithm, Preprocessing, Strictness, WalkOptions};

/// Find duplicate and visually similar files.
#[derive(Debug, Parser)]
#[command(name = "file-deduplicator")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate files
    Scan(ScanArgs),
    /// Compare two images with every fingerprint algorithm
    Compare(CompareArgs),
    /// Restore files moved by an earlier scan with --move-to
    Undo(UndoArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory path to scan for duplicates
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Configuration file (TOML); defaults to ./.deduprc.toml or the user config
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the effective configuration (file, environment and flags) to FILE
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<PathBuf>,

    /// Content hash algorithm: md5, sha1 or sha256
    #[arg(long = "hash", value_name = "ALGORITHM")]
    pub hash_algorithm: Option<String>,

    /// Group visually similar images as well as identical files
    #[arg(short, long)]
    pub perceptual: bool,

    /// Fingerprint algorithm: dhash, ahash or phash
    #[arg(long, value_name = "ALGORITHM")]
    pub algorithm: Option<String>,

    /// Maximum Hamming distance (0-64) for two images to match
    #[arg(short, long, value_name = "N")]
    pub threshold: Option<u32>,

    /// Scale the algorithm's default threshold: strict, normal or loose
    #[arg(long, value_name = "LEVEL")]
    pub strictness: Option<String>,

    /// Perceptual clustering strategy
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub cluster: Option<ClusterArg>,

    /// Skip gamma, equalization and blur before fingerprinting
    #[arg(long)]
    pub no_preprocess: bool,

    /// Number of worker threads (default: all cores)
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Which file to keep: oldest, newest, largest, smallest, first, path:<substring>
    #[arg(short, long, value_name = "POLICY")]
    pub keep: Option<String>,

    /// Minimum file size to consider (e.g., 1KB, 1MB, 1GB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Maximum file size to consider (e.g., 1KB, 1MB, 1GB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Only include files whose name matches this glob (e.g., "*.jpg")
    #[arg(long, value_name = "GLOB", value_parser = parse_pattern)]
    pub pattern: Option<Pattern>,

    /// Only scan the top-level directory
    #[arg(long)]
    pub no_recursive: bool,

    /// Include hidden files and directories (starting with .)
    #[arg(long)]
    pub include_hidden: bool,

    /// Follow symbolic links during scan
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Move duplicates into this directory
    #[arg(long, value_name = "DIR", group = "disposition")]
    pub move_to: Option<PathBuf>,

    /// Move duplicates to the system trash
    #[arg(long, group = "disposition")]
    pub trash: bool,

    /// Permanently delete duplicates
    #[arg(long, group = "disposition")]
    pub delete: bool,

    /// Show what would be moved or deleted without touching anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

impl ScanArgs {
    /// Overlay the flags that were given onto a loaded configuration.
    pub fn apply_to(&self, config: &mut EngineConfig) {
        if let Some(ref name) = self.hash_algorithm {
            config.hash_algorithm = HashAlgorithm::from_name(name);
        }
        if self.perceptual {
            config.perceptual = true;
        }
        if let Some(ref name) = self.algorithm {
            config.perceptual_algorithm = PerceptualAlgorithm::from_name(name);
        }
        if let Some(threshold) = self.threshold {
            config.similarity_threshold = Some(threshold);
        }
        if let Some(ref name) = self.strictness {
            config.strictness = Strictness::from_name(name);
        }
        if let Some(cluster) = self.cluster {
            config.cluster_strategy = cluster.into();
        }
        if self.no_preprocess {
            config.preprocessing = Preprocessing::none();
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(ref name) = self.keep {
            config.keep = KeepPolicy::parse(name);
        }
    }

    /// Directory walk options from the filter flags.
    #[must_use]
    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            recursive: !self.no_recursive,
            skip_hidden: !self.include_hidden,
            follow_symlinks: self.follow_symlinks,
            min_size: self.min_size,
            max_size: self.max_size,
            pattern: self.pattern.clone(),
        }
    }

    /// What to do with removal candidates.
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        if let Some(ref dir) = self.move_to {
            Disposition::Move(dir.clone())
        } else if self.trash {
            Disposition::Trash
        } else if self.delete {
            Disposition::Delete
        } else {
            Disposition::Report
        }
    }
}

/// Arguments for the compare subcommand.
#[derive(Debug, Args)]
pub struct CompareArgs {
    /// First image
    #[arg(value_name = "IMAGE_A")]
    pub first: PathBuf,

    /// Second image
    #[arg(value_name = "IMAGE_B")]
    pub second: PathBuf,

    /// Configuration file (TOML); defaults to ./.deduprc.toml or the user config
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Algorithm for the final verdict: dhash, ahash or phash
    #[arg(long, value_name = "ALGORITHM")]
    pub algorithm: Option<String>,

    /// Maximum Hamming distance (0-64) for the final verdict
    #[arg(short, long, value_name = "N")]
    pub threshold: Option<u32>,

    /// Scale the algorithm's default threshold: strict, normal or loose
    #[arg(long, value_name = "LEVEL")]
    pub strictness: Option<String>,

    /// Skip gamma, equalization and blur before fingerprinting
    #[arg(long)]
    pub no_preprocess: bool,
}

impl CompareArgs {
    /// Overlay the flags that were given onto a loaded configuration.
    pub fn apply_to(&self, config: &mut EngineConfig) {
        if let Some(ref name) = self.algorithm {
            config.perceptual_algorithm = PerceptualAlgorithm::from_name(name);
        }
        if let Some(threshold) = self.threshold {
            config.similarity_threshold = Some(threshold);
        }
        if let Some(ref name) = self.strictness {
            config.strictness = Strictness::from_name(name);
        }
        if self.no_preprocess {
            config.preprocessing = Preprocessing::none();
        }
    }
}

/// Arguments for the undo subcommand.
#[derive(Debug, Args)]
pub struct UndoArgs {
    /// Directory that duplicates were moved into
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Show what would be restored without touching anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl OutputFormat {
    /// Whether stdout carries machine-readable data.
    #[must_use]
    pub fn is_machine_readable(self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// Clustering strategy flag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClusterArg {
    /// Compare each image to its group's first image only
    Seed,
    /// Join any chain of images within the threshold
    Connected,
}

impl From<ClusterArg> for ClusterStrategy {
    fn from(arg: ClusterArg) -> Self {
        match arg {
            ClusterArg::Seed => Self::Seed,
            ClusterArg::Connected => Self::Connected,
        }
    }
}

/// Parse a file name glob such as `*.jpg` or `IMG_????.png`.
///
/// # Errors
///
/// Returns the glob syntax error as a message.
pub fn parse_pattern(s: &str) -> Result<Pattern, String> {
    Pattern::new(s).map_err(|e| format!("Invalid pattern '{s}': {e}"))
}

/// Parse a human-readable size such as `1.5MB` or `4KiB` into bytes.
///
/// # Errors
///
/// Returns a message describing the malformed number or suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("100"), Ok(100));
        assert_eq!(parse_size("1KB"), Ok(1_000));
        assert_eq!(parse_size("1.5 MiB"), Ok(1_572_864));
        assert!(parse_size("").is_err());
        assert!(parse_size("12XB").is_err());
        assert!(parse_size("-3").is_err());
    }

    #[test]
    fn test_cli_parse_scan_defaults() {
        let cli = Cli::try_parse_from(["file-deduplicator", "scan", "/photos"]).unwrap();
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.path, PathBuf::from("/photos"));
                assert_eq!(args.output, OutputFormat::Text);
                assert_eq!(args.disposition(), Disposition::Report);
                assert!(args.walk_options().recursive);
                assert!(args.walk_options().skip_hidden);
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "file-deduplicator",
            "scan",
            "/p",
            "--perceptual",
            "--algorithm",
            "average",
            "--threshold",
            "7",
            "--keep",
            "path:/keep",
            "--hash",
            "MD5",
            "--cluster",
            "connected",
            "--no-preprocess",
        ])
        .unwrap();
        let Commands::Scan(args) = cli.command else {
            panic!("Expected Scan command");
        };

        let mut config = EngineConfig::default();
        args.apply_to(&mut config);
        assert!(config.perceptual);
        assert_eq!(config.perceptual_algorithm, PerceptualAlgorithm::Ahash);
        assert_eq!(config.effective_threshold(), 7);
        assert_eq!(config.keep, KeepPolicy::PathContains("/keep".into()));
        assert_eq!(config.hash_algorithm, HashAlgorithm::Md5);
        assert_eq!(config.cluster_strategy, ClusterStrategy::Connected);
        assert_eq!(config.preprocessing, Preprocessing::none());
    }

    #[test]
    fn test_unset_flags_leave_config_alone() {
        let cli = Cli::try_parse_from(["file-deduplicator", "scan", "/p"]).unwrap();
        let Commands::Scan(args) = cli.command else {
            panic!("Expected Scan command");
        };
        let mut config = EngineConfig {
            perceptual: true,
            workers: Some(3),
            ..Default::default()
        };
        let before = config.clone();
        args.apply_to(&mut config);
        assert_eq!(config, before);
    }

    #[test]
    fn test_dispositions_are_exclusive() {
        let result = Cli::try_parse_from(["file-deduplicator", "scan", "/p", "--trash", "--delete"]);
        assert!(result.is_err());

        let cli =
            Cli::try_parse_from(["file-deduplicator", "scan", "/p", "--move-to", "/dupes"]).unwrap();
        let Commands::Scan(args) = cli.command else {
            panic!("Expected Scan command");
        };
        assert_eq!(args.disposition(), Disposition::Move(PathBuf::from("/dupes")));
    }

    #[test]
    fn test_cli_parse_compare() {
        let cli = Cli::try_parse_from(["file-deduplicator", "compare", "a.png", "b.png"]).unwrap();
        match cli.command {
            Commands::Compare(args) => {
                assert_eq!(args.first, PathBuf::from("a.png"));
                assert_eq!(args.second, PathBuf::from("b.png"));
            }
            _ => panic!("Expected Compare command"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["file-deduplicator", "-q", "-v", "scan", "/p"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_pattern_flag() {
        let cli = Cli::try_parse_from(["file-deduplicator", "scan", "/p", "--pattern", "*.jpg"]).unwrap();
        let Commands::Scan(args) = cli.command else {
            panic!("Expected Scan command");
        };
        let walk = args.walk_options();
        let pattern = walk.pattern.expect("pattern should be set");
        assert!(pattern.matches("beach.jpg"));
        assert!(!pattern.matches("beach.png"));

        let bad = Cli::try_parse_from(["file-deduplicator", "scan", "/p", "--pattern", "[*.jpg"]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_compare_flags_override_config() {
        let cli = Cli::try_parse_from([
            "file-deduplicator",
            "compare",
            "a.png",
            "b.png",
            "--algorithm",
            "phash",
            "--threshold",
            "3",
            "--no-preprocess",
        ])
        .unwrap();
        let Commands::Compare(args) = cli.command else {
            panic!("Expected Compare command");
        };

        let mut config = EngineConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.perceptual_algorithm, PerceptualAlgorithm::Phash);
        assert_eq!(config.effective_threshold(), 3);
        assert_eq!(config.perceptual_hasher().preprocessing(), Preprocessing::none());
    }

    #[test]
    fn test_cli_parse_undo() {
        let cli = Cli::try_parse_from(["file-deduplicator", "undo", "/dupes", "-n"]).unwrap();
        let Commands::Undo(args) = cli.command else {
            panic!("Expected Undo command");
        };
        assert_eq!(args.dir, PathBuf::from("/dupes"));
        assert!(args.dry_run);
    }
}
