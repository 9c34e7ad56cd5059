//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Fingerprint comparison by Hamming distance ([`similarity`])
//! - Exact and perceptual grouping ([`groups`])
//! - Choosing the member to keep in each group ([`selector`])
//! - Parallel hashing and pipeline orchestration ([`finder`])

pub mod finder;
pub mod groups;
pub mod selector;
pub mod similarity;

pub use finder::{
    hash_files, DispatchConfig, DuplicateFinder, FinderError, HashOutcome, ScanSummary,
};
pub use groups::{
    find_groups, group_exact, group_perceptual, ClusterStrategy, DuplicateGroup, GroupingOptions,
    GroupingStats, MatchKind,
};
pub use selector::{removal_candidates, select_keep, KeepPolicy};
pub use similarity::{
    compare_all, compare_images, group_similarity_score, hamming_distance, is_similar,
    percent_similarity, ImageComparison,
};
