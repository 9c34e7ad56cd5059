//! Bit-string comparison for perceptual fingerprints.
//!
//! # Overview
//!
//! Fingerprints are compared by Hamming distance: the number of positions at
//! which two equal-length bit strings differ. Two images are considered
//! similar when that distance is at or below a threshold.
//!
//! # Example
//!
//! ```
//! use file_deduplicator::duplicates::similarity::{hamming_distance, is_similar};
//!
//! assert_eq!(hamming_distance("0101", "1010"), Some(4));
//! assert_eq!(hamming_distance("01", "010"), None);
//! assert!(is_similar(Some(3), 10));
//! assert!(!is_similar(None, 64));
//! ```

use std::path::Path;

use serde::Serialize;

use crate::scanner::{Fingerprint, PerceptualAlgorithm, PerceptualError, PerceptualHasher};

/// Count differing positions between two equal-length strings.
///
/// Returns `None` when the lengths differ; callers treat that as
/// "not similar" rather than as an error.
#[must_use]
pub fn hamming_distance(a: &str, b: &str) -> Option<u32> {
    if a.len() != b.len() {
        return None;
    }
    let differing = a
        .bytes()
        .zip(b.bytes())
        .filter(|(x, y)| x != y)
        .count();
    u32::try_from(differing).ok()
}

/// Whether a distance falls within the threshold (inclusive).
#[must_use]
pub fn is_similar(distance: Option<u32>, threshold: u32) -> bool {
    distance.is_some_and(|d| d <= threshold)
}

/// Approximate similarity percentage reported for a perceptual group.
///
/// Derived from the threshold rather than from measured distances, so every
/// group clustered with the same threshold carries the same score.
#[must_use]
pub fn group_similarity_score(threshold: u32) -> f64 {
    let score = 100.0 - f64::from(threshold) / 64.0 * 100.0;
    if score < 50.0 {
        50.0 + f64::from(threshold)
    } else {
        score
    }
}

/// Similarity percentage for a measured distance, floored at zero.
#[must_use]
pub fn percent_similarity(distance: u32) -> f64 {
    (100.0 - f64::from(distance) / 64.0 * 100.0).max(0.0)
}

/// Result of comparing two images under one algorithm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageComparison {
    /// Algorithm used
    pub algorithm: PerceptualAlgorithm,
    /// Fingerprint of the first image
    pub first: Fingerprint,
    /// Fingerprint of the second image
    pub second: Fingerprint,
    /// Hamming distance between the fingerprints
    pub distance: u32,
    /// Threshold the distance was judged against
    pub threshold: u32,
    /// `100 - distance/64*100`, floored at zero
    pub similarity: f64,
    /// Whether `distance <= threshold`
    pub is_similar: bool,
}

/// Fingerprint two images and compare them.
///
/// # Errors
///
/// Returns `PerceptualError` if either image cannot be read or decoded.
pub fn compare_images(
    a: &Path,
    b: &Path,
    hasher: &PerceptualHasher,
    threshold: u32,
) -> Result<ImageComparison, PerceptualError> {
    let first = hasher.fingerprint_file(a)?;
    let second = hasher.fingerprint_file(b)?;
    let distance = first.distance(&second);

    log::debug!(
        "{} distance between {} and {}: {}",
        hasher.algorithm(),
        a.display(),
        b.display(),
        distance
    );

    Ok(ImageComparison {
        algorithm: hasher.algorithm(),
        first,
        second,
        distance,
        threshold,
        similarity: percent_similarity(distance),
        is_similar: is_similar(Some(distance), threshold),
    })
}

/// Compare two images with every algorithm at its default threshold.
///
/// # Errors
///
/// Returns the first `PerceptualError` encountered.
pub fn compare_all(a: &Path, b: &Path) -> Result<Vec<ImageComparison>, PerceptualError> {
    PerceptualAlgorithm::ALL
        .iter()
        .map(|&alg| compare_images(a, b, &PerceptualHasher::new(alg), alg.default_threshold()))
        .collect()
}
