//! Duplicate groups and the grouping engine.
//!
//! # Overview
//!
//! Grouping runs after every file has been hashed. Two strategies combine:
//!
//! - **Exact**: files are partitioned by content digest; partitions with at
//!   least two members become groups with a similarity score of 100.
//! - **Perceptual**: files carrying a fingerprint are clustered by Hamming
//!   distance against a threshold. Files without a fingerprint (non-images or
//!   failed decodes) fall back to exact partitioning.
//!
//! A file ends up in at most one group, and no group ever has fewer than two
//! members.
//!
//! # Example
//!
//! ```
//! use file_deduplicator::scanner::HashedFile;
//! use file_deduplicator::duplicates::group_exact;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let now = SystemTime::now();
//! let files = vec![
//!     HashedFile::new(PathBuf::from("/a"), 3, "h1", now),
//!     HashedFile::new(PathBuf::from("/b"), 3, "h1", now),
//!     HashedFile::new(PathBuf::from("/c"), 3, "h2", now),
//! ];
//!
//! let groups = group_exact(files);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].group_key, "h1");
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::similarity::{group_similarity_score, is_similar};
use crate::scanner::HashedFile;

/// How the members of a group were matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Identical content digest
    Exact,
    /// Fingerprints within the similarity threshold
    Perceptual,
}

/// A set of files judged to be duplicates of each other.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    /// Shared digest (exact) or the seed's fingerprint (perceptual)
    pub group_key: String,
    /// Size of the first member in bytes
    pub representative_size: u64,
    /// Member files, at least two
    pub members: Vec<HashedFile>,
    /// 100.0 for exact groups, threshold-derived for perceptual groups
    pub similarity_score: f64,
    /// How the members were matched
    pub kind: MatchKind,
}

impl DuplicateGroup {
    /// Create an exact-content group.
    ///
    /// Returns `None` when fewer than two members are supplied.
    #[must_use]
    pub fn exact(digest: impl Into<String>, members: Vec<HashedFile>) -> Option<Self> {
        Self::build(digest.into(), members, 100.0, MatchKind::Exact)
    }

    /// Create a perceptual-similarity group.
    ///
    /// Returns `None` when fewer than two members are supplied.
    #[must_use]
    pub fn perceptual(
        seed_fingerprint: impl Into<String>,
        members: Vec<HashedFile>,
        similarity_score: f64,
    ) -> Option<Self> {
        Self::build(
            seed_fingerprint.into(),
            members,
            similarity_score,
            MatchKind::Perceptual,
        )
    }

    fn build(
        group_key: String,
        members: Vec<HashedFile>,
        similarity_score: f64,
        kind: MatchKind,
    ) -> Option<Self> {
        if members.len() < 2 {
            return None;
        }
        let representative_size = members[0].size;
        Some(Self {
            group_key,
            representative_size,
            members,
            similarity_score,
            kind,
        })
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.members.iter().map(|f| f.size).sum()
    }

    /// Space held by members other than the first.
    ///
    /// The selector may keep a different member; see
    /// [`crate::actions::GroupPlan::reclaimable`] for the policy-aware figure.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.total_size().saturating_sub(self.representative_size)
    }

    /// Number of duplicate copies (total - 1 kept).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Whether this group was formed by identical content.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.kind == MatchKind::Exact
    }

    /// Get just the paths of files in this group.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|f| f.path.clone()).collect()
    }
}

/// Clustering strategy for perceptual grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ClusterStrategy {
    /// Greedy sweep: each unassigned file seeds a group and absorbs every
    /// later unassigned file within the threshold of the seed.
    #[default]
    Seed,
    /// Transitive closure: any chain of pairs within the threshold joins
    /// files into one group.
    Connected,
}

impl ClusterStrategy {
    /// Resolve a strategy name, falling back to `Seed`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "seed" => Self::Seed,
            "connected" | "transitive" => Self::Connected,
            other => {
                log::warn!("Unknown cluster strategy {:?}, using seed", other);
                Self::Seed
            }
        }
    }
}

impl From<String> for ClusterStrategy {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

/// Partition files by content digest.
///
/// Partitions are emitted in the order their digest was first seen, and
/// members keep their input order. Singletons are dropped.
#[must_use]
pub fn group_exact(files: impl IntoIterator<Item = HashedFile>) -> Vec<DuplicateGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<HashedFile>> = HashMap::new();

    for file in files {
        match buckets.get_mut(&file.content_digest) {
            Some(bucket) => bucket.push(file),
            None => {
                order.push(file.content_digest.clone());
                buckets.insert(file.content_digest.clone(), vec![file]);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|digest| {
            let members = buckets.remove(&digest)?;
            if members.len() > 1 {
                log::debug!("Exact group {}: {} files", digest, members.len());
            }
            DuplicateGroup::exact(digest, members)
        })
        .collect()
}

/// Cluster fingerprinted files by Hamming distance.
///
/// Files without a fingerprint are ignored here; [`find_groups`] routes them
/// to exact partitioning instead.
#[must_use]
pub fn group_perceptual(
    files: Vec<HashedFile>,
    threshold: u32,
    strategy: ClusterStrategy,
) -> Vec<DuplicateGroup> {
    let files: Vec<HashedFile> = files.into_iter().filter(HashedFile::has_fingerprint).collect();
    let score = group_similarity_score(threshold);

    let clusters = match strategy {
        ClusterStrategy::Seed => seed_clusters(&files, threshold),
        ClusterStrategy::Connected => connected_clusters(&files, threshold),
    };

    let mut slots: Vec<Option<HashedFile>> = files.into_iter().map(Some).collect();
    clusters
        .into_iter()
        .filter(|indices| indices.len() > 1)
        .filter_map(|indices| {
            let members: Vec<HashedFile> =
                indices.iter().filter_map(|&i| slots[i].take()).collect();
            let key = members
                .first()
                .and_then(|f| f.fingerprint.as_ref())
                .map(|fp| fp.as_str().to_string())?;
            log::debug!("Perceptual group {}: {} files", key, members.len());
            DuplicateGroup::perceptual(key, members, score)
        })
        .collect()
}

fn within(files: &[HashedFile], i: usize, j: usize, threshold: u32) -> bool {
    match (&files[i].fingerprint, &files[j].fingerprint) {
        (Some(a), Some(b)) => is_similar(Some(a.distance(b)), threshold),
        _ => false,
    }
}

fn seed_clusters(files: &[HashedFile], threshold: u32) -> Vec<Vec<usize>> {
    let mut assigned = vec![false; files.len()];
    let mut clusters = Vec::new();

    for seed in 0..files.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut cluster = vec![seed];
        for candidate in (seed + 1)..files.len() {
            if !assigned[candidate] && within(files, seed, candidate, threshold) {
                assigned[candidate] = true;
                cluster.push(candidate);
            }
        }
        clusters.push(cluster);
    }

    clusters
}

fn connected_clusters(files: &[HashedFile], threshold: u32) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..files.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..files.len() {
        for j in (i + 1)..files.len() {
            if within(files, i, j, threshold) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    // Lower index stays root so keys come from the earliest member
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }

    let mut order: Vec<usize> = Vec::new();
    let mut by_root: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..files.len() {
        let root = find(&mut parent, i);
        by_root
            .entry(root)
            .or_insert_with(|| {
                order.push(root);
                Vec::new()
            })
            .push(i);
    }

    order
        .into_iter()
        .filter_map(|root| by_root.remove(&root))
        .collect()
}

/// Options controlling [`find_groups`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupingOptions {
    /// Cluster fingerprinted files by similarity
    pub perceptual: bool,
    /// Maximum Hamming distance for a perceptual match
    pub threshold: u32,
    /// Perceptual clustering strategy
    pub strategy: ClusterStrategy,
}

/// Statistics from the grouping phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Number of hashed files considered
    pub total_files: usize,
    /// Files carrying a perceptual fingerprint
    pub image_files: usize,
    /// Groups formed by identical digests
    pub exact_groups: usize,
    /// Groups formed by fingerprint similarity
    pub perceptual_groups: usize,
    /// Files beyond the first in every group
    pub duplicate_files: usize,
    /// Sum of [`DuplicateGroup::wasted_space`] over all groups
    pub reclaimable_bytes: u64,
}

/// Group hashed files in exact or hybrid mode.
///
/// With perceptual matching off, every file is partitioned by digest. With it
/// on, fingerprinted files are clustered and the rest are partitioned by
/// digest; exact groups come first in the result.
#[must_use]
pub fn find_groups(
    files: Vec<HashedFile>,
    options: &GroupingOptions,
) -> (Vec<DuplicateGroup>, GroupingStats) {
    let mut stats = GroupingStats {
        total_files: files.len(),
        ..Default::default()
    };

    let groups = if options.perceptual {
        let (images, others): (Vec<_>, Vec<_>) =
            files.into_iter().partition(HashedFile::has_fingerprint);
        stats.image_files = images.len();

        let mut groups = group_exact(others);
        groups.extend(group_perceptual(images, options.threshold, options.strategy));
        groups
    } else {
        group_exact(files)
    };

    for group in &groups {
        match group.kind {
            MatchKind::Exact => stats.exact_groups += 1,
            MatchKind::Perceptual => stats.perceptual_groups += 1,
        }
        stats.duplicate_files += group.duplicate_count();
        stats.reclaimable_bytes += group.wasted_space();
    }

    log::info!(
        "Grouping complete: {} files → {} exact group(s), {} perceptual group(s)",
        stats.total_files,
        stats.exact_groups,
        stats.perceptual_groups
    );

    (groups, stats)
}
