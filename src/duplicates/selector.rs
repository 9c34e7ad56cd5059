//! Representative selection: which member of a group to keep.
//!
//! The keep member is never stored on the group; it is derived from the
//! group and a [`KeepPolicy`] whenever needed. Selection is deterministic:
//! members are scanned in order and the candidate only changes on a strict
//! improvement, so ties resolve to the earliest member.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::groups::DuplicateGroup;
use crate::scanner::HashedFile;

/// Policy deciding which member of a group survives.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KeepPolicy {
    /// Earliest modification time
    #[default]
    Oldest,
    /// Latest modification time
    Newest,
    /// Largest file size
    Largest,
    /// Smallest file size
    Smallest,
    /// First member whose path contains the substring
    PathContains(String),
    /// First member in group order
    First,
}

impl KeepPolicy {
    /// Parse a policy name.
    ///
    /// `path:<substring>` selects [`KeepPolicy::PathContains`]; the prefix is
    /// case-sensitive. Other names match case-insensitively. Anything
    /// unrecognized becomes [`KeepPolicy::First`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if let Some(pattern) = name.strip_prefix("path:") {
            return Self::PathContains(pattern.to_string());
        }
        match name.trim().to_ascii_lowercase().as_str() {
            "oldest" => Self::Oldest,
            "newest" => Self::Newest,
            "largest" => Self::Largest,
            "smallest" => Self::Smallest,
            "first" => Self::First,
            other => {
                log::warn!("Unknown keep policy {:?}, keeping first member", other);
                Self::First
            }
        }
    }
}

impl From<String> for KeepPolicy {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<KeepPolicy> for String {
    fn from(policy: KeepPolicy) -> Self {
        policy.to_string()
    }
}

impl fmt::Display for KeepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oldest => f.write_str("oldest"),
            Self::Newest => f.write_str("newest"),
            Self::Largest => f.write_str("largest"),
            Self::Smallest => f.write_str("smallest"),
            Self::PathContains(p) => write!(f, "path:{}", p),
            Self::First => f.write_str("first"),
        }
    }
}

/// Index of the member to keep.
#[must_use]
pub fn select_keep(group: &DuplicateGroup, policy: &KeepPolicy) -> usize {
    let members = &group.members;
    match policy {
        KeepPolicy::Oldest => best_by(members, |cand, best| cand.modified < best.modified),
        KeepPolicy::Newest => best_by(members, |cand, best| cand.modified > best.modified),
        KeepPolicy::Largest => best_by(members, |cand, best| cand.size > best.size),
        KeepPolicy::Smallest => best_by(members, |cand, best| cand.size < best.size),
        KeepPolicy::PathContains(pattern) => members
            .iter()
            .position(|f| f.path.to_string_lossy().contains(pattern.as_str()))
            .unwrap_or(0),
        KeepPolicy::First => 0,
    }
}

fn best_by(members: &[HashedFile], better: impl Fn(&HashedFile, &HashedFile) -> bool) -> usize {
    let mut best = 0;
    for (i, candidate) in members.iter().enumerate().skip(1) {
        if better(candidate, &members[best]) {
            best = i;
        }
    }
    best
}

/// Members other than the one kept, in group order.
#[must_use]
pub fn removal_candidates<'a>(group: &'a DuplicateGroup, policy: &KeepPolicy) -> Vec<&'a HashedFile> {
    let keep = select_keep(group, policy);
    group
        .members
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != keep)
        .map(|(_, f)| f)
        .collect()
}
