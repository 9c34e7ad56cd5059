//! Per-group keep/remove decisions.

use serde::Serialize;

use crate::duplicates::{select_keep, DuplicateGroup, KeepPolicy, MatchKind};
use crate::scanner::HashedFile;

/// What happens to one duplicate group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPlan {
    /// Key of the group this plan was made for
    pub group_key: String,
    /// How the group was matched
    pub kind: MatchKind,
    /// Similarity score of the group
    pub similarity_score: f64,
    /// The member that survives
    pub keep: HashedFile,
    /// Members to move, trash or delete, in group order
    pub remove: Vec<HashedFile>,
    /// Bytes freed by removing `remove`
    pub reclaimable: u64,
}

impl GroupPlan {
    /// Build the plan for one group.
    ///
    /// Returns `None` only for a group without members.
    #[must_use]
    pub fn for_group(group: &DuplicateGroup, policy: &KeepPolicy) -> Option<Self> {
        let keep_index = select_keep(group, policy);
        let keep = group.members.get(keep_index)?.clone();
        let remove: Vec<HashedFile> = group
            .members
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != keep_index)
            .map(|(_, member)| member.clone())
            .collect();
        let reclaimable = remove.iter().map(|f| f.size).sum();

        Some(Self {
            group_key: group.group_key.clone(),
            kind: group.kind,
            similarity_score: group.similarity_score,
            keep,
            remove,
            reclaimable,
        })
    }

    /// Number of members in the planned group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.remove.len() + 1
    }

    /// Always false: a plan keeps one member.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Plan every group under one policy.
#[must_use]
pub fn plan(groups: &[DuplicateGroup], policy: &KeepPolicy) -> Vec<GroupPlan> {
    groups
        .iter()
        .filter_map(|group| GroupPlan::for_group(group, policy))
        .collect()
}

/// Totals across a set of plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanTotals {
    /// Number of groups
    pub groups: usize,
    /// Files marked for removal
    pub files_to_remove: usize,
    /// Bytes freed if every removal succeeds
    pub reclaimable: u64,
}

/// Sum up a set of plans.
#[must_use]
pub fn totals(plans: &[GroupPlan]) -> PlanTotals {
    plans.iter().fold(PlanTotals::default(), |mut acc, plan| {
        acc.groups += 1;
        acc.files_to_remove += plan.remove.len();
        acc.reclaimable += plan.reclaimable;
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn member(path: &str, size: u64, secs: u64) -> HashedFile {
        HashedFile::new(
            PathBuf::from(path),
            size,
            "d",
            SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
        )
    }

    #[test]
    fn test_plan_uses_policy() {
        let group = DuplicateGroup::exact(
            "d",
            vec![member("/new", 10, 300), member("/old", 10, 100), member("/mid", 10, 200)],
        )
        .unwrap();

        let plans = plan(std::slice::from_ref(&group), &KeepPolicy::Oldest);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].keep.path, PathBuf::from("/old"));
        assert_eq!(
            plans[0].remove.iter().map(|f| f.path.clone()).collect::<Vec<_>>(),
            vec![PathBuf::from("/new"), PathBuf::from("/mid")]
        );
        assert_eq!(plans[0].reclaimable, 20);
        assert_eq!(plans[0].len(), 3);
    }

    #[test]
    fn test_reclaimable_depends_on_kept_member() {
        let group = DuplicateGroup::perceptual(
            "k",
            vec![member("/small.jpg", 10, 0), member("/large.png", 90, 0)],
            84.375,
        )
        .unwrap();

        let keep_large = GroupPlan::for_group(&group, &KeepPolicy::Largest).unwrap();
        assert_eq!(keep_large.reclaimable, 10);
        let keep_small = GroupPlan::for_group(&group, &KeepPolicy::Smallest).unwrap();
        assert_eq!(keep_small.reclaimable, 90);
    }

    #[test]
    fn test_totals() {
        let a = DuplicateGroup::exact("a", vec![member("/1", 5, 0), member("/2", 5, 0)]).unwrap();
        let b = DuplicateGroup::exact(
            "b",
            vec![member("/3", 7, 0), member("/4", 7, 0), member("/5", 7, 0)],
        )
        .unwrap();
        let t = totals(&plan(&[a, b], &KeepPolicy::First));
        assert_eq!(t.groups, 2);
        assert_eq!(t.files_to_remove, 3);
        assert_eq!(t.reclaimable, 19);
    }

    #[test]
    fn test_plan_splits_every_member_exactly_once() {
        let group = DuplicateGroup::exact(
            "h",
            vec![member("/a/1", 3, 0), member("/keep/2", 3, 0), member("/a/3", 3, 0)],
        )
        .unwrap();

        let mut expected = group.paths();
        expected.sort();

        for policy in [
            KeepPolicy::First,
            KeepPolicy::PathContains("/keep/".into()),
            KeepPolicy::PathContains("nowhere".into()),
        ] {
            let plan = GroupPlan::for_group(&group, &policy).unwrap();
            let mut paths: Vec<_> = plan.remove.iter().map(|f| f.path.clone()).collect();
            assert!(!paths.contains(&plan.keep.path), "{:?}", policy);
            paths.push(plan.keep.path.clone());
            paths.sort();
            assert_eq!(paths, expected);
        }
    }
}
