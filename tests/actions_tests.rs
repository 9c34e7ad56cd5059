use file_deduplicator::actions::{
    apply, plan, undo, ActionError, Disposition, GroupPlan, UndoError, UndoLog,
};
use file_deduplicator::duplicates::{DuplicateGroup, KeepPolicy};
use file_deduplicator::scanner::HashedFile;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// One group per entry; the first path of each entry is the oldest and is kept.
fn plans_for(groups: &[&[PathBuf]]) -> Vec<GroupPlan> {
    let now = SystemTime::now();
    let groups: Vec<DuplicateGroup> = groups
        .iter()
        .enumerate()
        .map(|(g, paths)| {
            let members = paths
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let size = fs::metadata(p).map(|m| m.len()).unwrap_or(0);
                    HashedFile::new(
                        p.clone(),
                        size,
                        format!("digest{}", g),
                        now - Duration::from_secs(1000 - i as u64),
                    )
                })
                .collect();
            DuplicateGroup::exact(format!("digest{}", g), members).unwrap()
        })
        .collect();
    plan(&groups, &KeepPolicy::Oldest)
}

#[test]
fn test_report_disposition_touches_nothing() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.txt", b"dup");
    let b = write(dir.path(), "b.txt", b"dup");

    let report = apply(&plans_for(&[&[a.clone(), b.clone()]]), &Disposition::Report, false);
    assert_eq!(report.success_count(), 0);
    assert!(report.all_succeeded());
    assert!(a.exists() && b.exists());
}

#[test]
fn test_delete_removes_everything_but_the_kept_file() {
    let dir = TempDir::new().unwrap();
    let keep = write(dir.path(), "keep.txt", b"dup!");
    let gone1 = write(dir.path(), "x/gone.txt", b"dup!");
    let gone2 = write(dir.path(), "y/gone.txt", b"dup!");

    let report = apply(
        &plans_for(&[&[keep.clone(), gone1.clone(), gone2.clone()]]),
        &Disposition::Delete,
        false,
    );

    assert_eq!(report.success_count(), 2);
    assert_eq!(report.bytes_reclaimed, 8);
    assert!(keep.exists());
    assert!(!gone1.exists());
    assert!(!gone2.exists());
    assert!(report.summary().starts_with("deleted 2 file(s)"));
}

#[test]
fn test_dry_run_reports_without_changes() {
    let dir = TempDir::new().unwrap();
    let keep = write(dir.path(), "keep.txt", b"dup");
    let other = write(dir.path(), "other.txt", b"dup");
    let target_dir = dir.path().join("moved");

    let plans = plans_for(&[&[keep.clone(), other.clone()]]);
    let report = apply(&plans, &Disposition::Move(target_dir.clone()), true);

    assert!(report.dry_run);
    assert_eq!(report.success_count(), 1);
    assert_eq!(
        report.completed[0].target.as_deref(),
        Some(target_dir.join("other.txt").as_path())
    );
    assert!(other.exists());
    assert!(!target_dir.exists());
    assert!(report.summary().starts_with("[dry run] would have moved 1 file(s)"));

    let delete = apply(&plans, &Disposition::Delete, true);
    assert_eq!(delete.success_count(), 1);
    assert!(other.exists());
}

#[test]
fn test_move_renames_on_collision() {
    let dir = TempDir::new().unwrap();
    let target_dir = dir.path().join("dupes");
    write(&target_dir, "photo.jpg", b"already here");

    let keep1 = write(dir.path(), "a/photo.jpg", b"one");
    let dup1 = write(dir.path(), "b/photo.jpg", b"one");
    let keep2 = write(dir.path(), "c/photo.jpg", b"two");
    let dup2 = write(dir.path(), "d/photo.jpg", b"two");

    let report = apply(
        &plans_for(&[&[keep1.clone(), dup1.clone()], &[keep2.clone(), dup2.clone()]]),
        &Disposition::Move(target_dir.clone()),
        false,
    );

    assert!(report.all_succeeded());
    assert_eq!(report.success_count(), 2);
    assert_eq!(fs::read(target_dir.join("photo.jpg")).unwrap(), b"already here");
    assert_eq!(fs::read(target_dir.join("photo_1.jpg")).unwrap(), b"one");
    assert_eq!(fs::read(target_dir.join("photo_2.jpg")).unwrap(), b"two");
    assert!(!dup1.exists() && !dup2.exists());
    assert!(keep1.exists() && keep2.exists());
}

#[test]
fn test_move_creates_target_directory() {
    let dir = TempDir::new().unwrap();
    let keep = write(dir.path(), "keep.bin", b"z");
    let dup = write(dir.path(), "dup.bin", b"z");
    let target_dir = dir.path().join("nested/target");

    let report = apply(
        &plans_for(&[&[keep, dup]]),
        &Disposition::Move(target_dir.clone()),
        false,
    );
    assert!(report.all_succeeded());
    assert!(target_dir.join("dup.bin").exists());
}

#[test]
fn test_missing_keep_skips_the_group() {
    let dir = TempDir::new().unwrap();
    let keep = write(dir.path(), "keep.txt", b"dup");
    let dup = write(dir.path(), "dup.txt", b"dup");
    let plans = plans_for(&[&[keep.clone(), dup.clone()]]);
    fs::remove_file(&keep).unwrap();

    let report = apply(&plans, &Disposition::Delete, false);
    assert_eq!(report.success_count(), 0);
    assert_eq!(report.failure_count(), 1);
    assert!(matches!(&report.failures[0], ActionError::KeepMissing(p) if p == &keep));
    assert!(dup.exists());
}

#[test]
fn test_vanished_duplicate_is_a_failure_not_a_panic() {
    let dir = TempDir::new().unwrap();
    let keep = write(dir.path(), "keep.txt", b"dup");
    let dup = write(dir.path(), "dup.txt", b"dup");
    let also = write(dir.path(), "also.txt", b"dup");
    let plans = plans_for(&[&[keep, dup.clone(), also.clone()]]);
    fs::remove_file(&dup).unwrap();

    let report = apply(&plans, &Disposition::Delete, false);
    assert_eq!(report.success_count(), 1);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.failures[0].path(), dup.as_path());
    assert!(!also.exists());
    assert!(report.summary().ends_with("1 failed"));
}

#[test]
fn test_move_then_undo_restores_original_layout() {
    let dir = TempDir::new().unwrap();
    let target_dir = dir.path().join("dupes");
    let keep1 = write(dir.path(), "a/photo.jpg", b"one");
    let dup1 = write(dir.path(), "b/photo.jpg", b"one");
    let keep2 = write(dir.path(), "c/notes.txt", b"two");
    let dup2 = write(dir.path(), "d/deep/notes.txt", b"two");

    let report = apply(
        &plans_for(&[&[keep1.clone(), dup1.clone()], &[keep2.clone(), dup2.clone()]]),
        &Disposition::Move(target_dir.clone()),
        false,
    );
    assert_eq!(UndoLog::record(&target_dir, &report).unwrap(), 2);
    assert!(!dup1.exists() && !dup2.exists());
    // The source directory of a moved file may be cleaned up in between.
    fs::remove_dir_all(dir.path().join("d")).unwrap();

    let restored = undo(&target_dir, false).unwrap();
    assert!(restored.all_succeeded());
    assert_eq!(restored.success_count(), 2);
    assert_eq!(fs::read(&dup1).unwrap(), b"one");
    assert_eq!(fs::read(&dup2).unwrap(), b"two");
    assert!(keep1.exists() && keep2.exists());
    assert!(!target_dir.join("photo.jpg").exists());
    assert!(!UndoLog::path_in(&target_dir).exists());

    // Nothing left to undo.
    assert!(matches!(undo(&target_dir, false), Err(UndoError::NoLog(_))));
}

#[test]
fn test_undo_dry_run_keeps_files_and_log() {
    let dir = TempDir::new().unwrap();
    let target_dir = dir.path().join("dupes");
    let keep = write(dir.path(), "keep.txt", b"same");
    let dup = write(dir.path(), "dup.txt", b"same");

    let report = apply(
        &plans_for(&[&[keep, dup.clone()]]),
        &Disposition::Move(target_dir.clone()),
        false,
    );
    UndoLog::record(&target_dir, &report).unwrap();

    let preview = undo(&target_dir, true).unwrap();
    assert_eq!(preview.success_count(), 1);
    assert_eq!(preview.completed[0].target.as_deref(), Some(dup.as_path()));
    assert!(!dup.exists());
    assert!(target_dir.join("dup.txt").exists());
    assert_eq!(UndoLog::load(&target_dir).unwrap().entries.len(), 1);
}
