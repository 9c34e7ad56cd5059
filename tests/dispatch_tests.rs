use file_deduplicator::config::EngineConfig;
use file_deduplicator::duplicates::{
    hash_files, DispatchConfig, DuplicateFinder, FinderError, KeepPolicy, MatchKind,
};
use file_deduplicator::progress::ProgressCallback;
use file_deduplicator::scanner::{
    hash_bytes, HashAlgorithm, PerceptualAlgorithm, PerceptualHasher, WalkOptions,
};
use filetime::{set_file_mtime, FileTime};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Diagonal ramp; every row brightens left to right, or darkens when reversed.
fn ramp(reversed: bool) -> RgbImage {
    let mut img = RgbImage::new(96, 96);
    for x in 0..96u32 {
        for y in 0..96u32 {
            let col = if reversed { 95 - x } else { x };
            let v = (30 + col + y) as u8;
            img.put_pixel(x, y, Rgb([v, v, v / 2]));
        }
    }
    img
}

#[derive(Default)]
struct RecordingProgress {
    phases: Mutex<Vec<String>>,
    items: AtomicUsize,
}

impl ProgressCallback for RecordingProgress {
    fn on_phase_start(&self, phase: &str, _total: usize) {
        self.phases.lock().unwrap().push(format!("start:{}", phase));
    }

    fn on_progress(&self, _current: usize, _path: &str) {}

    fn on_item_completed(&self, _bytes: u64) {
        self.items.fetch_add(1, Ordering::SeqCst);
    }

    fn on_phase_end(&self, phase: &str) {
        self.phases.lock().unwrap().push(format!("end:{}", phase));
    }
}

#[test]
fn test_exact_duplicates_in_directory() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", b"hello world");
    write(dir.path(), "sub/b.txt", b"hello world");
    write(dir.path(), "c.txt", b"something else");

    let finder = DuplicateFinder::new(EngineConfig::default());
    let (groups, summary) = finder
        .find_duplicates_in_dir(dir.path(), &WalkOptions::default())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, MatchKind::Exact);
    assert_eq!(
        groups[0].group_key,
        hash_bytes(HashAlgorithm::Sha256, b"hello world")
    );
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.hashed_files, 3);
    assert_eq!(summary.duplicate_files, 1);
    assert_eq!(summary.reclaimable_space, 11);
    assert_eq!(summary.error_count(), 0);
    assert!(!summary.interrupted);
}

#[test]
fn test_hash_algorithm_changes_group_key() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.bin", b"payload");
    write(dir.path(), "b.bin", b"payload");

    let config = EngineConfig {
        hash_algorithm: HashAlgorithm::Md5,
        ..Default::default()
    };
    let (groups, _) = DuplicateFinder::new(config)
        .find_duplicates_in_dir(dir.path(), &WalkOptions::default())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].group_key.len(), 32);
    assert_eq!(groups[0].group_key, hash_bytes(HashAlgorithm::Md5, b"payload"));
}

#[test]
fn test_perceptual_mode_groups_re_encoded_images() {
    let dir = TempDir::new().unwrap();
    let img = ramp(false);
    img.save(dir.path().join("photo.png")).unwrap();
    img.save(dir.path().join("photo_copy.jpg")).unwrap();
    ramp(true).save(dir.path().join("other.png")).unwrap();
    write(dir.path(), "notes.txt", b"not an image");

    let config = EngineConfig {
        perceptual: true,
        ..Default::default()
    };
    let (groups, summary) = DuplicateFinder::new(config)
        .find_duplicates_in_dir(dir.path(), &WalkOptions::default())
        .unwrap();

    assert_eq!(summary.image_files, 3);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, MatchKind::Perceptual);
    let mut names: Vec<_> = groups[0]
        .paths()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["photo.png", "photo_copy.jpg"]);
}

#[test]
fn test_corrupt_image_falls_back_to_exact_matching() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "broken1.jpg", b"not really a jpeg");
    write(dir.path(), "broken2.jpg", b"not really a jpeg");

    let config = EngineConfig {
        perceptual: true,
        ..Default::default()
    };
    let (groups, summary) = DuplicateFinder::new(config)
        .find_duplicates_in_dir(dir.path(), &WalkOptions::default())
        .unwrap();

    assert_eq!(summary.fingerprint_failures, 2);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, MatchKind::Exact);
}

#[test]
fn test_worker_count_does_not_change_results() {
    let dir = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for i in 0..40 {
        let content = format!("content-{}", i % 7);
        paths.push(write(dir.path(), &format!("f{:02}.txt", i), content.as_bytes()));
    }

    let single = DuplicateFinder::new(EngineConfig {
        workers: Some(1),
        ..Default::default()
    })
    .find_duplicates(paths.clone())
    .0;
    let many = DuplicateFinder::new(EngineConfig {
        workers: Some(8),
        ..Default::default()
    })
    .find_duplicates(paths)
    .0;

    assert_eq!(single.len(), 7);
    assert_eq!(single, many);
}

#[test]
fn test_unreadable_files_are_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.txt", b"same");
    let b = write(dir.path(), "b.txt", b"same");
    let ghost = dir.path().join("ghost.txt");

    let outcome = hash_files(vec![a, ghost.clone(), b], &DispatchConfig::default());
    assert_eq!(outcome.files.len(), 2);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].0, ghost);

    let (groups, summary) =
        DuplicateFinder::new(EngineConfig::default()).find_duplicates(vec![
            dir.path().join("a.txt"),
            dir.path().join("ghost.txt"),
            dir.path().join("b.txt"),
        ]);
    assert_eq!(groups.len(), 1);
    assert_eq!(summary.hash_errors.len(), 1);
}

#[test]
fn test_dispatch_fingerprints_only_images() {
    let dir = TempDir::new().unwrap();
    let png = dir.path().join("pic.png");
    ramp(false).save(&png).unwrap();
    let txt = write(dir.path(), "readme.txt", b"text");

    let config = DispatchConfig::default()
        .with_workers(2)
        .with_perceptual(PerceptualHasher::new(PerceptualAlgorithm::Ahash));
    let outcome = hash_files(vec![png.clone(), txt.clone()], &config);

    let by_path = |p: &Path| outcome.files.iter().find(|f| f.path == p).unwrap();
    assert!(by_path(&png).fingerprint.is_some());
    assert!(by_path(&txt).fingerprint.is_none());
}

#[test]
fn test_preset_shutdown_skips_all_work() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write(dir.path(), "a.txt", b"x"),
        write(dir.path(), "b.txt", b"x"),
    ];

    let flag = Arc::new(AtomicBool::new(true));
    let (groups, summary) = DuplicateFinder::new(EngineConfig::default())
        .with_shutdown_flag(Arc::clone(&flag))
        .find_duplicates(paths);

    assert!(groups.is_empty());
    assert!(summary.interrupted);
    assert_eq!(summary.skipped_files, 2);
    assert_eq!(summary.hashed_files, 0);
}

#[test]
fn test_shutdown_before_hashing_is_an_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", b"x");

    let result = DuplicateFinder::new(EngineConfig::default())
        .with_shutdown_flag(Arc::new(AtomicBool::new(true)))
        .find_duplicates_in_dir(dir.path(), &WalkOptions::default());

    assert!(matches!(result, Err(FinderError::Interrupted)));
}

#[test]
fn test_bad_roots_are_rejected() {
    let dir = TempDir::new().unwrap();
    let file = write(dir.path(), "file.txt", b"x");
    let finder = DuplicateFinder::new(EngineConfig::default());

    assert!(matches!(
        finder.find_duplicates_in_dir(&dir.path().join("missing"), &WalkOptions::default()),
        Err(FinderError::PathNotFound(_))
    ));
    assert!(matches!(
        finder.find_duplicates_in_dir(&file, &WalkOptions::default()),
        Err(FinderError::NotADirectory(_))
    ));
}

#[test]
fn test_progress_callback_sees_both_phases() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", b"one");
    write(dir.path(), "b.txt", b"two");

    let progress = Arc::new(RecordingProgress::default());
    let callback: Arc<dyn ProgressCallback> = Arc::clone(&progress) as Arc<dyn ProgressCallback>;
    DuplicateFinder::new(EngineConfig::default())
        .with_progress_callback(callback)
        .find_duplicates_in_dir(dir.path(), &WalkOptions::default())
        .unwrap();

    let phases = progress.phases.lock().unwrap().clone();
    assert_eq!(
        phases,
        vec!["start:walking", "end:walking", "start:hash", "end:hash"]
    );
    assert_eq!(progress.items.load(Ordering::SeqCst), 2);
}

#[test]
fn test_oldest_file_is_kept_by_modification_time() {
    let dir = TempDir::new().unwrap();
    let newer = write(dir.path(), "newer.txt", b"dup");
    let older = write(dir.path(), "older.txt", b"dup");
    set_file_mtime(&newer, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
    set_file_mtime(&older, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();

    let (groups, _) = DuplicateFinder::new(EngineConfig::default())
        .find_duplicates_in_dir(dir.path(), &WalkOptions::default())
        .unwrap();
    let plans = file_deduplicator::actions::plan(&groups, &KeepPolicy::Oldest);

    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].keep.path, older);
    assert_eq!(plans[0].remove[0].path, newer);
}
