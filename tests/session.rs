//! End-to-end runs through the session API with a fake archiver

mod common;

use bulkpress::parallel::ExecutorState;
use bulkpress::progress::ProgressEvent;
use bulkpress::schedule::CompressionLevel;
use bulkpress::{Session, SessionOptions};
use common::FakeArchiver;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use system_profile::{StorageClass, SystemProfile};
use tempfile::TempDir;

fn options() -> SessionOptions {
    SessionOptions {
        runner: Some(Arc::new(FakeArchiver::default())),
        profile: Some(Arc::new(SystemProfile::new(
            4,
            8 * 1024 * 1024 * 1024,
            StorageClass::Fast,
        ))),
        ..SessionOptions::default()
    }
}

fn write(dir: &Path, rel: &str, len: usize) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, vec![b'q'; len]).unwrap();
}

#[test]
fn test_session_compresses_eligible_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "docs/readme.txt", 8192);
    write(dir.path(), "docs/data.csv", 4096);
    write(dir.path(), "photos/album.zip", 8192);
    write(dir.path(), "tiny.json", 100);
    write(dir.path(), "ProgramData/cache.bin", 8192);

    let mut events = Vec::new();
    let summary = Session::start(dir.path(), CompressionLevel::DEFAULT, options())
        .drain(|event| events.push(event.clone()));

    assert_eq!(summary.state, ExecutorState::Completed);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 2);

    assert!(!dir.path().join("docs/readme.txt").exists());
    assert!(dir.path().join("docs/readme.txt.7z").exists());
    assert!(!dir.path().join("docs/data.csv").exists());
    assert!(dir.path().join("photos/album.zip").exists());
    assert!(dir.path().join("tiny.json").exists());
    assert!(dir.path().join("ProgramData/cache.bin").exists());

    assert!(
        events
            .iter()
            .any(|e| matches!(e, ProgressEvent::EstimateReady(est) if est.file_count == 2))
    );
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Completed { processed: 2 })
    ));
}

#[test]
fn test_invalid_root_fails_without_starting() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    let mut events = Vec::new();
    let summary = Session::start(&missing, CompressionLevel::DEFAULT, options())
        .drain(|event| events.push(event.clone()));

    assert_eq!(summary.state, ExecutorState::Failed);
    assert!(summary.failure.unwrap().contains("invalid root"));
    assert!(!events.iter().any(|e| matches!(e, ProgressEvent::TotalSet(_))));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Failed { processed: 0, .. })
    ));
}

#[test]
fn test_empty_tree_completes_with_zero() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "small.txt", 10);

    let summary = Session::start(dir.path(), CompressionLevel::DEFAULT, options()).wait();
    assert_eq!(summary.state, ExecutorState::Completed);
    assert_eq!(summary.total, 0);
    assert_eq!(summary.processed, 0);
    assert!(dir.path().join("small.txt").exists());
}

#[test]
fn test_cancel_before_dispatch_stops() {
    let dir = TempDir::new().unwrap();
    for i in 0..5 {
        write(dir.path(), &format!("f{i}.txt"), 4096);
    }

    let session = Session::start(dir.path(), CompressionLevel::DEFAULT, options());
    session.cancel();
    let summary = session.wait();

    // The walk may or may not have finished before the flag was seen
    assert!(matches!(
        summary.state,
        ExecutorState::Stopped | ExecutorState::Completed
    ));
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.dispatched, 0);
}
