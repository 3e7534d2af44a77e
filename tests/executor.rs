//! Executor runs against a fake archiver

mod common;

use bulkpress::archiver::{ArchiveOutput, ArchiveRunner, ArchiverConfig, Invocation};
use bulkpress::parallel::{CancellationToken, Executor, ExecutorState};
use bulkpress::progress::{EventClass, ProgressChannel, ProgressEvent, ProgressReceiver};
use common::{FakeArchiver, jobs_for, make_files};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn drain(rx: &mut ProgressReceiver) -> Vec<ProgressEvent> {
    std::iter::from_fn(|| rx.try_recv()).collect()
}

fn completions(events: &[ProgressEvent]) -> Vec<(PathBuf, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::JobCompleted { path, success, .. } => Some((path.clone(), *success)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_failed_job_is_isolated() {
    let dir = TempDir::new().unwrap();
    let files = make_files(dir.path(), 3, 4096);
    let (tx, mut rx) = ProgressChannel::new(1000);
    let runner = Arc::new(FakeArchiver::failing(&["file1.txt"]));
    let mut executor = Executor::new(runner, ArchiverConfig::default(), tx);

    let summary = executor
        .start(jobs_for(&files), 2, &CancellationToken::new())
        .unwrap();

    assert_eq!(summary.state, ExecutorState::Completed);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.saved_bytes, 2 * 2048);

    let events = drain(&mut rx);
    let done = completions(&events);
    assert_eq!(done.len(), 3);
    assert_eq!(done.iter().filter(|(_, ok)| !ok).count(), 1);

    assert!(!files[0].exists());
    assert!(files[1].exists(), "failed source must be kept");
    assert!(!files[2].exists());
    assert!(dir.path().join("file0.txt.7z").exists());

    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Completed { processed: 3 })
    ));
}

#[test]
fn test_failure_message_names_the_file() {
    let dir = TempDir::new().unwrap();
    let files = make_files(dir.path(), 1, 4096);
    let (tx, mut rx) = ProgressChannel::new(1000);
    let runner = Arc::new(FakeArchiver::failing(&["file0.txt"]));
    let mut executor = Executor::new(runner, ArchiverConfig::default(), tx);

    executor
        .start(jobs_for(&files), 1, &CancellationToken::new())
        .unwrap();

    let message = drain(&mut rx).into_iter().find_map(|e| match e {
        ProgressEvent::JobCompleted { message, .. } => Some(message),
        _ => None,
    });
    assert_eq!(
        message.as_deref(),
        Some("Error compressing file0.txt: ERROR: simulated failure")
    );
}

#[test]
fn test_cancel_after_first_completion_stops() {
    let dir = TempDir::new().unwrap();
    let files = make_files(dir.path(), 10, 2048);
    let token = CancellationToken::new();
    let (tx, mut rx) = ProgressChannel::new(1000);
    let runner = Arc::new(FakeArchiver::cancelling_after(1, token.clone()));
    let mut executor = Executor::new(runner, ArchiverConfig::default(), tx);

    let summary = executor.start(jobs_for(&files), 1, &token).unwrap();

    assert_eq!(summary.state, ExecutorState::Stopped);
    assert!(summary.processed >= 1);
    assert!(summary.processed <= summary.dispatched);
    assert!(summary.dispatched < 10);
    assert_eq!(summary.skipped, 10 - summary.dispatched);

    let events = drain(&mut rx);
    let done = completions(&events);
    assert_eq!(done.len(), summary.processed);
    let unique: HashSet<_> = done.iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(unique.len(), done.len(), "no job reported twice");

    assert_eq!(
        events.last(),
        Some(&ProgressEvent::Stopped {
            processed: summary.processed
        })
    );

    // Files never dispatched are untouched
    let remaining = files.iter().filter(|f| f.exists()).count();
    assert_eq!(remaining, 10 - summary.succeeded);
}

#[test]
fn test_saturated_channel_keeps_control_events() {
    let dir = TempDir::new().unwrap();
    let files = make_files(dir.path(), 40, 1024);
    let (tx, mut rx) = ProgressChannel::new(1);
    let runner = Arc::new(FakeArchiver::default());
    let mut executor = Executor::new(runner, ArchiverConfig::default(), tx);

    // Nothing is read until the run is over
    let summary = executor
        .start(jobs_for(&files), 4, &CancellationToken::new())
        .unwrap();
    assert_eq!(summary.state, ExecutorState::Completed);
    assert!(summary.dropped_log_lines > 0);

    let events = drain(&mut rx);
    let totals = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::TotalSet(_)))
        .count();
    assert_eq!(totals, 1);

    let mut processed: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::JobCompleted { processed, .. } => Some(*processed),
            _ => None,
        })
        .collect();
    processed.sort_unstable();
    assert_eq!(processed, (1..=40).collect::<Vec<_>>());

    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1);
    assert!(events.last().is_some_and(|e| e.is_terminal()));

    let log_lines = events
        .iter()
        .filter(|e| e.class() == EventClass::Log)
        .count();
    assert!(log_lines <= 1);
}

#[test]
fn test_total_precedes_completions() {
    let dir = TempDir::new().unwrap();
    let files = make_files(dir.path(), 12, 2048);
    let (tx, mut rx) = ProgressChannel::new(1000);
    let mut executor = Executor::new(
        Arc::new(FakeArchiver::default()),
        ArchiverConfig::default(),
        tx,
    );

    executor
        .start(jobs_for(&files), 3, &CancellationToken::new())
        .unwrap();

    let events = drain(&mut rx);
    let total_at = events
        .iter()
        .position(|e| matches!(e, ProgressEvent::TotalSet(12)))
        .unwrap();
    let first_done = events
        .iter()
        .position(|e| matches!(e, ProgressEvent::JobCompleted { .. }))
        .unwrap();
    assert!(total_at < first_done);
}

/// Records whether the token was already set each time a job starts, and
/// sets it while the first job is running
struct TokenWatcher {
    token: CancellationToken,
    started_after_cancel: Mutex<Vec<PathBuf>>,
}

impl ArchiveRunner for TokenWatcher {
    fn program(&self) -> &Path {
        Path::new("fake-7z")
    }

    fn run(&self, invocation: &Invocation) -> io::Result<ArchiveOutput> {
        if self.token.is_cancelled() {
            self.started_after_cancel
                .lock()
                .unwrap()
                .push(invocation.source.clone());
        }
        fs::write(&invocation.archive, b"7z")?;
        self.token.cancel();
        Ok(ArchiveOutput::success())
    }
}

#[test]
fn test_no_job_starts_after_cancel() {
    for _ in 0..30 {
        let dir = TempDir::new().unwrap();
        let files = make_files(dir.path(), 5, 2048);
        let token = CancellationToken::new();
        let runner = Arc::new(TokenWatcher {
            token: token.clone(),
            started_after_cancel: Mutex::new(Vec::new()),
        });
        let (tx, _rx) = ProgressChannel::new(1000);
        let mut executor = Executor::new(runner.clone(), ArchiverConfig::default(), tx);

        let summary = executor.start(jobs_for(&files), 1, &token).unwrap();

        assert_eq!(summary.state, ExecutorState::Stopped);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 4);
        assert!(runner.started_after_cancel.lock().unwrap().is_empty());
        assert_eq!(files.iter().filter(|f| f.exists()).count(), 4);
    }
}
