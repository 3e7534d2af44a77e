//! Shared fixtures for integration tests

#![allow(dead_code)]

use bulkpress::archiver::{ArchiveOutput, ArchiveRunner, Invocation};
use bulkpress::parallel::CancellationToken;
use bulkpress::schedule::{CompressionLevel, CompressionParams, Job, ParamTemplate};
use bulkpress::walk::FileDescriptor;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Archiver stand-in: writes a half-size archive, fails for chosen file
/// names, and can set a token after a number of calls
#[derive(Default)]
pub struct FakeArchiver {
    pub fail_names: Vec<String>,
    pub cancel_after: Option<(usize, CancellationToken)>,
    pub calls: AtomicUsize,
}

impl FakeArchiver {
    pub fn failing(names: &[&str]) -> Self {
        Self {
            fail_names: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn cancelling_after(calls: usize, token: CancellationToken) -> Self {
        Self {
            cancel_after: Some((calls, token)),
            ..Self::default()
        }
    }
}

impl ArchiveRunner for FakeArchiver {
    fn program(&self) -> &Path {
        Path::new("fake-7z")
    }

    fn run(&self, invocation: &Invocation) -> io::Result<ArchiveOutput> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let name = invocation
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let output = if self.fail_names.contains(&name) {
            ArchiveOutput::failure(2, "ERROR: simulated failure")
        } else {
            let len = fs::metadata(&invocation.source)?.len();
            fs::write(&invocation.archive, vec![0u8; (len / 2) as usize])?;
            ArchiveOutput::success()
        };

        if let Some((after, token)) = &self.cancel_after
            && call >= *after
        {
            token.cancel();
        }
        Ok(output)
    }
}

/// Create `count` files of `len` bytes named `file{i}.txt`
pub fn make_files(dir: &Path, count: usize, len: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("file{i}.txt"));
            fs::write(&path, vec![b'a'; len]).unwrap();
            path
        })
        .collect()
}

pub fn jobs_for(paths: &[PathBuf]) -> Vec<Job> {
    let level = CompressionLevel::DEFAULT;
    paths
        .iter()
        .map(|path| {
            let size = fs::metadata(path).unwrap().len();
            Job {
                descriptor: FileDescriptor::new(path.clone(), size),
                level,
                params: CompressionParams::from(ParamTemplate::builtin(level)),
            }
        })
        .collect()
}
