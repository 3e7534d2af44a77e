//! What one worker does with one job

use crate::archiver::{ArchiveRunner, ArchiverConfig, Invocation};
use crate::error::{CompressError, CompressResult};
use crate::schedule::Job;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

/// Result of one job, success or not
#[derive(Debug)]
pub struct JobOutcome {
    pub job: Job,
    pub success: bool,
    pub message: String,
    pub saved_bytes: Option<u64>,
    pub error: Option<CompressError>,
}

impl JobOutcome {
    fn succeeded(job: Job, compressed: Compressed) -> Self {
        let message = format!(
            "Compressed: {} ({:.1}% saved)",
            job.descriptor.file_name(),
            compressed.saved_percent()
        );
        Self {
            job,
            success: true,
            message,
            saved_bytes: Some(compressed.saved_bytes()),
            error: None,
        }
    }

    fn failed(job: Job, error: CompressError) -> Self {
        let message = format!(
            "Error compressing {}: {}",
            job.descriptor.file_name(),
            failure_detail(&error)
        );
        Self {
            job,
            success: false,
            message,
            saved_bytes: None,
            error: Some(error),
        }
    }
}

/// Sizes observed around a successful compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compressed {
    pub original_bytes: u64,
    pub archive_bytes: u64,
}

impl Compressed {
    pub fn saved_bytes(&self) -> u64 {
        self.original_bytes.saturating_sub(self.archive_bytes)
    }

    /// Negative when the archive came out larger than the source
    pub fn saved_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.archive_bytes as f64 / self.original_bytes as f64) * 100.0
    }
}

/// Run one job to completion. Never panics; a panicking runner becomes a
/// failed outcome.
pub fn run_job(job: Job, runner: &dyn ArchiveRunner, config: &ArchiverConfig) -> JobOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| compress(&job, runner, config)));

    match result {
        Ok(Ok(compressed)) => JobOutcome::succeeded(job, compressed),
        Ok(Err(error)) => JobOutcome::failed(job, error),
        Err(_) => {
            let path = job.descriptor.path.clone();
            tracing::error!("Archiver panicked on {}", path.display());
            JobOutcome::failed(job, CompressError::WorkerPanic { path })
        }
    }
}

/// Compress, verify the archive, then remove the source.
///
/// The source is only deleted once the archiver exited cleanly and the
/// archive can be found on disk.
pub fn compress(
    job: &Job,
    runner: &dyn ArchiveRunner,
    config: &ArchiverConfig,
) -> CompressResult<Compressed> {
    let source = &job.descriptor.path;

    let original_bytes = match fs::metadata(source) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CompressError::SourceVanished {
                path: source.clone(),
            });
        }
        Err(e) => return Err(io_error("stat source", source, e)),
    };

    let invocation = Invocation::for_job(runner.program(), job, config);
    tracing::debug!("Compressing {} with {}", source.display(), job.flags().join(" "));

    let output = runner
        .run(&invocation)
        .map_err(|e| io_error("start archiver", &invocation.program, e))?;

    if !output.is_success() {
        return Err(CompressError::Archiver {
            path: source.clone(),
            code: output.exit_code,
            stderr: output.stderr,
        });
    }

    let archive_bytes = fs::metadata(&invocation.archive)
        .map_err(|e| io_error("stat archive", &invocation.archive, e))?
        .len();

    fs::remove_file(source).map_err(|e| CompressError::Delete {
        path: source.clone(),
        source: e,
    })?;

    Ok(Compressed {
        original_bytes,
        archive_bytes,
    })
}

fn io_error(operation: &'static str, path: &Path, source: io::Error) -> CompressError {
    CompressError::Io {
        operation,
        path: path.to_path_buf(),
        source,
    }
}

fn failure_detail(error: &CompressError) -> String {
    match error {
        CompressError::Archiver { code, stderr, .. } => {
            let stderr = stderr.trim();
            match (stderr.is_empty(), code) {
                (false, _) => stderr.to_string(),
                (true, Some(code)) => format!("archiver exited with code {code}"),
                (true, None) => "archiver terminated by signal".to_string(),
            }
        }
        CompressError::Delete { source, .. } => format!("could not delete source: {source}"),
        CompressError::SourceVanished { .. } => "file no longer exists".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archiver::ArchiveOutput;
    use crate::schedule::{CompressionLevel, CompressionParams, ParamTemplate};
    use crate::walk::FileDescriptor;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Writes an archive a quarter of the source size, or fails on demand
    struct QuarterRunner {
        fail_with: Option<ArchiveOutput>,
        write_archive: bool,
    }

    impl ArchiveRunner for QuarterRunner {
        fn program(&self) -> &Path {
            Path::new("fake-7z")
        }

        fn run(&self, invocation: &Invocation) -> io::Result<ArchiveOutput> {
            if let Some(output) = &self.fail_with {
                return Ok(output.clone());
            }
            if self.write_archive {
                let len = fs::metadata(&invocation.source)?.len();
                fs::write(&invocation.archive, vec![0u8; (len / 4) as usize])?;
            }
            Ok(ArchiveOutput::success())
        }
    }

    struct PanickingRunner;

    impl ArchiveRunner for PanickingRunner {
        fn program(&self) -> &Path {
            Path::new("fake-7z")
        }

        fn run(&self, _invocation: &Invocation) -> io::Result<ArchiveOutput> {
            panic!("runner blew up");
        }
    }

    fn job_for(path: PathBuf) -> Job {
        let level = CompressionLevel::DEFAULT;
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Job {
            descriptor: FileDescriptor::new(path, size),
            level,
            params: CompressionParams::from(ParamTemplate::builtin(level)),
        }
    }

    fn source(dir: &TempDir, name: &str, len: usize) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, vec![b'a'; len]).unwrap();
        path
    }

    #[test]
    fn test_success_removes_source() {
        let dir = TempDir::new().unwrap();
        let path = source(&dir, "notes.txt", 4000);
        let runner = QuarterRunner {
            fail_with: None,
            write_archive: true,
        };

        let outcome = run_job(job_for(path.clone()), &runner, &ArchiverConfig::default());
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.saved_bytes, Some(3000));
        assert_eq!(outcome.message, "Compressed: notes.txt (75.0% saved)");
        assert!(!path.exists());
        assert!(dir.path().join("notes.txt.7z").exists());
    }

    #[test]
    fn test_archiver_failure_keeps_source() {
        let dir = TempDir::new().unwrap();
        let path = source(&dir, "data.csv", 2048);
        let runner = QuarterRunner {
            fail_with: Some(ArchiveOutput::failure(2, "ERROR: disk full\n")),
            write_archive: false,
        };

        let outcome = run_job(job_for(path.clone()), &runner, &ArchiverConfig::default());
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Error compressing data.csv: ERROR: disk full");
        assert!(matches!(
            outcome.error,
            Some(CompressError::Archiver { code: Some(2), .. })
        ));
        assert!(path.exists());
    }

    #[test]
    fn test_missing_archive_keeps_source() {
        let dir = TempDir::new().unwrap();
        let path = source(&dir, "data.csv", 2048);
        let runner = QuarterRunner {
            fail_with: None,
            write_archive: false,
        };

        let outcome = run_job(job_for(path.clone()), &runner, &ArchiverConfig::default());
        assert!(!outcome.success);
        assert!(matches!(
            outcome.error,
            Some(CompressError::Io {
                operation: "stat archive",
                ..
            })
        ));
        assert!(path.exists());
    }

    /// Writes the archive, then locks the source directory against deletion
    #[cfg(unix)]
    struct LockingRunner;

    #[cfg(unix)]
    impl ArchiveRunner for LockingRunner {
        fn program(&self) -> &Path {
            Path::new("fake-7z")
        }

        fn run(&self, invocation: &Invocation) -> io::Result<ArchiveOutput> {
            use std::os::unix::fs::PermissionsExt;

            fs::write(&invocation.archive, b"7z")?;
            if let Some(dir) = invocation.source.parent() {
                fs::set_permissions(dir, fs::Permissions::from_mode(0o555))?;
            }
            Ok(ArchiveOutput::success())
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_delete_keeps_source_and_archive() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        let path = locked.join("report.txt");
        fs::write(&path, vec![b'r'; 4096]).unwrap();

        // Privileged users can unlink from read-only directories
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
        let privileged = fs::write(locked.join("write-check"), b"").is_ok();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if privileged {
            let _ = fs::remove_file(locked.join("write-check"));
            return;
        }

        let outcome = run_job(job_for(path.clone()), &LockingRunner, &ArchiverConfig::default());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(!outcome.success);
        assert!(matches!(outcome.error, Some(CompressError::Delete { .. })));
        assert!(
            outcome
                .message
                .starts_with("Error compressing report.txt: could not delete source")
        );
        assert!(path.exists());
        assert!(locked.join("report.txt.7z").exists());
    }

    #[test]
    fn test_undeletable_source_is_a_failure() {
        // A directory cannot be removed with remove_file, even by root
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("looks-like-a-file.txt");
        fs::create_dir(&path).unwrap();
        let runner = QuarterRunner {
            fail_with: None,
            write_archive: false,
        };
        fs::write(dir.path().join("looks-like-a-file.txt.7z"), b"7z").unwrap();

        let outcome = run_job(job_for(path.clone()), &runner, &ArchiverConfig::default());
        assert!(!outcome.success);
        assert!(matches!(outcome.error, Some(CompressError::Delete { .. })));
        assert_eq!(outcome.saved_bytes, None);
        assert!(path.exists());
        assert!(dir.path().join("looks-like-a-file.txt.7z").exists());
    }

    #[test]
    fn test_vanished_source() {
        let dir = TempDir::new().unwrap();
        let path = source(&dir, "gone.txt", 2048);
        let job = job_for(path.clone());
        fs::remove_file(&path).unwrap();

        let runner = QuarterRunner {
            fail_with: None,
            write_archive: true,
        };
        let outcome = run_job(job, &runner, &ArchiverConfig::default());
        assert!(!outcome.success);
        assert!(matches!(
            outcome.error,
            Some(CompressError::SourceVanished { .. })
        ));
    }

    #[test]
    fn test_panic_becomes_failure() {
        let dir = TempDir::new().unwrap();
        let path = source(&dir, "boom.txt", 2048);

        let outcome = run_job(job_for(path.clone()), &PanickingRunner, &ArchiverConfig::default());
        assert!(!outcome.success);
        assert!(matches!(
            outcome.error,
            Some(CompressError::WorkerPanic { .. })
        ));
        assert!(path.exists());
    }

    #[test]
    fn test_saved_percent() {
        let c = Compressed {
            original_bytes: 1000,
            archive_bytes: 250,
        };
        assert_eq!(c.saved_bytes(), 750);
        assert!((c.saved_percent() - 75.0).abs() < 1e-9);

        let grown = Compressed {
            original_bytes: 100,
            archive_bytes: 150,
        };
        assert_eq!(grown.saved_bytes(), 0);
        assert!(grown.saved_percent() < 0.0);
    }
}
