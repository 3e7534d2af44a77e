//! Error taxonomy for the compression core.
//!
//! Only precondition failures (`InvalidRoot`, `InvalidWorkerCount`,
//! `ExecutorNotIdle`, `ArchiverNotFound`) end a run early. Everything else is a
//! per-job failure that is recorded on the job's outcome and reported, while
//! the run carries on.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for core operations.
pub type CompressResult<T> = Result<T, CompressError>;

#[derive(Debug, Error)]
pub enum CompressError {
    /// The compression root does not exist or is not a directory.
    #[error("invalid root directory: {}", .path.display())]
    InvalidRoot { path: PathBuf },

    /// The executor was asked to run with zero workers.
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    /// `start` was called on an executor that already ran.
    #[error("executor is {state}, reset it before starting a new run")]
    ExecutorNotIdle { state: &'static str },

    /// No archiver executable could be located.
    #[error("7-Zip executable not found on PATH or in the standard install locations")]
    ArchiverNotFound,

    /// The source file disappeared between enumeration and processing.
    #[error("source vanished before compression: {}", .path.display())]
    SourceVanished { path: PathBuf },

    /// The archiver exited with a non-zero status.
    #[error("archiver failed on {} (exit {}): {}", .path.display(), .code.map_or_else(|| "signal".to_string(), |c| c.to_string()), .stderr.trim())]
    Archiver {
        path: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    /// The source could not be removed after a successful compression.
    #[error("failed to delete {} after compression: {source}", .path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Other filesystem or process failures.
    #[error("{operation} failed for {}: {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The archiver collaborator panicked while handling a job.
    #[error("archiver panicked while compressing {}", .path.display())]
    WorkerPanic { path: PathBuf },
}
