//! External archiver collaborator
//!
//! The core only ever talks to an [`ArchiveRunner`]. The subprocess
//! implementation lives in [`seven_zip`]; tests substitute their own runner.

pub mod seven_zip;

pub use seven_zip::SevenZip;

use crate::schedule::Job;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiverConfig {
    /// Explicit archiver executable; located automatically when unset
    pub executable: Option<PathBuf>,
    /// Appended to the source path to name the archive
    pub archive_suffix: String,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            executable: None,
            archive_suffix: ".7z".to_string(),
        }
    }
}

impl ArchiverConfig {
    /// `report.txt` becomes `report.txt.7z`
    pub fn archive_path(&self, source: &Path) -> PathBuf {
        let mut name = OsString::from(source.as_os_str());
        name.push(&self.archive_suffix);
        PathBuf::from(name)
    }
}

/// One archiver call: `program a <flags...> <archive> <source>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub source: PathBuf,
    pub archive: PathBuf,
}

impl Invocation {
    pub fn for_job(program: &Path, job: &Job, config: &ArchiverConfig) -> Self {
        let source = job.descriptor.path.clone();
        let archive = config.archive_path(&source);

        let mut args: Vec<OsString> = Vec::with_capacity(8);
        args.push("a".into());
        args.extend(job.flags().into_iter().map(OsString::from));
        args.push(archive.clone().into_os_string());
        args.push(source.clone().into_os_string());

        Self {
            program: program.to_path_buf(),
            args,
            source,
            archive,
        }
    }

    /// Space-joined command line for log output
    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().map(|arg| arg.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What the archiver reported for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArchiveOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ArchiveOutput {
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            ..Self::default()
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs one archiver invocation to completion.
///
/// Implementations are shared by every worker thread. An `Err` means the
/// process could not be started at all; a started process that fails is an
/// `Ok` with a non-zero exit code.
pub trait ArchiveRunner: Send + Sync {
    /// Executable placed in each [`Invocation`]
    fn program(&self) -> &Path;

    fn run(&self, invocation: &Invocation) -> io::Result<ArchiveOutput>;
}
