use super::{ArchiveOutput, ArchiveRunner, ArchiverConfig, Invocation};
use crate::error::{CompressError, CompressResult};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Names tried on `PATH`, in order
const EXECUTABLE_NAMES: &[&str] = &["7z", "7za", "7zz"];

const WINDOWS_INSTALL_PATHS: &[&str] = &[
    r"C:\Program Files\7-Zip\7z.exe",
    r"C:\Program Files (x86)\7-Zip\7z.exe",
];

/// 7-Zip run as a child process, one per job
#[derive(Debug, Clone)]
pub struct SevenZip {
    executable: PathBuf,
}

impl SevenZip {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Use the configured executable, or search `PATH` and the standard
    /// install directories
    pub fn from_config(config: &ArchiverConfig) -> CompressResult<Self> {
        match &config.executable {
            Some(path) => {
                let resolved = which::which(path).map_err(|_| CompressError::ArchiverNotFound)?;
                Ok(Self::new(resolved))
            }
            None => Self::locate().ok_or(CompressError::ArchiverNotFound),
        }
    }

    pub fn locate() -> Option<Self> {
        let found = EXECUTABLE_NAMES
            .iter()
            .find_map(|name| which::which(name).ok())
            .or_else(|| {
                WINDOWS_INSTALL_PATHS
                    .iter()
                    .map(PathBuf::from)
                    .find(|path| path.is_file())
            })?;

        tracing::debug!("Using archiver at {}", found.display());
        Some(Self::new(found))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl ArchiveRunner for SevenZip {
    fn program(&self) -> &Path {
        &self.executable
    }

    fn run(&self, invocation: &Invocation) -> io::Result<ArchiveOutput> {
        tracing::trace!("Running: {}", invocation.display());

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).stdin(Stdio::null());
        detach_from_terminal_signals(&mut command);
        let output = command.output()?;

        Ok(ArchiveOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Start the child outside the terminal's foreground process group, so a
/// Ctrl-C reaches bulkpress only and running jobs finish.
#[cfg(unix)]
fn detach_from_terminal_signals(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(windows)]
fn detach_from_terminal_signals(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    command.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach_from_terminal_signals(_command: &mut Command) {}
