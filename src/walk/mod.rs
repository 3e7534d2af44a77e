//! Filesystem walk producing file descriptors for a root directory

pub mod descriptor;

pub use descriptor::FileDescriptor;

use crate::classify::Classifier;
use crate::error::{CompressError, CompressResult};
use crate::parallel::CancellationToken;
use crate::progress::{LogLevel, ProgressSender};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Excluded files named per directory before the rest are summarized
const EXCLUSION_SAMPLES: usize = 3;

#[derive(Debug, Default)]
pub struct WalkReport {
    /// Every regular file found outside pruned directories
    pub files: Vec<FileDescriptor>,
    pub pruned_dirs: usize,
    pub unreadable: usize,
    /// The token was set before the walk finished
    pub interrupted: bool,
}

pub fn validate_root(root: &Path) -> CompressResult<()> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(CompressError::InvalidRoot {
            path: root.to_path_buf(),
        })
    }
}

/// Walk `root` without following symlinks.
///
/// Directories whose path contains a system fragment are not entered.
/// Entries that cannot be read are logged and skipped.
pub fn walk(
    root: &Path,
    classifier: &Classifier,
    token: &CancellationToken,
    progress: &ProgressSender,
) -> CompressResult<WalkReport> {
    validate_root(root)?;
    progress.log(LogLevel::Analysis, format!("Scanning {}", root.display()));

    let mut report = WalkReport::default();
    let mut pruned = 0usize;
    let mut excluded_per_dir: HashMap<PathBuf, usize> = HashMap::new();
    // (eligible, total) for every directory holding at least one file
    let mut per_dir: BTreeMap<PathBuf, (usize, usize)> = BTreeMap::new();

    let entries = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let keep = !classifier.is_system_path(&entry.path().to_string_lossy());
            if !keep {
                pruned += 1;
                progress.log(
                    LogLevel::Warning,
                    format!("Skipped folder: {} (system)", entry.path().display()),
                );
            }
            keep
        });

    for entry in entries {
        if token.is_cancelled() {
            report.interrupted = true;
            progress.log(LogLevel::Warning, "Scan interrupted");
            break;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                report.unreadable += 1;
                tracing::warn!("Skipping unreadable entry: {}", e);
                progress.log(LogLevel::Warning, format!("Unreadable: {e}"));
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                report.unreadable += 1;
                tracing::warn!("Cannot stat {}: {}", entry.path().display(), e);
                continue;
            }
        };

        let descriptor = FileDescriptor::new(entry.into_path(), size);
        let reason = classifier.exclusion_reason(&descriptor);
        let (eligible, total) = per_dir.entry(descriptor.parent().to_path_buf()).or_default();
        *total += 1;
        if reason.is_none() {
            *eligible += 1;
        }
        if let Some(reason) = reason {
            let seen = excluded_per_dir
                .entry(descriptor.parent().to_path_buf())
                .or_insert(0);
            *seen += 1;
            if *seen <= EXCLUSION_SAMPLES {
                progress.log(
                    LogLevel::Warning,
                    format!("Skipped file: {} ({reason})", descriptor.file_name()),
                );
            }
        }
        report.files.push(descriptor);
    }

    report.pruned_dirs = pruned;

    for (dir, count) in &excluded_per_dir {
        if *count > EXCLUSION_SAMPLES {
            progress.log(
                LogLevel::Warning,
                format!(
                    "... and {} more files skipped in {}",
                    count - EXCLUSION_SAMPLES,
                    dir.display()
                ),
            );
        }
    }

    for (dir, (eligible, total)) in &per_dir {
        progress.log(
            LogLevel::Analysis,
            format!("{}: {eligible}/{total} files eligible", dir_label(root, dir)),
        );
    }

    let excluded: usize = excluded_per_dir.values().sum();
    tracing::info!(
        "Scan found {} files ({} excluded), pruned {} folders",
        report.files.len(),
        excluded,
        report.pruned_dirs
    );
    progress.log(
        LogLevel::Analysis,
        format!(
            "Scan finished: {} files found, {} eligible, {} folders skipped",
            report.files.len(),
            report.files.len() - excluded,
            report.pruned_dirs
        ),
    );

    Ok(report)
}

/// Directory name relative to the root, `(root)` for the root itself
fn dir_label(root: &Path, dir: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => "(root)".to_string(),
        Ok(rel) => rel.display().to_string(),
        Err(_) => dir.display().to_string(),
    }
}
