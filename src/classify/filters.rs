//! Eligibility filters
//!
//! Filters operate on descriptor metadata only; none of them touches the
//! file. They are applied in a fixed order and the first `Skip` wins:
//! 1. **Path Filter** - system path fragments
//! 2. **Extension Filter** - system and already-compressed extensions
//! 3. **Size Filter** - minimum eligible size

use crate::classify::rules::{RuleSet, normalize_extension, normalize_separators};
use crate::walk::FileDescriptor;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Why a file was excluded from compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExclusionReason {
    SystemPath,
    SystemExtension,
    AlreadyCompressed,
    TooSmall,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExclusionReason::SystemPath => "system folder",
            ExclusionReason::SystemExtension => "system extension",
            ExclusionReason::AlreadyCompressed => "already compressed",
            ExclusionReason::TooSmall => "too small",
        })
    }
}

/// Decision produced by a single filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Keep the file
    Process,
    /// Skip the file with reason
    Skip(ExclusionReason),
}

/// Common trait for all eligibility filters
pub trait FileFilter: Send + Sync {
    /// Apply the filter to a descriptor
    fn check(&self, descriptor: &FileDescriptor) -> FilterDecision;

    /// Get the name of this filter for debugging/logging
    fn name(&self) -> &'static str;
}

/// Excludes any path containing a system fragment
pub struct PathFilter {
    fragments: Vec<String>,
}

impl PathFilter {
    pub fn new(rules: &RuleSet) -> Self {
        Self {
            fragments: rules
                .system_path_fragments
                .iter()
                .filter(|f| !f.is_empty())
                .map(|f| normalize_separators(f))
                .collect(),
        }
    }

    /// Also used by the walk to prune whole directories
    pub fn matches_path(&self, path: &str) -> bool {
        let path = normalize_separators(path);
        self.fragments.iter().any(|fragment| path.contains(fragment.as_str()))
    }
}

impl FileFilter for PathFilter {
    fn check(&self, descriptor: &FileDescriptor) -> FilterDecision {
        if self.matches_path(&descriptor.path.to_string_lossy()) {
            FilterDecision::Skip(ExclusionReason::SystemPath)
        } else {
            FilterDecision::Process
        }
    }

    fn name(&self) -> &'static str {
        "PathFilter"
    }
}

/// Excludes system extensions and formats that are already compressed
pub struct ExtensionFilter {
    system: HashSet<String>,
    compressed: HashSet<String>,
}

impl ExtensionFilter {
    pub fn new(rules: &RuleSet) -> Self {
        Self {
            system: extension_set(&rules.system_extensions),
            compressed: extension_set(&rules.ignored_extensions),
        }
    }

    pub fn is_compressed(&self, extension: &str) -> bool {
        self.compressed.contains(extension)
    }
}

impl FileFilter for ExtensionFilter {
    fn check(&self, descriptor: &FileDescriptor) -> FilterDecision {
        if self.system.contains(&descriptor.extension) {
            FilterDecision::Skip(ExclusionReason::SystemExtension)
        } else if self.compressed.contains(&descriptor.extension) {
            FilterDecision::Skip(ExclusionReason::AlreadyCompressed)
        } else {
            FilterDecision::Process
        }
    }

    fn name(&self) -> &'static str {
        "ExtensionFilter"
    }
}

/// Filter files based on size
pub struct SizeFilter {
    min_size_bytes: u64,
}

impl SizeFilter {
    pub fn new(rules: &RuleSet) -> Self {
        Self {
            min_size_bytes: rules.min_file_size,
        }
    }
}

impl FileFilter for SizeFilter {
    fn check(&self, descriptor: &FileDescriptor) -> FilterDecision {
        if descriptor.size_bytes < self.min_size_bytes {
            FilterDecision::Skip(ExclusionReason::TooSmall)
        } else {
            FilterDecision::Process
        }
    }

    fn name(&self) -> &'static str {
        "SizeFilter"
    }
}

pub(crate) fn extension_set(extensions: &[String]) -> HashSet<String> {
    extensions
        .iter()
        .map(|ext| normalize_extension(ext))
        .filter(|ext| !ext.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_filter_matches_windows_fragments() {
        let filter = PathFilter::new(&RuleSet::default());
        let d = FileDescriptor::new("E:\\Users\\Default\\ntuser.dat", 4096);
        assert_eq!(filter.check(&d), FilterDecision::Skip(ExclusionReason::SystemPath));

        let d = FileDescriptor::new("/mnt/usb/$RECYCLE.BIN/S-1-5/file.txt", 4096);
        assert_eq!(filter.check(&d), FilterDecision::Skip(ExclusionReason::SystemPath));

        let d = FileDescriptor::new("/mnt/usb/photos/notes.txt", 4096);
        assert_eq!(filter.check(&d), FilterDecision::Process);
    }

    #[test]
    fn test_extension_filter_reasons() {
        let filter = ExtensionFilter::new(&RuleSet::default());
        assert_eq!(
            filter.check(&FileDescriptor::new("setup.EXE", 4096)),
            FilterDecision::Skip(ExclusionReason::SystemExtension)
        );
        assert_eq!(
            filter.check(&FileDescriptor::new("backup.tar.gz", 4096)),
            FilterDecision::Skip(ExclusionReason::AlreadyCompressed)
        );
        assert_eq!(
            filter.check(&FileDescriptor::new("report.csv", 4096)),
            FilterDecision::Process
        );
    }

    #[test]
    fn test_size_filter_boundary() {
        let filter = SizeFilter::new(&RuleSet::default());
        assert_eq!(
            filter.check(&FileDescriptor::new("a.txt", 1023)),
            FilterDecision::Skip(ExclusionReason::TooSmall)
        );
        assert_eq!(
            filter.check(&FileDescriptor::new("a.txt", 1024)),
            FilterDecision::Process
        );
        assert_eq!(filter.name(), "SizeFilter");
    }

    #[test]
    fn test_extension_set_accepts_bare_names() {
        let set = extension_set(&["TXT".to_string(), ".Csv".to_string(), String::new()]);
        assert!(set.contains(".txt"));
        assert!(set.contains(".csv"));
        assert_eq!(set.len(), 2);
    }
}
