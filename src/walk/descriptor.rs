use serde::Serialize;
use std::path::{Path, PathBuf};

/// One file as reported by the walk: path, size and normalized extension
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Lower-cased, including the leading dot, or empty
    pub extension: String,
}

impl FileDescriptor {
    /// Build a descriptor, deriving the extension from the path
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        let extension = extension_of(&path);
        Self {
            path,
            size_bytes,
            extension,
        }
    }

    /// Directory containing the file (empty for bare file names)
    pub fn parent(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// `.TXT` becomes `.txt`; `archive.tar.gz` yields `.gz`; dotfiles have none
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_normalization() {
        assert_eq!(extension_of(Path::new("/data/Report.CSV")), ".csv");
        assert_eq!(extension_of(Path::new("backup.tar.gz")), ".gz");
        assert_eq!(extension_of(Path::new("/home/user/.bashrc")), "");
        assert_eq!(extension_of(Path::new("Makefile")), "");
    }

    #[test]
    fn test_parent_and_file_name() {
        let descriptor = FileDescriptor::new("/data/logs/app.txt", 10);
        assert_eq!(descriptor.parent(), Path::new("/data/logs"));
        assert_eq!(descriptor.file_name(), "app.txt");
        assert_eq!(descriptor.extension, ".txt");

        let bare = FileDescriptor::new("notes.md", 1);
        assert_eq!(bare.parent(), Path::new(""));
    }
}
