//! Rule set configuration
//!
//! Loaded once from the `[rules]` section and never modified afterwards.

use crate::schedule::params::ParamTemplate;
use serde::{Deserialize, Serialize};

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Already-compressed formats, never worth recompressing
    pub ignored_extensions: Vec<String>,
    /// Executables, drivers and transient files
    pub system_extensions: Vec<String>,
    /// Any path containing one of these is excluded
    pub system_path_fragments: Vec<String>,
    /// Files smaller than this are excluded
    pub min_file_size: u64,
    /// Cheap, human-readable formats processed first for quick feedback
    pub priority_extensions: Vec<String>,
    /// Below this size a file gets a priority bonus
    pub small_file_bytes: u64,
    /// Above this size a file is pushed back
    pub large_file_bytes: u64,
    /// Per-level archiver parameter templates
    pub templates: Vec<ParamTemplate>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            ignored_extensions: strings(&[
                ".7z", ".zip", ".rar", ".gz", ".bz2", ".xz", ".tar", ".z", ".lz", ".lzma", ".cab",
                ".arj", ".ace",
            ]),
            system_extensions: strings(&[".sys", ".dll", ".exe", ".msi", ".tmp", ".log"]),
            system_path_fragments: strings(&[
                "System Volume Information",
                "$RECYCLE.BIN",
                "Windows",
                "Program Files",
                "Program Files (x86)",
                "ProgramData",
                "Users\\Default",
                "Users\\All Users",
            ]),
            min_file_size: KIB,
            priority_extensions: strings(&[
                ".txt", ".log", ".csv", ".json", ".xml", ".html", ".css", ".js",
            ]),
            small_file_bytes: 10 * MIB,
            large_file_bytes: 100 * MIB,
            templates: ParamTemplate::defaults(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// `TXT`, `.TXT` and `txt` all become `.txt`
pub fn normalize_extension(ext: &str) -> String {
    let lowered = ext.trim().to_lowercase();
    if lowered.is_empty() || lowered.starts_with('.') {
        lowered
    } else {
        format!(".{lowered}")
    }
}

/// Backslashes become forward slashes so Windows-style fragments match on any host
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}
