//! File classification: eligibility and priority
//!
//! The classifier is built once from the [`RuleSet`] and then shared
//! read-only across threads. Both of its answers are pure functions of the
//! descriptor and the rules.

pub mod filters;
pub mod rules;

pub use filters::{ExclusionReason, FileFilter, FilterDecision};
pub use rules::RuleSet;

use crate::walk::FileDescriptor;
use filters::{ExtensionFilter, PathFilter, SizeFilter, extension_set};
use std::collections::HashSet;

/// Base priority before adjustments; lower runs sooner
pub const BASE_PRIORITY: i32 = 5;

/// Eligibility verdict and priority score for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub eligible: bool,
    pub priority: i32,
    pub reason: Option<ExclusionReason>,
}

pub struct Classifier {
    path_filter: PathFilter,
    extension_filter: ExtensionFilter,
    size_filter: SizeFilter,
    priority_extensions: HashSet<String>,
    small_file_bytes: u64,
    large_file_bytes: u64,
}

impl Classifier {
    pub fn new(rules: &RuleSet) -> Self {
        Self {
            path_filter: PathFilter::new(rules),
            extension_filter: ExtensionFilter::new(rules),
            size_filter: SizeFilter::new(rules),
            priority_extensions: extension_set(&rules.priority_extensions),
            small_file_bytes: rules.small_file_bytes,
            large_file_bytes: rules.large_file_bytes,
        }
    }

    fn filters(&self) -> [&dyn FileFilter; 3] {
        [&self.path_filter, &self.extension_filter, &self.size_filter]
    }

    /// First filter that rejects the descriptor, if any
    pub fn exclusion_reason(&self, descriptor: &FileDescriptor) -> Option<ExclusionReason> {
        self.filters()
            .into_iter()
            .find_map(|filter| match filter.check(descriptor) {
                FilterDecision::Skip(reason) => {
                    tracing::trace!(
                        "{} skipped {}: {}",
                        filter.name(),
                        descriptor.path.display(),
                        reason
                    );
                    Some(reason)
                }
                FilterDecision::Process => None,
            })
    }

    pub fn is_eligible(&self, descriptor: &FileDescriptor) -> bool {
        self.exclusion_reason(descriptor).is_none()
    }

    /// Priority score, lower is processed earlier.
    ///
    /// Already-compressed files should never get this far, but if one does it
    /// still lands at the very back of the queue.
    pub fn priority(&self, descriptor: &FileDescriptor) -> i32 {
        let mut priority = BASE_PRIORITY;

        if self.priority_extensions.contains(&descriptor.extension) {
            priority -= 2;
        }

        if descriptor.size_bytes < self.small_file_bytes {
            priority -= 1;
        } else if descriptor.size_bytes > self.large_file_bytes {
            priority += 2;
        }

        if self.extension_filter.is_compressed(&descriptor.extension) {
            priority += 10;
        }

        priority
    }

    pub fn classify(&self, descriptor: &FileDescriptor) -> Classification {
        let reason = self.exclusion_reason(descriptor);
        Classification {
            eligible: reason.is_none(),
            priority: self.priority(descriptor),
            reason,
        }
    }

    /// Directory-level check used by the walk to prune system folders
    pub fn is_system_path(&self, path: &str) -> bool {
        self.path_filter.matches_path(path)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&RuleSet::default())
    }
}
