//! Adaptive scheduling
//!
//! The [`Scheduler`] turns a flat list of descriptors into a [`Plan`]: an
//! ordered job list, a worker count and an advisory [`Estimate`]. Every
//! decision is derived from the rule set, the scheduler configuration and a
//! read-only [`SystemProfile`] snapshot.

pub mod config;
pub mod estimate;
pub mod order;
pub mod params;
pub mod workers;

pub use config::SchedulerConfig;
pub use estimate::Estimate;
pub use params::{CompressionLevel, CompressionParams, DictionarySize, ParamTemplate};

use crate::classify::{Classifier, RuleSet};
use crate::walk::FileDescriptor;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use system_profile::SystemProfile;

/// One unit of work: compress a single file with a chosen parameter set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub descriptor: FileDescriptor,
    pub level: CompressionLevel,
    pub params: CompressionParams,
}

impl Job {
    pub fn flags(&self) -> Vec<String> {
        self.params.to_flags()
    }
}

/// Output of [`Scheduler::plan`], consumed directly by the executor
#[derive(Debug, Clone)]
pub struct Plan {
    pub level: CompressionLevel,
    pub jobs: Vec<Job>,
    pub workers: usize,
    pub estimate: Estimate,
    /// Descriptors dropped because they were not eligible
    pub excluded: usize,
    /// Descriptors dropped because their path was already planned
    pub duplicates: usize,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Most common extensions, by job count (ties broken alphabetically)
    pub fn extension_breakdown(&self, limit: usize) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for job in &self.jobs {
            let ext = if job.descriptor.extension.is_empty() {
                "(none)"
            } else {
                job.descriptor.extension.as_str()
            };
            *counts.entry(ext).or_default() += 1;
        }

        let mut breakdown: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(ext, count)| (ext.to_string(), count))
            .collect();
        breakdown.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        breakdown.truncate(limit);
        breakdown
    }
}

pub struct Scheduler {
    classifier: Classifier,
    templates: Vec<ParamTemplate>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(rules: &RuleSet, config: SchedulerConfig) -> Self {
        Self {
            classifier: Classifier::new(rules),
            templates: rules.templates.clone(),
            config,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Stable sort by `(priority, size)`
    pub fn order(&self, descriptors: Vec<FileDescriptor>) -> Vec<FileDescriptor> {
        order::order(&self.classifier, descriptors)
    }

    /// Regroup by parent directory, superseding the priority order
    pub fn group_by_locality(&self, ordered: Vec<FileDescriptor>) -> Vec<FileDescriptor> {
        order::group_by_locality(ordered)
    }

    fn template(&self, level: CompressionLevel) -> ParamTemplate {
        self.templates
            .iter()
            .find(|t| t.level == level)
            .copied()
            .unwrap_or_else(|| ParamTemplate::builtin(level))
    }

    /// Parameters for one file.
    ///
    /// Adjustments are applied in this order: storage tuning, large-file
    /// dictionary upgrade, memory guard. The memory guard comes last and
    /// overrides the upgrade.
    pub fn select_params(
        &self,
        level: CompressionLevel,
        file_size: u64,
        profile: &SystemProfile,
    ) -> CompressionParams {
        let mut params = CompressionParams::from(self.template(level)).tuned_for(profile.storage_class);

        if file_size > self.config.large_file_bytes {
            params = params.with_upgraded_dictionary();
        }

        if profile.available_memory < self.config.memory_guard_bytes {
            params = params.with_dictionary(self.config.memory_floor_dictionary);
        }

        params
    }

    pub fn select_worker_count(&self, job_count: usize, profile: &SystemProfile) -> usize {
        workers::select_worker_count(job_count, profile, &self.config)
    }

    /// Advisory estimate over the eligible jobs
    pub fn estimate(&self, jobs: &[Job], profile: &SystemProfile) -> Estimate {
        estimate::estimate(
            jobs.iter()
                .filter(|job| self.classifier.is_eligible(&job.descriptor))
                .map(|job| job.descriptor.size_bytes),
            profile,
            &self.config,
        )
    }

    /// Filter, deduplicate, order, group and parametrize a batch
    pub fn plan(
        &self,
        descriptors: Vec<FileDescriptor>,
        level: CompressionLevel,
        profile: &SystemProfile,
    ) -> Plan {
        let total = descriptors.len();
        let mut seen = HashSet::new();
        let mut excluded = 0;

        let mut eligible = Vec::with_capacity(total);
        for descriptor in descriptors {
            if !self.classifier.is_eligible(&descriptor) {
                excluded += 1;
                continue;
            }
            if seen.insert(descriptor.path.clone()) {
                eligible.push(descriptor);
            }
        }
        let duplicates = total - excluded - eligible.len();

        let ordered = self.group_by_locality(self.order(eligible));

        let jobs: Vec<Job> = ordered
            .into_iter()
            .map(|descriptor| {
                let params = self.select_params(level, descriptor.size_bytes, profile);
                Job {
                    descriptor,
                    level,
                    params,
                }
            })
            .collect();

        let workers = self.select_worker_count(jobs.len(), profile);
        let estimate = self.estimate(&jobs, profile);

        tracing::debug!(
            "Planned {} jobs ({} excluded, {} duplicates) on {} workers",
            jobs.len(),
            excluded,
            duplicates,
            workers
        );

        Plan {
            level,
            jobs,
            workers,
            estimate,
            excluded,
            duplicates,
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(&RuleSet::default(), SchedulerConfig::default())
    }
}
