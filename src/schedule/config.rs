//! Scheduler configuration

use crate::classify::rules::{GIB, MIB};
use crate::schedule::params::DictionarySize;
use serde::{Deserialize, Serialize};

/// Tuning knobs for ordering, parameter and worker selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Process-wide ceiling on concurrent archiver processes
    pub max_workers: usize,
    /// Batches smaller than this run on a single worker
    pub sequential_below: usize,
    /// Batches smaller than this use at most `moderate_workers`
    pub full_parallel_from: usize,
    pub moderate_workers: usize,

    /// Inputs above this size get the next dictionary tier
    pub large_file_bytes: u64,
    /// Below this much available memory the dictionary is forced down
    pub memory_guard_bytes: u64,
    /// Dictionary used when the memory guard applies
    #[serde(rename = "memory_floor_dictionary_mib")]
    pub memory_floor_dictionary: DictionarySize,

    /// Assumed archiver throughput at mid compression levels
    pub base_throughput_mib_s: f64,
    pub fast_storage_factor: f64,
    pub max_cpu_factor: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            sequential_below: 10,
            full_parallel_from: 100,
            moderate_workers: 2,
            large_file_bytes: 100 * MIB,
            memory_guard_bytes: 4 * GIB,
            memory_floor_dictionary: DictionarySize::Mib16,
            base_throughput_mib_s: 50.0,
            fast_storage_factor: 1.5,
            max_cpu_factor: 2.0,
        }
    }
}
