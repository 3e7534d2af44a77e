//! Duration estimate
//!
//! Advisory only: the throughput constant is a rough benchmark figure and the
//! result can be off by an order of magnitude on unusual data.

use crate::classify::rules::MIB;
use crate::schedule::config::SchedulerConfig;
use serde::Serialize;
use std::time::Duration;
use system_profile::SystemProfile;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    pub file_count: usize,
    pub total_size_bytes: u64,
    pub estimated_seconds: f64,
}

impl Estimate {
    pub fn total_size_mib(&self) -> f64 {
        self.total_size_bytes as f64 / MIB as f64
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.estimated_seconds.max(0.0))
    }

    pub fn estimated_minutes(&self) -> f64 {
        self.estimated_seconds / 60.0
    }
}

/// Effective throughput in MiB/s for this host
pub fn effective_throughput(profile: &SystemProfile, config: &SchedulerConfig) -> f64 {
    let mut speed = config.base_throughput_mib_s;
    if profile.storage_class.is_fast() {
        speed *= config.fast_storage_factor;
    }
    let cpu_factor = (profile.cpu_count as f64 / 4.0).min(config.max_cpu_factor);
    speed * cpu_factor
}

/// Estimate from the sizes of the files that will be compressed
pub fn estimate<I>(sizes: I, profile: &SystemProfile, config: &SchedulerConfig) -> Estimate
where
    I: IntoIterator<Item = u64>,
{
    let (file_count, total_size_bytes) = sizes
        .into_iter()
        .fold((0usize, 0u64), |(count, total), size| {
            (count + 1, total.saturating_add(size))
        });

    let speed = effective_throughput(profile, config);
    let estimated_seconds = if speed > 0.0 {
        (total_size_bytes as f64 / MIB as f64) / speed
    } else {
        0.0
    };

    Estimate {
        file_count,
        total_size_bytes,
        estimated_seconds,
    }
}
