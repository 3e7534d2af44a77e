use crate::schedule::config::SchedulerConfig;
use system_profile::SystemProfile;

/// Worker count for a batch of `job_count` jobs.
///
/// ```text
/// job_count < sequential_below     -> 1
/// job_count < full_parallel_from   -> min(moderate_workers, cap)
/// otherwise                        -> cap
/// cap = max(1, min(max_workers, cpu_count))
/// ```
pub fn select_worker_count(
    job_count: usize,
    profile: &SystemProfile,
    config: &SchedulerConfig,
) -> usize {
    let cap = config.max_workers.min(profile.cpu_count).max(1);

    if job_count < config.sequential_below {
        1
    } else if job_count < config.full_parallel_from {
        config.moderate_workers.min(cap).max(1)
    } else {
        cap
    }
}
