//! System Profile Crate
//!
//! Provides a one-shot snapshot of the host resources that drive scheduling
//! decisions: CPU count, available memory and a coarse storage latency class.
//!
//! Detection never fails. Every read that is unavailable falls back to the
//! most conservative value (1 core, 0 bytes of memory, `Slow` storage) and is
//! recorded as a [`ProbeFailure`] on the profile.
//!
//! Uses std::sync::LazyLock (Rust 1.80+) for the process-wide instance.

use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

/// Size of the storage probe payload (1 MiB)
pub const PROBE_BYTES: usize = 1024 * 1024;

/// Reads of the probe payload faster than this classify the medium as fast
pub const FAST_READ_THRESHOLD: Duration = Duration::from_millis(10);

/// Global system profile instance - computed once, cached forever
pub static SYSTEM: LazyLock<Arc<SystemProfile>> =
    LazyLock::new(|| Arc::new(SystemProfile::detect()));

/// Coarse latency class of the storage medium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StorageClass {
    /// SSD-like: the probe read completed under the threshold
    Fast,
    /// HDD-like, or the probe could not run
    Slow,
}

impl StorageClass {
    /// Classify a measured probe read time
    pub fn from_read_time(elapsed: Duration) -> Self {
        if elapsed < FAST_READ_THRESHOLD {
            StorageClass::Fast
        } else {
            StorageClass::Slow
        }
    }

    pub fn is_fast(self) -> bool {
        matches!(self, StorageClass::Fast)
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageClass::Fast => f.write_str("fast (SSD-like)"),
            StorageClass::Slow => f.write_str("slow (HDD-like)"),
        }
    }
}

/// A detection step that degraded to its default value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ProbeFailure {
    /// CPU count unavailable, assumed 1
    CpuCount,
    /// Memory statistics unavailable, assumed 0 bytes available
    Memory,
    /// Storage probe failed, assumed slow
    Storage { dir: PathBuf, reason: String },
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::CpuCount => f.write_str("cpu count unavailable, assuming 1 core"),
            ProbeFailure::Memory => {
                f.write_str("memory statistics unavailable, assuming 0 bytes available")
            }
            ProbeFailure::Storage { dir, reason } => write!(
                f,
                "storage probe in {} failed ({reason}), assuming slow storage",
                dir.display()
            ),
        }
    }
}

/// System profile containing hardware and resource information
#[derive(Debug, Clone, Serialize)]
pub struct SystemProfile {
    /// Total CPU cores (including hyperthreading), always at least 1
    pub cpu_count: usize,

    /// Physical CPU cores (excluding hyperthreading)
    pub physical_cpu_count: usize,

    /// Total system memory in bytes
    pub total_memory: u64,

    /// Available system memory in bytes at startup
    pub available_memory: u64,

    /// Storage latency class of the probed medium
    pub storage_class: StorageClass,

    /// Operating system name
    pub os_name: String,

    /// Detection steps that fell back to defaults
    pub degraded: Vec<ProbeFailure>,
}

impl SystemProfile {
    /// Build a profile from explicit values (no detection)
    pub fn new(cpu_count: usize, available_memory: u64, storage_class: StorageClass) -> Self {
        let cpu_count = cpu_count.max(1);
        Self {
            cpu_count,
            physical_cpu_count: cpu_count,
            total_memory: available_memory,
            available_memory,
            storage_class,
            os_name: "Unknown".to_string(),
            degraded: Vec::new(),
        }
    }

    /// Most conservative profile: 1 core, no memory, slow storage
    pub fn conservative() -> Self {
        Self::new(1, 0, StorageClass::Slow)
    }

    /// Detect the host profile, probing storage in the system temp directory
    pub fn detect() -> Self {
        Self::detect_in(&std::env::temp_dir())
    }

    /// Detect the host profile, probing the storage medium that holds `dir`
    pub fn detect_in(dir: &Path) -> Self {
        use sysinfo::System;

        let mut degraded = Vec::new();

        let cpu_count = match num_cpus::get() {
            0 => {
                degraded.push(ProbeFailure::CpuCount);
                1
            }
            n => n,
        };
        let physical_cpu_count = num_cpus::get_physical().max(1);

        let (total_memory, available_memory) = if sysinfo::IS_SUPPORTED_SYSTEM {
            let mut sys = System::new_with_specifics(
                sysinfo::RefreshKind::new().with_memory(sysinfo::MemoryRefreshKind::everything()),
            );
            sys.refresh_memory();
            if sys.total_memory() == 0 {
                degraded.push(ProbeFailure::Memory);
                (0, 0)
            } else {
                (sys.total_memory(), sys.available_memory())
            }
        } else {
            degraded.push(ProbeFailure::Memory);
            (0, 0)
        };

        let storage_class = match probe_storage(dir) {
            Ok(elapsed) => {
                tracing::debug!(
                    "Storage probe read {} bytes in {:?} from {}",
                    PROBE_BYTES,
                    elapsed,
                    dir.display()
                );
                StorageClass::from_read_time(elapsed)
            }
            Err(e) => {
                degraded.push(ProbeFailure::Storage {
                    dir: dir.to_path_buf(),
                    reason: e.to_string(),
                });
                StorageClass::Slow
            }
        };

        for failure in &degraded {
            tracing::warn!("System profile degraded: {}", failure);
        }

        let os_name = System::name().unwrap_or_else(|| "Unknown".to_string());

        Self {
            cpu_count,
            physical_cpu_count,
            total_memory,
            available_memory,
            storage_class,
            os_name,
            degraded,
        }
    }

    /// Get the global system profile instance
    pub fn get() -> Arc<SystemProfile> {
        SYSTEM.clone()
    }

    /// Whether any detection step fell back to its default
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// Get available memory in GB
    pub fn available_memory_gb(&self) -> f64 {
        self.available_memory as f64 / (1024.0 * 1024.0 * 1024.0)
    }

    /// Get memory in GB
    pub fn total_memory_gb(&self) -> f64 {
        self.total_memory as f64 / (1024.0 * 1024.0 * 1024.0)
    }

    /// Get a human-readable summary of system resources
    pub fn summary(&self) -> String {
        format!(
            "System: {}\n\
             CPUs: {} ({} physical)\n\
             Memory: {:.2} GB ({:.2} GB available)\n\
             Storage: {}",
            self.os_name,
            self.cpu_count,
            self.physical_cpu_count,
            self.total_memory_gb(),
            self.available_memory_gb(),
            self.storage_class,
        )
    }
}

/// Write a 1 MiB payload next to `dir`, time a full synchronous read of it,
/// and delete it again.
///
/// The page cache usually serves the read, so this measures little more than
/// the medium's write-back latency. It is a heuristic only.
fn probe_storage(dir: &Path) -> io::Result<Duration> {
    let mut probe = tempfile::Builder::new()
        .prefix(".profile-probe-")
        .tempfile_in(dir)?;

    let payload = vec![0u8; PROBE_BYTES];
    probe.write_all(&payload)?;
    probe.as_file().sync_all()?;

    let mut reader = File::open(probe.path())?;
    let mut buffer = Vec::with_capacity(PROBE_BYTES);
    let start = Instant::now();
    reader.read_to_end(&mut buffer)?;
    let elapsed = start.elapsed();
    drop(reader);

    probe.close()?;

    if buffer.len() != PROBE_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("probe read {} of {} bytes", buffer.len(), PROBE_BYTES),
        ));
    }

    Ok(elapsed)
}
