//! # bulkpress - adaptive bulk compression with 7-Zip
//!
//! Walks a directory tree, filters out files that are not worth compressing,
//! orders the rest for quick feedback and directory locality, and compresses
//! each file with an external archiver on a worker pool sized to the host.
//!
//! ## Pipeline
//!
//! ```text
//! walk -> classify -> schedule -> parallel::Executor -> progress events
//! ```
//!
//! - [`walk`] enumerates the root and yields [`walk::FileDescriptor`]s
//! - [`classify`] decides eligibility and priority
//! - [`schedule`] orders, groups, picks parameters and a worker count
//! - [`parallel`] runs the jobs and owns the run state machine
//! - [`progress`] carries events back to a single consumer
//! - [`session`] ties these together behind `start` / `cancel` / `drain`
//!
//! Compression is destructive: a source file is deleted once its archive
//! has been written.

pub mod archiver;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod parallel;
pub mod progress;
pub mod schedule;
pub mod session;
pub mod walk;

pub use config::{BulkpressConfig, Settings};
pub use error::{CompressError, CompressResult};
pub use session::{Session, SessionOptions};

/// Result type alias for application-level operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
