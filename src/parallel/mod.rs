//! Bounded worker pool that runs compression jobs
//!
//! The executor owns the run's state machine. Scheduling decisions (which
//! jobs, in what order, how many workers) are made before `start` is called;
//! this module only executes them.
//!
//! ```text
//!                ◀──── ready(worker id) ────
//! ┌────────────┐  one job per ready  ┌──────────┐  outcomes  ┌───────────┐
//! │ Dispatcher │────────────────────▶│ Worker×N │───────────▶│ Collector │──▶ ProgressChannel
//! └────────────┘                     └──────────┘            └───────────┘
//!        ▲                                                         ▲
//!        └─────────────────── CancellationToken ───────────────────┘
//! ```
//!
//! A job handed to a worker always runs to completion: there is no forced
//! termination of the archiver process, and no per-job timeout.

pub mod cancel;
pub mod core;
pub mod job;

pub use cancel::CancellationToken;
pub use self::core::{Executor, ExecutorState, RunSummary};
pub use job::JobOutcome;
