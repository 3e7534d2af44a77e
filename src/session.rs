//! Caller-facing run handle
//!
//! [`Session::start`] returns immediately; the walk, planning and compression
//! happen on a dedicated run thread. The caller reads events with
//! [`Session::try_next`], [`Session::next_timeout`] or [`Session::drain`] and
//! may [`Session::cancel`] at any time.

use crate::archiver::{ArchiveRunner, SevenZip};
use crate::config::Settings;
use crate::parallel::{CancellationToken, Executor, RunSummary};
use crate::progress::{LogLevel, ProgressConfig, ProgressEvent, ProgressReceiver, ProgressSender};
use crate::schedule::{CompressionLevel, Scheduler};
use crate::walk;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use system_profile::SystemProfile;
use uuid::Uuid;

/// Extensions listed in the pre-run breakdown
const BREAKDOWN_LIMIT: usize = 10;

#[derive(Clone, Default)]
pub struct SessionOptions {
    pub settings: Settings,
    /// Archiver to use; located from `settings.archiver` when unset
    pub runner: Option<Arc<dyn ArchiveRunner>>,
    /// Host profile; detected against the root when unset
    pub profile: Option<Arc<SystemProfile>>,
}

pub struct Session {
    run_id: Uuid,
    token: CancellationToken,
    receiver: ProgressReceiver,
    handle: Option<JoinHandle<RunSummary>>,
    poll: ProgressConfig,
    running: bool,
}

impl Session {
    /// Begin compressing everything eligible under `root`
    pub fn start(
        root: impl Into<PathBuf>,
        level: CompressionLevel,
        options: SessionOptions,
    ) -> Self {
        let root = root.into();
        let run_id = Uuid::new_v4();
        let token = CancellationToken::new();
        let poll = options.settings.progress.clone();
        let (tx, receiver) = poll.channel();

        let run_token = token.clone();
        let handle = std::thread::Builder::new()
            .name(format!("bulkpress-run-{}", &run_id.simple().to_string()[..8]))
            .spawn(move || run(&root, level, options, tx, run_token, run_id));

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Failed to spawn run thread: {}", e);
                None
            }
        };

        Self {
            run_id,
            token,
            receiver,
            handle,
            poll,
            running: false,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Request a cooperative stop. In-flight files still finish.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Handle for cancelling from another thread or a signal handler
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn try_next(&mut self) -> Option<ProgressEvent> {
        let event = self.receiver.try_recv();
        self.observe(event.as_ref());
        event
    }

    pub fn next_timeout(&mut self, timeout: Duration) -> Option<ProgressEvent> {
        let event = self.receiver.recv_timeout(timeout);
        self.observe(event.as_ref());
        event
    }

    /// Whether the terminal event has been read
    pub fn is_finished(&self) -> bool {
        self.receiver.is_finished()
    }

    /// Feed every event to `handler` until the terminal one, then join the
    /// run thread.
    ///
    /// Waits 50 ms per poll while jobs are running and 200 ms otherwise
    /// (both configurable under `[progress]`).
    pub fn drain<F>(mut self, mut handler: F) -> RunSummary
    where
        F: FnMut(&ProgressEvent),
    {
        while !self.receiver.is_finished() {
            let wait = self.poll.poll_interval(self.running);
            match self.next_timeout(wait) {
                Some(event) => handler(&event),
                None if self.receiver.is_exhausted() => break,
                None => {}
            }
        }
        self.join()
    }

    /// Drain, discarding events
    pub fn wait(self) -> RunSummary {
        self.drain(|_| {})
    }

    fn observe(&mut self, event: Option<&ProgressEvent>) {
        match event {
            Some(ProgressEvent::TotalSet(total)) => self.running = *total > 0,
            Some(e) if e.is_terminal() => self.running = false,
            _ => {}
        }
    }

    fn join(mut self) -> RunSummary {
        let Some(handle) = self.handle.take() else {
            return RunSummary::failed(self.run_id, "run thread could not be started");
        };

        match handle.join() {
            Ok(mut summary) => {
                summary.dropped_log_lines = self.receiver.dropped();
                summary
            }
            Err(_) => {
                tracing::error!("Run thread panicked");
                RunSummary::failed(self.run_id, "run thread panicked")
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // An abandoned session stops dispatching new files
        if self.handle.is_some() && !self.receiver.is_finished() {
            self.token.cancel();
        }
    }
}

fn run(
    root: &Path,
    level: CompressionLevel,
    options: SessionOptions,
    tx: ProgressSender,
    token: CancellationToken,
    run_id: Uuid,
) -> RunSummary {
    let span = tracing::info_span!("run", id = %run_id);
    let _enter = span.enter();

    let SessionOptions {
        settings,
        runner,
        profile,
    } = options;

    tx.status("Scanning");
    tx.log(LogLevel::Info, format!("Target: {}", root.display()));
    tx.log(LogLevel::Info, format!("Compression level: {level}"));

    if let Err(error) = walk::validate_root(root) {
        return Executor::report_failure(&tx, run_id, &error);
    }

    let runner: Arc<dyn ArchiveRunner> = match runner {
        Some(runner) => runner,
        None => match SevenZip::from_config(&settings.archiver) {
            Ok(seven_zip) => Arc::new(seven_zip),
            Err(error) => return Executor::report_failure(&tx, run_id, &error),
        },
    };
    tx.log(
        LogLevel::Info,
        format!("Archiver: {}", runner.program().display()),
    );

    let profile = profile.unwrap_or_else(|| Arc::new(SystemProfile::detect_in(root)));
    tx.log(
        LogLevel::Info,
        format!(
            "System: {} storage, {} cores, {:.1} GB available",
            profile.storage_class,
            profile.cpu_count,
            profile.available_memory_gb()
        ),
    );

    let mut executor =
        Executor::new(runner, settings.archiver.clone(), tx.clone()).with_run_id(run_id);
    let scheduler = Scheduler::new(&settings.rules, settings.scheduler.clone());

    let report = match walk::walk(root, scheduler.classifier(), &token, &tx) {
        Ok(report) => report,
        Err(error) => return executor.fail(&error),
    };

    tx.status("Planning");
    let plan = scheduler.plan(report.files, level, &profile);

    if plan.is_empty() {
        tx.log(LogLevel::Warning, "No eligible files found");
    } else {
        tx.log(
            LogLevel::Analysis,
            format!("{} eligible files, {} excluded", plan.jobs.len(), plan.excluded),
        );
        tx.log(LogLevel::Analysis, "File types:");
        for (ext, count) in plan.extension_breakdown(BREAKDOWN_LIMIT) {
            tx.log(LogLevel::Analysis, format!("  {ext}: {count} files"));
        }
        tx.log(
            LogLevel::Analysis,
            format!(
                "Estimated {:.1} MiB in about {:.1} min on {} workers (rough guide only)",
                plan.estimate.total_size_mib(),
                plan.estimate.estimated_minutes(),
                plan.workers
            ),
        );
    }
    tx.send(ProgressEvent::EstimateReady(plan.estimate));

    // The executor has already emitted `Failed` for any error it returns
    executor
        .start(plan.jobs, plan.workers, &token)
        .unwrap_or_else(|error| RunSummary::failed(run_id, error.to_string()))
}
