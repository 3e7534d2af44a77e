use crate::archiver::{ArchiveRunner, ArchiverConfig};
use crate::error::{CompressError, CompressResult};
use crate::parallel::cancel::CancellationToken;
use crate::parallel::job::{JobOutcome, run_job};
use crate::progress::{LogLevel, ProgressEvent, ProgressSender};
use crate::schedule::Job;
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// How often a dispatcher waiting for an idle worker re-checks cancellation
const DISPATCH_POLL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    Running,
    Completed,
    Stopped,
    Failed,
}

impl ExecutorState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutorState::Completed | ExecutorState::Stopped | ExecutorState::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutorState::Idle => "idle",
            ExecutorState::Running => "running",
            ExecutorState::Completed => "completed",
            ExecutorState::Stopped => "stopped",
            ExecutorState::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate result of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub state: ExecutorState,
    pub total: usize,
    /// Jobs handed to a worker
    pub dispatched: usize,
    /// Completions collected, successful or not
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Jobs never dispatched because of cancellation
    pub skipped: usize,
    pub saved_bytes: u64,
    pub dropped_log_lines: u64,
    pub elapsed: Duration,
    /// Set when the run failed a precondition
    pub failure: Option<String>,
}

impl RunSummary {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            state: ExecutorState::Idle,
            total: 0,
            dispatched: 0,
            processed: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            saved_bytes: 0,
            dropped_log_lines: 0,
            elapsed: Duration::ZERO,
            failure: None,
        }
    }

    pub fn failed(run_id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            state: ExecutorState::Failed,
            failure: Some(reason.into()),
            ..Self::new(run_id)
        }
    }
}

/// Context for worker threads to avoid too many function parameters
struct WorkerContext<'a> {
    worker_id: usize,
    ready_tx: Sender<usize>,
    work_rx: Receiver<Job>,
    result_tx: Sender<JobOutcome>,
    runner: &'a dyn ArchiveRunner,
    config: &'a ArchiverConfig,
    progress: ProgressSender,
}

/// Drives one batch of jobs through a bounded worker pool.
///
/// `Idle -> Running -> {Completed, Stopped, Failed}`. Terminal states stay
/// put until [`Executor::reset`].
pub struct Executor {
    runner: Arc<dyn ArchiveRunner>,
    config: ArchiverConfig,
    progress: ProgressSender,
    state: ExecutorState,
    run_id: Uuid,
}

impl Executor {
    pub fn new(
        runner: Arc<dyn ArchiveRunner>,
        config: ArchiverConfig,
        progress: ProgressSender,
    ) -> Self {
        Self {
            runner,
            config,
            progress,
            state: ExecutorState::Idle,
            run_id: Uuid::new_v4(),
        }
    }

    /// Tag summaries with an externally chosen run id
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Back to `Idle` after a terminal state, with a fresh run id
    pub fn reset(&mut self) {
        if self.state.is_terminal() {
            self.state = ExecutorState::Idle;
            self.run_id = Uuid::new_v4();
        }
    }

    /// End an idle run before it starts, emitting `Failed`
    pub fn fail(&mut self, error: &CompressError) -> RunSummary {
        self.state = ExecutorState::Failed;
        Self::report_failure(&self.progress, self.run_id, error)
    }

    /// Emit the `Failed` terminal event for a run that never got an executor
    pub fn report_failure(
        progress: &ProgressSender,
        run_id: Uuid,
        error: &CompressError,
    ) -> RunSummary {
        let reason = error.to_string();
        tracing::error!("Run failed: {}", reason);

        progress.log(LogLevel::Error, reason.clone());
        progress.status("Failed");
        progress.send(ProgressEvent::Failed {
            processed: 0,
            reason: reason.clone(),
        });

        RunSummary {
            dropped_log_lines: progress.dropped(),
            ..RunSummary::failed(run_id, reason)
        }
    }

    /// Run `jobs` on `worker_count` workers until done or cancelled.
    ///
    /// Returns once every worker has been joined; the terminal event has been
    /// sent by then.
    pub fn start(
        &mut self,
        jobs: Vec<Job>,
        worker_count: usize,
        token: &CancellationToken,
    ) -> CompressResult<RunSummary> {
        if self.state != ExecutorState::Idle {
            return Err(CompressError::ExecutorNotIdle {
                state: self.state.as_str(),
            });
        }
        if worker_count == 0 {
            self.fail(&CompressError::InvalidWorkerCount);
            return Err(CompressError::InvalidWorkerCount);
        }

        let started = Instant::now();
        let total = jobs.len();
        self.state = ExecutorState::Running;
        self.progress.send(ProgressEvent::TotalSet(total));

        let mut summary = RunSummary {
            total,
            ..RunSummary::new(self.run_id)
        };

        if jobs.is_empty() {
            tracing::info!("No eligible files, nothing to compress");
            self.progress.log(LogLevel::Info, "No files to compress");
            return Ok(self.finish(summary, false, started));
        }

        let workers = worker_count.min(total);
        tracing::info!("Compressing {} files with {} workers", total, workers);
        self.progress.status("Compressing");

        match self.run_pool(jobs, workers, token, &mut summary) {
            Ok(cancelled) => Ok(self.finish(summary, cancelled, started)),
            Err(error) => {
                tracing::error!("Worker pool aborted: {}", error);
                self.state = ExecutorState::Failed;
                self.progress.send(ProgressEvent::Failed {
                    processed: summary.processed,
                    reason: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// Returns whether cancellation was observed
    fn run_pool(
        &self,
        jobs: Vec<Job>,
        workers: usize,
        token: &CancellationToken,
        summary: &mut RunSummary,
    ) -> CompressResult<bool> {
        // Workers announce themselves on `ready`; each gets its own one-slot job queue
        let (ready_tx, ready_rx): (Sender<usize>, Receiver<usize>) = bounded(workers);
        let (result_tx, result_rx): (Sender<JobOutcome>, Receiver<JobOutcome>) =
            bounded(workers * 2);
        let (work_txs, work_rxs): (Vec<Sender<Job>>, Vec<Receiver<Job>>) =
            (0..workers).map(|_| bounded(1)).unzip();

        let runner: &dyn ArchiveRunner = self.runner.as_ref();
        let config = &self.config;

        let scoped = crossbeam::thread::scope(|s| {
            for (worker_id, work_rx) in work_rxs.into_iter().enumerate() {
                let ctx = WorkerContext {
                    worker_id,
                    ready_tx: ready_tx.clone(),
                    work_rx,
                    result_tx: result_tx.clone(),
                    runner,
                    config,
                    progress: self.progress.clone(),
                };
                s.spawn(move |_| worker_thread(ctx));
            }

            // Dispatcher owns every job sender; workers exit once they are dropped
            let dispatcher = s.spawn(move |_| dispatch(jobs, ready_rx, work_txs, token));

            // Workers hold the remaining ready and result senders
            drop(ready_tx);
            drop(result_tx);

            let collector_cancelled = self.collect(result_rx, token, summary);
            let dispatch = dispatcher.join();
            (dispatch, collector_cancelled)
        });

        let (dispatch, collector_cancelled) = match scoped {
            Ok((Ok(dispatch), collector_cancelled)) => (dispatch, collector_cancelled),
            _ => {
                return Err(CompressError::WorkerPanic {
                    path: "<worker pool>".into(),
                });
            }
        };

        summary.dispatched = dispatch.dispatched;
        summary.skipped = summary.total - dispatch.dispatched;
        Ok(dispatch.cancelled || collector_cancelled)
    }

    /// Accepts outcomes until every worker is gone. Returns whether the token
    /// was seen set; outcomes of dispatched jobs are reported either way.
    fn collect(
        &self,
        result_rx: Receiver<JobOutcome>,
        token: &CancellationToken,
        summary: &mut RunSummary,
    ) -> bool {
        let mut cancelled = false;

        while let Ok(outcome) = result_rx.recv() {
            if !cancelled && token.is_cancelled() {
                cancelled = true;
                tracing::info!("Stop requested, waiting for in-flight jobs");
                self.progress.status("Stopping");
                self.progress
                    .log(LogLevel::Warning, "Stopping after in-flight files finish");
            }

            summary.processed += 1;
            if outcome.success {
                summary.succeeded += 1;
                summary.saved_bytes += outcome.saved_bytes.unwrap_or(0);
                self.progress.log(LogLevel::Success, outcome.message.clone());
            } else {
                summary.failed += 1;
                match &outcome.error {
                    Some(error) => tracing::warn!("{}", error),
                    None => tracing::warn!("{}", outcome.message),
                }
                self.progress.log(LogLevel::Error, outcome.message.clone());
            }

            self.progress.send(ProgressEvent::JobCompleted {
                processed: summary.processed,
                total: summary.total,
                path: outcome.job.descriptor.path,
                success: outcome.success,
                message: outcome.message,
                saved_bytes: outcome.saved_bytes,
            });
        }

        cancelled
    }

    fn finish(&mut self, mut summary: RunSummary, cancelled: bool, started: Instant) -> RunSummary {
        summary.elapsed = started.elapsed();
        summary.dropped_log_lines = self.progress.dropped();

        let processed = summary.processed;
        if cancelled {
            self.state = ExecutorState::Stopped;
            tracing::info!(
                "Stopped after {} of {} files ({} skipped)",
                processed,
                summary.total,
                summary.skipped
            );
            self.progress.status("Stopped");
            self.progress.send(ProgressEvent::Stopped { processed });
        } else {
            self.state = ExecutorState::Completed;
            tracing::info!(
                "Completed {} files ({} failed) in {:.1?}",
                processed,
                summary.failed,
                summary.elapsed
            );
            self.progress.status("Completed");
            self.progress.send(ProgressEvent::Completed { processed });
        }

        summary.state = self.state;
        summary
    }
}

struct Dispatch {
    dispatched: usize,
    cancelled: bool,
}

/// Hands jobs to idle workers one at a time.
///
/// The token is checked after a worker has reported ready and before the job
/// is committed to it, so no job starts once the token is seen set.
fn dispatch(
    jobs: Vec<Job>,
    ready_rx: Receiver<usize>,
    work_txs: Vec<Sender<Job>>,
    token: &CancellationToken,
) -> Dispatch {
    let mut dispatched = 0;
    let mut jobs = jobs.into_iter().peekable();

    while jobs.peek().is_some() {
        let worker_id = match ready_rx.recv_timeout(DISPATCH_POLL) {
            Ok(worker_id) => worker_id,
            Err(RecvTimeoutError::Timeout) => {
                if token.is_cancelled() {
                    return Dispatch {
                        dispatched,
                        cancelled: true,
                    };
                }
                continue;
            }
            // Every worker is gone
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if token.is_cancelled() {
            return Dispatch {
                dispatched,
                cancelled: true,
            };
        }

        let Some(work_tx) = work_txs.get(worker_id) else {
            continue;
        };
        let Some(job) = jobs.next() else { break };
        // The slot is empty: a worker only reports ready after taking its last job
        match work_tx.try_send(job) {
            Ok(()) => dispatched += 1,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                tracing::warn!("Worker {} stopped accepting jobs", worker_id);
                break;
            }
        }
    }

    Dispatch {
        dispatched,
        cancelled: false,
    }
}

fn worker_thread(ctx: WorkerContext<'_>) {
    loop {
        if ctx.ready_tx.send(ctx.worker_id).is_err() {
            break; // Dispatcher finished
        }
        let Ok(job) = ctx.work_rx.recv() else {
            break;
        };

        ctx.progress.log(
            LogLevel::Compress,
            format!("Compressing: {}", job.descriptor.file_name()),
        );
        tracing::trace!("Worker {} took {}", ctx.worker_id, job.descriptor.path.display());

        let outcome = run_job(job, ctx.runner, ctx.config);

        if ctx.result_tx.send(outcome).is_err() {
            break; // Collector gone
        }
    }
}
