//! Split control/log event channel
//!
//! Control events travel over an unbounded queue and are never dropped. Log
//! lines travel over a bounded queue with `try_send`; when it is full the line
//! is discarded and counted. Producers never block.

use crate::progress::event::{EventClass, LogLevel, ProgressEvent};
use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub struct ProgressChannel;

impl ProgressChannel {
    /// Create a connected sender/receiver pair
    pub fn new(log_capacity: usize) -> (ProgressSender, ProgressReceiver) {
        let (control_tx, control_rx) = channel::unbounded();
        let (log_tx, log_rx) = channel::bounded(log_capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));

        (
            ProgressSender {
                control: control_tx,
                log: log_tx,
                dropped: dropped.clone(),
            },
            ProgressReceiver {
                control: control_rx,
                log: log_rx,
                pending: VecDeque::new(),
                dropped,
                control_closed: false,
                log_closed: false,
                finished: false,
            },
        )
    }
}

/// Producer handle, cheap to clone into worker threads
#[derive(Clone)]
pub struct ProgressSender {
    control: Sender<ProgressEvent>,
    log: Sender<ProgressEvent>,
    dropped: Arc<AtomicU64>,
}

impl ProgressSender {
    /// Send without blocking. Returns whether the event was queued.
    pub fn send(&self, event: ProgressEvent) -> bool {
        match event.class() {
            EventClass::Control => match self.control.send(event) {
                Ok(()) => true,
                Err(_) => {
                    tracing::trace!("Progress receiver dropped, control event discarded");
                    false
                }
            },
            EventClass::Log => match self.log.try_send(event) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    false
                }
                Err(TrySendError::Disconnected(_)) => false,
            },
        }
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> bool {
        self.send(ProgressEvent::log(level, message))
    }

    pub fn status(&self, status: impl Into<String>) -> bool {
        self.send(ProgressEvent::StatusChanged(status.into()))
    }

    /// Log lines discarded so far because the log stream was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

enum Woken {
    Log(Option<ProgressEvent>),
    Control(Option<ProgressEvent>),
    Timeout,
}

/// Single consumer handle
pub struct ProgressReceiver {
    control: Receiver<ProgressEvent>,
    log: Receiver<ProgressEvent>,
    pending: VecDeque<ProgressEvent>,
    dropped: Arc<AtomicU64>,
    control_closed: bool,
    log_closed: bool,
    finished: bool,
}

impl ProgressReceiver {
    /// Next queued event, without waiting
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(self.deliver(event));
        }

        if let Some(event) = self.poll_log() {
            return Some(self.deliver(event));
        }

        match self.control.try_recv() {
            Ok(event) => Some(self.admit_control(event)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.control_closed = true;
                None
            }
        }
    }

    /// Next event, waiting at most `timeout`
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<ProgressEvent> {
        if let Some(event) = self.try_recv() {
            return Some(event);
        }

        match (self.control_closed, self.log_closed) {
            (true, true) => None,
            (true, false) => {
                let event = self.log.recv_timeout(timeout).ok()?;
                Some(self.deliver(event))
            }
            (false, true) => {
                let event = self.control.recv_timeout(timeout).ok()?;
                Some(self.admit_control(event))
            }
            (false, false) => {
                let woken = crossbeam::select! {
                    recv(self.log) -> msg => Woken::Log(msg.ok()),
                    recv(self.control) -> msg => Woken::Control(msg.ok()),
                    default(timeout) => Woken::Timeout,
                };

                match woken {
                    Woken::Log(Some(event)) => Some(self.deliver(event)),
                    Woken::Log(None) => {
                        self.log_closed = true;
                        None
                    }
                    Woken::Control(Some(event)) => Some(self.admit_control(event)),
                    Woken::Control(None) => {
                        self.control_closed = true;
                        None
                    }
                    Woken::Timeout => None,
                }
            }
        }
    }

    /// Whether a terminal event has been delivered
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether every producer is gone and nothing is left to read
    pub fn is_exhausted(&self) -> bool {
        self.control_closed && self.log_closed && self.pending.is_empty()
    }

    /// Log lines discarded so far because the log stream was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn poll_log(&mut self) -> Option<ProgressEvent> {
        match self.log.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.log_closed = true;
                None
            }
        }
    }

    /// A terminal control event is held back until every queued log line
    /// has been handed out, so it is always the last event of a run.
    fn admit_control(&mut self, event: ProgressEvent) -> ProgressEvent {
        if !event.is_terminal() {
            return self.deliver(event);
        }

        while let Some(line) = self.poll_log() {
            self.pending.push_back(line);
        }

        match self.pending.pop_front() {
            Some(line) => {
                self.pending.push_back(event);
                self.deliver(line)
            }
            None => self.deliver(event),
        }
    }

    fn deliver(&mut self, event: ProgressEvent) -> ProgressEvent {
        if event.is_terminal() {
            self.finished = true;
        }
        event
    }
}
