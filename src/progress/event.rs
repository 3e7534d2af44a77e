use crate::schedule::Estimate;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Severity attached to consumer-facing log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    Info,
    Analysis,
    Compress,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Info => "INFO",
            LogLevel::Analysis => "ANALYSIS",
            LogLevel::Compress => "COMPRESS",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        })
    }
}

/// Whether an event may be dropped under pressure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    /// Must be delivered exactly once
    Control,
    /// Best effort, dropped when the log stream is full
    Log,
}

/// Messages from the scheduler and executor to the consumer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProgressEvent {
    StatusChanged(String),
    TotalSet(usize),
    JobCompleted {
        /// Completions accepted so far, including this one
        processed: usize,
        total: usize,
        path: PathBuf,
        success: bool,
        message: String,
        saved_bytes: Option<u64>,
    },
    LogLine {
        level: LogLevel,
        message: String,
    },
    EstimateReady(Estimate),
    Completed {
        processed: usize,
    },
    Stopped {
        processed: usize,
    },
    Failed {
        processed: usize,
        reason: String,
    },
}

impl ProgressEvent {
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        ProgressEvent::LogLine {
            level,
            message: message.into(),
        }
    }

    pub fn class(&self) -> EventClass {
        match self {
            ProgressEvent::LogLine { .. } => EventClass::Log,
            _ => EventClass::Control,
        }
    }

    /// `Completed`, `Stopped` and `Failed` end a run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Completed { .. }
                | ProgressEvent::Stopped { .. }
                | ProgressEvent::Failed { .. }
        )
    }
}
