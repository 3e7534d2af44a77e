//! Progress reporting from the run thread and workers to one consumer

pub mod channel;
pub mod event;

pub use channel::{ProgressChannel, ProgressReceiver, ProgressSender};
pub use event::{EventClass, LogLevel, ProgressEvent};

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Log lines buffered before new ones are dropped
    pub log_capacity: usize,
    /// Consumer wait per poll while a run is active
    pub running_poll_ms: u64,
    /// Consumer wait per poll once the run is idle
    pub idle_poll_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            log_capacity: 1000,
            running_poll_ms: 50,
            idle_poll_ms: 200,
        }
    }
}

impl ProgressConfig {
    pub fn poll_interval(&self, running: bool) -> Duration {
        if running {
            Duration::from_millis(self.running_poll_ms.max(1))
        } else {
            Duration::from_millis(self.idle_poll_ms.max(1))
        }
    }

    pub fn channel(&self) -> (ProgressSender, ProgressReceiver) {
        ProgressChannel::new(self.log_capacity)
    }
}
