//! Layered configuration
//!
//! Lowest to highest: embedded `default-config.toml`, user config, repository
//! config, `--config FILE`, `BULKPRESS_*` environment, command-line flags.

pub mod core;

pub use self::core::{BulkpressConfig, DEFAULT_CONFIG};

use crate::archiver::ArchiverConfig;
use crate::classify::RuleSet;
use crate::progress::ProgressConfig;
use crate::schedule::SchedulerConfig;
use serde::{Deserialize, Serialize};

/// Every section of the configuration, fully resolved
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rules: RuleSet,
    pub scheduler: SchedulerConfig,
    pub archiver: ArchiverConfig,
    pub progress: ProgressConfig,
}
