//! Typed archiver parameters
//!
//! A [`CompressionParams`] record is never mutated in place: every adjustment
//! (storage tuning, large-file upgrade, memory guard) returns a new record.
//! Flags are only rendered at the edge, by [`CompressionParams::to_flags`].

use serde::{Deserialize, Serialize};
use std::fmt;
use system_profile::StorageClass;

/// Compression level, always within `0..=9`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 9;
    pub const DEFAULT: CompressionLevel = CompressionLevel(5);

    /// Strict constructor, `None` when outside `0..=9`
    pub fn new(level: u8) -> Option<Self> {
        (level <= Self::MAX).then_some(Self(level))
    }

    /// Lenient constructor: out-of-range values fall back to level 5
    pub fn or_default(level: i64) -> Self {
        match u8::try_from(level).ok().and_then(Self::new) {
            Some(level) => level,
            None => {
                tracing::warn!("Compression level {} out of range, using {}", level, Self::DEFAULT);
                Self::DEFAULT
            }
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for CompressionLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("compression level {value} is outside 0..=9"))
    }
}

impl From<CompressionLevel> for u8 {
    fn from(level: CompressionLevel) -> Self {
        level.0
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dictionary size tiers understood by the archiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum DictionarySize {
    Mib16,
    Mib32,
    Mib64,
    Mib128,
}

impl DictionarySize {
    pub fn mib(self) -> u32 {
        match self {
            DictionarySize::Mib16 => 16,
            DictionarySize::Mib32 => 32,
            DictionarySize::Mib64 => 64,
            DictionarySize::Mib128 => 128,
        }
    }

    /// Tier used for inputs above the large-file threshold.
    ///
    /// 16 MiB jumps to 64 MiB and 32 MiB to 128 MiB; the top tiers stay put.
    pub fn upgraded(self) -> Self {
        match self {
            DictionarySize::Mib16 => DictionarySize::Mib64,
            DictionarySize::Mib32 => DictionarySize::Mib128,
            other => other,
        }
    }

    pub fn to_flag(self) -> String {
        format!("-md={}m", self.mib())
    }
}

impl TryFrom<u32> for DictionarySize {
    type Error = String;

    fn try_from(mib: u32) -> Result<Self, Self::Error> {
        match mib {
            16 => Ok(DictionarySize::Mib16),
            32 => Ok(DictionarySize::Mib32),
            64 => Ok(DictionarySize::Mib64),
            128 => Ok(DictionarySize::Mib128),
            other => Err(format!(
                "unsupported dictionary size {other} MiB (expected 16, 32, 64 or 128)"
            )),
        }
    }
}

impl From<DictionarySize> for u32 {
    fn from(size: DictionarySize) -> Self {
        size.mib()
    }
}

/// Static per-level template, as stored in the rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamTemplate {
    pub level: CompressionLevel,
    #[serde(default = "default_multithread")]
    pub multithread: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_bytes: Option<u16>,
    #[serde(default, rename = "dictionary_mib", skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<DictionarySize>,
}

fn default_multithread() -> bool {
    true
}

impl ParamTemplate {
    const fn new(level: u8, fast_bytes: Option<u16>, dictionary: Option<DictionarySize>) -> Self {
        Self {
            level: CompressionLevel(level),
            multithread: true,
            fast_bytes,
            dictionary,
        }
    }

    /// Built-in templates for levels 0 through 9
    pub fn defaults() -> Vec<ParamTemplate> {
        DEFAULT_TEMPLATES.to_vec()
    }

    /// Built-in template for one level
    pub fn builtin(level: CompressionLevel) -> ParamTemplate {
        DEFAULT_TEMPLATES[level.get() as usize]
    }
}

use DictionarySize::{Mib16, Mib32, Mib64, Mib128};

static DEFAULT_TEMPLATES: [ParamTemplate; 10] = [
    ParamTemplate::new(0, None, None),
    ParamTemplate::new(1, Some(32), None),
    ParamTemplate::new(2, Some(32), None),
    ParamTemplate::new(3, Some(32), Some(Mib16)),
    ParamTemplate::new(4, Some(32), Some(Mib16)),
    ParamTemplate::new(5, Some(32), Some(Mib32)),
    ParamTemplate::new(6, Some(64), Some(Mib32)),
    ParamTemplate::new(7, Some(64), Some(Mib64)),
    ParamTemplate::new(8, Some(128), Some(Mib64)),
    ParamTemplate::new(9, Some(273), Some(Mib128)),
];

/// Fully resolved archiver parameters for one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressionParams {
    pub level: CompressionLevel,
    pub multithread: bool,
    pub fast_bytes: Option<u16>,
    pub dictionary: Option<DictionarySize>,
    pub quick_sort: Option<bool>,
    pub solid: Option<bool>,
}

impl From<ParamTemplate> for CompressionParams {
    fn from(template: ParamTemplate) -> Self {
        Self {
            level: template.level,
            multithread: template.multithread,
            fast_bytes: template.fast_bytes,
            dictionary: template.dictionary,
            quick_sort: None,
            solid: None,
        }
    }
}

impl CompressionParams {
    /// Quick-sort and solid mode on for fast media, off for slow media
    pub fn tuned_for(self, storage: StorageClass) -> Self {
        let enabled = storage.is_fast();
        Self {
            quick_sort: Some(enabled),
            solid: Some(enabled),
            ..self
        }
    }

    /// Upgrade the dictionary tier, if the template carries one
    pub fn with_upgraded_dictionary(self) -> Self {
        Self {
            dictionary: self.dictionary.map(DictionarySize::upgraded),
            ..self
        }
    }

    /// Replace whatever dictionary is set with `size`
    pub fn with_dictionary(self, size: DictionarySize) -> Self {
        Self {
            dictionary: Some(size),
            ..self
        }
    }

    /// Render archiver switches in a fixed order
    pub fn to_flags(&self) -> Vec<String> {
        let mut flags = Vec::with_capacity(6);
        flags.push(format!("-mx{}", self.level));
        flags.push(format!("-mmt={}", on_off(self.multithread)));
        if let Some(fb) = self.fast_bytes {
            flags.push(format!("-mfb={fb}"));
        }
        if let Some(dictionary) = self.dictionary {
            flags.push(dictionary.to_flag());
        }
        if let Some(qs) = self.quick_sort {
            flags.push(format!("-mqs={}", on_off(qs)));
        }
        if let Some(solid) = self.solid {
            flags.push(format!("-ms={}", on_off(solid)));
        }
        flags
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}
