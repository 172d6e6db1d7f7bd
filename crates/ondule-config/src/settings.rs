//! Engine and cache settings as they appear in patch files.

use ondule_core::EngineConfig;
use ondule_core::tasks::{DEFAULT_CAPACITY, DEFAULT_WATERMARK};
use serde::{Deserialize, Serialize};

use crate::validation::{ValidationError, ValidationResult};

/// The `[engine]` table of a patch.
///
/// Missing fields take the [`EngineConfig`] defaults.
///
/// ```rust
/// use ondule_config::EngineSettings;
///
/// let settings: EngineSettings = toml::from_str("frame_length = 64").unwrap();
/// assert_eq!(settings.frame_length, 64);
/// assert_eq!(settings.sample_rate, 48000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Samples per frame.
    pub frame_length: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved hardware input channels.
    pub input_channels: usize,
    /// Interleaved hardware output channels.
    pub output_channels: usize,
    /// Default parameter smoothing, in frames.
    pub smoothing_frames: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineConfig::default().into()
    }
}

impl From<EngineConfig> for EngineSettings {
    fn from(config: EngineConfig) -> Self {
        Self {
            frame_length: config.frame_length,
            sample_rate: config.sample_rate,
            input_channels: config.input_channels,
            output_channels: config.output_channels,
            smoothing_frames: config.smoothing_frames,
        }
    }
}

impl From<EngineSettings> for EngineConfig {
    fn from(settings: EngineSettings) -> Self {
        Self {
            frame_length: settings.frame_length,
            sample_rate: settings.sample_rate,
            input_channels: settings.input_channels,
            output_channels: settings.output_channels,
            smoothing_frames: settings.smoothing_frames,
        }
    }
}

impl EngineSettings {
    /// Converts to the runtime configuration.
    pub fn to_config(&self) -> EngineConfig {
        (*self).into()
    }

    /// Checks the settings against what the runtime supports.
    pub fn validate(&self) -> ValidationResult<()> {
        self.to_config()
            .validate()
            .map_err(|e| ValidationError::InvalidEngine(e.to_string()))
    }
}

/// One `[[caches]]` entry: a pool of identical objects.
///
/// `preload` objects are taken from the pool when the patch is instantiated.
/// They are named `<name>0`, `<name>1`, … and can be wired like any other
/// patch object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Cache name; also the prefix of its objects' ids.
    pub name: String,
    /// Registry kind the cache builds.
    pub kind: String,
    /// Objects kept for reuse after release.
    #[serde(default = "default_watermark")]
    pub watermark: usize,
    /// Ceiling on objects alive at once.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Objects taken from the pool at startup.
    #[serde(default)]
    pub preload: usize,
}

fn default_watermark() -> usize {
    DEFAULT_WATERMARK
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl CacheSettings {
    /// Create cache settings with default limits and nothing preloaded.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            watermark: DEFAULT_WATERMARK,
            capacity: DEFAULT_CAPACITY,
            preload: 0,
        }
    }

    /// Builder: set the number of objects taken at startup.
    pub fn with_preload(mut self, preload: usize) -> Self {
        self.preload = preload;
        self
    }

    /// Builder: set the watermark and capacity.
    pub fn with_limits(mut self, watermark: usize, capacity: usize) -> Self {
        self.watermark = watermark;
        self.capacity = capacity;
        self
    }

    /// Ids of the preloaded objects.
    pub fn preloaded_ids(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.preload).map(|n| format!("{}{n}", self.name))
    }
}
