//! Runtime context shared by every object in one engine.
//!
//! [`AudioContext`] replaces process-wide globals: it carries the fixed frame
//! length and sample rate, the shared silent frame that disconnected inlets
//! read from, and the object-id counter. Every port and object is created
//! against a context, and the context lives as long as anything built from it.

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::frame::FrameBuffer;
use crate::object::ObjectId;

/// Default samples per frame.
pub const DEFAULT_FRAME_LENGTH: usize = 128;

/// Largest supported frame length.
pub const MAX_FRAME_LENGTH: usize = 512;

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Sample rates the engine accepts.
pub const SUPPORTED_SAMPLE_RATES: [u32; 2] = [48000, 96000];

/// Default parameter smoothing length in frames.
pub const DEFAULT_SMOOTHING_FRAMES: u32 = 50;

/// Fixed engine settings. Changing any of these means building a new context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Samples per frame.
    pub frame_length: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved hardware input channels.
    pub input_channels: usize,
    /// Interleaved hardware output channels.
    pub output_channels: usize,
    /// Smoothing length given to parameters that don't ask for one.
    pub smoothing_frames: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_length: DEFAULT_FRAME_LENGTH,
            sample_rate: DEFAULT_SAMPLE_RATE,
            input_channels: 2,
            output_channels: 2,
            smoothing_frames: DEFAULT_SMOOTHING_FRAMES,
        }
    }
}

impl EngineConfig {
    /// Checks that every field is in the supported range.
    pub fn validate(&self) -> Result<()> {
        if self.frame_length < 2 || self.frame_length > MAX_FRAME_LENGTH {
            return Err(Error::InvalidConfig(format!(
                "frame length {} outside 2..={MAX_FRAME_LENGTH}",
                self.frame_length
            )));
        }
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(Error::InvalidConfig(format!(
                "sample rate {} Hz not supported",
                self.sample_rate
            )));
        }
        if self.smoothing_frames == 0 {
            return Err(Error::InvalidConfig(
                "smoothing length must be at least one frame".to_string(),
            ));
        }
        Ok(())
    }

    /// Frames per second.
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.frame_length as f32
    }

    /// Duration of one frame in seconds.
    pub fn frame_period(&self) -> f32 {
        self.frame_length as f32 / self.sample_rate as f32
    }
}

/// Shared runtime context.
///
/// Created once per engine and handed to every object builder.
#[derive(Debug)]
pub struct AudioContext {
    config: EngineConfig,
    zero: Arc<FrameBuffer>,
    next_object: AtomicU32,
}

impl AudioContext {
    /// Creates a context after validating `config`.
    pub fn new(config: EngineConfig) -> Result<Arc<Self>> {
        config.validate()?;
        #[cfg(feature = "tracing")]
        tracing::info!(
            frame_length = config.frame_length,
            sample_rate = config.sample_rate,
            "audio context created"
        );
        Ok(Arc::new(Self {
            zero: Arc::new(FrameBuffer::new(config.frame_length)),
            config,
            next_object: AtomicU32::new(0),
        }))
    }

    /// Creates a context with [`EngineConfig::default`].
    pub fn with_defaults() -> Arc<Self> {
        let config = EngineConfig::default();
        Arc::new(Self {
            zero: Arc::new(FrameBuffer::new(config.frame_length)),
            config,
            next_object: AtomicU32::new(0),
        })
    }

    /// Engine settings.
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Samples per frame.
    #[inline]
    pub fn frame_length(&self) -> usize {
        self.config.frame_length
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// The shared silent frame.
    #[inline]
    pub fn zero_frame(&self) -> &Arc<FrameBuffer> {
        &self.zero
    }

    pub(crate) fn next_object_id(&self) -> ObjectId {
        ObjectId(self.next_object.fetch_add(1, Ordering::Relaxed))
    }
}
