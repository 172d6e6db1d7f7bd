//! Signal sources.

use core::f32::consts::TAU;
use std::sync::Arc;

use libm::sinf;
use ondule_core::{AudioContext, Object, ObjectIo, Processor};

/// Sine oscillator.
///
/// ## Parameters
///
/// | Index | Name | Default |
/// |-------|------|---------|
/// | 0 | Frequency | 440 Hz |
/// | 1 | Level | 1.0 |
#[derive(Debug, Clone)]
pub struct SineSource {
    phase: f32,
    sample_period: f32,
}

impl SineSource {
    /// Builds a sine source object with one outlet, `Out`.
    pub fn object(ctx: &AudioContext, name: &str) -> Arc<Object> {
        Object::builder(name, ctx)
            .outlet("Out")
            .parameter("Frequency", 440.0)
            .parameter("Level", 1.0)
            .build(Self {
                phase: 0.0,
                sample_period: 1.0 / ctx.sample_rate() as f32,
            })
    }
}

impl Processor for SineSource {
    fn process(&mut self, io: &ObjectIo<'_>) {
        let out = io.outlet(0).buffer();
        let increment = io.parameter(0).value() * self.sample_period;
        let level = io.parameter(1).value();
        for i in 0..io.frame_length() {
            out.set(i, level * sinf(TAU * self.phase));
            self.phase += increment;
            self.phase -= libm::floorf(self.phase);
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Counting source: emits `0, s, 2s, …` across frames, where `s` is `Step`.
///
/// Handy as a test signal since every sample is distinct and predictable.
#[derive(Debug, Clone, Default)]
pub struct RampSource {
    next: f32,
}

impl RampSource {
    /// Builds a ramp source object with one outlet, `Out`, and a `Step`
    /// parameter (default 1.0, no smoothing).
    pub fn object(ctx: &AudioContext, name: &str) -> Arc<Object> {
        Object::builder(name, ctx)
            .outlet("Out")
            .smoothed_parameter("Step", 1.0, 1)
            .build(Self::default())
    }
}

impl Processor for RampSource {
    fn process(&mut self, io: &ObjectIo<'_>) {
        let out = io.outlet(0).buffer();
        let step = io.parameter(0).value();
        for i in 0..io.frame_length() {
            out.set(i, self.next);
            self.next += step;
        }
    }

    fn reset(&mut self) {
        self.next = 0.0;
    }
}
