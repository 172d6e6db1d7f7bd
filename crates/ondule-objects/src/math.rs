//! Arithmetic leaves: constants, gains, products.
//!
//! Parameter changes are spread across the frame with a linear ramp from the
//! previous frame's value, so a jump in `Gain` never clicks. When nothing
//! changes and the input is constant, outputs are flagged constant too.

use std::sync::Arc;

use libm::fabsf;
use ondule_core::{AudioContext, FrameBuffer, Object, ObjectIo, Processor};

/// Differences below this count as "unchanged" between frames.
const EPSILON: f32 = 1e-10;

/// Weight of the new value at sample `i` of an `n`-sample crossfade.
#[inline]
fn ramp_weight(i: usize, n: usize) -> f32 {
    (i + 1) as f32 / n as f32
}

/// Emits its `Value` parameter.
///
/// Values whose magnitude falls below the clamp threshold are emitted as
/// exact zeros.
#[derive(Debug, Clone, Default)]
pub struct Constant {
    previous: f32,
    clamp: f32,
}

impl Constant {
    /// Builds a constant object with outlet `Out` and parameter `Value`.
    pub fn object(ctx: &AudioContext, name: &str) -> Arc<Object> {
        Self::with_clamp(ctx, name, 0.0)
    }

    /// Like [`object`](Self::object), zeroing values below `clamp`.
    pub fn with_clamp(ctx: &AudioContext, name: &str, clamp: f32) -> Arc<Object> {
        Object::builder(name, ctx)
            .outlet("Out")
            .parameter("Value", 0.0)
            .build(Self {
                previous: 0.0,
                clamp,
            })
    }

    /// Clamp threshold given in decibels.
    pub fn clamp_from_db(db: f32) -> f32 {
        libm::powf(10.0, db / 20.0)
    }
}

impl Processor for Constant {
    fn process(&mut self, io: &ObjectIo<'_>) {
        let out = io.outlet(0);
        let value = io.parameter(0).value();
        let n = io.frame_length();
        if fabsf(value) < self.clamp {
            out.buffer().fill(0.0);
            out.set_constant(true);
        } else if fabsf(value - self.previous) < EPSILON {
            out.buffer().fill(value);
            out.set_constant(true);
        } else {
            let buf = out.buffer();
            for i in 0..n {
                let w = ramp_weight(i, n);
                buf.set(i, (1.0 - w) * self.previous + w * value);
            }
            out.set_constant(false);
        }
        self.previous = value;
    }

    fn reset(&mut self) {
        self.previous = 0.0;
    }
}

/// `Out = In × Gain`.
#[derive(Debug, Clone, Default)]
pub struct Gain {
    previous: Option<f32>,
}

impl Gain {
    /// Builds a gain object: inlet `In`, outlet `Out`, parameter `Gain`
    /// (default 1.0).
    pub fn object(ctx: &AudioContext, name: &str) -> Arc<Object> {
        Object::builder(name, ctx)
            .inlet("In")
            .outlet("Out")
            .parameter("Gain", 1.0)
            .build(Self::default())
    }
}

impl Processor for Gain {
    fn process(&mut self, io: &ObjectIo<'_>) {
        let input = io.inlet(0).buffer();
        let out = io.outlet(0);
        let g1 = io.parameter(0).value();
        let g0 = self.previous.unwrap_or(g1);
        write_gain_bias(&input, out.buffer(), (g0, g1), (0.0, 0.0));
        out.set_constant(io.inlet(0).is_constant() && fabsf(g1 - g0) < EPSILON);
        self.previous = Some(g1);
    }

    fn reset(&mut self) {
        self.previous = None;
    }
}

/// `Out = In × Gain + Bias`.
#[derive(Debug, Clone, Default)]
pub struct GainBias {
    previous: Option<(f32, f32)>,
}

impl GainBias {
    /// Builds a gain/bias object: inlet `In`, outlet `Out`, parameters
    /// `Gain` (1.0) and `Bias` (0.0).
    pub fn object(ctx: &AudioContext, name: &str) -> Arc<Object> {
        Object::builder(name, ctx)
            .inlet("In")
            .outlet("Out")
            .parameter("Gain", 1.0)
            .parameter("Bias", 0.0)
            .build(Self::default())
    }
}

impl Processor for GainBias {
    fn process(&mut self, io: &ObjectIo<'_>) {
        let input = io.inlet(0).buffer();
        let out = io.outlet(0);
        let g1 = io.parameter(0).value();
        let b1 = io.parameter(1).value();
        let (g0, b0) = self.previous.unwrap_or((g1, b1));
        write_gain_bias(&input, out.buffer(), (g0, g1), (b0, b1));
        let steady = fabsf(g1 - g0) < EPSILON && fabsf(b1 - b0) < EPSILON;
        out.set_constant(steady && (io.inlet(0).is_constant() || fabsf(g1) < EPSILON));
        self.previous = Some((g1, b1));
    }

    fn reset(&mut self) {
        self.previous = None;
    }
}

fn write_gain_bias(input: &FrameBuffer, out: &FrameBuffer, gain: (f32, f32), bias: (f32, f32)) {
    let n = out.len();
    if fabsf(gain.1 - gain.0) < EPSILON && fabsf(bias.1 - bias.0) < EPSILON {
        for i in 0..n {
            out.set(i, input.get(i) * gain.1 + bias.1);
        }
    } else {
        for i in 0..n {
            let w1 = ramp_weight(i, n);
            let w0 = 1.0 - w1;
            let g = w0 * gain.0 + w1 * gain.1;
            let b = w0 * bias.0 + w1 * bias.1;
            out.set(i, input.get(i) * g + b);
        }
    }
}

/// `Out = Left × Right`, sample by sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct Multiply;

impl Multiply {
    /// Builds a multiplier: inlets `Left` and `Right`, outlet `Out`.
    pub fn object(ctx: &AudioContext, name: &str) -> Arc<Object> {
        Object::builder(name, ctx)
            .inlet("Left")
            .inlet("Right")
            .outlet("Out")
            .build(Self)
    }
}

impl Processor for Multiply {
    fn process(&mut self, io: &ObjectIo<'_>) {
        let a = io.inlet(0).buffer();
        let b = io.inlet(1).buffer();
        let out = io.outlet(0);
        let buf = out.buffer();
        for i in 0..io.frame_length() {
            buf.set(i, a.get(i) * b.get(i));
        }
        out.set_constant(io.inlet(0).is_constant() && io.inlet(1).is_constant());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ondule_core::{Outlet, connect};

    #[test]
    fn constant_ramps_then_holds() {
        let ctx = AudioContext::with_defaults();
        let c = Constant::object(&ctx, "c");
        c.hard_set("Value", 1.0).unwrap();
        c.process();
        let out = c.outlet("Out").unwrap();
        let n = ctx.frame_length();
        assert!(!out.is_constant());
        assert!(out.buffer().get(0) > 0.0 && out.buffer().get(0) < 0.1);
        assert_eq!(out.buffer().get(n - 1), 1.0);

        c.process();
        assert!(out.is_constant());
        assert!(out.buffer().iter().all(|s| s == 1.0));
    }

    #[test]
    fn constant_clamps_small_values() {
        let ctx = AudioContext::with_defaults();
        let c = Constant::with_clamp(&ctx, "c", Constant::clamp_from_db(-60.0));
        c.hard_set("Value", 1e-4).unwrap();
        c.process();
        let out = c.outlet("Out").unwrap();
        assert!(out.is_constant());
        assert!(out.buffer().iter().all(|s| s == 0.0));
    }

    #[test]
    fn gain_scales_sample_for_sample() {
        let ctx = AudioContext::with_defaults();
        let src = Outlet::new(&ctx, "src");
        let values: Vec<f32> = (0..ctx.frame_length()).map(|i| i as f32).collect();
        src.buffer().write_from(&values);

        let gain = Gain::object(&ctx, "gain");
        gain.hard_set("Gain", 0.5).unwrap();
        gain.inlet("In").unwrap().connect(&src);
        gain.process();

        let out = gain.outlet("Out").unwrap().buffer().to_vec();
        let expected: Vec<f32> = values.iter().map(|v| v * 0.5).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn gain_change_is_spread_over_the_frame() {
        let ctx = AudioContext::with_defaults();
        let one = Outlet::constant(&ctx, "one", 1.0);
        let gain = Gain::object(&ctx, "gain");
        gain.inlet("In").unwrap().connect(&one);
        gain.process();
        assert!(gain.outlet("Out").unwrap().is_constant());

        gain.hard_set("Gain", 0.0).unwrap();
        gain.process();
        let out = gain.outlet("Out").unwrap();
        assert!(!out.is_constant());
        let frame = out.buffer().to_vec();
        assert!(frame.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(*frame.last().unwrap(), 0.0);
    }

    #[test]
    fn gain_bias_offsets() {
        let ctx = AudioContext::with_defaults();
        let src = Object::builder("src", &ctx)
            .outlet("Out")
            .build(|io: &ObjectIo<'_>| io.outlet(0).buffer().fill(2.0));
        let gb = GainBias::object(&ctx, "gb");
        gb.hard_set("Gain", 3.0).unwrap();
        gb.hard_set("Bias", -1.0).unwrap();
        connect(&src, "Out", &gb, "In").unwrap();
        src.process();
        gb.process();
        assert!(gb.outlet("Out").unwrap().buffer().iter().all(|s| s == 5.0));
    }

    #[test]
    fn multiply_is_pointwise() {
        let ctx = AudioContext::with_defaults();
        let a = Outlet::constant(&ctx, "a", 3.0);
        let b = Outlet::constant(&ctx, "b", -0.5);
        let m = Multiply::object(&ctx, "m");
        m.inlet("Left").unwrap().connect(&a);
        m.inlet("Right").unwrap().connect(&b);
        m.process();
        let out = m.outlet("Out").unwrap();
        assert!(out.is_constant());
        assert!(out.buffer().iter().all(|s| s == -1.5));
    }
}
