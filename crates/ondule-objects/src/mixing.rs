//! Mixing leaves.

use std::sync::Arc;

use ondule_core::{AudioContext, Object, ObjectIo, Processor};

/// Sums `In1 … InN` into `Out`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mixer;

impl Mixer {
    /// Default number of inputs when built from the registry.
    pub const DEFAULT_INPUTS: usize = 4;

    /// Builds a mixer with [`DEFAULT_INPUTS`](Self::DEFAULT_INPUTS) inputs.
    pub fn object(ctx: &AudioContext, name: &str) -> Arc<Object> {
        Self::with_inputs(ctx, name, Self::DEFAULT_INPUTS)
    }

    /// Builds a mixer with `inputs` inlets named `In1`, `In2`, …
    pub fn with_inputs(ctx: &AudioContext, name: &str, inputs: usize) -> Arc<Object> {
        (1..=inputs)
            .fold(Object::builder(name, ctx), |b, n| b.inlet(format!("In{n}")))
            .outlet("Out")
            .build(Self)
    }
}

impl Processor for Mixer {
    fn process(&mut self, io: &ObjectIo<'_>) {
        let out = io.outlet(0);
        let buf = out.buffer();
        buf.fill(0.0);
        let mut constant = true;
        for inlet in io.inlets() {
            if !inlet.is_connected() {
                continue;
            }
            constant &= inlet.is_constant();
            let src = inlet.buffer();
            for i in 0..io.frame_length() {
                buf.set(i, buf.get(i) + src.get(i));
            }
        }
        out.set_constant(constant);
    }
}

/// Pans a stereo pair with a per-sample `Pan` signal.
///
/// `Pan` runs from −1 (right side attenuated to silence) through 0 (unity)
/// to +1 (left side attenuated to silence). Only the far side is turned
/// down; the near side stays at unity.
#[derive(Debug, Clone, Copy, Default)]
pub struct StereoPanner;

/// Pan values closer to zero than this are treated as center.
const CENTER: f32 = 1e-5;

impl StereoPanner {
    /// Builds a panner: inlets `Left`, `Right`, `Pan`; outlets `Left`,
    /// `Right`.
    pub fn object(ctx: &AudioContext, name: &str) -> Arc<Object> {
        Object::builder(name, ctx)
            .inlet("Left")
            .inlet("Right")
            .inlet("Pan")
            .outlet("Left")
            .outlet("Right")
            .build(Self)
    }
}

impl Processor for StereoPanner {
    fn process(&mut self, io: &ObjectIo<'_>) {
        let left_in = io.inlet(0).buffer();
        let right_in = io.inlet(1).buffer();
        let pan = io.inlet(2).buffer();
        let left_out = io.outlet(0).buffer();
        let right_out = io.outlet(1).buffer();
        for i in 0..io.frame_length() {
            let p = pan.get(i);
            let (l, r) = if p < -CENTER {
                (1.0, 1.0 + p)
            } else if p > CENTER {
                (1.0 - p, 1.0)
            } else {
                (1.0, 1.0)
            };
            left_out.set(i, left_in.get(i) * l);
            right_out.set(i, right_in.get(i) * r);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ondule_core::Outlet;

    #[test]
    fn mixer_sums_connected_inputs() {
        let ctx = AudioContext::with_defaults();
        let mixer = Mixer::with_inputs(&ctx, "mix", 3);
        assert_eq!(mixer.inlet_count(), 3);
        let a = Outlet::constant(&ctx, "a", 0.25);
        let b = Outlet::constant(&ctx, "b", 0.5);
        mixer.inlet("In1").unwrap().connect(&a);
        mixer.inlet("In3").unwrap().connect(&b);
        mixer.process();
        let out = mixer.outlet("Out").unwrap();
        assert!(out.buffer().iter().all(|s| s == 0.75));
        assert!(out.is_constant());
    }

    #[test]
    fn panner_attenuates_far_side_only() {
        let ctx = AudioContext::with_defaults();
        let panner = StereoPanner::object(&ctx, "pan");
        let one = Outlet::constant(&ctx, "one", 1.0);
        let pan = Outlet::constant(&ctx, "pan", 0.25);
        panner.inlet("Left").unwrap().connect(&one);
        panner.inlet("Right").unwrap().connect(&one);
        panner.inlet("Pan").unwrap().connect(&pan);

        panner.process();
        assert_eq!(panner.outlet("Left").unwrap().buffer().get(0), 0.75);
        assert_eq!(panner.outlet("Right").unwrap().buffer().get(0), 1.0);

        pan.buffer().fill(-1.0);
        panner.process();
        assert_eq!(panner.outlet("Left").unwrap().buffer().get(0), 1.0);
        assert_eq!(panner.outlet("Right").unwrap().buffer().get(0), 0.0);
    }

    #[test]
    fn centered_pan_is_unity() {
        let ctx = AudioContext::with_defaults();
        let panner = StereoPanner::object(&ctx, "pan");
        let half = Outlet::constant(&ctx, "half", 0.5);
        panner.inlet("Left").unwrap().connect(&half);
        panner.process();
        assert_eq!(panner.outlet("Left").unwrap().buffer().get(0), 0.5);
        assert_eq!(panner.outlet("Right").unwrap().buffer().get(0), 0.0);
    }
}
