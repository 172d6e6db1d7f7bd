//! Hardware frame pumps.
//!
//! The audio driver hands the scheduler interleaved sample frames.
//! [`InputTask`] splits the input frame into one outlet per channel at the
//! start of every frame; [`OutputTask`] gathers one inlet per channel into
//! the output frame near the end.

use std::sync::Arc;

use super::{FrameIo, Task, priority};
use crate::context::AudioContext;
use crate::frame::FrameBuffer;
use crate::port::{Inlet, Outlet};

/// De-interleaves the hardware input into per-channel outlets.
pub struct InputTask {
    outlets: Vec<Arc<Outlet>>,
    frame_length: usize,
    last: FrameBuffer,
}

impl InputTask {
    /// Creates one outlet per configured input channel, named `In1`, `In2`, …
    pub fn new(ctx: &AudioContext) -> Self {
        let channels = ctx.config().input_channels;
        Self {
            outlets: (1..=channels)
                .map(|n| Outlet::new(ctx, format!("In{n}")))
                .collect(),
            frame_length: ctx.frame_length(),
            last: FrameBuffer::new(channels),
        }
    }

    /// Outlet for input channel `channel`.
    pub fn outlet(&self, channel: usize) -> Option<&Arc<Outlet>> {
        self.outlets.get(channel)
    }

    /// Number of input channels.
    pub fn channel_count(&self) -> usize {
        self.outlets.len()
    }

    /// Last sample of the previous frame on `channel`, for metering.
    pub fn last_input(&self, channel: usize) -> f32 {
        if channel < self.last.len() {
            self.last.get(channel)
        } else {
            0.0
        }
    }
}

impl Task for InputTask {
    fn name(&self) -> &str {
        "InputTask"
    }

    fn priority(&self) -> i32 {
        priority::INPUT
    }

    fn process(&self, io: &mut FrameIo<'_>) {
        let channels = self.outlets.len();
        if channels == 0 {
            return;
        }
        let frames = io.input().chunks_exact(channels).take(self.frame_length);
        if let Some(last) = frames.clone().last() {
            self.last.write_from(last);
        }
        for (ch, outlet) in self.outlets.iter().enumerate() {
            if !outlet.is_connected() {
                continue;
            }
            let dst = outlet.buffer();
            for (i, frame) in frames.clone().enumerate() {
                dst.set(i, frame[ch]);
            }
        }
    }
}

/// Interleaves per-channel inlets into the hardware output.
///
/// Disconnected channels are written as silence. Each channel is mirrored
/// onto a monitor outlet so scopes and meters can tap the final mix.
pub struct OutputTask {
    inlets: Vec<Arc<Inlet>>,
    monitors: Vec<Arc<Outlet>>,
    frame_length: usize,
}

impl OutputTask {
    /// Creates one inlet (`Out1`, …) and one monitor outlet (`Monitor1`, …)
    /// per configured output channel.
    pub fn new(ctx: &AudioContext) -> Self {
        let channels = ctx.config().output_channels;
        Self {
            inlets: (1..=channels)
                .map(|n| Inlet::new(ctx, format!("Out{n}")))
                .collect(),
            monitors: (1..=channels)
                .map(|n| Outlet::new(ctx, format!("Monitor{n}")))
                .collect(),
            frame_length: ctx.frame_length(),
        }
    }

    /// Inlet for output channel `channel`.
    pub fn inlet(&self, channel: usize) -> Option<&Arc<Inlet>> {
        self.inlets.get(channel)
    }

    /// Monitor outlet for output channel `channel`.
    pub fn monitor(&self, channel: usize) -> Option<&Arc<Outlet>> {
        self.monitors.get(channel)
    }

    /// Number of output channels.
    pub fn channel_count(&self) -> usize {
        self.inlets.len()
    }
}

impl Task for OutputTask {
    fn name(&self) -> &str {
        "OutputTask"
    }

    fn priority(&self) -> i32 {
        priority::OUTPUT
    }

    fn process(&self, io: &mut FrameIo<'_>) {
        let channels = self.inlets.len();
        if channels == 0 {
            return;
        }
        let frame_length = self.frame_length;
        for (ch, (inlet, monitor)) in self.inlets.iter().zip(&self.monitors).enumerate() {
            let frames = io.output().chunks_exact_mut(channels).take(frame_length);
            if inlet.is_connected() {
                let src = inlet.buffer();
                for (i, frame) in frames.enumerate() {
                    frame[ch] = src.get(i);
                }
                if monitor.is_connected() {
                    monitor.buffer().copy_from(&src);
                }
            } else {
                for frame in frames {
                    frame[ch] = 0.0;
                }
                monitor.buffer().fill(0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EngineConfig;

    fn small_ctx() -> Arc<AudioContext> {
        AudioContext::new(EngineConfig {
            frame_length: 4,
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn input_deinterleaves_connected_channels() {
        let ctx = small_ctx();
        let task = InputTask::new(&ctx);
        let left = Inlet::new(&ctx, "L");
        let right = Inlet::new(&ctx, "R");
        left.connect(task.outlet(0).unwrap());
        right.connect(task.outlet(1).unwrap());

        let input = [1.0, -1.0, 2.0, -2.0, 3.0, -3.0, 4.0, -4.0];
        let mut output = [0.0f32; 8];
        task.process(&mut FrameIo::new(&input, &mut output));

        assert_eq!(left.buffer().to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(right.buffer().to_vec(), vec![-1.0, -2.0, -3.0, -4.0]);
        assert_eq!(task.last_input(1), -4.0);
    }

    #[test]
    fn output_interleaves_and_zeroes_disconnected() {
        let ctx = small_ctx();
        let task = OutputTask::new(&ctx);
        let src = Outlet::new(&ctx, "src");
        src.buffer().write_from(&[0.1, 0.2, 0.3, 0.4]);
        task.inlet(0).unwrap().connect(&src);

        let input = [0.0f32; 8];
        let mut output = [9.0f32; 8];
        task.process(&mut FrameIo::new(&input, &mut output));
        assert_eq!(output, [0.1, 0.0, 0.2, 0.0, 0.3, 0.0, 0.4, 0.0]);
    }

    #[test]
    fn monitor_mirrors_connected_channel() {
        let ctx = small_ctx();
        let task = OutputTask::new(&ctx);
        let src = Outlet::constant(&ctx, "src", 0.5);
        task.inlet(1).unwrap().connect(&src);
        let scope = Inlet::new(&ctx, "scope");
        scope.connect(task.monitor(1).unwrap());

        let mut output = [0.0f32; 8];
        task.process(&mut FrameIo::new(&[0.0; 8], &mut output));
        assert_eq!(scope.buffer().to_vec(), vec![0.5; 4]);
    }
}
