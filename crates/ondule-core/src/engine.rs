//! Frame-driven runtime.
//!
//! [`Engine`] owns an [`AudioContext`], a [`TaskScheduler`], and the three
//! tasks every running graph needs: the hardware [`InputTask`] and
//! [`OutputTask`], and a [`ConnectionQueue`] for edits from control threads.
//! Callers add their own chains, lists, and caches to the scheduler and drive
//! the engine one frame at a time, or offline with [`Engine::render`].
//!
//! ```rust
//! use ondule_core::{Engine, EngineConfig, Outlet};
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! let tone = Outlet::constant(engine.context(), "dc", 0.25);
//! engine.output().inlet(0).unwrap().connect(&tone);
//!
//! let out = engine.render(1);
//! assert_eq!(out.len(), engine.context().frame_length() * 2);
//! assert_eq!(out[0], 0.25);
//! ```

use std::sync::Arc;

use crate::context::{AudioContext, EngineConfig};
use crate::error::Result;
use crate::tasks::{ConnectionQueue, InputTask, OutputTask, TaskScheduler};

/// Scheduler plus the standard I/O and connection-queue tasks.
pub struct Engine {
    ctx: Arc<AudioContext>,
    scheduler: TaskScheduler,
    input: Arc<InputTask>,
    output: Arc<OutputTask>,
    queue: Arc<ConnectionQueue>,
}

impl Engine {
    /// Validates `config` and builds an engine with the standard tasks
    /// scheduled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the
    /// configuration is out of range.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let ctx = AudioContext::new(config)?;
        let input = Arc::new(InputTask::new(&ctx));
        let output = Arc::new(OutputTask::new(&ctx));
        let queue = Arc::new(ConnectionQueue::new());

        let scheduler = TaskScheduler::new();
        {
            let _tx = scheduler.transaction();
            scheduler.add(input.clone());
            scheduler.add(output.clone());
            scheduler.add(queue.clone());
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "engine: {} Hz, {} samples/frame, {} in / {} out",
            ctx.sample_rate(),
            ctx.frame_length(),
            ctx.config().input_channels,
            ctx.config().output_channels
        );

        Ok(Self {
            ctx,
            scheduler,
            input,
            output,
            queue,
        })
    }

    /// Shared context for building objects and ports.
    pub fn context(&self) -> &Arc<AudioContext> {
        &self.ctx
    }

    /// The task scheduler.
    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// Hardware input task.
    pub fn input(&self) -> &Arc<InputTask> {
        &self.input
    }

    /// Hardware output task.
    pub fn output(&self) -> &Arc<OutputTask> {
        &self.output
    }

    /// Queue for port edits from control threads.
    pub fn connections(&self) -> &Arc<ConnectionQueue> {
        &self.queue
    }

    /// Interleaved input samples per frame.
    pub fn input_frame_len(&self) -> usize {
        self.ctx.frame_length() * self.ctx.config().input_channels
    }

    /// Interleaved output samples per frame.
    pub fn output_frame_len(&self) -> usize {
        self.ctx.frame_length() * self.ctx.config().output_channels
    }

    /// Runs one frame on interleaved buffers.
    #[inline]
    pub fn process_frame(&self, input: &[f32], output: &mut [f32]) {
        self.scheduler.process(input, output);
    }

    /// Runs `frames` frames with silent input and returns the interleaved
    /// output.
    ///
    /// The scheduler runs once per frame even with no output channels.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let input = vec![0.0; self.input_frame_len()];
        let frame_len = self.output_frame_len();
        let mut out = vec![0.0; frames * frame_len];
        for frame in 0..frames {
            let at = frame * frame_len;
            self.process_frame(&input, &mut out[at..at + frame_len]);
        }
        out
    }

    /// Runs interleaved `input` through the engine frame by frame. A trailing
    /// partial frame is zero-padded; the output has one frame per input frame.
    ///
    /// Without input channels there is nothing to count frames by and
    /// nothing runs; use [`render`](Self::render) instead.
    pub fn process_interleaved(&self, input: &[f32]) -> Vec<f32> {
        let in_len = self.input_frame_len();
        let out_len = self.output_frame_len();
        if in_len == 0 {
            return Vec::new();
        }
        let frames = input.len().div_ceil(in_len);
        let mut scratch = vec![0.0; in_len];
        let mut out = vec![0.0; frames * out_len];
        for (frame, src) in input.chunks(in_len).enumerate() {
            scratch[..src.len()].copy_from_slice(src);
            scratch[src.len()..].fill(0.0);
            let at = frame * out_len;
            self.process_frame(&scratch, &mut out[at..at + out_len]);
        }
        out
    }
}

impl core::fmt::Debug for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("config", self.ctx.config())
            .field("tasks", &self.scheduler.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    use crate::port::{Inlet, Outlet};
    use crate::tasks::{FrameIo, Task, priority};

    fn small() -> Engine {
        Engine::new(EngineConfig {
            frame_length: 4,
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn standard_tasks_are_scheduled_in_priority_order() {
        let engine = small();
        let tasks = engine.scheduler().tasks();
        assert_eq!(
            tasks,
            vec![
                ("InputTask".to_string(), priority::INPUT),
                ("OutputTask".to_string(), priority::OUTPUT),
                ("ConnectionQueue".to_string(), priority::CONNECTION_QUEUE),
            ]
        );
    }

    #[test]
    fn rejects_invalid_config() {
        let err = Engine::new(EngineConfig {
            frame_length: 0,
            ..EngineConfig::default()
        });
        assert!(err.is_err());
    }

    #[test]
    fn passthrough_routes_input_to_output() {
        let engine = small();
        engine
            .output()
            .inlet(0)
            .unwrap()
            .connect(engine.input().outlet(0).unwrap());

        let input: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let out = engine.process_interleaved(&input);
        assert_eq!(out, vec![0.0, 0.0, 2.0, 0.0, 4.0, 0.0, 6.0, 0.0]);
    }

    #[test]
    fn partial_frame_is_padded() {
        let engine = small();
        engine
            .output()
            .inlet(1)
            .unwrap()
            .connect(engine.input().outlet(1).unwrap());
        let out = engine.process_interleaved(&[1.0, 1.0, 1.0]);
        assert_eq!(out.len(), 8);
        assert_eq!(out[1], 1.0);
        assert_eq!(out[3], 0.0);
    }

    struct Counter(AtomicUsize);

    impl Task for Counter {
        fn name(&self) -> &str {
            "Counter"
        }

        fn process(&self, _io: &mut FrameIo<'_>) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn render_without_outputs_still_runs_every_frame() {
        let engine = Engine::new(EngineConfig {
            frame_length: 4,
            output_channels: 0,
            ..EngineConfig::default()
        })
        .unwrap();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        engine.scheduler().add(counter.clone());

        let out = engine.render(3);
        assert!(out.is_empty());
        assert_eq!(counter.0.load(Ordering::Relaxed), 3);

        let out = engine.process_interleaved(&[0.0; 16]);
        assert!(out.is_empty());
        assert_eq!(counter.0.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn render_counts_one_pass_per_frame() {
        let engine = small();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        engine.scheduler().add(counter.clone());
        assert_eq!(engine.render(7).len(), 7 * engine.output_frame_len());
        assert_eq!(counter.0.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn queued_edit_shows_on_following_frame() {
        let engine = small();
        let dc = Outlet::constant(engine.context(), "dc", 0.5);
        let out_inlet: &Arc<Inlet> = engine.output().inlet(0).unwrap();
        engine.connections().push_connection(&dc, out_inlet, None);

        let out = engine.render(2);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[8], 0.5);
    }
}
