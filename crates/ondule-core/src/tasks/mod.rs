//! Schedulable tasks and the scheduler that runs them.
//!
//! A [`Task`] is anything the audio thread should run once per frame: a unit
//! chain, a flat object list, the hardware frame pumps, the connection queue.
//! [`TaskScheduler`] keeps them sorted by descending [`priority`](Task::priority)
//! and runs them back to back under one lock.
//!
//! # Standard priorities
//!
//! | task | priority |
//! |------|----------|
//! | [`InputTask`] | [`priority::INPUT`] |
//! | chains, object lists | [`priority::DEFAULT`] |
//! | [`OutputTask`] | [`priority::OUTPUT`] |
//! | [`ObjectCache`] | [`priority::OBJECT_CACHE`] |
//! | [`ConnectionQueue`] | [`priority::CONNECTION_QUEUE`] |

mod connection_queue;
mod io;
mod object_cache;
mod object_list;
mod scheduler;
mod unit_chain;

pub use connection_queue::{ConnectionQueue, QueueState};
pub use io::{InputTask, OutputTask};
pub use object_cache::{DEFAULT_CAPACITY, DEFAULT_WATERMARK, ObjectCache};
pub use object_list::ObjectList;
pub use scheduler::{TaskScheduler, Transaction};
pub use unit_chain::{ChainGuard, UnitChain};

/// Well-known task priorities. Higher runs earlier in the frame.
pub mod priority {
    /// Hardware input de-interleave: first in every frame.
    pub const INPUT: i32 = i32::MAX - 1;
    /// Ordinary processing tasks.
    pub const DEFAULT: i32 = 0;
    /// Hardware output interleave.
    pub const OUTPUT: i32 = i32::MIN + 2;
    /// Pooled objects.
    pub const OBJECT_CACHE: i32 = i32::MIN + 1;
    /// Deferred port edits: last in every frame.
    pub const CONNECTION_QUEUE: i32 = i32::MIN;
}

/// Interleaved hardware frame handed to every task.
pub struct FrameIo<'a> {
    input: &'a [f32],
    output: &'a mut [f32],
}

impl<'a> FrameIo<'a> {
    /// Wraps interleaved input and output sample slices.
    pub fn new(input: &'a [f32], output: &'a mut [f32]) -> Self {
        Self { input, output }
    }

    /// Interleaved input samples.
    #[inline]
    pub fn input(&self) -> &[f32] {
        self.input
    }

    /// Interleaved output samples.
    #[inline]
    pub fn output(&mut self) -> &mut [f32] {
        self.output
    }
}

/// A unit of work run once per frame by a [`TaskScheduler`].
///
/// `process` runs on the audio thread with the scheduler lock held. It must
/// not block, allocate in steady state, or call back into the scheduler.
pub trait Task: Send + Sync {
    /// Task name, for introspection and logs.
    fn name(&self) -> &str;

    /// Scheduling priority; higher runs first.
    fn priority(&self) -> i32 {
        priority::DEFAULT
    }

    /// Runs one frame.
    fn process(&self, io: &mut FrameIo<'_>);
}
