//! Per-frame sample storage shared between outlets and inlets.
//!
//! A [`FrameBuffer`] is a fixed-length block of `f32` samples stored as
//! bit-cast atomics. The outlet that owns a buffer writes it during its
//! object's `process()`, downstream objects read it later in the same frame.
//! Atomics keep the buffer `Sync` without locks, so an object wired to its own
//! outlet (a one-frame feedback loop) can read and write the same frame
//! without deadlocking. Relaxed ordering is enough: every access happens on
//! the audio thread, and the scheduler lock orders hand-offs between threads.

use core::sync::atomic::{AtomicU32, Ordering};

/// A fixed-length frame of samples.
///
/// The length is set at construction and never changes; frame size is fixed
/// for the lifetime of an [`AudioContext`](crate::AudioContext).
pub struct FrameBuffer {
    samples: Box<[AtomicU32]>,
}

impl FrameBuffer {
    /// Creates a zeroed frame with `len` samples.
    pub fn new(len: usize) -> Self {
        Self::filled(len, 0.0)
    }

    /// Creates a frame with every sample set to `value`.
    pub fn filled(len: usize, value: f32) -> Self {
        let bits = value.to_bits();
        Self {
            samples: (0..len).map(|_| AtomicU32::new(bits)).collect(),
        }
    }

    /// Returns the number of samples in the frame.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the frame has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Reads sample `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[inline]
    pub fn get(&self, i: usize) -> f32 {
        f32::from_bits(self.samples[i].load(Ordering::Relaxed))
    }

    /// Writes sample `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[inline]
    pub fn set(&self, i: usize, value: f32) {
        self.samples[i].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Sets every sample to `value`.
    pub fn fill(&self, value: f32) {
        let bits = value.to_bits();
        for s in self.samples.iter() {
            s.store(bits, Ordering::Relaxed);
        }
    }

    /// Copies `src` into the frame. Extra samples on either side are ignored.
    pub fn write_from(&self, src: &[f32]) {
        for (dst, &v) in self.samples.iter().zip(src) {
            dst.store(v.to_bits(), Ordering::Relaxed);
        }
    }

    /// Copies the frame into `dst`. Extra samples on either side are ignored.
    pub fn read_into(&self, dst: &mut [f32]) {
        for (d, src) in dst.iter_mut().zip(self.samples.iter()) {
            *d = f32::from_bits(src.load(Ordering::Relaxed));
        }
    }

    /// Copies another frame sample-by-sample.
    pub fn copy_from(&self, other: &FrameBuffer) {
        for (dst, src) in self.samples.iter().zip(other.samples.iter()) {
            dst.store(src.load(Ordering::Relaxed), Ordering::Relaxed);
        }
    }

    /// Iterates over the samples.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples
            .iter()
            .map(|s| f32::from_bits(s.load(Ordering::Relaxed)))
    }

    /// Collects the samples into a `Vec` (allocates; not for the audio thread).
    pub fn to_vec(&self) -> Vec<f32> {
        self.iter().collect()
    }
}

impl core::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("len", &self.len())
            .finish()
    }
}

/// Linear ramp between two values over a fixed number of frames.
///
/// Used for click-free fades (chain mute/unmute). `step()` advances one frame
/// and returns the new value; the ramp lands exactly on the goal at the end.
#[derive(Debug, Clone)]
pub struct LinearRamp {
    value: f32,
    goal: f32,
    step: f32,
    remaining: u32,
    length: u32,
}

impl LinearRamp {
    /// Creates a ramp of `length` frames resting at `value`.
    pub fn new(length: u32, value: f32) -> Self {
        Self {
            value,
            goal: value,
            step: 0.0,
            remaining: 0,
            length: length.max(1),
        }
    }

    /// Starts a ramp from the current value toward `goal`.
    pub fn reset(&mut self, goal: f32) {
        self.goal = goal;
        self.remaining = self.length;
        self.step = (goal - self.value) / self.length as f32;
    }

    /// Jumps to `value` with no ramp.
    pub fn set(&mut self, value: f32) {
        self.value = value;
        self.goal = value;
        self.remaining = 0;
    }

    /// Advances one frame and returns the new value.
    #[inline]
    pub fn step(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.value = if self.remaining == 0 {
                self.goal
            } else {
                self.value + self.step
            };
        }
        self.value
    }

    /// Current value.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Returns true while the ramp has frames left.
    #[inline]
    pub fn in_progress(&self) -> bool {
        self.remaining > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_is_silent() {
        let frame = FrameBuffer::new(64);
        assert_eq!(frame.len(), 64);
        assert!(frame.iter().all(|s| s == 0.0));
    }

    #[test]
    fn write_then_read_roundtrip() {
        let frame = FrameBuffer::new(4);
        frame.write_from(&[0.25, -0.5, 1.0, 0.0]);
        let mut out = [0.0; 4];
        frame.read_into(&mut out);
        assert_eq!(out, [0.25, -0.5, 1.0, 0.0]);
    }

    #[test]
    fn copy_from_matches_source() {
        let a = FrameBuffer::filled(8, 0.75);
        let b = FrameBuffer::new(8);
        b.copy_from(&a);
        assert_eq!(b.to_vec(), vec![0.75; 8]);
    }

    #[test]
    fn ramp_lands_on_goal() {
        let mut ramp = LinearRamp::new(4, 1.0);
        ramp.reset(0.0);
        let values: Vec<f32> = (0..4).map(|_| ramp.step()).collect();
        assert_eq!(values, vec![0.75, 0.5, 0.25, 0.0]);
        assert!(!ramp.in_progress());
        assert_eq!(ramp.step(), 0.0);
    }
}
