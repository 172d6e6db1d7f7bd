//! Probes: objects that observe a signal instead of producing one.

use std::sync::Arc;

use libm::fabsf;
use ondule_core::{AudioContext, Object, ObjectIo, Processor};
use parking_lot::Mutex;

/// Seconds between [`MinMax`] reports.
pub const REFRESH_PERIOD: f32 = 1.0 / 30.0;

/// Shared record of everything a [`Sink`] has received.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    samples: Arc<Mutex<Vec<f32>>>,
}

impl Capture {
    /// Removes and returns the captured samples.
    pub fn take(&self) -> Vec<f32> {
        std::mem::take(&mut *self.samples.lock())
    }

    /// Copy of the captured samples.
    pub fn snapshot(&self) -> Vec<f32> {
        self.samples.lock().clone()
    }

    /// Number of captured samples.
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    /// Returns true if nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }
}

/// Terminal object: reads `In` and reports its peak as the `Peak` parameter.
///
/// A capturing sink also appends every frame to a [`Capture`], which grows
/// without bound; it is meant for offline rendering and tests.
#[derive(Debug, Clone, Default)]
pub struct Sink {
    capture: Option<Capture>,
}

impl Sink {
    /// Builds a non-capturing sink.
    pub fn object(ctx: &AudioContext, name: &str) -> Arc<Object> {
        Self::build(ctx, name, None)
    }

    /// Builds a sink that records its input.
    pub fn capturing(ctx: &AudioContext, name: &str) -> (Arc<Object>, Capture) {
        let capture = Capture::default();
        (Self::build(ctx, name, Some(capture.clone())), capture)
    }

    fn build(ctx: &AudioContext, name: &str, capture: Option<Capture>) -> Arc<Object> {
        Object::builder(name, ctx)
            .inlet("In")
            .smoothed_parameter("Peak", 0.0, 1)
            .build(Self { capture })
    }
}

impl Processor for Sink {
    fn process(&mut self, io: &ObjectIo<'_>) {
        let input = io.inlet(0).buffer();
        let peak = input.iter().fold(0.0f32, |m, s| m.max(fabsf(s)));
        io.parameter(0).hard_set(peak);
        if let Some(capture) = &self.capture {
            capture.samples.lock().extend(input.iter());
        }
    }

    fn reset(&mut self) {
        if let Some(capture) = &self.capture {
            capture.samples.lock().clear();
        }
    }
}

/// Tracks the running minimum and maximum of `In` and publishes them every
/// [`REFRESH_PERIOD`] through the `Min`, `Max` and `Center` parameters.
///
/// A constant input is published immediately.
#[derive(Debug, Clone)]
pub struct MinMax {
    period: u32,
    count: u32,
    next_min: f32,
    next_max: f32,
}

impl MinMax {
    /// Builds a min/max probe.
    pub fn object(ctx: &AudioContext, name: &str) -> Arc<Object> {
        let frames = (ctx.config().frame_rate() * REFRESH_PERIOD) as u32;
        Self::with_period(ctx, name, frames)
    }

    /// Builds a probe that reports every `frames` frames.
    pub fn with_period(ctx: &AudioContext, name: &str, frames: u32) -> Arc<Object> {
        Object::builder(name, ctx)
            .inlet("In")
            .smoothed_parameter("Min", 0.0, 1)
            .smoothed_parameter("Max", 0.0, 1)
            .smoothed_parameter("Center", 0.0, 1)
            .build(Self {
                period: frames.max(1),
                count: 0,
                next_min: f32::INFINITY,
                next_max: f32::NEG_INFINITY,
            })
    }
}

impl Processor for MinMax {
    fn process(&mut self, io: &ObjectIo<'_>) {
        let inlet = io.inlet(0);
        let input = inlet.buffer();
        let (min, max, center) = (io.parameter(0), io.parameter(1), io.parameter(2));

        if inlet.is_constant() {
            let v = input.get(0);
            min.hard_set(v);
            max.hard_set(v);
            center.hard_set(v);
            self.count = 0;
            self.next_min = v;
            self.next_max = v;
            return;
        }

        let (lo, hi) = input
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), s| {
                (lo.min(s), hi.max(s))
            });
        self.count += 1;
        if self.count >= self.period {
            min.hard_set(self.next_min.min(lo));
            max.hard_set(self.next_max.max(hi));
            center.hard_set(0.5 * (min.value() + max.value()));
            self.count = 0;
            self.next_min = f32::INFINITY;
            self.next_max = f32::NEG_INFINITY;
        } else {
            self.next_min = self.next_min.min(lo);
            self.next_max = self.next_max.max(hi);
        }
    }

    fn reset(&mut self) {
        self.count = 0;
        self.next_min = f32::INFINITY;
        self.next_max = f32::NEG_INFINITY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ondule_core::Outlet;

    #[test]
    fn sink_records_and_reports_peak() {
        let ctx = AudioContext::with_defaults();
        let (sink, capture) = Sink::capturing(&ctx, "sink");
        let src = Outlet::new(&ctx, "src");
        src.buffer().fill(0.25);
        src.buffer().set(3, -0.8);
        sink.inlet("In").unwrap().connect(&src);

        sink.process();
        sink.process();
        assert_eq!(capture.len(), 2 * ctx.frame_length());
        assert_eq!(capture.snapshot()[3], -0.8);
        assert_eq!(sink.parameter("Peak").unwrap().value(), 0.8);

        assert_eq!(capture.take().len(), 2 * ctx.frame_length());
        assert!(capture.is_empty());
    }

    #[test]
    fn minmax_publishes_each_period() {
        let ctx = AudioContext::with_defaults();
        let probe = MinMax::with_period(&ctx, "probe", 2);
        let src = Outlet::new(&ctx, "src");
        probe.inlet("In").unwrap().connect(&src);

        src.buffer().fill(0.5);
        src.buffer().set(0, -1.0);
        probe.process();
        assert_eq!(probe.parameter("Max").unwrap().value(), 0.0);

        src.buffer().fill(0.25);
        src.buffer().set(5, 2.0);
        probe.process();
        assert_eq!(probe.parameter("Min").unwrap().value(), -1.0);
        assert_eq!(probe.parameter("Max").unwrap().value(), 2.0);
        assert_eq!(probe.parameter("Center").unwrap().value(), 0.5);
    }

    #[test]
    fn minmax_tracks_constant_input_immediately() {
        let ctx = AudioContext::with_defaults();
        let probe = MinMax::object(&ctx, "probe");
        let dc = Outlet::constant(&ctx, "dc", 0.3);
        probe.inlet("In").unwrap().connect(&dc);
        probe.process();
        assert_eq!(probe.parameter("Center").unwrap().value(), 0.3);
    }
}
