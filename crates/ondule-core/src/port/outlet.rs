//! Output port.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::{Inlet, Port};
use crate::context::AudioContext;
use crate::frame::FrameBuffer;
use crate::object::{Object, ObjectId};

/// An output port that owns one frame of samples.
///
/// The owning object writes [`buffer()`](Self::buffer) every frame. Readers go
/// through [`output()`](Self::output), which yields the shared silent frame
/// while the outlet is muted.
pub struct Outlet {
    port: Port,
    buffer: FrameBuffer,
    zero: Arc<FrameBuffer>,
    muted: AtomicBool,
    constant: AtomicBool,
    object: Weak<Object>,
    subscribers: Mutex<Vec<Weak<Inlet>>>,
}

impl Outlet {
    /// Creates a free-standing outlet (no owning object).
    pub fn new(ctx: &AudioContext, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::build(ctx, name, 0, None, Weak::new()))
    }

    /// Creates a free-standing outlet flagged constant and filled with `value`.
    pub fn constant(ctx: &AudioContext, name: impl Into<String>, value: f32) -> Arc<Self> {
        let outlet = Self::build(ctx, name, 0, None, Weak::new());
        outlet.buffer.fill(value);
        outlet.constant.store(true, Ordering::Relaxed);
        Arc::new(outlet)
    }

    pub(crate) fn owned(
        ctx: &AudioContext,
        name: impl Into<String>,
        index: usize,
        owner: ObjectId,
        object: Weak<Object>,
    ) -> Arc<Self> {
        Arc::new(Self::build(ctx, name, index, Some(owner), object))
    }

    fn build(
        ctx: &AudioContext,
        name: impl Into<String>,
        index: usize,
        owner: Option<ObjectId>,
        object: Weak<Object>,
    ) -> Self {
        Self {
            port: Port::new(name, index, owner),
            buffer: FrameBuffer::new(ctx.frame_length()),
            zero: Arc::clone(ctx.zero_frame()),
            muted: AtomicBool::new(false),
            constant: AtomicBool::new(false),
            object,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Port identity.
    #[inline]
    pub fn port(&self) -> &Port {
        &self.port
    }

    /// Port name.
    #[inline]
    pub fn name(&self) -> &str {
        self.port.name()
    }

    /// Owning object.
    #[inline]
    pub fn owner(&self) -> Option<ObjectId> {
        self.port.owner()
    }

    /// Owning object, while it is alive.
    pub fn object(&self) -> Option<Arc<Object>> {
        self.object.upgrade()
    }

    /// The frame this outlet owns. Writers always use this.
    #[inline]
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// The frame downstream readers see: silence while muted.
    #[inline]
    pub fn output(&self) -> &FrameBuffer {
        if self.muted.load(Ordering::Relaxed) {
            &self.zero
        } else {
            &self.buffer
        }
    }

    /// Silences the outlet for downstream readers.
    pub fn mute(&self) {
        self.muted.store(true, Ordering::Relaxed);
    }

    /// Restores the outlet's own frame for downstream readers.
    pub fn unmute(&self) {
        self.muted.store(false, Ordering::Relaxed);
    }

    /// Returns true while muted.
    #[inline]
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    /// Declares whether the frame holds one value repeated across every sample.
    ///
    /// Writers must keep this accurate; readers use it to skip per-sample work.
    #[inline]
    pub fn set_constant(&self, constant: bool) {
        self.constant.store(constant, Ordering::Relaxed);
    }

    /// Returns true if the frame is flagged constant.
    #[inline]
    pub fn is_constant(&self) -> bool {
        self.constant.load(Ordering::Relaxed)
    }

    /// Returns true if at least one inlet is subscribed.
    pub fn is_connected(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// Number of live subscribed inlets.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Returns the live subscribed inlets.
    pub fn subscribers(&self) -> Vec<Arc<Inlet>> {
        self.subscribers
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Disconnects every subscribed inlet.
    pub fn disconnect(&self) {
        // Inlet::disconnect re-enters remove_subscriber, so release the lock first.
        let inlets = self.subscribers();
        for inlet in inlets {
            inlet.disconnect();
        }
        self.subscribers.lock().retain(|w| w.strong_count() > 0);
    }

    pub(super) fn add_subscriber(&self, inlet: &Arc<Inlet>) {
        let mut subs = self.subscribers.lock();
        let ptr = Arc::as_ptr(inlet);
        if !subs.iter().any(|w| core::ptr::eq(w.as_ptr(), ptr)) {
            subs.push(Arc::downgrade(inlet));
        }
    }

    pub(super) fn remove_subscriber(&self, inlet: &Inlet) {
        let ptr: *const Inlet = inlet;
        self.subscribers
            .lock()
            .retain(|w| !core::ptr::eq(w.as_ptr(), ptr) && w.strong_count() > 0);
    }
}

impl core::fmt::Debug for Outlet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Outlet")
            .field("name", &self.port.name())
            .field("owner", &self.port.owner())
            .field("muted", &self.is_muted())
            .field("constant", &self.is_constant())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn muted_outlet_reads_as_silence() {
        let ctx = AudioContext::with_defaults();
        let out = Outlet::new(&ctx, "Out");
        out.buffer().fill(1.0);
        assert_eq!(out.output().get(0), 1.0);

        out.mute();
        assert_eq!(out.output().get(0), 0.0);
        assert_eq!(out.buffer().get(0), 1.0, "owner's frame is untouched");

        out.unmute();
        assert_eq!(out.output().get(0), 1.0);
    }

    #[test]
    fn constant_outlet_is_filled_and_flagged() {
        let ctx = AudioContext::with_defaults();
        let one = Outlet::constant(&ctx, "One", 1.0);
        assert!(one.is_constant());
        assert!(one.buffer().iter().all(|s| s == 1.0));
    }
}
