//! Input port.

use core::ops::Deref;
use std::sync::Arc;

use arc_swap::{ArcSwapOption, Guard};

use super::{Outlet, Port};
use crate::context::AudioContext;
use crate::frame::FrameBuffer;
use crate::object::{Object, ObjectId};

/// An upstream link: the outlet and the object that owns it.
struct Link {
    outlet: Arc<Outlet>,
    owner: Option<Arc<Object>>,
}

/// An input port with at most one upstream [`Outlet`].
///
/// Connecting takes a strong reference on the outlet and on the object that
/// owns it; disconnecting (or dropping the inlet) releases both.
pub struct Inlet {
    port: Port,
    upstream: ArcSwapOption<Link>,
    zero: Arc<FrameBuffer>,
}

impl Inlet {
    /// Creates a free-standing inlet (no owning object).
    pub fn new(ctx: &AudioContext, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::build(ctx, name, 0, None))
    }

    pub(crate) fn owned(
        ctx: &AudioContext,
        name: impl Into<String>,
        index: usize,
        owner: ObjectId,
    ) -> Arc<Self> {
        Arc::new(Self::build(ctx, name, index, Some(owner)))
    }

    fn build(
        ctx: &AudioContext,
        name: impl Into<String>,
        index: usize,
        owner: Option<ObjectId>,
    ) -> Self {
        Self {
            port: Port::new(name, index, owner),
            upstream: ArcSwapOption::empty(),
            zero: Arc::clone(ctx.zero_frame()),
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

    /// Links this inlet to `outlet`, dropping any previous link first.
    pub fn connect(self: &Arc<Self>, outlet: &Arc<Outlet>) {
        self.disconnect();
        outlet.add_subscriber(self);
        self.upstream.store(Some(Arc::new(Link {
            outlet: Arc::clone(outlet),
            owner: outlet.object(),
        })));
    }

    /// Drops the upstream link. A no-op when already disconnected.
    pub fn disconnect(&self) {
        if let Some(old) = self.upstream.swap(None) {
            old.outlet.remove_subscriber(self);
        }
    }

    /// Returns true if an upstream outlet is linked.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.upstream.load().is_some()
    }

    /// The linked outlet, if any.
    pub fn upstream(&self) -> Option<Arc<Outlet>> {
        let link = self.upstream.load();
        (*link).as_ref().map(|link| Arc::clone(&link.outlet))
    }

    /// The object owning the linked outlet, if any.
    pub fn upstream_object(&self) -> Option<Arc<Object>> {
        let link = self.upstream.load();
        (*link).as_ref().and_then(|link| link.owner.clone())
    }

    /// The frame to read: the upstream outlet's output, or silence.
    #[inline]
    pub fn buffer(&self) -> InletBuffer<'_> {
        InletBuffer {
            upstream: self.upstream.load(),
            zero: &self.zero,
        }
    }

    /// True when disconnected or when the upstream frame is constant or muted.
    pub fn is_constant(&self) -> bool {
        match &*self.upstream.load() {
            Some(link) => link.outlet.is_constant() || link.outlet.is_muted(),
            None => true,
        }
    }
}

impl Drop for Inlet {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl core::fmt::Debug for Inlet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Inlet")
            .field("name", &self.port.name())
            .field("owner", &self.port.owner())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Read view of an inlet's frame.
///
/// Holds the upstream link for the duration of the read so a concurrent
/// disconnect cannot free the frame underneath the reader.
pub struct InletBuffer<'a> {
    upstream: Guard<Option<Arc<Link>>>,
    zero: &'a FrameBuffer,
}

impl Deref for InletBuffer<'_> {
    type Target = FrameBuffer;

    #[inline]
    fn deref(&self) -> &FrameBuffer {
        match &*self.upstream {
            Some(link) => link.outlet.output(),
            None => self.zero,
        }
    }
}
