//! Audio ports: the endpoints that connect objects.
//!
//! An [`Outlet`] owns a [`FrameBuffer`](crate::FrameBuffer) and knows which
//! inlets subscribe to it. An [`Inlet`] holds at most one upstream outlet and
//! reads that outlet's frame, or the shared silent frame when disconnected.
//!
//! # Ownership
//!
//! The forward edge is strong: a connected inlet holds the `Arc<Outlet>` and
//! the `Arc<Object>` that owns it, so neither the upstream buffer nor the
//! object writing it can be freed while anything reads it. The reverse
//! edge is weak: an outlet keeps `Weak<Inlet>` subscribers. Dropping an inlet
//! disconnects it; dropping the last strong handle to a link releases it. No
//! manual attach/release pairs exist anywhere in the graph.
//!
//! # Threading
//!
//! Connect and disconnect run at edit time (under the scheduler lock or from
//! the [`ConnectionQueue`](crate::ConnectionQueue) drain). Reading an inlet is
//! lock-free: the upstream link lives in an `ArcSwapOption`.

mod inlet;
mod outlet;

pub use inlet::{Inlet, InletBuffer};
pub use outlet::Outlet;

use crate::object::ObjectId;

/// Identity shared by inlets and outlets: name, position, owning object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    name: String,
    index: usize,
    owner: Option<ObjectId>,
}

impl Port {
    pub(crate) fn new(name: impl Into<String>, index: usize, owner: Option<ObjectId>) -> Self {
        Self {
            name: name.into(),
            index,
            owner,
        }
    }

    /// Port name, unique among the owner's ports of the same direction.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the owner's inlet or outlet list.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Owning object, or `None` for free-standing ports (hardware I/O).
    #[inline]
    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }
}

/// Connects `outlet` to `inlet`, replacing any existing upstream link.
///
/// Equivalent to [`Inlet::connect`]; provided for symmetry with
/// [`connect`](crate::connect).
pub fn connect_ports(outlet: &std::sync::Arc<Outlet>, inlet: &std::sync::Arc<Inlet>) {
    inlet.connect(outlet);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AudioContext;

    #[test]
    fn connect_disconnect_roundtrip() {
        let ctx = AudioContext::with_defaults();
        let out = Outlet::new(&ctx, "Out");
        let inp = Inlet::new(&ctx, "In");

        connect_ports(&out, &inp);
        assert!(inp.is_connected());
        assert_eq!(out.subscriber_count(), 1);

        inp.disconnect();
        assert!(!inp.is_connected());
        assert_eq!(out.subscriber_count(), 0);
        assert!(!out.is_connected());
    }

    #[test]
    fn second_disconnect_is_noop() {
        let ctx = AudioContext::with_defaults();
        let out = Outlet::new(&ctx, "Out");
        let inp = Inlet::new(&ctx, "In");

        inp.connect(&out);
        inp.disconnect();
        inp.disconnect();
        assert!(!inp.is_connected());
        assert_eq!(out.subscriber_count(), 0);
    }

    #[test]
    fn reconnect_replaces_old_link() {
        let ctx = AudioContext::with_defaults();
        let a = Outlet::new(&ctx, "A");
        let b = Outlet::new(&ctx, "B");
        let inp = Inlet::new(&ctx, "In");

        inp.connect(&a);
        inp.connect(&b);
        assert_eq!(a.subscriber_count(), 0);
        assert_eq!(b.subscriber_count(), 1);
        assert!(std::sync::Arc::ptr_eq(&inp.upstream().unwrap(), &b));
    }

    #[test]
    fn connection_keeps_outlet_alive() {
        let ctx = AudioContext::with_defaults();
        let out = Outlet::new(&ctx, "Out");
        let inp = Inlet::new(&ctx, "In");
        inp.connect(&out);
        out.buffer().fill(0.5);

        let weak = std::sync::Arc::downgrade(&out);
        drop(out);
        assert!(weak.upgrade().is_some(), "link must hold the outlet");
        assert_eq!(inp.buffer().get(0), 0.5);

        inp.disconnect();
        assert!(weak.upgrade().is_none(), "disconnect must release the outlet");
    }

    #[test]
    fn dropping_inlet_unsubscribes() {
        let ctx = AudioContext::with_defaults();
        let out = Outlet::new(&ctx, "Out");
        {
            let inp = Inlet::new(&ctx, "In");
            inp.connect(&out);
            assert_eq!(out.subscriber_count(), 1);
        }
        assert_eq!(out.subscriber_count(), 0);
    }

    #[test]
    fn outlet_disconnect_detaches_all_subscribers() {
        let ctx = AudioContext::with_defaults();
        let out = Outlet::new(&ctx, "Out");
        let a = Inlet::new(&ctx, "A");
        let b = Inlet::new(&ctx, "B");
        a.connect(&out);
        b.connect(&out);
        assert_eq!(out.subscriber_count(), 2);

        out.disconnect();
        assert!(!a.is_connected());
        assert!(!b.is_connected());
        assert_eq!(out.subscriber_count(), 0);
    }
}
