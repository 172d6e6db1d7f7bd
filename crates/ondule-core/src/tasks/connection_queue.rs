//! Deferred port edits applied on the audio thread.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use super::{FrameIo, Task, priority};
use crate::object::Object;
use crate::port::{Inlet, Outlet};

enum Edit {
    Connect {
        outlet: Arc<Outlet>,
        inlet: Arc<Inlet>,
        object: Option<Arc<Object>>,
    },
    DisconnectOutlet {
        outlet: Arc<Outlet>,
        object: Option<Arc<Object>>,
    },
    DisconnectInlet {
        inlet: Arc<Inlet>,
        object: Option<Arc<Object>>,
    },
}

/// Snapshot of a [`ConnectionQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueState {
    /// Edits waiting for the next frame.
    pub pending: usize,
    /// Objects the queue currently runs.
    pub managed: usize,
}

/// A task that applies port edits between frames.
///
/// Control threads push edits through a lock-free channel; the queue drains
/// it inside its own scheduler slot, after processing the objects it
/// manages. A connect that names an object also starts running that object
/// here; a disconnect that names one stops it. Every queued edit holds strong
/// references, so nothing it touches can be freed while it waits.
pub struct ConnectionQueue {
    name: String,
    priority: i32,
    tx: Sender<Edit>,
    rx: Receiver<Edit>,
    objects: Mutex<Vec<Arc<Object>>>,
}

impl ConnectionQueue {
    /// Creates a queue at [`priority::CONNECTION_QUEUE`].
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            name: "ConnectionQueue".to_string(),
            priority: priority::CONNECTION_QUEUE,
            tx,
            rx,
            objects: Mutex::new(Vec::new()),
        }
    }

    /// Queues `outlet → inlet`. If `object` is given, it is run by the queue
    /// from the frame the link appears.
    pub fn push_connection(
        &self,
        outlet: &Arc<Outlet>,
        inlet: &Arc<Inlet>,
        object: Option<&Arc<Object>>,
    ) {
        if let Some(object) = object {
            object.set_scheduled(true);
        }
        self.send(Edit::Connect {
            outlet: Arc::clone(outlet),
            inlet: Arc::clone(inlet),
            object: object.cloned(),
        });
    }

    /// Queues disconnecting every subscriber of `outlet`, and stops running
    /// `object` if given.
    pub fn push_outlet_disconnection(&self, outlet: &Arc<Outlet>, object: Option<&Arc<Object>>) {
        if let Some(object) = object {
            object.set_scheduled(false);
        }
        self.send(Edit::DisconnectOutlet {
            outlet: Arc::clone(outlet),
            object: object.cloned(),
        });
    }

    /// Queues disconnecting `inlet`, and stops running `object` if given.
    pub fn push_inlet_disconnection(&self, inlet: &Arc<Inlet>, object: Option<&Arc<Object>>) {
        if let Some(object) = object {
            object.set_scheduled(false);
        }
        self.send(Edit::DisconnectInlet {
            inlet: Arc::clone(inlet),
            object: object.cloned(),
        });
    }

    fn send(&self, edit: Edit) {
        // Both channel ends live in `self`, so the send cannot fail.
        let _ = self.tx.send(edit);
    }

    /// Pending and managed counts.
    pub fn state(&self) -> QueueState {
        QueueState {
            pending: self.rx.len(),
            managed: self.objects.lock().len(),
        }
    }

    fn apply(objects: &mut Vec<Arc<Object>>, edit: Edit) {
        match edit {
            Edit::Connect {
                outlet,
                inlet,
                object,
            } => {
                inlet.connect(&outlet);
                if let Some(object) = object {
                    if !objects.iter().any(|o| o.id() == object.id()) {
                        objects.push(object);
                    }
                }
            }
            Edit::DisconnectOutlet { outlet, object } => {
                outlet.disconnect();
                Self::forget(objects, object.as_deref());
            }
            Edit::DisconnectInlet { inlet, object } => {
                inlet.disconnect();
                Self::forget(objects, object.as_deref());
            }
        }
    }

    fn forget(objects: &mut Vec<Arc<Object>>, object: Option<&Object>) {
        if let Some(object) = object {
            objects.retain(|o| o.id() != object.id());
        }
    }
}

impl Default for ConnectionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for ConnectionQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn process(&self, _io: &mut FrameIo<'_>) {
        let mut objects = self.objects.lock();
        for object in objects.iter() {
            object.update_parameters();
            object.process();
        }
        #[cfg(feature = "tracing")]
        let mut applied = 0usize;
        for edit in self.rx.try_iter() {
            Self::apply(&mut objects, edit);
            #[cfg(feature = "tracing")]
            {
                applied += 1;
            }
        }
        #[cfg(feature = "tracing")]
        if applied > 0 {
            tracing::debug!("connection queue: applied {applied} edits");
        }
    }
}

impl core::fmt::Debug for ConnectionQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConnectionQueue")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AudioContext;
    use crate::object::ObjectIo;

    fn tick(queue: &ConnectionQueue) {
        let mut out = [0.0f32; 2];
        let mut io = FrameIo::new(&[0.0; 2], &mut out);
        queue.process(&mut io);
    }

    fn constant(ctx: &AudioContext, value: f32) -> Arc<Object> {
        Object::builder("const", ctx)
            .outlet("Out")
            .build(move |io: &ObjectIo<'_>| io.outlet(0).buffer().fill(value))
    }

    #[test]
    fn edits_wait_for_the_next_frame() {
        let ctx = AudioContext::with_defaults();
        let queue = ConnectionQueue::new();
        let out = Outlet::new(&ctx, "Out");
        let inp = Inlet::new(&ctx, "In");

        queue.push_connection(&out, &inp, None);
        assert!(!inp.is_connected());
        assert_eq!(queue.state().pending, 1);

        tick(&queue);
        assert!(inp.is_connected());
        assert_eq!(queue.state().pending, 0);

        queue.push_inlet_disconnection(&inp, None);
        tick(&queue);
        assert!(!inp.is_connected());
    }

    #[test]
    fn connected_objects_are_processed() {
        let ctx = AudioContext::with_defaults();
        let queue = ConnectionQueue::new();
        let obj = constant(&ctx, 0.25);
        let out = Arc::clone(obj.outlet("Out").unwrap());
        let inp = Inlet::new(&ctx, "In");

        queue.push_connection(&out, &inp, Some(&obj));
        assert!(obj.is_scheduled());
        tick(&queue);
        assert_eq!(queue.state().managed, 1);
        // Edits land after the managed objects ran, so the value shows next frame.
        assert_eq!(inp.buffer().get(0), 0.0);
        tick(&queue);
        assert_eq!(inp.buffer().get(0), 0.25);

        queue.push_outlet_disconnection(&out, Some(&obj));
        assert!(!obj.is_scheduled());
        tick(&queue);
        assert_eq!(queue.state().managed, 0);
        assert!(!inp.is_connected());
    }

    #[test]
    fn pushes_from_another_thread() {
        let ctx = AudioContext::with_defaults();
        let queue = Arc::new(ConnectionQueue::new());
        let out = Outlet::new(&ctx, "Out");
        let inlets: Vec<_> = (0..8).map(|i| Inlet::new(&ctx, format!("In{i}"))).collect();

        std::thread::scope(|s| {
            s.spawn(|| {
                for inlet in &inlets {
                    queue.push_connection(&out, inlet, None);
                }
            });
        });
        tick(&queue);
        assert_eq!(out.subscriber_count(), 8);
    }
}
