//! Flat object list task.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{FrameIo, Task, priority};
use crate::object::{Object, ObjectId};

/// A task that runs a list of objects in insertion order.
///
/// Handy for scheduling a compiled order directly, without a unit:
///
/// ```rust
/// use ondule_core::{AudioContext, GraphCompiler, Object, ObjectIo, ObjectList};
///
/// let ctx = AudioContext::with_defaults();
/// let a = Object::builder("a", &ctx).outlet("Out").build(|_: &ObjectIo<'_>| {});
/// let list = ObjectList::new("patch");
/// list.set_order(&GraphCompiler::new().compile(&[a]).order);
/// assert_eq!(list.len(), 1);
/// ```
pub struct ObjectList {
    name: String,
    priority: i32,
    enabled: AtomicBool,
    objects: Mutex<Vec<Arc<Object>>>,
}

impl ObjectList {
    /// Creates an empty, enabled list at [`priority::DEFAULT`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: priority::DEFAULT,
            enabled: AtomicBool::new(true),
            objects: Mutex::new(Vec::new()),
        }
    }

    /// Sets the scheduling priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Appends `object` unless it is already listed.
    pub fn add(&self, object: &Arc<Object>) {
        let mut objects = self.objects.lock();
        if !objects.iter().any(|o| o.id() == object.id()) {
            object.set_scheduled(true);
            objects.push(Arc::clone(object));
        }
    }

    /// Removes the object with `id`. Returns true if it was listed.
    pub fn remove(&self, id: ObjectId) -> bool {
        let removed = {
            let mut objects = self.objects.lock();
            objects
                .iter()
                .position(|o| o.id() == id)
                .map(|at| objects.remove(at))
        };
        match removed {
            Some(object) => {
                object.set_scheduled(false);
                true
            }
            None => false,
        }
    }

    /// Replaces the list with `order`.
    pub fn set_order(&self, order: &[Arc<Object>]) {
        let old = {
            let mut objects = self.objects.lock();
            for object in objects.iter() {
                object.set_scheduled(false);
            }
            std::mem::replace(&mut *objects, order.to_vec())
        };
        for object in order {
            object.set_scheduled(true);
        }
        drop(old);
    }

    /// Removes every object.
    pub fn clear(&self) {
        self.set_order(&[]);
    }

    /// Number of listed objects.
    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    /// Returns true if no object is listed.
    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }

    /// Resumes processing.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Pauses processing; listed objects keep their state.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// True while processing.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl Task for ObjectList {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn process(&self, _io: &mut FrameIo<'_>) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        for object in self.objects.lock().iter() {
            object.update_parameters();
            object.process();
        }
    }
}

impl Drop for ObjectList {
    fn drop(&mut self) {
        for object in self.objects.get_mut().iter() {
            object.set_scheduled(false);
        }
    }
}

impl core::fmt::Debug for ObjectList {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObjectList")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
