//! Pool of recyclable objects.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{FrameIo, Task, priority};
use crate::context::AudioContext;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectId};

/// Default number of objects kept around after release.
pub const DEFAULT_WATERMARK: usize = 16;

/// Default ceiling on objects alive at once.
pub const DEFAULT_CAPACITY: usize = 32;

type Factory = Box<dyn Fn(&AudioContext, &str) -> Arc<Object> + Send + Sync>;

#[derive(Default)]
struct Pool {
    free: Vec<Arc<Object>>,
    active: Vec<Arc<Object>>,
    built: usize,
}

impl Pool {
    fn total(&self) -> usize {
        self.free.len() + self.active.len()
    }
}

/// A pool of identical objects that also runs the active ones every frame.
///
/// [`get`](Self::get) hands out a recycled object when one is free, builds a
/// new one through the factory while the pool is under capacity, and fails
/// otherwise. [`release`](Self::release) keeps the object for reuse only
/// while the pool stays under the watermark.
pub struct ObjectCache {
    name: String,
    priority: i32,
    ctx: Arc<AudioContext>,
    factory: Factory,
    watermark: Mutex<usize>,
    capacity: usize,
    pool: Mutex<Pool>,
}

impl ObjectCache {
    /// Creates a cache with the default watermark and capacity.
    ///
    /// `factory` receives the context and the name to give the new object.
    pub fn new<F>(name: impl Into<String>, ctx: &Arc<AudioContext>, factory: F) -> Self
    where
        F: Fn(&AudioContext, &str) -> Arc<Object> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            priority: priority::OBJECT_CACHE,
            ctx: Arc::clone(ctx),
            factory: Box::new(factory),
            watermark: Mutex::new(DEFAULT_WATERMARK),
            capacity: DEFAULT_CAPACITY,
            pool: Mutex::new(Pool::default()),
        }
    }

    /// Sets the retention watermark and the capacity ceiling.
    #[must_use]
    pub fn with_limits(mut self, watermark: usize, capacity: usize) -> Self {
        self.watermark = Mutex::new(watermark);
        self.capacity = capacity;
        self
    }

    /// Sets the scheduling priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Takes an object from the pool, building one if needed.
    ///
    /// The object is reset before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheExhausted`] when nothing is free and the pool
    /// is at capacity.
    pub fn get(&self) -> Result<Arc<Object>> {
        let mut pool = self.pool.lock();
        let object = match pool.free.pop() {
            Some(object) => object,
            None if pool.total() < self.capacity => {
                let name = format!("{}{}", self.name, pool.built);
                pool.built += 1;
                (self.factory)(&self.ctx, &name)
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::warn!("object cache '{}': exhausted at {}", self.name, self.capacity);
                return Err(Error::CacheExhausted {
                    name: self.name.clone(),
                    capacity: self.capacity,
                });
            }
        };
        object.reset();
        pool.active.push(Arc::clone(&object));
        Ok(object)
    }

    /// Returns an object to the pool. Returns false if it was not active.
    ///
    /// The object is disconnected, then kept for reuse if the pool is under
    /// the watermark after removal, and dropped otherwise.
    pub fn release(&self, id: ObjectId) -> bool {
        let watermark = *self.watermark.lock();
        let dropped = {
            let mut pool = self.pool.lock();
            let Some(at) = pool.active.iter().position(|o| o.id() == id) else {
                return false;
            };
            let object = pool.active.remove(at);
            object.disconnect_all();
            if pool.total() < watermark {
                pool.free.push(object);
                None
            } else {
                Some(object)
            }
        };
        drop(dropped);
        true
    }

    /// Changes the retention watermark.
    pub fn set_watermark(&self, watermark: usize) {
        *self.watermark.lock() = watermark;
    }

    /// Retention watermark.
    pub fn watermark(&self) -> usize {
        *self.watermark.lock()
    }

    /// Capacity ceiling.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free plus active objects.
    pub fn total_size(&self) -> usize {
        self.pool.lock().total()
    }

    /// Objects handed out and not yet released.
    pub fn active_size(&self) -> usize {
        self.pool.lock().active.len()
    }

    /// Objects waiting for reuse.
    pub fn free_size(&self) -> usize {
        self.pool.lock().free.len()
    }
}

impl Task for ObjectCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn process(&self, _io: &mut FrameIo<'_>) {
        for object in &self.pool.lock().active {
            object.update_parameters();
            object.process();
        }
    }
}

impl core::fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let pool = self.pool.lock();
        f.debug_struct("ObjectCache")
            .field("name", &self.name)
            .field("active", &pool.active.len())
            .field("free", &pool.free.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
