//! Turning a patch file into a running engine.

use std::sync::Arc;

use ondule_core::{
    Compilation, Engine, Error, GraphCompiler, Object, ObjectCache, ObjectList, Task, connect,
};
use ondule_objects::ObjectRegistry;

use crate::error::ConfigError;
use crate::patch::{Patch, PortRef};
use crate::validation::PatchValidator;

/// A patch built into live objects and scheduled on its own engine.
pub struct LivePatch {
    engine: Engine,
    objects: Vec<(String, Arc<Object>)>,
    list: Arc<ObjectList>,
    caches: Vec<Arc<ObjectCache>>,
    compilation: Compilation,
}

impl Patch {
    /// Validates the patch, builds its objects and caches, wires them,
    /// compiles the execution order and schedules everything on a new
    /// engine.
    ///
    /// Declared objects run from one [`ObjectList`] in compiled order.
    /// Objects the compiler could not place are kept in
    /// [`LivePatch::compilation`] but not scheduled. Preloaded cache objects
    /// run from their cache.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ondule_config::get_factory_patch;
    /// use ondule_objects::ObjectRegistry;
    ///
    /// let live = get_factory_patch("init")
    ///     .unwrap()
    ///     .instantiate(&ObjectRegistry::new())
    ///     .unwrap();
    /// let out = live.render(4);
    /// assert!(out.iter().any(|s| *s != 0.0));
    /// ```
    pub fn instantiate(&self, registry: &ObjectRegistry) -> Result<LivePatch, ConfigError> {
        PatchValidator::new(registry).validate(self)?;
        let engine = Engine::new(self.engine.to_config())?;
        let ctx = Arc::clone(engine.context());

        let mut objects = Vec::with_capacity(self.objects.len());
        for config in &self.objects {
            let object = registry.create(&config.kind, &ctx, &config.id).ok_or_else(|| {
                ConfigError::UnknownKind {
                    object: config.id.clone(),
                    kind: config.kind.clone(),
                }
            })?;
            for (name, value) in &config.params {
                object.hard_set(name, *value)?;
            }
            for (name, value) in &config.options {
                object.set_option_value(name, *value)?;
            }
            objects.push((config.id.clone(), object));
        }
        let declared = objects.len();

        let mut caches = Vec::with_capacity(self.caches.len());
        for settings in &self.caches {
            let factory = registry.factory(&settings.kind).ok_or_else(|| {
                ConfigError::UnknownKind {
                    object: settings.name.clone(),
                    kind: settings.kind.clone(),
                }
            })?;
            let cache = Arc::new(
                ObjectCache::new(settings.name.clone(), &ctx, factory)
                    .with_limits(settings.watermark, settings.capacity),
            );
            for _ in 0..settings.preload {
                let object = cache.get()?;
                objects.push((object.name().to_string(), object));
            }
            caches.push(cache);
        }

        let find = |port: &PortRef| {
            objects
                .iter()
                .find(|(id, _)| *id == port.object)
                .map(|(_, object)| object)
        };
        for connection in &self.connections {
            if let (Some(from), Some(to)) = (find(&connection.from), find(&connection.to)) {
                connect(from, &connection.from.port, to, &connection.to.port)?;
            }
        }

        let compilation = GraphCompiler::new().compile(
            &objects[..declared]
                .iter()
                .map(|(_, object)| Arc::clone(object))
                .collect::<Vec<_>>(),
        );
        let list = Arc::new(ObjectList::new(self.name.clone()));
        list.set_order(&compilation.order);

        for route in &self.outputs {
            let inlet = engine
                .output()
                .inlet(route.channel)
                .ok_or_else(|| Error::ChannelOutOfRange {
                    owner: "output".to_string(),
                    channel: route.channel,
                    count: engine.output().channel_count(),
                })?;
            let Some(source) = find(&route.from) else {
                continue;
            };
            let outlet = source.outlet(&route.from.port).ok_or_else(|| Error::UnknownOutlet {
                object: route.from.object.clone(),
                port: route.from.port.clone(),
            })?;
            inlet.connect(outlet);
        }

        {
            let scheduler = engine.scheduler();
            let _tx = scheduler.transaction();
            scheduler.add(list.clone());
            for cache in &caches {
                scheduler.add(cache.clone());
            }
        }

        Ok(LivePatch {
            engine,
            objects,
            list,
            caches,
            compilation,
        })
    }
}

impl LivePatch {
    /// The engine running the patch.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Object by patch id, including preloaded cache objects.
    pub fn object(&self, id: &str) -> Option<&Arc<Object>> {
        self.objects
            .iter()
            .find(|(object_id, _)| object_id == id)
            .map(|(_, object)| object)
    }

    /// All objects with their ids, declared objects first.
    pub fn objects(&self) -> &[(String, Arc<Object>)] {
        &self.objects
    }

    /// Result of compiling the declared objects.
    pub fn compilation(&self) -> &Compilation {
        &self.compilation
    }

    /// The task running the declared objects.
    pub fn list(&self) -> &Arc<ObjectList> {
        &self.list
    }

    /// Cache by name.
    pub fn cache(&self, name: &str) -> Option<&Arc<ObjectCache>> {
        self.caches.iter().find(|c| c.name() == name)
    }

    /// Ramps a parameter toward `value` over its smoothing length.
    pub fn set_parameter(&self, id: &str, name: &str, value: f32) -> Result<(), ConfigError> {
        let object = self.object(id).ok_or_else(|| {
            ConfigError::Validation(crate::validation::ValidationError::UnknownObject(
                id.to_string(),
            ))
        })?;
        object.soft_set(name, value)?;
        Ok(())
    }

    /// Runs `frames` frames with silent input; returns interleaved output.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        self.engine.render(frames)
    }
}

impl Drop for LivePatch {
    fn drop(&mut self) {
        self.list.clear();
        for (_, object) in &self.objects {
            object.disconnect_all();
        }
    }
}

impl core::fmt::Debug for LivePatch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LivePatch")
            .field("objects", &self.objects.len())
            .field("ordered", &self.compilation.order.len())
            .field("unresolved", &self.compilation.unresolved.len())
            .field("caches", &self.caches.len())
            .finish_non_exhaustive()
    }
}
