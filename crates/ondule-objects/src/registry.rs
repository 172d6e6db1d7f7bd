//! Object registry: discover and build leaves by kind.

use std::sync::Arc;

use ondule_core::{AudioContext, Object};

use crate::math::{Constant, Gain, GainBias, Multiply};
use crate::measurement::{MinMax, Sink};
use crate::mixing::{Mixer, StereoPanner};
use crate::sources::{RampSource, SineSource};

/// Category of leaf object for organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectCategory {
    /// Signal generators
    Source,
    /// Arithmetic on signals (gain, offset, products)
    Math,
    /// Summing and panning
    Mixing,
    /// Sinks and probes
    Measurement,
}

impl ObjectCategory {
    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            ObjectCategory::Source => "Source",
            ObjectCategory::Math => "Math",
            ObjectCategory::Mixing => "Mixing",
            ObjectCategory::Measurement => "Measurement",
        }
    }
}

/// Describes an object kind in the registry.
#[derive(Debug, Clone)]
pub struct ObjectDescriptor {
    /// Unique identifier (lowercase, no spaces); used as `kind` in patches.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description.
    pub description: &'static str,
    /// Category for organization.
    pub category: ObjectCategory,
    /// Inlet names, in port order.
    pub inlets: &'static [&'static str],
    /// Outlet names, in port order.
    pub outlets: &'static [&'static str],
    /// Parameter names, in order.
    pub parameters: &'static [&'static str],
}

impl ObjectDescriptor {
    /// Returns true if the kind has an inlet named `port`.
    pub fn has_inlet(&self, port: &str) -> bool {
        self.inlets.contains(&port)
    }

    /// Returns true if the kind has an outlet named `port`.
    pub fn has_outlet(&self, port: &str) -> bool {
        self.outlets.contains(&port)
    }

    /// Returns true if the kind has a parameter named `name`.
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains(&name)
    }
}

/// Factory function type for building objects.
pub type ObjectFactory = fn(&AudioContext, &str) -> Arc<Object>;

struct RegistryEntry {
    descriptor: ObjectDescriptor,
    factory: ObjectFactory,
}

/// Registry of the built-in leaf objects.
///
/// ```rust
/// use ondule_core::AudioContext;
/// use ondule_objects::ObjectRegistry;
///
/// let registry = ObjectRegistry::new();
/// let ctx = AudioContext::with_defaults();
/// let gain = registry.create("gain", &ctx, "g1").unwrap();
/// assert_eq!(gain.name(), "g1");
/// assert!(gain.parameter("Gain").is_some());
/// ```
pub struct ObjectRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry {
    /// Create a new registry with all built-in objects registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(10),
        };
        registry.register_builtin();
        registry
    }

    fn register_builtin(&mut self) {
        self.register(
            ObjectDescriptor {
                id: "sine",
                name: "Sine Source",
                description: "Sine oscillator with frequency and level",
                category: ObjectCategory::Source,
                inlets: &[],
                outlets: &["Out"],
                parameters: &["Frequency", "Level"],
            },
            SineSource::object,
        );
        self.register(
            ObjectDescriptor {
                id: "ramp",
                name: "Ramp Source",
                description: "Counts up by Step every sample",
                category: ObjectCategory::Source,
                inlets: &[],
                outlets: &["Out"],
                parameters: &["Step"],
            },
            RampSource::object,
        );
        self.register(
            ObjectDescriptor {
                id: "constant",
                name: "Constant",
                description: "Emits its Value parameter, ramped on change",
                category: ObjectCategory::Source,
                inlets: &[],
                outlets: &["Out"],
                parameters: &["Value"],
            },
            Constant::object,
        );
        self.register(
            ObjectDescriptor {
                id: "gain",
                name: "Gain",
                description: "Scales the input by Gain",
                category: ObjectCategory::Math,
                inlets: &["In"],
                outlets: &["Out"],
                parameters: &["Gain"],
            },
            Gain::object,
        );
        self.register(
            ObjectDescriptor {
                id: "gainbias",
                name: "Gain/Bias",
                description: "Scales by Gain then adds Bias",
                category: ObjectCategory::Math,
                inlets: &["In"],
                outlets: &["Out"],
                parameters: &["Gain", "Bias"],
            },
            GainBias::object,
        );
        self.register(
            ObjectDescriptor {
                id: "multiply",
                name: "Multiply",
                description: "Sample-wise product of two signals",
                category: ObjectCategory::Math,
                inlets: &["Left", "Right"],
                outlets: &["Out"],
                parameters: &[],
            },
            Multiply::object,
        );
        self.register(
            ObjectDescriptor {
                id: "mixer",
                name: "Mixer",
                description: "Sums four inputs",
                category: ObjectCategory::Mixing,
                inlets: &["In1", "In2", "In3", "In4"],
                outlets: &["Out"],
                parameters: &[],
            },
            Mixer::object,
        );
        self.register(
            ObjectDescriptor {
                id: "panner",
                name: "Stereo Panner",
                description: "Pans a stereo pair by a Pan signal",
                category: ObjectCategory::Mixing,
                inlets: &["Left", "Right", "Pan"],
                outlets: &["Left", "Right"],
                parameters: &[],
            },
            StereoPanner::object,
        );
        self.register(
            ObjectDescriptor {
                id: "sink",
                name: "Sink",
                description: "Terminal object reporting its input peak",
                category: ObjectCategory::Measurement,
                inlets: &["In"],
                outlets: &[],
                parameters: &["Peak"],
            },
            Sink::object,
        );
        self.register(
            ObjectDescriptor {
                id: "minmax",
                name: "Min/Max",
                description: "Publishes the input range a few times a second",
                category: ObjectCategory::Measurement,
                inlets: &["In"],
                outlets: &[],
                parameters: &["Min", "Max", "Center"],
            },
            MinMax::object,
        );
    }

    fn register(&mut self, descriptor: ObjectDescriptor, factory: ObjectFactory) {
        self.entries.push(RegistryEntry {
            descriptor,
            factory,
        });
    }

    /// Returns descriptors for all registered objects.
    pub fn all(&self) -> Vec<&ObjectDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Returns descriptors in a specific category.
    pub fn in_category(&self, category: ObjectCategory) -> Vec<&ObjectDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Get a descriptor by kind id.
    pub fn get(&self, id: &str) -> Option<&ObjectDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| &e.descriptor)
    }

    /// Build an object of kind `id` named `name`.
    ///
    /// Returns `None` if the kind is not registered.
    pub fn create(&self, id: &str, ctx: &AudioContext, name: &str) -> Option<Arc<Object>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| (e.factory)(ctx, name))
    }

    /// The factory for kind `id`, for callers that build objects later, such
    /// as an object cache.
    pub fn factory(&self, id: &str) -> Option<ObjectFactory> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| e.factory)
    }

    /// Returns the number of registered kinds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
