//! Patch validation.
//!
//! Checks a [`Patch`] against the [`ObjectRegistry`] before anything is
//! built: object kinds exist, ids are unique, every parameter and port named
//! in the file exists on its object, and output routes fit the engine. All
//! problems are collected rather than stopping at the first.
//!
//! # Example
//!
//! ```rust
//! use ondule_config::{ObjectConfig, Patch, PatchValidator, ValidationError};
//! use ondule_objects::ObjectRegistry;
//!
//! let registry = ObjectRegistry::new();
//! let validator = PatchValidator::new(&registry);
//!
//! let patch = Patch::new("Bad").with_object(ObjectConfig::new("x", "theremin"));
//! let err = validator.validate(&patch).unwrap_err();
//! assert!(matches!(err, ValidationError::UnknownKind { .. }));
//! ```

use std::collections::{HashMap, HashSet};

use ondule_objects::{ObjectDescriptor, ObjectRegistry};
use thiserror::Error;

use crate::patch::{Patch, PortRef};

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Engine settings the runtime cannot run with.
    #[error("invalid engine settings: {0}")]
    InvalidEngine(String),

    /// Object id that cannot be referenced from a port string.
    #[error("invalid object id '{0}'")]
    InvalidObjectId(String),

    /// Two objects share an id.
    #[error("duplicate object id '{0}'")]
    DuplicateObject(String),

    /// The registry has no such kind.
    #[error("unknown object kind '{kind}' for '{object}'")]
    UnknownKind {
        /// Object or cache id.
        object: String,
        /// Requested kind.
        kind: String,
    },

    /// A port string is not of the form `object.Port`.
    #[error("bad port reference '{0}'")]
    BadPortReference(String),

    /// A connection or route names an object that is not in the patch.
    #[error("unknown object '{0}'")]
    UnknownObject(String),

    /// Unknown parameter name.
    #[error("unknown parameter '{param}' for '{object}'")]
    UnknownParameter {
        /// Object id.
        object: String,
        /// The unrecognized parameter.
        param: String,
    },

    /// Unknown inlet name.
    #[error("'{object}' has no inlet '{port}'")]
    UnknownInlet {
        /// Object id.
        object: String,
        /// Requested inlet.
        port: String,
    },

    /// Unknown outlet name.
    #[error("'{object}' has no outlet '{port}'")]
    UnknownOutlet {
        /// Object id.
        object: String,
        /// Requested outlet.
        port: String,
    },

    /// More than one connection targets the same inlet.
    #[error("inlet '{0}' is connected more than once")]
    InletConnectedTwice(String),

    /// Output route to a channel the engine does not have.
    #[error("output channel {channel} out of range ({count} channels)")]
    OutputChannelOutOfRange {
        /// Requested channel.
        channel: usize,
        /// Configured output channels.
        count: usize,
    },

    /// A cache is asked to preload more objects than it may hold.
    #[error("cache '{cache}' cannot preload {preload} objects (capacity {capacity})")]
    PreloadExceedsCapacity {
        /// Cache name.
        cache: String,
        /// Requested preload.
        preload: usize,
        /// Configured capacity.
        capacity: usize,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates patches against a registry.
pub struct PatchValidator<'a> {
    registry: &'a ObjectRegistry,
}

impl<'a> PatchValidator<'a> {
    /// Create a validator backed by `registry`.
    pub fn new(registry: &'a ObjectRegistry) -> Self {
        Self { registry }
    }

    /// Validate that a kind exists.
    pub fn validate_kind(&self, object: &str, kind: &str) -> ValidationResult<&'a ObjectDescriptor> {
        self.registry
            .get(kind)
            .ok_or_else(|| ValidationError::UnknownKind {
                object: object.to_string(),
                kind: kind.to_string(),
            })
    }

    /// Validate a whole patch, collecting every problem found.
    pub fn validate(&self, patch: &Patch) -> ValidationResult<()> {
        let mut errors = Vec::new();
        if let Err(e) = patch.engine.validate() {
            errors.push(e);
        }

        let objects = self.collect_objects(patch, &mut errors);

        let mut fed = HashSet::new();
        for connection in &patch.connections {
            if let Err(e) = check_port(&objects, &connection.from, Direction::Out) {
                errors.push(e);
            }
            match check_port(&objects, &connection.to, Direction::In) {
                Ok(()) => {
                    if !fed.insert(&connection.to) {
                        errors.push(ValidationError::InletConnectedTwice(connection.to.to_string()));
                    }
                }
                Err(e) => errors.push(e),
            }
        }

        let count = patch.engine.output_channels;
        for route in &patch.outputs {
            if route.channel >= count {
                errors.push(ValidationError::OutputChannelOutOfRange {
                    channel: route.channel,
                    count,
                });
            }
            if let Err(e) = check_port(&objects, &route.from, Direction::Out) {
                errors.push(e);
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }

    /// Maps every referable id, declared or preloaded, to its descriptor.
    fn collect_objects(
        &self,
        patch: &Patch,
        errors: &mut Vec<ValidationError>,
    ) -> HashMap<String, Option<&'a ObjectDescriptor>> {
        let mut objects = HashMap::new();
        let mut declare = |id: String, desc: Option<&'a ObjectDescriptor>, errors: &mut Vec<ValidationError>| {
            if id.is_empty() || id.contains('.') || id.contains("->") {
                errors.push(ValidationError::InvalidObjectId(id));
            } else if objects.contains_key(&id) {
                errors.push(ValidationError::DuplicateObject(id));
            } else {
                objects.insert(id, desc);
            }
        };

        for object in &patch.objects {
            let desc = match self.validate_kind(&object.id, &object.kind) {
                Ok(desc) => {
                    for param in object.params.keys() {
                        if !desc.has_parameter(param) {
                            errors.push(ValidationError::UnknownParameter {
                                object: object.id.clone(),
                                param: param.clone(),
                            });
                        }
                    }
                    Some(desc)
                }
                Err(e) => {
                    errors.push(e);
                    None
                }
            };
            declare(object.id.clone(), desc, errors);
        }

        for cache in &patch.caches {
            if cache.preload > cache.capacity {
                errors.push(ValidationError::PreloadExceedsCapacity {
                    cache: cache.name.clone(),
                    preload: cache.preload,
                    capacity: cache.capacity,
                });
            }
            let desc = match self.validate_kind(&cache.name, &cache.kind) {
                Ok(desc) => Some(desc),
                Err(e) => {
                    errors.push(e);
                    None
                }
            };
            for id in cache.preloaded_ids() {
                declare(id, desc, errors);
            }
        }
        objects
    }
}

#[derive(Clone, Copy)]
enum Direction {
    In,
    Out,
}

/// Objects whose kind failed to resolve are skipped; they were already
/// reported.
fn check_port(
    objects: &HashMap<String, Option<&ObjectDescriptor>>,
    port: &PortRef,
    direction: Direction,
) -> ValidationResult<()> {
    let Some(desc) = objects.get(&port.object) else {
        return Err(ValidationError::UnknownObject(port.object.clone()));
    };
    let Some(desc) = desc else {
        return Ok(());
    };
    match direction {
        Direction::In if !desc.has_inlet(&port.port) => Err(ValidationError::UnknownInlet {
            object: port.object.clone(),
            port: port.port.clone(),
        }),
        Direction::Out if !desc.has_outlet(&port.port) => Err(ValidationError::UnknownOutlet {
            object: port.object.clone(),
            port: port.port.clone(),
        }),
        _ => Ok(()),
    }
}

/// Validate a patch against the built-in registry.
pub fn validate_patch(patch: &Patch) -> ValidationResult<()> {
    let registry = ObjectRegistry::new();
    PatchValidator::new(&registry).validate(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{Connection, ObjectConfig};
    use crate::settings::{CacheSettings, EngineSettings};

    fn tone() -> Patch {
        Patch::new("Tone")
            .with_object(ObjectConfig::new("osc", "sine").with_param("Frequency", 220.0))
            .with_object(ObjectConfig::new("amp", "gain"))
            .with_connection(Connection::new(
                PortRef::new("osc", "Out"),
                PortRef::new("amp", "In"),
            ))
            .with_output(0, PortRef::new("amp", "Out"))
    }

    #[test]
    fn test_valid_patch() {
        assert!(validate_patch(&tone()).is_ok());
    }

    #[test]
    fn test_unknown_kind() {
        let patch = Patch::new("p").with_object(ObjectConfig::new("x", "nonexistent"));
        assert_eq!(
            validate_patch(&patch).unwrap_err(),
            ValidationError::UnknownKind {
                object: "x".into(),
                kind: "nonexistent".into()
            }
        );
    }

    #[test]
    fn test_unknown_parameter() {
        let patch = Patch::new("p").with_object(ObjectConfig::new("g", "gain").with_param("Drive", 1.0));
        assert_eq!(
            validate_patch(&patch).unwrap_err(),
            ValidationError::UnknownParameter {
                object: "g".into(),
                param: "Drive".into()
            }
        );
    }

    #[test]
    fn test_duplicate_and_invalid_ids() {
        let patch = Patch::new("p")
            .with_object(ObjectConfig::new("g", "gain"))
            .with_object(ObjectConfig::new("g", "gain"))
            .with_object(ObjectConfig::new("a.b", "gain"));
        match validate_patch(&patch).unwrap_err() {
            ValidationError::Multiple(errors) => {
                assert!(errors.contains(&ValidationError::DuplicateObject("g".into())));
                assert!(errors.contains(&ValidationError::InvalidObjectId("a.b".into())));
            }
            other => panic!("expected Multiple, got {other:?}"),
        }
    }

    #[test]
    fn test_port_checks() {
        let patch = tone()
            .with_connection("osc.In -> amp.Gain".parse().unwrap())
            .with_connection("ghost.Out -> amp.In".parse().unwrap());
        let ValidationError::Multiple(errors) = validate_patch(&patch).unwrap_err() else {
            panic!("expected several errors");
        };
        assert!(errors.contains(&ValidationError::UnknownOutlet {
            object: "osc".into(),
            port: "In".into()
        }));
        assert!(errors.contains(&ValidationError::UnknownInlet {
            object: "amp".into(),
            port: "Gain".into()
        }));
        assert!(errors.contains(&ValidationError::UnknownObject("ghost".into())));
    }

    #[test]
    fn test_inlet_connected_twice() {
        let patch = tone().with_connection("osc.Out -> amp.In".parse().unwrap());
        assert_eq!(
            validate_patch(&patch).unwrap_err(),
            ValidationError::InletConnectedTwice("amp.In".into())
        );
    }

    #[test]
    fn test_output_channel_range() {
        let patch = tone().with_engine(EngineSettings {
            output_channels: 1,
            ..EngineSettings::default()
        });
        assert!(validate_patch(&patch).is_ok());

        let patch = patch.with_output(1, PortRef::new("osc", "Out"));
        assert_eq!(
            validate_patch(&patch).unwrap_err(),
            ValidationError::OutputChannelOutOfRange { channel: 1, count: 1 }
        );
    }

    #[test]
    fn test_cache_ids_are_referable() {
        let patch = Patch::new("Voices")
            .with_object(ObjectConfig::new("mix", "mixer"))
            .with_cache(CacheSettings::new("voice", "sine").with_preload(2))
            .with_connection("voice0.Out -> mix.In1".parse().unwrap())
            .with_connection("voice1.Out -> mix.In2".parse().unwrap())
            .with_output(0, PortRef::new("mix", "Out"));
        assert!(validate_patch(&patch).is_ok());

        let patch = patch.with_connection("voice2.Out -> mix.In3".parse().unwrap());
        assert_eq!(
            validate_patch(&patch).unwrap_err(),
            ValidationError::UnknownObject("voice2".into())
        );
    }

    #[test]
    fn test_preload_over_capacity() {
        let patch = Patch::new("p").with_cache(
            CacheSettings::new("v", "sine")
                .with_limits(1, 2)
                .with_preload(3),
        );
        assert!(matches!(
            validate_patch(&patch).unwrap_err(),
            ValidationError::PreloadExceedsCapacity { preload: 3, capacity: 2, .. }
        ));
    }

    #[test]
    fn test_invalid_engine() {
        let patch = tone().with_engine(EngineSettings {
            frame_length: 1,
            ..EngineSettings::default()
        });
        assert!(matches!(
            validate_patch(&patch).unwrap_err(),
            ValidationError::InvalidEngine(_)
        ));
    }

    #[test]
    fn test_multiple_display() {
        let err = ValidationError::Multiple(vec![
            ValidationError::DuplicateObject("a".into()),
            ValidationError::UnknownObject("b".into()),
        ]);
        assert_eq!(
            err.to_string(),
            "multiple validation errors: duplicate object id 'a'; unknown object 'b'"
        );
    }
}
