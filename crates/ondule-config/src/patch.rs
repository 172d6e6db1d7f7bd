//! Patch files: a graph of catalog objects, its wiring and its routes to the
//! hardware output.
//!
//! ```toml
//! name = "Tone"
//! connections = ["osc.Out -> amp.In"]
//!
//! [engine]
//! frame_length = 64
//!
//! [[objects]]
//! id = "osc"
//! kind = "sine"
//! [objects.params]
//! Frequency = 220.0
//!
//! [[objects]]
//! id = "amp"
//! kind = "gain"
//! [objects.params]
//! Gain = 0.5
//!
//! [[outputs]]
//! channel = 0
//! from = "amp.Out"
//! ```
//!
//! Top-level keys such as `connections` must come before the first table.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::settings::{CacheSettings, EngineSettings};
use crate::validation::ValidationError;

/// A port on a patch object, written `object.Port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortRef {
    /// Patch id of the object.
    pub object: String,
    /// Port name on that object.
    pub port: String,
}

impl PortRef {
    /// Create a port reference.
    pub fn new(object: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            port: port.into(),
        }
    }
}

impl FromStr for PortRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ValidationError::BadPortReference(s.to_string());
        let (object, port) = s.trim().rsplit_once('.').ok_or_else(bad)?;
        if object.is_empty() || port.is_empty() {
            return Err(bad());
        }
        Ok(Self::new(object, port))
    }
}

impl TryFrom<String> for PortRef {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PortRef> for String {
    fn from(port: PortRef) -> Self {
        port.to_string()
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object, self.port)
    }
}

/// A link from an outlet to an inlet, written `a.Out -> b.In`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Connection {
    /// Source outlet.
    pub from: PortRef,
    /// Destination inlet.
    pub to: PortRef,
}

impl Connection {
    /// Create a connection.
    pub fn new(from: PortRef, to: PortRef) -> Self {
        Self { from, to }
    }
}

impl FromStr for Connection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once("->")
            .ok_or_else(|| ValidationError::BadPortReference(s.to_string()))?;
        Ok(Self::new(from.parse()?, to.parse()?))
    }
}

impl TryFrom<String> for Connection {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Connection> for String {
    fn from(connection: Connection) -> Self {
        connection.to_string()
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Sends an outlet to a hardware output channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRoute {
    /// Hardware output channel.
    pub channel: usize,
    /// Outlet feeding the channel.
    pub from: PortRef,
}

/// One `[[objects]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectConfig {
    /// Unique id within the patch; also the object's name.
    pub id: String,
    /// Registry kind.
    pub kind: String,
    /// Initial parameter values, applied without smoothing.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, f32>,
    /// Initial option values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, i32>,
}

impl ObjectConfig {
    /// Create an object entry with no parameter overrides.
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            params: BTreeMap::new(),
            options: BTreeMap::new(),
        }
    }

    /// Builder: set a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: f32) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Builder: set an option.
    pub fn with_option(mut self, name: impl Into<String>, value: i32) -> Self {
        self.options.insert(name.into(), value);
        self
    }
}

/// A complete patch.
///
/// # Example
///
/// ```rust
/// use ondule_config::{Connection, ObjectConfig, Patch, PortRef};
///
/// let patch = Patch::new("Tone")
///     .with_object(ObjectConfig::new("osc", "sine").with_param("Frequency", 220.0))
///     .with_object(ObjectConfig::new("amp", "gain").with_param("Gain", 0.5))
///     .with_connection("osc.Out -> amp.In".parse().unwrap())
///     .with_output(0, PortRef::new("amp", "Out"));
///
/// let toml = patch.to_toml().unwrap();
/// assert_eq!(Patch::from_toml(&toml).unwrap(), patch);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// Patch name.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Links between objects.
    #[serde(default)]
    pub connections: Vec<Connection>,

    /// Engine settings.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Objects, in the order they are built.
    #[serde(default)]
    pub objects: Vec<ObjectConfig>,

    /// Routes to the hardware output.
    #[serde(default)]
    pub outputs: Vec<OutputRoute>,

    /// Object pools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caches: Vec<CacheSettings>,
}

impl Patch {
    /// Create an empty patch with default engine settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            connections: Vec::new(),
            engine: EngineSettings::default(),
            objects: Vec::new(),
            outputs: Vec::new(),
            caches: Vec::new(),
        }
    }

    /// Load a patch from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&contents)
    }

    /// Parse a patch from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the patch to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::create_dir(parent, e))?;
            }
        }
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Serialize the patch to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Builder: set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder: set the engine settings.
    pub fn with_engine(mut self, engine: EngineSettings) -> Self {
        self.engine = engine;
        self
    }

    /// Builder: add an object.
    pub fn with_object(mut self, object: ObjectConfig) -> Self {
        self.objects.push(object);
        self
    }

    /// Builder: add a connection.
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    /// Builder: route an outlet to a hardware output channel.
    pub fn with_output(mut self, channel: usize, from: PortRef) -> Self {
        self.outputs.push(OutputRoute { channel, from });
        self
    }

    /// Builder: add an object pool.
    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.caches.push(cache);
        self
    }

    /// Find an object entry by id.
    pub fn object(&self, id: &str) -> Option<&ObjectConfig> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Number of objects declared directly (not counting cache preloads).
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if the patch declares no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for Patch {
    fn default() -> Self {
        Self::new("Untitled")
    }
}
