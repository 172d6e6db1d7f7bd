//! Engine settings and patch files for the ondule runtime.
//!
//! A patch is a TOML file naming catalog objects, their initial parameter
//! values, the links between their ports and the routes to the hardware
//! output. This crate loads and saves patches, validates them against the
//! [`ObjectRegistry`](ondule_objects::ObjectRegistry) and instantiates them
//! onto a running [`Engine`](ondule_core::Engine).
//!
//! # Features
//!
//! - **Patches**: load and save [`Patch`] files from TOML
//! - **Settings**: [`EngineSettings`] converted into the runtime's `EngineConfig`
//! - **Validation**: kinds, ids, parameters, ports and output routes
//! - **Instantiation**: live objects, compiled order and scheduled tasks
//! - **Factory Patches**: built-in patches that always exist
//!
//! # Example
//!
//! ```rust,no_run
//! use ondule_config::Patch;
//! use ondule_objects::ObjectRegistry;
//!
//! let patch = Patch::load("tone.toml").unwrap();
//! let live = patch.instantiate(&ObjectRegistry::new()).unwrap();
//! for object in &live.compilation().order {
//!     println!("{}", object.name());
//! }
//! let samples = live.render(750);
//! ```

mod error;
mod instantiate;
mod patch;
mod settings;

/// Patch validation.
pub mod validation;

/// Factory patches bundled with the library.
pub mod factory_patches;

pub use error::ConfigError;
pub use factory_patches::{factory_patch_names, factory_patches, get_factory_patch, is_factory_patch};
pub use instantiate::LivePatch;
pub use patch::{Connection, ObjectConfig, OutputRoute, Patch, PortRef};
pub use settings::{CacheSettings, EngineSettings};
pub use validation::{PatchValidator, ValidationError, ValidationResult, validate_patch};
