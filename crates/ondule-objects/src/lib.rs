//! Leaf objects and registry for the ondule runtime.
//!
//! This crate provides the concrete processors that sit at the leaves of an
//! ondule graph, plus a registry for building them by kind name, which is how
//! patch files refer to them.
//!
//! # Catalog
//!
//! | kind | type | ports |
//! |------|------|-------|
//! | `sine` | [`SineSource`] | → `Out` |
//! | `ramp` | [`RampSource`] | → `Out` |
//! | `constant` | [`Constant`] | → `Out` |
//! | `gain` | [`Gain`] | `In` → `Out` |
//! | `gainbias` | [`GainBias`] | `In` → `Out` |
//! | `multiply` | [`Multiply`] | `Left`, `Right` → `Out` |
//! | `mixer` | [`Mixer`] | `In1`…`In4` → `Out` |
//! | `panner` | [`StereoPanner`] | `Left`, `Right`, `Pan` → `Left`, `Right` |
//! | `sink` | [`Sink`] | `In` → |
//! | `minmax` | [`MinMax`] | `In` → |
//!
//! # Example
//!
//! ```rust
//! use ondule_core::{AudioContext, GraphCompiler, connect};
//! use ondule_objects::{ObjectRegistry, Sink};
//!
//! let ctx = AudioContext::with_defaults();
//! let registry = ObjectRegistry::new();
//! let source = registry.create("ramp", &ctx, "src").unwrap();
//! let gain = registry.create("gain", &ctx, "gain").unwrap();
//! let (sink, capture) = Sink::capturing(&ctx, "sink");
//! gain.hard_set("Gain", 0.5).unwrap();
//! connect(&source, "Out", &gain, "In").unwrap();
//! connect(&gain, "Out", &sink, "In").unwrap();
//!
//! for object in GraphCompiler::new().compile(&[sink, gain, source]).order {
//!     object.update_parameters();
//!     object.process();
//! }
//! assert_eq!(capture.snapshot()[2], 1.0);
//! ```

pub mod math;
pub mod measurement;
pub mod mixing;
pub mod registry;
pub mod sources;

pub use math::{Constant, Gain, GainBias, Multiply};
pub use measurement::{Capture, MinMax, REFRESH_PERIOD, Sink};
pub use mixing::{Mixer, StereoPanner};
pub use registry::{ObjectCategory, ObjectDescriptor, ObjectFactory, ObjectRegistry};
pub use sources::{RampSource, SineSource};
