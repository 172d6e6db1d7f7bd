//! Ondule Core - dataflow-graph runtime for real-time audio
//!
//! This crate provides the runtime that turns a network of processing objects
//! into a frame-by-frame schedule, built so that one audio thread keeps
//! running while control threads edit the live graph.
//!
//! # Core Abstractions
//!
//! ## Ports and Controls
//!
//! - [`Outlet`] / [`Inlet`] - Directional audio ports; an outlet owns a
//!   [`FrameBuffer`], an inlet reads one upstream outlet
//! - [`Parameter`] - Smoothed scalar control with leader/follower ties
//! - [`OptionValue`] - Integer control with bit-flag helpers
//!
//! ## Objects and Units
//!
//! - [`Object`] - Inlets, outlets, parameters and options around one
//!   [`Processor`]
//! - [`Unit`] - Small DAG of objects with numbered channel inputs and outputs
//! - [`GraphCompiler`] - Orders a possibly cyclic object set for processing
//!
//! ## Scheduling
//!
//! - [`TaskScheduler`] - Priority-ordered task list with transactions
//! - [`UnitChain`] - Serial chain of units with bypass and mute fades
//! - [`ObjectList`] - Flat list of objects in a fixed order
//! - [`ConnectionQueue`] - Port edits deferred to the audio thread
//! - [`ObjectCache`] - Pool of recyclable objects
//! - [`InputTask`] / [`OutputTask`] - Hardware frame pumps
//! - [`Engine`] - Scheduler plus the standard tasks
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ondule_core::{Engine, EngineConfig, GraphCompiler, Object, ObjectIo, ObjectList, connect};
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! let ctx = engine.context();
//!
//! let source = Object::builder("source", ctx)
//!     .outlet("Out")
//!     .build(|io: &ObjectIo<'_>| io.outlet(0).buffer().fill(1.0));
//! let gain = Object::builder("gain", ctx)
//!     .inlet("In")
//!     .outlet("Out")
//!     .parameter("Gain", 0.5)
//!     .build(|io: &ObjectIo<'_>| {
//!         let input = io.inlet(0).buffer();
//!         let g = io.parameter(0).value();
//!         for i in 0..io.frame_length() {
//!             io.outlet(0).buffer().set(i, input.get(i) * g);
//!         }
//!     });
//! connect(&source, "Out", &gain, "In").unwrap();
//! engine.output().inlet(0).unwrap().connect(gain.outlet("Out").unwrap());
//!
//! let list = Arc::new(ObjectList::new("patch"));
//! list.set_order(&GraphCompiler::new().compile(&[gain.clone(), source.clone()]).order);
//! engine.scheduler().add(list);
//!
//! let out = engine.render(1);
//! assert_eq!(out[0], 0.5);
//! ```
//!
//! # Design Principles
//!
//! - **Lock-free reads**: frame buffers are atomics, inlet links are `ArcSwap`
//! - **Owned links**: an inlet holds its upstream outlet; subscribers are weak
//! - **No singletons**: frame length, the silent frame and object ids live in
//!   an explicit [`AudioContext`]
//! - **Errors at the edges**: control calls return [`Result`]; the audio
//!   thread never fails

pub mod compiler;
pub mod context;
pub mod engine;
pub mod error;
pub mod frame;
pub mod object;
pub mod option;
pub mod param;
pub mod port;
pub mod tasks;
pub mod unit;

// Re-export main types at crate root
pub use compiler::{Compilation, GraphCompiler};
pub use context::{
    AudioContext, DEFAULT_FRAME_LENGTH, DEFAULT_SAMPLE_RATE, DEFAULT_SMOOTHING_FRAMES,
    EngineConfig, MAX_FRAME_LENGTH, SUPPORTED_SAMPLE_RATES,
};
pub use engine::Engine;
pub use error::{Error, Result};
pub use frame::{FrameBuffer, LinearRamp};
pub use object::{Object, ObjectBuilder, ObjectId, ObjectIo, Processor, connect};
pub use option::OptionValue;
pub use param::Parameter;
pub use port::{Inlet, InletBuffer, Outlet, Port, connect_ports};
pub use tasks::{
    ChainGuard, ConnectionQueue, FrameIo, InputTask, ObjectCache, ObjectList, OutputTask,
    QueueState, Task, TaskScheduler, Transaction, UnitChain, priority,
};
pub use unit::Unit;
