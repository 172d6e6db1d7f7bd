//! Objects: the unit of per-frame computation.
//!
//! An [`Object`] bundles inlets, outlets, parameters and options with a
//! [`Processor`] that does the actual DSP. Objects are built once through
//! [`Object::builder`], shared as `Arc<Object>`, and wired together with
//! [`connect`]. Each frame, the task that owns an object calls
//! [`update_parameters`](Object::update_parameters) then
//! [`process`](Object::process).
//!
//! ```rust
//! use ondule_core::{AudioContext, Object, ObjectIo, connect};
//!
//! let ctx = AudioContext::with_defaults();
//! let source = Object::builder("source", &ctx)
//!     .outlet("Out")
//!     .build(|io: &ObjectIo<'_>| io.outlet(0).buffer().fill(1.0));
//! let gain = Object::builder("gain", &ctx)
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
//!
//! connect(&source, "Out", &gain, "In").unwrap();
//! source.process();
//! gain.process();
//! assert_eq!(gain.outlet("Out").unwrap().buffer().get(0), 0.5);
//! ```

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::context::AudioContext;
use crate::error::{Error, Result};
use crate::option::OptionValue;
use crate::param::Parameter;
use crate::port::{Inlet, Outlet};

/// Unique identifier for an object within one [`AudioContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    /// Raw id value.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The DSP behind an [`Object`].
///
/// Implementations read inlets and parameters and write outlets through the
/// [`ObjectIo`] view. `process` runs on the audio thread: it must not block,
/// allocate, or panic.
pub trait Processor: Send {
    /// Computes one frame.
    fn process(&mut self, io: &ObjectIo<'_>);

    /// Called by the graph compiler before ordering. Default does nothing.
    fn compile(&mut self, _io: &ObjectIo<'_>) {}

    /// Clears internal state so the object can be reused.
    fn reset(&mut self) {}
}

impl<F> Processor for F
where
    F: FnMut(&ObjectIo<'_>) + Send,
{
    fn process(&mut self, io: &ObjectIo<'_>) {
        self(io);
    }
}

/// Borrowed view of an object's ports and values, handed to its processor.
///
/// Index accessors panic on an out-of-range index; processors address only
/// the ports they declared in their builder.
pub struct ObjectIo<'a> {
    inlets: &'a [Arc<Inlet>],
    outlets: &'a [Arc<Outlet>],
    parameters: &'a [Arc<Parameter>],
    options: &'a [Arc<OptionValue>],
    frame_length: usize,
}

impl<'a> ObjectIo<'a> {
    /// Samples per frame.
    #[inline]
    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    /// Inlet `i`.
    #[inline]
    pub fn inlet(&self, i: usize) -> &'a Inlet {
        &self.inlets[i]
    }

    /// Outlet `i`.
    #[inline]
    pub fn outlet(&self, i: usize) -> &'a Outlet {
        &self.outlets[i]
    }

    /// Parameter `i`.
    #[inline]
    pub fn parameter(&self, i: usize) -> &'a Parameter {
        &self.parameters[i]
    }

    /// Option `i`.
    #[inline]
    pub fn option(&self, i: usize) -> &'a OptionValue {
        &self.options[i]
    }

    /// All inlets.
    #[inline]
    pub fn inlets(&self) -> &'a [Arc<Inlet>] {
        self.inlets
    }

    /// All outlets.
    #[inline]
    pub fn outlets(&self) -> &'a [Arc<Outlet>] {
        self.outlets
    }
}

/// A schedulable computation with named ports, parameters and options.
pub struct Object {
    id: ObjectId,
    name: String,
    frame_length: usize,
    inlets: Vec<Arc<Inlet>>,
    outlets: Vec<Arc<Outlet>>,
    parameters: Vec<Arc<Parameter>>,
    options: Vec<Arc<OptionValue>>,
    processor: Mutex<Box<dyn Processor>>,
    scheduled: AtomicBool,
    is_input: AtomicBool,
    is_output: AtomicBool,
}

impl Object {
    /// Starts building an object named `name`.
    pub fn builder<'a>(name: impl Into<String>, ctx: &'a AudioContext) -> ObjectBuilder<'a> {
        ObjectBuilder {
            ctx,
            name: name.into(),
            inlets: Vec::new(),
            outlets: Vec::new(),
            parameters: Vec::new(),
            options: Vec::new(),
            is_input: false,
            is_output: false,
        }
    }

    /// Unique id.
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Object name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn io(&self) -> ObjectIo<'_> {
        ObjectIo {
            inlets: &self.inlets,
            outlets: &self.outlets,
            parameters: &self.parameters,
            options: &self.options,
            frame_length: self.frame_length,
        }
    }

    /// Runs the processor for one frame.
    pub fn process(&self) {
        self.processor.lock().process(&self.io());
    }

    /// Advances every parameter's smoothing by one frame.
    pub fn update_parameters(&self) {
        for p in &self.parameters {
            p.update();
        }
    }

    /// Runs the processor's compile hook.
    pub fn compile(&self) {
        self.processor.lock().compile(&self.io());
    }

    /// Clears the processor's internal state.
    pub fn reset(&self) {
        self.processor.lock().reset();
    }

    /// Inlet by name.
    pub fn inlet(&self, name: &str) -> Option<&Arc<Inlet>> {
        self.inlets.iter().find(|p| p.name() == name)
    }

    /// Outlet by name.
    pub fn outlet(&self, name: &str) -> Option<&Arc<Outlet>> {
        self.outlets.iter().find(|p| p.name() == name)
    }

    /// Parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&Arc<Parameter>> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    /// Option by name.
    pub fn option(&self, name: &str) -> Option<&Arc<OptionValue>> {
        self.options.iter().find(|p| p.name() == name)
    }

    /// Inlet by index.
    pub fn inlet_at(&self, i: usize) -> Option<&Arc<Inlet>> {
        self.inlets.get(i)
    }

    /// Outlet by index.
    pub fn outlet_at(&self, i: usize) -> Option<&Arc<Outlet>> {
        self.outlets.get(i)
    }

    /// Parameter by index.
    pub fn parameter_at(&self, i: usize) -> Option<&Arc<Parameter>> {
        self.parameters.get(i)
    }

    /// Option by index.
    pub fn option_at(&self, i: usize) -> Option<&Arc<OptionValue>> {
        self.options.get(i)
    }

    /// All inlets in declaration order.
    pub fn inlets(&self) -> &[Arc<Inlet>] {
        &self.inlets
    }

    /// All outlets in declaration order.
    pub fn outlets(&self) -> &[Arc<Outlet>] {
        &self.outlets
    }

    /// All parameters in declaration order.
    pub fn parameters(&self) -> &[Arc<Parameter>] {
        &self.parameters
    }

    /// All options in declaration order.
    pub fn options(&self) -> &[Arc<OptionValue>] {
        &self.options
    }

    /// Number of inlets.
    pub fn inlet_count(&self) -> usize {
        self.inlets.len()
    }

    /// Number of outlets.
    pub fn outlet_count(&self) -> usize {
        self.outlets.len()
    }

    /// Number of parameters.
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Number of options.
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    fn require_parameter(&self, name: &str) -> Result<&Arc<Parameter>> {
        self.parameter(name).ok_or_else(|| Error::UnknownParameter {
            object: self.name.clone(),
            name: name.to_string(),
        })
    }

    fn require_option(&self, name: &str) -> Result<&Arc<OptionValue>> {
        self.option(name).ok_or_else(|| Error::UnknownOption {
            object: self.name.clone(),
            name: name.to_string(),
        })
    }

    /// Hard-sets the named parameter.
    pub fn hard_set(&self, name: &str, value: f32) -> Result<()> {
        self.require_parameter(name)?.hard_set(value);
        Ok(())
    }

    /// Soft-sets the named parameter.
    pub fn soft_set(&self, name: &str, value: f32) -> Result<()> {
        self.require_parameter(name)?.soft_set(value);
        Ok(())
    }

    /// Restores the named parameter using its deserialize mode.
    pub fn deserialize_parameter(&self, name: &str, value: f32) -> Result<()> {
        self.require_parameter(name)?.deserialize(value);
        Ok(())
    }

    /// Sets the named option.
    pub fn set_option_value(&self, name: &str, value: i32) -> Result<()> {
        self.require_option(name)?.set(value);
        Ok(())
    }

    /// Reads the named option.
    pub fn option_value(&self, name: &str) -> Result<i32> {
        Ok(self.require_option(name)?.value())
    }

    /// True if any parameter wants persisting.
    pub fn has_parameters_to_serialize(&self) -> bool {
        self.parameters.iter().any(|p| p.is_serialization_needed())
    }

    /// True if any option wants persisting.
    pub fn has_options_to_serialize(&self) -> bool {
        self.options.iter().any(|o| o.is_serialization_needed())
    }

    /// Holds every parameter and option.
    pub fn hold(&self) {
        for p in &self.parameters {
            p.hold();
        }
        for o in &self.options {
            o.hold();
        }
    }

    /// Releases every parameter and option.
    pub fn unhold(&self) {
        for p in &self.parameters {
            p.unhold();
        }
        for o in &self.options {
            o.unhold();
        }
    }

    /// True while some task or unit schedules this object.
    pub fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::Relaxed)
    }

    pub(crate) fn set_scheduled(&self, value: bool) {
        self.scheduled.store(value, Ordering::Relaxed);
    }

    /// True if this object receives a unit's channel inputs.
    pub fn is_unit_input(&self) -> bool {
        self.is_input.load(Ordering::Relaxed)
    }

    /// True if this object drives a unit's channel outputs.
    pub fn is_unit_output(&self) -> bool {
        self.is_output.load(Ordering::Relaxed)
    }

    pub(crate) fn set_unit_input(&self, value: bool) {
        self.is_input.store(value, Ordering::Relaxed);
    }

    pub(crate) fn set_unit_output(&self, value: bool) {
        self.is_output.store(value, Ordering::Relaxed);
    }

    /// Owners of the outlets feeding this object's inlets, duplicates included.
    pub fn upstream_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.inlets
            .iter()
            .filter_map(|inlet| inlet.upstream().and_then(|outlet| outlet.owner()))
    }

    /// Disconnects every port and unties every value.
    ///
    /// A wired object stays alive through the inlets it feeds; this is how
    /// feedback loops between objects are released.
    pub fn disconnect_all(&self) {
        for inlet in &self.inlets {
            inlet.disconnect();
        }
        for outlet in &self.outlets {
            outlet.disconnect();
        }
        for p in &self.parameters {
            p.untie();
        }
        for o in &self.options {
            o.untie();
        }
    }
}

impl Drop for Object {
    fn drop(&mut self) {
        // Wired downstream inlets keep us alive, so only upstream links remain.
        for inlet in &self.inlets {
            inlet.disconnect();
        }
        for p in &self.parameters {
            p.untie();
        }
        for o in &self.options {
            o.untie();
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("inlets", &self.inlets.len())
            .field("outlets", &self.outlets.len())
            .field("parameters", &self.parameters.len())
            .field("options", &self.options.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Object`].
pub struct ObjectBuilder<'a> {
    ctx: &'a AudioContext,
    name: String,
    inlets: Vec<String>,
    outlets: Vec<String>,
    parameters: Vec<(String, f32, Option<u32>)>,
    options: Vec<(String, i32)>,
    is_input: bool,
    is_output: bool,
}

impl ObjectBuilder<'_> {
    /// Adds an inlet.
    pub fn inlet(mut self, name: impl Into<String>) -> Self {
        self.inlets.push(name.into());
        self
    }

    /// Adds an outlet.
    pub fn outlet(mut self, name: impl Into<String>) -> Self {
        self.outlets.push(name.into());
        self
    }

    /// Adds a parameter with the context's default smoothing.
    pub fn parameter(mut self, name: impl Into<String>, initial: f32) -> Self {
        self.parameters.push((name.into(), initial, None));
        self
    }

    /// Adds a parameter that ramps over `frames` updates.
    pub fn smoothed_parameter(mut self, name: impl Into<String>, initial: f32, frames: u32) -> Self {
        self.parameters.push((name.into(), initial, Some(frames)));
        self
    }

    /// Adds an option.
    pub fn option(mut self, name: impl Into<String>, initial: i32) -> Self {
        self.options.push((name.into(), initial));
        self
    }

    /// Marks the object as a unit input (a compile root).
    pub fn unit_input(mut self) -> Self {
        self.is_input = true;
        self
    }

    /// Marks the object as a unit output.
    pub fn unit_output(mut self) -> Self {
        self.is_output = true;
        self
    }

    /// Finishes the object with `processor`.
    pub fn build(self, processor: impl Processor + 'static) -> Arc<Object> {
        let id = self.ctx.next_object_id();
        let smoothing = self.ctx.config().smoothing_frames;
        let ctx = self.ctx;
        Arc::new_cyclic(|object| Object {
            id,
            name: self.name,
            frame_length: ctx.frame_length(),
            inlets: self
                .inlets
                .into_iter()
                .enumerate()
                .map(|(i, name)| Inlet::owned(ctx, name, i, id))
                .collect(),
            outlets: self
                .outlets
                .into_iter()
                .enumerate()
                .map(|(i, name)| Outlet::owned(ctx, name, i, id, Weak::clone(object)))
                .collect(),
            parameters: self
                .parameters
                .into_iter()
                .map(|(name, initial, frames)| {
                    Parameter::with_smoothing(name, initial, frames.unwrap_or(smoothing))
                })
                .collect(),
            options: self
                .options
                .into_iter()
                .map(|(name, initial)| OptionValue::new(name, initial))
                .collect(),
            processor: Mutex::new(Box::new(processor)),
            scheduled: AtomicBool::new(false),
            is_input: AtomicBool::new(self.is_input),
            is_output: AtomicBool::new(self.is_output),
        })
    }
}

/// Connects `from`'s outlet to `to`'s inlet by name.
///
/// # Errors
///
/// Returns [`Error::UnknownOutlet`] or [`Error::UnknownInlet`] if either name
/// does not exist; nothing is changed in that case.
pub fn connect(from: &Object, outlet: &str, to: &Object, inlet: &str) -> Result<()> {
    let out = from.outlet(outlet).ok_or_else(|| Error::UnknownOutlet {
        object: from.name.clone(),
        port: outlet.to_string(),
    })?;
    let inp = to.inlet(inlet).ok_or_else(|| Error::UnknownInlet {
        object: to.name.clone(),
        port: inlet.to_string(),
    })?;
    inp.connect(out);
    #[cfg(feature = "tracing")]
    tracing::debug!("connect: {}.{outlet} → {}.{inlet}", from.name, to.name);
    Ok(())
}
