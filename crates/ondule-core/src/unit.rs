//! Units: small object graphs with numbered channel ports.
//!
//! A [`Unit`] owns a handful of objects wired into a DAG and exposes them
//! through channel-indexed inputs and outputs, so two unrelated graphs can be
//! joined with [`Unit::connect`] without knowing each other's internals.
//! Each channel input may fan out to several internal inlets; each channel
//! output is exactly one internal outlet.
//!
//! A unit does not schedule itself: a [`UnitChain`](crate::UnitChain) or
//! another task calls [`Unit::process`] once per frame.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::compiler::{Compilation, GraphCompiler};
use crate::error::{Error, Result};
use crate::object::{Object, ObjectId};
use crate::port::{Inlet, Outlet};

#[derive(Debug, Default)]
struct Graph {
    objects: Vec<Arc<Object>>,
    order: Vec<Arc<Object>>,
    inputs: Vec<Vec<Arc<Inlet>>>,
    outputs: Vec<Option<Arc<Outlet>>>,
}

#[derive(Debug, Clone, Copy)]
struct Switches {
    enabled: bool,
    bypass: bool,
    locked: bool,
    saved_enabled: bool,
}

/// A named DAG of objects with channel inputs and outputs.
pub struct Unit {
    name: String,
    graph: Mutex<Graph>,
    switches: Mutex<Switches>,
}

impl Unit {
    /// Creates a unit with `channels` inputs and outputs.
    ///
    /// A unit with zero input channels is a source; it still gets one output.
    pub fn new(name: impl Into<String>, channels: usize) -> Arc<Self> {
        Self::with_channels(name, channels, channels.max(1))
    }

    /// Creates a unit with separate input and output channel counts.
    pub fn with_channels(name: impl Into<String>, inputs: usize, outputs: usize) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            graph: Mutex::new(Graph {
                inputs: vec![Vec::new(); inputs],
                outputs: vec![None; outputs],
                ..Graph::default()
            }),
            switches: Mutex::new(Switches {
                enabled: true,
                bypass: false,
                locked: false,
                saved_enabled: false,
            }),
        })
    }

    /// Unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of input channels.
    pub fn input_count(&self) -> usize {
        self.graph.lock().inputs.len()
    }

    /// Number of output channels.
    pub fn output_count(&self) -> usize {
        self.graph.lock().outputs.len()
    }

    /// Adds an object. The unit keeps it alive until removed or dropped.
    pub fn add_object(&self, object: &Arc<Object>) {
        let mut graph = self.graph.lock();
        if !graph.objects.iter().any(|o| o.id() == object.id()) {
            graph.objects.push(Arc::clone(object));
        }
    }

    /// Removes an object and disconnects all of its ports.
    ///
    /// The object leaves the processing order immediately; call
    /// [`compile`](Self::compile) again to refresh it.
    pub fn remove_object(&self, id: ObjectId) -> Result<()> {
        let removed = {
            let mut graph = self.graph.lock();
            let pos = graph
                .objects
                .iter()
                .position(|o| o.id() == id)
                .ok_or(Error::NotAMember(id))?;
            graph.order.retain(|o| o.id() != id);
            for inlets in &mut graph.inputs {
                inlets.retain(|inlet| inlet.owner() != Some(id));
            }
            for output in &mut graph.outputs {
                if output.as_ref().is_some_and(|o| o.owner() == Some(id)) {
                    *output = None;
                }
            }
            graph.objects.remove(pos)
        };
        removed.disconnect_all();
        Ok(())
    }

    /// The unit's objects in insertion order.
    pub fn objects(&self) -> Vec<Arc<Object>> {
        self.graph.lock().objects.clone()
    }

    /// Routes input channel `channel` to `object`'s inlet `inlet`.
    ///
    /// A channel may feed several inlets. The object becomes a compile root.
    pub fn add_input(&self, channel: usize, object: &Arc<Object>, inlet: &str) -> Result<()> {
        let mut graph = self.graph.lock();
        let count = graph.inputs.len();
        let slot = graph
            .inputs
            .get_mut(channel)
            .ok_or_else(|| Error::ChannelOutOfRange {
                owner: self.name.clone(),
                channel,
                count,
            })?;
        let port = object.inlet(inlet).ok_or_else(|| Error::UnknownInlet {
            object: object.name().to_string(),
            port: inlet.to_string(),
        })?;
        slot.push(Arc::clone(port));
        object.set_unit_input(true);
        Ok(())
    }

    /// Drives output channel `channel` from `object`'s outlet `outlet`.
    pub fn set_output(&self, channel: usize, object: &Arc<Object>, outlet: &str) -> Result<()> {
        let port = object.outlet(outlet).ok_or_else(|| Error::UnknownOutlet {
            object: object.name().to_string(),
            port: outlet.to_string(),
        })?;
        self.install_output(channel, object, port)
    }

    /// Drives output channel `channel` from `object`'s outlet number `index`.
    pub fn set_output_at(&self, channel: usize, object: &Arc<Object>, index: usize) -> Result<()> {
        let port = object.outlet_at(index).ok_or_else(|| Error::UnknownOutlet {
            object: object.name().to_string(),
            port: index.to_string(),
        })?;
        self.install_output(channel, object, port)
    }

    fn install_output(&self, channel: usize, object: &Object, port: &Arc<Outlet>) -> Result<()> {
        let mut graph = self.graph.lock();
        let count = graph.outputs.len();
        let slot = graph
            .outputs
            .get_mut(channel)
            .ok_or_else(|| Error::ChannelOutOfRange {
                owner: self.name.clone(),
                channel,
                count,
            })?;
        *slot = Some(Arc::clone(port));
        object.set_unit_output(true);
        Ok(())
    }

    /// Outlet driving output channel `channel`.
    pub fn output(&self, channel: usize) -> Option<Arc<Outlet>> {
        self.graph.lock().outputs.get(channel).cloned().flatten()
    }

    /// Inlets fed by input channel `channel`.
    pub fn inputs(&self, channel: usize) -> Vec<Arc<Inlet>> {
        self.graph
            .lock()
            .inputs
            .get(channel)
            .cloned()
            .unwrap_or_default()
    }

    /// The outlet currently feeding input channel `channel`, read from its
    /// first inlet.
    pub fn inward_connection(&self, channel: usize) -> Option<Arc<Outlet>> {
        self.graph
            .lock()
            .inputs
            .get(channel)
            .and_then(|inlets| inlets.first())
            .and_then(|inlet| inlet.upstream())
    }

    /// True if no input channel feeds any inlet.
    pub fn is_source(&self) -> bool {
        self.graph.lock().inputs.iter().all(Vec::is_empty)
    }

    /// Disconnects every channel input inlet.
    pub fn disconnect(&self) {
        let graph = self.graph.lock();
        for inlet in graph.inputs.iter().flatten() {
            inlet.disconnect();
        }
    }

    /// Connects `upstream`'s outputs to `downstream`'s inputs channel by
    /// channel, over the channels both have.
    pub fn connect(upstream: &Unit, downstream: &Unit) {
        let outputs = upstream.graph.lock().outputs.clone();
        let graph = downstream.graph.lock();
        for (outlet, inlets) in outputs.iter().zip(&graph.inputs) {
            if let Some(outlet) = outlet {
                for inlet in inlets {
                    inlet.connect(outlet);
                }
            }
        }
    }

    /// Compiles the object graph and stores the processing order.
    ///
    /// Unresolved objects are logged and left out of the order.
    pub fn compile(&self) -> Compilation {
        let objects = self.objects();
        let result = GraphCompiler::new().compile(&objects);
        #[cfg(feature = "tracing")]
        for object in &result.unresolved {
            tracing::warn!("unit '{}': unresolved object '{}'", self.name, object.name());
        }
        let mut graph = self.graph.lock();
        for object in &graph.order {
            object.set_scheduled(false);
        }
        graph.order.clone_from(&result.order);
        for object in &graph.order {
            object.set_scheduled(true);
        }
        result
    }

    /// Ids of the current processing order.
    pub fn processing_order(&self) -> Vec<ObjectId> {
        self.graph.lock().order.iter().map(|o| o.id()).collect()
    }

    /// Runs one frame: each object in order updates its parameters then
    /// processes.
    pub fn process(&self) {
        let graph = self.graph.lock();
        for object in &graph.order {
            object.update_parameters();
            object.process();
        }
    }

    /// Sets the bypass flag. A bypassed unit is skipped when a chain rewires.
    pub fn set_bypass(&self, bypass: bool) {
        self.switches.lock().bypass = bypass;
    }

    /// Returns the bypass flag.
    pub fn bypass(&self) -> bool {
        self.switches.lock().bypass
    }

    /// Disables processing and remembers whether the unit was enabled.
    pub fn lock(&self) {
        let mut s = self.switches.lock();
        s.locked = true;
        s.saved_enabled = s.enabled;
        s.enabled = false;
    }

    /// Restores the enabled state saved by [`lock`](Self::lock), including
    /// any enable/disable issued while locked.
    pub fn unlock(&self) {
        let mut s = self.switches.lock();
        s.enabled = s.saved_enabled;
        s.locked = false;
    }

    /// Enables processing (deferred to unlock while locked).
    pub fn enable(&self) {
        let mut s = self.switches.lock();
        if s.locked {
            s.saved_enabled = true;
        } else {
            s.enabled = true;
        }
    }

    /// Disables processing (deferred to unlock while locked).
    pub fn disable(&self) {
        let mut s = self.switches.lock();
        if s.locked {
            s.saved_enabled = false;
        } else {
            s.enabled = false;
        }
    }

    /// True if a chain should process this unit.
    pub fn is_enabled(&self) -> bool {
        self.switches.lock().enabled
    }

    /// Holds every object's values.
    pub fn hold(&self) {
        for object in &self.graph.lock().objects {
            object.hold();
        }
    }

    /// Releases every object's values.
    pub fn unhold(&self) {
        for object in &self.graph.lock().objects {
            object.unhold();
        }
    }
}

impl Drop for Unit {
    fn drop(&mut self) {
        for object in &self.graph.get_mut().objects {
            object.set_scheduled(false);
            object.disconnect_all();
        }
    }
}

impl core::fmt::Debug for Unit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let graph = self.graph.lock();
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("objects", &graph.objects.len())
            .field("inputs", &graph.inputs.len())
            .field("outputs", &graph.outputs.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AudioContext;
    use crate::object::{ObjectIo, connect};

    fn scale(ctx: &AudioContext, name: &str, factor: f32) -> Arc<Object> {
        Object::builder(name, ctx)
            .inlet("In")
            .outlet("Out")
            .build(move |io: &ObjectIo<'_>| {
                let input = io.inlet(0).buffer();
                for i in 0..io.frame_length() {
                    io.outlet(0).buffer().set(i, input.get(i) * factor);
                }
            })
    }

    fn doubler_unit(ctx: &AudioContext, name: &str) -> Arc<Unit> {
        let unit = Unit::new(name, 1);
        let obj = scale(ctx, &format!("{name}.x2"), 2.0);
        unit.add_object(&obj);
        unit.add_input(0, &obj, "In").unwrap();
        unit.set_output(0, &obj, "Out").unwrap();
        unit.compile();
        unit
    }

    #[test]
    fn channel_errors() {
        let ctx = AudioContext::with_defaults();
        let unit = Unit::new("u", 1);
        let obj = scale(&ctx, "s", 1.0);
        assert!(matches!(
            unit.add_input(1, &obj, "In"),
            Err(Error::ChannelOutOfRange { channel: 1, count: 1, .. })
        ));
        assert!(matches!(
            unit.add_input(0, &obj, "Nope"),
            Err(Error::UnknownInlet { .. })
        ));
        assert!(matches!(
            unit.set_output(3, &obj, "Out"),
            Err(Error::ChannelOutOfRange { .. })
        ));
    }

    #[test]
    fn source_unit_has_no_inputs() {
        let unit = Unit::new("src", 0);
        assert!(unit.is_source());
        assert_eq!(unit.output_count(), 1);
    }

    #[test]
    fn compile_orders_internal_objects() {
        let ctx = AudioContext::with_defaults();
        let unit = Unit::new("u", 1);
        let a = scale(&ctx, "a", 1.0);
        let b = scale(&ctx, "b", 1.0);
        unit.add_object(&b);
        unit.add_object(&a);
        unit.add_input(0, &a, "In").unwrap();
        connect(&a, "Out", &b, "In").unwrap();
        unit.set_output(0, &b, "Out").unwrap();

        let result = unit.compile();
        assert!(result.is_complete());
        assert_eq!(unit.processing_order(), vec![a.id(), b.id()]);
        assert!(a.is_scheduled());
    }

    #[test]
    fn connect_units_channel_by_channel() {
        let ctx = AudioContext::with_defaults();
        let first = doubler_unit(&ctx, "first");
        let second = doubler_unit(&ctx, "second");
        Unit::connect(&first, &second);

        let feed = crate::port::Outlet::new(&ctx, "feed");
        feed.buffer().fill(1.5);
        for inlet in first.inputs(0) {
            inlet.connect(&feed);
        }
        first.process();
        second.process();
        assert_eq!(second.output(0).unwrap().buffer().get(0), 6.0);
        assert!(std::sync::Arc::ptr_eq(
            &second.inward_connection(0).unwrap(),
            &first.output(0).unwrap()
        ));

        second.disconnect();
        assert!(second.inward_connection(0).is_none());
    }

    #[test]
    fn enable_while_locked_is_deferred() {
        let unit = Unit::new("u", 1);
        assert!(unit.is_enabled());
        unit.lock();
        assert!(!unit.is_enabled());
        unit.disable();
        unit.unlock();
        assert!(!unit.is_enabled());

        unit.lock();
        unit.enable();
        assert!(!unit.is_enabled());
        unit.unlock();
        assert!(unit.is_enabled());
    }

    #[test]
    fn remove_object_disconnects_it() {
        let ctx = AudioContext::with_defaults();
        let unit = Unit::new("u", 1);
        let a = scale(&ctx, "a", 1.0);
        let b = scale(&ctx, "b", 1.0);
        unit.add_object(&a);
        unit.add_object(&b);
        connect(&a, "Out", &b, "In").unwrap();
        unit.compile();

        unit.remove_object(a.id()).unwrap();
        assert!(!b.inlet("In").unwrap().is_connected());
        assert_eq!(unit.processing_order(), vec![b.id()]);
        assert!(matches!(
            unit.remove_object(a.id()),
            Err(Error::NotAMember(_))
        ));
    }
}
