//! Serial chain of units with monitor taps.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::{FrameIo, Task, priority};
use crate::context::AudioContext;
use crate::error::{Error, Result};
use crate::frame::LinearRamp;
use crate::port::{Inlet, Outlet};
use crate::unit::Unit;

/// Frames a mute or unmute fade takes.
pub const FADE_FRAMES: u32 = 25;

/// Copies an inlet to an outlet, optionally scaled by a per-frame ramp.
struct Repeater {
    inlet: Arc<Inlet>,
    outlet: Arc<Outlet>,
}

impl Repeater {
    fn new(ctx: &AudioContext, channel: usize) -> Self {
        Self {
            inlet: Inlet::new(ctx, format!("Tap{}", channel + 1)),
            outlet: Outlet::new(ctx, format!("Out{}", channel + 1)),
        }
    }

    fn copy(&self) {
        self.outlet.buffer().copy_from(&self.inlet.buffer());
    }

    /// Scales by a gain moving linearly from `from` to `to` across the frame.
    fn fade(&self, from: f32, to: f32) {
        let src = self.inlet.buffer();
        let dst = self.outlet.buffer();
        let n = dst.len();
        let slope = (to - from) / n as f32;
        for i in 0..n {
            dst.set(i, src.get(i) * (from + slope * i as f32));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mute {
    Open,
    Closing,
    Closed,
}

/// Chain state, reachable through a [`ChainGuard`].
pub struct ChainState {
    units: Vec<Arc<Unit>>,
    sources: Vec<Option<Arc<Outlet>>>,
    fade: LinearRamp,
    mute: Mute,
}

impl ChainState {
    /// Units in processing order.
    pub fn units(&self) -> &[Arc<Unit>] {
        &self.units
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if the chain has no units.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit at `position`.
    pub fn unit(&self, position: usize) -> Option<&Arc<Unit>> {
        self.units.get(position)
    }

    /// Position of `unit`, compared by identity.
    pub fn position(&self, unit: &Arc<Unit>) -> Option<usize> {
        self.units.iter().position(|u| Arc::ptr_eq(u, unit))
    }

    /// Inserts `unit` at `position`, or appends if past the end.
    pub fn insert(&mut self, position: usize, unit: Arc<Unit>) {
        let at = position.min(self.units.len());
        self.units.insert(at, unit);
    }

    /// Appends `unit`.
    pub fn append(&mut self, unit: Arc<Unit>) {
        self.units.push(unit);
    }

    /// Removes and returns the unit at `position`.
    pub fn remove_at(&mut self, position: usize) -> Option<Arc<Unit>> {
        (position < self.units.len()).then(|| self.units.remove(position))
    }

    /// Removes `unit`. Returns true if it was in the chain.
    pub fn remove(&mut self, unit: &Arc<Unit>) -> bool {
        match self.position(unit) {
            Some(at) => {
                self.units.remove(at);
                true
            }
            None => false,
        }
    }

    /// Removes every unit.
    pub fn clear(&mut self) {
        self.units.clear();
    }

    /// Reorders the units: `order[k]` is the current position of the unit
    /// that should end up at position `k`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReorderMismatch`] unless `order` is a permutation of
    /// the current positions; the chain is unchanged in that case.
    pub fn reorder(&mut self, order: &[usize]) -> Result<()> {
        let n = self.units.len();
        let mut seen = vec![false; n];
        let valid = order.len() == n
            && order
                .iter()
                .all(|&i| i < n && !std::mem::replace(&mut seen[i], true));
        if !valid {
            return Err(Error::ReorderMismatch {
                expected: n,
                actual: order.len(),
            });
        }
        self.units = order.iter().map(|&i| Arc::clone(&self.units[i])).collect();
        Ok(())
    }
}

/// A task that runs units in series and exposes the result on tap outlets.
///
/// Sources feed the first active unit, each active unit feeds the next, and
/// the last active unit feeds the taps. Bypassed units are skipped when
/// wiring; disabled units are wired but not run. All edits go through
/// [`lock`](Self::lock), which unwires the chain and rewires it when the
/// guard drops. Editing blocks the frame, so it belongs on a control thread.
pub struct UnitChain {
    name: String,
    priority: i32,
    channels: usize,
    taps: Vec<Repeater>,
    state: Mutex<ChainState>,
}

impl UnitChain {
    /// Creates an empty chain with `channels` channels.
    ///
    /// The taps fade in over the first [`FADE_FRAMES`] frames.
    pub fn new(name: impl Into<String>, ctx: &AudioContext, channels: usize) -> Self {
        let mut fade = LinearRamp::new(FADE_FRAMES, 0.0);
        fade.reset(1.0);
        Self {
            name: name.into(),
            priority: priority::DEFAULT,
            channels,
            taps: (0..channels).map(|ch| Repeater::new(ctx, ch)).collect(),
            state: Mutex::new(ChainState {
                units: Vec::new(),
                sources: vec![None; channels],
                fade,
                mute: Mute::Open,
            }),
        }
    }

    /// Sets the scheduling priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels
    }

    /// Unwires the chain for editing. Rewiring happens when the guard drops.
    pub fn lock(&self) -> ChainGuard<'_> {
        let state = self.state.lock();
        self.disconnect_internals(&state);
        ChainGuard { chain: self, state }
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.state.lock().units.len()
    }

    /// Returns true if the chain has no units.
    pub fn is_empty(&self) -> bool {
        self.state.lock().units.is_empty()
    }

    /// Tap outlet for `channel`: the chain's output after fades.
    pub fn output(&self, channel: usize) -> Option<&Arc<Outlet>> {
        self.taps.get(channel).map(|tap| &tap.outlet)
    }

    /// Connects `inlet` to the tap on `channel`.
    pub fn connect_output(&self, channel: usize, inlet: &Arc<Inlet>) -> Result<()> {
        let tap = self.taps.get(channel).ok_or_else(|| Error::ChannelOutOfRange {
            owner: self.name.clone(),
            channel,
            count: self.channels,
        })?;
        inlet.connect(&tap.outlet);
        Ok(())
    }

    /// Disconnects everything reading the taps.
    pub fn disconnect_outputs(&self) {
        for tap in &self.taps {
            tap.outlet.disconnect();
        }
    }

    /// Starts fading the taps out; they go silent once the fade completes.
    pub fn mute(&self) {
        let mut state = self.state.lock();
        if state.mute == Mute::Open {
            state.fade.reset(0.0);
            state.mute = Mute::Closing;
        }
    }

    /// Restores the taps and fades them back in.
    pub fn unmute(&self) {
        let mut state = self.state.lock();
        if state.mute != Mute::Open {
            for tap in &self.taps {
                tap.outlet.unmute();
            }
            state.mute = Mute::Open;
            state.fade.reset(1.0);
        }
    }

    /// True once a mute has fully faded out.
    pub fn is_muted(&self) -> bool {
        self.state.lock().mute == Mute::Closed
    }

    fn disconnect_internals(&self, state: &ChainState) {
        for unit in &state.units {
            unit.disconnect();
        }
        for tap in &self.taps {
            tap.inlet.disconnect();
        }
    }

    fn connect_internals(&self, state: &ChainState) {
        let mut last_active: Option<&Arc<Unit>> = None;
        for unit in &state.units {
            match last_active {
                Some(prev) => Unit::connect(prev, unit),
                None => {
                    for (channel, source) in state.sources.iter().enumerate() {
                        if let Some(source) = source {
                            for inlet in unit.inputs(channel) {
                                inlet.connect(source);
                            }
                        }
                    }
                }
            }
            if !unit.bypass() {
                last_active = Some(unit);
            }
        }

        for (channel, tap) in self.taps.iter().enumerate() {
            let feed = match last_active {
                Some(unit) => unit.output(channel),
                None => state.sources[channel].clone(),
            };
            if let Some(outlet) = feed {
                tap.inlet.connect(&outlet);
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("chain '{}': rewired {} units", self.name, state.units.len());
    }
}

impl Task for UnitChain {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn process(&self, _io: &mut FrameIo<'_>) {
        let mut state = self.state.lock();
        for unit in &state.units {
            if unit.is_enabled() {
                unit.process();
            }
        }
        let mute = state.mute;
        match mute {
            Mute::Closed => {}
            _ if state.fade.in_progress() => {
                let from = state.fade.value();
                let to = state.fade.step();
                for tap in &self.taps {
                    tap.fade(from, to);
                }
                if state.mute == Mute::Closing && !state.fade.in_progress() {
                    for tap in &self.taps {
                        tap.outlet.mute();
                    }
                    state.mute = Mute::Closed;
                }
            }
            Mute::Closing => {
                for tap in &self.taps {
                    tap.outlet.mute();
                }
                state.mute = Mute::Closed;
            }
            Mute::Open => {
                for tap in &self.taps {
                    tap.copy();
                }
            }
        }
    }
}

impl Drop for UnitChain {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for unit in &state.units {
            unit.disconnect();
        }
        for tap in &self.taps {
            tap.inlet.disconnect();
            tap.outlet.disconnect();
        }
    }
}

impl core::fmt::Debug for UnitChain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UnitChain")
            .field("name", &self.name)
            .field("channels", &self.channels)
            .field("units", &self.len())
            .finish_non_exhaustive()
    }
}

/// Edit access to a [`UnitChain`]; rewires the chain on drop.
pub struct ChainGuard<'a> {
    chain: &'a UnitChain,
    state: MutexGuard<'a, ChainState>,
}

impl ChainGuard<'_> {
    /// Feeds channel `channel` of the first active unit from `outlet`, or
    /// clears the source with `None`.
    pub fn set_input(&mut self, channel: usize, outlet: Option<&Arc<Outlet>>) -> Result<()> {
        let count = self.chain.channels;
        let slot = self
            .state
            .sources
            .get_mut(channel)
            .ok_or_else(|| Error::ChannelOutOfRange {
                owner: self.chain.name.clone(),
                channel,
                count,
            })?;
        *slot = outlet.cloned();
        Ok(())
    }

    /// Clears every source.
    pub fn clear_inputs(&mut self) {
        for source in &mut self.state.sources {
            *source = None;
        }
    }
}

impl Deref for ChainGuard<'_> {
    type Target = ChainState;

    fn deref(&self) -> &ChainState {
        &self.state
    }
}

impl DerefMut for ChainGuard<'_> {
    fn deref_mut(&mut self) -> &mut ChainState {
        &mut self.state
    }
}

impl Drop for ChainGuard<'_> {
    fn drop(&mut self) {
        self.chain.connect_internals(&self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Object, ObjectIo};

    fn scaler(ctx: &AudioContext, name: &str, factor: f32) -> Arc<Unit> {
        let unit = Unit::new(name, 1);
        let obj = Object::builder(name, ctx)
            .inlet("In")
            .outlet("Out")
            .build(move |io: &ObjectIo<'_>| {
                let input = io.inlet(0).buffer();
                for i in 0..io.frame_length() {
                    io.outlet(0).buffer().set(i, input.get(i) * factor);
                }
            });
        unit.add_object(&obj);
        unit.add_input(0, &obj, "In").unwrap();
        unit.set_output(0, &obj, "Out").unwrap();
        unit.compile();
        unit
    }

    fn tick(chain: &UnitChain) {
        let mut out = [0.0f32; 2];
        chain.process(&mut FrameIo::new(&[0.0; 2], &mut out));
    }

    fn settle(chain: &UnitChain) {
        for _ in 0..=FADE_FRAMES {
            tick(chain);
        }
    }

    #[test]
    fn empty_chain_passes_source_through() {
        let ctx = AudioContext::with_defaults();
        let chain = UnitChain::new("chain", &ctx, 1);
        let src = Outlet::constant(&ctx, "src", 0.5);
        chain.lock().set_input(0, Some(&src)).unwrap();

        settle(&chain);
        assert_eq!(chain.output(0).unwrap().buffer().get(0), 0.5);
    }

    #[test]
    fn units_run_in_series() {
        let ctx = AudioContext::with_defaults();
        let chain = UnitChain::new("chain", &ctx, 1);
        let src = Outlet::constant(&ctx, "src", 1.0);
        {
            let mut guard = chain.lock();
            guard.set_input(0, Some(&src)).unwrap();
            guard.append(scaler(&ctx, "x2", 2.0));
            guard.append(scaler(&ctx, "x3", 3.0));
        }
        settle(&chain);
        assert_eq!(chain.output(0).unwrap().buffer().get(7), 6.0);
    }

    #[test]
    fn bypassed_unit_is_skipped() {
        let ctx = AudioContext::with_defaults();
        let chain = UnitChain::new("chain", &ctx, 1);
        let src = Outlet::constant(&ctx, "src", 1.0);
        let middle = scaler(&ctx, "x5", 5.0);
        middle.set_bypass(true);
        {
            let mut guard = chain.lock();
            guard.set_input(0, Some(&src)).unwrap();
            guard.append(scaler(&ctx, "x2", 2.0));
            guard.append(middle);
            guard.append(scaler(&ctx, "x3", 3.0));
        }
        settle(&chain);
        assert_eq!(chain.output(0).unwrap().buffer().get(0), 6.0);
    }

    #[test]
    fn reorder_validates_permutation() {
        let ctx = AudioContext::with_defaults();
        let chain = UnitChain::new("chain", &ctx, 1);
        let a = scaler(&ctx, "a", 1.0);
        let b = scaler(&ctx, "b", 1.0);
        let mut guard = chain.lock();
        guard.append(a.clone());
        guard.append(b.clone());

        assert!(matches!(
            guard.reorder(&[0, 0]),
            Err(Error::ReorderMismatch { .. })
        ));
        assert!(guard.reorder(&[1]).is_err());
        guard.reorder(&[1, 0]).unwrap();
        assert_eq!(guard.position(&b), Some(0));
        assert_eq!(guard.position(&a), Some(1));
    }

    #[test]
    fn mute_fades_then_silences() {
        let ctx = AudioContext::with_defaults();
        let chain = UnitChain::new("chain", &ctx, 1);
        let src = Outlet::constant(&ctx, "src", 1.0);
        chain.lock().set_input(0, Some(&src)).unwrap();
        let listener = Inlet::new(&ctx, "listener");
        chain.connect_output(0, &listener).unwrap();
        settle(&chain);
        assert_eq!(listener.buffer().get(0), 1.0);

        chain.mute();
        tick(&chain);
        assert!(!chain.is_muted());
        let mid = listener.buffer().get(ctx.frame_length() - 1);
        assert!(mid > 0.0 && mid < 1.0, "mid-fade sample {mid}");

        settle(&chain);
        assert!(chain.is_muted());
        assert_eq!(listener.buffer().get(0), 0.0);

        chain.unmute();
        settle(&chain);
        assert_eq!(listener.buffer().get(0), 1.0);
    }

    #[test]
    fn connect_output_checks_channel() {
        let ctx = AudioContext::with_defaults();
        let chain = UnitChain::new("chain", &ctx, 2);
        let inlet = Inlet::new(&ctx, "in");
        assert!(matches!(
            chain.connect_output(2, &inlet),
            Err(Error::ChannelOutOfRange { .. })
        ));
    }
}
