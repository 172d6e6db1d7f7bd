//! Smoothed scalar controls.
//!
//! A [`Parameter`] holds a current value and a target. [`soft_set`] moves the
//! target and the current value follows linearly over a fixed number of
//! frames; [`hard_set`] jumps both at once. The owning object advances the
//! ramp once per frame through [`update`], before its `process()` runs.
//!
//! ## Ties
//!
//! A parameter can follow another one ([`tie`]). While tied, reads come from
//! the leader and local writes are ignored. A follower keeps a strong handle
//! on its leader; [`check_weak_tie`] drops that handle once nothing else
//! references the leader, so a follower never keeps a dead control alive.
//!
//! ```rust
//! use ondule_core::Parameter;
//!
//! let gain = Parameter::with_smoothing("Gain", 0.0, 4);
//! gain.soft_set(1.0);
//! for _ in 0..4 {
//!     gain.update();
//! }
//! assert_eq!(gain.value(), 1.0);
//! ```
//!
//! [`soft_set`]: Parameter::soft_set
//! [`hard_set`]: Parameter::hard_set
//! [`update`]: Parameter::update
//! [`tie`]: Parameter::tie
//! [`check_weak_tie`]: Parameter::check_weak_tie

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::DEFAULT_SMOOTHING_FRAMES;
use crate::error::{Error, Result};

/// Serializes tie edits so two concurrent ties cannot close a cycle.
pub(crate) static TIE_EDITS: Mutex<()> = parking_lot::const_mutex(());

/// Differences below this snap immediately instead of ramping.
const SNAP_THRESHOLD: f32 = 1e-10;

#[derive(Debug)]
struct ParamState {
    value: f32,
    target: f32,
    /// Value the current ramp started from.
    start: f32,
    /// Frames left in the current ramp.
    remaining: u32,
    held: bool,
    leader: Option<Arc<Parameter>>,
}

/// A named, smoothed scalar control.
///
/// Shared through `Arc` so that objects, followers and control code can all
/// hold it. Every method takes `&self`.
pub struct Parameter {
    name: String,
    smoothing: u32,
    state: Mutex<ParamState>,
    serialize: AtomicBool,
    hard_deserialize: AtomicBool,
}

impl Parameter {
    /// Creates a parameter with the default smoothing length.
    pub fn new(name: impl Into<String>, initial: f32) -> Arc<Self> {
        Self::with_smoothing(name, initial, DEFAULT_SMOOTHING_FRAMES)
    }

    /// Creates a parameter that ramps over `frames` updates (at least one).
    pub fn with_smoothing(name: impl Into<String>, initial: f32, frames: u32) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            smoothing: frames.max(1),
            state: Mutex::new(ParamState {
                value: initial,
                target: initial,
                start: initial,
                remaining: 0,
                held: false,
                leader: None,
            }),
            serialize: AtomicBool::new(true),
            hard_deserialize: AtomicBool::new(false),
        })
    }

    /// Parameter name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of updates a soft set takes to land.
    #[inline]
    pub fn smoothing_frames(&self) -> u32 {
        self.smoothing
    }

    /// Current value, or the leader's while tied.
    pub fn value(&self) -> f32 {
        let state = self.state.lock();
        match &state.leader {
            Some(leader) => leader.value(),
            None => state.value,
        }
    }

    /// Target value, or the leader's while tied.
    pub fn target(&self) -> f32 {
        let state = self.state.lock();
        match &state.leader {
            Some(leader) => leader.target(),
            None => state.target,
        }
    }

    /// [`value`](Self::value) rounded to the nearest integer.
    pub fn round_value(&self) -> i32 {
        self.value().round() as i32
    }

    /// [`target`](Self::target) rounded to the nearest integer.
    pub fn round_target(&self) -> i32 {
        self.target().round() as i32
    }

    /// Sets value and target at once. Ignored while tied.
    pub fn hard_set(&self, x: f32) {
        let mut state = self.state.lock();
        if state.leader.is_some() {
            return;
        }
        state.value = x;
        state.target = x;
        state.start = x;
        state.remaining = 0;
    }

    /// Sets the target; the value reaches it after `smoothing_frames()` updates.
    /// Ignored while tied.
    pub fn soft_set(&self, x: f32) {
        let mut state = self.state.lock();
        if state.leader.is_some() {
            return;
        }
        state.target = x;
        if (x - state.value).abs() < SNAP_THRESHOLD {
            state.value = x;
            state.remaining = 0;
        } else {
            state.start = state.value;
            state.remaining = self.smoothing;
        }
    }

    /// Restores a persisted value using the configured deserialize mode.
    pub fn deserialize(&self, x: f32) {
        if self.hard_deserialize.load(Ordering::Relaxed) {
            self.hard_set(x);
        } else {
            self.soft_set(x);
        }
    }

    /// Copies another parameter's target into this one with a hard set.
    pub fn assign_from(&self, other: &Parameter) {
        self.hard_set(other.target());
    }

    /// Advances the ramp by one frame. Frozen while held; a no-op while tied.
    pub fn update(&self) {
        let mut state = self.state.lock();
        if state.leader.is_some() || state.held {
            return;
        }
        Self::advance(&mut state, self.smoothing);
    }

    /// Advances the ramp by one frame even while held.
    pub fn forced_update(&self) {
        let mut state = self.state.lock();
        if state.leader.is_some() {
            return;
        }
        Self::advance(&mut state, self.smoothing);
    }

    #[inline]
    fn advance(state: &mut ParamState, smoothing: u32) {
        if state.remaining > 0 {
            state.remaining -= 1;
            state.value = if state.remaining == 0 {
                state.target
            } else {
                let t = (smoothing - state.remaining) as f32 / smoothing as f32;
                state.start + (state.target - state.start) * t
            };
        } else {
            state.value = state.target;
        }
    }

    /// Returns true while a ramp is in progress.
    pub fn off_target(&self) -> bool {
        self.state.lock().remaining > 0
    }

    /// Freezes the value where it is.
    pub fn hold(&self) {
        self.state.lock().held = true;
    }

    /// Releases a hold and retargets to the frozen value.
    pub fn unhold(&self) {
        let mut state = self.state.lock();
        state.target = state.value;
        state.remaining = 0;
        state.held = false;
    }

    /// Returns true while held.
    pub fn is_held(&self) -> bool {
        self.state.lock().held
    }

    /// Follows `leader` until [`untie`](Self::untie).
    ///
    /// # Errors
    ///
    /// Returns [`Error::TieCycle`] if `leader` is this parameter or already
    /// follows it, directly or through other parameters.
    pub fn tie(self: &Arc<Self>, leader: &Arc<Parameter>) -> Result<()> {
        let _edit = TIE_EDITS.lock();
        if leader.follows(self) {
            return Err(Error::TieCycle {
                follower: self.name.clone(),
                leader: leader.name.clone(),
            });
        }
        self.state.lock().leader = Some(Arc::clone(leader));
        Ok(())
    }

    /// True if `self` is `other` or reaches `other` through its leader chain.
    fn follows(self: &Arc<Self>, other: &Arc<Parameter>) -> bool {
        let mut current = Arc::clone(self);
        loop {
            if Arc::ptr_eq(&current, other) {
                return true;
            }
            let next = current.state.lock().leader.clone();
            match next {
                Some(next) => current = next,
                None => return false,
            }
        }
    }

    /// Stops following the leader. Local value and target are unchanged.
    pub fn untie(&self) {
        self.state.lock().leader = None;
    }

    /// Returns true while following a leader.
    pub fn is_tied(&self) -> bool {
        self.state.lock().leader.is_some()
    }

    /// The leader, if tied.
    pub fn leader(&self) -> Option<Arc<Parameter>> {
        self.state.lock().leader.clone()
    }

    /// Unties if this follower holds the only remaining handle on its leader.
    ///
    /// Returns true if the tie was dropped.
    pub fn check_weak_tie(&self) -> bool {
        let mut state = self.state.lock();
        let orphaned = state
            .leader
            .as_ref()
            .is_some_and(|leader| Arc::strong_count(leader) == 1);
        if orphaned {
            state.leader = None;
        }
        orphaned
    }

    /// True if this value should be persisted.
    pub fn is_serialization_needed(&self) -> bool {
        self.serialize.load(Ordering::Relaxed)
    }

    /// Marks the value for persistence.
    pub fn enable_serialization(&self) {
        self.serialize.store(true, Ordering::Relaxed);
    }

    /// Excludes the value from persistence.
    pub fn disable_serialization(&self) {
        self.serialize.store(false, Ordering::Relaxed);
    }

    /// Makes [`deserialize`](Self::deserialize) jump straight to the value.
    pub fn deserialize_with_hard_set(&self) {
        self.hard_deserialize.store(true, Ordering::Relaxed);
    }

    /// Makes [`deserialize`](Self::deserialize) ramp to the value (default).
    pub fn deserialize_with_soft_set(&self) {
        self.hard_deserialize.store(false, Ordering::Relaxed);
    }
}

impl core::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("value", &state.value)
            .field("target", &state.target)
            .field("tied", &state.leader.is_some())
            .finish_non_exhaustive()
    }
}
