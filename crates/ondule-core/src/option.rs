//! Discrete integer controls.
//!
//! [`OptionValue`] is the integer counterpart of [`Parameter`](crate::Parameter):
//! no smoothing, but the same tie semantics, plus helpers that treat the value
//! as a bit set. Unlike parameters, writes through a tie go to the leader.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::param::TIE_EDITS;

#[derive(Debug)]
struct OptionState {
    value: i32,
    held: bool,
    leader: Option<Arc<OptionValue>>,
}

/// A named integer control.
pub struct OptionValue {
    name: String,
    state: Mutex<OptionState>,
    serialize: AtomicBool,
}

impl OptionValue {
    /// Creates an option with an initial value.
    pub fn new(name: impl Into<String>, initial: i32) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            state: Mutex::new(OptionState {
                value: initial,
                held: false,
                leader: None,
            }),
            serialize: AtomicBool::new(true),
        })
    }

    /// Option name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value, or the leader's while tied.
    pub fn value(&self) -> i32 {
        let state = self.state.lock();
        match &state.leader {
            Some(leader) => leader.value(),
            None => state.value,
        }
    }

    /// Writes the value, or the leader's while tied. Ignored while held.
    pub fn set(&self, value: i32) {
        self.modify(|v| {
            *v = value;
        });
    }

    /// Sets bit `flag`.
    pub fn set_flag(&self, flag: u32) {
        self.modify(|v| *v |= bit(flag));
    }

    /// Clears bit `flag`.
    pub fn clear_flag(&self, flag: u32) {
        self.modify(|v| *v &= !bit(flag));
    }

    /// Flips bit `flag` and returns its new state.
    pub fn toggle_flag(&self, flag: u32) -> bool {
        self.modify(|v| *v ^= bit(flag));
        self.get_flag(flag)
    }

    /// Reads bit `flag`.
    pub fn get_flag(&self, flag: u32) -> bool {
        self.value() & bit(flag) != 0
    }

    fn modify(&self, f: impl FnOnce(&mut i32)) {
        let mut state = self.state.lock();
        if state.held {
            return;
        }
        match &state.leader {
            Some(leader) => leader.modify(f),
            None => f(&mut state.value),
        }
    }

    /// Rejects writes until [`unhold`](Self::unhold).
    pub fn hold(&self) {
        self.state.lock().held = true;
    }

    /// Accepts writes again.
    pub fn unhold(&self) {
        self.state.lock().held = false;
    }

    /// Returns true while held.
    pub fn is_held(&self) -> bool {
        self.state.lock().held
    }

    /// Follows `leader` until [`untie`](Self::untie).
    ///
    /// # Errors
    ///
    /// Returns [`Error::TieCycle`] if `leader` is this option or already
    /// follows it.
    pub fn tie(self: &Arc<Self>, leader: &Arc<OptionValue>) -> Result<()> {
        let _edit = TIE_EDITS.lock();
        let mut current = Arc::clone(leader);
        loop {
            if Arc::ptr_eq(&current, self) {
                return Err(Error::TieCycle {
                    follower: self.name.clone(),
                    leader: leader.name.clone(),
                });
            }
            let next = current.state.lock().leader.clone();
            match next {
                Some(next) => current = next,
                None => break,
            }
        }
        self.state.lock().leader = Some(Arc::clone(leader));
        Ok(())
    }

    /// Stops following the leader.
    pub fn untie(&self) {
        self.state.lock().leader = None;
    }

    /// Returns true while following a leader.
    pub fn is_tied(&self) -> bool {
        self.state.lock().leader.is_some()
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
}

#[inline]
fn bit(flag: u32) -> i32 {
    (1u32 << (flag & 31)) as i32
}

impl core::fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OptionValue")
            .field("name", &self.name)
            .field("value", &self.value())
            .field("tied", &self.is_tied())
            .finish_non_exhaustive()
    }
}
