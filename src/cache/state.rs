//! Primary State Module
//!
//! Availability state of the primary store, shared lock-free between the
//! facade and its background tasks.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Where the primary store is in its lifecycle.
///
/// `Uninitialized -> Connecting -> Enabled | Disabled`, then
/// `Enabled -> Disabled` on a runtime error. `Disabled -> Enabled` only
/// happens through an explicit recovery probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PrimaryState {
    Uninitialized = 0,
    Connecting = 1,
    Enabled = 2,
    Disabled = 3,
}

impl PrimaryState {
    pub fn is_enabled(self) -> bool {
        self == PrimaryState::Enabled
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => PrimaryState::Uninitialized,
            1 => PrimaryState::Connecting,
            2 => PrimaryState::Enabled,
            _ => PrimaryState::Disabled,
        }
    }
}

impl fmt::Display for PrimaryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimaryState::Uninitialized => "uninitialized",
            PrimaryState::Connecting => "connecting",
            PrimaryState::Enabled => "enabled",
            PrimaryState::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

// == State Cell ==
/// Atomic holder for [`PrimaryState`] with guarded transitions.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(PrimaryState::Uninitialized as u8))
    }

    pub fn get(&self) -> PrimaryState {
        PrimaryState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// `Uninitialized -> Connecting`. Returns false if a connect already ran.
    pub fn begin_connect(&self) -> bool {
        self.transition(PrimaryState::Uninitialized, PrimaryState::Connecting)
    }

    /// `Connecting -> Enabled`. Fails if the facade was disconnected meanwhile.
    pub fn finish_connect(&self) -> bool {
        self.transition(PrimaryState::Connecting, PrimaryState::Enabled)
    }

    /// `Disabled -> Enabled`, used by the recovery probe.
    pub fn promote(&self) -> bool {
        self.transition(PrimaryState::Disabled, PrimaryState::Enabled)
    }

    /// Moves to `Disabled` from any state. Returns the previous state.
    pub fn disable(&self) -> PrimaryState {
        PrimaryState::from_u8(self.0.swap(PrimaryState::Disabled as u8, Ordering::AcqRel))
    }

    fn transition(&self, from: PrimaryState, to: PrimaryState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
