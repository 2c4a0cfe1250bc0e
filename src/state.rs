//! Per-object lifecycle state machine

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a pooled object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PooledObjectState {
    /// In the idle queue, available for borrowing
    Idle = 0,

    /// Checked out to a borrower
    Allocated = 1,

    /// Examined by the maintenance idle sweep
    EvictionTest = 2,

    /// Being validated by the maintenance idle sweep
    Validation = 3,

    /// Presumed lost by its borrower, being reclaimed
    Abandoned = 4,

    /// On its way back from a borrower
    Returning = 5,

    /// Out of circulation, pending destroy (terminal)
    Invalid = 6,
}

impl PooledObjectState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => PooledObjectState::Idle,
            1 => PooledObjectState::Allocated,
            2 => PooledObjectState::EvictionTest,
            3 => PooledObjectState::Validation,
            4 => PooledObjectState::Abandoned,
            5 => PooledObjectState::Returning,
            _ => PooledObjectState::Invalid,
        }
    }
}

impl fmt::Display for PooledObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PooledObjectState::Idle => "IDLE",
            PooledObjectState::Allocated => "ALLOCATED",
            PooledObjectState::EvictionTest => "EVICTION_TEST",
            PooledObjectState::Validation => "VALIDATION",
            PooledObjectState::Abandoned => "ABANDONED",
            PooledObjectState::Returning => "RETURNING",
            PooledObjectState::Invalid => "INVALID",
        };
        f.write_str(name)
    }
}

/// Atomic cell holding a [`PooledObjectState`]
///
/// Every transition is a single compare-and-set. A transition whose source
/// state no longer holds returns `false` and leaves the cell untouched; the
/// caller treats that as "someone else already handled this object".
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub fn new(state: PooledObjectState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> PooledObjectState {
        PooledObjectState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn transition(&self, from: PooledObjectState, to: PooledObjectState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Move to `to` from any of `from`
    pub fn transition_any(&self, from: &[PooledObjectState], to: PooledObjectState) -> bool {
        from.iter().any(|state| self.transition(*state, to))
    }

    /// Force the terminal state, returning the state it replaced
    pub fn invalidate(&self) -> PooledObjectState {
        PooledObjectState::from_u8(self.0.swap(PooledObjectState::Invalid as u8, Ordering::AcqRel))
    }
}

impl fmt::Debug for AtomicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.load())
    }
}
