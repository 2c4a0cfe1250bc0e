//! Pool-side wrapper around one resource

use std::time::{Duration, Instant};

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::state::{AtomicState, PooledObjectState};
use crate::usage::CallSite;

/// Lifecycle timestamps of a pooled object
#[derive(Debug, Clone)]
pub(crate) struct Timestamps {
    pub created_at: Instant,
    pub last_borrow: Instant,
    pub last_return: Instant,
    pub borrow_count: u64,
    pub borrowed_by: Option<CallSite>,
}

/// One resource plus the metadata the pool keeps about it
///
/// The resource sits in a slot that is emptied when the object is destroyed,
/// so a borrower still holding a reclaimed object finds nothing there.
pub(crate) struct PooledEntry<T> {
    id: u64,
    pub state: AtomicState,
    object: Mutex<Option<T>>,
    times: Mutex<Timestamps>,
}

impl<T> PooledEntry<T> {
    pub fn new(id: u64, object: T, state: PooledObjectState) -> Self {
        let now = Instant::now();
        Self {
            id,
            state: AtomicState::new(state),
            object: Mutex::new(Some(object)),
            times: Mutex::new(Timestamps {
                created_at: now,
                last_borrow: now,
                last_return: now,
                borrow_count: 0,
                borrowed_by: None,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn lock_object(&self) -> Option<MappedMutexGuard<'_, T>> {
        MutexGuard::try_map(self.object.lock(), |slot| slot.as_mut()).ok()
    }

    pub fn take_object(&self) -> Option<T> {
        self.object.lock().take()
    }

    /// The resource slot, unless a borrower is using it right now
    pub fn try_lock_slot(&self) -> Option<MutexGuard<'_, Option<T>>> {
        self.object.try_lock()
    }

    /// Stamp the borrow instant; called under the registry lock so a
    /// reclaimer never sees a stale borrow time on a fresh borrow
    pub fn mark_borrowed(&self) {
        let mut times = self.times.lock();
        times.last_borrow = Instant::now();
        times.borrow_count += 1;
        times.borrowed_by = None;
    }

    pub fn set_borrowed_by(&self, borrowed_by: Option<CallSite>) {
        self.times.lock().borrowed_by = borrowed_by;
    }

    pub fn mark_returned(&self) {
        self.times.lock().last_return = Instant::now();
    }

    pub fn times(&self) -> Timestamps {
        self.times.lock().clone()
    }

    pub fn last_borrow(&self) -> Instant {
        self.times.lock().last_borrow
    }

    /// Time since creation and time since the last return
    pub fn age_and_idle_time(&self, now: Instant) -> (Duration, Duration) {
        let times = self.times.lock();
        (
            now.saturating_duration_since(times.created_at),
            now.saturating_duration_since(times.last_return),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_empties_on_take() {
        let entry = PooledEntry::new(7, String::from("conn"), PooledObjectState::Idle);
        assert_eq!(entry.id(), 7);
        entry.lock_object().unwrap().push_str("-1");

        assert_eq!(entry.take_object().as_deref(), Some("conn-1"));
        assert!(entry.lock_object().is_none());
        assert!(entry.take_object().is_none());
    }

    #[test]
    fn test_try_lock_slot_fails_while_in_use() {
        let entry = PooledEntry::new(2, 5u8, PooledObjectState::Allocated);
        {
            let _in_use = entry.lock_object().unwrap();
            assert!(entry.try_lock_slot().is_none());
        }
        assert_eq!(entry.try_lock_slot().unwrap().take(), Some(5));
    }

    #[test]
    fn test_borrow_metadata() {
        let entry = PooledEntry::new(1, 0u8, PooledObjectState::Allocated);
        let before = entry.last_borrow();

        entry.mark_borrowed();
        entry.mark_borrowed();

        let times = entry.times();
        assert_eq!(times.borrow_count, 2);
        assert!(times.last_borrow >= before);
        assert!(times.borrowed_by.is_none());
    }
}
