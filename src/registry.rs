//! Bookkeeping shared by borrowers and the maintenance task
//!
//! Everything here runs under the pool's registry mutex; nothing in this
//! module calls into the factory.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Condvar;

use crate::config::IdleOrdering;
use crate::handle::PooledEntry;
use crate::metrics::PoolStatus;
use crate::state::PooledObjectState;

/// A borrow request parked until an object or a free slot shows up
pub(crate) struct Waiter {
    pub signal: Condvar,
    woken: AtomicBool,
}

impl Waiter {
    pub fn new() -> Self {
        Self {
            signal: Condvar::new(),
            woken: AtomicBool::new(false),
        }
    }

    /// Whether a wake was handed to this waiter since it last queued
    pub fn is_woken(&self) -> bool {
        self.woken.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.woken.store(false, Ordering::Release);
    }

    fn wake(&self) {
        self.woken.store(true, Ordering::Release);
        self.signal.notify_one();
    }
}

/// What a borrower got out of the registry
pub(crate) enum Acquisition<T> {
    /// An idle object, already `Allocated`
    Idle(Arc<PooledEntry<T>>),

    /// A reserved slot; the borrower must create the object
    Create,
}

pub(crate) struct Registry<T> {
    objects: HashMap<u64, Arc<PooledEntry<T>>>,
    idle: VecDeque<u64>,
    active: HashSet<u64>,
    waiters: VecDeque<Arc<Waiter>>,
    creating: usize,
    pub closed: bool,
    ordering: IdleOrdering,
    max_total: usize,
}

impl<T> Registry<T> {
    pub fn new(ordering: IdleOrdering, max_total: usize) -> Self {
        Self {
            objects: HashMap::with_capacity(max_total),
            idle: VecDeque::with_capacity(max_total),
            active: HashSet::with_capacity(max_total),
            waiters: VecDeque::new(),
            creating: 0,
            closed: false,
            ordering,
            max_total,
        }
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            active: self.active.len(),
            idle: self.idle.len(),
            waiters: self.waiters.len(),
            max_total: self.max_total,
        }
    }

    pub fn idle_len(&self) -> usize {
        self.idle.len()
    }

    pub fn has_waiters(&self) -> bool {
        !self.waiters.is_empty()
    }

    pub fn is_first_waiter(&self, waiter: &Arc<Waiter>) -> bool {
        self.waiters.front().is_some_and(|first| Arc::ptr_eq(first, waiter))
    }

    /// Tracked objects plus creations in flight
    pub fn total(&self) -> usize {
        self.objects.len() + self.creating
    }

    pub fn is_active(&self, id: u64) -> bool {
        self.active.contains(&id)
    }

    pub fn get(&self, id: u64) -> Option<&Arc<PooledEntry<T>>> {
        self.objects.get(&id)
    }

    pub fn active_ids(&self) -> Vec<u64> {
        self.active.iter().copied().collect()
    }

    /// Idle identities, longest idle first
    pub fn idle_ids_oldest_first(&self) -> Vec<u64> {
        match self.ordering {
            IdleOrdering::Lifo => self.idle.iter().rev().copied().collect(),
            IdleOrdering::Fifo => self.idle.iter().copied().collect(),
        }
    }

    /// Hand out an idle object or reserve room for a new one
    pub fn acquire(&mut self) -> Option<Acquisition<T>> {
        while let Some(id) = self.idle.pop_front() {
            let Some(entry) = self.objects.get(&id) else {
                continue;
            };
            if entry
                .state
                .transition(PooledObjectState::Idle, PooledObjectState::Allocated)
            {
                entry.mark_borrowed();
                self.active.insert(id);
                return Some(Acquisition::Idle(Arc::clone(entry)));
            }
        }

        if self.reserve() {
            return Some(Acquisition::Create);
        }
        None
    }

    /// Claim capacity for an object about to be created
    pub fn reserve(&mut self) -> bool {
        if self.closed || self.total() >= self.max_total {
            return false;
        }
        self.creating += 1;
        true
    }

    /// Release a reservation whose creation failed
    pub fn cancel_reservation(&mut self) {
        self.creating = self.creating.saturating_sub(1);
        self.wake_next();
    }

    /// Track a freshly created object as borrowed
    pub fn register_active(&mut self, entry: Arc<PooledEntry<T>>) {
        self.creating = self.creating.saturating_sub(1);
        entry.mark_borrowed();
        self.active.insert(entry.id());
        self.objects.insert(entry.id(), entry);
    }

    /// Track a freshly created object as idle
    pub fn register_idle(&mut self, entry: Arc<PooledEntry<T>>) {
        self.creating = self.creating.saturating_sub(1);
        let id = entry.id();
        self.objects.insert(id, entry);
        self.push_idle(id);
    }

    /// Move a borrowed object back to the idle queue
    pub fn checkin(&mut self, id: u64) {
        self.active.remove(&id);
        self.push_idle(id);
    }

    pub fn remove_idle(&mut self, id: u64) {
        self.idle.retain(|idle| *idle != id);
    }

    /// Put an object that passed its idle test back where it will be
    /// picked last
    pub fn restore_idle(&mut self, id: u64) {
        self.idle.push_back(id);
        self.wake_next();
    }

    fn push_idle(&mut self, id: u64) {
        match self.ordering {
            IdleOrdering::Lifo => self.idle.push_front(id),
            IdleOrdering::Fifo => self.idle.push_back(id),
        }
        self.wake_next();
    }

    /// Stop tracking an object, freeing its slot
    pub fn detach(&mut self, id: u64) -> Option<Arc<PooledEntry<T>>> {
        let entry = self.objects.remove(&id)?;
        if !self.active.remove(&id) {
            self.remove_idle(id);
        }
        self.wake_next();
        Some(entry)
    }

    /// Detach every idle object
    pub fn drain_idle(&mut self) -> Vec<Arc<PooledEntry<T>>> {
        let ids: Vec<u64> = self.idle.drain(..).collect();
        let drained: Vec<_> = ids
            .into_iter()
            .filter_map(|id| self.objects.remove(&id))
            .collect();
        if !drained.is_empty() {
            self.wake_next();
        }
        drained
    }

    pub fn enqueue_waiter(&mut self, waiter: &Arc<Waiter>) {
        waiter.reset();
        self.waiters.push_back(Arc::clone(waiter));
    }

    /// Requeue a woken waiter that lost the race, keeping its turn
    pub fn requeue_waiter(&mut self, waiter: &Arc<Waiter>) {
        waiter.reset();
        self.waiters.push_front(Arc::clone(waiter));
    }

    /// Drop a waiter's registration; `false` if it was already woken
    pub fn remove_waiter(&mut self, waiter: &Arc<Waiter>) -> bool {
        let before = self.waiters.len();
        self.waiters.retain(|queued| !Arc::ptr_eq(queued, waiter));
        before != self.waiters.len()
    }

    /// Wake the oldest waiter if there is anything for it to take
    pub fn wake_if_available(&mut self) {
        if !self.idle.is_empty() || (!self.closed && self.total() < self.max_total) {
            self.wake_next();
        }
    }

    fn wake_next(&mut self) {
        if let Some(waiter) = self.waiters.pop_front() {
            waiter.wake();
        }
    }

    pub fn wake_all(&mut self) {
        for waiter in self.waiters.drain(..) {
            waiter.wake();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_entry(registry: &mut Registry<u32>, id: u64) {
        assert!(registry.reserve());
        registry.register_idle(Arc::new(PooledEntry::new(id, id as u32, PooledObjectState::Idle)));
    }

    fn acquire_id(registry: &mut Registry<u32>) -> Option<u64> {
        match registry.acquire() {
            Some(Acquisition::Idle(entry)) => Some(entry.id()),
            _ => None,
        }
    }

    #[test]
    fn test_lifo_hands_out_latest() {
        let mut registry = Registry::new(IdleOrdering::Lifo, 4);
        idle_entry(&mut registry, 1);
        idle_entry(&mut registry, 2);
        assert_eq!(acquire_id(&mut registry), Some(2));
        assert_eq!(acquire_id(&mut registry), Some(1));
    }

    #[test]
    fn test_fifo_hands_out_oldest() {
        let mut registry = Registry::new(IdleOrdering::Fifo, 4);
        idle_entry(&mut registry, 1);
        idle_entry(&mut registry, 2);
        assert_eq!(acquire_id(&mut registry), Some(1));
        assert_eq!(registry.idle_ids_oldest_first(), vec![2]);
    }

    #[test]
    fn test_capacity_includes_reservations() {
        let mut registry: Registry<u32> = Registry::new(IdleOrdering::Lifo, 2);
        assert!(matches!(registry.acquire(), Some(Acquisition::Create)));
        assert!(matches!(registry.acquire(), Some(Acquisition::Create)));
        assert!(registry.acquire().is_none());
        assert_eq!(registry.total(), 2);

        registry.cancel_reservation();
        assert_eq!(registry.total(), 1);
        assert!(registry.reserve());
    }

    #[test]
    fn test_detach_frees_slot() {
        let mut registry = Registry::new(IdleOrdering::Lifo, 1);
        idle_entry(&mut registry, 1);
        assert_eq!(acquire_id(&mut registry), Some(1));
        assert!(registry.is_active(1));
        assert!(!registry.reserve());

        assert!(registry.detach(1).is_some());
        assert!(!registry.is_active(1));
        assert!(registry.detach(1).is_none());
        assert!(registry.reserve());
    }

    #[test]
    fn test_wake_goes_to_oldest_waiter() {
        let mut registry: Registry<u32> = Registry::new(IdleOrdering::Lifo, 1);
        let first = Arc::new(Waiter::new());
        let second = Arc::new(Waiter::new());
        registry.enqueue_waiter(&first);
        registry.enqueue_waiter(&second);
        assert_eq!(registry.status().waiters, 2);

        idle_entry(&mut registry, 1);
        assert!(first.is_woken());
        assert!(!second.is_woken());
        assert!(!registry.remove_waiter(&first));
        assert!(registry.remove_waiter(&second));
    }

    #[test]
    fn test_closed_registry_refuses_reservations() {
        let mut registry: Registry<u32> = Registry::new(IdleOrdering::Lifo, 3);
        registry.closed = true;
        assert!(!registry.reserve());
    }
}
