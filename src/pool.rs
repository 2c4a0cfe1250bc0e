//! Core resource pool: borrow/return coordination

use crate::config::PoolConfiguration;
use crate::errors::{FactoryOperation, PoolError, PoolResult};
use crate::factory::{DestroyMode, PooledObjectFactory};
use crate::handle::PooledEntry;
use crate::maintenance::MaintenanceTask;
use crate::metrics::{MetricsTracker, PoolMetrics, PoolStatus};
use crate::registry::{Acquisition, Registry, Waiter};
use crate::state::PooledObjectState;
use crate::usage::{CallSite, UsageTracker};

use parking_lot::{MappedMutexGuard, Mutex};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// The pool a borrowed object goes back to
pub(crate) trait ObjectOwner<T>: Send + Sync {
    fn pool_id(&self) -> u64;
    fn release(&self, entry: Arc<PooledEntry<T>>) -> PoolResult<()>;
    fn track_use(&self, object_id: u64, caller: &'static Location<'static>);
}

/// A borrowed object that automatically returns to its pool when dropped
///
/// Access goes through [`lock`](PooledObject::lock) or
/// [`with`](PooledObject::with). Each access counts as a use for abandoned
/// object detection when usage tracking is enabled.
pub struct PooledObject<T> {
    object_id: u64,
    entry: Option<Arc<PooledEntry<T>>>,
    owner: Arc<dyn ObjectOwner<T>>,
}

impl<T> PooledObject<T> {
    fn new(entry: Arc<PooledEntry<T>>, owner: Arc<dyn ObjectOwner<T>>) -> Self {
        Self {
            object_id: entry.id(),
            entry: Some(entry),
            owner,
        }
    }

    /// Identity of the object within its pool
    pub fn id(&self) -> u64 {
        self.object_id
    }

    /// Identity of the pool the object was borrowed from
    pub fn pool_id(&self) -> u64 {
        self.owner.pool_id()
    }

    pub fn state(&self) -> PooledObjectState {
        self.entry
            .as_ref()
            .map_or(PooledObjectState::Invalid, |entry| entry.state.load())
    }

    /// Whether the pool took the object back as abandoned
    pub fn is_reclaimed(&self) -> bool {
        matches!(
            self.state(),
            PooledObjectState::Abandoned | PooledObjectState::Invalid
        )
    }

    /// Lock the underlying resource for use
    ///
    /// Fails with [`PoolError::Reclaimed`] once the pool has reclaimed the
    /// object.
    #[track_caller]
    pub fn lock(&self) -> PoolResult<MappedMutexGuard<'_, T>> {
        let entry = self.entry.as_ref().ok_or(PoolError::Reclaimed)?;
        let object = entry.lock_object().ok_or(PoolError::Reclaimed)?;
        self.owner.track_use(self.object_id, Location::caller());
        Ok(object)
    }

    /// Run `f` against the underlying resource
    #[track_caller]
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> PoolResult<R> {
        let mut object = self.lock()?;
        Ok(f(&mut object))
    }

    /// Record a use without touching the resource
    ///
    /// Recorded only while the resource is still in place. A reclaim empties
    /// the slot under the same lock, so no record outlives the object. While
    /// a guard from [`lock`](PooledObject::lock) is held the object counts as
    /// in use anyway.
    #[track_caller]
    pub fn mark_used(&self) {
        let caller = Location::caller();
        if let Some(entry) = &self.entry
            && let Some(slot) = entry.try_lock_slot()
            && slot.is_some()
        {
            self.owner.track_use(self.object_id, caller);
        }
    }
}

impl<T> fmt::Debug for PooledObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledObject")
            .field("pool_id", &self.owner.pool_id())
            .field("object_id", &self.object_id)
            .field("state", &self.state())
            .finish()
    }
}

impl<T> Drop for PooledObject<T> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            // Failures are logged by the pool.
            let _ = self.owner.release(entry);
        }
    }
}

/// Shared state of a pool
pub(crate) struct PoolInner<T, F: PooledObjectFactory<T>> {
    pub id: u64,
    pub factory: F,
    pub config: PoolConfiguration,
    pub registry: Mutex<Registry<T>>,
    pub usage: UsageTracker,
    pub metrics: MetricsTracker,
    next_object_id: AtomicU64,
    maintenance: Mutex<Option<MaintenanceTask>>,
}

impl<T, F: PooledObjectFactory<T>> PoolInner<T, F> {
    pub fn status(&self) -> PoolStatus {
        self.registry.lock().status()
    }

    pub fn is_closed(&self) -> bool {
        self.registry.lock().closed
    }

    fn borrow(
        &self,
        timeout: Option<Duration>,
        caller: &'static Location<'static>,
    ) -> PoolResult<Arc<PooledEntry<T>>> {
        if let Some(abandoned) = &self.config.abandoned
            && abandoned.remove_on_borrow
            && !self.is_closed()
            && (abandoned.reclaim_trigger)(&self.status())
        {
            self.remove_abandoned(abandoned);
        }

        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));

        loop {
            match self.acquire(timeout, deadline)? {
                Acquisition::Idle(entry) => {
                    let prepared = self.prepare_for_borrower(&entry, self.config.test_on_borrow);
                    if let Err(err) = prepared {
                        debug!(
                            pool = self.id,
                            object_id = entry.id(),
                            error = %err,
                            "idle object unusable, destroying it"
                        );
                        self.destroy(entry, DestroyMode::Normal);
                        continue;
                    }
                    return Ok(self.hand_out(entry, caller));
                }
                Acquisition::Create => {
                    let entry = self.create_active()?;
                    let validate = self.config.test_on_create || self.config.test_on_borrow;
                    if let Err(err) = self.prepare_for_borrower(&entry, validate) {
                        self.destroy(entry, DestroyMode::Normal);
                        return Err(err);
                    }
                    return Ok(self.hand_out(entry, caller));
                }
            }
        }
    }

    /// Wait for an idle object or a free slot
    fn acquire(
        &self,
        timeout: Option<Duration>,
        deadline: Option<Instant>,
    ) -> PoolResult<Acquisition<T>> {
        let mut registry = self.registry.lock();
        let mut waiter: Option<Arc<Waiter>> = None;

        loop {
            if registry.closed {
                if let Some(waiter) = &waiter {
                    registry.remove_waiter(waiter);
                }
                return Err(PoolError::Closed);
            }

            let may_take = match &waiter {
                Some(waiter) => waiter.is_woken() || registry.is_first_waiter(waiter),
                None => !registry.has_waiters(),
            };
            if may_take && let Some(acquisition) = registry.acquire() {
                if let Some(waiter) = &waiter {
                    registry.remove_waiter(waiter);
                }
                registry.wake_if_available();
                return Ok(acquisition);
            }

            let expired = deadline.is_some_and(|deadline| Instant::now() >= deadline);
            let no_wait = timeout.is_some_and(|t| t.is_zero());
            if !self.config.block_when_exhausted || expired || no_wait {
                if let Some(waiter) = &waiter
                    && !registry.remove_waiter(waiter)
                {
                    // Pass on a wake this waiter will not use.
                    registry.wake_if_available();
                }
                drop(registry);
                MetricsTracker::increment(&self.metrics.exhausted_events);
                return Err(PoolError::PoolExhausted(timeout.unwrap_or(Duration::ZERO)));
            }

            let current = match waiter.take() {
                Some(queued) => {
                    if queued.is_woken() {
                        registry.requeue_waiter(&queued);
                    }
                    queued
                }
                None => {
                    let fresh = Arc::new(Waiter::new());
                    registry.enqueue_waiter(&fresh);
                    fresh
                }
            };
            waiter = Some(Arc::clone(&current));

            match deadline {
                Some(deadline) => {
                    current.signal.wait_until(&mut registry, deadline);
                }
                None => current.signal.wait(&mut registry),
            }
        }
    }

    fn prepare_for_borrower(&self, entry: &PooledEntry<T>, validate: bool) -> PoolResult<()> {
        let mut object = entry.lock_object().ok_or(PoolError::Reclaimed)?;
        self.factory
            .activate(&mut object)
            .map_err(|err| PoolError::factory(FactoryOperation::Activate, err))?;
        if validate && !self.factory.validate(&object) {
            MetricsTracker::increment(&self.metrics.validation_failures);
            return Err(PoolError::ValidationFailed);
        }
        Ok(())
    }

    fn hand_out(
        &self,
        entry: Arc<PooledEntry<T>>,
        caller: &'static Location<'static>,
    ) -> Arc<PooledEntry<T>> {
        if let Some(abandoned) = &self.config.abandoned
            && abandoned.log_abandoned
        {
            entry.set_borrowed_by(Some(CallSite::capture(
                abandoned.require_full_stack_trace,
                caller,
            )));
        }
        MetricsTracker::increment(&self.metrics.borrowed);
        trace!(pool = self.id, object_id = entry.id(), "object borrowed");
        entry
    }

    fn next_object_id(&self) -> u64 {
        self.next_object_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Create an object for a borrower; a slot must already be reserved
    fn create_active(&self) -> PoolResult<Arc<PooledEntry<T>>> {
        let object = self.create_object()?;
        let entry = Arc::new(PooledEntry::new(
            self.next_object_id(),
            object,
            PooledObjectState::Allocated,
        ));

        let mut registry = self.registry.lock();
        if registry.closed {
            registry.cancel_reservation();
            drop(registry);
            self.finish_destroy(entry, DestroyMode::Normal);
            return Err(PoolError::Closed);
        }
        registry.register_active(Arc::clone(&entry));
        Ok(entry)
    }

    /// Create an object straight into the idle queue; a slot must already
    /// be reserved
    pub(crate) fn create_idle(&self) -> PoolResult<()> {
        let object = self.create_object()?;
        let entry = Arc::new(PooledEntry::new(
            self.next_object_id(),
            object,
            PooledObjectState::Idle,
        ));

        let ready = match entry.lock_object() {
            Some(mut object) => {
                if self.config.test_on_create && !self.factory.validate(&object) {
                    MetricsTracker::increment(&self.metrics.validation_failures);
                    Err(PoolError::ValidationFailed)
                } else {
                    self.factory
                        .passivate(&mut object)
                        .map_err(|err| PoolError::factory(FactoryOperation::Passivate, err))
                }
            }
            None => Err(PoolError::Reclaimed),
        };

        let mut registry = self.registry.lock();
        let outcome = if registry.closed {
            Err(PoolError::Closed)
        } else if registry.idle_len() >= self.config.max_idle {
            Err(PoolError::PoolExhausted(Duration::ZERO))
        } else {
            ready
        };
        match outcome {
            Ok(()) => {
                registry.register_idle(entry);
                Ok(())
            }
            Err(err) => {
                registry.cancel_reservation();
                drop(registry);
                self.finish_destroy(entry, DestroyMode::Normal);
                Err(err)
            }
        }
    }

    fn create_object(&self) -> PoolResult<T> {
        match self.factory.create() {
            Ok(object) => {
                MetricsTracker::increment(&self.metrics.created);
                Ok(object)
            }
            Err(err) => {
                self.registry.lock().cancel_reservation();
                warn!(pool = self.id, error = %err, "factory failed to create object");
                Err(PoolError::factory(FactoryOperation::Create, err))
            }
        }
    }

    pub(crate) fn return_entry(&self, entry: Arc<PooledEntry<T>>) -> PoolResult<()> {
        let id = entry.id();
        let closed = {
            let registry = self.registry.lock();
            if !registry.is_active(id) {
                drop(registry);
                MetricsTracker::increment(&self.metrics.invalid_returns);
                debug!(
                    pool = self.id,
                    object_id = id,
                    state = %entry.state.load(),
                    "ignored return of an object no longer borrowed from this pool"
                );
                return Err(PoolError::InvalidReturn);
            }
            registry.closed
        };

        if !entry
            .state
            .transition(PooledObjectState::Allocated, PooledObjectState::Returning)
        {
            MetricsTracker::increment(&self.metrics.invalid_returns);
            debug!(pool = self.id, object_id = id, "object reclaimed while being returned");
            return Err(PoolError::InvalidReturn);
        }
        entry.mark_returned();
        self.usage.forget(id);
        MetricsTracker::increment(&self.metrics.returned);

        if closed {
            self.destroy(entry, DestroyMode::Normal);
            return Err(PoolError::Closed);
        }

        if self.config.test_on_return && !self.validate_entry(&entry) {
            MetricsTracker::increment(&self.metrics.validation_failures);
            debug!(pool = self.id, object_id = id, "returned object failed validation");
            self.destroy(entry, DestroyMode::Normal);
            return Ok(());
        }

        let passivated = entry
            .lock_object()
            .map(|mut object| self.factory.passivate(&mut object));
        match passivated {
            Some(Ok(())) => {}
            Some(Err(err)) => {
                warn!(
                    pool = self.id,
                    object_id = id,
                    error = %err,
                    "factory failed to passivate object"
                );
                self.destroy(entry, DestroyMode::Normal);
                return Ok(());
            }
            None => {
                self.destroy(entry, DestroyMode::Normal);
                return Err(PoolError::Reclaimed);
            }
        }

        let mut registry = self.registry.lock();
        if registry.closed {
            drop(registry);
            self.destroy(entry, DestroyMode::Normal);
            return Err(PoolError::Closed);
        }
        if registry.idle_len() >= self.config.max_idle {
            drop(registry);
            trace!(
                pool = self.id,
                object_id = id,
                "idle ceiling reached, destroying returned object"
            );
            self.destroy(entry, DestroyMode::Normal);
            return Ok(());
        }
        entry
            .state
            .transition(PooledObjectState::Returning, PooledObjectState::Idle);
        registry.checkin(id);
        trace!(pool = self.id, object_id = id, "object returned");
        Ok(())
    }

    fn validate_entry(&self, entry: &PooledEntry<T>) -> bool {
        entry
            .lock_object()
            .is_some_and(|object| self.factory.validate(&object))
    }

    fn invalidate_entry(&self, entry: Arc<PooledEntry<T>>) -> PoolResult<()> {
        let closed = {
            let registry = self.registry.lock();
            if !registry.is_active(entry.id()) {
                drop(registry);
                MetricsTracker::increment(&self.metrics.invalid_returns);
                return Err(PoolError::InvalidReturn);
            }
            registry.closed
        };
        if !entry.state.transition_any(
            &[PooledObjectState::Allocated, PooledObjectState::Returning],
            PooledObjectState::Invalid,
        ) {
            MetricsTracker::increment(&self.metrics.invalid_returns);
            return Err(PoolError::InvalidReturn);
        }
        self.destroy(entry, DestroyMode::Normal);
        if closed {
            return Err(PoolError::Closed);
        }
        Ok(())
    }

    /// Untrack and destroy an object
    pub(crate) fn destroy(&self, entry: Arc<PooledEntry<T>>, mode: DestroyMode) {
        self.registry.lock().detach(entry.id());
        self.finish_destroy(entry, mode);
    }

    /// Destroy an object already detached from the registry
    ///
    /// Only for objects no borrower holds; taking the resource waits on its
    /// lock.
    pub(crate) fn finish_destroy(&self, entry: Arc<PooledEntry<T>>, mode: DestroyMode) {
        entry.state.invalidate();
        let object = entry.take_object();
        self.dispose(&entry, object, mode);
    }

    /// Hand a detached object's resource to the factory for destruction
    pub(crate) fn dispose(&self, entry: &PooledEntry<T>, object: Option<T>, mode: DestroyMode) {
        entry.state.invalidate();
        // After the slot is empty no borrower can record another use.
        self.usage.forget(entry.id());
        MetricsTracker::increment(&self.metrics.destroyed);
        if let Some(object) = object
            && let Err(err) = self.factory.destroy(object, mode)
        {
            warn!(
                pool = self.id,
                object_id = entry.id(),
                error = %err,
                "factory failed to destroy object"
            );
        }
    }

    fn clear(&self) {
        let idle = self.registry.lock().drain_idle();
        for entry in idle {
            self.finish_destroy(entry, DestroyMode::Normal);
        }
    }

    fn close(&self) {
        let idle = {
            let mut registry = self.registry.lock();
            if registry.closed {
                return;
            }
            registry.closed = true;
            registry.wake_all();
            registry.drain_idle()
        };

        let maintenance = self.maintenance.lock().take();
        if let Some(task) = maintenance {
            task.stop();
        }

        for entry in idle {
            self.finish_destroy(entry, DestroyMode::Normal);
        }
        debug!(pool = self.id, "pool closed");
    }
}

impl<T, F: PooledObjectFactory<T>> Drop for PoolInner<T, F> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T, F> ObjectOwner<T> for PoolInner<T, F>
where
    T: Send + 'static,
    F: PooledObjectFactory<T> + 'static,
{
    fn pool_id(&self) -> u64 {
        self.id
    }

    fn release(&self, entry: Arc<PooledEntry<T>>) -> PoolResult<()> {
        self.return_entry(entry)
    }

    fn track_use(&self, object_id: u64, caller: &'static Location<'static>) {
        self.usage.track(object_id, caller);
    }
}

/// Thread-safe pool of factory-created objects
///
/// Cloning the pool is cheap; all clones share the same objects.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{FnFactory, GenericObjectPool, PoolConfiguration};
///
/// let config = PoolConfiguration::new().with_max_total(2);
/// let factory = FnFactory::new(|| String::with_capacity(64));
/// let pool = GenericObjectPool::new(factory, config).unwrap();
///
/// {
///     let buffer = pool.borrow_object().unwrap();
///     buffer.lock().unwrap().push_str("hello");
///     assert_eq!(pool.num_active(), 1);
///     // Object automatically returned when `buffer` goes out of scope
/// }
///
/// assert_eq!(pool.num_active(), 0);
/// assert_eq!(pool.num_idle(), 1);
/// ```
pub struct GenericObjectPool<T, F: PooledObjectFactory<T>> {
    inner: Arc<PoolInner<T, F>>,
}

impl<T, F: PooledObjectFactory<T>> Clone for GenericObjectPool<T, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, F: PooledObjectFactory<T>> fmt::Debug for GenericObjectPool<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericObjectPool")
            .field("id", &self.inner.id)
            .field("status", &self.inner.status())
            .finish()
    }
}

impl<T, F> GenericObjectPool<T, F>
where
    T: Send + 'static,
    F: PooledObjectFactory<T> + 'static,
{
    /// Create a pool, starting the maintenance task if configured
    ///
    /// # Errors
    /// Returns an error if `config` is invalid or the maintenance task
    /// cannot be started.
    pub fn new(factory: F, config: PoolConfiguration) -> PoolResult<Self> {
        config.validate()?;

        let usage = match &config.abandoned {
            Some(abandoned) => UsageTracker::new(
                abandoned.use_usage_tracking,
                abandoned
                    .log_abandoned
                    .then_some(abandoned.require_full_stack_trace),
            ),
            None => UsageTracker::disabled(),
        };

        let inner = Arc::new(PoolInner {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            factory,
            registry: Mutex::new(Registry::new(config.ordering, config.max_total)),
            usage,
            metrics: MetricsTracker::new(),
            next_object_id: AtomicU64::new(1),
            maintenance: Mutex::new(None),
            config,
        });

        if let Some(interval) = inner.config.effective_maintenance_interval() {
            let task = MaintenanceTask::start(Arc::downgrade(&inner), inner.id, interval)
                .map_err(|err| PoolError::MaintenanceStart(err.to_string()))?;
            *inner.maintenance.lock() = Some(task);
        }

        debug!(
            pool = inner.id,
            max_total = inner.config.max_total,
            max_idle = inner.config.max_idle,
            min_idle = inner.config.min_idle,
            "pool created"
        );
        Ok(Self { inner })
    }

    /// Identity of this pool instance
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn config(&self) -> &PoolConfiguration {
        &self.inner.config
    }

    /// Borrow an object, waiting up to the configured `max_wait`
    #[track_caller]
    pub fn borrow_object(&self) -> PoolResult<PooledObject<T>> {
        self.borrow_at(self.inner.config.max_wait, Location::caller())
    }

    /// Borrow an object, waiting at most `timeout`
    #[track_caller]
    pub fn borrow_object_timeout(&self, timeout: Duration) -> PoolResult<PooledObject<T>> {
        self.borrow_at(Some(timeout), Location::caller())
    }

    /// Borrow an object only if one is available right now
    #[track_caller]
    pub fn try_borrow_object(&self) -> Option<PooledObject<T>> {
        self.borrow_at(Some(Duration::ZERO), Location::caller()).ok()
    }

    /// Borrow an object without blocking the async runtime
    ///
    /// The wait runs on tokio's blocking thread pool and honors `max_wait`.
    #[track_caller]
    pub fn borrow_object_async(
        &self,
    ) -> impl Future<Output = PoolResult<PooledObject<T>>> + Send + 'static {
        let pool = self.clone();
        let caller = Location::caller();
        async move {
            tokio::task::spawn_blocking(move || pool.borrow_at(pool.inner.config.max_wait, caller))
                .await
                .map_err(|_| PoolError::Cancelled)?
        }
    }

    fn borrow_at(
        &self,
        timeout: Option<Duration>,
        caller: &'static Location<'static>,
    ) -> PoolResult<PooledObject<T>> {
        let entry = self.inner.borrow(timeout, caller)?;
        let owner: Arc<dyn ObjectOwner<T>> = self.inner.clone();
        Ok(PooledObject::new(entry, owner))
    }

    /// Return a borrowed object explicitly
    ///
    /// Dropping the object has the same effect. An object borrowed from a
    /// different pool is rejected with [`PoolError::InvalidReturn`] and goes
    /// back to the pool it came from.
    pub fn return_object(&self, mut object: PooledObject<T>) -> PoolResult<()> {
        if object.pool_id() != self.inner.id {
            MetricsTracker::increment(&self.inner.metrics.invalid_returns);
            warn!(
                pool = self.inner.id,
                owner = object.pool_id(),
                object_id = object.id(),
                "rejected return of an object borrowed from another pool"
            );
            return Err(PoolError::InvalidReturn);
        }
        match object.entry.take() {
            Some(entry) => self.inner.return_entry(entry),
            None => Err(PoolError::InvalidReturn),
        }
    }

    /// Destroy a borrowed object instead of returning it
    pub fn invalidate_object(&self, mut object: PooledObject<T>) -> PoolResult<()> {
        if object.pool_id() != self.inner.id {
            MetricsTracker::increment(&self.inner.metrics.invalid_returns);
            return Err(PoolError::InvalidReturn);
        }
        match object.entry.take() {
            Some(entry) => self.inner.invalidate_entry(entry),
            None => Err(PoolError::InvalidReturn),
        }
    }

    /// Create one object straight into the idle queue
    ///
    /// # Errors
    /// [`PoolError::PoolExhausted`] when the pool is full or at its idle
    /// ceiling.
    pub fn add_object(&self) -> PoolResult<()> {
        {
            let mut registry = self.inner.registry.lock();
            if registry.closed {
                return Err(PoolError::Closed);
            }
            if registry.idle_len() >= self.inner.config.max_idle || !registry.reserve() {
                return Err(PoolError::PoolExhausted(Duration::ZERO));
            }
        }
        self.inner.create_idle()
    }

    /// Fill the idle queue up to `min_idle`
    pub fn prepare_pool(&self) -> PoolResult<usize> {
        if self.inner.is_closed() {
            return Err(PoolError::Closed);
        }
        self.inner.ensure_min_idle()
    }

    /// Run one maintenance cycle on the calling thread
    pub fn run_maintenance(&self) {
        self.inner.run_maintenance();
    }

    /// Destroy every idle object
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Close the pool
    ///
    /// Waiting borrowers fail with [`PoolError::Closed`], idle objects are
    /// destroyed and the maintenance task stops. Objects still borrowed are
    /// destroyed when they come back.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Number of borrowed objects
    pub fn num_active(&self) -> usize {
        self.inner.status().active
    }

    /// Number of idle objects
    pub fn num_idle(&self) -> usize {
        self.inner.status().idle
    }

    /// Number of borrowers blocked waiting for an object
    pub fn num_waiters(&self) -> usize {
        self.inner.status().waiters
    }

    pub fn status(&self) -> PoolStatus {
        self.inner.status()
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.inner.metrics.get_metrics(self.inner.status())
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }
}
