//! Periodic idle eviction, abandoned object reclamation and min-idle
//! replenishment

use std::io;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use tracing::{debug, trace, warn};

use crate::config::AbandonedConfig;
use crate::errors::PoolResult;
use crate::eviction::EvictionCandidate;
use crate::factory::{DestroyMode, PooledObjectFactory};
use crate::handle::PooledEntry;
use crate::metrics::MetricsTracker;
use crate::pool::PoolInner;
use crate::state::PooledObjectState;
use crate::usage::AbandonedReport;

/// Background thread running maintenance cycles for one pool
///
/// The thread holds only a weak reference, so dropping every pool handle
/// ends it. Dropping the sender wakes it immediately.
pub(crate) struct MaintenanceTask {
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
}

impl MaintenanceTask {
    pub fn start<T, F>(
        pool: Weak<PoolInner<T, F>>,
        pool_id: u64,
        interval: Duration,
    ) -> io::Result<Self>
    where
        T: Send + 'static,
        F: PooledObjectFactory<T> + 'static,
    {
        let (shutdown, signal) = channel::bounded::<()>(0);
        let thread = thread::Builder::new()
            .name(format!("resourcepool-{pool_id}-maintenance"))
            .spawn(move || {
                debug!(pool = pool_id, ?interval, "maintenance task started");
                loop {
                    match signal.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let Some(pool) = pool.upgrade() else {
                        break;
                    };
                    pool.run_maintenance();
                }
                debug!(pool = pool_id, "maintenance task stopped");
            })?;

        Ok(Self { shutdown, thread })
    }

    /// Stop the task, waiting for a cycle in progress to finish
    pub fn stop(self) {
        drop(self.shutdown);
        // The last pool handle may be released by the task itself.
        if self.thread.thread().id() == thread::current().id() {
            return;
        }
        if self.thread.join().is_err() {
            warn!("maintenance task panicked");
        }
    }
}

impl<T, F: PooledObjectFactory<T>> PoolInner<T, F> {
    /// One maintenance cycle
    pub(crate) fn run_maintenance(&self) {
        if self.is_closed() {
            return;
        }

        let evicted = self.evict();

        let abandoned = match &self.config.abandoned {
            Some(abandoned) if abandoned.remove_on_maintenance => self.remove_abandoned(abandoned),
            _ => 0,
        };

        let replenished = match self.ensure_min_idle() {
            Ok(created) => created,
            Err(err) => {
                warn!(pool = self.id, error = %err, "failed to replenish idle objects");
                0
            }
        };

        trace!(pool = self.id, evicted, abandoned, replenished, "maintenance cycle finished");
    }

    /// Reclaim borrowed objects unused for longer than the abandoned timeout
    pub(crate) fn remove_abandoned(&self, config: &AbandonedConfig) -> usize {
        let now = Instant::now();

        let reclaimed: Vec<(Arc<PooledEntry<T>>, Option<T>, Duration)> = {
            let mut registry = self.registry.lock();
            let mut reclaimed = Vec::new();
            for id in registry.active_ids() {
                let Some(entry) = registry.get(id).cloned() else {
                    continue;
                };
                let last_active = match self.usage.last_used(id) {
                    Some(used) => used.max(entry.last_borrow()),
                    None => entry.last_borrow(),
                };
                let unused_for = now.saturating_duration_since(last_active);
                if unused_for <= config.timeout {
                    continue;
                }
                // A borrower holding the resource is using it.
                let Some(mut slot) = entry.try_lock_slot() else {
                    continue;
                };
                // Losing this race means the borrower is returning it.
                if !entry
                    .state
                    .transition(PooledObjectState::Allocated, PooledObjectState::Abandoned)
                {
                    continue;
                }
                let object = slot.take();
                drop(slot);
                registry.detach(id);
                reclaimed.push((entry, object, unused_for));
            }
            reclaimed
        };

        let count = reclaimed.len();
        for (entry, object, unused_for) in reclaimed {
            if config.log_abandoned {
                let times = entry.times();
                config.log_sink.report(&AbandonedReport {
                    pool_id: self.id,
                    object_id: entry.id(),
                    borrow_count: times.borrow_count,
                    unused_for,
                    borrowed_by: times.borrowed_by,
                    last_used_by: self.usage.last_call_site(entry.id()),
                });
            }
            MetricsTracker::increment(&self.metrics.destroyed_by_abandonment);
            self.dispose(&entry, object, DestroyMode::Abandoned);
        }

        if count > 0 {
            debug!(pool = self.id, count, "reclaimed abandoned objects");
        }
        count
    }

    /// Sweep the idle queue, oldest first, applying the eviction policy
    pub(crate) fn evict(&self) -> usize {
        let policy = &self.config.eviction_policy;
        if policy.is_none() && !self.config.test_while_idle {
            return 0;
        }

        let now = Instant::now();
        let mut evicted = Vec::new();
        let mut to_test = Vec::new();
        {
            let mut registry = self.registry.lock();
            let mut idle_count = registry.idle_len();
            for id in registry.idle_ids_oldest_first() {
                let Some(entry) = registry.get(id).cloned() else {
                    continue;
                };
                // Borrowed since the snapshot was taken.
                if !entry
                    .state
                    .transition(PooledObjectState::Idle, PooledObjectState::EvictionTest)
                {
                    continue;
                }

                let (age, idle_time) = entry.age_and_idle_time(now);
                let candidate = EvictionCandidate {
                    age,
                    idle_time,
                    idle_count,
                    min_idle: self.config.min_idle,
                };

                if policy.should_evict(&candidate) {
                    entry
                        .state
                        .transition(PooledObjectState::EvictionTest, PooledObjectState::Invalid);
                    registry.detach(id);
                    idle_count -= 1;
                    evicted.push(entry);
                } else if self.config.test_while_idle {
                    entry
                        .state
                        .transition(PooledObjectState::EvictionTest, PooledObjectState::Validation);
                    registry.remove_idle(id);
                    to_test.push(entry);
                } else {
                    entry
                        .state
                        .transition(PooledObjectState::EvictionTest, PooledObjectState::Idle);
                }
            }
        }

        let count = evicted.len();
        for entry in evicted {
            MetricsTracker::increment(&self.metrics.destroyed_by_evictor);
            self.finish_destroy(entry, DestroyMode::Normal);
        }
        for entry in to_test {
            self.test_idle(entry);
        }

        if count > 0 {
            debug!(pool = self.id, count, "evicted idle objects");
        }
        count
    }

    fn test_idle(&self, entry: Arc<PooledEntry<T>>) {
        let passed = match entry.lock_object() {
            Some(mut object) => {
                self.factory.activate(&mut object).is_ok()
                    && self.factory.validate(&object)
                    && self.factory.passivate(&mut object).is_ok()
            }
            None => false,
        };

        if passed {
            let mut registry = self.registry.lock();
            if !registry.closed
                && entry
                    .state
                    .transition(PooledObjectState::Validation, PooledObjectState::Idle)
            {
                registry.restore_idle(entry.id());
                return;
            }
        } else {
            MetricsTracker::increment(&self.metrics.validation_failures);
            debug!(pool = self.id, object_id = entry.id(), "idle object failed validation");
        }
        self.destroy(entry, DestroyMode::Normal);
    }

    /// Create idle objects until `min_idle` are available, within `max_total`
    pub(crate) fn ensure_min_idle(&self) -> PoolResult<usize> {
        let mut created = 0;
        loop {
            {
                let mut registry = self.registry.lock();
                if registry.closed
                    || registry.idle_len() >= self.config.min_idle
                    || !registry.reserve()
                {
                    return Ok(created);
                }
            }
            self.create_idle()?;
            created += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{AbandonedConfig, PoolConfiguration};
    use crate::errors::{FactoryResult, PoolError};
    use crate::eviction::EvictionPolicy;
    use crate::factory::{DestroyMode, FnFactory, PooledObjectFactory};
    use crate::pool::GenericObjectPool;
    use crate::state::PooledObjectState;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingFactory {
        destroyed: Mutex<Vec<DestroyMode>>,
    }

    impl PooledObjectFactory<u32> for Arc<RecordingFactory> {
        fn create(&self) -> FactoryResult<u32> {
            Ok(7)
        }

        fn validate(&self, object: &u32) -> bool {
            *object == 7
        }

        fn destroy(&self, _object: u32, mode: DestroyMode) -> FactoryResult<()> {
            self.destroyed.lock().push(mode);
            Ok(())
        }
    }

    fn recording_pool(
        config: PoolConfiguration,
    ) -> (GenericObjectPool<u32, Arc<RecordingFactory>>, Arc<RecordingFactory>) {
        let factory = Arc::new(RecordingFactory::default());
        let pool = GenericObjectPool::new(Arc::clone(&factory), config).unwrap();
        (pool, factory)
    }

    #[test]
    fn test_idle_timeout_keeps_min_idle() {
        let config = PoolConfiguration::default()
            .with_min_idle(1)
            .with_eviction_policy(EvictionPolicy::IdleTimeout(Duration::from_millis(10)));
        let (pool, factory) = recording_pool(config);
        for _ in 0..3 {
            pool.add_object().unwrap();
        }

        thread::sleep(Duration::from_millis(30));
        pool.run_maintenance();

        assert_eq!(pool.num_idle(), 1);
        assert_eq!(pool.get_metrics().destroyed_by_evictor, 2);
        assert!(factory.destroyed.lock().iter().all(|mode| *mode == DestroyMode::Normal));
    }

    #[test]
    fn test_ttl_evicts_everything_then_replenishes() {
        let config = PoolConfiguration::default()
            .with_min_idle(2)
            .with_eviction_policy(EvictionPolicy::TimeToLive(Duration::from_millis(10)));
        let (pool, _) = recording_pool(config);
        pool.prepare_pool().unwrap();

        thread::sleep(Duration::from_millis(30));
        pool.run_maintenance();

        let metrics = pool.get_metrics();
        assert_eq!(metrics.destroyed_by_evictor, 2);
        assert_eq!(metrics.created, 4);
        assert_eq!(pool.num_idle(), 2);
    }

    #[test]
    fn test_idle_validation_destroys_broken() {
        let config = PoolConfiguration::default()
            .with_eviction_policy(EvictionPolicy::None)
            .with_test_while_idle(true);
        let (pool, factory) = recording_pool(config);

        let good = pool.borrow_object().unwrap();
        let bad = pool.borrow_object().unwrap();
        bad.with(|v| *v = 0).unwrap();
        drop(good);
        drop(bad);
        assert_eq!(pool.num_idle(), 2);

        pool.run_maintenance();
        assert_eq!(pool.num_idle(), 1);
        assert_eq!(factory.destroyed.lock().len(), 1);
        assert_eq!(pool.get_metrics().validation_failures, 1);
    }

    #[test]
    fn test_maintenance_reclaims_abandoned() {
        let config = PoolConfiguration::default().with_abandoned(
            AbandonedConfig::new()
                .with_remove_on_maintenance(true)
                .with_timeout(Duration::from_millis(10)),
        );
        let (pool, factory) = recording_pool(config);
        let lost = pool.borrow_object().unwrap();

        thread::sleep(Duration::from_millis(30));
        pool.run_maintenance();

        assert_eq!(pool.num_active(), 0);
        assert!(lost.is_reclaimed());
        assert!(matches!(lost.lock(), Err(PoolError::Reclaimed)));
        assert_eq!(*factory.destroyed.lock(), vec![DestroyMode::Abandoned]);

        // A late return is rejected without disturbing the counts.
        assert!(matches!(pool.return_object(lost), Err(PoolError::InvalidReturn)));
        assert_eq!(pool.num_idle(), 0);
    }

    #[test]
    fn test_background_task_runs_and_stops() {
        let config = PoolConfiguration::default()
            .with_min_idle(2)
            .with_maintenance_interval(Duration::from_millis(5));
        let pool = GenericObjectPool::new(FnFactory::new(|| 1u8), config).unwrap();

        let mut waited = Duration::ZERO;
        while pool.num_idle() < 2 && waited < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
            waited += Duration::from_millis(5);
        }
        assert_eq!(pool.num_idle(), 2);

        pool.close();
        assert_eq!(pool.num_idle(), 0);
    }

    #[test]
    fn test_eviction_skips_borrowed() {
        let config = PoolConfiguration::default()
            .with_eviction_policy(EvictionPolicy::TimeToLive(Duration::ZERO));
        let (pool, _) = recording_pool(config);
        let held = pool.borrow_object().unwrap();

        thread::sleep(Duration::from_millis(2));
        pool.run_maintenance();
        assert_eq!(held.state(), PooledObjectState::Allocated);
        assert_eq!(pool.num_active(), 1);
    }
}
