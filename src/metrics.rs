//! Metrics collection and export for resource pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time counts of a pool
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{FnFactory, GenericObjectPool, PoolConfiguration};
///
/// let pool = GenericObjectPool::new(FnFactory::new(|| 0u32), PoolConfiguration::new()).unwrap();
/// let _obj = pool.borrow_object().unwrap();
///
/// let status = pool.status();
/// assert_eq!(status.active, 1);
/// assert_eq!(status.idle, 0);
/// assert_eq!(status.waiters, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolStatus {
    /// Objects currently borrowed
    pub active: usize,

    /// Objects currently idle in the pool
    pub idle: usize,

    /// Borrowers blocked waiting for an object
    pub waiters: usize,

    pub max_total: usize,
}

/// Lifetime counters plus the current counts of a pool
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    pub created: u64,
    pub destroyed: u64,
    pub borrowed: u64,
    pub returned: u64,

    /// Idle objects destroyed by the eviction policy
    pub destroyed_by_evictor: u64,

    /// Borrowed objects reclaimed as abandoned
    pub destroyed_by_abandonment: u64,

    pub validation_failures: u64,
    pub invalid_returns: u64,

    /// Borrows that gave up because the pool was exhausted
    pub exhausted_events: u64,

    pub status: PoolStatus,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("created".to_string(), self.created.to_string());
        metrics.insert("destroyed".to_string(), self.destroyed.to_string());
        metrics.insert("borrowed".to_string(), self.borrowed.to_string());
        metrics.insert("returned".to_string(), self.returned.to_string());
        metrics.insert("destroyed_by_evictor".to_string(), self.destroyed_by_evictor.to_string());
        metrics.insert(
            "destroyed_by_abandonment".to_string(),
            self.destroyed_by_abandonment.to_string(),
        );
        metrics.insert("validation_failures".to_string(), self.validation_failures.to_string());
        metrics.insert("invalid_returns".to_string(), self.invalid_returns.to_string());
        metrics.insert("exhausted_events".to_string(), self.exhausted_events.to_string());
        metrics.insert("active".to_string(), self.status.active.to_string());
        metrics.insert("idle".to_string(), self.status.idle.to_string());
        metrics.insert("waiters".to_string(), self.status.waiters.to_string());
        metrics.insert("max_total".to_string(), self.status.max_total.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "prometheus")]
pub struct MetricsExporter;

#[cfg(feature = "prometheus")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::{FnFactory, GenericObjectPool, MetricsExporter, PoolConfiguration};
    /// use std::collections::HashMap;
    ///
    /// let pool =
    ///     GenericObjectPool::new(FnFactory::new(|| 0u32), PoolConfiguration::new()).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output =
    ///     MetricsExporter::export_prometheus(&pool.get_metrics(), "my_pool", Some(&tags))
    ///         .unwrap();
    /// assert!(output.contains("resourcepool_objects_active"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> prometheus::Result<String> {
        use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

        let mut labels = HashMap::new();
        labels.insert("pool".to_string(), pool_name.to_string());
        if let Some(tags) = tags {
            labels.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let registry = Registry::new_custom(Some("resourcepool".to_string()), Some(labels))?;

        let gauges = [
            ("objects_active", "Current borrowed objects", metrics.status.active),
            ("objects_idle", "Current idle objects", metrics.status.idle),
            ("waiters", "Borrowers blocked on the pool", metrics.status.waiters),
            ("max_total", "Maximum objects alive at once", metrics.status.max_total),
        ];
        for (name, help, value) in gauges {
            let gauge = IntGauge::with_opts(Opts::new(name, help))?;
            gauge.set(i64::try_from(value).unwrap_or(i64::MAX));
            registry.register(Box::new(gauge))?;
        }

        let counters = [
            ("objects_created_total", "Objects created", metrics.created),
            ("objects_destroyed_total", "Objects destroyed", metrics.destroyed),
            ("objects_borrowed_total", "Successful borrows", metrics.borrowed),
            ("objects_returned_total", "Objects returned", metrics.returned),
            ("evictions_total", "Idle objects evicted", metrics.destroyed_by_evictor),
            ("abandoned_total", "Abandoned objects reclaimed", metrics.destroyed_by_abandonment),
            ("validation_failures_total", "Validation failures", metrics.validation_failures),
            ("invalid_returns_total", "Rejected returns", metrics.invalid_returns),
            ("exhausted_total", "Borrows failed on an exhausted pool", metrics.exhausted_events),
        ];
        for (name, help, value) in counters {
            let counter = IntCounter::with_opts(Opts::new(name, help))?;
            counter.inc_by(value);
            registry.register(Box::new(counter))?;
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Internal metrics tracker
#[derive(Default)]
pub(crate) struct MetricsTracker {
    pub created: AtomicU64,
    pub destroyed: AtomicU64,
    pub borrowed: AtomicU64,
    pub returned: AtomicU64,
    pub destroyed_by_evictor: AtomicU64,
    pub destroyed_by_abandonment: AtomicU64,
    pub validation_failures: AtomicU64,
    pub invalid_returns: AtomicU64,
    pub exhausted_events: AtomicU64,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self, status: PoolStatus) -> PoolMetrics {
        PoolMetrics {
            created: self.created.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            borrowed: self.borrowed.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            destroyed_by_evictor: self.destroyed_by_evictor.load(Ordering::Relaxed),
            destroyed_by_abandonment: self.destroyed_by_abandonment.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            invalid_returns: self.invalid_returns.load(Ordering::Relaxed),
            exhausted_events: self.exhausted_events.load(Ordering::Relaxed),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PoolMetrics {
        let tracker = MetricsTracker::new();
        MetricsTracker::increment(&tracker.created);
        MetricsTracker::increment(&tracker.created);
        MetricsTracker::increment(&tracker.borrowed);
        tracker.get_metrics(PoolStatus {
            active: 1,
            idle: 1,
            waiters: 0,
            max_total: 4,
        })
    }

    #[test]
    fn test_export_map() {
        let exported = sample().export();
        assert_eq!(exported["created"], "2");
        assert_eq!(exported["borrowed"], "1");
        assert_eq!(exported["active"], "1");
        assert_eq!(exported["max_total"], "4");
    }

    #[cfg(feature = "prometheus")]
    #[test]
    fn test_prometheus_text() {
        let output = MetricsExporter::export_prometheus(&sample(), "buffers", None).unwrap();
        assert!(output.contains("resourcepool_objects_created_total"));
        assert!(output.contains("pool=\"buffers\""));
        assert!(output.contains("# TYPE resourcepool_objects_idle gauge"));
    }
}
