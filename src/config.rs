//! Pool configuration options

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{PoolError, PoolResult};
use crate::eviction::EvictionPolicy;
use crate::metrics::PoolStatus;
use crate::usage::{AbandonedLogSink, TracingLogSink};

/// Order in which idle objects are handed out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IdleOrdering {
    /// Most recently returned object first
    #[default]
    Lifo,

    /// Longest idle object first
    Fifo,
}

/// Decides whether a borrow should sweep for abandoned objects first
pub type ReclaimTrigger = fn(&PoolStatus) -> bool;

/// Fewer than two idle objects and fewer than three free slots.
pub fn default_reclaim_trigger(status: &PoolStatus) -> bool {
    status.idle < 2 && status.active + 3 > status.max_total
}

/// Settings for reclaiming objects their borrowers stopped using
///
/// # Examples
///
/// ```
/// use esox_resourcepool::AbandonedConfig;
/// use std::time::Duration;
///
/// let abandoned = AbandonedConfig::new()
///     .with_remove_on_maintenance(true)
///     .with_timeout(Duration::from_secs(120))
///     .with_usage_tracking(true);
///
/// assert!(abandoned.remove_on_maintenance);
/// assert!(!abandoned.remove_on_borrow);
/// assert_eq!(abandoned.timeout, Duration::from_secs(120));
/// ```
#[derive(Clone)]
pub struct AbandonedConfig {
    /// Sweep for abandoned objects during borrow when the trigger holds
    pub remove_on_borrow: bool,

    /// Sweep for abandoned objects on every maintenance run
    pub remove_on_maintenance: bool,

    /// Time without use or return after which a borrowed object is abandoned
    pub timeout: Duration,

    /// Report reclaimed objects to the log sink
    pub log_abandoned: bool,

    /// Capture full backtraces instead of the caller's source location
    pub require_full_stack_trace: bool,

    /// Refresh the last-use instant on every access through a borrowed object
    pub use_usage_tracking: bool,

    /// Borrow-time sweep heuristic
    pub reclaim_trigger: ReclaimTrigger,

    /// Destination for abandoned object reports
    pub log_sink: Arc<dyn AbandonedLogSink>,
}

impl Default for AbandonedConfig {
    fn default() -> Self {
        Self {
            remove_on_borrow: false,
            remove_on_maintenance: false,
            timeout: Duration::from_secs(300),
            log_abandoned: false,
            require_full_stack_trace: true,
            use_usage_tracking: false,
            reclaim_trigger: default_reclaim_trigger,
            log_sink: Arc::new(TracingLogSink),
        }
    }
}

impl fmt::Debug for AbandonedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbandonedConfig")
            .field("remove_on_borrow", &self.remove_on_borrow)
            .field("remove_on_maintenance", &self.remove_on_maintenance)
            .field("timeout", &self.timeout)
            .field("log_abandoned", &self.log_abandoned)
            .field("require_full_stack_trace", &self.require_full_stack_trace)
            .field("use_usage_tracking", &self.use_usage_tracking)
            .finish_non_exhaustive()
    }
}

impl AbandonedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remove_on_borrow(mut self, enabled: bool) -> Self {
        self.remove_on_borrow = enabled;
        self
    }

    pub fn with_remove_on_maintenance(mut self, enabled: bool) -> Self {
        self.remove_on_maintenance = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable abandoned object reports; `full_stack_trace` picks the evidence kind
    pub fn with_log_abandoned(mut self, enabled: bool, full_stack_trace: bool) -> Self {
        self.log_abandoned = enabled;
        self.require_full_stack_trace = full_stack_trace;
        self
    }

    pub fn with_usage_tracking(mut self, enabled: bool) -> Self {
        self.use_usage_tracking = enabled;
        self
    }

    pub fn with_reclaim_trigger(mut self, trigger: ReclaimTrigger) -> Self {
        self.reclaim_trigger = trigger;
        self
    }

    pub fn with_log_sink(mut self, sink: Arc<dyn AbandonedLogSink>) -> Self {
        self.log_sink = sink;
        self
    }
}

/// Configuration for pool behavior
///
/// The value is consumed by [`GenericObjectPool::new`](crate::GenericObjectPool::new),
/// which validates it once; a running pool never sees it change.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{IdleOrdering, PoolConfiguration};
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_max_total(16)
///     .with_max_idle(8)
///     .with_min_idle(2)
///     .with_ordering(IdleOrdering::Fifo)
///     .with_max_wait(Duration::from_secs(5));
///
/// assert_eq!(config.max_total, 16);
/// assert_eq!(config.max_wait, Some(Duration::from_secs(5)));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfiguration {
    /// Maximum number of objects alive at once (idle + borrowed)
    pub max_total: usize,

    /// Maximum number of idle objects kept after a return
    pub max_idle: usize,

    /// Idle objects the maintenance task keeps around
    pub min_idle: usize,

    pub ordering: IdleOrdering,

    /// How long a borrow waits when the pool is exhausted; `None` waits forever
    pub max_wait: Option<Duration>,

    /// Wait for an object when exhausted instead of failing immediately
    pub block_when_exhausted: bool,

    pub test_on_create: bool,
    pub test_on_borrow: bool,
    pub test_on_return: bool,

    /// Validate idle objects that survive the eviction policy
    pub test_while_idle: bool,

    pub eviction_policy: EvictionPolicy,

    /// Period of the maintenance task; `None` or zero disables it
    pub maintenance_interval: Option<Duration>,

    /// Abandoned object reclamation, disabled when `None`
    pub abandoned: Option<AbandonedConfig>,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            max_total: 8,
            max_idle: 8,
            min_idle: 0,
            ordering: IdleOrdering::Lifo,
            max_wait: None,
            block_when_exhausted: true,
            test_on_create: false,
            test_on_borrow: false,
            test_on_return: false,
            test_while_idle: false,
            eviction_policy: EvictionPolicy::IdleTimeout(Duration::from_secs(1800)),
            maintenance_interval: None,
            abandoned: None,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_total(mut self, max_total: usize) -> Self {
        self.max_total = max_total;
        self
    }

    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    pub fn with_min_idle(mut self, min_idle: usize) -> Self {
        self.min_idle = min_idle;
        self
    }

    pub fn with_ordering(mut self, ordering: IdleOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn with_block_when_exhausted(mut self, block: bool) -> Self {
        self.block_when_exhausted = block;
        self
    }

    pub fn with_test_on_create(mut self, enabled: bool) -> Self {
        self.test_on_create = enabled;
        self
    }

    pub fn with_test_on_borrow(mut self, enabled: bool) -> Self {
        self.test_on_borrow = enabled;
        self
    }

    pub fn with_test_on_return(mut self, enabled: bool) -> Self {
        self.test_on_return = enabled;
        self
    }

    pub fn with_test_while_idle(mut self, enabled: bool) -> Self {
        self.test_while_idle = enabled;
        self
    }

    pub fn with_eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = policy;
        self
    }

    /// Run the maintenance task every `interval`
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::PoolConfiguration;
    /// use std::time::Duration;
    ///
    /// let config = PoolConfiguration::new()
    ///     .with_maintenance_interval(Duration::from_secs(30));
    ///
    /// assert_eq!(config.effective_maintenance_interval(), Some(Duration::from_secs(30)));
    /// assert_eq!(PoolConfiguration::new().effective_maintenance_interval(), None);
    /// ```
    pub fn with_maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = Some(interval);
        self
    }

    pub fn with_abandoned(mut self, abandoned: AbandonedConfig) -> Self {
        self.abandoned = Some(abandoned);
        self
    }

    /// Maintenance period, `None` when the task is disabled
    pub fn effective_maintenance_interval(&self) -> Option<Duration> {
        self.maintenance_interval.filter(|interval| !interval.is_zero())
    }

    /// Check the configuration, returning an error if invalid
    pub fn validate(&self) -> PoolResult<()> {
        if self.max_total == 0 {
            return Err(PoolError::InvalidConfiguration(
                "max_total must be greater than 0".to_string(),
            ));
        }
        if self.min_idle > self.max_idle {
            return Err(PoolError::InvalidConfiguration(format!(
                "min_idle ({}) must not exceed max_idle ({})",
                self.min_idle, self.max_idle
            )));
        }
        if let Some(abandoned) = &self.abandoned
            && abandoned.timeout.is_zero()
        {
            return Err(PoolError::InvalidConfiguration(
                "abandoned timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfiguration::default();
        assert_eq!(config.max_total, 8);
        assert_eq!(config.max_idle, 8);
        assert_eq!(config.min_idle, 0);
        assert_eq!(config.ordering, IdleOrdering::Lifo);
        assert!(config.block_when_exhausted);
        assert!(config.max_wait.is_none());
        assert!(config.abandoned.is_none());

        let abandoned = AbandonedConfig::default();
        assert_eq!(abandoned.timeout, Duration::from_secs(300));
        assert!(abandoned.require_full_stack_trace);
    }

    #[test]
    fn test_validation() {
        assert!(PoolConfiguration::new().with_max_total(0).validate().is_err());
        assert!(PoolConfiguration::new().with_max_idle(2).with_min_idle(3).validate().is_err());
        assert!(
            PoolConfiguration::new()
                .with_abandoned(AbandonedConfig::new().with_timeout(Duration::ZERO))
                .validate()
                .is_err()
        );
        // max_idle above max_total is tolerated
        assert!(PoolConfiguration::new().with_max_total(2).with_max_idle(10).validate().is_ok());
    }

    #[test]
    fn test_zero_interval_disables_maintenance() {
        let config = PoolConfiguration::new().with_maintenance_interval(Duration::ZERO);
        assert_eq!(config.effective_maintenance_interval(), None);
    }

    #[test]
    fn test_default_reclaim_trigger() {
        let status = |active, idle| PoolStatus {
            active,
            idle,
            waiters: 0,
            max_total: 8,
        };

        assert!(default_reclaim_trigger(&status(6, 0)));
        assert!(default_reclaim_trigger(&status(8, 1)));
        assert!(!default_reclaim_trigger(&status(5, 0)));
        assert!(!default_reclaim_trigger(&status(7, 2)));
    }
}
