//! Eviction policies for the maintenance idle sweep

use std::time::Duration;

/// Eviction policy for idle pool objects
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{EvictionPolicy, PoolConfiguration};
/// use std::time::Duration;
///
/// // Close objects idle for more than ten minutes, keeping min_idle around
/// let config = PoolConfiguration::new()
///     .with_min_idle(2)
///     .with_eviction_policy(EvictionPolicy::IdleTimeout(Duration::from_secs(600)))
///     .with_maintenance_interval(Duration::from_secs(30));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// No eviction
    #[default]
    None,

    /// Time-to-live: objects expire a fixed duration after creation,
    /// regardless of `min_idle`
    TimeToLive(Duration),

    /// Idle timeout: objects idle longer than the duration are evicted while
    /// more than `min_idle` objects remain idle
    IdleTimeout(Duration),

    /// Combined: TTL or idle timeout
    Combined {
        ttl: Duration,
        idle_timeout: Duration,
    },
}

/// What the sweep knows about one idle object when applying the policy
#[derive(Debug, Clone, Copy)]
pub(crate) struct EvictionCandidate {
    pub age: Duration,
    pub idle_time: Duration,
    pub idle_count: usize,
    pub min_idle: usize,
}

impl EvictionPolicy {
    pub(crate) fn is_none(&self) -> bool {
        matches!(self, EvictionPolicy::None)
    }

    pub(crate) fn should_evict(&self, candidate: &EvictionCandidate) -> bool {
        let idle_expired = |timeout: &Duration| {
            candidate.idle_time > *timeout && candidate.idle_count > candidate.min_idle
        };

        match self {
            EvictionPolicy::None => false,
            EvictionPolicy::TimeToLive(ttl) => candidate.age > *ttl,
            EvictionPolicy::IdleTimeout(timeout) => idle_expired(timeout),
            EvictionPolicy::Combined { ttl, idle_timeout } => {
                candidate.age > *ttl || idle_expired(idle_timeout)
            }
        }
    }
}
