//! # Esox Resource Pool
//!
//! Thread-safe generic resource pool with blocking borrow, idle eviction and
//! abandoned object reclamation.
//!
//! ## Features
//!
//! - Factory-driven object lifecycle (create, activate, validate, passivate, destroy)
//! - Automatic return of objects via RAII (Drop trait)
//! - Blocking borrow with timeout, fair wake-up of waiting borrowers
//! - Async borrow that keeps the runtime free while waiting
//! - LIFO or FIFO idle ordering with an idle ceiling
//! - Background maintenance: idle eviction, min-idle replenishment
//! - Abandoned object detection with optional usage tracking
//! - Metrics and Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_resourcepool::{FnFactory, GenericObjectPool, PoolConfiguration};
//!
//! let factory = FnFactory::new(|| vec![0u8; 1024]);
//! let pool = GenericObjectPool::new(factory, PoolConfiguration::new()).unwrap();
//! {
//!     let buffer = pool.borrow_object().unwrap();
//!     println!("Got: {} bytes", buffer.lock().unwrap().len());
//!     // Object automatically returned when `buffer` goes out of scope
//! }
//! assert_eq!(pool.num_idle(), 1);
//! ```

mod config;
mod errors;
mod eviction;
mod factory;
mod handle;
mod maintenance;
mod metrics;
mod pool;
mod registry;
mod state;
mod usage;

pub use config::{
    AbandonedConfig, IdleOrdering, PoolConfiguration, ReclaimTrigger, default_reclaim_trigger,
};
pub use errors::{FactoryError, FactoryOperation, FactoryResult, PoolError, PoolResult};
pub use eviction::EvictionPolicy;
pub use factory::{DestroyMode, FnFactory, PooledObjectFactory};
#[cfg(feature = "prometheus")]
pub use metrics::MetricsExporter;
pub use metrics::{PoolMetrics, PoolStatus};
pub use pool::{GenericObjectPool, PooledObject};
pub use state::PooledObjectState;
pub use usage::{AbandonedLogSink, AbandonedReport, CallSite, TracingLogSink};
