//! Error types for the resource pool

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Factory lifecycle operation that produced a [`FactoryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryOperation {
    Create,
    Activate,
    Passivate,
    Destroy,
}

impl fmt::Display for FactoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FactoryOperation::Create => "create",
            FactoryOperation::Activate => "activate",
            FactoryOperation::Passivate => "passivate",
            FactoryOperation::Destroy => "destroy",
        };
        f.write_str(name)
    }
}

/// Failure reported by a [`PooledObjectFactory`](crate::PooledObjectFactory)
///
/// Cloneable so that it can travel inside [`PoolError`].
///
/// # Examples
///
/// ```
/// use esox_resourcepool::FactoryError;
///
/// let err = FactoryError::new("connection refused");
/// assert_eq!(err.to_string(), "connection refused");
/// ```
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct FactoryError(Arc<dyn StdError + Send + Sync>);

impl FactoryError {
    /// Wrap any error (or message) produced by a factory
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self(Arc::from(error.into()))
    }

    /// Access the wrapped error
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

pub type FactoryResult<T> = Result<T, FactoryError>;

#[derive(Error, Debug, Clone)]
pub enum PoolError {
    #[error("Pool exhausted - no object available after waiting {0:?}")]
    PoolExhausted(Duration),

    #[error("Returned object does not belong to the active set of this pool")]
    InvalidReturn,

    #[error("Factory {operation} failed: {source}")]
    Factory {
        operation: FactoryOperation,
        #[source]
        source: FactoryError,
    },

    #[error("Object validation failed")]
    ValidationFailed,

    #[error("Pool is closed")]
    Closed,

    #[error("Object was reclaimed by the pool as abandoned")]
    Reclaimed,

    #[error("Invalid pool configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Failed to start maintenance task: {0}")]
    MaintenanceStart(String),
}

impl PoolError {
    pub(crate) fn factory(operation: FactoryOperation, source: FactoryError) -> Self {
        PoolError::Factory { operation, source }
    }
}

pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_error_display() {
        let err = PoolError::factory(FactoryOperation::Create, FactoryError::new("boom"));
        assert_eq!(err.to_string(), "Factory create failed: boom");
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn test_factory_error_wraps_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = FactoryError::new(io);
        assert!(err.inner().downcast_ref::<std::io::Error>().is_some());
    }
}
