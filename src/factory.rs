//! Factory contract for pooled resources

use crate::errors::FactoryResult;

/// Why the pool is destroying an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyMode {
    /// Evicted, invalidated, over the idle ceiling, or closed with the pool
    Normal,

    /// Reclaimed from a borrower that stopped using it
    Abandoned,
}

/// Lifecycle hooks the pool calls on the resources it manages
///
/// Only [`create`](PooledObjectFactory::create) is required. The pool never
/// calls any of these while holding its internal lock, so implementations
/// may perform blocking I/O.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{FactoryResult, PooledObjectFactory};
///
/// struct BufferFactory;
///
/// impl PooledObjectFactory<Vec<u8>> for BufferFactory {
///     fn create(&self) -> FactoryResult<Vec<u8>> {
///         Ok(Vec::with_capacity(4096))
///     }
///
///     fn passivate(&self, buffer: &mut Vec<u8>) -> FactoryResult<()> {
///         buffer.clear();
///         Ok(())
///     }
/// }
/// ```
pub trait PooledObjectFactory<T>: Send + Sync {
    /// Create a new resource
    fn create(&self) -> FactoryResult<T>;

    /// Prepare a resource before it is handed to a borrower
    fn activate(&self, _object: &mut T) -> FactoryResult<()> {
        Ok(())
    }

    /// Check whether a resource is still usable
    fn validate(&self, _object: &T) -> bool {
        true
    }

    /// Reset a resource before it goes back to the idle queue
    fn passivate(&self, _object: &mut T) -> FactoryResult<()> {
        Ok(())
    }

    /// Release a resource for good
    fn destroy(&self, object: T, _mode: DestroyMode) -> FactoryResult<()> {
        drop(object);
        Ok(())
    }
}

/// Adapter turning a plain closure into a factory
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{FnFactory, GenericObjectPool, PoolConfiguration};
///
/// let pool = GenericObjectPool::new(FnFactory::new(|| String::new()), PoolConfiguration::new())
///     .unwrap();
/// let obj = pool.borrow_object().unwrap();
/// assert!(obj.lock().unwrap().is_empty());
/// ```
pub struct FnFactory<F> {
    create: F,
}

impl<F> FnFactory<F> {
    pub fn new(create: F) -> Self {
        Self { create }
    }
}

impl<T, F> PooledObjectFactory<T> for FnFactory<F>
where
    F: Fn() -> T + Send + Sync,
{
    fn create(&self) -> FactoryResult<T> {
        Ok((self.create)())
    }
}
