use esox_resourcepool::{
    DestroyMode, FactoryResult, GenericObjectPool, PoolConfiguration, PoolError,
    PooledObjectFactory,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct Connections {
    created: AtomicUsize,
    destroyed: AtomicUsize,
}

/// Factory sharing its counters with the test
struct ConnectionFactory(Arc<Connections>);

impl PooledObjectFactory<usize> for ConnectionFactory {
    fn create(&self) -> FactoryResult<usize> {
        Ok(self.0.created.fetch_add(1, Ordering::SeqCst))
    }

    fn destroy(&self, _object: usize, _mode: DestroyMode) -> FactoryResult<()> {
        self.0.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn connection_pool(
    config: PoolConfiguration,
) -> (GenericObjectPool<usize, ConnectionFactory>, Arc<Connections>) {
    let counters = Arc::new(Connections::default());
    let pool = GenericObjectPool::new(ConnectionFactory(Arc::clone(&counters)), config).unwrap();
    (pool, counters)
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[test]
fn test_end_to_end_counts() {
    init_tracing();
    let config = PoolConfiguration::new()
        .with_max_total(8)
        .with_max_idle(4)
        .with_min_idle(2);
    let (pool, factory) = connection_pool(config);

    let mut borrowed = Vec::new();
    for expected in 1..=8 {
        borrowed.push(pool.borrow_object().unwrap());
        assert_eq!(pool.num_active(), expected);
        assert_eq!(pool.num_idle(), 0);
        assert_eq!(pool.num_waiters(), 0);
    }

    // A ninth borrower blocks until it gives up.
    let blocked = {
        let pool = pool.clone();
        thread::spawn(move || pool.borrow_object_timeout(Duration::from_millis(200)))
    };
    assert!(wait_for(|| pool.num_waiters() == 1));
    assert!(matches!(blocked.join().unwrap(), Err(PoolError::PoolExhausted(_))));
    assert_eq!(pool.num_waiters(), 0);

    for obj in borrowed {
        pool.return_object(obj).unwrap();
    }

    assert_eq!(pool.num_active(), 0);
    assert_eq!(pool.num_idle(), 4);
    assert_eq!(factory.destroyed.load(Ordering::SeqCst), 4);
}

#[test]
fn test_blocked_borrower_gets_returned_object() {
    let (pool, factory) = connection_pool(PoolConfiguration::new().with_max_total(1));

    let held = pool.borrow_object().unwrap();
    let held_id = held.id();

    let waiter = {
        let pool = pool.clone();
        thread::spawn(move || pool.borrow_object().map(|obj| obj.id()))
    };
    assert!(wait_for(|| pool.num_waiters() == 1));

    drop(held);
    assert_eq!(waiter.join().unwrap().unwrap(), held_id);
    assert_eq!(factory.created.load(Ordering::SeqCst), 1);
}

#[test]
fn test_active_never_exceeds_max_total() {
    init_tracing();
    const MAX_TOTAL: usize = 4;

    let (pool, factory) = connection_pool(PoolConfiguration::new().with_max_total(MAX_TOTAL));
    let holding = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..16)
        .map(|_| {
            let pool = pool.clone();
            let holding = Arc::clone(&holding);
            let peak = Arc::clone(&peak);
            thread::spawn(move || {
                for _ in 0..50 {
                    let obj = pool.borrow_object().unwrap();
                    let now = holding.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    assert!(pool.num_active() <= MAX_TOTAL);
                    thread::yield_now();
                    holding.fetch_sub(1, Ordering::SeqCst);
                    drop(obj);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= MAX_TOTAL);
    assert!(factory.created.load(Ordering::SeqCst) <= MAX_TOTAL);
    assert_eq!(pool.num_active(), 0);
    assert_eq!(pool.num_waiters(), 0);
    assert_eq!(pool.get_metrics().borrowed, 16 * 50);
}

#[test]
fn test_close_wakes_waiters() {
    let (pool, _) = connection_pool(PoolConfiguration::new().with_max_total(1));
    let _held = pool.borrow_object().unwrap();

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || pool.borrow_object().map(|obj| obj.id()))
        })
        .collect();
    assert!(wait_for(|| pool.num_waiters() == 3));

    pool.close();
    for waiter in waiters {
        assert!(matches!(waiter.join().unwrap(), Err(PoolError::Closed)));
    }
    assert_eq!(pool.num_waiters(), 0);
}

#[test]
fn test_returning_to_wrong_pool() {
    let (first, _) = connection_pool(PoolConfiguration::new());
    let (second, _) = connection_pool(PoolConfiguration::new());

    let _mine = first.borrow_object().unwrap();
    let theirs = second.borrow_object().unwrap();

    assert!(matches!(first.return_object(theirs), Err(PoolError::InvalidReturn)));
    assert_eq!(first.num_active(), 1);
    assert_eq!(first.num_idle(), 0);
    assert_eq!(first.get_metrics().invalid_returns, 1);
    assert_eq!(second.num_idle(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_borrowers_share_pool() {
    let (pool, _) = connection_pool(PoolConfiguration::new().with_max_total(2));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                let obj = pool.borrow_object_async().await?;
                tokio::time::sleep(Duration::from_millis(5)).await;
                drop(obj);
                Ok::<_, PoolError>(())
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(pool.num_active(), 0);
    assert_eq!(pool.get_metrics().borrowed, 8);
}
