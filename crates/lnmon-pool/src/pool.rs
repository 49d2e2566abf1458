//! Async connection pool.
//!
//! Slots are tracked with a semaphore so that waiting for a free connection is cancel-safe: if
//! the `acquire` future is dropped, the slot it was about to take is handed back immediately.
//! Idle connections are kept in a LIFO queue and re-dialed when stale or idle for too long.

use std::fmt::Debug;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{timeout, Instant};

use crate::Error;

/// A connection that can be pooled
pub trait Transport: Send + 'static {
    /// Human readable identity of the remote endpoint
    fn target(&self) -> String;
}

/// Factory of fresh transport connections
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// The connection produced by this dialer
    type Connection: Transport;

    /// Error returned when a connection cannot be established
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new connection to the remote endpoint
    async fn dial(&self) -> Result<Self::Connection, Self::Error>;

    /// Called when the pool discards a connection instead of putting it back in the queue
    fn close(_connection: Self::Connection) {}
}

/// Pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Max number of connections leased or idle at the same time
    pub capacity: usize,
    /// Upper bound for a single dial attempt
    pub dial_timeout: Duration,
    /// Default time to wait for a free slot
    pub acquire_timeout: Duration,
    /// Idle connections older than this are closed instead of reused
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 3,
            dial_timeout: Duration::from_secs(10),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: None,
        }
    }
}

struct IdleConnection<C> {
    connection: C,
    last_used: Instant,
}

/// Bounded pool of connections produced by a [`Dialer`]
pub struct Pool<D>
where
    D: Dialer,
{
    dialer: D,
    config: PoolConfig,
    slots: Arc<Semaphore>,
    idle: Mutex<Vec<IdleConnection<D::Connection>>>,
    in_use: AtomicUsize,
}

impl<D> Debug for Pool<D>
where
    D: Dialer,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.config)
            .field("in_use", &self.in_use())
            .field("idle", &self.idle())
            .finish()
    }
}

/// A connection leased from the [`Pool`]
///
/// The lease goes back to the pool exactly once: either through [`PooledConnection::release`],
/// which consumes it, or when it is dropped.
pub struct PooledConnection<D>
where
    D: Dialer,
{
    connection: Option<D::Connection>,
    stale: bool,
    pool: Arc<Pool<D>>,
    // Dropped after `Drop::drop` has pushed the connection back
    _permit: OwnedSemaphorePermit,
}

impl<D> Debug for PooledConnection<D>
where
    D: Dialer,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = self.connection.as_ref().map(|c| c.target());
        f.debug_struct("PooledConnection")
            .field("target", &target)
            .field("stale", &self.stale)
            .finish()
    }
}

impl<D> PooledConnection<D>
where
    D: Dialer,
{
    /// Identity of the remote endpoint this connection talks to
    pub fn target(&self) -> String {
        self.connection
            .as_ref()
            .map(|c| c.target())
            .unwrap_or_default()
    }

    /// Flag the connection as broken so it is closed instead of reused
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Hand the connection back to the pool
    pub fn release(mut self) -> Result<(), Error> {
        self.give_back()
    }

    fn give_back(&mut self) -> Result<(), Error> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };

        self.pool.in_use.fetch_sub(1, Ordering::AcqRel);

        if self.stale {
            tracing::debug!(endpoint = %connection.target(), "Closing stale connection");
            D::close(connection);
            return Ok(());
        }

        let mut idle = self.pool.idle.lock().map_err(|_| Error::Poison)?;
        idle.push(IdleConnection {
            connection,
            last_used: Instant::now(),
        });

        Ok(())
    }
}

impl<D> Drop for PooledConnection<D>
where
    D: Dialer,
{
    fn drop(&mut self) {
        if let Err(err) = self.give_back() {
            tracing::error!("Could not return connection to the pool: {}", err);
        }
    }
}

impl<D> Deref for PooledConnection<D>
where
    D: Dialer,
{
    type Target = D::Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("connection already released")
    }
}

impl<D> DerefMut for PooledConnection<D>
where
    D: Dialer,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("connection already released")
    }
}

impl<D> Pool<D>
where
    D: Dialer,
{
    /// Creates a new pool. No connection is dialed until the first [`Pool::acquire`].
    pub fn new(dialer: D, config: PoolConfig) -> Result<Arc<Self>, Error> {
        if config.capacity == 0 {
            return Err(Error::InvalidCapacity);
        }

        Ok(Arc::new(Self {
            dialer,
            slots: Arc::new(Semaphore::new(config.capacity)),
            config,
            idle: Default::default(),
            in_use: Default::default(),
        }))
    }

    /// Max number of connections
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Number of leased connections
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    /// Number of connections waiting in the queue
    pub fn idle(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or_default()
    }

    /// Similar to acquire_timeout but uses the default timeout value.
    pub async fn acquire(self: &Arc<Self>) -> Result<PooledConnection<D>, Error> {
        self.acquire_timeout(self.config.acquire_timeout).await
    }

    /// Lease a connection or fail once `wait` has elapsed without a free slot.
    ///
    /// An idle connection is reused when possible, otherwise a new one is dialed.
    pub async fn acquire_timeout(
        self: &Arc<Self>,
        wait: Duration,
    ) -> Result<PooledConnection<D>, Error> {
        let started = Instant::now();

        let permit = match timeout(wait, self.slots.clone().acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) | Err(_) => {
                tracing::warn!(
                    "Timeout waiting for a connection (pool size: {}). Waited {} ms",
                    self.config.capacity,
                    started.elapsed().as_millis()
                );
                return Err(Error::Unavailable {
                    waited: started.elapsed(),
                });
            }
        };

        let connection = match self.take_idle()? {
            Some(connection) => connection,
            None => self.dial().await?,
        };

        self.in_use.fetch_add(1, Ordering::AcqRel);

        Ok(PooledConnection {
            connection: Some(connection),
            stale: false,
            pool: self.clone(),
            _permit: permit,
        })
    }

    fn take_idle(&self) -> Result<Option<D::Connection>, Error> {
        let mut idle = self.idle.lock().map_err(|_| Error::Poison)?;

        while let Some(candidate) = idle.pop() {
            let expired = self
                .config
                .idle_timeout
                .is_some_and(|max_idle| candidate.last_used.elapsed() >= max_idle);

            if expired {
                tracing::debug!(
                    endpoint = %candidate.connection.target(),
                    "Closing connection idle for too long"
                );
                D::close(candidate.connection);
                continue;
            }

            return Ok(Some(candidate.connection));
        }

        Ok(None)
    }

    async fn dial(&self) -> Result<D::Connection, Error> {
        match timeout(self.config.dial_timeout, self.dialer.dial()).await {
            Ok(Ok(connection)) => {
                tracing::debug!(endpoint = %connection.target(), "Dialed new connection");
                Ok(connection)
            }
            Ok(Err(err)) => {
                tracing::error!("Could not dial connection: {}", err);
                Err(Error::Exhausted(Box::new(err)))
            }
            Err(elapsed) => {
                tracing::error!(
                    "Dial timed out after {} ms",
                    self.config.dial_timeout.as_millis()
                );
                Err(Error::Exhausted(Box::new(elapsed)))
            }
        }
    }
}

impl<D> Drop for Pool<D>
where
    D: Dialer,
{
    fn drop(&mut self) {
        if let Ok(mut idle) = self.idle.lock() {
            while let Some(candidate) = idle.pop() {
                D::close(candidate.connection);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("dial refused")]
    struct Refused;

    #[derive(Debug)]
    struct FakeConnection {
        id: usize,
    }

    impl Transport for FakeConnection {
        fn target(&self) -> String {
            format!("fake:{}", self.id)
        }
    }

    #[derive(Default)]
    struct Counters {
        dialed: AtomicUsize,
        closed: AtomicUsize,
        refuse: AtomicBool,
    }

    struct FakeDialer {
        counters: Arc<Counters>,
        delay: Duration,
    }

    static CLOSED: AtomicUsize = AtomicUsize::new(0);

    #[async_trait]
    impl Dialer for FakeDialer {
        type Connection = FakeConnection;
        type Error = Refused;

        async fn dial(&self) -> Result<Self::Connection, Self::Error> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.counters.refuse.load(Ordering::SeqCst) {
                return Err(Refused);
            }
            let id = self.counters.dialed.fetch_add(1, Ordering::SeqCst);
            Ok(FakeConnection { id })
        }

        fn close(_connection: Self::Connection) {
            CLOSED.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pool(capacity: usize, idle_timeout: Option<Duration>) -> (Arc<Pool<FakeDialer>>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let dialer = FakeDialer {
            counters: counters.clone(),
            delay: Duration::ZERO,
        };
        let config = PoolConfig {
            capacity,
            dial_timeout: Duration::from_secs(1),
            acquire_timeout: Duration::from_millis(100),
            idle_timeout,
        };
        (Pool::new(dialer, config).expect("valid pool"), counters)
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let dialer = FakeDialer {
            counters: Arc::default(),
            delay: Duration::ZERO,
        };
        let config = PoolConfig {
            capacity: 0,
            ..Default::default()
        };

        assert!(matches!(
            Pool::new(dialer, config),
            Err(Error::InvalidCapacity)
        ));
    }

    #[tokio::test]
    async fn test_released_connection_is_reused() {
        let (pool, counters) = pool(2, None);

        let conn = pool.acquire().await.expect("connection");
        assert_eq!(conn.target(), "fake:0");
        assert_eq!(pool.in_use(), 1);
        conn.release().expect("release");

        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.idle(), 1);

        let conn = pool.acquire().await.expect("connection");
        assert_eq!(conn.target(), "fake:0");
        assert_eq!(counters.dialed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropped_connection_goes_back_to_pool() {
        let (pool, _) = pool(1, None);

        {
            let _conn = pool.acquire().await.expect("connection");
            assert_eq!(pool.in_use(), 1);
        }

        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.idle(), 1);
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_acquire_times_out_when_pool_is_full() {
        let (pool, counters) = pool(1, None);

        let _held = pool.acquire().await.expect("connection");
        let err = pool
            .acquire_timeout(Duration::from_millis(20))
            .await
            .expect_err("pool is full");

        assert!(matches!(err, Error::Unavailable { .. }));
        assert_eq!(counters.dialed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_waiter_gets_released_connection() {
        let (pool, counters) = pool(1, None);
        let held = pool.acquire().await.expect("connection");

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire_timeout(Duration::from_secs(5)).await })
        };

        tokio::task::yield_now().await;
        held.release().expect("release");

        let conn = waiter.await.expect("join").expect("connection");
        assert_eq!(conn.target(), "fake:0");
        assert_eq!(counters.dialed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dial_failure_frees_the_slot() {
        let (pool, counters) = pool(1, None);
        counters.refuse.store(true, Ordering::SeqCst);

        let err = pool.acquire().await.expect_err("dial refused");
        assert!(matches!(err, Error::Exhausted(_)));
        assert_eq!(pool.in_use(), 0);

        counters.refuse.store(false, Ordering::SeqCst);
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dial_timeout_is_exhausted() {
        let counters = Arc::new(Counters::default());
        let dialer = FakeDialer {
            counters: counters.clone(),
            delay: Duration::from_secs(60),
        };
        let config = PoolConfig {
            capacity: 1,
            dial_timeout: Duration::from_secs(1),
            acquire_timeout: Duration::from_secs(1),
            idle_timeout: None,
        };
        let pool = Pool::new(dialer, config).expect("valid pool");

        let err = pool.acquire().await.expect_err("dial times out");
        assert!(matches!(err, Error::Exhausted(_)));
        assert_eq!(counters.dialed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_connection_is_closed() {
        let (pool, counters) = pool(1, None);
        let closed_before = CLOSED.load(Ordering::SeqCst);

        let mut conn = pool.acquire().await.expect("connection");
        conn.mark_stale();
        conn.release().expect("release");

        assert_eq!(pool.idle(), 0);
        assert!(CLOSED.load(Ordering::SeqCst) > closed_before);

        let conn = pool.acquire().await.expect("connection");
        assert_eq!(conn.target(), "fake:1");
        assert_eq!(counters.dialed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_connection_expires() {
        let (pool, counters) = pool(1, Some(Duration::from_secs(30)));

        pool.acquire()
            .await
            .expect("connection")
            .release()
            .expect("release");

        tokio::time::advance(Duration::from_secs(31)).await;

        let conn = pool.acquire().await.expect("connection");
        assert_eq!(conn.target(), "fake:1");
        assert_eq!(counters.dialed.load(Ordering::SeqCst), 2);
    }
}
