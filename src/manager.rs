//! Connection manager implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::task::{Context, Poll};
use std::time::Instant;

use deadpool_redis::{Config, Connection, PoolConfig, Runtime};
use redis::RedisResult;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, trace, warn};

use crate::config::Credentials;
use crate::error::Error;

/// Policy applied when the server is unreachable during [`connect`].
///
/// [`connect`]: RedisManagerBuilder::connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Connectivity failure aborts construction with an error.
    #[default]
    Strict,
    /// Connectivity failure is logged as a warning and the manager comes up
    /// [`Disabled`](State::Disabled): commands silently resolve to `None`.
    Lenient,
}

/// Lifecycle state of a [`RedisManager`].
///
/// `Ready → Closed` via [`RedisManager::shutdown`] is the only transition
/// after construction. A `Disabled` manager never becomes `Ready`; neither
/// `Disabled` nor `Closed` can be left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// The pool is open and commands execute normally.
    Ready,
    /// The probe failed under [`FailurePolicy::Lenient`]; commands resolve
    /// to `None` without touching the pool.
    Disabled,
    /// [`RedisManager::shutdown`] ran; commands resolve to `None`.
    Closed,
}

impl State {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => State::Ready,
            1 => State::Disabled,
            _ => State::Closed,
        }
    }
}

struct Inner {
    pool: deadpool_redis::Pool,
    inflight: Semaphore,
    state: AtomicU8,
    addr: String,
}

/// Shared handle to a pooled Redis connection manager.
///
/// The handle is cheap to clone and intended to be constructed once by the
/// application's composition root, then passed to every consumer. A
/// process-wide accessor is available separately through
/// [`install`](crate::install) / [`instance`](crate::instance) for callers
/// that cannot thread the handle through.
///
/// Commands are closures that receive an owned pooled [`Connection`];
/// dropping the connection, on any exit path, returns it to the pool.
///
/// # Examples
///
/// ```no_run
/// use skylands_redis::{Credentials, RedisManager};
///
/// #[tokio::main]
/// async fn main() -> Result<(), skylands_redis::Error> {
///     let creds: Credentials = "localhost:6379:mypassword".parse()?;
///     let manager = RedisManager::connect(creds).await?;
///
///     let pong = manager
///         .execute(|mut conn| async move {
///             let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
///             Ok(reply)
///         })
///         .await?;
///     assert_eq!(pong.as_deref(), Some("PONG"));
///
///     manager.shutdown();
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RedisManager {
    inner: Arc<Inner>,
}

impl RedisManager {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn builder() -> RedisManagerBuilder {
        RedisManagerBuilder::default()
    }

    /// Connects with default settings ([`FailurePolicy::Strict`]).
    pub async fn connect(credentials: Credentials) -> Result<Self, Error> {
        Self::builder().connect(credentials).await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        State::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    /// Whether commands currently reach the server.
    pub fn is_ready(&self) -> bool {
        self.state() == State::Ready
    }

    /// Runs a command on a pooled connection, suspending the caller for the
    /// duration of the round trip.
    ///
    /// Resolves to `Ok(None)` without touching the pool when the manager is
    /// [`Disabled`](State::Disabled) or [`Closed`](State::Closed); this is
    /// deliberate degraded-mode behavior, not an error.
    pub async fn execute<F, Fut, T>(&self, command: F) -> Result<Option<T>, Error>
    where
        F: FnOnce(Connection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        if self.state() != State::Ready {
            return Ok(None);
        }
        let conn = self.inner.pool.get().await?;
        trace!(addr = %self.inner.addr, "checked out pooled connection");
        let value = command(conn).await?;
        Ok(Some(value))
    }

    /// Schedules a command on the runtime without suspending the caller.
    ///
    /// The returned future resolves to the same result [`execute`] would
    /// have produced. Concurrent submissions may complete in any order, and
    /// at most `max_inflight` of them hold a connection at a time; the rest
    /// wait their turn inside the spawned task. Dropping the returned
    /// future detaches the task rather than cancelling it.
    ///
    /// [`execute`]: RedisManager::execute
    pub fn submit<F, Fut, T>(&self, command: F) -> CommandFuture<T>
    where
        F: FnOnce(Connection) -> Fut + Send + 'static,
        Fut: Future<Output = RedisResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            let _permit = match manager.inner.inflight.acquire().await {
                Ok(permit) => permit,
                // The semaphore only closes on shutdown.
                Err(_) => return Ok(None),
            };
            manager.execute(command).await
        });
        CommandFuture { handle }
    }

    /// Closes the connection pool.
    ///
    /// Only transitions [`Ready`](State::Ready) managers; calling this on a
    /// [`Disabled`](State::Disabled) manager or a second time is a no-op.
    /// Commands executed afterwards resolve to `Ok(None)`.
    pub fn shutdown(&self) {
        let transitioned = self.inner.state.compare_exchange(
            State::Ready as u8,
            State::Closed as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if transitioned.is_err() {
            return;
        }
        self.inner.inflight.close();
        self.inner.pool.close();
        info!(addr = %self.inner.addr, "redis connection pool closed");
    }

    async fn probe(&self) -> Result<(), Error> {
        let start = Instant::now();
        let mut conn = self.inner.pool.get().await?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!(
            addr = %self.inner.addr,
            reply = %reply,
            latency_ms = start.elapsed().as_millis() as u64,
            "redis probe succeeded"
        );
        Ok(())
    }
}

impl std::fmt::Debug for RedisManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisManager")
            .field("addr", &self.inner.addr)
            .field("state", &self.state())
            .finish()
    }
}

/// Builder for [`RedisManager`].
#[derive(Debug, Clone)]
pub struct RedisManagerBuilder {
    failure_policy: FailurePolicy,
    max_inflight: usize,
    pool_size: usize,
}

impl Default for RedisManagerBuilder {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            max_inflight: 64,
            pool_size: 16,
        }
    }
}

impl RedisManagerBuilder {
    /// Sets how connectivity failure during [`connect`](Self::connect) is
    /// handled. Default: [`FailurePolicy::Strict`].
    #[must_use]
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Caps the number of submitted commands holding a connection
    /// concurrently. Default: 64.
    #[must_use]
    pub fn max_inflight(mut self, max_inflight: usize) -> Self {
        self.max_inflight = max_inflight;
        self
    }

    /// Sets the connection pool size. Default: 16.
    #[must_use]
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Opens the connection pool and issues a `PING` probe.
    ///
    /// Pool creation failure is a configuration mistake and errors out under
    /// either policy. A failed probe errors out under
    /// [`FailurePolicy::Strict`] and produces a
    /// [`Disabled`](State::Disabled) manager under
    /// [`FailurePolicy::Lenient`].
    pub async fn connect(self, credentials: Credentials) -> Result<RedisManager, Error> {
        let mut config = Config::from_url(credentials.url());
        config.pool = Some(PoolConfig::new(self.pool_size));
        let pool = config.create_pool(Some(Runtime::Tokio1))?;

        let manager = RedisManager {
            inner: Arc::new(Inner {
                pool,
                inflight: Semaphore::new(self.max_inflight),
                state: AtomicU8::new(State::Ready as u8),
                addr: credentials.addr(),
            }),
        };

        match manager.probe().await {
            Ok(()) => Ok(manager),
            Err(error) => match self.failure_policy {
                FailurePolicy::Strict => Err(error),
                FailurePolicy::Lenient => {
                    warn!(
                        addr = %manager.inner.addr,
                        error = %error,
                        "redis unreachable, manager disabled"
                    );
                    manager
                        .inner
                        .state
                        .store(State::Disabled as u8, Ordering::SeqCst);
                    Ok(manager)
                }
            },
        }
    }
}

/// Future returned by [`RedisManager::submit`].
///
/// Resolves to the submitted command's result; a panicked or aborted task
/// surfaces as [`Error::Join`].
#[derive(Debug)]
pub struct CommandFuture<T> {
    handle: JoinHandle<Result<Option<T>, Error>>,
}

impl<T> Future for CommandFuture<T> {
    type Output = Result<Option<T>, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().handle).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(error)) => Poll::Ready(Err(Error::Join(error))),
            Poll::Pending => Poll::Pending,
        }
    }
}
