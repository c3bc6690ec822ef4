//! Bounded channel pool with blocking checkout.
//!
//! A pool owns idle channels and tracks the ones it has handed out. `acquire` hands out
//! the first usable idle channel, opens a new one while under `max_size`, and otherwise
//! waits up to `max_wait`. Releasing rolls back any open transaction and returns the
//! channel to the idle list or closes it. Connection I/O (open, rollback, close) always
//! runs with the pool lock released.
//!
//! Stale channels are evicted by a maintenance sweep that runs on a timer started at the
//! first checkout, and additionally after every `maintenance_threshold` opens and releases.
//! The timer stops itself when a sweep leaves the pool empty.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::channel::{Channel, ConnectionFactory};
use crate::config::{ConnectionDictionary, PoolConfig};
use crate::error::EoAccessError;
use crate::types::Dialect;

mod maintenance;
mod metrics;

use maintenance::MaintenanceTask;
pub use metrics::{PoolMetrics, PoolStatus};
use metrics::PoolMetricsInner;

// Channel ids are only unique within a pool; this tells pools apart.
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

struct PoolState {
    config: PoolConfig,
    available: Vec<Channel>,
    /// Revocation flags of handed-out channels, by channel id.
    checked_out: HashMap<u64, Arc<AtomicBool>>,
    /// Opens in flight; they count against `max_size`.
    pending: usize,
    ops_since_sweep: u32,
    maintenance: Option<MaintenanceTask>,
    disposed: bool,
}

impl PoolState {
    fn in_use(&self) -> usize {
        self.checked_out.len() + self.pending
    }

    fn status(&self) -> PoolStatus {
        PoolStatus {
            available: self.available.len(),
            checked_out: self.checked_out.len(),
            max_size: self.config.max_size,
        }
    }
}

pub(crate) struct PoolInner {
    id: u64,
    factory: Box<dyn ConnectionFactory>,
    state: Mutex<PoolState>,
    released: Condvar,
    next_channel_id: AtomicU64,
    created_at: Instant,
    metrics: Mutex<PoolMetricsInner>,
}

/// A channel that may be handed out: open, not revoked, and younger than `max_channel_age`.
fn is_usable(config: &PoolConfig, channel: &Channel) -> bool {
    !channel.is_closed() && !channel.is_revoked() && channel.age() <= config.max_channel_age
}

/// Whether a channel may stay idle given `idle_count` channels already kept.
fn should_keep(config: &PoolConfig, channel: &Channel, idle_count: usize) -> bool {
    idle_count < config.max_size && is_usable(config, channel)
}

impl PoolInner {
    fn open_channel(&self) -> Result<Channel, EoAccessError> {
        let connection = self.factory.connect()?;
        let id = self.next_channel_id.fetch_add(1, Ordering::Relaxed);
        self.metrics.lock().connections_opened += 1;
        tracing::debug!(channel = id, "connection opened");
        Ok(Channel::new(id, connection, self.factory.dialect()).owned_by(self.id))
    }

    fn close_channel(&self, mut channel: Channel) {
        if let Err(err) = channel.close() {
            tracing::warn!(channel = channel.id(), error = %err, "failed to close connection");
        }
        self.metrics.lock().connections_closed += 1;
        tracing::debug!(channel = channel.id(), "connection closed");
    }

    fn close_all(&self, channels: Vec<Channel>) {
        for channel in channels {
            self.close_channel(channel);
        }
    }

    /// Evict idle channels that should not be kept, and stop the timer once the pool is
    /// empty. Returns the number of channels evicted.
    pub(crate) fn maintain(&self) -> usize {
        let mut state = self.state.lock();
        state.ops_since_sweep = 0;
        let idle = std::mem::take(&mut state.available);
        let mut evicted = Vec::new();
        for channel in idle {
            if should_keep(&state.config, &channel, state.available.len()) {
                state.available.push(channel);
            } else {
                evicted.push(channel);
            }
        }
        let empty = state.available.is_empty() && state.in_use() == 0;
        let timer = if empty { state.maintenance.take() } else { None };
        let status = state.status();
        drop(state);

        if let Some(timer) = timer {
            timer.cancel();
        }
        let count = evicted.len();
        {
            let mut metrics = self.metrics.lock();
            metrics.sweeps += 1;
            metrics.evicted += count as u64;
        }
        self.close_all(evicted);
        tracing::debug!(
            evicted = count,
            available = status.available,
            checked_out = status.checked_out,
            "maintenance sweep"
        );
        count
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(timer) = state.maintenance.take() {
            timer.shutdown();
        }
        let idle = std::mem::take(&mut state.available);
        self.close_all(idle);
    }
}

/// A shared, thread-safe pool of [`Channel`]s. Cloning shares the same pool.
///
/// # Examples
/// ```rust,no_run
/// use eo_access::prelude::*;
///
/// # fn main() -> Result<(), EoAccessError> {
/// let factory = SqliteConnectionFactory::builder("app.db").build();
/// let pool = Pool::new(factory, PoolConfig::default().with_max_size(4))?;
///
/// let mut channel = pool.acquire()?;
/// let rows = channel.perform_sql("SELECT 1");
/// pool.release(channel, true);
/// assert!(rows.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("dialect", &self.dialect())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Pool {
    /// Create an empty pool; channels are opened on demand.
    ///
    /// # Errors
    /// Returns `ConfigError` if `config` fails validation.
    pub fn new(
        factory: impl ConnectionFactory + 'static,
        config: PoolConfig,
    ) -> Result<Self, EoAccessError> {
        config.validate()?;
        tracing::info!(
            max_size = config.max_size,
            max_wait = ?config.max_wait,
            dialect = ?factory.dialect(),
            "channel pool created"
        );
        Ok(Self {
            inner: Arc::new(PoolInner {
                id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
                factory: Box::new(factory),
                state: Mutex::new(PoolState {
                    config,
                    available: Vec::new(),
                    checked_out: HashMap::new(),
                    pending: 0,
                    ops_since_sweep: 0,
                    maintenance: None,
                    disposed: false,
                }),
                released: Condvar::new(),
                next_channel_id: AtomicU64::new(1),
                created_at: Instant::now(),
                metrics: Mutex::new(PoolMetricsInner::default()),
            }),
        })
    }

    /// Create a pool configured from a connection dictionary's pool properties.
    ///
    /// # Errors
    /// Returns `ConfigError` if a pool property does not parse.
    pub fn from_dictionary(
        factory: impl ConnectionFactory + 'static,
        dictionary: &ConnectionDictionary,
    ) -> Result<Self, EoAccessError> {
        Self::new(factory, dictionary.pool_config()?)
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.inner.factory.dialect()
    }

    #[must_use]
    pub fn config(&self) -> PoolConfig {
        self.inner.state.lock().config.clone()
    }

    /// Check out a channel.
    ///
    /// # Errors
    /// * `PoolClosed` after [`Pool::dispose`].
    /// * `PoolExhausted` when no channel frees up within `max_wait`.
    /// * The last connection error once `max_acquire_attempts` opens have failed.
    pub fn acquire(&self) -> Result<Channel, EoAccessError> {
        let inner = &self.inner;
        let started = Instant::now();
        let mut failed_opens = 0u32;
        let mut state = inner.state.lock();
        let deadline = started + state.config.max_wait;

        loop {
            if state.disposed {
                return Err(EoAccessError::PoolClosed);
            }

            let mut stale = Vec::new();
            let mut found = None;
            while !state.available.is_empty() {
                let channel = state.available.remove(0);
                if is_usable(&state.config, &channel) {
                    found = Some(channel);
                    break;
                }
                stale.push(channel);
            }
            if !stale.is_empty() {
                MutexGuard::unlocked(&mut state, || inner.close_all(stale));
                if state.disposed {
                    if let Some(channel) = found {
                        MutexGuard::unlocked(&mut state, || inner.close_channel(channel));
                    }
                    return Err(EoAccessError::PoolClosed);
                }
            }
            if let Some(channel) = found {
                self.check_out(&mut state, &channel);
                return Ok(channel);
            }

            if state.in_use() < state.config.max_size {
                state.pending += 1;
                let opened = MutexGuard::unlocked(&mut state, || inner.open_channel());
                state.pending -= 1;
                match opened {
                    Ok(channel) if state.disposed => {
                        MutexGuard::unlocked(&mut state, || inner.close_channel(channel));
                        return Err(EoAccessError::PoolClosed);
                    }
                    Ok(channel) => {
                        state.ops_since_sweep += 1;
                        self.check_out(&mut state, &channel);
                        return Ok(channel);
                    }
                    Err(err) => {
                        failed_opens += 1;
                        inner.metrics.lock().open_failures += 1;
                        inner.released.notify_all();
                        tracing::warn!(
                            attempt = failed_opens,
                            max_attempts = state.config.max_acquire_attempts,
                            error = %err,
                            "failed to open connection"
                        );
                        if failed_opens >= state.config.max_acquire_attempts {
                            return Err(err);
                        }
                        continue;
                    }
                }
            }

            if Instant::now() >= deadline {
                let max_size = state.config.max_size;
                drop(state);
                inner.metrics.lock().timeouts += 1;
                tracing::warn!(max_size, waited = ?started.elapsed(), "channel pool exhausted");
                return Err(EoAccessError::PoolExhausted {
                    waited: started.elapsed(),
                    max_size,
                });
            }
            inner.released.wait_until(&mut state, deadline);
        }
    }

    fn check_out(&self, state: &mut PoolState, channel: &Channel) {
        state.checked_out.insert(channel.id(), channel.revocation());
        self.inner.metrics.lock().checkouts += 1;
        if state.maintenance.is_none() {
            let interval = state.config.maintenance_interval;
            match MaintenanceTask::spawn(Arc::downgrade(&self.inner), interval) {
                Ok(task) => state.maintenance = Some(task),
                Err(err) => tracing::warn!(error = %err, "maintenance timer not started"),
            }
        }
        tracing::trace!(channel = channel.id(), "channel checked out");
    }

    /// Return a channel to the pool.
    ///
    /// An open transaction is rolled back first. The channel is closed instead of kept when
    /// `keep_alive` is false, the rollback fails, its last error is connection-fatal, the
    /// pool already holds `max_size` idle channels, or the channel is closed or too old.
    ///
    /// A channel opened by a different pool (or by no pool) is closed without touching this
    /// pool's bookkeeping.
    pub fn release(&self, mut channel: Channel, keep_alive: bool) {
        let inner = &self.inner;
        if channel.pool_id() != Some(inner.id) {
            tracing::warn!(
                channel = channel.id(),
                owner = ?channel.pool_id(),
                "released channel belongs to another pool; closing it"
            );
            if let Err(err) = channel.close() {
                tracing::warn!(channel = channel.id(), error = %err, "failed to close connection");
            }
            return;
        }
        let mut keep = keep_alive;
        if channel.is_revoked() {
            keep = false;
        } else if channel.in_transaction() {
            tracing::debug!(channel = channel.id(), "rolling back open transaction on release");
            if let Err(err) = channel.force_rollback() {
                tracing::warn!(channel = channel.id(), error = %err, "rollback on release failed");
                keep = false;
            }
        }
        if channel
            .last_error()
            .is_some_and(EoAccessError::is_connection_fatal)
        {
            keep = false;
        }

        let mut state = inner.state.lock();
        if state.checked_out.remove(&channel.id()).is_none() {
            tracing::warn!(channel = channel.id(), "released channel was not checked out");
            keep = false;
        }
        let to_close = if keep
            && !state.disposed
            && should_keep(&state.config, &channel, state.available.len())
        {
            state.available.push(channel);
            None
        } else {
            Some(channel)
        };
        state.ops_since_sweep += 1;
        let sweep_due = state.ops_since_sweep > state.config.maintenance_threshold;
        drop(state);

        inner.released.notify_all();
        if let Some(channel) = to_close {
            inner.close_channel(channel);
        }
        if sweep_due {
            inner.maintain();
        }
    }

    /// Release a channel whose operation failed; it is always closed.
    pub fn release_after_error(&self, channel: Channel, error: &EoAccessError) {
        tracing::debug!(channel = channel.id(), error = %error, "discarding channel after error");
        self.release(channel, false);
    }

    /// Run a maintenance sweep now. Returns the number of idle channels evicted.
    pub fn maintain(&self) -> usize {
        self.inner.maintain()
    }

    /// Close idle channels, revoke checked-out ones, and stop maintenance.
    ///
    /// Revoked channels fail every further operation with `PoolClosed` and are closed
    /// when released. Disposing twice is a no-op.
    pub fn dispose(&self) {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        let revoked = state.checked_out.len();
        for (_, flag) in state.checked_out.drain() {
            flag.store(true, Ordering::Release);
        }
        let idle = std::mem::take(&mut state.available);
        let timer = state.maintenance.take();
        drop(state);

        inner.released.notify_all();
        if let Some(timer) = timer {
            timer.shutdown();
        }
        let closed = idle.len();
        inner.close_all(idle);
        tracing::info!(closed, revoked, "channel pool disposed");
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    /// Replace the pool settings. Idle channels are re-checked at the next sweep and a
    /// running timer is restarted with the new interval.
    ///
    /// # Errors
    /// Returns `ConfigError` if `config` fails validation, or `PoolClosed` after dispose.
    pub fn reconfigure(&self, config: PoolConfig) -> Result<(), EoAccessError> {
        config.validate()?;
        let inner = &self.inner;
        let mut state = inner.state.lock();
        if state.disposed {
            return Err(EoAccessError::PoolClosed);
        }
        let interval = config.maintenance_interval;
        state.config = config;
        let previous = match state.maintenance.take() {
            Some(timer) if timer.interval() != interval => {
                match MaintenanceTask::spawn(Arc::downgrade(&self.inner), interval) {
                    Ok(task) => state.maintenance = Some(task),
                    Err(err) => tracing::warn!(error = %err, "maintenance timer not restarted"),
                }
                Some(timer)
            }
            unchanged => {
                state.maintenance = unchanged;
                None
            }
        };
        let max_size = state.config.max_size;
        drop(state);

        inner.released.notify_all();
        if let Some(timer) = previous {
            timer.shutdown();
        }
        tracing::info!(max_size, ?interval, "channel pool reconfigured");
        Ok(())
    }

    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.inner.state.lock().status()
    }

    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        let metrics = self.inner.metrics.lock();
        PoolMetrics {
            connections_opened: metrics.connections_opened,
            connections_closed: metrics.connections_closed,
            open_failures: metrics.open_failures,
            checkouts: metrics.checkouts,
            timeouts: metrics.timeouts,
            evicted: metrics.evicted,
            sweeps: metrics.sweeps,
            uptime: self.inner.created_at.elapsed(),
        }
    }

    #[cfg(test)]
    fn maintenance_running(&self) -> bool {
        self.inner.state.lock().maintenance.is_some()
    }

    /// Run `f` with a checked-out channel and release it afterwards.
    ///
    /// The channel is discarded if `f` fails or leaves an error on the channel; that
    /// error is returned when `f` itself succeeded.
    ///
    /// # Errors
    /// Acquisition errors, the error `f` returns, or the channel's recorded error.
    pub fn with_channel<R>(
        &self,
        f: impl FnOnce(&mut Channel) -> Result<R, EoAccessError>,
    ) -> Result<R, EoAccessError> {
        let mut channel = self.acquire()?;
        match f(&mut channel) {
            Ok(value) => match channel.consume_last_error() {
                None => {
                    self.release(channel, true);
                    Ok(value)
                }
                Some(err) => {
                    self.release_after_error(channel, &err);
                    Err(err)
                }
            },
            Err(err) => {
                self.release_after_error(channel, &err);
                Err(err)
            }
        }
    }

    /// Run a blocking closure with a channel on tokio's blocking thread pool.
    ///
    /// # Errors
    /// As [`Pool::with_channel`], plus `ExecutionError` if the blocking task panics.
    pub async fn interact<F, R>(&self, f: F) -> Result<R, EoAccessError>
    where
        F: FnOnce(&mut Channel) -> Result<R, EoAccessError> + Send + 'static,
        R: Send + 'static,
    {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.with_channel(f))
            .await
            .map_err(|e| EoAccessError::ExecutionError(format!("spawn_blocking join error: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::test_utils::MockConnectionFactory;

    fn pool_with(config: PoolConfig) -> (Pool, Arc<crate::test_utils::MockState>) {
        let factory = MockConnectionFactory::new();
        let state = factory.state();
        (Pool::new(factory, config).unwrap(), state)
    }

    #[test]
    fn reuses_released_channel() {
        let (pool, mock) = pool_with(PoolConfig::default().with_max_size(2));
        let channel = pool.acquire().unwrap();
        let id = channel.id();
        pool.release(channel, true);
        let again = pool.acquire().unwrap();
        assert_eq!(again.id(), id);
        assert_eq!(mock.opened(), 1);
        pool.release(again, true);
        assert_eq!(
            pool.status(),
            PoolStatus {
                available: 1,
                checked_out: 0,
                max_size: 2
            }
        );
    }

    #[test]
    fn foreign_channel_is_not_adopted() {
        let (first, first_mock) = pool_with(PoolConfig::default());
        let (second, _) = pool_with(PoolConfig::default());
        let ours = first.acquire().unwrap();
        let theirs = second.acquire().unwrap();
        assert_eq!(ours.id(), theirs.id());

        first.release(theirs, true);
        let status = first.status();
        assert_eq!(status.checked_out, 1);
        assert_eq!(status.available, 0);
        assert_eq!(first_mock.closed(), 0);
        assert_eq!(second.status().checked_out, 1);

        first.release(ours, true);
        assert_eq!(first.status().available, 1);
    }

    #[test]
    fn exhausted_pool_times_out() {
        let (pool, _) = pool_with(
            PoolConfig::default()
                .with_max_size(1)
                .with_max_wait(Duration::from_millis(30)),
        );
        let held = pool.acquire().unwrap();
        let started = Instant::now();
        let err = pool.acquire().unwrap_err();
        assert!(matches!(err, EoAccessError::PoolExhausted { max_size: 1, .. }));
        assert!(err.is_retryable());
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(pool.metrics().timeouts, 1);
        pool.release(held, true);
    }

    #[test]
    fn waiter_wakes_on_release() {
        let (pool, _) = pool_with(
            PoolConfig::default()
                .with_max_size(1)
                .with_max_wait(Duration::from_secs(5)),
        );
        let held = pool.acquire().unwrap();
        let held_id = held.id();
        let waiter = {
            let pool = pool.clone();
            thread::spawn(move || pool.acquire().map(|c| c.id()))
        };
        thread::sleep(Duration::from_millis(30));
        pool.release(held, true);
        assert_eq!(waiter.join().unwrap().unwrap(), held_id);
    }

    #[test]
    fn release_rolls_back_open_transaction() {
        let (pool, mock) = pool_with(PoolConfig::default());
        let mut channel = pool.acquire().unwrap();
        channel.begin().unwrap();
        assert!(channel.in_transaction());
        pool.release(channel, true);
        assert_eq!(mock.rollbacks(), 1);

        let channel = pool.acquire().unwrap();
        assert!(!channel.in_transaction());
        pool.release(channel, true);
    }

    #[test]
    fn failed_rollback_discards_channel() {
        let (pool, mock) = pool_with(PoolConfig::default());
        mock.fail_rollbacks(true);
        let mut channel = pool.acquire().unwrap();
        channel.begin().unwrap();
        pool.release(channel, true);
        assert_eq!(pool.status().available, 0);
        assert_eq!(mock.closed(), 1);
    }

    #[test]
    fn release_without_keep_alive_closes() {
        let (pool, mock) = pool_with(PoolConfig::default());
        let channel = pool.acquire().unwrap();
        pool.release_after_error(channel, &EoAccessError::ExecutionError("boom".into()));
        assert_eq!(mock.closed(), 1);
        assert_eq!(pool.status().total(), 0);
    }

    #[test]
    fn closed_idle_channels_are_skipped() {
        let (pool, mock) = pool_with(PoolConfig::default());
        let channel = pool.acquire().unwrap();
        let first = channel.id();
        pool.release(channel, true);
        mock.break_open_connections();

        let channel = pool.acquire().unwrap();
        assert_ne!(channel.id(), first);
        assert_eq!(mock.opened(), 2);
        assert_eq!(mock.closed(), 1);
        pool.release(channel, true);
    }

    #[test]
    fn open_failures_are_bounded() {
        let (pool, mock) = pool_with(PoolConfig::default().with_max_acquire_attempts(2));
        mock.fail_next_opens(5);
        let err = pool.acquire().unwrap_err();
        assert!(matches!(err, EoAccessError::ConnectionError(_)));
        assert_eq!(pool.metrics().open_failures, 2);

        mock.fail_next_opens(1);
        let channel = pool.acquire().unwrap();
        pool.release(channel, true);
    }

    #[test]
    fn maintenance_evicts_aged_channels_and_stops_timer() {
        let (pool, mock) = pool_with(
            PoolConfig::default().with_max_channel_age(Duration::from_secs(60)),
        );
        let fresh = pool.acquire().unwrap();
        let mut old = pool.acquire().unwrap();
        assert!(pool.maintenance_running());
        old.backdate(Duration::from_secs(30));
        pool.release(fresh, true);
        pool.release(old, true);
        assert_eq!(pool.status().available, 2);

        pool.reconfigure(pool.config().with_max_channel_age(Duration::from_secs(10)))
            .unwrap();

        assert_eq!(pool.maintain(), 1);
        assert_eq!(pool.status().available, 1);
        assert!(pool.maintenance_running());

        let channel = pool.acquire().unwrap();
        pool.release(channel, false);
        assert_eq!(pool.maintain(), 0);
        assert!(!pool.maintenance_running());
        assert_eq!(mock.closed(), 2);
        assert_eq!(pool.metrics().sweeps, 2);
    }

    #[test]
    fn threshold_triggers_sweep() {
        let (pool, _) = pool_with(PoolConfig::default().with_maintenance_threshold(2));
        for _ in 0..2 {
            let channel = pool.acquire().unwrap();
            pool.release(channel, true);
        }
        assert!(pool.metrics().sweeps >= 1);
    }

    #[test]
    fn dispose_revokes_checked_out_channels() {
        let (pool, mock) = pool_with(PoolConfig::default());
        let idle = pool.acquire().unwrap();
        let mut held = pool.acquire().unwrap();
        pool.release(idle, true);

        pool.dispose();
        assert!(pool.is_disposed());
        assert_eq!(mock.closed(), 1);
        assert!(held.is_revoked());
        assert!(held.perform_sql("SELECT 1").is_none());
        assert!(matches!(
            held.consume_last_error(),
            Some(EoAccessError::PoolClosed)
        ));

        pool.release(held, true);
        assert_eq!(mock.closed(), 2);
        assert!(matches!(pool.acquire(), Err(EoAccessError::PoolClosed)));
        pool.dispose();
    }

    #[test]
    fn reconfigure_validates_and_applies() {
        let (pool, _) = pool_with(PoolConfig::default());
        assert!(pool
            .reconfigure(PoolConfig::default().with_max_size(0))
            .is_err());
        pool.reconfigure(PoolConfig::default().with_max_size(3))
            .unwrap();
        assert_eq!(pool.config().max_size, 3);
        assert_eq!(pool.status().max_size, 3);
    }

    #[test]
    fn with_channel_discards_on_recorded_error() {
        let (pool, mock) = pool_with(PoolConfig::default());
        mock.fail_queries_after(Some(0));
        let result = pool.with_channel(|channel| Ok(channel.perform_sql("SELECT 1")));
        assert!(result.is_err());
        assert_eq!(mock.closed(), 1);

        mock.fail_queries_after(None);
        let rows = pool
            .with_channel(|channel| Ok(channel.perform_sql("SELECT 1")))
            .unwrap();
        assert!(rows.is_some());
        assert_eq!(pool.status().available, 1);
    }
}
