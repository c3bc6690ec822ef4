use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::EoAccessError;

use super::PoolInner;

#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    fn stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    /// Sleep for `period` unless stopped first. Returns true when stopped.
    fn wait(&self, period: Duration) -> bool {
        let deadline = Instant::now() + period;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

/// The periodic sweep: a named thread holding only a weak reference to its pool.
#[derive(Debug)]
pub(crate) struct MaintenanceTask {
    signal: Arc<StopSignal>,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl MaintenanceTask {
    pub(crate) fn spawn(pool: Weak<PoolInner>, interval: Duration) -> Result<Self, EoAccessError> {
        let signal = Arc::new(StopSignal::default());
        let thread_signal = Arc::clone(&signal);
        let handle = thread::Builder::new()
            .name("eo-access-maintenance".into())
            .spawn(move || {
                while !thread_signal.wait(interval) {
                    let Some(pool) = pool.upgrade() else {
                        break;
                    };
                    pool.maintain();
                }
                tracing::debug!("maintenance timer stopped");
            })
            .map_err(|e| {
                EoAccessError::Maintenance(format!("cannot start maintenance thread: {e}"))
            })?;
        tracing::debug!(?interval, "maintenance timer started");
        Ok(Self {
            signal,
            handle: Some(handle),
            interval,
        })
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop without waiting; the thread exits at its next wake-up.
    pub(crate) fn cancel(mut self) {
        self.signal.stop();
        self.handle.take();
    }

    /// Stop and wait for the thread to finish, unless called from the thread itself.
    pub(crate) fn shutdown(mut self) {
        self.signal.stop();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                tracing::warn!("maintenance thread panicked");
            }
        }
    }
}

impl Drop for MaintenanceTask {
    fn drop(&mut self) {
        self.signal.stop();
    }
}
