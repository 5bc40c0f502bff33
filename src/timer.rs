//! The public timer façade.

use std::hash::Hash;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::clock::{TimeSource, WallClock};
use crate::config::WheelConfig;
use crate::driver::{self, Shared, STATE_INIT, STATE_STARTED, STATE_STOPPED};
use crate::error::{ConfigError, StartError};
use crate::listener::ExpirationListener;

/// How long `stop()` waits for the driver's acknowledgement before
/// re-signaling the tick condvar.
const STOP_JOIN_RETRY: Duration = Duration::from_secs(1);

/// A timing wheel optimized for approximate idle-timeout scheduling.
///
/// Each started timer owns one background driver thread, so prefer a few
/// long-lived instances over many short-lived ones. A stopped timer is
/// terminal: it cannot be restarted.
///
/// `E` is the client-supplied identity of a tracked object. Its `Eq`/`Hash`
/// must remain stable while the object is pending; the timer holds clones
/// for the duration an object is scheduled and hands references to
/// listeners on expiration.
///
/// See the crate-level docs for a usage walkthrough.
pub struct WheelTimer<E>
where
    E: Eq + Hash + Clone + Send + Sync + 'static,
{
    shared: Arc<Shared<E>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    tick_duration: Duration,
}

impl<E> WheelTimer<E>
where
    E: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Creates a timer with the given geometry, driven by the wall clock.
    ///
    /// Fails fast on invalid geometry; no partially constructed timer is
    /// returned. The driver thread is not spawned until [`start`](Self::start).
    pub fn new(config: WheelConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(WallClock::new()))
    }

    /// Creates a timer with an injected [`TimeSource`].
    pub fn with_clock(
        config: WheelConfig,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared::new(
                config.ticks_per_wheel,
                config.tick_duration,
                clock,
            )),
            worker: Mutex::new(None),
            tick_duration: config.tick_duration,
        })
    }

    /// Begins the driver thread.
    ///
    /// Idempotent while running; returns [`StartError::Stopped`] if the
    /// timer was already stopped.
    pub fn start(&self) -> Result<(), StartError> {
        match self.shared.state.compare_exchange(
            STATE_INIT,
            STATE_STARTED,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {}
            Err(STATE_STARTED) => return Ok(()),
            Err(_) => return Err(StartError::Stopped),
        }

        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name("wheel-timer".into())
            .spawn(move || driver::run(&shared));
        match spawned {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                Ok(())
            }
            Err(error) => {
                // Roll back so the construction-time state is observable;
                // the caller may retry.
                self.shared.state.store(STATE_INIT, Ordering::Release);
                Err(error.into())
            }
        }
    }

    /// Requests shutdown and blocks until the driver thread has terminated.
    ///
    /// Returns whether this call performed the shutdown; later calls are
    /// no-ops returning `false`. Effective within roughly one tick: the
    /// driver is woken out of its inter-tick wait, finishes any fan-out
    /// already in progress, and exits. Safe to call concurrently with
    /// `add`/`remove`.
    pub fn stop(&self) -> bool {
        let previous = self.shared.state.swap(STATE_STOPPED, Ordering::AcqRel);
        match previous {
            STATE_STOPPED => return false,
            STATE_INIT => {
                // Never started; nothing to wake or join.
                tracing::info!("timer stopped before start");
                return true;
            }
            _ => {}
        }

        self.shared.tick_interrupt.notify_all();
        let mut terminated = self.shared.terminated.lock();
        while !*terminated {
            let timed_out = self
                .shared
                .terminated_signal
                .wait_for(&mut terminated, STOP_JOIN_RETRY)
                .timed_out();
            if timed_out {
                self.shared.tick_interrupt.notify_all();
            }
        }
        drop(terminated);

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                tracing::error!("driver thread panicked before join");
            }
        }
        tracing::info!("timer stopped");
        true
    }

    /// Registers `element` for expiration, re-arming it if already pending.
    ///
    /// Returns the approximate maximum delay until the expiration callback,
    /// `(ticks_per_wheel - 1) * tick_duration`. The actual delay is between
    /// `N-1` and `N` pointer advances from now.
    pub fn add(&self, element: E) -> Duration {
        self.shared.wheel.schedule(element);
        let nanos = (self.tick_duration.as_nanos() as u64)
            .saturating_mul(self.ticks_per_wheel().saturating_sub(1) as u64);
        Duration::from_nanos(nanos)
    }

    /// Cancels `element` if pending. Returns whether it was found and
    /// detached; cancelling an unknown object is a defined no-op.
    pub fn remove(&self, element: &E) -> bool {
        self.shared.wheel.cancel(element)
    }

    /// Registers an expiration callback. Takes effect for the next fan-out.
    pub fn add_expiration_listener(&self, listener: Arc<dyn ExpirationListener<E>>) {
        self.shared.listeners.add(listener);
    }

    /// Removes a callback registered earlier, matched by `Arc` identity.
    /// A fan-out already in progress may still invoke it once.
    pub fn remove_expiration_listener(&self, listener: &Arc<dyn ExpirationListener<E>>) -> bool {
        self.shared.listeners.remove(listener)
    }

    /// Number of objects currently pending expiration.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.wheel.pending_count()
    }

    /// Returns true if no objects are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending_count() == 0
    }

    /// The configured number of slots per revolution.
    #[must_use]
    pub fn ticks_per_wheel(&self) -> usize {
        self.shared.wheel.ticks_per_wheel()
    }

    /// The configured tick duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Returns true while the driver thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }
}

impl<E> std::fmt::Debug for WheelTimer<E>
where
    E: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WheelTimer")
            .field("ticks_per_wheel", &self.ticks_per_wheel())
            .field("tick_duration", &self.tick_duration)
            .field("pending_count", &self.pending_count())
            .field("running", &self.is_running())
            .finish()
    }
}

impl<E> Drop for WheelTimer<E>
where
    E: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        // Last-resort cleanup; explicit stop() is the expected path.
        if self.shared.is_running() {
            self.stop();
        }
    }
}
