//! The background tick loop.
//!
//! Exactly one driver thread per timer advances the cursor and drains the
//! slot it lands on. Inter-tick waits target the *absolute* deadline
//! `start + tick_count * tick_duration`, recomputing the remaining time on
//! every wake-up, so slot-processing latency and scheduler jitter never
//! accumulate into drift. If a deadline has already passed the loop proceeds
//! immediately and catches up.
//!
//! `stop()` interrupts a sleeping driver through the tick condvar; an early
//! wake simply re-checks the shutdown state and the deadline. On exit the
//! driver publishes a termination acknowledgement that `stop()` blocks on.

use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::clock::TimeSource;
use crate::listener::ListenerRegistry;
use crate::wheel::Wheel;

/// Worker lifecycle states. Transitions are one-way: `Init -> Started ->
/// Stopped`, or `Init -> Stopped` for a timer stopped before it ever ran.
pub(crate) const STATE_INIT: u8 = 0;
pub(crate) const STATE_STARTED: u8 = 1;
pub(crate) const STATE_STOPPED: u8 = 2;

/// State shared between the façade and the driver thread.
pub(crate) struct Shared<E> {
    pub(crate) wheel: Wheel<E>,
    pub(crate) listeners: ListenerRegistry<E>,
    pub(crate) state: AtomicU8,
    pub(crate) clock: Arc<dyn TimeSource>,
    pub(crate) tick_nanos: u64,
    /// Paired with `tick_interrupt`; held only while waiting out a tick.
    pub(crate) sleep_lock: Mutex<()>,
    /// Signaled by `stop()` to cut a tick wait short.
    pub(crate) tick_interrupt: Condvar,
    /// Set to true by the driver as its final action.
    pub(crate) terminated: Mutex<bool>,
    pub(crate) terminated_signal: Condvar,
}

impl<E> Shared<E>
where
    E: Eq + Hash + Clone,
{
    pub(crate) fn new(
        ticks_per_wheel: usize,
        tick_duration: Duration,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            wheel: Wheel::new(ticks_per_wheel),
            listeners: ListenerRegistry::new(),
            state: AtomicU8::new(STATE_INIT),
            clock,
            tick_nanos: tick_duration.as_nanos() as u64,
            sleep_lock: Mutex::new(()),
            tick_interrupt: Condvar::new(),
            terminated: Mutex::new(false),
            terminated_signal: Condvar::new(),
        }
    }
}

// Lifecycle queries never touch `E`; keep them usable from any context.
impl<E> Shared<E> {
    pub(crate) fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_STARTED
    }
}

/// Body of the driver thread.
///
/// The first iteration processes position 0 at the loop start; each later
/// iteration advances the cursor under its write lock and immediately drains
/// the newly current slot, reproducing the pointer timeline `position k at
/// t ~= k * tick_duration`.
pub(crate) fn run<E>(shared: &Arc<Shared<E>>)
where
    E: Eq + Hash + Clone,
{
    let start = shared.clock.now();
    let mut tick_count: u64 = 1;
    tracing::info!(
        ticks_per_wheel = shared.wheel.ticks_per_wheel(),
        tick_nanos = shared.tick_nanos,
        "driver started"
    );

    while shared.is_running() {
        expire_position(shared, shared.wheel.position());
        if !wait_for_next_tick(shared, start, tick_count) {
            break;
        }
        shared.wheel.advance();
        tick_count += 1;
    }

    tracing::info!(ticks = tick_count, "driver terminating");
    let mut terminated = shared.terminated.lock();
    *terminated = true;
    shared.terminated_signal.notify_all();
}

/// Drains one slot and fans each expired object out to the listener
/// snapshot taken for this drain. A panicking listener is contained and
/// logged; remaining listeners and remaining elements still run.
fn expire_position<E>(shared: &Shared<E>, position: usize)
where
    E: Eq + Hash + Clone,
{
    let expired = shared.wheel.drain_expired(position);
    if expired.is_empty() {
        return;
    }
    let listeners = shared.listeners.snapshot();
    for element in &expired {
        for listener in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener.expired(element))).is_err() {
                tracing::error!(position, "expiration listener panicked; fan-out continues");
            }
        }
    }
}

/// Waits until the absolute deadline of tick `tick_count`, waking early on
/// `stop()`. Returns false once shutdown is observed. A deadline already in
/// the past returns immediately: the wheel is catching up.
fn wait_for_next_tick<E>(shared: &Shared<E>, start: Duration, tick_count: u64) -> bool {
    let deadline = start + Duration::from_nanos(shared.tick_nanos.saturating_mul(tick_count));
    let mut guard = shared.sleep_lock.lock();
    loop {
        if !shared.is_running() {
            return false;
        }
        let now = shared.clock.now();
        if now >= deadline {
            return true;
        }
        let _ = shared.tick_interrupt.wait_for(&mut guard, deadline - now);
    }
}
