//! Time source abstraction for the driver's tick deadlines.
//!
//! The driver computes absolute tick deadlines against a [`TimeSource`]
//! rather than reading `Instant` directly. Production timers use
//! [`WallClock`]; [`VirtualClock`] lets harnesses control time explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A monotonic source of elapsed time.
///
/// `now` reports time elapsed since the source's own epoch. Implementations
/// must be monotone non-decreasing; the driver relies on this to compute the
/// remaining wait until the next tick deadline.
pub trait TimeSource: Send + Sync {
    /// Returns the elapsed time since this source's epoch.
    fn now(&self) -> Duration;
}

/// Wall clock time source for production use.
///
/// Backed by [`Instant`]; the epoch is the moment the clock was created.
#[derive(Debug)]
pub struct WallClock {
    epoch: Instant,
}

impl WallClock {
    /// Creates a wall clock whose epoch is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for WallClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Virtual time source for deterministic harnesses.
///
/// Time only moves when explicitly advanced.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use wheeltimer::{TimeSource, VirtualClock};
///
/// let clock = VirtualClock::new();
/// assert_eq!(clock.now(), Duration::ZERO);
///
/// clock.advance(Duration::from_secs(1));
/// assert_eq!(clock.now(), Duration::from_secs(1));
/// ```
#[derive(Debug, Default)]
pub struct VirtualClock {
    now_nanos: AtomicU64,
}

impl VirtualClock {
    /// Creates a virtual clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now_nanos: AtomicU64::new(0),
        }
    }

    /// Creates a virtual clock starting at the given elapsed time.
    #[must_use]
    pub fn starting_at(elapsed: Duration) -> Self {
        Self {
            now_nanos: AtomicU64::new(elapsed.as_nanos() as u64),
        }
    }

    /// Advances time by the given amount.
    pub fn advance(&self, by: Duration) {
        self.now_nanos
            .fetch_add(by.as_nanos() as u64, Ordering::Release);
    }

    /// Advances time to the given absolute elapsed value.
    ///
    /// A target in the past is a no-op; virtual time never moves backwards
    /// through this method.
    pub fn advance_to(&self, target: Duration) {
        let target = target.as_nanos() as u64;
        loop {
            let current = self.now_nanos.load(Ordering::Acquire);
            if current >= target {
                break;
            }
            if self
                .now_nanos
                .compare_exchange_weak(current, target, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
    }
}

impl TimeSource for VirtualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now_nanos.load(Ordering::Acquire))
    }
}
