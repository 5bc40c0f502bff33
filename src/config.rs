//! Wheel geometry configuration.
//!
//! A wheel is described by two parameters: the duration of one tick and the
//! number of ticks per revolution. Their product is the approximate idle
//! horizon; an object fires between `(N-1)` and `N` ticks after insertion.

use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for a [`WheelTimer`](crate::WheelTimer).
///
/// The default geometry is the classic one-second, sixty-tick wall clock,
/// giving an idle horizon of roughly one minute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelConfig {
    /// Duration of one tick (pointer advance interval).
    ///
    /// Must be greater than zero.
    pub tick_duration: Duration,

    /// Number of slots on the wheel (ticks per revolution).
    ///
    /// Must be at least 1.
    pub ticks_per_wheel: usize,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            tick_duration: Duration::from_secs(1),
            ticks_per_wheel: 60,
        }
    }
}

impl WheelConfig {
    /// Creates a configuration with the default geometry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tick duration.
    #[must_use]
    pub const fn tick_duration(mut self, duration: Duration) -> Self {
        self.tick_duration = duration;
        self
    }

    /// Sets the number of ticks per revolution.
    #[must_use]
    pub const fn ticks_per_wheel(mut self, ticks: usize) -> Self {
        self.ticks_per_wheel = ticks;
        self
    }

    /// Returns the approximate maximum lifetime of a newly added object,
    /// `(ticks_per_wheel - 1) * tick_duration`.
    #[must_use]
    pub fn max_lifetime(&self) -> Duration {
        let nanos = (self.tick_duration.as_nanos() as u64)
            .saturating_mul(self.ticks_per_wheel.saturating_sub(1) as u64);
        Duration::from_nanos(nanos)
    }

    /// Validates the geometry, failing fast on a zero tick duration or an
    /// empty wheel.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_duration.is_zero() {
            return Err(ConfigError::ZeroTickDuration);
        }
        if self.ticks_per_wheel < 1 {
            return Err(ConfigError::InvalidTicksPerWheel(self.ticks_per_wheel));
        }
        Ok(())
    }
}
