//! Typed errors for timer construction and lifecycle.
//!
//! Construction problems are reported fail-fast through [`ConfigError`]; no
//! partially initialized timer is ever handed out. Lifecycle violations
//! surface as [`StartError`]. Listener failures are deliberately *not*
//! errors: the driver contains them (see the crate docs) and they never
//! propagate to callers of `add`/`remove`/`start`.

/// Invalid wheel geometry, rejected at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The tick duration was zero.
    #[error("tick duration must be greater than zero")]
    ZeroTickDuration,

    /// Fewer than one tick per revolution.
    #[error("ticks per wheel must be at least 1, got {0}")]
    InvalidTicksPerWheel(usize),
}

/// Failure to start the driver thread.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// The timer was stopped; a stopped wheel is terminal and cannot be
    /// restarted.
    #[error("timer was stopped; restart is not supported")]
    Stopped,

    /// The OS refused to spawn the driver thread.
    #[error("failed to spawn driver thread: {0}")]
    Spawn(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_messages() {
        assert_eq!(
            ConfigError::ZeroTickDuration.to_string(),
            "tick duration must be greater than zero"
        );
        assert_eq!(
            ConfigError::InvalidTicksPerWheel(0).to_string(),
            "ticks per wheel must be at least 1, got 0"
        );
    }

    #[test]
    fn start_error_messages() {
        assert_eq!(
            StartError::Stopped.to_string(),
            "timer was stopped; restart is not supported"
        );
        let spawn = StartError::Spawn(std::io::Error::other("boom"));
        assert!(spawn.to_string().starts_with("failed to spawn"));
    }
}
