//! Shared helpers for unit and integration tests.
//!
//! This module provides:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Assertion macros that log context before asserting
//! - Mock listeners for expiration tests
//!
//! # Example
//! ```
//! use wheeltimer::test_utils::init_test_logging;
//!
//! fn my_test() {
//!     init_test_logging();
//!     wheeltimer::test_phase!("my_test");
//!     // test code
//!     wheeltimer::test_complete!("my_test");
//! }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use std::time::Instant;

use parking_lot::Mutex;

use crate::listener::ExpirationListener;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Log a visually distinct test phase banner.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

/// Listener that records every expired object, with the instant it arrived.
#[derive(Debug)]
pub struct CollectingListener<E> {
    events: Mutex<Vec<(E, Instant)>>,
}

impl<E> CollectingListener<E> {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// The expired objects, in notification order.
    #[must_use]
    pub fn seen(&self) -> Vec<E>
    where
        E: Clone,
    {
        self.events
            .lock()
            .iter()
            .map(|(element, _)| element.clone())
            .collect()
    }

    /// The recorded `(object, instant)` pairs, in notification order.
    #[must_use]
    pub fn events(&self) -> Vec<(E, Instant)>
    where
        E: Clone,
    {
        self.events.lock().clone()
    }

    /// Number of notifications recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no notification has arrived yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl<E> Default for CollectingListener<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ExpirationListener<E> for CollectingListener<E>
where
    E: Clone + Send + Sync,
{
    fn expired(&self, element: &E) {
        self.events.lock().push((element.clone(), Instant::now()));
    }
}

/// Listener that only counts notifications.
#[derive(Debug, Default)]
pub struct CountingListener {
    count: AtomicUsize,
}

impl CountingListener {
    /// Create a zeroed counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications observed so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<E> ExpirationListener<E> for CountingListener
where
    E: Send + Sync,
{
    fn expired(&self, _element: &E) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Listener that panics on every notification, for isolation tests.
#[derive(Debug, Default)]
pub struct PanickingListener;

impl<E> ExpirationListener<E> for PanickingListener
where
    E: Send + Sync,
{
    fn expired(&self, _element: &E) {
        panic!("listener failure injected by test");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_listener_records_order() {
        init_test_logging();
        crate::test_phase!("collecting_listener_records_order");
        let listener = CollectingListener::new();
        listener.expired(&1_u32);
        listener.expired(&2_u32);
        crate::assert_with_log!(
            listener.seen() == vec![1, 2],
            "notification order",
            vec![1, 2],
            listener.seen()
        );
        crate::test_complete!("collecting_listener_records_order");
    }

    #[test]
    fn counting_listener_counts() {
        init_test_logging();
        crate::test_phase!("counting_listener_counts");
        let listener = CountingListener::new();
        for _ in 0..3 {
            ExpirationListener::<u32>::expired(&listener, &0);
        }
        crate::assert_with_log!(listener.count() == 3, "count", 3, listener.count());
        crate::test_complete!("counting_listener_counts");
    }
}
