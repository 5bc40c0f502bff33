//! Wheeltimer: approximate idle-timeout scheduling on a hashed timing wheel.
//!
//! # Overview
//!
//! A [`WheelTimer`] tracks a large number of objects (connections, sessions,
//! leases) that should expire after a bounded idle horizon. Registration,
//! cancellation, and re-arming are O(1); a single background driver thread
//! advances a rotating pointer once per tick and fans expired objects out to
//! registered [`ExpirationListener`]s.
//!
//! Expiration is *approximate*: an object added to a wheel with `N` ticks per
//! revolution is reached no earlier than `N-1` pointer advances and no later
//! than `N` after insertion. Re-adding a pending object restarts its
//! countdown instead of stacking a duplicate entry.
//!
//! # Core Guarantees
//!
//! - **No premature drain**: an object is never notified before the pointer
//!   has made `N-1` further advances past its insertion point
//! - **Single notification per registration**: a re-arm supersedes the prior
//!   registration; only the most recent one fires
//! - **Idempotent cancellation**: removing an object that is not pending is a
//!   defined no-op
//! - **Isolated listeners**: a panicking listener never stalls the tick loop
//!   or starves other listeners
//!
//! # Classic Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use wheeltimer::{WheelConfig, WheelTimer};
//!
//! // One-second ticks, sixty ticks per revolution: a wall clock.
//! let timer: WheelTimer<u64> = WheelTimer::new(
//!     WheelConfig::new()
//!         .tick_duration(Duration::from_secs(1))
//!         .ticks_per_wheel(60),
//! )
//! .expect("valid config");
//!
//! timer.add_expiration_listener(Arc::new(|conn: &u64| {
//!     println!("connection {conn} idled out");
//! }));
//! timer.start().expect("fresh timer starts");
//!
//! // Track a connection; it fires roughly one revolution later
//! // unless removed or re-added first.
//! timer.add(42);
//! # timer.stop();
//! ```
//!
//! # Module Structure
//!
//! - [`timer`]: the public [`WheelTimer`] façade
//! - [`listener`]: the [`ExpirationListener`] callback contract
//! - [`config`]: wheel geometry configuration and validation
//! - [`clock`]: time source abstraction (wall and virtual clocks)
//! - [`error`]: typed construction and lifecycle errors
//! - [`test_utils`]: logging setup, test macros, and mock listeners

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]

pub mod clock;
pub mod config;
mod driver;
pub mod error;
pub mod listener;
mod slot;
pub mod test_utils;
pub mod timer;
mod wheel;

pub use clock::{TimeSource, VirtualClock, WallClock};
pub use config::WheelConfig;
pub use error::{ConfigError, StartError};
pub use listener::ExpirationListener;
pub use timer::WheelTimer;
