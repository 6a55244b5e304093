//! # Boxoffice Testing
//!
//! Testing utilities for the Boxoffice reservation core.
//!
//! This crate provides:
//! - In-memory implementations of every port ([`InMemoryLockStore`],
//!   [`InMemoryInventoryLedger`], [`RecordingNotifier`]) with fault injection
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - Showtime and seat fixtures ([`fixtures`])
//!
//! ## Example
//!
//! ```
//! use boxoffice_testing::fixtures::ShowtimeFixture;
//! use boxoffice_testing::{InMemoryInventoryLedger, test_clock};
//! use boxoffice_core::environment::Clock;
//!
//! let clock = test_clock();
//! let fixture = ShowtimeFixture::new(clock.now()).rows(&["A", "B"], 4).build();
//! let ledger = InMemoryInventoryLedger::new();
//! ledger.insert_fixture(&fixture);
//!
//! assert_eq!(ledger.available_seats(fixture.showtime.id), Some(8));
//! ```

pub mod fixtures;
pub mod ledger;
pub mod lock_store;
pub mod notifier;

use chrono::{DateTime, Utc};
use boxoffice_core::environment::Clock;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use boxoffice_testing::mocks::FixedClock;
    /// use boxoffice_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when a test advances it.
    ///
    /// Clones share the same time, so a test can hand one clone to the
    /// orchestrator and advance another.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute time
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Install a `tracing` subscriber that writes to the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use ledger::InMemoryInventoryLedger;
pub use lock_store::InMemoryLockStore;
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use notifier::RecordingNotifier;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new(test_clock().now());
        let handle = clock.clone();

        handle.advance(chrono::Duration::minutes(5));

        assert_eq!(clock.now(), test_clock().now() + chrono::Duration::minutes(5));
    }
}
