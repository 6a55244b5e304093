//! # Boxoffice Core
//!
//! Domain types and storage ports for the Boxoffice seat reservation core.
//!
//! This crate has no I/O of its own. It defines:
//!
//! - **Domain types**: showtimes, seats, bookings, money ([`types`])
//! - **Dynamic pricing**: per-seat prices frozen at hold time ([`pricing`])
//! - **Ports**: the traits adapters implement to plug real infrastructure in
//!   - [`lock_store::LockStore`]: atomic set-if-absent / check-and-delete cache
//!   - [`inventory::InventoryLedger`]: durable seat counts and booking rows
//!   - [`notification::Notifier`]: fire-and-forget email / in-app delivery
//! - **Environment**: the [`environment::Clock`] abstraction
//!
//! ## Architecture Principles
//!
//! - Exclusion guarantees come from the stores' atomic primitives, never from
//!   in-process locks
//! - Seat counts change only through one conditional decrement and one
//!   unconditional increment, both evaluated by the store
//! - Contention and insufficient inventory are values, dependency failures are errors
//!
//! ## Implementations
//!
//! - `boxoffice-redis`: `RedisLockStore`
//! - `boxoffice-postgres`: `PostgresInventoryLedger`
//! - `boxoffice-testing`: in-memory versions of every port

pub mod inventory;
pub mod lock_store;
pub mod notification;
pub mod pricing;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use types::{
    Booking, BookingId, BookingSeat, BookingStatus, HoldId, Money, PaymentMethod, PaymentStatus,
    Seat, SeatId, SeatType, Showtime, ShowtimeId, ShowtimeStatus, UserId,
};

/// Environment module - injected dependencies that are not storage ports.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use boxoffice_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let now = clock.now();
    /// assert!(now.timestamp() > 0);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
