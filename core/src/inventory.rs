//! Inventory ledger port.
//!
//! Durable seat counts and booking rows. The ledger owns the only two code
//! paths that mutate `available_seats`:
//!
//! - [`InventoryLedger::create_booking`]: one conditional decrement
//!   (`available_seats >= n`) in the same transaction as the booking insert
//! - [`InventoryLedger::release_booking`]: one unconditional increment in the
//!   same transaction as the status change
//!
//! No implementation may read `available_seats`, compute a new value, and
//! write it back.
//!
//! # Implementations
//!
//! - `PostgresInventoryLedger` (in `boxoffice-postgres`)
//! - `InMemoryInventoryLedger` (in `boxoffice-testing`)

use crate::types::{
    Booking, BookingId, BookingSeat, BookingStatus, Money, PaymentMethod, Seat, SeatId,
    Showtime, ShowtimeId, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::future::Future;
use thiserror::Error;

/// Errors from the inventory ledger. Always a dependency failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(String),

    /// The statement did not complete within the caller's deadline.
    #[error("Database timeout: {0}")]
    Timeout(String),

    /// A stored row could not be decoded.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Everything needed to persist a PENDING booking and its seats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    /// Booking ID
    pub id: BookingId,
    /// Customer-facing reference
    pub code: String,
    /// Showtime to decrement
    pub showtime_id: ShowtimeId,
    /// Owner
    pub user_id: Option<UserId>,
    /// Confirmation email address
    pub contact_email: Option<String>,
    /// Payment method chosen at confirmation
    pub payment_method: PaymentMethod,
    /// Seats with prices frozen at hold time
    pub seats: Vec<BookingSeat>,
    /// Sum of seat prices
    pub subtotal: Money,
    /// Booking fee
    pub booking_fee: Money,
    /// Tax
    pub tax: Money,
    /// Amount due
    pub total: Money,
    /// Payment deadline
    pub expires_at: DateTime<Utc>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl NewBooking {
    /// Number of tickets (seats) in the booking.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn num_tickets(&self) -> u32 {
        self.seats.len() as u32
    }

    /// The PENDING booking row this request produces.
    #[must_use]
    pub fn to_booking(&self) -> Booking {
        Booking {
            id: self.id,
            code: self.code.clone(),
            showtime_id: self.showtime_id,
            user_id: self.user_id,
            contact_email: self.contact_email.clone(),
            status: BookingStatus::Pending,
            payment_status: crate::types::PaymentStatus::Pending,
            payment_method: Some(self.payment_method.clone()),
            num_tickets: self.num_tickets(),
            subtotal: self.subtotal,
            booking_fee: self.booking_fee,
            tax: self.tax,
            total: self.total,
            expires_at: self.expires_at,
            created_at: self.created_at,
            confirmed_at: None,
            cancelled_at: None,
        }
    }
}

/// Result of the confirm-time transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateBookingOutcome {
    /// Seats decremented and booking persisted as PENDING.
    Created(Booking),
    /// The conditional decrement affected zero rows; nothing was written.
    InsufficientSeats {
        /// Seats requested
        requested: u32,
    },
    /// An active booking already covers one of the seats; nothing was written.
    SeatsAlreadyBooked,
}

/// Which give-back path to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    /// Explicit cancellation: allowed from PENDING or CONFIRMED, ends CANCELLED.
    Cancel,
    /// Payment window elapsed: allowed from PENDING past `expires_at`, ends EXPIRED.
    Expire,
}

impl ReleaseKind {
    /// Final status written by this release.
    #[must_use]
    pub const fn target_status(&self) -> BookingStatus {
        match self {
            Self::Cancel => BookingStatus::Cancelled,
            Self::Expire => BookingStatus::Expired,
        }
    }
}

/// Result of a cancel/expire transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Status changed and seats returned to inventory.
    Released(Booking),
    /// No booking with that id.
    NotFound,
    /// Booking exists but its status does not allow this release.
    NotReleasable(BookingStatus),
}

/// Payment completion signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentUpdate {
    /// Payment captured: PENDING → CONFIRMED, payment PAID.
    Paid,
    /// Payment attempt failed: payment FAILED, booking stays PENDING.
    Failed,
}

/// Result of recording a payment signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRecordOutcome {
    /// Booking updated.
    Recorded(Booking),
    /// No booking with that id.
    NotFound,
    /// Booking is not an unexpired PENDING booking.
    NotPending(BookingStatus),
}

/// Durable seat inventory and booking persistence.
pub trait InventoryLedger: Send + Sync + 'static {
    /// Load a showtime.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the store fails.
    fn showtime(
        &self,
        showtime_id: ShowtimeId,
    ) -> impl Future<Output = Result<Option<Showtime>>> + Send;

    /// All seats on the screen of `showtime_id`, ordered by row then number.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the store fails.
    fn seats_for_showtime(
        &self,
        showtime_id: ShowtimeId,
    ) -> impl Future<Output = Result<Vec<Seat>>> + Send;

    /// Seats covered by a PENDING or CONFIRMED booking of `showtime_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the store fails.
    fn booked_seat_ids(
        &self,
        showtime_id: ShowtimeId,
    ) -> impl Future<Output = Result<HashSet<SeatId>>> + Send;

    /// In one transaction: decrement `available_seats` by the seat count if
    /// enough remain, insert the PENDING booking and its seat rows.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the store fails; the transaction is rolled back.
    fn create_booking(
        &self,
        booking: NewBooking,
    ) -> impl Future<Output = Result<CreateBookingOutcome>> + Send;

    /// In one transaction: move the booking to the release target status,
    /// stamp `cancelled_at`, release its seat rows, and increment
    /// `available_seats` by its ticket count.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the store fails; the transaction is rolled back.
    fn release_booking(
        &self,
        booking_id: BookingId,
        kind: ReleaseKind,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<ReleaseOutcome>> + Send;

    /// Apply the payment completion signal to an unexpired PENDING booking.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the store fails.
    fn record_payment(
        &self,
        booking_id: BookingId,
        update: PaymentUpdate,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<PaymentRecordOutcome>> + Send;

    /// Load a booking.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the store fails.
    fn booking(&self, booking_id: BookingId)
    -> impl Future<Output = Result<Option<Booking>>> + Send;

    /// Seat rows of a booking.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the store fails.
    fn booking_seats(
        &self,
        booking_id: BookingId,
    ) -> impl Future<Output = Result<Vec<BookingSeat>>> + Send;

    /// Up to `limit` PENDING bookings whose `expires_at` is at or before `now`,
    /// oldest deadline first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the store fails.
    fn expired_pending_bookings(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<BookingId>>> + Send;
}
