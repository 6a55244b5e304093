//! In-memory [`InventoryLedger`] for fast, deterministic testing.
//!
//! Every trait method runs under one mutex, so the conditional decrement and
//! the booking insert are atomic with respect to each other, matching the
//! single transaction the Postgres ledger uses.

use crate::fixtures::Fixture;
use boxoffice_core::inventory::{
    CreateBookingOutcome, InventoryLedger, LedgerError, NewBooking, PaymentRecordOutcome,
    PaymentUpdate, ReleaseKind, ReleaseOutcome, Result,
};
use boxoffice_core::types::{
    Booking, BookingId, BookingSeat, BookingStatus, PaymentStatus, ScreenId, Seat, SeatId,
    Showtime, ShowtimeId,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone)]
struct SeatRow {
    seat: BookingSeat,
    released: bool,
}

#[derive(Debug, Default)]
struct State {
    showtimes: HashMap<ShowtimeId, Showtime>,
    seats: HashMap<ScreenId, Vec<Seat>>,
    bookings: HashMap<BookingId, Booking>,
    booking_seats: Vec<SeatRow>,
}

impl State {
    fn seat_is_active(&self, showtime_id: ShowtimeId, seat_id: SeatId) -> bool {
        self.booking_seats
            .iter()
            .any(|row| !row.released && row.seat.showtime_id == showtime_id && row.seat.seat_id == seat_id)
    }
}

/// In-memory ledger with fault injection.
///
/// Clones share the same data.
#[derive(Clone, Debug, Default)]
pub struct InMemoryInventoryLedger {
    state: Arc<Mutex<State>>,
    unavailable: Arc<AtomicBool>,
    fail_next: Arc<AtomicU32>,
    latency: Arc<Mutex<Option<Duration>>>,
}

impl InMemoryInventoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a showtime.
    pub fn insert_showtime(&self, showtime: Showtime) {
        self.state().showtimes.insert(showtime.id, showtime);
    }

    /// Insert seats; they are grouped by screen.
    pub fn insert_seats(&self, seats: impl IntoIterator<Item = Seat>) {
        let mut state = self.state();
        for seat in seats {
            state.seats.entry(seat.screen_id).or_default().push(seat);
        }
    }

    /// Insert a fixture's showtime and seats.
    pub fn insert_fixture(&self, fixture: &Fixture) {
        self.insert_showtime(fixture.showtime.clone());
        self.insert_seats(fixture.seats.iter().cloned());
    }

    /// Current `available_seats` of a showtime.
    #[must_use]
    pub fn available_seats(&self, showtime_id: ShowtimeId) -> Option<u32> {
        self.state()
            .showtimes
            .get(&showtime_id)
            .map(|s| s.available_seats)
    }

    /// Number of bookings stored.
    #[must_use]
    pub fn booking_count(&self) -> usize {
        self.state().bookings.len()
    }

    /// All bookings of a showtime, in no particular order.
    #[must_use]
    pub fn bookings_for(&self, showtime_id: ShowtimeId) -> Vec<Booking> {
        self.state()
            .bookings
            .values()
            .filter(|b| b.showtime_id == showtime_id)
            .cloned()
            .collect()
    }

    /// Make every call fail with [`LedgerError::Database`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next `count` calls with [`LedgerError::Database`].
    pub fn fail_next(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Delay every call by `latency`, widening race windows in tests.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    async fn enter(&self) -> Result<()> {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Database(
                "in-memory ledger marked unavailable".to_string(),
            ));
        }
        let consumed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            return Err(LedgerError::Database("injected ledger failure".to_string()));
        }
        Ok(())
    }
}

impl InventoryLedger for InMemoryInventoryLedger {
    async fn showtime(&self, showtime_id: ShowtimeId) -> Result<Option<Showtime>> {
        self.enter().await?;
        Ok(self.state().showtimes.get(&showtime_id).cloned())
    }

    async fn seats_for_showtime(&self, showtime_id: ShowtimeId) -> Result<Vec<Seat>> {
        self.enter().await?;
        let state = self.state();
        let Some(showtime) = state.showtimes.get(&showtime_id) else {
            return Ok(Vec::new());
        };
        let mut seats = state
            .seats
            .get(&showtime.screen_id)
            .cloned()
            .unwrap_or_default();
        seats.sort_by(|a, b| a.row.cmp(&b.row).then(a.number.cmp(&b.number)));
        Ok(seats)
    }

    async fn booked_seat_ids(&self, showtime_id: ShowtimeId) -> Result<HashSet<SeatId>> {
        self.enter().await?;
        let state = self.state();
        Ok(state
            .booking_seats
            .iter()
            .filter(|row| !row.released && row.seat.showtime_id == showtime_id)
            .filter(|row| {
                state
                    .bookings
                    .get(&row.seat.booking_id)
                    .is_some_and(|b| b.status.occupies_seats())
            })
            .map(|row| row.seat.seat_id)
            .collect())
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<CreateBookingOutcome> {
        self.enter().await?;
        let requested = booking.num_tickets();
        let mut state = self.state();

        let Some(available) = state
            .showtimes
            .get(&booking.showtime_id)
            .map(|s| s.available_seats)
        else {
            return Err(LedgerError::Database(format!(
                "showtime {} does not exist",
                booking.showtime_id
            )));
        };
        if available < requested {
            return Ok(CreateBookingOutcome::InsufficientSeats { requested });
        }
        if booking
            .seats
            .iter()
            .any(|s| state.seat_is_active(booking.showtime_id, s.seat_id))
        {
            return Ok(CreateBookingOutcome::SeatsAlreadyBooked);
        }

        if let Some(showtime) = state.showtimes.get_mut(&booking.showtime_id) {
            showtime.available_seats -= requested;
        }
        let created = booking.to_booking();
        state.bookings.insert(created.id, created.clone());
        state
            .booking_seats
            .extend(booking.seats.into_iter().map(|seat| SeatRow {
                seat,
                released: false,
            }));
        Ok(CreateBookingOutcome::Created(created))
    }

    async fn release_booking(
        &self,
        booking_id: BookingId,
        kind: ReleaseKind,
        at: DateTime<Utc>,
    ) -> Result<ReleaseOutcome> {
        self.enter().await?;
        let mut state = self.state();

        let Some(booking) = state.bookings.get_mut(&booking_id) else {
            return Ok(ReleaseOutcome::NotFound);
        };
        let eligible = match kind {
            ReleaseKind::Cancel => booking.status.is_cancellable(),
            ReleaseKind::Expire => booking.is_expired(at),
        };
        if !eligible {
            return Ok(ReleaseOutcome::NotReleasable(booking.status));
        }

        booking.status = kind.target_status();
        if booking.payment_status != PaymentStatus::Paid {
            booking.payment_status = PaymentStatus::Cancelled;
        }
        booking.cancelled_at = Some(at);
        let released = booking.clone();

        for row in &mut state.booking_seats {
            if row.seat.booking_id == booking_id {
                row.released = true;
            }
        }
        if let Some(showtime) = state.showtimes.get_mut(&released.showtime_id) {
            showtime.available_seats += released.num_tickets;
        }
        Ok(ReleaseOutcome::Released(released))
    }

    async fn record_payment(
        &self,
        booking_id: BookingId,
        update: PaymentUpdate,
        at: DateTime<Utc>,
    ) -> Result<PaymentRecordOutcome> {
        self.enter().await?;
        let mut state = self.state();

        let Some(booking) = state.bookings.get_mut(&booking_id) else {
            return Ok(PaymentRecordOutcome::NotFound);
        };
        if booking.status != BookingStatus::Pending || booking.expires_at <= at {
            return Ok(PaymentRecordOutcome::NotPending(booking.status));
        }

        match update {
            PaymentUpdate::Paid => {
                booking.status = BookingStatus::Confirmed;
                booking.payment_status = PaymentStatus::Paid;
                booking.confirmed_at = Some(at);
            }
            PaymentUpdate::Failed => booking.payment_status = PaymentStatus::Failed,
        }
        Ok(PaymentRecordOutcome::Recorded(booking.clone()))
    }

    async fn booking(&self, booking_id: BookingId) -> Result<Option<Booking>> {
        self.enter().await?;
        Ok(self.state().bookings.get(&booking_id).cloned())
    }

    async fn booking_seats(&self, booking_id: BookingId) -> Result<Vec<BookingSeat>> {
        self.enter().await?;
        Ok(self
            .state()
            .booking_seats
            .iter()
            .filter(|row| row.seat.booking_id == booking_id)
            .map(|row| row.seat.clone())
            .collect())
    }

    async fn expired_pending_bookings(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<BookingId>> {
        self.enter().await?;
        let state = self.state();
        let mut expired: Vec<&Booking> = state
            .bookings
            .values()
            .filter(|b| b.is_expired(now))
            .collect();
        expired.sort_by_key(|b| b.expires_at);
        Ok(expired
            .into_iter()
            .take(limit as usize)
            .map(|b| b.id)
            .collect())
    }
}
