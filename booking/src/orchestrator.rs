//! Booking orchestrator.
//!
//! Drives a reservation through `hold → confirm → {paid | cancelled | expired}`
//! by composing the seat lock manager, the inventory ledger, and the
//! notification executor:
//!
//! ```text
//! hold ──► seat locks + hold record (lock store, TTL)
//!            │
//! confirm ───┴─► conditional decrement + PENDING booking (ledger, one transaction)
//!                  │           │            │
//!            complete_payment  cancel   expire_sweep
//!               CONFIRMED    CANCELLED    EXPIRED   (cancel/expire give seats back)
//! ```
//!
//! Lock store calls go through the `lock_store` breaker and ledger calls
//! through the `inventory` breaker. Contention and insufficient inventory come
//! back as outcome values; only dependency failures and invalid requests are
//! errors.

use crate::config::{INVENTORY_BREAKER, LOCK_STORE_BREAKER};
use crate::error::{BookingError, Result};
use crate::hold::{HoldRecord, HoldRecords, StoredHold};
use crate::notifications::{self, BookingEvent};
use crate::seat_lock::{SeatLockManager, SeatLockStatus};
use boxoffice_core::environment::Clock;
use boxoffice_core::inventory::{
    CreateBookingOutcome, InventoryLedger, LedgerError, NewBooking, PaymentRecordOutcome,
    PaymentUpdate, ReleaseKind, ReleaseOutcome,
};
use boxoffice_core::lock_store::LockStore;
use boxoffice_core::notification::Notifier;
use boxoffice_core::pricing::{PriceBreakdown, PricingPolicy, quote};
use boxoffice_core::types::{
    Booking, BookingId, BookingSeat, BookingStatus, HoldId, PaymentMethod, Seat, SeatId,
    Showtime, ShowtimeId, UserId,
};
use boxoffice_runtime::metrics::BookingMetrics;
use boxoffice_runtime::{CircuitBreaker, CircuitBreakerRegistry, Job, WorkerPool};
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Orchestrator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingSettings {
    /// Lifetime of seat locks and hold records
    pub hold_ttl: Duration,
    /// How long a PENDING booking waits for payment
    pub payment_window: Duration,
    /// Maximum seats in one hold
    pub max_seats_per_hold: usize,
    /// Maximum bookings expired per sweep
    pub sweep_batch_size: u32,
    /// Booking fee and tax
    pub pricing: PricingPolicy,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            hold_ttl: Duration::from_secs(300),
            payment_window: Duration::from_secs(900),
            max_seats_per_hold: 10,
            sweep_batch_size: 100,
            pricing: PricingPolicy::default(),
        }
    }
}

/// A request to hold seats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldRequest {
    /// Showtime to hold seats for
    pub showtime_id: ShowtimeId,
    /// Seats to hold
    pub seat_ids: Vec<SeatId>,
    /// Signed-in customer, if any
    pub user_id: Option<UserId>,
    /// Address for the confirmation email
    pub contact_email: Option<String>,
}

impl HoldRequest {
    /// Anonymous request for `seat_ids`.
    #[must_use]
    pub const fn new(showtime_id: ShowtimeId, seat_ids: Vec<SeatId>) -> Self {
        Self {
            showtime_id,
            seat_ids,
            user_id: None,
            contact_email: None,
        }
    }

    /// Attach the signed-in customer.
    #[must_use]
    pub const fn for_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Attach a contact address.
    #[must_use]
    pub fn with_contact_email(mut self, email: impl Into<String>) -> Self {
        self.contact_email = Some(email.into());
        self
    }
}

/// Seats successfully held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldSeats {
    /// Token to pass to [`BookingOrchestrator::confirm`]
    pub hold_id: HoldId,
    /// When the hold lapses
    pub expires_at: DateTime<Utc>,
    /// Prices frozen for the hold
    pub pricing: PriceBreakdown,
}

/// Result of [`BookingOrchestrator::hold`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldOutcome {
    /// Every seat is locked for this hold.
    Held(HeldSeats),
    /// At least one seat is locked or booked by someone else. Nothing is held.
    Unavailable,
}

/// Result of [`BookingOrchestrator::confirm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Booking persisted as PENDING, awaiting payment.
    Confirmed(Booking),
    /// The conditional decrement found too few seats. Final.
    InsufficientSeats {
        /// Seats requested
        requested: u32,
    },
    /// A seat is already covered by an active booking. Final.
    SeatsAlreadyBooked,
    /// The hold record or one of its locks is gone.
    HoldExpired,
}

/// Result of [`BookingOrchestrator::cancel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Booking cancelled and seats returned.
    Cancelled(Booking),
    /// No such booking.
    NotFound,
    /// The booking is neither PENDING nor CONFIRMED.
    NotCancellable(BookingStatus),
}

/// Payment completion signal from the payment collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentResult {
    /// Payment captured.
    Succeeded,
    /// Payment attempt failed.
    Failed {
        /// Reason reported by the collaborator
        reason: String,
    },
}

/// Result of [`BookingOrchestrator::complete_payment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Payment state recorded on the booking.
    Recorded(Booking),
    /// No such booking.
    NotFound,
    /// The booking is not an unexpired PENDING booking.
    NotPending(BookingStatus),
}

/// Result of one [`BookingOrchestrator::expire_sweep`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Bookings moved to EXPIRED
    pub expired: usize,
    /// Bookings paid or cancelled between listing and expiring
    pub skipped: usize,
    /// Bookings whose release failed; retried next pass
    pub failed: usize,
}

/// Seat state as shown to customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatState {
    /// Free to hold
    Available,
    /// Held by an unconfirmed session
    Locked,
    /// Covered by a PENDING or CONFIRMED booking
    Booked,
}

/// One entry of a seat map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatAvailability {
    /// The seat
    pub seat: Seat,
    /// Its state
    pub state: SeatState,
}

/// Hold, confirm, cancel, and expire bookings.
pub struct BookingOrchestrator<L, I, N> {
    locks: SeatLockManager<L>,
    holds: HoldRecords<L>,
    ledger: Arc<I>,
    ledger_breaker: CircuitBreaker,
    notifier: Arc<N>,
    executor: Arc<WorkerPool>,
    clock: Arc<dyn Clock>,
    settings: BookingSettings,
}

impl<L, I, N> BookingOrchestrator<L, I, N>
where
    L: LockStore,
    I: InventoryLedger,
    N: Notifier,
{
    /// Wire an orchestrator.
    ///
    /// Breakers are taken from `breakers` by name (`lock_store`, `inventory`);
    /// a missing entry gets a default breaker.
    #[must_use]
    pub fn new(
        lock_store: Arc<L>,
        ledger: Arc<I>,
        notifier: Arc<N>,
        executor: Arc<WorkerPool>,
        breakers: &CircuitBreakerRegistry,
        clock: Arc<dyn Clock>,
        settings: BookingSettings,
    ) -> Self {
        let lock_breaker = breakers.get_or_default(LOCK_STORE_BREAKER);
        Self {
            locks: SeatLockManager::new(Arc::clone(&lock_store), lock_breaker.clone()),
            holds: HoldRecords::new(lock_store, lock_breaker),
            ledger,
            ledger_breaker: breakers.get_or_default(INVENTORY_BREAKER),
            notifier,
            executor,
            clock,
            settings,
        }
    }

    /// Current settings.
    #[must_use]
    pub const fn settings(&self) -> &BookingSettings {
        &self.settings
    }

    /// The seat lock manager.
    #[must_use]
    pub const fn seat_locks(&self) -> &SeatLockManager<L> {
        &self.locks
    }

    /// The breaker guarding the inventory ledger.
    #[must_use]
    pub const fn ledger_breaker(&self) -> &CircuitBreaker {
        &self.ledger_breaker
    }

    async fn guarded<T>(
        &self,
        call: impl Future<Output = std::result::Result<T, LedgerError>>,
    ) -> Result<T> {
        self.ledger_breaker
            .call(|| call)
            .await
            .map_err(|e| BookingError::from_breaker(self.ledger_breaker.name(), e))
    }

    // ------------------------------------------------------------------------
    // Hold
    // ------------------------------------------------------------------------

    /// Lock the requested seats and price them.
    ///
    /// Nothing durable is written. The returned hold lapses after the hold TTL
    /// unless confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidRequest`] for an empty, duplicated, or
    /// oversized seat list, an unknown or unbookable showtime, or seats not on
    /// the showtime's screen. Returns a dependency error if a store fails; any
    /// locks taken are released first.
    #[tracing::instrument(
        skip_all,
        fields(showtime_id = %request.showtime_id, seats = request.seat_ids.len())
    )]
    pub async fn hold(&self, request: HoldRequest) -> Result<HoldOutcome> {
        let result = self.try_hold(request).await;
        BookingMetrics::record_hold(match &result {
            Ok(HoldOutcome::Held(_)) => "held",
            Ok(HoldOutcome::Unavailable) => "unavailable",
            Err(_) => "error",
        });
        result
    }

    async fn try_hold(&self, request: HoldRequest) -> Result<HoldOutcome> {
        self.validate_seat_list(&request.seat_ids)?;
        let now = self.clock.now();

        let showtime = self
            .guarded(self.ledger.showtime(request.showtime_id))
            .await?
            .ok_or_else(|| {
                BookingError::InvalidRequest(format!("showtime {} not found", request.showtime_id))
            })?;
        if !showtime.is_bookable(now) {
            return Err(BookingError::InvalidRequest(format!(
                "showtime {} is not open for booking",
                showtime.id
            )));
        }
        let seats = self.resolve_seats(&showtime, &request.seat_ids).await?;

        let hold_id = HoldId::new();
        let acquired = self
            .locks
            .acquire_many(showtime.id, &request.seat_ids, hold_id, self.settings.hold_ttl)
            .await?;
        if !acquired {
            return Ok(HoldOutcome::Unavailable);
        }

        let outcome = self.finish_hold(&request, &showtime, &seats, hold_id, now).await;
        if !matches!(outcome, Ok(HoldOutcome::Held(_))) {
            self.locks
                .release_many(showtime.id, &request.seat_ids, hold_id)
                .await;
        }
        outcome
    }

    fn validate_seat_list(&self, seat_ids: &[SeatId]) -> Result<()> {
        if seat_ids.is_empty() {
            return Err(BookingError::InvalidRequest(
                "at least one seat is required".to_string(),
            ));
        }
        if seat_ids.len() > self.settings.max_seats_per_hold {
            return Err(BookingError::InvalidRequest(format!(
                "at most {} seats can be held at once",
                self.settings.max_seats_per_hold
            )));
        }
        let unique: HashSet<&SeatId> = seat_ids.iter().collect();
        if unique.len() != seat_ids.len() {
            return Err(BookingError::InvalidRequest(
                "seat list contains duplicates".to_string(),
            ));
        }
        Ok(())
    }

    async fn resolve_seats(&self, showtime: &Showtime, seat_ids: &[SeatId]) -> Result<Vec<Seat>> {
        let screen: HashMap<SeatId, Seat> = self
            .guarded(self.ledger.seats_for_showtime(showtime.id))
            .await?
            .into_iter()
            .map(|seat| (seat.id, seat))
            .collect();

        seat_ids
            .iter()
            .map(|id| {
                screen.get(id).cloned().ok_or_else(|| {
                    BookingError::InvalidRequest(format!(
                        "seat {id} is not part of showtime {}",
                        showtime.id
                    ))
                })
            })
            .collect()
    }

    async fn finish_hold(
        &self,
        request: &HoldRequest,
        showtime: &Showtime,
        seats: &[Seat],
        hold_id: HoldId,
        now: DateTime<Utc>,
    ) -> Result<HoldOutcome> {
        // A lock can be free while the seat is durably booked.
        let booked = self
            .guarded(self.ledger.booked_seat_ids(showtime.id))
            .await?;
        if request.seat_ids.iter().any(|id| booked.contains(id)) {
            tracing::debug!(hold_id = %hold_id, "Requested seat already booked");
            return Ok(HoldOutcome::Unavailable);
        }

        let record = HoldRecord {
            hold_id,
            showtime_id: showtime.id,
            seat_ids: request.seat_ids.clone(),
            user_id: request.user_id,
            contact_email: request.contact_email.clone(),
            pricing: quote(showtime, seats, &self.settings.pricing),
            created_at: now,
            expires_at: now + span(self.settings.hold_ttl),
        };
        self.holds.put(&record, self.settings.hold_ttl).await?;

        tracing::info!(
            hold_id = %hold_id,
            total = %record.pricing.total,
            expires_at = %record.expires_at,
            "Seats held"
        );
        Ok(HoldOutcome::Held(HeldSeats {
            hold_id,
            expires_at: record.expires_at,
            pricing: record.pricing,
        }))
    }

    // ------------------------------------------------------------------------
    // Confirm
    // ------------------------------------------------------------------------

    /// Turn a hold into a PENDING booking.
    ///
    /// Seats and prices come from the hold record. The ledger decrements
    /// `available_seats` only if enough remain and writes the booking in the
    /// same transaction. On success the seat locks and hold record are
    /// released and notifications are queued.
    ///
    /// # Errors
    ///
    /// Returns a dependency error if a store fails or a breaker is open. The
    /// hold is left in place so the call can be retried before it lapses.
    #[tracing::instrument(skip_all, fields(hold_id = %hold_id))]
    pub async fn confirm(
        &self,
        hold_id: HoldId,
        payment_method: PaymentMethod,
    ) -> Result<ConfirmOutcome> {
        let started = Instant::now();
        let result = self.try_confirm(hold_id, payment_method).await;
        let label = match &result {
            Ok(ConfirmOutcome::Confirmed(_)) => "confirmed",
            Ok(ConfirmOutcome::InsufficientSeats { .. }) => "insufficient_seats",
            Ok(ConfirmOutcome::SeatsAlreadyBooked) => "seats_already_booked",
            Ok(ConfirmOutcome::HoldExpired) => "hold_expired",
            Err(_) => "error",
        };
        BookingMetrics::record_confirm(label, started.elapsed());
        result
    }

    async fn try_confirm(
        &self,
        hold_id: HoldId,
        payment_method: PaymentMethod,
    ) -> Result<ConfirmOutcome> {
        let Some(hold) = self.holds.get(hold_id).await? else {
            tracing::debug!("Hold record missing");
            return Ok(ConfirmOutcome::HoldExpired);
        };
        let record = &hold.record;
        let now = self.clock.now();
        if record.expires_at <= now {
            self.retire_hold(&hold).await;
            return Ok(ConfirmOutcome::HoldExpired);
        }
        for &seat_id in &record.seat_ids {
            let status = self.locks.status(record.showtime_id, seat_id).await?;
            if !status.is_owned_by(hold_id) {
                tracing::debug!(seat_id = %seat_id, "Seat lock no longer owned by hold");
                // The hold can never confirm; free the seats it still has.
                self.retire_hold(&hold).await;
                return Ok(ConfirmOutcome::HoldExpired);
            }
        }

        let booking_id = BookingId::new();
        let new_booking = NewBooking {
            id: booking_id,
            code: booking_code(),
            showtime_id: record.showtime_id,
            user_id: record.user_id,
            contact_email: record.contact_email.clone(),
            payment_method,
            seats: record
                .pricing
                .seats
                .iter()
                .map(|priced| BookingSeat {
                    booking_id,
                    showtime_id: record.showtime_id,
                    seat_id: priced.seat_id,
                    seat_type: priced.seat_type,
                    price: priced.price,
                })
                .collect(),
            subtotal: record.pricing.subtotal,
            booking_fee: record.pricing.booking_fee,
            tax: record.pricing.tax,
            total: record.pricing.total,
            expires_at: now + span(self.settings.payment_window),
            created_at: now,
        };

        match self.guarded(self.ledger.create_booking(new_booking)).await? {
            CreateBookingOutcome::Created(booking) => {
                self.retire_hold(&hold).await;
                BookingMetrics::record_seats_confirmed(booking.num_tickets);
                tracing::info!(
                    booking_id = %booking.id,
                    code = %booking.code,
                    seats = booking.num_tickets,
                    total = %booking.total,
                    "Booking created"
                );
                self.notify(BookingEvent::Created, &booking);
                Ok(ConfirmOutcome::Confirmed(booking))
            }
            CreateBookingOutcome::InsufficientSeats { requested } => {
                tracing::warn!(
                    showtime_id = %record.showtime_id,
                    requested,
                    "Hold could not be confirmed: insufficient seats"
                );
                self.retire_hold(&hold).await;
                Ok(ConfirmOutcome::InsufficientSeats { requested })
            }
            CreateBookingOutcome::SeatsAlreadyBooked => {
                tracing::warn!(
                    showtime_id = %record.showtime_id,
                    "Hold could not be confirmed: seats already booked"
                );
                self.retire_hold(&hold).await;
                Ok(ConfirmOutcome::SeatsAlreadyBooked)
            }
        }
    }

    /// Release a hold's locks and record once it is settled either way.
    async fn retire_hold(&self, hold: &StoredHold) {
        let record = &hold.record;
        self.locks
            .release_many(record.showtime_id, &record.seat_ids, record.hold_id)
            .await;
        if let Err(e) = self.holds.discard(hold).await {
            tracing::warn!(hold_id = %record.hold_id, error = %e, "Failed to discard hold record");
        }
    }

    // ------------------------------------------------------------------------
    // Cancel, payment, expiry
    // ------------------------------------------------------------------------

    /// Cancel a PENDING or CONFIRMED booking and give its seats back.
    ///
    /// # Errors
    ///
    /// Returns a dependency error if the ledger fails or its breaker is open.
    #[tracing::instrument(skip_all, fields(booking_id = %booking_id))]
    pub async fn cancel(&self, booking_id: BookingId) -> Result<CancelOutcome> {
        let now = self.clock.now();
        let outcome = self
            .guarded(self.ledger.release_booking(booking_id, ReleaseKind::Cancel, now))
            .await?;

        Ok(match outcome {
            ReleaseOutcome::Released(booking) => {
                BookingMetrics::record_cancellation();
                tracing::info!(
                    code = %booking.code,
                    seats = booking.num_tickets,
                    payment_status = %booking.payment_status,
                    "Booking cancelled"
                );
                self.notify(BookingEvent::Cancelled, &booking);
                CancelOutcome::Cancelled(booking)
            }
            ReleaseOutcome::NotFound => CancelOutcome::NotFound,
            ReleaseOutcome::NotReleasable(status) => CancelOutcome::NotCancellable(status),
        })
    }

    /// Apply the payment collaborator's completion signal.
    ///
    /// Success confirms the booking; failure marks the payment FAILED and
    /// leaves the booking PENDING until it expires.
    ///
    /// # Errors
    ///
    /// Returns a dependency error if the ledger fails or its breaker is open.
    #[tracing::instrument(skip_all, fields(booking_id = %booking_id))]
    pub async fn complete_payment(
        &self,
        booking_id: BookingId,
        result: PaymentResult,
    ) -> Result<PaymentOutcome> {
        let update = match &result {
            PaymentResult::Succeeded => PaymentUpdate::Paid,
            PaymentResult::Failed { .. } => PaymentUpdate::Failed,
        };
        let now = self.clock.now();
        let outcome = self
            .guarded(self.ledger.record_payment(booking_id, update, now))
            .await?;

        Ok(match outcome {
            PaymentRecordOutcome::Recorded(booking) => {
                match result {
                    PaymentResult::Succeeded => {
                        BookingMetrics::record_payment("paid");
                        tracing::info!(code = %booking.code, "Payment received, booking confirmed");
                        self.notify(BookingEvent::Paid, &booking);
                    }
                    PaymentResult::Failed { reason } => {
                        BookingMetrics::record_payment("failed");
                        tracing::warn!(code = %booking.code, reason = %reason, "Payment failed");
                    }
                }
                PaymentOutcome::Recorded(booking)
            }
            PaymentRecordOutcome::NotFound => {
                BookingMetrics::record_payment("rejected");
                PaymentOutcome::NotFound
            }
            PaymentRecordOutcome::NotPending(status) => {
                BookingMetrics::record_payment("rejected");
                tracing::warn!(status = %status, "Payment signal for a booking that is not pending");
                PaymentOutcome::NotPending(status)
            }
        })
    }

    /// Expire up to `sweep_batch_size` PENDING bookings past their deadline.
    ///
    /// Each booking is released independently; one failure does not stop the
    /// pass.
    ///
    /// # Errors
    ///
    /// Returns a dependency error only if listing the expired bookings fails.
    #[tracing::instrument(skip_all)]
    pub async fn expire_sweep(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let due = self
            .guarded(
                self.ledger
                    .expired_pending_bookings(now, self.settings.sweep_batch_size),
            )
            .await?;

        let mut report = SweepReport::default();
        for booking_id in due {
            match self
                .guarded(self.ledger.release_booking(booking_id, ReleaseKind::Expire, now))
                .await
            {
                Ok(ReleaseOutcome::Released(booking)) => {
                    report.expired += 1;
                    self.notify(BookingEvent::Expired, &booking);
                }
                Ok(ReleaseOutcome::NotFound | ReleaseOutcome::NotReleasable(_)) => {
                    report.skipped += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(booking_id = %booking_id, error = %e, "Failed to expire booking");
                }
            }
        }

        BookingMetrics::record_expirations(report.expired);
        if report != SweepReport::default() {
            tracing::info!(
                expired = report.expired,
                skipped = report.skipped,
                failed = report.failed,
                "Expiry sweep finished"
            );
        }
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Read path
    // ------------------------------------------------------------------------

    /// Seat map of a showtime: BOOKED over LOCKED over AVAILABLE.
    ///
    /// A locked seat never reveals which session holds it.
    ///
    /// # Errors
    ///
    /// Returns a dependency error if a store fails or a breaker is open.
    pub async fn seat_map(&self, showtime_id: ShowtimeId) -> Result<Vec<SeatAvailability>> {
        let seats = self
            .guarded(self.ledger.seats_for_showtime(showtime_id))
            .await?;
        let booked = self
            .guarded(self.ledger.booked_seat_ids(showtime_id))
            .await?;

        let lookups = seats
            .iter()
            .map(|seat| self.seat_state(showtime_id, seat.id, &booked));
        let states = futures::future::try_join_all(lookups).await?;

        Ok(seats
            .into_iter()
            .zip(states)
            .map(|(seat, state)| SeatAvailability { seat, state })
            .collect())
    }

    async fn seat_state(
        &self,
        showtime_id: ShowtimeId,
        seat_id: SeatId,
        booked: &HashSet<SeatId>,
    ) -> Result<SeatState> {
        if booked.contains(&seat_id) {
            return Ok(SeatState::Booked);
        }
        Ok(match self.locks.status(showtime_id, seat_id).await? {
            SeatLockStatus::Free => SeatState::Available,
            SeatLockStatus::Locked(_) => SeatState::Locked,
        })
    }

    fn notify(&self, event: BookingEvent, booking: &Booking) {
        for notification in notifications::for_booking(event, booking) {
            let name = format!("notify:{}:{}", event.as_str(), notification.channel());
            let notifier = Arc::clone(&self.notifier);
            let job = Job::new(name, async move { notifier.deliver(notification).await });
            if !self.executor.submit(job) {
                tracing::warn!(
                    booking_id = %booking.id,
                    event = event.as_str(),
                    "Notification queue full, dropping notification"
                );
            }
        }
    }
}

/// `BK-` followed by eight upper-case alphanumerics.
fn booking_code() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("BK-{suffix}")
}

fn span(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::weeks(52))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boxoffice_core::lock_store::seat_lock_key;
    use boxoffice_runtime::WorkerPoolConfig;
    use boxoffice_testing::fixtures::{Fixture, ShowtimeFixture};
    use boxoffice_testing::{
        InMemoryInventoryLedger, InMemoryLockStore, ManualClock, RecordingNotifier,
        init_test_tracing, test_clock,
    };

    struct Harness {
        orchestrator: BookingOrchestrator<InMemoryLockStore, InMemoryInventoryLedger, RecordingNotifier>,
        locks: InMemoryLockStore,
        ledger: InMemoryInventoryLedger,
        clock: ManualClock,
        fixture: Fixture,
    }

    fn harness(fixture: impl FnOnce(ShowtimeFixture) -> ShowtimeFixture) -> Harness {
        init_test_tracing();
        let clock = ManualClock::new(test_clock().now());
        let fixture = fixture(ShowtimeFixture::new(clock.now())).build();
        let locks = InMemoryLockStore::new();
        let ledger = InMemoryInventoryLedger::new();
        ledger.insert_fixture(&fixture);

        let orchestrator = BookingOrchestrator::new(
            Arc::new(locks.clone()),
            Arc::new(ledger.clone()),
            Arc::new(RecordingNotifier::new()),
            Arc::new(WorkerPool::start(WorkerPoolConfig::default())),
            &CircuitBreakerRegistry::new(),
            Arc::new(clock.clone()),
            BookingSettings::default(),
        );
        Harness {
            orchestrator,
            locks,
            ledger,
            clock,
            fixture,
        }
    }

    fn held(outcome: HoldOutcome) -> HeldSeats {
        match outcome {
            HoldOutcome::Held(seats) => seats,
            HoldOutcome::Unavailable => unreachable!("expected seats to be held"),
        }
    }

    #[test]
    fn test_booking_code_format() {
        let code = booking_code();

        assert_eq!(code.len(), 11);
        assert!(code.starts_with("BK-"));
        assert!(
            code[3..]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[tokio::test]
    async fn test_hold_validation() {
        let h = harness(|f| f.rows(&["A"], 3));
        let id = h.fixture.showtime.id;
        let a1 = h.fixture.seat_ids(&["A1"])[0];

        let empty = h.orchestrator.hold(HoldRequest::new(id, vec![])).await;
        assert!(matches!(empty, Err(BookingError::InvalidRequest(_))));

        let duplicate = h.orchestrator.hold(HoldRequest::new(id, vec![a1, a1])).await;
        assert!(matches!(duplicate, Err(BookingError::InvalidRequest(_))));

        let foreign = h
            .orchestrator
            .hold(HoldRequest::new(id, vec![SeatId::new()]))
            .await;
        assert!(matches!(foreign, Err(BookingError::InvalidRequest(_))));

        let unknown = h
            .orchestrator
            .hold(HoldRequest::new(ShowtimeId::new(), vec![a1]))
            .await;
        assert!(matches!(unknown, Err(BookingError::InvalidRequest(_))));
        assert!(h.locks.is_empty());
    }

    #[tokio::test]
    async fn test_hold_rejects_started_showtime() {
        let h = harness(|f| f.rows(&["A"], 1));
        h.clock.advance(chrono::Duration::days(2));

        let result = h
            .orchestrator
            .hold(HoldRequest::new(h.fixture.showtime.id, h.fixture.seat_ids(&["A1"])))
            .await;

        assert!(matches!(result, Err(BookingError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_hold_prices_and_records() {
        let h = harness(|f| f.rows(&["A"], 2));
        let seats = h.fixture.seat_ids(&["A1", "A2"]);

        let held = held(
            h.orchestrator
                .hold(HoldRequest::new(h.fixture.showtime.id, seats.clone()))
                .await
                .unwrap(),
        );

        assert_eq!(held.pricing.seats.len(), 2);
        assert_eq!(
            held.pricing.total,
            held.pricing
                .subtotal
                .saturating_add(held.pricing.booking_fee)
                .saturating_add(held.pricing.tax)
        );
        assert_eq!(held.expires_at, h.clock.now() + chrono::Duration::minutes(5));
        // Two seat locks plus the hold record.
        assert_eq!(h.locks.len(), 3);
        // Nothing durable yet.
        assert_eq!(h.ledger.available_seats(h.fixture.showtime.id), Some(2));
    }

    #[tokio::test]
    async fn test_confirm_releases_locks_and_persists() {
        let h = harness(|f| f.rows(&["A"], 3));
        let id = h.fixture.showtime.id;
        let hold = held(
            h.orchestrator
                .hold(HoldRequest::new(id, h.fixture.seat_ids(&["A1", "A2"])))
                .await
                .unwrap(),
        );

        let outcome = h
            .orchestrator
            .confirm(hold.hold_id, PaymentMethod::Cash)
            .await
            .unwrap();

        let ConfirmOutcome::Confirmed(booking) = outcome else {
            unreachable!("expected confirmation");
        };
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.total, hold.pricing.total);
        assert_eq!(booking.expires_at, h.clock.now() + chrono::Duration::minutes(15));
        assert_eq!(h.ledger.available_seats(id), Some(1));
        assert!(h.locks.is_empty());

        let again = h
            .orchestrator
            .confirm(hold.hold_id, PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(again, ConfirmOutcome::HoldExpired);
    }

    #[tokio::test]
    async fn test_confirm_after_ttl_is_hold_expired() {
        let h = harness(|f| f.rows(&["A"], 1));
        let hold = held(
            h.orchestrator
                .hold(HoldRequest::new(h.fixture.showtime.id, h.fixture.seat_ids(&["A1"])))
                .await
                .unwrap(),
        );

        h.locks.advance(Duration::from_secs(300));
        h.clock.advance(chrono::Duration::minutes(5));

        let outcome = h
            .orchestrator
            .confirm(hold.hold_id, PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(outcome, ConfirmOutcome::HoldExpired);
        assert_eq!(h.ledger.booking_count(), 0);
    }

    #[tokio::test]
    async fn test_lapsed_hold_record_is_retired_on_confirm() {
        let h = harness(|f| f.rows(&["A"], 2));
        let hold = held(
            h.orchestrator
                .hold(HoldRequest::new(
                    h.fixture.showtime.id,
                    h.fixture.seat_ids(&["A1", "A2"]),
                ))
                .await
                .unwrap(),
        );

        // Wall clock passes the deadline before the store evicts anything.
        h.clock.advance(chrono::Duration::minutes(5));

        let outcome = h
            .orchestrator
            .confirm(hold.hold_id, PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(outcome, ConfirmOutcome::HoldExpired);
        assert!(h.locks.is_empty());
    }

    #[tokio::test]
    async fn test_hold_missing_a_lock_is_retired_on_confirm() {
        let h = harness(|f| f.rows(&["A"], 2));
        let id = h.fixture.showtime.id;
        let seats = h.fixture.seat_ids(&["A1", "A2"]);
        let hold = held(
            h.orchestrator
                .hold(HoldRequest::new(id, seats.clone()))
                .await
                .unwrap(),
        );
        assert!(
            h.locks
                .delete_if_equals(&seat_lock_key(id, seats[0]), &hold.hold_id.to_string())
                .await
                .unwrap()
        );

        let outcome = h
            .orchestrator
            .confirm(hold.hold_id, PaymentMethod::Cash)
            .await
            .unwrap();

        assert_eq!(outcome, ConfirmOutcome::HoldExpired);
        assert!(h.locks.is_empty());
        assert_eq!(
            h.orchestrator.seat_locks().status(id, seats[1]).await.unwrap(),
            SeatLockStatus::Free
        );
        let map = h.orchestrator.seat_map(id).await.unwrap();
        assert!(map.iter().all(|s| s.state == SeatState::Available));
        assert_eq!(h.ledger.booking_count(), 0);
    }

    #[tokio::test]
    async fn test_payment_after_deadline_is_not_recorded() {
        let h = harness(|f| f.rows(&["A"], 1));
        let hold = held(
            h.orchestrator
                .hold(HoldRequest::new(h.fixture.showtime.id, h.fixture.seat_ids(&["A1"])))
                .await
                .unwrap(),
        );
        let ConfirmOutcome::Confirmed(booking) = h
            .orchestrator
            .confirm(hold.hold_id, PaymentMethod::Cash)
            .await
            .unwrap()
        else {
            unreachable!("expected confirmation");
        };

        // Past the payment window, but no sweep has run yet.
        h.clock.advance(chrono::Duration::minutes(15));

        for result in [
            PaymentResult::Succeeded,
            PaymentResult::Failed {
                reason: "card declined".to_string(),
            },
        ] {
            let outcome = h
                .orchestrator
                .complete_payment(booking.id, result)
                .await
                .unwrap();
            assert_eq!(outcome, PaymentOutcome::NotPending(BookingStatus::Pending));
        }
        assert_eq!(h.ledger.available_seats(h.fixture.showtime.id), Some(0));
    }

    #[tokio::test]
    async fn test_booked_seat_cannot_be_held_again() {
        let h = harness(|f| f.rows(&["A"], 2));
        let id = h.fixture.showtime.id;
        let a1 = h.fixture.seat_ids(&["A1"]);
        let hold = held(h.orchestrator.hold(HoldRequest::new(id, a1.clone())).await.unwrap());
        h.orchestrator
            .confirm(hold.hold_id, PaymentMethod::Cash)
            .await
            .unwrap();

        let second = h.orchestrator.hold(HoldRequest::new(id, a1)).await.unwrap();

        assert_eq!(second, HoldOutcome::Unavailable);
        assert!(h.locks.is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_seats_is_outcome_not_error() {
        // Inventory counter already drifted below the seat count.
        let h = harness(|f| f.rows(&["A"], 2).available_seats(0));
        let hold = held(
            h.orchestrator
                .hold(HoldRequest::new(h.fixture.showtime.id, h.fixture.seat_ids(&["A1"])))
                .await
                .unwrap(),
        );

        let outcome = h
            .orchestrator
            .confirm(hold.hold_id, PaymentMethod::Cash)
            .await
            .unwrap();

        assert_eq!(outcome, ConfirmOutcome::InsufficientSeats { requested: 1 });
        assert_eq!(h.ledger.available_seats(h.fixture.showtime.id), Some(0));
        assert!(h.locks.is_empty());
    }

    #[tokio::test]
    async fn test_ledger_failure_keeps_hold_for_retry() {
        let h = harness(|f| f.rows(&["A"], 1));
        let hold = held(
            h.orchestrator
                .hold(HoldRequest::new(h.fixture.showtime.id, h.fixture.seat_ids(&["A1"])))
                .await
                .unwrap(),
        );

        h.ledger.fail_next(1);
        let err = h
            .orchestrator
            .confirm(hold.hold_id, PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let retried = h
            .orchestrator
            .confirm(hold.hold_id, PaymentMethod::Cash)
            .await
            .unwrap();
        assert!(matches!(retried, ConfirmOutcome::Confirmed(_)));
    }

    #[tokio::test]
    async fn test_payment_and_cancel_paths() {
        let h = harness(|f| f.rows(&["A"], 2));
        let id = h.fixture.showtime.id;
        let hold = held(
            h.orchestrator
                .hold(HoldRequest::new(id, h.fixture.seat_ids(&["A1", "A2"])))
                .await
                .unwrap(),
        );
        let ConfirmOutcome::Confirmed(booking) = h
            .orchestrator
            .confirm(hold.hold_id, PaymentMethod::Cash)
            .await
            .unwrap()
        else {
            unreachable!("expected confirmation");
        };

        let failed = h
            .orchestrator
            .complete_payment(
                booking.id,
                PaymentResult::Failed {
                    reason: "card declined".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(matches!(
            failed,
            PaymentOutcome::Recorded(ref b) if b.status == BookingStatus::Pending
        ));

        let paid = h
            .orchestrator
            .complete_payment(booking.id, PaymentResult::Succeeded)
            .await
            .unwrap();
        assert!(matches!(
            paid,
            PaymentOutcome::Recorded(ref b) if b.status == BookingStatus::Confirmed
        ));

        let cancelled = h.orchestrator.cancel(booking.id).await.unwrap();
        let CancelOutcome::Cancelled(cancelled) = cancelled else {
            unreachable!("expected cancellation");
        };
        assert_eq!(cancelled.payment_status, boxoffice_core::types::PaymentStatus::Paid);
        assert_eq!(h.ledger.available_seats(id), Some(2));

        assert_eq!(
            h.orchestrator.cancel(booking.id).await.unwrap(),
            CancelOutcome::NotCancellable(BookingStatus::Cancelled)
        );
        assert_eq!(
            h.orchestrator.cancel(BookingId::new()).await.unwrap(),
            CancelOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_seat_map_precedence() {
        let h = harness(|f| f.rows(&["A"], 3));
        let id = h.fixture.showtime.id;
        let booked = held(
            h.orchestrator
                .hold(HoldRequest::new(id, h.fixture.seat_ids(&["A1"])))
                .await
                .unwrap(),
        );
        h.orchestrator
            .confirm(booked.hold_id, PaymentMethod::Cash)
            .await
            .unwrap();
        h.orchestrator
            .hold(HoldRequest::new(id, h.fixture.seat_ids(&["A2"])))
            .await
            .unwrap();

        let map = h.orchestrator.seat_map(id).await.unwrap();
        let states: Vec<(String, SeatState)> =
            map.iter().map(|s| (s.seat.label(), s.state)).collect();

        assert_eq!(
            states,
            vec![
                ("A1".to_string(), SeatState::Booked),
                ("A2".to_string(), SeatState::Locked),
                ("A3".to_string(), SeatState::Available),
            ]
        );
    }
}
