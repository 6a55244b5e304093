//! Seat lock manager.
//!
//! Per-seat holds live only in the lock store, keyed by
//! `lock:showtime:<id>:seat:<id>` with the hold id as value. Every store call
//! goes through the lock-store circuit breaker, so an unreachable store
//! surfaces as [`BookingError::LockStore`] or [`BookingError::CircuitOpen`],
//! never as a denied lock.
//!
//! Multi-seat acquisition is all-or-nothing by compensation, not by a
//! multi-key transaction: seats locked before a conflict are released again
//! before returning. A crash between the two leaves locks that only clear when
//! their TTL runs out.

use crate::error::{BookingError, Result};
use boxoffice_core::lock_store::{LockStore, seat_lock_key};
use boxoffice_core::types::{HoldId, SeatId, ShowtimeId};
use boxoffice_runtime::CircuitBreaker;
use boxoffice_runtime::metrics::SeatLockMetrics;
use std::sync::Arc;
use std::time::Duration;

/// What the lock store says about one seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatLockStatus {
    /// No unexpired lock.
    Free,
    /// Locked; the value is the owner's opaque token.
    Locked(String),
}

impl SeatLockStatus {
    /// Whether the lock is held by `token`.
    #[must_use]
    pub fn is_owned_by(&self, token: HoldId) -> bool {
        matches!(self, Self::Locked(owner) if *owner == token.to_string())
    }
}

/// Acquires and releases per-seat holds.
pub struct SeatLockManager<L> {
    store: Arc<L>,
    breaker: CircuitBreaker,
}

impl<L> Clone for SeatLockManager<L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            breaker: self.breaker.clone(),
        }
    }
}

impl<L: LockStore> SeatLockManager<L> {
    /// Create a manager over `store`, guarded by `breaker`.
    #[must_use]
    pub const fn new(store: Arc<L>, breaker: CircuitBreaker) -> Self {
        Self { store, breaker }
    }

    /// The breaker guarding the lock store.
    #[must_use]
    pub const fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Lock one seat for `token` if no unexpired lock exists.
    ///
    /// Returns `Ok(false)` on contention.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError`] if the store fails or its breaker is open.
    pub async fn acquire_one(
        &self,
        showtime_id: ShowtimeId,
        seat_id: SeatId,
        token: HoldId,
        ttl: Duration,
    ) -> Result<bool> {
        let key = seat_lock_key(showtime_id, seat_id);
        let value = token.to_string();
        self.breaker
            .call(|| self.store.set_if_absent(&key, &value, ttl))
            .await
            .map_err(|e| BookingError::from_breaker(self.breaker.name(), e))
    }

    /// Lock every seat for `token`, or none of them.
    ///
    /// Seats are tried in id order so two overlapping requests contend on the
    /// same seat first. On the first denied seat the seats already locked by
    /// this call are released and `Ok(false)` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError`] if the store fails; locks taken by this call
    /// are released on a best-effort basis before returning.
    pub async fn acquire_many(
        &self,
        showtime_id: ShowtimeId,
        seat_ids: &[SeatId],
        token: HoldId,
        ttl: Duration,
    ) -> Result<bool> {
        let mut ordered = seat_ids.to_vec();
        ordered.sort_unstable();

        let mut acquired = Vec::with_capacity(ordered.len());
        for seat_id in ordered {
            match self.acquire_one(showtime_id, seat_id, token, ttl).await {
                Ok(true) => acquired.push(seat_id),
                Ok(false) => {
                    tracing::debug!(
                        showtime_id = %showtime_id,
                        seat_id = %seat_id,
                        already_locked = acquired.len(),
                        "Seat already locked, compensating"
                    );
                    SeatLockMetrics::record_contended();
                    self.compensate(showtime_id, &acquired, token).await;
                    return Ok(false);
                }
                Err(e) => {
                    tracing::warn!(
                        showtime_id = %showtime_id,
                        seat_id = %seat_id,
                        error = %e,
                        "Lock store failed during multi-seat hold, compensating"
                    );
                    self.compensate(showtime_id, &acquired, token).await;
                    return Err(e);
                }
            }
        }

        SeatLockMetrics::record_acquired(acquired.len());
        Ok(true)
    }

    async fn compensate(&self, showtime_id: ShowtimeId, acquired: &[SeatId], token: HoldId) {
        if acquired.is_empty() {
            return;
        }
        let released = self.release_many(showtime_id, acquired, token).await;
        SeatLockMetrics::record_compensated(released);
        if released < acquired.len() {
            tracing::warn!(
                showtime_id = %showtime_id,
                orphaned = acquired.len() - released,
                "Compensation left locks behind; they expire with their TTL"
            );
        }
    }

    /// Release one seat if it is locked by `token`.
    ///
    /// Returns `Ok(false)` when the seat is free or owned by another token;
    /// the other owner's lock is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError`] if the store fails or its breaker is open.
    pub async fn release(
        &self,
        showtime_id: ShowtimeId,
        seat_id: SeatId,
        token: HoldId,
    ) -> Result<bool> {
        let key = seat_lock_key(showtime_id, seat_id);
        let expected = token.to_string();
        self.breaker
            .call(|| self.store.delete_if_equals(&key, &expected))
            .await
            .map_err(|e| BookingError::from_breaker(self.breaker.name(), e))
    }

    /// Release every seat independently and return how many were released.
    ///
    /// A failure on one seat is logged and does not stop the others.
    pub async fn release_many(
        &self,
        showtime_id: ShowtimeId,
        seat_ids: &[SeatId],
        token: HoldId,
    ) -> usize {
        let mut released = 0;
        for &seat_id in seat_ids {
            match self.release(showtime_id, seat_id, token).await {
                Ok(true) => released += 1,
                Ok(false) => {
                    tracing::debug!(seat_id = %seat_id, "Seat lock not owned by this hold, skipped");
                }
                Err(e) => {
                    tracing::warn!(seat_id = %seat_id, error = %e, "Failed to release seat lock");
                }
            }
        }
        SeatLockMetrics::record_released(released);
        released
    }

    /// Read the lock on one seat.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError`] if the store fails or its breaker is open.
    pub async fn status(&self, showtime_id: ShowtimeId, seat_id: SeatId) -> Result<SeatLockStatus> {
        let key = seat_lock_key(showtime_id, seat_id);
        let value = self
            .breaker
            .call(|| self.store.get(&key))
            .await
            .map_err(|e| BookingError::from_breaker(self.breaker.name(), e))?;
        Ok(value.map_or(SeatLockStatus::Free, SeatLockStatus::Locked))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boxoffice_core::lock_store::LockStoreError;
    use boxoffice_runtime::CircuitBreakerConfig;
    use boxoffice_testing::InMemoryLockStore;

    const TTL: Duration = Duration::from_secs(300);

    fn manager() -> (SeatLockManager<InMemoryLockStore>, InMemoryLockStore) {
        let store = InMemoryLockStore::new();
        let breaker = CircuitBreaker::new("lock_store", CircuitBreakerConfig::default());
        (SeatLockManager::new(Arc::new(store.clone()), breaker), store)
    }

    #[tokio::test]
    async fn test_acquire_one_contention_is_not_an_error() {
        let (locks, _) = manager();
        let (showtime, seat) = (ShowtimeId::new(), SeatId::new());

        assert!(locks.acquire_one(showtime, seat, HoldId::new(), TTL).await.unwrap());
        assert!(!locks.acquire_one(showtime, seat, HoldId::new(), TTL).await.unwrap());
    }

    #[tokio::test]
    async fn test_acquire_many_compensates_on_conflict() {
        let (locks, store) = manager();
        let showtime = ShowtimeId::new();
        let mut seats: Vec<SeatId> = (0..3).map(|_| SeatId::new()).collect();
        seats.sort_unstable();
        let rival = HoldId::new();
        locks.acquire_one(showtime, seats[2], rival, TTL).await.unwrap();

        let mine = HoldId::new();
        assert!(!locks.acquire_many(showtime, &seats, mine, TTL).await.unwrap());

        assert_eq!(locks.status(showtime, seats[0]).await.unwrap(), SeatLockStatus::Free);
        assert_eq!(locks.status(showtime, seats[1]).await.unwrap(), SeatLockStatus::Free);
        assert!(locks.status(showtime, seats[2]).await.unwrap().is_owned_by(rival));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_acquire_many_all_or_nothing_success() {
        let (locks, _) = manager();
        let showtime = ShowtimeId::new();
        let seats: Vec<SeatId> = (0..4).map(|_| SeatId::new()).collect();
        let token = HoldId::new();

        assert!(locks.acquire_many(showtime, &seats, token, TTL).await.unwrap());
        for seat in &seats {
            assert!(locks.status(showtime, *seat).await.unwrap().is_owned_by(token));
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_error_not_denial() {
        let (locks, store) = manager();
        let showtime = ShowtimeId::new();
        let seats: Vec<SeatId> = (0..2).map(|_| SeatId::new()).collect();
        store.set_unavailable(true);

        let result = locks.acquire_many(showtime, &seats, HoldId::new(), TTL).await;

        assert_eq!(
            result,
            Err(BookingError::LockStore(LockStoreError::Unavailable(
                "in-memory lock store marked unavailable".to_string()
            )))
        );
        store.set_unavailable(false);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_release_by_non_owner_is_noop() {
        let (locks, _) = manager();
        let (showtime, seat) = (ShowtimeId::new(), SeatId::new());
        let owner = HoldId::new();
        locks.acquire_one(showtime, seat, owner, TTL).await.unwrap();

        assert!(!locks.release(showtime, seat, HoldId::new()).await.unwrap());
        assert!(locks.status(showtime, seat).await.unwrap().is_owned_by(owner));
        assert!(locks.release(showtime, seat, owner).await.unwrap());
        assert_eq!(locks.status(showtime, seat).await.unwrap(), SeatLockStatus::Free);
    }

    #[tokio::test]
    async fn test_release_many_continues_past_unowned_seats() {
        let (locks, _) = manager();
        let showtime = ShowtimeId::new();
        let seats: Vec<SeatId> = (0..3).map(|_| SeatId::new()).collect();
        let token = HoldId::new();
        locks.acquire_one(showtime, seats[0], token, TTL).await.unwrap();
        locks.acquire_one(showtime, seats[2], token, TTL).await.unwrap();

        assert_eq!(locks.release_many(showtime, &seats, token).await, 2);
    }

    #[tokio::test]
    async fn test_release_many_continues_past_store_failure() {
        let (locks, store) = manager();
        let showtime = ShowtimeId::new();
        let seats: Vec<SeatId> = (0..3).map(|_| SeatId::new()).collect();
        let token = HoldId::new();
        assert!(locks.acquire_many(showtime, &seats, token, TTL).await.unwrap());

        // Only the first release hits the outage.
        store.fail_next(1);

        assert_eq!(locks.release_many(showtime, &seats, token).await, 2);
        assert!(locks.status(showtime, seats[0]).await.unwrap().is_owned_by(token));
        assert_eq!(locks.status(showtime, seats[1]).await.unwrap(), SeatLockStatus::Free);
        assert_eq!(locks.status(showtime, seats[2]).await.unwrap(), SeatLockStatus::Free);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_lock_reports_free() {
        let (locks, store) = manager();
        let (showtime, seat) = (ShowtimeId::new(), SeatId::new());
        locks.acquire_one(showtime, seat, HoldId::new(), TTL).await.unwrap();

        store.advance(TTL);

        assert_eq!(locks.status(showtime, seat).await.unwrap(), SeatLockStatus::Free);
    }

    #[tokio::test]
    async fn test_breaker_opens_after_repeated_store_failures() {
        let store = InMemoryLockStore::new();
        let breaker = CircuitBreaker::new(
            "lock_store",
            CircuitBreakerConfig::builder().max_failures(2).build(),
        );
        let locks = SeatLockManager::new(Arc::new(store.clone()), breaker);
        let (showtime, seat) = (ShowtimeId::new(), SeatId::new());
        store.set_unavailable(true);

        for _ in 0..2 {
            let err = locks.status(showtime, seat).await.unwrap_err();
            assert!(matches!(err, BookingError::LockStore(_)));
        }
        store.set_unavailable(false);

        let err = locks.status(showtime, seat).await.unwrap_err();
        assert_eq!(err, BookingError::CircuitOpen("lock_store".to_string()));
    }
}
