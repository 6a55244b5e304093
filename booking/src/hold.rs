//! Hold records.
//!
//! A successful hold stores what `confirm` needs under `hold:<hold id>` in the
//! lock store, next to the seat locks and with the same TTL. `confirm` reads
//! seats and frozen prices from here instead of re-deriving them.

use crate::error::{BookingError, Result};
use boxoffice_core::lock_store::{LockStore, LockStoreError, hold_record_key};
use boxoffice_core::pricing::PriceBreakdown;
use boxoffice_core::types::{HoldId, SeatId, ShowtimeId, UserId};
use boxoffice_runtime::CircuitBreaker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Everything a hold promised, frozen at hold time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldRecord {
    /// Hold id; also the token stored in each seat lock
    pub hold_id: HoldId,
    /// Showtime held
    pub showtime_id: ShowtimeId,
    /// Seats held, in request order
    pub seat_ids: Vec<SeatId>,
    /// Signed-in customer, if any
    pub user_id: Option<UserId>,
    /// Address for the confirmation email
    pub contact_email: Option<String>,
    /// Prices frozen for the seats
    pub pricing: PriceBreakdown,
    /// When the hold was taken
    pub created_at: DateTime<Utc>,
    /// When the locks expire
    pub expires_at: DateTime<Utc>,
}

/// A record as read back, with the exact stored text needed to delete it.
#[derive(Debug, Clone)]
pub(crate) struct StoredHold {
    pub(crate) record: HoldRecord,
    raw: String,
}

/// Reads and writes hold records through the lock-store breaker.
pub(crate) struct HoldRecords<L> {
    store: Arc<L>,
    breaker: CircuitBreaker,
}

impl<L: LockStore> HoldRecords<L> {
    pub(crate) const fn new(store: Arc<L>, breaker: CircuitBreaker) -> Self {
        Self { store, breaker }
    }

    /// Store a fresh record. Hold ids are random, so a collision is reported
    /// as a store error rather than silently overwriting.
    pub(crate) async fn put(&self, record: &HoldRecord, ttl: Duration) -> Result<()> {
        let key = hold_record_key(record.hold_id);
        let raw = serde_json::to_string(record)
            .map_err(|e| LockStoreError::Serialization(e.to_string()))?;
        let written = self
            .breaker
            .call(|| self.store.set_if_absent(&key, &raw, ttl))
            .await
            .map_err(|e| BookingError::from_breaker(self.breaker.name(), e))?;
        if written {
            Ok(())
        } else {
            Err(LockStoreError::Unavailable(format!("hold record {key} already exists")).into())
        }
    }

    pub(crate) async fn get(&self, hold_id: HoldId) -> Result<Option<StoredHold>> {
        let key = hold_record_key(hold_id);
        let raw = self
            .breaker
            .call(|| self.store.get(&key))
            .await
            .map_err(|e| BookingError::from_breaker(self.breaker.name(), e))?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let record = serde_json::from_str(&raw)
            .map_err(|e| LockStoreError::Serialization(format!("hold record {key}: {e}")))?;
        Ok(Some(StoredHold { record, raw }))
    }

    /// Delete the record if it is still the one that was read.
    pub(crate) async fn discard(&self, hold: &StoredHold) -> Result<bool> {
        let key = hold_record_key(hold.record.hold_id);
        self.breaker
            .call(|| self.store.delete_if_equals(&key, &hold.raw))
            .await
            .map_err(|e| BookingError::from_breaker(self.breaker.name(), e))
    }
}
