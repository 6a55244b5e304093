//! Lock store port.
//!
//! Cross-process mutual exclusion for seat holds. The contract is the minimum
//! a shared cache must offer:
//!
//! - `set_if_absent(key, value, ttl)`: atomic set-if-absent with expiry
//! - `get(key)`: read the current value
//! - `delete_if_equals(key, expected)`: atomic check-and-delete
//!
//! Any backend providing these three primitives atomically can coordinate
//! holds across server instances without touching the orchestrator.
//!
//! # Implementations
//!
//! - `RedisLockStore` (in `boxoffice-redis`): `SET NX PX`, `GET`, Lua check-and-delete
//! - `InMemoryLockStore` (in `boxoffice-testing`): mutex-protected map with expiry

use crate::types::{HoldId, SeatId, ShowtimeId};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors from the lock store. Always a dependency failure, never contention.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockStoreError {
    /// The store could not be reached or rejected the command.
    #[error("Lock store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be encoded or decoded.
    #[error("Lock store serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for lock store operations.
pub type Result<T> = std::result::Result<T, LockStoreError>;

/// Shared key-value cache with atomic conditional primitives.
///
/// # Atomicity
///
/// `set_if_absent` and `delete_if_equals` MUST each be a single atomic
/// operation in the backing store. Emulating them with a read followed by a
/// write reintroduces the double-hold race they exist to prevent.
pub trait LockStore: Send + Sync + 'static {
    /// Store `value` under `key` with expiry `ttl`, only if no unexpired value exists.
    ///
    /// Returns `Ok(true)` when the value was written, `Ok(false)` when the key
    /// is already held.
    ///
    /// # Errors
    ///
    /// Returns [`LockStoreError::Unavailable`] if the store cannot be reached.
    fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Read the unexpired value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`LockStoreError::Unavailable`] if the store cannot be reached.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Delete `key` only if its current value equals `expected`.
    ///
    /// Returns `Ok(true)` when the key was deleted, `Ok(false)` when it was
    /// absent or held by a different value.
    ///
    /// # Errors
    ///
    /// Returns [`LockStoreError::Unavailable`] if the store cannot be reached.
    fn delete_if_equals(
        &self,
        key: &str,
        expected: &str,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Key for the lock on one seat of one showtime.
///
/// Format: `lock:showtime:<showtime id>:seat:<seat id>`
#[must_use]
pub fn seat_lock_key(showtime_id: ShowtimeId, seat_id: SeatId) -> String {
    format!("lock:showtime:{showtime_id}:seat:{seat_id}")
}

/// Key for the record describing a hold.
///
/// Format: `hold:<hold id>`
#[must_use]
pub fn hold_record_key(hold_id: HoldId) -> String {
    format!("hold:{hold_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_seat_lock_key_format() {
        let showtime = ShowtimeId::from_uuid(Uuid::nil());
        let seat = SeatId::from_uuid(Uuid::nil());
        assert_eq!(
            seat_lock_key(showtime, seat),
            "lock:showtime:00000000-0000-0000-0000-000000000000:seat:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_hold_record_key_format() {
        let hold = HoldId::from_uuid(Uuid::nil());
        assert_eq!(hold_record_key(hold), "hold:00000000-0000-0000-0000-000000000000");
    }
}
