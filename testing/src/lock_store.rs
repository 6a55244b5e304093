//! In-memory [`LockStore`] for fast, deterministic testing.
//!
//! Each operation runs under a single mutex, which gives the same atomicity
//! the Redis adapter gets from `SET NX PX` and its check-and-delete script.
//! Expiry is evaluated lazily against an internal clock that tests can move
//! forward with [`InMemoryLockStore::advance`].

use boxoffice_core::lock_store::{LockStore, LockStoreError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    skew: Duration,
}

impl State {
    fn now(&self) -> Instant {
        Instant::now() + self.skew
    }

    fn live(&mut self, key: &str) -> Option<&Entry> {
        let now = self.now();
        if self.entries.get(key).is_some_and(|e| e.expires_at <= now) {
            self.entries.remove(key);
        }
        self.entries.get(key)
    }
}

/// Mutex-protected map with per-key expiry.
///
/// Clones share the same data.
///
/// # Example
///
/// ```
/// use boxoffice_core::lock_store::LockStore;
/// use boxoffice_testing::InMemoryLockStore;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryLockStore::new();
/// assert!(store.set_if_absent("k", "a", Duration::from_secs(60)).await?);
/// assert!(!store.set_if_absent("k", "b", Duration::from_secs(60)).await?);
///
/// store.advance(Duration::from_secs(61));
/// assert_eq!(store.get("k").await?, None);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryLockStore {
    state: Arc<Mutex<State>>,
    unavailable: Arc<AtomicBool>,
    fail_next: Arc<AtomicU32>,
}

impl InMemoryLockStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the store's clock forward, expiring keys whose TTL elapses.
    pub fn advance(&self, by: Duration) {
        self.state().skew += by;
    }

    /// Make every call fail with [`LockStoreError::Unavailable`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next `count` calls with [`LockStoreError::Unavailable`].
    pub fn fail_next(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Number of unexpired keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut state = self.state();
        let now = state.now();
        state.entries.retain(|_, e| e.expires_at > now);
        state.entries.len()
    }

    /// Whether no unexpired keys remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unexpired keys starting with `prefix`.
    #[must_use]
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let state = self.state();
        let now = state.now();
        let mut keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.expires_at > now)
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LockStoreError::Unavailable(
                "in-memory lock store marked unavailable".to_string(),
            ));
        }
        let consumed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            return Err(LockStoreError::Unavailable(
                "injected lock store failure".to_string(),
            ));
        }
        Ok(())
    }
}

impl LockStore for InMemoryLockStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        self.check_available()?;
        let mut state = self.state();
        if state.live(key).is_some() {
            return Ok(false);
        }
        let expires_at = state.now() + ttl;
        state.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self.state().live(key).map(|e| e.value.clone()))
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool> {
        self.check_available()?;
        let mut state = self.state();
        if state.live(key).is_some_and(|e| e.value == expected) {
            state.entries.remove(key);
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_set_if_absent_single_writer() {
        let store = InMemoryLockStore::new();

        assert!(store.set_if_absent("seat", "a", TTL).await.unwrap());
        assert!(!store.set_if_absent("seat", "b", TTL).await.unwrap());
        assert_eq!(store.get("seat").await.unwrap(), Some("a".to_string()));
    }

    #[tokio::test]
    async fn test_delete_only_by_owner() {
        let store = InMemoryLockStore::new();
        store.set_if_absent("seat", "a", TTL).await.unwrap();

        assert!(!store.delete_if_equals("seat", "b").await.unwrap());
        assert_eq!(store.get("seat").await.unwrap(), Some("a".to_string()));
        assert!(store.delete_if_equals("seat", "a").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_expired_key_can_be_reacquired() {
        let store = InMemoryLockStore::new();
        store.set_if_absent("seat", "a", TTL).await.unwrap();

        store.advance(TTL);

        assert_eq!(store.get("seat").await.unwrap(), None);
        assert!(store.set_if_absent("seat", "b", TTL).await.unwrap());
        assert!(!store.delete_if_equals("seat", "a").await.unwrap());
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = InMemoryLockStore::new();
        store.fail_next(1);

        assert!(matches!(
            store.set_if_absent("seat", "a", TTL).await,
            Err(LockStoreError::Unavailable(_))
        ));
        assert!(store.set_if_absent("seat", "a", TTL).await.unwrap());

        store.set_unavailable(true);
        assert!(store.get("seat").await.is_err());
        store.set_unavailable(false);
        assert!(store.get("seat").await.unwrap().is_some());
    }

    #[test]
    fn test_keys_with_prefix_sorted() {
        let store = InMemoryLockStore::new();
        tokio_test::block_on(async {
            store.set_if_absent("lock:b", "x", TTL).await.unwrap();
            store.set_if_absent("lock:a", "x", TTL).await.unwrap();
            store.set_if_absent("hold:a", "x", TTL).await.unwrap();
        });

        assert_eq!(store.keys_with_prefix("lock:"), vec!["lock:a", "lock:b"]);
    }
}
