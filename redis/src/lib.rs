//! Redis-based lock store implementation.
//!
//! Implements [`LockStore`] on top of three Redis primitives:
//!
//! - `set_if_absent` → `SET key value NX PX <ttl ms>`
//! - `get` → `GET key`
//! - `delete_if_equals` → a Lua script that deletes the key only when its
//!   value matches, evaluated atomically by the server
//!
//! Every command goes through a [`ConnectionManager`], which multiplexes one
//! connection and reconnects transparently after network errors.
//!
//! # Example
//!
//! ```no_run
//! use boxoffice_redis::RedisLockStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisLockStore::new("redis://127.0.0.1:6379").await?;
//! # Ok(())
//! # }
//! ```

use boxoffice_core::lock_store::{LockStore, LockStoreError, Result};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use std::time::Duration;

/// Deletes `KEYS[1]` only while it still holds `ARGV[1]`.
const DELETE_IF_EQUALS: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end
";

/// Redis-backed [`LockStore`].
#[derive(Clone)]
pub struct RedisLockStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
    delete_script: Script,
}

impl RedisLockStore {
    /// Create a new Redis lock store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            LockStoreError::Unavailable(format!("Failed to create Redis client: {e}"))
        })?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            LockStoreError::Unavailable(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self::from_connection_manager(conn_manager))
    }

    /// Wrap an existing connection manager.
    #[must_use]
    pub fn from_connection_manager(conn_manager: ConnectionManager) -> Self {
        Self {
            conn_manager,
            delete_script: Script::new(DELETE_IF_EQUALS),
        }
    }

    /// Check that the server answers.
    ///
    /// # Errors
    ///
    /// Returns [`LockStoreError::Unavailable`] if `PING` fails.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| LockStoreError::Unavailable(format!("Redis ping failed: {e}")))?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisLockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLockStore").finish_non_exhaustive()
    }
}

/// TTL in whole milliseconds, at least 1 (Redis rejects `PX 0`).
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

impl LockStore for RedisLockStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let ttl_ms = ttl_millis(ttl);

        // SET NX replies OK when written and nil when the key exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| LockStoreError::Unavailable(format!("Failed to SET NX {key}: {e}")))?;

        let acquired = reply.is_some();
        tracing::trace!(key, ttl_ms, acquired, "SET NX");
        Ok(acquired)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn_manager.clone();

        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| LockStoreError::Unavailable(format!("Failed to GET {key}: {e}")))
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool> {
        let mut conn = self.conn_manager.clone();

        let deleted: i64 = self
            .delete_script
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                LockStoreError::Unavailable(format!("Failed to delete {key} if owned: {e}"))
            })?;

        tracing::trace!(key, deleted, "Check-and-delete");
        Ok(deleted == 1)
    }
}
