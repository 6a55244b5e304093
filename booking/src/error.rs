//! Error types for booking operations.
//!
//! Only failures live here. Contention, insufficient inventory, and expired
//! holds are ordinary outcomes returned as values by the orchestrator.

use boxoffice_core::inventory::LedgerError;
use boxoffice_core::lock_store::LockStoreError;
use boxoffice_runtime::CircuitBreakerError;
use thiserror::Error;

/// Errors from the seat lock manager and the booking orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// The request failed validation; nothing was locked or written.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The lock store failed.
    #[error("Lock store error: {0}")]
    LockStore(#[from] LockStoreError),

    /// The inventory ledger failed.
    #[error("Inventory ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The circuit breaker for a dependency rejected the call.
    #[error("Circuit breaker open for {0}")]
    CircuitOpen(String),
}

impl BookingError {
    /// Map a breaker-wrapped dependency error.
    pub(crate) fn from_breaker<E>(dependency: &str, error: CircuitBreakerError<E>) -> Self
    where
        E: Into<Self>,
    {
        match error {
            CircuitBreakerError::Open => Self::CircuitOpen(dependency.to_string()),
            CircuitBreakerError::Inner(e) => e.into(),
        }
    }

    /// Whether the same call may succeed if retried later.
    ///
    /// True for dependency failures and open circuits, false for invalid
    /// requests and corrupt data.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidRequest(_)
            | Self::LockStore(LockStoreError::Serialization(_))
            | Self::Ledger(LedgerError::CorruptRow(_)) => false,
            Self::LockStore(LockStoreError::Unavailable(_))
            | Self::Ledger(LedgerError::Database(_) | LedgerError::Timeout(_))
            | Self::CircuitOpen(_) => true,
        }
    }

    /// Short label for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::LockStore(_) => "lock_store",
            Self::Ledger(_) => "ledger",
            Self::CircuitOpen(_) => "circuit_open",
        }
    }
}

/// Result type alias for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;
