//! Circuit breaker guarding calls to one external dependency.
//!
//! A circuit breaker monitors calls into one dependency and "opens" (stops
//! admitting calls) when failures exceed a threshold.
//!
//! # States
//!
//! - **Closed**: Normal operation. Calls pass through. A run of
//!   `max_failures` consecutive failures trips the breaker; any success resets
//!   the run.
//! - **Open**: Calls are rejected without invoking the operation until
//!   `open_timeout` has elapsed since the breaker opened.
//! - **`HalfOpen`**: Up to `max_half_open_calls` trial calls are admitted. A
//!   single failure reopens; `max_half_open_calls` successes close.
//!
//! Admission is synchronous: the breaker never awaits anything of its own,
//! it either passes the call through or rejects it immediately.
//!
//! # Example
//!
//! ```rust
//! use boxoffice_runtime::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let config = CircuitBreakerConfig::builder()
//!     .max_failures(5)
//!     .open_timeout(Duration::from_secs(30))
//!     .max_half_open_calls(1)
//!     .build();
//!
//! let breaker = CircuitBreaker::new("inventory", config);
//!
//! match breaker.call(|| async { Ok::<_, String>(42) }).await {
//!     Ok(result) => println!("Success: {result}"),
//!     Err(e) => println!("Failed: {e}"),
//! }
//! # }
//! ```

use crate::metrics::CircuitBreakerMetrics;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;

/// Circuit breaker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in `Closed` before opening the circuit
    pub max_failures: u32,
    /// Duration to wait in `Open` before admitting a trial call
    pub open_timeout: Duration,
    /// Trial calls admitted in `HalfOpen`; that many successes close the circuit
    pub max_half_open_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            open_timeout: Duration::from_secs(30),
            max_half_open_calls: 1,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub const fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder {
            max_failures: None,
            open_timeout: None,
            max_half_open_calls: None,
        }
    }
}

/// Builder for [`CircuitBreakerConfig`].
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfigBuilder {
    max_failures: Option<u32>,
    open_timeout: Option<Duration>,
    max_half_open_calls: Option<u32>,
}

impl CircuitBreakerConfigBuilder {
    /// Set the failure threshold.
    ///
    /// Circuit opens after this many consecutive failures. Clamped to at least 1.
    #[must_use]
    pub const fn max_failures(mut self, threshold: u32) -> Self {
        self.max_failures = Some(threshold);
        self
    }

    /// Set how long to stay `Open` before trying `HalfOpen`.
    #[must_use]
    pub const fn open_timeout(mut self, duration: Duration) -> Self {
        self.open_timeout = Some(duration);
        self
    }

    /// Set the number of trial calls admitted in `HalfOpen`. Clamped to at least 1.
    #[must_use]
    pub const fn max_half_open_calls(mut self, calls: u32) -> Self {
        self.max_half_open_calls = Some(calls);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> CircuitBreakerConfig {
        let defaults = CircuitBreakerConfig::default();
        CircuitBreakerConfig {
            max_failures: self.max_failures.unwrap_or(defaults.max_failures).max(1),
            open_timeout: self.open_timeout.unwrap_or(defaults.open_timeout),
            max_half_open_calls: self
                .max_half_open_calls
                .unwrap_or(defaults.max_half_open_calls)
                .max(1),
        }
    }
}

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Circuit is closed, requests pass through normally
    Closed,
    /// Circuit is open, requests fail immediately
    Open,
    /// Circuit is half-open, testing if the dependency recovered
    HalfOpen,
}

impl State {
    /// Label used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }

    /// Gauge value exported to Prometheus.
    #[must_use]
    pub const fn gauge_value(&self) -> f64 {
        match self {
            Self::Closed => 0.0,
            Self::HalfOpen => 1.0,
            Self::Open => 2.0,
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from circuit breaker operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, request rejected without calling the operation
    #[error("Circuit breaker is open")]
    Open,
    /// Operation failed
    #[error("Operation failed: {0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Map the wrapped operation error.
    pub fn map_inner<F, E2>(self, f: F) -> CircuitBreakerError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::Open => CircuitBreakerError::Open,
            Self::Inner(e) => CircuitBreakerError::Inner(f(e)),
        }
    }
}

/// Internal state of the circuit breaker.
#[derive(Debug)]
struct Inner {
    state: State,
    consecutive_failures: u32,
    half_open_admitted: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
    /// Bumped on every transition; outcomes from an older generation are ignored.
    generation: u64,
}

impl Inner {
    const fn new() -> Self {
        Self {
            state: State::Closed,
            consecutive_failures: 0,
            half_open_admitted: 0,
            half_open_successes: 0,
            opened_at: None,
            generation: 0,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    calls: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    rejections: AtomicU64,
}

#[derive(Debug)]
struct Shared {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<State>,
    counters: Counters,
}

/// Circuit breaker for one protected dependency.
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

/// Ticket for one admitted call.
///
/// Dropping it without reporting an outcome (the caller's future was
/// cancelled) hands a `HalfOpen` trial slot back.
struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    half_open: bool,
    settled: bool,
}

impl Admission<'_> {
    fn settle(mut self, success: bool) {
        self.settled = true;
        self.breaker.on_outcome(self.generation, success);
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.settled && self.half_open {
            self.breaker.return_half_open_slot(self.generation);
        }
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker named after the dependency it protects.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        let (state_tx, _) = watch::channel(State::Closed);
        CircuitBreakerMetrics::record_state(&name, State::Closed.gauge_value());
        Self {
            shared: Arc::new(Shared {
                name,
                config,
                inner: Mutex::new(Inner::new()),
                state_tx,
                counters: Counters::default(),
            }),
        }
    }

    /// Name of the protected dependency.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.shared.config
    }

    /// Current state.
    ///
    /// An `Open` breaker whose timeout has elapsed still reports `Open` until
    /// the next call moves it to `HalfOpen`.
    #[must_use]
    pub fn state(&self) -> State {
        self.lock().state
    }

    /// Subscribe to state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<State> {
        self.shared.state_tx.subscribe()
    }

    /// Call an operation through the circuit breaker.
    ///
    /// # Errors
    ///
    /// Returns `CircuitBreakerError::Open` if the circuit rejects the call; the
    /// operation is not invoked.
    /// Returns `CircuitBreakerError::Inner` if the operation fails.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.shared.counters.calls.fetch_add(1, Ordering::Relaxed);
        CircuitBreakerMetrics::record_call(&self.shared.name);

        let Some(admission) = self.try_admit() else {
            self.shared.counters.rejections.fetch_add(1, Ordering::Relaxed);
            CircuitBreakerMetrics::record_rejection(&self.shared.name);
            tracing::debug!(breaker = %self.shared.name, "Circuit breaker is OPEN, rejecting call");
            return Err(CircuitBreakerError::Open);
        };

        match operation().await {
            Ok(result) => {
                admission.settle(true);
                self.shared.counters.successes.fetch_add(1, Ordering::Relaxed);
                CircuitBreakerMetrics::record_success(&self.shared.name);
                Ok(result)
            }
            Err(err) => {
                admission.settle(false);
                self.shared.counters.failures.fetch_add(1, Ordering::Relaxed);
                CircuitBreakerMetrics::record_failure(&self.shared.name);
                Err(CircuitBreakerError::Inner(err))
            }
        }
    }

    /// Decide whether a call may proceed.
    fn try_admit(&self) -> Option<Admission<'_>> {
        let mut inner = self.lock();

        match inner.state {
            State::Closed => Some(Admission {
                breaker: self,
                generation: inner.generation,
                half_open: false,
                settled: false,
            }),
            State::Open => {
                let elapsed = inner
                    .opened_at
                    .is_some_and(|opened| opened.elapsed() >= self.shared.config.open_timeout);
                if !elapsed {
                    return None;
                }
                self.transition(&mut inner, State::HalfOpen);
                inner.half_open_admitted = 1;
                Some(Admission {
                    breaker: self,
                    generation: inner.generation,
                    half_open: true,
                    settled: false,
                })
            }
            State::HalfOpen => {
                if inner.half_open_admitted >= self.shared.config.max_half_open_calls {
                    return None;
                }
                inner.half_open_admitted += 1;
                Some(Admission {
                    breaker: self,
                    generation: inner.generation,
                    half_open: true,
                    settled: false,
                })
            }
        }
    }

    fn on_outcome(&self, generation: u64, success: bool) {
        let mut inner = self.lock();

        // Admitted under a state that no longer exists
        if inner.generation != generation {
            return;
        }

        match (inner.state, success) {
            (State::Closed, true) => {
                inner.consecutive_failures = 0;
            }
            (State::Closed, false) => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.shared.config.max_failures {
                    tracing::warn!(
                        breaker = %self.shared.name,
                        failures = inner.consecutive_failures,
                        threshold = self.shared.config.max_failures,
                        "Circuit breaker transitioning CLOSED -> OPEN"
                    );
                    self.open(&mut inner);
                }
            }
            (State::HalfOpen, true) => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.shared.config.max_half_open_calls {
                    tracing::info!(
                        breaker = %self.shared.name,
                        successes = inner.half_open_successes,
                        "Circuit breaker transitioning HALF_OPEN -> CLOSED"
                    );
                    self.transition(&mut inner, State::Closed);
                }
            }
            (State::HalfOpen, false) => {
                tracing::warn!(
                    breaker = %self.shared.name,
                    "Circuit breaker transitioning HALF_OPEN -> OPEN (recovery failed)"
                );
                self.open(&mut inner);
            }
            // Open admits nothing, so no outcome can share its generation
            (State::Open, _) => {}
        }
    }

    fn return_half_open_slot(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation && inner.state == State::HalfOpen {
            inner.half_open_admitted = inner.half_open_admitted.saturating_sub(1);
        }
    }

    fn open(&self, inner: &mut Inner) {
        self.transition(inner, State::Open);
        inner.opened_at = Some(Instant::now());
    }

    /// Move to `to`, resetting every counter and bumping the generation.
    fn transition(&self, inner: &mut Inner, to: State) {
        let from = inner.state;
        inner.state = to;
        inner.generation = inner.generation.wrapping_add(1);
        inner.consecutive_failures = 0;
        inner.half_open_admitted = 0;
        inner.half_open_successes = 0;
        if to != State::Open {
            inner.opened_at = None;
        }

        if from == State::Open && to == State::HalfOpen {
            tracing::info!(breaker = %self.shared.name, "Circuit breaker transitioning OPEN -> HALF_OPEN");
        }
        CircuitBreakerMetrics::record_state(&self.shared.name, to.gauge_value());
        self.shared.state_tx.send_replace(to);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The guarded section never panics mid-update, so a poisoned lock still holds valid state
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Get circuit breaker call counters.
    #[must_use]
    pub fn metrics(&self) -> CircuitBreakerStats {
        let counters = &self.shared.counters;
        CircuitBreakerStats {
            total_calls: counters.calls.load(Ordering::Relaxed),
            total_successes: counters.successes.load(Ordering::Relaxed),
            total_failures: counters.failures.load(Ordering::Relaxed),
            total_rejections: counters.rejections.load(Ordering::Relaxed),
        }
    }

    /// Force the breaker closed and clear its failure count.
    ///
    /// Useful for tests or manual intervention.
    pub fn reset(&self) {
        let mut inner = self.lock();
        tracing::info!(breaker = %self.shared.name, "Circuit breaker manually reset to CLOSED");
        self.transition(&mut inner, State::Closed);
    }
}

/// Call counters for circuit breaker monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerStats {
    /// Calls offered, admitted or not
    pub total_calls: u64,
    /// Admitted calls that succeeded
    pub total_successes: u64,
    /// Admitted calls that failed
    pub total_failures: u64,
    /// Calls refused while open
    pub total_rejections: u64,
}

impl CircuitBreakerStats {
    /// Share of calls that succeeded, 0.0 to 1.0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 1.0;
        }
        self.total_successes as f64 / self.total_calls as f64
    }

    /// Share of calls refused while open, 0.0 to 1.0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rejection_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.total_rejections as f64 / self.total_calls as f64
    }
}

/// One breaker per protected dependency, keyed by name.
///
/// Built once at process start and passed to whoever needs a breaker.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerRegistry {
    breakers: BTreeMap<String, CircuitBreaker>,
}

impl CircuitBreakerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a breaker for `name`. Replaces any breaker already registered under it.
    #[must_use]
    pub fn with_breaker(mut self, name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        self.breakers
            .insert(name.clone(), CircuitBreaker::new(name, config));
        self
    }

    /// Breaker for `name`, if registered.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CircuitBreaker> {
        self.breakers.get(name)
    }

    /// Breaker for `name`, or a default-configured one if none was registered.
    #[must_use]
    pub fn get_or_default(&self, name: &str) -> CircuitBreaker {
        self.breakers.get(name).cloned().unwrap_or_else(|| {
            tracing::warn!(breaker = name, "No circuit breaker registered, using defaults");
            CircuitBreaker::new(name, CircuitBreakerConfig::default())
        })
    }

    /// Current state of every registered breaker, sorted by name.
    #[must_use]
    pub fn states(&self) -> Vec<(String, State)> {
        self.breakers
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.state()))
            .collect()
    }

    /// Reset every registered breaker to `Closed`.
    pub fn reset_all(&self) {
        for breaker in self.breakers.values() {
            breaker.reset();
        }
    }
}
