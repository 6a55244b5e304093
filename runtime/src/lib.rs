//! # Boxoffice Runtime
//!
//! Resilience and background-execution building blocks shared by the
//! reservation services.
//!
//! ## Core Components
//!
//! - **Circuit Breaker**: per-dependency admission control
//!   ([`circuit_breaker::CircuitBreaker`]) and the registry that holds one
//!   breaker per protected dependency
//! - **Worker Pool**: bounded queue drained by a fixed set of workers, with
//!   panic isolation and a soft stop ([`worker_pool::WorkerPool`])
//! - **Metrics**: Prometheus exporter and per-component recorders
//!
//! ## Example
//!
//! ```rust
//! use boxoffice_runtime::{CircuitBreakerConfig, CircuitBreakerRegistry, Job, WorkerPool, WorkerPoolConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let breakers = CircuitBreakerRegistry::new()
//!     .with_breaker("inventory", CircuitBreakerConfig::default());
//! let pool = WorkerPool::start(WorkerPoolConfig::default());
//!
//! if let Some(breaker) = breakers.get("inventory") {
//!     let seats = breaker.call(|| async { Ok::<_, String>(42) }).await?;
//!     pool.submit(Job::new("notify", async move {
//!         println!("booked {seats}");
//!         Ok::<_, String>(())
//!     }));
//! }
//!
//! pool.stop(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

/// Circuit breaker pattern for preventing cascading failures
pub mod circuit_breaker;

/// Prometheus metrics for observability
pub mod metrics;

/// Bounded worker pool for background side effects
pub mod worker_pool;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerRegistry, State,
};
pub use worker_pool::{
    Job, JobOutcome, JobResult, JobResults, PoolError, PoolStats, SubmitError, WorkerPool,
    WorkerPoolConfig,
};
