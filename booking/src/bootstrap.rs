//! Process wiring.
//!
//! [`Services::from_config`] connects the lock store and the inventory ledger,
//! runs migrations, builds the breaker registry and the notification executor,
//! and starts the background tasks (expiry sweeper, job result logger).
//! [`Services::shutdown`] stops them in reverse order.

use crate::config::Config;
use crate::notifications::LogNotifier;
use crate::orchestrator::BookingOrchestrator;
use crate::sweeper::spawn_expiry_sweeper;
use boxoffice_core::environment::SystemClock;
use boxoffice_core::inventory::LedgerError;
use boxoffice_core::lock_store::LockStoreError;
use boxoffice_postgres::PostgresInventoryLedger;
use boxoffice_redis::RedisLockStore;
use boxoffice_runtime::{CircuitBreakerRegistry, JobOutcome, JobResults, WorkerPool};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Orchestrator over the production adapters.
pub type ServerOrchestrator =
    BookingOrchestrator<RedisLockStore, PostgresInventoryLedger, LogNotifier>;

/// Startup failures.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Redis unreachable
    #[error("lock store: {0}")]
    LockStore(#[from] LockStoreError),

    /// Postgres unreachable or migrations failed
    #[error("inventory ledger: {0}")]
    Ledger(#[from] LedgerError),
}

/// Everything the server process runs.
pub struct Services {
    /// The booking orchestrator
    pub orchestrator: Arc<ServerOrchestrator>,
    /// Inventory ledger, for seeding and health checks
    pub ledger: Arc<PostgresInventoryLedger>,
    /// Lock store, for health checks
    pub lock_store: Arc<RedisLockStore>,
    /// Breakers shared with the orchestrator
    pub breakers: CircuitBreakerRegistry,
    /// Notification executor
    pub executor: Arc<WorkerPool>,
    shutdown: CancellationToken,
    sweeper: JoinHandle<()>,
    result_logger: JoinHandle<()>,
}

impl Services {
    /// Connect every dependency and start the background tasks.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError`] if Redis or `PostgreSQL` cannot be reached
    /// or a migration fails.
    pub async fn from_config(config: &Config) -> Result<Self, BootstrapError> {
        info!("Connecting to lock store...");
        let lock_store = Arc::new(RedisLockStore::new(&config.redis.url).await?);
        lock_store.ping().await?;

        info!("Connecting to inventory database...");
        let ledger = Arc::new(
            PostgresInventoryLedger::connect(&config.postgres.url, &config.pool_settings()).await?,
        );
        info!("Running inventory migrations...");
        ledger.migrate().await?;

        let breakers = config.breaker_registry();
        let executor = Arc::new(WorkerPool::start(config.worker_pool_config()));
        let result_logger = spawn_result_logger(executor.results());

        let orchestrator = Arc::new(BookingOrchestrator::new(
            Arc::clone(&lock_store),
            Arc::clone(&ledger),
            Arc::new(LogNotifier),
            Arc::clone(&executor),
            &breakers,
            Arc::new(SystemClock),
            config.booking_settings(),
        ));

        let shutdown = CancellationToken::new();
        let sweeper = spawn_expiry_sweeper(
            Arc::clone(&orchestrator),
            config.sweep_interval(),
            shutdown.clone(),
        );

        info!(
            hold_ttl_secs = config.booking.hold_ttl,
            payment_window_secs = config.booking.payment_window,
            workers = config.executor.workers,
            "Services ready"
        );
        Ok(Self {
            orchestrator,
            ledger,
            lock_store,
            breakers,
            executor,
            shutdown,
            sweeper,
            result_logger,
        })
    }

    /// Stop the sweeper, drain the executor, and log final breaker states.
    pub async fn shutdown(self, timeout: Duration) {
        info!("Stopping expiry sweeper...");
        self.shutdown.cancel();
        if let Err(e) = self.sweeper.await {
            tracing::error!(error = %e, "Expiry sweeper task failed");
        }

        info!("Draining notification executor...");
        if let Err(e) = self.executor.stop(timeout).await {
            tracing::warn!(error = %e, "Executor did not stop cleanly");
        }
        if tokio::time::timeout(timeout, self.result_logger).await.is_err() {
            tracing::warn!("Job result logger still running at shutdown");
        }

        for (name, state) in self.breakers.states() {
            info!(breaker = %name, state = ?state, "Circuit breaker state at shutdown");
        }
        let stats = self.executor.stats();
        info!(stats = ?stats, "Shutdown complete");
    }
}

/// Log failed and panicked background jobs until the executor stops.
fn spawn_result_logger(results: JobResults) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(result) = results.recv().await {
            match &result.outcome {
                JobOutcome::Succeeded => {
                    tracing::debug!(job = %result.name, duration = ?result.duration, "Job finished");
                }
                JobOutcome::Failed(error) => {
                    tracing::warn!(job = %result.name, error = %error, "Job failed");
                }
                JobOutcome::Panicked(message) => {
                    tracing::error!(job = %result.name, panic = %message, "Job panicked");
                }
            }
        }
    })
}
