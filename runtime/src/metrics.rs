//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for every reservation component:
//! - Seat lock acquisition and release
//! - Booking lifecycle (holds, confirmations, cancellations, expiries)
//! - Circuit breaker state per protected dependency
//! - Worker pool queueing and job outcomes
//!
//! # Example
//!
//! ```rust,no_run
//! use boxoffice_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other crates
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the Prometheus recorder and spawn its HTTP listener.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or its address cannot be bound.
    ///
    /// # Note
    ///
    /// If a metrics recorder is already installed (e.g., in tests), this logs a
    /// warning and succeeds without a render handle or listener.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let (recorder, exporter) = builder
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;
        let handle = recorder.handle();

        // In tests, another server may already own the global recorder
        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
            return Ok(());
        }

        tokio::spawn(async move {
            if let Err(e) = exporter.await {
                tracing::error!(error = ?e, "Metrics exporter stopped");
            }
        });

        self.handle = Some(handle);
        tracing::info!(
            addr = %self.addr,
            "Metrics server started - available at http://{}/metrics",
            self.addr
        );
        Ok(())
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Seat lock metrics
    describe_counter!(
        "seat_lock_acquired_total",
        "Seat locks acquired (one per seat)"
    );
    describe_counter!(
        "seat_lock_contended_total",
        "Multi-seat holds denied because a seat was already locked"
    );
    describe_counter!(
        "seat_lock_compensations_total",
        "Partially acquired seat locks released after a denied hold"
    );
    describe_counter!(
        "seat_lock_released_total",
        "Seat locks released by their owner"
    );

    // Booking metrics
    describe_counter!("booking_holds_total", "Hold attempts by outcome");
    describe_counter!("booking_confirms_total", "Confirm attempts by outcome");
    describe_counter!("booking_cancellations_total", "Bookings cancelled");
    describe_counter!("booking_expirations_total", "Bookings expired by the sweeper");
    describe_counter!("booking_payments_total", "Payment signals by outcome");
    describe_counter!(
        "booking_seats_confirmed_total",
        "Seats durably booked at confirmation"
    );
    describe_histogram!(
        "booking_confirm_duration_seconds",
        "Time taken to confirm a hold"
    );

    // Circuit breaker metrics
    describe_gauge!(
        "circuit_breaker_state",
        "Breaker state per dependency (0=closed, 1=half-open, 2=open)"
    );
    describe_counter!(
        "circuit_breaker_calls_total",
        "Calls admitted or rejected by a breaker"
    );
    describe_counter!(
        "circuit_breaker_successes_total",
        "Admitted calls that succeeded"
    );
    describe_counter!(
        "circuit_breaker_failures_total",
        "Admitted calls that failed"
    );
    describe_counter!(
        "circuit_breaker_rejections_total",
        "Calls refused without reaching the dependency"
    );

    // Worker pool metrics
    describe_counter!("worker_pool_jobs_submitted_total", "Jobs accepted into the queue");
    describe_counter!(
        "worker_pool_jobs_rejected_total",
        "Jobs refused because the queue was full or the pool stopped"
    );
    describe_counter!("worker_pool_jobs_completed_total", "Jobs finished by outcome");
    describe_counter!(
        "worker_pool_results_dropped_total",
        "Job results evicted from a full results buffer"
    );
    describe_histogram!(
        "worker_pool_job_duration_seconds",
        "Time taken to run a job"
    );
}

/// Seat lock metrics recorder.
pub struct SeatLockMetrics;

impl SeatLockMetrics {
    /// Record seats locked by a successful hold.
    pub fn record_acquired(seats: usize) {
        counter!("seat_lock_acquired_total").increment(seats as u64);
    }

    /// Record a hold denied by contention.
    pub fn record_contended() {
        counter!("seat_lock_contended_total").increment(1);
    }

    /// Record compensating releases after a denied hold.
    pub fn record_compensated(seats: usize) {
        counter!("seat_lock_compensations_total").increment(seats as u64);
    }

    /// Record seat locks released by their owner.
    pub fn record_released(seats: usize) {
        counter!("seat_lock_released_total").increment(seats as u64);
    }
}

/// Booking lifecycle metrics recorder.
pub struct BookingMetrics;

impl BookingMetrics {
    /// Record a hold attempt (`held`, `unavailable`, `error`).
    pub fn record_hold(outcome: &'static str) {
        counter!("booking_holds_total", "outcome" => outcome).increment(1);
    }

    /// Record a confirm attempt.
    ///
    /// `outcome` is one of `confirmed`, `insufficient_seats`,
    /// `seats_already_booked`, `hold_expired`, `error`.
    pub fn record_confirm(outcome: &'static str, duration: Duration) {
        counter!("booking_confirms_total", "outcome" => outcome).increment(1);
        histogram!("booking_confirm_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record seats durably booked.
    pub fn record_seats_confirmed(seats: u32) {
        counter!("booking_seats_confirmed_total").increment(u64::from(seats));
    }

    /// Record a cancellation.
    pub fn record_cancellation() {
        counter!("booking_cancellations_total").increment(1);
    }

    /// Record expired bookings.
    pub fn record_expirations(count: usize) {
        counter!("booking_expirations_total").increment(count as u64);
    }

    /// Record a payment completion signal (`paid`, `failed`, `rejected`).
    pub fn record_payment(outcome: &'static str) {
        counter!("booking_payments_total", "outcome" => outcome).increment(1);
    }
}

/// Per-dependency breaker metrics, labelled `breaker`.
pub struct CircuitBreakerMetrics;

impl CircuitBreakerMetrics {
    /// Publish the state gauge (see [`crate::State::gauge_value`]).
    pub fn record_state(breaker: &str, state: f64) {
        gauge!("circuit_breaker_state", "breaker" => breaker.to_string()).set(state);
    }

    /// Count a call offered to the breaker.
    pub fn record_call(breaker: &str) {
        counter!("circuit_breaker_calls_total", "breaker" => breaker.to_string()).increment(1);
    }

    /// Count an admitted call that succeeded.
    pub fn record_success(breaker: &str) {
        counter!("circuit_breaker_successes_total", "breaker" => breaker.to_string())
            .increment(1);
    }

    /// Count an admitted call that failed.
    pub fn record_failure(breaker: &str) {
        counter!("circuit_breaker_failures_total", "breaker" => breaker.to_string())
            .increment(1);
    }

    /// Count a call refused while open.
    pub fn record_rejection(breaker: &str) {
        counter!("circuit_breaker_rejections_total", "breaker" => breaker.to_string())
            .increment(1);
    }
}

/// Worker pool metrics recorder.
pub struct WorkerPoolMetrics;

impl WorkerPoolMetrics {
    /// Record a job accepted into the queue.
    pub fn record_submitted() {
        counter!("worker_pool_jobs_submitted_total").increment(1);
    }

    /// Record a job refused at submission.
    pub fn record_rejected() {
        counter!("worker_pool_jobs_rejected_total").increment(1);
    }

    /// Record a finished job (`succeeded`, `failed`, `panicked`).
    pub fn record_completed(outcome: &'static str, duration: Duration) {
        counter!("worker_pool_jobs_completed_total", "outcome" => outcome).increment(1);
        histogram!("worker_pool_job_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a result evicted from the results buffer.
    pub fn record_result_dropped() {
        counter!("worker_pool_results_dropped_total").increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
        assert!(server.render().is_none());
    }

    #[test]
    fn test_recorders_without_installed_recorder_are_noops() {
        // With no global recorder the macros discard values.
        SeatLockMetrics::record_acquired(3);
        BookingMetrics::record_confirm("confirmed", Duration::from_millis(5));
        CircuitBreakerMetrics::record_state("inventory", 2.0);
        WorkerPoolMetrics::record_completed("panicked", Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_metrics_server_render() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut server = MetricsServer::new(addr);
        server.start().unwrap();

        CircuitBreakerMetrics::record_state("lock_store", 0.0);
        CircuitBreakerMetrics::record_call("lock_store");
        BookingMetrics::record_hold("held");

        // If another test installed the recorder first, there is no handle.
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("circuit_breaker_state"));
            assert!(rendered.contains("booking_holds_total"));
        }
    }
}
