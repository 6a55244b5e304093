//! Background expiry sweeper.

use crate::orchestrator::BookingOrchestrator;
use boxoffice_core::inventory::InventoryLedger;
use boxoffice_core::lock_store::LockStore;
use boxoffice_core::notification::Notifier;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Run [`BookingOrchestrator::expire_sweep`] every `interval` until `shutdown`
/// fires.
///
/// The first pass runs immediately. A failed pass is logged and retried on the
/// next tick. A pass in progress when `shutdown` fires is finished first.
pub fn spawn_expiry_sweeper<L, I, N>(
    orchestrator: Arc<BookingOrchestrator<L, I, N>>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    L: LockStore,
    I: InventoryLedger,
    N: Notifier,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = interval.as_secs(), "Expiry sweeper started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::info!("Expiry sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = orchestrator.expire_sweep().await {
                        tracing::warn!(error = %e, kind = e.kind(), "Expiry sweep failed");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::orchestrator::{BookingSettings, ConfirmOutcome, HoldOutcome, HoldRequest};
    use boxoffice_core::environment::Clock;
    use boxoffice_core::types::{BookingStatus, PaymentMethod};
    use boxoffice_runtime::{CircuitBreakerRegistry, WorkerPool, WorkerPoolConfig};
    use boxoffice_testing::fixtures::ShowtimeFixture;
    use boxoffice_testing::{
        InMemoryInventoryLedger, InMemoryLockStore, ManualClock, RecordingNotifier, test_clock,
    };

    #[tokio::test]
    async fn test_sweeper_expires_and_stops() {
        let clock = ManualClock::new(test_clock().now());
        let fixture = ShowtimeFixture::new(clock.now()).rows(&["A"], 2).build();
        let ledger = InMemoryInventoryLedger::new();
        ledger.insert_fixture(&fixture);
        let orchestrator = Arc::new(BookingOrchestrator::new(
            Arc::new(InMemoryLockStore::new()),
            Arc::new(ledger.clone()),
            Arc::new(RecordingNotifier::new()),
            Arc::new(WorkerPool::start(WorkerPoolConfig::default())),
            &CircuitBreakerRegistry::new(),
            Arc::new(clock.clone()),
            BookingSettings::default(),
        ));

        let HoldOutcome::Held(hold) = orchestrator
            .hold(HoldRequest::new(fixture.showtime.id, fixture.seat_ids(&["A1"])))
            .await
            .unwrap()
        else {
            unreachable!("seat is free");
        };
        let ConfirmOutcome::Confirmed(booking) = orchestrator
            .confirm(hold.hold_id, PaymentMethod::Cash)
            .await
            .unwrap()
        else {
            unreachable!("hold is live");
        };
        clock.advance(chrono::Duration::minutes(16));

        let shutdown = CancellationToken::new();
        let handle = spawn_expiry_sweeper(
            Arc::clone(&orchestrator),
            Duration::from_millis(10),
            shutdown.clone(),
        );

        tokio::time::timeout(Duration::from_secs(5), async {
            while ledger.available_seats(fixture.showtime.id) != Some(2) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        shutdown.cancel();
        handle.await.unwrap();

        let bookings = ledger.bookings_for(fixture.showtime.id);
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].id, booking.id);
        assert_eq!(bookings[0].status, BookingStatus::Expired);
    }
}
