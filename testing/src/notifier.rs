//! Notifier that records deliveries instead of sending them.

use boxoffice_core::notification::{Notification, NotificationError, Notifier};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;

/// Captures every delivered notification.
///
/// Clones share the same log, so a test can keep a handle while the
/// orchestrator's worker pool owns another.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    delivered: Arc<Mutex<Vec<Notification>>>,
    failing: Arc<AtomicBool>,
    panicking: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl RecordingNotifier {
    /// Create an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every delivery with [`NotificationError::DeliveryFailed`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Panic inside every delivery, exercising the pool's panic isolation.
    pub fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    /// Notifications delivered so far.
    #[must_use]
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait until at least `count` notifications have been delivered.
    pub async fn wait_for(&self, count: usize) -> Vec<Notification> {
        loop {
            let notified = self.notify.notified();
            let delivered = self.delivered();
            if delivered.len() >= count {
                return delivered;
            }
            notified.await;
        }
    }
}

impl Notifier for RecordingNotifier {
    #[allow(clippy::panic)] // Intentional panic for testing panic isolation
    async fn deliver(&self, notification: Notification) -> Result<(), NotificationError> {
        if self.panicking.load(Ordering::SeqCst) {
            panic!("recording notifier configured to panic");
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::DeliveryFailed(
                "recording notifier configured to fail".to_string(),
            ));
        }
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        self.notify.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email() -> Notification {
        Notification::Email {
            recipients: vec!["guest@example.com".to_string()],
            subject: "Booking confirmed".to_string(),
            body: "See you at the movies".to_string(),
        }
    }

    #[tokio::test]
    async fn test_records_deliveries() {
        let notifier = RecordingNotifier::new();
        notifier.deliver(email()).await.unwrap();

        assert_eq!(notifier.delivered(), vec![email()]);
    }

    #[tokio::test]
    async fn test_failing_mode_rejects() {
        let notifier = RecordingNotifier::new();
        notifier.set_failing(true);

        assert!(notifier.deliver(email()).await.is_err());
        assert!(notifier.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_wakes_on_delivery() {
        let notifier = RecordingNotifier::new();
        let handle = notifier.clone();
        tokio::spawn(async move { handle.deliver(email()).await });

        let delivered = notifier.wait_for(1).await;
        assert_eq!(delivered.len(), 1);
    }
}
