//! Notification payloads for booking events and the logging notifier.

use boxoffice_core::notification::{Notification, NotificationError, NotificationKind, Notifier};
use boxoffice_core::types::Booking;
use serde_json::json;

/// Booking events that trigger notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingEvent {
    /// Booking created PENDING at confirmation
    Created,
    /// Payment received
    Paid,
    /// Booking cancelled
    Cancelled,
    /// Payment window elapsed
    Expired,
}

impl BookingEvent {
    const fn kind(self) -> NotificationKind {
        match self {
            Self::Created => NotificationKind::BookingCreated,
            Self::Paid => NotificationKind::BookingConfirmed,
            Self::Cancelled => NotificationKind::BookingCancelled,
            Self::Expired => NotificationKind::BookingExpired,
        }
    }

    const fn title(self) -> &'static str {
        match self {
            Self::Created => "Booking received",
            Self::Paid => "Payment received",
            Self::Cancelled => "Booking cancelled",
            Self::Expired => "Booking expired",
        }
    }

    /// Label used in job names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    fn message(self, booking: &Booking) -> String {
        let seats = booking.num_tickets;
        match self {
            Self::Created => format!(
                "Booking {} for {seats} seat(s) is reserved. Pay {} before {} to keep it.",
                booking.code,
                booking.total,
                booking.expires_at.format("%Y-%m-%d %H:%M UTC")
            ),
            Self::Paid => format!(
                "Payment of {} received. Booking {} is confirmed.",
                booking.total, booking.code
            ),
            Self::Cancelled => format!(
                "Booking {} has been cancelled and its {seats} seat(s) released.",
                booking.code
            ),
            Self::Expired => format!(
                "Booking {} expired before payment and its {seats} seat(s) were released.",
                booking.code
            ),
        }
    }
}

/// Notifications for `event` on `booking`: one email when a contact address
/// is known and one in-app notice when the customer is signed in.
#[must_use]
pub fn for_booking(event: BookingEvent, booking: &Booking) -> Vec<Notification> {
    let title = event.title();
    let message = event.message(booking);
    let mut notifications = Vec::with_capacity(2);

    if let Some(email) = &booking.contact_email {
        notifications.push(Notification::Email {
            recipients: vec![email.clone()],
            subject: format!("{title}: {}", booking.code),
            body: message.clone(),
        });
    }
    if let Some(user_id) = booking.user_id {
        notifications.push(Notification::InApp {
            user_id,
            kind: event.kind(),
            title: title.to_string(),
            message,
            data: json!({
                "booking_id": booking.id,
                "booking_code": booking.code,
                "showtime_id": booking.showtime_id,
                "status": booking.status.as_str(),
                "total_cents": booking.total.cents(),
            }),
        });
    }
    notifications
}

/// Notifier that only logs. Used when no delivery collaborator is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn deliver(&self, notification: Notification) -> Result<(), NotificationError> {
        match &notification {
            Notification::Email {
                recipients,
                subject,
                ..
            } => {
                tracing::info!(channel = "email", recipients = recipients.len(), subject = %subject, "Notification");
            }
            Notification::InApp {
                user_id, kind, title, ..
            } => {
                tracing::info!(channel = "in_app", user_id = %user_id, kind = ?kind, title = %title, "Notification");
            }
        }
        Ok(())
    }
}
