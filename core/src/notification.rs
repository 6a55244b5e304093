//! Notification port.
//!
//! Side effects of a booking (confirmation email, in-app notices) are handed to
//! a [`Notifier`] from background workers. Delivery is at-most-once from this
//! side; durability belongs to the collaborator.

use crate::types::UserId;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Errors from a notification collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The collaborator could not be reached.
    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),

    /// The collaborator rejected the payload.
    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// Category of an in-app notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Booking created, awaiting payment
    BookingCreated,
    /// Payment received
    BookingConfirmed,
    /// Booking cancelled
    BookingCancelled,
    /// Payment window elapsed
    BookingExpired,
}

/// A notification job payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum Notification {
    /// Email message.
    Email {
        /// Recipient addresses
        recipients: Vec<String>,
        /// Subject line
        subject: String,
        /// Plain-text body
        body: String,
    },
    /// In-app notification for a signed-in user.
    InApp {
        /// Recipient
        user_id: UserId,
        /// Category
        kind: NotificationKind,
        /// Short title
        title: String,
        /// Message text
        message: String,
        /// Structured payload for the client
        data: serde_json::Value,
    },
}

impl Notification {
    /// Short label for logs and job names.
    #[must_use]
    pub const fn channel(&self) -> &'static str {
        match self {
            Self::Email { .. } => "email",
            Self::InApp { .. } => "in_app",
        }
    }
}

/// Delivers notifications.
pub trait Notifier: Send + Sync + 'static {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] if delivery fails.
    fn deliver(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}
