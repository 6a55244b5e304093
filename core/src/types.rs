//! Domain types for the seat reservation core.
//!
//! Showtimes own the mutable `available_seats` counter, seats are immutable
//! screen positions, and bookings freeze the price charged for each seat.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a showtime (one screening of a movie)
    ShowtimeId
);
uuid_id!(
    /// Unique identifier for a physical seat on a screen
    SeatId
);
uuid_id!(
    /// Unique identifier for a booking
    BookingId
);
uuid_id!(
    /// Identifier of a hold; doubles as the session token stored in seat locks
    HoldId
);
uuid_id!(
    /// Unique identifier for a user
    UserId
);
uuid_id!(
    /// Unique identifier for a cinema
    CinemaId
);
uuid_id!(
    /// Unique identifier for a screen (auditorium) inside a cinema
    ScreenId
);
uuid_id!(
    /// Unique identifier for a movie
    MovieId
);

// ============================================================================
// Money
// ============================================================================

/// Monetary amount in cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, saturating at `u64::MAX`
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Multiplies by a quantity, saturating at `u64::MAX`
    #[must_use]
    pub const fn saturating_multiply(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }

    /// Scales by a basis-point rate (1 bp = 0.01%), rounding half up.
    #[must_use]
    pub const fn basis_points(self, bps: u32) -> Self {
        let scaled = (self.0 as u128) * (bps as u128);
        let rounded = (scaled + 5_000) / 10_000;
        if rounded > u64::MAX as u128 {
            Self(u64::MAX)
        } else {
            #[allow(clippy::cast_possible_truncation)]
            Self(rounded as u64)
        }
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Status enums
// ============================================================================

/// Error returned when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseStatusError {
    /// Which enum was being parsed
    pub kind: &'static str,
    /// The offending value
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Canonical upper-case representation used in storage
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseStatusError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Lifecycle of a showtime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShowtimeStatus {
    /// Open for booking
    Scheduled,
    /// Screening in progress
    Ongoing,
    /// Screening finished
    Completed,
    /// Screening cancelled
    Cancelled,
}

string_enum!(ShowtimeStatus, "showtime status", {
    Scheduled => "SCHEDULED",
    Ongoing => "ONGOING",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

/// Seat category, used for pricing only
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatType {
    /// Regular seat
    Standard,
    /// Better sight lines or larger seat
    Premium,
    /// Recliner / lounge seat
    Vip,
    /// Double seat sold as one position
    Couple,
    /// Wheelchair-accessible position
    Accessible,
}

string_enum!(SeatType, "seat type", {
    Standard => "STANDARD",
    Premium => "PREMIUM",
    Vip => "VIP",
    Couple => "COUPLE",
    Accessible => "ACCESSIBLE",
});

/// Lifecycle of a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Seats decremented, waiting for payment
    Pending,
    /// Payment received
    Confirmed,
    /// Screening attended
    Completed,
    /// Cancelled explicitly; seats returned
    Cancelled,
    /// Refunded by the payment collaborator
    Refunded,
    /// Payment window elapsed; seats returned
    Expired,
}

string_enum!(BookingStatus, "booking status", {
    Pending => "PENDING",
    Confirmed => "CONFIRMED",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
    Refunded => "REFUNDED",
    Expired => "EXPIRED",
});

impl BookingStatus {
    /// Whether seats held by a booking in this status count as booked.
    #[must_use]
    pub const fn occupies_seats(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Whether an explicit cancellation is allowed from this status.
    #[must_use]
    pub const fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

/// Payment state of a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Awaiting payment
    Pending,
    /// Payment captured
    Paid,
    /// Payment attempt failed
    Failed,
    /// Payment returned
    Refunded,
    /// Booking cancelled before payment
    Cancelled,
}

string_enum!(PaymentStatus, "payment status", {
    Pending => "PENDING",
    Paid => "PAID",
    Failed => "FAILED",
    Refunded => "REFUNDED",
    Cancelled => "CANCELLED",
});

/// Payment method chosen at confirmation time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Credit card payment
    CreditCard {
        /// Last four digits of card
        last_four: String,
    },
    /// Debit card payment
    DebitCard {
        /// Last four digits of card
        last_four: String,
    },
    /// Digital wallet (Apple Pay, Google Pay, ...)
    Wallet {
        /// Wallet provider name
        provider: String,
    },
    /// Paid at the box office
    Cash,
}

// ============================================================================
// Entities
// ============================================================================

/// A screening of a movie on one screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Showtime {
    /// Showtime ID
    pub id: ShowtimeId,
    /// Cinema hosting the screening
    pub cinema_id: CinemaId,
    /// Screen the movie plays on
    pub screen_id: ScreenId,
    /// Movie being screened
    pub movie_id: MovieId,
    /// Screening date
    pub show_date: NaiveDate,
    /// Start time (cinema local time treated as UTC)
    pub start_time: NaiveTime,
    /// End time
    pub end_time: NaiveTime,
    /// Base ticket price before multipliers
    pub base_price: Money,
    /// Seats on the screen
    pub total_seats: u32,
    /// Seats not covered by an active booking
    pub available_seats: u32,
    /// Lifecycle status
    pub status: ShowtimeStatus,
}

impl Showtime {
    /// Start of the screening as a timestamp.
    #[must_use]
    pub fn starts_at(&self) -> DateTime<Utc> {
        NaiveDateTime::new(self.show_date, self.start_time).and_utc()
    }

    /// Whether the screening has started at `now`.
    #[must_use]
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.starts_at() <= now
    }

    /// Whether seats can currently be held for this showtime.
    #[must_use]
    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        self.status == ShowtimeStatus::Scheduled && !self.has_started(now)
    }

    /// Fraction of seats already sold, between 0.0 and 1.0.
    #[must_use]
    pub fn occupancy_ratio(&self) -> f64 {
        if self.total_seats == 0 {
            return 1.0;
        }
        let sold = self.total_seats.saturating_sub(self.available_seats);
        f64::from(sold) / f64::from(self.total_seats)
    }

    /// Whether the screening falls on a Saturday or Sunday.
    #[must_use]
    pub fn is_weekend(&self) -> bool {
        matches!(
            self.show_date.weekday(),
            chrono::Weekday::Sat | chrono::Weekday::Sun
        )
    }
}

/// A physical seat on a screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Seat ID
    pub id: SeatId,
    /// Screen the seat belongs to
    pub screen_id: ScreenId,
    /// Row label ("A", "B", ...)
    pub row: String,
    /// Seat number within the row
    pub number: u32,
    /// Seat category
    pub seat_type: SeatType,
}

impl Seat {
    /// Human label such as `A1`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}{}", self.row, self.number)
    }
}

/// A durable booking of one or more seats for a showtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking ID
    pub id: BookingId,
    /// Short customer-facing reference (`BK-XXXXXXXX`)
    pub code: String,
    /// Showtime booked
    pub showtime_id: ShowtimeId,
    /// Owner, when the customer is signed in
    pub user_id: Option<UserId>,
    /// Address for the confirmation email
    pub contact_email: Option<String>,
    /// Booking lifecycle status
    pub status: BookingStatus,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Payment method chosen at confirmation
    pub payment_method: Option<PaymentMethod>,
    /// Number of seats
    pub num_tickets: u32,
    /// Sum of per-seat prices
    pub subtotal: Money,
    /// Booking fee
    pub booking_fee: Money,
    /// Tax
    pub tax: Money,
    /// Amount to pay
    pub total: Money,
    /// Deadline for payment while PENDING
    pub expires_at: DateTime<Utc>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// When payment confirmed the booking
    pub confirmed_at: Option<DateTime<Utc>>,
    /// When seats were given back (cancel or expiry)
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Whether a PENDING booking is past its payment deadline at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Pending && self.expires_at <= now
    }
}

/// Price charged for one seat in one booking. Immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSeat {
    /// Booking the seat belongs to
    pub booking_id: BookingId,
    /// Showtime (denormalised for the active-seat uniqueness guarantee)
    pub showtime_id: ShowtimeId,
    /// Seat booked
    pub seat_id: SeatId,
    /// Seat category at booking time
    pub seat_type: SeatType,
    /// Frozen price
    pub price: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn showtime(total: u32, available: u32) -> Showtime {
        Showtime {
            id: ShowtimeId::new(),
            cinema_id: CinemaId::new(),
            screen_id: ScreenId::new(),
            movie_id: MovieId::new(),
            show_date: NaiveDate::from_ymd_opt(2025, 1, 4).unwrap_or_default(),
            start_time: NaiveTime::from_hms_opt(19, 30, 0).unwrap_or_default(),
            end_time: NaiveTime::from_hms_opt(21, 45, 0).unwrap_or_default(),
            base_price: Money::from_cents(1_000),
            total_seats: total,
            available_seats: available,
            status: ShowtimeStatus::Scheduled,
        }
    }

    #[test]
    fn test_status_round_trips_through_storage_text() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>(), Ok(status));
        }
        assert!("pending".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_only_pending_and_confirmed_occupy_seats() {
        assert!(BookingStatus::Pending.occupies_seats());
        assert!(BookingStatus::Confirmed.occupies_seats());
        assert!(!BookingStatus::Cancelled.occupies_seats());
        assert!(!BookingStatus::Expired.occupies_seats());
    }

    #[test]
    fn test_occupancy_ratio() {
        assert!((showtime(100, 25).occupancy_ratio() - 0.75).abs() < f64::EPSILON);
        assert!((showtime(0, 0).occupancy_ratio() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_saturday_is_weekend() {
        assert!(showtime(10, 10).is_weekend());
    }

    #[test]
    fn test_money_basis_points_rounds_half_up() {
        assert_eq!(Money::from_cents(1_000).basis_points(800), Money::from_cents(80));
        assert_eq!(Money::from_cents(1_005).basis_points(500), Money::from_cents(50));
        assert_eq!(Money::from_cents(1_010).basis_points(500), Money::from_cents(51));
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1_234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
    }
}
