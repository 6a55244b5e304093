//! Showtime and seat fixtures.

use boxoffice_core::types::{
    CinemaId, Money, MovieId, ScreenId, Seat, SeatId, SeatType, Showtime, ShowtimeId,
    ShowtimeStatus,
};
use chrono::{DateTime, Duration, Utc};

/// A showtime together with the seats of its screen.
#[derive(Debug, Clone)]
pub struct Fixture {
    /// The showtime
    pub showtime: Showtime,
    /// Seats in row-major order
    pub seats: Vec<Seat>,
}

impl Fixture {
    /// Seat with the given label (`"A1"`).
    #[must_use]
    pub fn seat(&self, label: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.label() == label)
    }

    /// Ids of the seats with the given labels, skipping unknown labels.
    #[must_use]
    pub fn seat_ids(&self, labels: &[&str]) -> Vec<SeatId> {
        labels
            .iter()
            .filter_map(|label| self.seat(label).map(|s| s.id))
            .collect()
    }
}

/// Builder for a [`Fixture`].
///
/// Defaults: a SCHEDULED showtime one day after `now`, base price $10.00,
/// no seats.
///
/// # Example
///
/// ```
/// use boxoffice_testing::fixtures::ShowtimeFixture;
/// use boxoffice_core::types::SeatType;
/// use chrono::Utc;
///
/// let fixture = ShowtimeFixture::new(Utc::now())
///     .rows(&["A"], 2)
///     .seat_type("A2", SeatType::Vip)
///     .build();
///
/// assert_eq!(fixture.showtime.total_seats, 2);
/// assert_eq!(fixture.seat("A2").map(|s| s.seat_type), Some(SeatType::Vip));
/// ```
#[derive(Debug, Clone)]
pub struct ShowtimeFixture {
    starts_at: DateTime<Utc>,
    base_price: Money,
    status: ShowtimeStatus,
    seats: Vec<(String, u32, SeatType)>,
    available: Option<u32>,
}

impl ShowtimeFixture {
    /// Start a fixture relative to `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            starts_at: now + Duration::days(1),
            base_price: Money::from_cents(1_000),
            status: ShowtimeStatus::Scheduled,
            seats: Vec::new(),
            available: None,
        }
    }

    /// Add `per_row` standard seats to each row.
    #[must_use]
    pub fn rows(mut self, rows: &[&str], per_row: u32) -> Self {
        for row in rows {
            for number in 1..=per_row {
                self.seats.push(((*row).to_string(), number, SeatType::Standard));
            }
        }
        self
    }

    /// Change the type of an already added seat.
    #[must_use]
    pub fn seat_type(mut self, label: &str, seat_type: SeatType) -> Self {
        for seat in &mut self.seats {
            if format!("{}{}", seat.0, seat.1) == label {
                seat.2 = seat_type;
            }
        }
        self
    }

    /// Set the start of the screening.
    #[must_use]
    pub const fn starts_at(mut self, starts_at: DateTime<Utc>) -> Self {
        self.starts_at = starts_at;
        self
    }

    /// Set the base ticket price.
    #[must_use]
    pub const fn base_price(mut self, base_price: Money) -> Self {
        self.base_price = base_price;
        self
    }

    /// Set the showtime status.
    #[must_use]
    pub const fn status(mut self, status: ShowtimeStatus) -> Self {
        self.status = status;
        self
    }

    /// Override `available_seats` (defaults to the seat count).
    #[must_use]
    pub const fn available_seats(mut self, available: u32) -> Self {
        self.available = Some(available);
        self
    }

    /// Build the fixture.
    #[must_use]
    pub fn build(self) -> Fixture {
        let screen_id = ScreenId::new();
        let seats: Vec<Seat> = self
            .seats
            .into_iter()
            .map(|(row, number, seat_type)| Seat {
                id: SeatId::new(),
                screen_id,
                row,
                number,
                seat_type,
            })
            .collect();

        #[allow(clippy::cast_possible_truncation)]
        let total = seats.len() as u32;
        let start = self.starts_at.naive_utc();
        let showtime = Showtime {
            id: ShowtimeId::new(),
            cinema_id: CinemaId::new(),
            screen_id,
            movie_id: MovieId::new(),
            show_date: start.date(),
            start_time: start.time(),
            end_time: (start + Duration::hours(2)).time(),
            base_price: self.base_price,
            total_seats: total,
            available_seats: self.available.unwrap_or(total).min(total),
            status: self.status,
        };

        Fixture { showtime, seats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_create_labelled_seats_on_one_screen() {
        let fixture = ShowtimeFixture::new(Utc::now()).rows(&["A", "B"], 3).build();

        assert_eq!(fixture.seats.len(), 6);
        assert_eq!(fixture.showtime.available_seats, 6);
        assert!(fixture.seat("B3").is_some());
        assert!(fixture.seat("C1").is_none());
        assert!(
            fixture
                .seats
                .iter()
                .all(|s| s.screen_id == fixture.showtime.screen_id)
        );
    }

    #[test]
    fn test_starts_at_round_trips() {
        let now = Utc::now();
        let starts = now + Duration::hours(3);
        let fixture = ShowtimeFixture::new(now).starts_at(starts).build();

        assert_eq!(fixture.showtime.starts_at().timestamp(), starts.timestamp());
    }
}
