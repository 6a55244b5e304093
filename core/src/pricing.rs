//! Dynamic pricing.
//!
//! A seat's price is the showtime base price scaled by four multipliers:
//!
//! | Factor | Rule | Multiplier |
//! |---|---|---|
//! | Seat type | STANDARD / PREMIUM / VIP / COUPLE / ACCESSIBLE | 1.00 / 1.50 / 2.00 / 1.80 / 1.00 |
//! | Time of day | matinee (< 12:00) / prime (18:00–22:59) / late (≥ 23:00) | 0.85 / 1.15 / 0.90 |
//! | Day of week | Saturday or Sunday | 1.10 |
//! | Occupancy | sold ≥ 90% / ≥ 75% / ≥ 50% | 1.25 / 1.15 / 1.05 |
//!
//! Prices are computed once at hold time and frozen into the hold record and
//! later into the `BookingSeat` rows.

use crate::types::{Money, Seat, SeatId, SeatType, Showtime};
use chrono::Timelike;
use serde::{Deserialize, Serialize};

/// Fee and tax settings applied on top of seat prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Fee charged per ticket
    pub booking_fee_per_ticket: Money,
    /// Tax rate in basis points, applied to subtotal + fee
    pub tax_rate_bps: u32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            booking_fee_per_ticket: Money::from_cents(150),
            tax_rate_bps: 800,
        }
    }
}

/// Price of a single seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatPrice {
    /// Seat priced
    pub seat_id: SeatId,
    /// Seat category used
    pub seat_type: SeatType,
    /// Final price for the seat
    pub price: Money,
}

/// Full monetary breakdown for a hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// Per-seat prices, in request order
    pub seats: Vec<SeatPrice>,
    /// Sum of seat prices
    pub subtotal: Money,
    /// Per-ticket fee times ticket count
    pub booking_fee: Money,
    /// Tax on subtotal + fee
    pub tax: Money,
    /// Amount due
    pub total: Money,
}

impl PriceBreakdown {
    /// Price frozen for `seat_id`, if it is part of the breakdown.
    #[must_use]
    pub fn price_of(&self, seat_id: SeatId) -> Option<Money> {
        self.seats
            .iter()
            .find(|s| s.seat_id == seat_id)
            .map(|s| s.price)
    }
}

/// Multiplier for the seat category.
#[must_use]
pub const fn seat_type_multiplier(seat_type: SeatType) -> f64 {
    match seat_type {
        SeatType::Standard | SeatType::Accessible => 1.0,
        SeatType::Premium => 1.5,
        SeatType::Vip => 2.0,
        SeatType::Couple => 1.8,
    }
}

/// Multiplier for the hour the screening starts.
#[must_use]
pub const fn time_of_day_multiplier(start_hour: u32) -> f64 {
    match start_hour {
        0..=11 => 0.85,
        18..=22 => 1.15,
        23.. => 0.90,
        _ => 1.0,
    }
}

/// Multiplier for weekend screenings.
#[must_use]
pub const fn day_of_week_multiplier(is_weekend: bool) -> f64 {
    if is_weekend { 1.10 } else { 1.0 }
}

/// Multiplier for how full the showtime already is.
#[must_use]
pub fn occupancy_multiplier(occupancy_ratio: f64) -> f64 {
    if occupancy_ratio >= 0.90 {
        1.25
    } else if occupancy_ratio >= 0.75 {
        1.15
    } else if occupancy_ratio >= 0.50 {
        1.05
    } else {
        1.0
    }
}

/// Price of one seat of `seat_type` for `showtime` at its current occupancy.
#[must_use]
pub fn seat_price(showtime: &Showtime, seat_type: SeatType) -> Money {
    let multiplier = seat_type_multiplier(seat_type)
        * time_of_day_multiplier(showtime.start_time.hour())
        * day_of_week_multiplier(showtime.is_weekend())
        * occupancy_multiplier(showtime.occupancy_ratio());

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let cents = (showtime.base_price.cents() as f64 * multiplier).round() as u64;
    Money::from_cents(cents)
}

/// Build the breakdown for `seats` of `showtime`.
#[must_use]
pub fn quote(showtime: &Showtime, seats: &[Seat], policy: &PricingPolicy) -> PriceBreakdown {
    let seat_prices: Vec<SeatPrice> = seats
        .iter()
        .map(|seat| SeatPrice {
            seat_id: seat.id,
            seat_type: seat.seat_type,
            price: seat_price(showtime, seat.seat_type),
        })
        .collect();

    let subtotal: Money = seat_prices.iter().map(|s| s.price).sum();
    #[allow(clippy::cast_possible_truncation)]
    let booking_fee = policy
        .booking_fee_per_ticket
        .saturating_multiply(seats.len() as u32);
    let tax = subtotal.saturating_add(booking_fee).basis_points(policy.tax_rate_bps);
    let total = subtotal.saturating_add(booking_fee).saturating_add(tax);

    PriceBreakdown {
        seats: seat_prices,
        subtotal,
        booking_fee,
        tax,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CinemaId, MovieId, ScreenId, ShowtimeId, ShowtimeStatus};
    use chrono::{NaiveDate, NaiveTime};
    use proptest::prelude::*;

    fn showtime(date: (i32, u32, u32), hour: u32, total: u32, available: u32) -> Showtime {
        Showtime {
            id: ShowtimeId::new(),
            cinema_id: CinemaId::new(),
            screen_id: ScreenId::new(),
            movie_id: MovieId::new(),
            show_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap_or_default(),
            start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default(),
            end_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default(),
            base_price: Money::from_cents(1_000),
            total_seats: total,
            available_seats: available,
            status: ShowtimeStatus::Scheduled,
        }
    }

    fn seat(seat_type: SeatType) -> Seat {
        Seat {
            id: SeatId::new(),
            screen_id: ScreenId::new(),
            row: "A".to_string(),
            number: 1,
            seat_type,
        }
    }

    #[test]
    fn test_weekday_afternoon_standard_seat_is_base_price() {
        // Wednesday 2025-01-08, 15:00, empty house
        let show = showtime((2025, 1, 8), 15, 100, 100);
        assert_eq!(seat_price(&show, SeatType::Standard), Money::from_cents(1_000));
    }

    #[test]
    fn test_multipliers_compound() {
        // Saturday prime time, 80% sold, premium: 1000 * 1.5 * 1.15 * 1.10 * 1.15
        let show = showtime((2025, 1, 4), 20, 100, 20);
        assert_eq!(seat_price(&show, SeatType::Premium), Money::from_cents(2_182));
    }

    #[test]
    fn test_matinee_discount() {
        let show = showtime((2025, 1, 8), 10, 100, 100);
        assert_eq!(seat_price(&show, SeatType::Standard), Money::from_cents(850));
    }

    #[test]
    fn test_quote_breakdown() {
        let show = showtime((2025, 1, 8), 15, 100, 100);
        let seats = vec![seat(SeatType::Standard), seat(SeatType::Premium)];
        let policy = PricingPolicy {
            booking_fee_per_ticket: Money::from_cents(100),
            tax_rate_bps: 1_000,
        };

        let breakdown = quote(&show, &seats, &policy);

        assert_eq!(breakdown.subtotal, Money::from_cents(2_500));
        assert_eq!(breakdown.booking_fee, Money::from_cents(200));
        assert_eq!(breakdown.tax, Money::from_cents(270));
        assert_eq!(breakdown.total, Money::from_cents(2_970));
        assert_eq!(breakdown.price_of(seats[1].id), Some(Money::from_cents(1_500)));
    }

    proptest! {
        #[test]
        fn prop_price_never_decreases_as_house_fills(
            total in 1u32..500,
            sold_a in 0u32..500,
            sold_b in 0u32..500,
        ) {
            let (low, high) = if sold_a <= sold_b { (sold_a, sold_b) } else { (sold_b, sold_a) };
            let low = low.min(total);
            let high = high.min(total);
            let emptier = showtime((2025, 1, 8), 15, total, total - low);
            let fuller = showtime((2025, 1, 8), 15, total, total - high);

            prop_assert!(
                seat_price(&fuller, SeatType::Standard) >= seat_price(&emptier, SeatType::Standard)
            );
        }

        #[test]
        fn prop_total_is_sum_of_parts(count in 0usize..12, fee in 0u64..1_000, bps in 0u32..3_000) {
            let show = showtime((2025, 1, 8), 19, 100, 60);
            let seats: Vec<Seat> = (0..count).map(|_| seat(SeatType::Premium)).collect();
            let policy = PricingPolicy {
                booking_fee_per_ticket: Money::from_cents(fee),
                tax_rate_bps: bps,
            };

            let breakdown = quote(&show, &seats, &policy);

            prop_assert_eq!(breakdown.seats.len(), count);
            prop_assert_eq!(
                breakdown.total,
                breakdown.subtotal.saturating_add(breakdown.booking_fee).saturating_add(breakdown.tax)
            );
        }
    }
}
