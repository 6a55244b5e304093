//! `PostgreSQL` inventory ledger for the Boxoffice reservation core.
//!
//! Implements [`InventoryLedger`] with sqlx. Seat counts change through exactly
//! two statements, each inside the transaction that writes the matching
//! booking rows:
//!
//! ```sql
//! -- confirm: zero affected rows means insufficient seats
//! UPDATE showtimes SET available_seats = available_seats - $1
//!  WHERE id = $2 AND available_seats >= $1
//!
//! -- cancel / expire: unconditional give-back
//! UPDATE showtimes SET available_seats = available_seats + $1 WHERE id = $2
//! ```
//!
//! A partial unique index on `booking_seats (showtime_id, seat_id) WHERE
//! released_at IS NULL` guarantees a seat is covered by at most one active
//! booking; a violation is reported as
//! [`CreateBookingOutcome::SeatsAlreadyBooked`].
//!
//! # Example
//!
//! ```no_run
//! use boxoffice_postgres::{PoolSettings, PostgresInventoryLedger};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = PostgresInventoryLedger::connect(
//!     "postgres://localhost/boxoffice",
//!     &PoolSettings::default(),
//! )
//! .await?;
//! ledger.migrate().await?;
//! # Ok(())
//! # }
//! ```

use boxoffice_core::inventory::{
    CreateBookingOutcome, InventoryLedger, LedgerError, NewBooking, PaymentRecordOutcome,
    PaymentUpdate, ReleaseKind, ReleaseOutcome, Result,
};
use boxoffice_core::types::{
    Booking, BookingId, BookingSeat, BookingStatus, CinemaId, Money, MovieId, PaymentMethod,
    PaymentStatus, ScreenId, Seat, SeatId, SeatType, Showtime, ShowtimeId, ShowtimeStatus, UserId,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Name of the partial unique index guarding active seats.
const ACTIVE_SEAT_INDEX: &str = "booking_seats_active";

/// Columns selected for every [`Booking`] read.
const BOOKING_COLUMNS: &str = "id, booking_code, showtime_id, user_id, contact_email, status, \
     payment_status, payment_method, num_tickets, subtotal_cents, booking_fee_cents, tax_cents, \
     total_cents, expires_at, created_at, confirmed_at, cancelled_at";

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Maximum connections in the pool
    pub max_connections: u32,
    /// Connections kept open when idle
    pub min_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
    /// Server-side `statement_timeout`
    pub statement_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 20,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_secs(5),
        }
    }
}

/// `PostgreSQL`-backed [`InventoryLedger`].
#[derive(Debug, Clone)]
pub struct PostgresInventoryLedger {
    pool: PgPool,
}

impl PostgresInventoryLedger {
    /// Connect a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the URL is invalid or the first
    /// connection cannot be established.
    pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<Self> {
        let statement_timeout_ms = settings.statement_timeout.as_millis().to_string();
        let options = PgConnectOptions::from_str(database_url)
            .map_err(|e| LedgerError::Database(format!("Invalid database URL: {e}")))?
            .options([("statement_timeout", statement_timeout_ms.as_str())]);

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| db_error("connect", e))?;

        tracing::info!(
            max_connections = settings.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Insert a showtime row.
    ///
    /// Catalogue data is normally maintained elsewhere; this exists for
    /// seeding and tests.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the insert fails.
    pub async fn insert_showtime(&self, showtime: &Showtime) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO showtimes (
                id, cinema_id, screen_id, movie_id, show_date, start_time, end_time,
                base_price_cents, total_seats, available_seats, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(showtime.id.as_uuid())
        .bind(showtime.cinema_id.as_uuid())
        .bind(showtime.screen_id.as_uuid())
        .bind(showtime.movie_id.as_uuid())
        .bind(showtime.show_date)
        .bind(showtime.start_time)
        .bind(showtime.end_time)
        .bind(money_to_db(showtime.base_price)?)
        .bind(count_to_db(showtime.total_seats)?)
        .bind(count_to_db(showtime.available_seats)?)
        .bind(showtime.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("insert showtime", e))?;
        Ok(())
    }

    /// Insert seat rows. See [`Self::insert_showtime`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if an insert fails.
    pub async fn insert_seats(&self, seats: &[Seat]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("begin", e))?;
        for seat in seats {
            sqlx::query(
                r"
                INSERT INTO seats (id, screen_id, row_label, seat_number, seat_type)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(seat.id.as_uuid())
            .bind(seat.screen_id.as_uuid())
            .bind(&seat.row)
            .bind(count_to_db(seat.number)?)
            .bind(seat.seat_type.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("insert seat", e))?;
        }
        tx.commit().await.map_err(|e| db_error("commit", e))?;
        Ok(())
    }

    async fn booking_status(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: BookingId,
    ) -> Result<Option<BookingStatus>> {
        let row = sqlx::query("SELECT status FROM bookings WHERE id = $1")
            .bind(booking_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| db_error("load booking status", e))?;

        row.map(|row| {
            let status: String = row.try_get("status").map_err(corrupt)?;
            parse_text(&status)
        })
        .transpose()
    }
}

impl InventoryLedger for PostgresInventoryLedger {
    async fn showtime(&self, showtime_id: ShowtimeId) -> Result<Option<Showtime>> {
        let row = sqlx::query(
            r"
            SELECT id, cinema_id, screen_id, movie_id, show_date, start_time, end_time,
                   base_price_cents, total_seats, available_seats, status
            FROM showtimes
            WHERE id = $1
            ",
        )
        .bind(showtime_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("load showtime", e))?;

        row.as_ref().map(row_to_showtime).transpose()
    }

    async fn seats_for_showtime(&self, showtime_id: ShowtimeId) -> Result<Vec<Seat>> {
        let rows = sqlx::query(
            r"
            SELECT s.id, s.screen_id, s.row_label, s.seat_number, s.seat_type
            FROM seats s
            JOIN showtimes st ON st.screen_id = s.screen_id
            WHERE st.id = $1
            ORDER BY s.row_label, s.seat_number
            ",
        )
        .bind(showtime_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("load seats", e))?;

        rows.iter().map(row_to_seat).collect()
    }

    async fn booked_seat_ids(&self, showtime_id: ShowtimeId) -> Result<HashSet<SeatId>> {
        let rows = sqlx::query(
            r"
            SELECT bs.seat_id
            FROM booking_seats bs
            JOIN bookings b ON b.id = bs.booking_id
            WHERE bs.showtime_id = $1
              AND bs.released_at IS NULL
              AND b.status IN ('PENDING', 'CONFIRMED')
            ",
        )
        .bind(showtime_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("load booked seats", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<Uuid, _>("seat_id")
                    .map(SeatId::from_uuid)
                    .map_err(corrupt)
            })
            .collect()
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<CreateBookingOutcome> {
        let requested = booking.num_tickets();
        let mut tx = self.pool.begin().await.map_err(|e| db_error("begin", e))?;

        let decremented = sqlx::query(
            r"
            UPDATE showtimes
            SET available_seats = available_seats - $1
            WHERE id = $2 AND available_seats >= $1
            ",
        )
        .bind(count_to_db(requested)?)
        .bind(booking.showtime_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("decrement available seats", e))?
        .rows_affected();

        if decremented == 0 {
            tx.rollback().await.map_err(|e| db_error("rollback", e))?;
            tracing::debug!(
                showtime_id = %booking.showtime_id,
                requested,
                "Conditional decrement matched no rows"
            );
            metrics::counter!("ledger_conditional_decrement_misses_total").increment(1);
            return Ok(CreateBookingOutcome::InsufficientSeats { requested });
        }

        let row = sqlx::query(&format!(
            r"
            INSERT INTO bookings (
                id, booking_code, showtime_id, user_id, contact_email, status, payment_status,
                payment_method, num_tickets, subtotal_cents, booking_fee_cents, tax_cents,
                total_cents, expires_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, 'PENDING', 'PENDING', $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {BOOKING_COLUMNS}
            "
        ))
        .bind(booking.id.as_uuid())
        .bind(&booking.code)
        .bind(booking.showtime_id.as_uuid())
        .bind(booking.user_id.map(|id| *id.as_uuid()))
        .bind(booking.contact_email.as_deref())
        .bind(Json(&booking.payment_method))
        .bind(count_to_db(requested)?)
        .bind(money_to_db(booking.subtotal)?)
        .bind(money_to_db(booking.booking_fee)?)
        .bind(money_to_db(booking.tax)?)
        .bind(money_to_db(booking.total)?)
        .bind(booking.expires_at)
        .bind(booking.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("insert booking", e))?;
        let created = row_to_booking(&row)?;

        for seat in &booking.seats {
            let inserted = sqlx::query(
                r"
                INSERT INTO booking_seats (booking_id, showtime_id, seat_id, seat_type, price_cents)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(booking.id.as_uuid())
            .bind(booking.showtime_id.as_uuid())
            .bind(seat.seat_id.as_uuid())
            .bind(seat.seat_type.as_str())
            .bind(money_to_db(seat.price)?)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                Err(e) if is_active_seat_conflict(&e) => {
                    tx.rollback().await.map_err(|e| db_error("rollback", e))?;
                    tracing::warn!(
                        showtime_id = %booking.showtime_id,
                        seat_id = %seat.seat_id,
                        "Seat already covered by an active booking"
                    );
                    return Ok(CreateBookingOutcome::SeatsAlreadyBooked);
                }
                Err(e) => return Err(db_error("insert booking seat", e)),
            }
        }

        tx.commit().await.map_err(|e| db_error("commit", e))?;

        metrics::counter!("ledger_bookings_created_total").increment(1);
        tracing::info!(
            booking_id = %created.id,
            showtime_id = %created.showtime_id,
            seats = requested,
            "Booking persisted"
        );
        Ok(CreateBookingOutcome::Created(created))
    }

    async fn release_booking(
        &self,
        booking_id: BookingId,
        kind: ReleaseKind,
        at: DateTime<Utc>,
    ) -> Result<ReleaseOutcome> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("begin", e))?;

        // Row lock serialises concurrent releases; the loser matches nothing
        let eligibility = match kind {
            ReleaseKind::Cancel => "status IN ('PENDING', 'CONFIRMED')",
            ReleaseKind::Expire => "status = 'PENDING' AND expires_at <= $3",
        };
        let sql = format!(
            r"
            UPDATE bookings
            SET status = $2,
                payment_status = CASE WHEN payment_status = 'PAID' THEN 'PAID' ELSE 'CANCELLED' END,
                cancelled_at = $3
            WHERE id = $1 AND {eligibility}
            RETURNING {BOOKING_COLUMNS}
            "
        );
        let row = sqlx::query(&sql)
            .bind(booking_id.as_uuid())
            .bind(kind.target_status().as_str())
            .bind(at)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("release booking", e))?;

        let Some(row) = row else {
            let status = Self::booking_status(&mut tx, booking_id).await?;
            tx.rollback().await.map_err(|e| db_error("rollback", e))?;
            return Ok(status.map_or(ReleaseOutcome::NotFound, ReleaseOutcome::NotReleasable));
        };
        let released = row_to_booking(&row)?;

        sqlx::query(
            "UPDATE booking_seats SET released_at = $2 WHERE booking_id = $1 AND released_at IS NULL",
        )
        .bind(booking_id.as_uuid())
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("release booking seats", e))?;

        sqlx::query("UPDATE showtimes SET available_seats = available_seats + $1 WHERE id = $2")
            .bind(count_to_db(released.num_tickets)?)
            .bind(released.showtime_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("increment available seats", e))?;

        tx.commit().await.map_err(|e| db_error("commit", e))?;

        metrics::counter!(
            "ledger_bookings_released_total",
            "status" => released.status.as_str()
        )
        .increment(1);
        tracing::info!(
            booking_id = %booking_id,
            status = %released.status,
            seats = released.num_tickets,
            "Booking released, seats returned"
        );
        Ok(ReleaseOutcome::Released(released))
    }

    async fn record_payment(
        &self,
        booking_id: BookingId,
        update: PaymentUpdate,
        at: DateTime<Utc>,
    ) -> Result<PaymentRecordOutcome> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("begin", e))?;

        let assignments = match update {
            PaymentUpdate::Paid => "status = 'CONFIRMED', payment_status = 'PAID', confirmed_at = $2",
            PaymentUpdate::Failed => "payment_status = 'FAILED'",
        };
        let sql = format!(
            r"
            UPDATE bookings
            SET {assignments}
            WHERE id = $1 AND status = 'PENDING' AND expires_at > $2
            RETURNING {BOOKING_COLUMNS}
            "
        );
        let row = sqlx::query(&sql)
            .bind(booking_id.as_uuid())
            .bind(at)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("record payment", e))?;

        let outcome = match row {
            Some(row) => PaymentRecordOutcome::Recorded(row_to_booking(&row)?),
            None => Self::booking_status(&mut tx, booking_id)
                .await?
                .map_or(PaymentRecordOutcome::NotFound, PaymentRecordOutcome::NotPending),
        };

        tx.commit().await.map_err(|e| db_error("commit", e))?;
        Ok(outcome)
    }

    async fn booking(&self, booking_id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(booking_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("load booking", e))?;

        row.as_ref().map(row_to_booking).transpose()
    }

    async fn booking_seats(&self, booking_id: BookingId) -> Result<Vec<BookingSeat>> {
        let rows = sqlx::query(
            r"
            SELECT booking_id, showtime_id, seat_id, seat_type, price_cents
            FROM booking_seats
            WHERE booking_id = $1
            ",
        )
        .bind(booking_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("load booking seats", e))?;

        rows.iter().map(row_to_booking_seat).collect()
    }

    async fn expired_pending_bookings(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<BookingId>> {
        let rows = sqlx::query(
            r"
            SELECT id
            FROM bookings
            WHERE status = 'PENDING' AND expires_at <= $1
            ORDER BY expires_at ASC
            LIMIT $2
            ",
        )
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list expired bookings", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<Uuid, _>("id")
                    .map(BookingId::from_uuid)
                    .map_err(corrupt)
            })
            .collect()
    }
}

// ============================================================================
// Error and value mapping
// ============================================================================

fn db_error(context: &str, error: sqlx::Error) -> LedgerError {
    match &error {
        sqlx::Error::PoolTimedOut => LedgerError::Timeout(format!("{context}: {error}")),
        // 57014 = query_canceled, raised when statement_timeout fires
        sqlx::Error::Database(db) if db.code().as_deref() == Some("57014") => {
            LedgerError::Timeout(format!("{context}: {error}"))
        }
        _ => LedgerError::Database(format!("{context}: {error}")),
    }
}

fn is_active_seat_conflict(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db)
            if db.is_unique_violation() && db.constraint() == Some(ACTIVE_SEAT_INDEX)
    )
}

#[allow(clippy::needless_pass_by_value)] // Used as a map_err adaptor
fn corrupt(error: sqlx::Error) -> LedgerError {
    LedgerError::CorruptRow(error.to_string())
}

fn parse_text<T>(value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| LedgerError::CorruptRow(e.to_string()))
}

fn money_to_db(money: Money) -> Result<i64> {
    i64::try_from(money.cents())
        .map_err(|_| LedgerError::CorruptRow(format!("amount out of range: {money}")))
}

fn money_from_db(cents: i64) -> Result<Money> {
    u64::try_from(cents)
        .map(Money::from_cents)
        .map_err(|_| LedgerError::CorruptRow(format!("negative amount: {cents}")))
}

fn count_to_db(count: u32) -> Result<i32> {
    i32::try_from(count).map_err(|_| LedgerError::CorruptRow(format!("count out of range: {count}")))
}

fn count_from_db(count: i32) -> Result<u32> {
    u32::try_from(count).map_err(|_| LedgerError::CorruptRow(format!("negative count: {count}")))
}

fn row_to_showtime(row: &PgRow) -> Result<Showtime> {
    let status: String = row.try_get("status").map_err(corrupt)?;
    Ok(Showtime {
        id: ShowtimeId::from_uuid(row.try_get("id").map_err(corrupt)?),
        cinema_id: CinemaId::from_uuid(row.try_get("cinema_id").map_err(corrupt)?),
        screen_id: ScreenId::from_uuid(row.try_get("screen_id").map_err(corrupt)?),
        movie_id: MovieId::from_uuid(row.try_get("movie_id").map_err(corrupt)?),
        show_date: row.try_get("show_date").map_err(corrupt)?,
        start_time: row.try_get("start_time").map_err(corrupt)?,
        end_time: row.try_get("end_time").map_err(corrupt)?,
        base_price: money_from_db(row.try_get("base_price_cents").map_err(corrupt)?)?,
        total_seats: count_from_db(row.try_get("total_seats").map_err(corrupt)?)?,
        available_seats: count_from_db(row.try_get("available_seats").map_err(corrupt)?)?,
        status: parse_text::<ShowtimeStatus>(&status)?,
    })
}

fn row_to_seat(row: &PgRow) -> Result<Seat> {
    let seat_type: String = row.try_get("seat_type").map_err(corrupt)?;
    Ok(Seat {
        id: SeatId::from_uuid(row.try_get("id").map_err(corrupt)?),
        screen_id: ScreenId::from_uuid(row.try_get("screen_id").map_err(corrupt)?),
        row: row.try_get("row_label").map_err(corrupt)?,
        number: count_from_db(row.try_get("seat_number").map_err(corrupt)?)?,
        seat_type: parse_text::<SeatType>(&seat_type)?,
    })
}

fn row_to_booking_seat(row: &PgRow) -> Result<BookingSeat> {
    let seat_type: String = row.try_get("seat_type").map_err(corrupt)?;
    Ok(BookingSeat {
        booking_id: BookingId::from_uuid(row.try_get("booking_id").map_err(corrupt)?),
        showtime_id: ShowtimeId::from_uuid(row.try_get("showtime_id").map_err(corrupt)?),
        seat_id: SeatId::from_uuid(row.try_get("seat_id").map_err(corrupt)?),
        seat_type: parse_text::<SeatType>(&seat_type)?,
        price: money_from_db(row.try_get("price_cents").map_err(corrupt)?)?,
    })
}

fn row_to_booking(row: &PgRow) -> Result<Booking> {
    let status: String = row.try_get("status").map_err(corrupt)?;
    let payment_status: String = row.try_get("payment_status").map_err(corrupt)?;
    let payment_method: Option<Json<PaymentMethod>> =
        row.try_get("payment_method").map_err(corrupt)?;
    let user_id: Option<Uuid> = row.try_get("user_id").map_err(corrupt)?;

    Ok(Booking {
        id: BookingId::from_uuid(row.try_get("id").map_err(corrupt)?),
        code: row.try_get("booking_code").map_err(corrupt)?,
        showtime_id: ShowtimeId::from_uuid(row.try_get("showtime_id").map_err(corrupt)?),
        user_id: user_id.map(UserId::from_uuid),
        contact_email: row.try_get("contact_email").map_err(corrupt)?,
        status: parse_text::<BookingStatus>(&status)?,
        payment_status: parse_text::<PaymentStatus>(&payment_status)?,
        payment_method: payment_method.map(|Json(method)| method),
        num_tickets: count_from_db(row.try_get("num_tickets").map_err(corrupt)?)?,
        subtotal: money_from_db(row.try_get("subtotal_cents").map_err(corrupt)?)?,
        booking_fee: money_from_db(row.try_get("booking_fee_cents").map_err(corrupt)?)?,
        tax: money_from_db(row.try_get("tax_cents").map_err(corrupt)?)?,
        total: money_from_db(row.try_get("total_cents").map_err(corrupt)?)?,
        expires_at: row.try_get("expires_at").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
        confirmed_at: row.try_get("confirmed_at").map_err(corrupt)?,
        cancelled_at: row.try_get("cancelled_at").map_err(corrupt)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_conversion_rejects_negative_cents() {
        assert_eq!(money_from_db(1_250), Ok(Money::from_cents(1_250)));
        assert!(matches!(money_from_db(-1), Err(LedgerError::CorruptRow(_))));
    }

    #[test]
    fn test_count_conversion_bounds() {
        assert_eq!(count_to_db(10), Ok(10));
        assert!(count_to_db(u32::MAX).is_err());
        assert!(count_from_db(-3).is_err());
    }

    #[test]
    fn test_parse_text_reports_corrupt_status() {
        assert_eq!(parse_text::<BookingStatus>("EXPIRED"), Ok(BookingStatus::Expired));
        assert!(matches!(
            parse_text::<BookingStatus>("LOST"),
            Err(LedgerError::CorruptRow(_))
        ));
    }

    #[test]
    fn test_pool_timeout_maps_to_timeout() {
        assert!(matches!(
            db_error("acquire", sqlx::Error::PoolTimedOut),
            LedgerError::Timeout(_)
        ));
        assert!(matches!(
            db_error("query", sqlx::Error::RowNotFound),
            LedgerError::Database(_)
        ));
    }
}
