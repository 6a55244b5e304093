//! # Boxoffice Booking
//!
//! Seat holds and booking orchestration for the Boxoffice reservation core.
//!
//! A customer first *holds* seats: each seat is locked in the lock store under
//! a random hold id with a short TTL, and the frozen prices are stored in a
//! hold record beside the locks. *Confirming* the hold writes a PENDING
//! booking to the inventory ledger with a conditional decrement of
//! `available_seats`, so the ledger never oversells even if locks are lost.
//! The booking then waits for payment until it is confirmed, cancelled, or
//! expired by the [`spawn_expiry_sweeper`] task.
//!
//! ## Example
//!
//! ```no_run
//! use boxoffice_booking::{HoldOutcome, HoldRequest, Services, Config};
//! use boxoffice_core::types::{PaymentMethod, ShowtimeId, SeatId};
//!
//! # async fn example(showtime: ShowtimeId, seats: Vec<SeatId>) -> anyhow::Result<()> {
//! let services = Services::from_config(&Config::from_env()).await?;
//! let orchestrator = &services.orchestrator;
//!
//! if let HoldOutcome::Held(hold) = orchestrator.hold(HoldRequest::new(showtime, seats)).await? {
//!     orchestrator.confirm(hold.hold_id, PaymentMethod::Cash).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod hold;
pub mod notifications;
pub mod orchestrator;
pub mod seat_lock;
pub mod sweeper;

pub use bootstrap::{BootstrapError, ServerOrchestrator, Services};
pub use config::Config;
pub use error::{BookingError, Result};
pub use hold::HoldRecord;
pub use notifications::{BookingEvent, LogNotifier};
pub use orchestrator::{
    BookingOrchestrator, BookingSettings, CancelOutcome, ConfirmOutcome, HeldSeats,
    HoldOutcome, HoldRequest, PaymentOutcome, PaymentResult, SeatAvailability, SeatState,
    SweepReport,
};
pub use seat_lock::{SeatLockManager, SeatLockStatus};
pub use sweeper::spawn_expiry_sweeper;
