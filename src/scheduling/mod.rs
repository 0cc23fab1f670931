//! Reservation scheduling rules.
//!
//! Everything in here is synchronous and free of I/O: callers load the
//! reservations they need, pass in the current instant, and apply the
//! decision through the stores themselves.
//!
//! - [`conflict`]: whether a reservation may be written or cancelled.
//! - [`window`]: snapping requested calendar ranges to day/week/month windows.
//! - [`range`]: the half-open [`TimeRange`] both of them work on.

pub mod conflict;
pub mod error;
pub mod range;
pub mod window;

pub use conflict::{validate_cancellation, validate_creation};
pub use error::ConflictError;
pub use range::TimeRange;
pub use window::{CalendarViewType, CalendarWindow};
