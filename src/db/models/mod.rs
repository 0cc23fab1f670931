//! Domain entities persisted by the stores in `crate::db::repository`.
//!
//! Reservations reference rooms and users by id; nothing here owns a
//! collection of another entity.

pub mod reservation;
pub mod reservation_status;
pub mod room;
pub mod user;

pub use self::reservation::*;
pub use self::reservation_status::*;
pub use self::room::*;
pub use self::user::*;
