use crate::db::models::Reservation;

/// Why a reservation write or cancellation was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConflictError {
    #[error("End time must be after start time")]
    InvalidRange,

    #[error("Cannot create reservations in the past")]
    PastReservation,

    #[error(
        "Reservation overlaps with an existing reservation from {} to {}",
        .with.range.start,
        .with.range.end
    )]
    Overlap { with: Box<Reservation> },

    #[error("Reservation is already cancelled")]
    AlreadyCancelled,

    #[error("Only the user who created the reservation can cancel it")]
    NotOwner,

    #[error("Cannot cancel reservations that have already started or ended")]
    AlreadyStarted,
}
