use chrono::NaiveDateTime;

use super::ConflictError;
use crate::db::models::{Reservation, ReservationStatus};

/// Decide whether `candidate` may be written given every existing reservation
/// of its room.
///
/// Checks run in a fixed order and the first failure is returned:
/// ordering of the range, start strictly after `now`, then overlap with any
/// non-cancelled reservation other than the candidate itself (on update the
/// stored copy of the candidate is skipped by id). The overlap reported is the
/// first one met in `room_reservations` order.
pub fn validate_creation<'a, I>(
    candidate: &Reservation,
    room_reservations: I,
    now: NaiveDateTime,
) -> Result<(), ConflictError>
where
    I: IntoIterator<Item = &'a Reservation>,
{
    if !candidate.range.is_valid() {
        return Err(ConflictError::InvalidRange);
    }

    // A reservation starting exactly now is already in the past.
    if candidate.range.start <= now {
        return Err(ConflictError::PastReservation);
    }

    let conflict = room_reservations.into_iter().find(|existing| {
        existing.status != ReservationStatus::Cancelled
            && existing.id != candidate.id
            && existing.overlaps_with(candidate)
    });

    match conflict {
        Some(existing) => Err(ConflictError::Overlap {
            with: Box::new(existing.clone()),
        }),
        None => Ok(()),
    }
}

/// Decide whether `requesting_user_id` may cancel `target`.
///
/// Only the start time is compared with `now`: a reservation that is in
/// progress cannot be cancelled either.
pub fn validate_cancellation(
    target: &Reservation,
    requesting_user_id: &str,
    now: NaiveDateTime,
) -> Result<(), ConflictError> {
    if target.status == ReservationStatus::Cancelled {
        return Err(ConflictError::AlreadyCancelled);
    }

    if target.user_id != requesting_user_id {
        return Err(ConflictError::NotOwner);
    }

    if target.range.start <= now {
        return Err(ConflictError::AlreadyStarted);
    }

    Ok(())
}
