use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::ReservationStatus;
use crate::scheduling::TimeRange;

/// A booking of one room by one user. Room and user are referenced by id only;
/// names are resolved through the room/user stores when needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub range: TimeRange,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub status: ReservationStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl Reservation {
    pub fn overlaps_with(&self, other: &Reservation) -> bool {
        self.range.overlaps(&other.range)
    }
}

/// Fields supplied when creating a reservation. The store assigns the id,
/// the service decides the initial status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReservation {
    pub room_id: String,
    pub user_id: String,
    pub range: TimeRange,
    pub purpose: Option<String>,
    pub notes: Option<String>,
}

impl CreateReservation {
    /// Build the not-yet-persisted entity in `Pending` status.
    pub fn into_pending(self, id: String, now: NaiveDateTime) -> Reservation {
        Reservation {
            id,
            room_id: self.room_id,
            user_id: self.user_id,
            range: self.range,
            purpose: self.purpose,
            notes: self.notes,
            status: ReservationStatus::Pending,
            created_at: now,
            updated_at: None,
        }
    }
}
