use chrono::Utc;
use uuid::Uuid;

use crate::db::models::{CreateReservation, Reservation, ReservationStatus};
use crate::error::{AppError, AppResult};
use crate::scheduling::{validate_cancellation, validate_creation};
use crate::AppState;

const MAX_PURPOSE_CHARS: usize = 500;
const MAX_NOTES_CHARS: usize = 2000;

pub struct ReservationService;

impl ReservationService {
    /// Shape checks on a create/update payload that need no store access.
    pub fn validate_request(input: &CreateReservation) -> AppResult<()> {
        if input.room_id.trim().is_empty() {
            return Err(AppError::Validation("Room ID is required.".to_string()));
        }
        if input.user_id.trim().is_empty() {
            return Err(AppError::Validation("User ID is required.".to_string()));
        }
        if let Some(ref purpose) = input.purpose {
            if purpose.chars().count() > MAX_PURPOSE_CHARS {
                return Err(AppError::Validation(format!(
                    "Purpose cannot exceed {} characters.",
                    MAX_PURPOSE_CHARS
                )));
            }
        }
        if let Some(ref notes) = input.notes {
            if notes.chars().count() > MAX_NOTES_CHARS {
                return Err(AppError::Validation(format!(
                    "Notes cannot exceed {} characters.",
                    MAX_NOTES_CHARS
                )));
            }
        }
        Ok(())
    }

    async fn ensure_references(state: &AppState, input: &CreateReservation) -> AppResult<()> {
        if state.rooms.fetch_by_id(&input.room_id).await?.is_none() {
            return Err(AppError::NotFound("Room not found.".to_string()));
        }
        if state.users.fetch_by_id(&input.user_id).await?.is_none() {
            return Err(AppError::NotFound("User not found.".to_string()));
        }
        Ok(())
    }

    async fn load(state: &AppState, id: &str) -> AppResult<Reservation> {
        state
            .reservations
            .fetch_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    pub async fn list(state: &AppState) -> AppResult<Vec<Reservation>> {
        let reservations = state.reservations.fetch_all().await?;
        tracing::debug!("Listing {} reservations", reservations.len());
        Ok(reservations)
    }

    pub async fn get(state: &AppState, id: &str) -> AppResult<Reservation> {
        Self::load(state, id).await
    }

    pub async fn list_for_user(state: &AppState, user_id: &str) -> AppResult<Vec<Reservation>> {
        if state.users.fetch_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        state.reservations.fetch_by_user(user_id).await
    }

    /// Create a reservation in `Pending` status.
    pub async fn create(state: &AppState, input: CreateReservation) -> AppResult<Reservation> {
        Self::validate_request(&input)?;
        Self::ensure_references(state, &input).await?;

        let _guards = state.room_locks.acquire(&[input.room_id.as_str()]).await;

        let now = Utc::now().naive_utc();
        let candidate = input.into_pending(Uuid::new_v4().to_string(), now);
        let room_reservations = state.reservations.fetch_by_room(&candidate.room_id).await?;

        if let Err(e) = validate_creation(&candidate, &room_reservations, now) {
            tracing::info!(
                "Rejected reservation for room {} by user {}: {}",
                candidate.room_id,
                candidate.user_id,
                e
            );
            return Err(e.into());
        }

        let stored = state.reservations.insert(candidate).await?;
        tracing::info!(
            "Created reservation {} for room {} ({} - {})",
            stored.id,
            stored.room_id,
            stored.range.start,
            stored.range.end
        );
        tracing::debug!("Room locks in use: {}", state.room_locks.tracked_rooms());
        Ok(stored)
    }

    /// Replace room, user, times, purpose and notes of an existing reservation.
    /// The status is left untouched.
    pub async fn update(
        state: &AppState,
        id: &str,
        input: CreateReservation,
    ) -> AppResult<Reservation> {
        Self::validate_request(&input)?;
        let current = Self::load(state, id).await?;
        Self::ensure_references(state, &input).await?;

        let _guards = state
            .room_locks
            .acquire(&[current.room_id.as_str(), input.room_id.as_str()])
            .await;

        // Re-read under the lock; a concurrent update may have moved it.
        let mut reservation = Self::load(state, id).await?;
        if reservation.room_id != current.room_id {
            return Err(AppError::Conflict(format!(
                "Reservation {} was modified concurrently, please retry",
                id
            )));
        }

        reservation.room_id = input.room_id;
        reservation.user_id = input.user_id;
        reservation.range = input.range;
        reservation.purpose = input.purpose;
        reservation.notes = input.notes;

        let now = Utc::now().naive_utc();
        let room_reservations = state
            .reservations
            .fetch_by_room(&reservation.room_id)
            .await?;
        validate_creation(&reservation, &room_reservations, now)?;

        let updated = state.reservations.replace(reservation).await?;
        tracing::info!("Updated reservation {}", updated.id);
        Ok(updated)
    }

    /// Cancel on behalf of `user_id`, who must own the reservation.
    pub async fn cancel(state: &AppState, id: &str, user_id: &str) -> AppResult<Reservation> {
        let current = Self::load(state, id).await?;
        let _guards = state.room_locks.acquire(&[current.room_id.as_str()]).await;

        let mut reservation = Self::load(state, id).await?;
        let now = Utc::now().naive_utc();
        validate_cancellation(&reservation, user_id, now)?;

        reservation.status = ReservationStatus::Cancelled;
        let cancelled = state.reservations.replace(reservation).await?;
        tracing::info!("Cancelled reservation {} by user {}", cancelled.id, user_id);
        Ok(cancelled)
    }

    /// Hard delete. Returns `false` when nothing matched.
    pub async fn delete(state: &AppState, id: &str) -> AppResult<bool> {
        let Some(current) = state.reservations.fetch_by_id(id).await? else {
            return Ok(false);
        };
        let _guards = state.room_locks.acquire(&[current.room_id.as_str()]).await;

        let removed = state.reservations.remove(id).await?;
        if removed {
            tracing::info!("Deleted reservation {}", id);
        }
        Ok(removed)
    }
}
