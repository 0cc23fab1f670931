use std::collections::HashSet;

use crate::db::models::Room;
use crate::error::{AppError, AppResult};
use crate::scheduling::TimeRange;
use crate::AppState;

pub struct RoomService;

impl RoomService {
    pub async fn list(state: &AppState) -> AppResult<Vec<Room>> {
        state.rooms.fetch_all().await
    }

    pub async fn get(state: &AppState, id: &str) -> AppResult<Room> {
        state
            .rooms
            .fetch_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", id)))
    }

    /// Rooms with no active reservation overlapping `range`.
    pub async fn available(state: &AppState, range: TimeRange) -> AppResult<Vec<Room>> {
        if !range.is_valid() {
            return Err(AppError::BadRequest(
                "End time must be after start time.".to_string(),
            ));
        }

        let busy: HashSet<String> = state
            .reservations
            .fetch_overlapping(&range, None, None)
            .await?
            .into_iter()
            .filter(|r| r.status.is_active())
            .map(|r| r.room_id)
            .collect();

        let rooms: Vec<Room> = state
            .rooms
            .fetch_all()
            .await?
            .into_iter()
            .filter(|room| !busy.contains(&room.id))
            .collect();

        tracing::debug!(
            "{} rooms available between {} and {}",
            rooms.len(),
            range.start,
            range.end
        );
        Ok(rooms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CreateRoom, Reservation, ReservationStatus};
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Arc;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 6, 12)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    async fn add_room(state: &AppState, name: &str) -> Room {
        state
            .rooms
            .insert(CreateRoom {
                name: name.to_string(),
                capacity: 8,
                description: None,
                floor: 1,
                features: Vec::new(),
            })
            .await
            .unwrap()
    }

    async fn book(state: &AppState, id: &str, room: &Room, start: u32, end: u32, status: ReservationStatus) {
        state
            .reservations
            .insert(Reservation {
                id: id.to_string(),
                room_id: room.id.clone(),
                user_id: "u1".to_string(),
                range: TimeRange::new(at(start), at(end)),
                purpose: None,
                notes: None,
                status,
                created_at: at(0),
                updated_at: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_and_touching_reservations_do_not_block() {
        let state = Arc::new(AppState::in_memory(crate::config::Config::default()));
        let busy = add_room(&state, "Busy").await;
        let cancelled = add_room(&state, "Cancelled").await;
        let touching = add_room(&state, "Touching").await;
        let empty = add_room(&state, "Empty").await;

        book(&state, "1", &busy, 9, 11, ReservationStatus::Confirmed).await;
        book(&state, "2", &cancelled, 9, 11, ReservationStatus::Cancelled).await;
        book(&state, "3", &touching, 11, 12, ReservationStatus::Pending).await;

        let names: Vec<String> = RoomService::available(&state, TimeRange::new(at(10), at(11)))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();

        assert!(!names.contains(&busy.name));
        assert!(names.contains(&cancelled.name));
        assert!(names.contains(&touching.name));
        assert!(names.contains(&empty.name));
    }

    #[tokio::test]
    async fn inverted_window_is_rejected() {
        let state = AppState::in_memory(crate::config::Config::default());
        let result = RoomService::available(&state, TimeRange::new(at(11), at(11))).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
