//! In-memory stores used by the `memory` storage backend and by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{CreateRoom, CreateUser, Reservation, Room, User};
use crate::db::repository::{ReservationStore, RoomStore, UserStore};
use crate::error::{AppError, AppResult};
use crate::scheduling::TimeRange;

fn sorted(mut reservations: Vec<Reservation>) -> Vec<Reservation> {
    reservations.sort_by(|a, b| {
        a.range
            .start
            .cmp(&b.range.start)
            .then_with(|| a.id.cmp(&b.id))
    });
    reservations
}

#[derive(Default)]
pub struct InMemoryReservationStore {
    reservations: RwLock<HashMap<String, Reservation>>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn collect<F>(&self, keep: F) -> Vec<Reservation>
    where
        F: Fn(&Reservation) -> bool,
    {
        let guard = self.reservations.read().await;
        sorted(guard.values().filter(|r| keep(r)).cloned().collect())
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn fetch_all(&self) -> AppResult<Vec<Reservation>> {
        Ok(self.collect(|_| true).await)
    }

    async fn fetch_by_id(&self, id: &str) -> AppResult<Option<Reservation>> {
        Ok(self.reservations.read().await.get(id).cloned())
    }

    async fn fetch_by_room(&self, room_id: &str) -> AppResult<Vec<Reservation>> {
        Ok(self.collect(|r| r.room_id == room_id).await)
    }

    async fn fetch_by_user(&self, user_id: &str) -> AppResult<Vec<Reservation>> {
        Ok(self.collect(|r| r.user_id == user_id).await)
    }

    async fn fetch_overlapping(
        &self,
        range: &TimeRange,
        room_ids: Option<&[String]>,
        user_id: Option<&str>,
    ) -> AppResult<Vec<Reservation>> {
        let room_ids = room_ids.filter(|ids| !ids.is_empty());
        Ok(self
            .collect(|r| {
                r.range.overlaps(range)
                    && room_ids.map_or(true, |ids| ids.contains(&r.room_id))
                    && user_id.map_or(true, |u| r.user_id == u)
            })
            .await)
    }

    async fn insert(&self, reservation: Reservation) -> AppResult<Reservation> {
        let mut guard = self.reservations.write().await;
        if guard.contains_key(&reservation.id) {
            return Err(AppError::Conflict(format!(
                "Reservation {} already exists",
                reservation.id
            )));
        }
        guard.insert(reservation.id.clone(), reservation.clone());
        Ok(reservation)
    }

    async fn replace(&self, mut reservation: Reservation) -> AppResult<Reservation> {
        let mut guard = self.reservations.write().await;
        let slot = guard.get_mut(&reservation.id).ok_or_else(|| {
            AppError::NotFound(format!("Reservation {} not found", reservation.id))
        })?;
        reservation.updated_at = Some(Utc::now().naive_utc());
        *slot = reservation.clone();
        Ok(reservation)
    }

    async fn remove(&self, id: &str) -> AppResult<bool> {
        Ok(self.reservations.write().await.remove(id).is_some())
    }

    async fn clear(&self) -> AppResult<()> {
        self.reservations.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryRoomStore {
    rooms: RwLock<HashMap<String, Room>>,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn fetch_all(&self) -> AppResult<Vec<Room>> {
        let mut rooms: Vec<Room> = self.rooms.read().await.values().cloned().collect();
        rooms.sort_by(|a, b| a.floor.cmp(&b.floor).then_with(|| a.name.cmp(&b.name)));
        Ok(rooms)
    }

    async fn fetch_by_id(&self, id: &str) -> AppResult<Option<Room>> {
        Ok(self.rooms.read().await.get(id).cloned())
    }

    async fn insert(&self, room: CreateRoom) -> AppResult<Room> {
        let room = Room {
            id: Uuid::new_v4().to_string(),
            name: room.name,
            capacity: room.capacity,
            description: room.description,
            floor: room.floor,
            features: room.features,
        };
        self.rooms
            .write()
            .await
            .insert(room.id.clone(), room.clone());
        Ok(room)
    }

    async fn clear(&self) -> AppResult<()> {
        self.rooms.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn fetch_all(&self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn fetch_by_id(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn fetch_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .fetch_all()
            .await?
            .into_iter()
            .find(|u| u.email == email))
    }

    async fn insert(&self, user: CreateUser) -> AppResult<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: user.name,
            email: user.email,
            department: user.department,
        };
        self.users
            .write()
            .await
            .insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn clear(&self) -> AppResult<()> {
        self.users.write().await.clear();
        Ok(())
    }
}
