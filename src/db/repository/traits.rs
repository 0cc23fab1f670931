//! Store capabilities consumed by the services.
//!
//! Each store has a SQLite implementation and an in-memory one
//! (`crate::db::repository::memory`). Listing methods return reservations
//! ordered by start time, then id, so overlap reports are deterministic.

use async_trait::async_trait;

use crate::db::models::{CreateRoom, CreateUser, Reservation, Room, User};
use crate::error::AppResult;
use crate::scheduling::TimeRange;

#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn fetch_all(&self) -> AppResult<Vec<Reservation>>;

    async fn fetch_by_id(&self, id: &str) -> AppResult<Option<Reservation>>;

    /// Every reservation of a room, any status.
    async fn fetch_by_room(&self, room_id: &str) -> AppResult<Vec<Reservation>>;

    async fn fetch_by_user(&self, user_id: &str) -> AppResult<Vec<Reservation>>;

    /// Reservations (any status) overlapping `range`, optionally restricted to
    /// a set of rooms and/or one user. An empty `room_ids` slice means no room
    /// filter.
    async fn fetch_overlapping(
        &self,
        range: &TimeRange,
        room_ids: Option<&[String]>,
        user_id: Option<&str>,
    ) -> AppResult<Vec<Reservation>>;

    async fn insert(&self, reservation: Reservation) -> AppResult<Reservation>;

    /// Overwrite a stored reservation and stamp `updated_at`.
    /// Fails with `AppError::NotFound` if the id is unknown.
    async fn replace(&self, reservation: Reservation) -> AppResult<Reservation>;

    /// Returns `false` if nothing was deleted.
    async fn remove(&self, id: &str) -> AppResult<bool>;

    async fn clear(&self) -> AppResult<()>;
}

#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn fetch_all(&self) -> AppResult<Vec<Room>>;

    async fn fetch_by_id(&self, id: &str) -> AppResult<Option<Room>>;

    async fn insert(&self, room: CreateRoom) -> AppResult<Room>;

    async fn clear(&self) -> AppResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn fetch_all(&self) -> AppResult<Vec<User>>;

    async fn fetch_by_id(&self, id: &str) -> AppResult<Option<User>>;

    async fn fetch_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn insert(&self, user: CreateUser) -> AppResult<User>;

    async fn clear(&self) -> AppResult<()>;
}
