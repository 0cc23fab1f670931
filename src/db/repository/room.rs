use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::models::{decode_features, encode_features, CreateRoom, Room};
use crate::db::repository::RoomStore;
use crate::error::{AppError, AppResult};

fn map_row(r: &SqliteRow) -> AppResult<Room> {
    let features: String = r.get("features");
    Ok(Room {
        id: r.get("id"),
        name: r.get("name"),
        capacity: r.get("capacity"),
        description: r.get("description"),
        floor: r.get("floor"),
        features: decode_features(&features).map_err(AppError::Storage)?,
    })
}

/// Repository for the `rooms` table.
pub struct SqliteRoomRepository {
    pool: SqlitePool,
}

impl SqliteRoomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomStore for SqliteRoomRepository {
    async fn fetch_all(&self) -> AppResult<Vec<Room>> {
        let rows = sqlx::query(
            "SELECT id, name, capacity, description, floor, features FROM rooms ORDER BY floor, name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        rows.iter().map(map_row).collect()
    }

    async fn fetch_by_id(&self, id: &str) -> AppResult<Option<Room>> {
        let row = sqlx::query(
            "SELECT id, name, capacity, description, floor, features FROM rooms WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        row.as_ref().map(map_row).transpose()
    }

    async fn insert(&self, room: CreateRoom) -> AppResult<Room> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO rooms (id, name, capacity, description, floor, features)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&room.name)
        .bind(room.capacity)
        .bind(&room.description)
        .bind(room.floor)
        .bind(encode_features(&room.features))
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(Room {
            id,
            name: room.name,
            capacity: room.capacity,
            description: room.description,
            floor: room.floor,
            features: room.features,
        })
    }

    async fn clear(&self) -> AppResult<()> {
        sqlx::query("DELETE FROM rooms")
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
