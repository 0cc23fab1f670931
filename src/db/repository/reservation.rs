use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db::models::{Reservation, ReservationStatus};
use crate::db::repository::ReservationStore;
use crate::error::{AppError, AppResult};
use crate::scheduling::TimeRange;

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, room_id, user_id, start_time, end_time,
        purpose, notes, status, created_at, updated_at
    FROM reservations
"#;

fn map_row(r: &SqliteRow) -> AppResult<Reservation> {
    let status: String = r.get("status");
    Ok(Reservation {
        id: r.get("id"),
        room_id: r.get("room_id"),
        user_id: r.get("user_id"),
        range: TimeRange::new(r.get("start_time"), r.get("end_time")),
        purpose: r.get("purpose"),
        notes: r.get("notes"),
        status: ReservationStatus::try_from(status).map_err(AppError::Storage)?,
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

fn map_rows(rows: Vec<SqliteRow>) -> AppResult<Vec<Reservation>> {
    rows.iter().map(map_row).collect()
}

/// Repository for the `reservations` table.
pub struct SqliteReservationRepository {
    pool: SqlitePool,
}

impl SqliteReservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationStore for SqliteReservationRepository {
    async fn fetch_all(&self) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY start_time, id"))
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        map_rows(rows)
    }

    async fn fetch_by_id(&self, id: &str) -> AppResult<Option<Reservation>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        row.as_ref().map(map_row).transpose()
    }

    async fn fetch_by_room(&self, room_id: &str) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE room_id = ? ORDER BY start_time, id"
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        map_rows(rows)
    }

    async fn fetch_by_user(&self, user_id: &str) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE user_id = ? ORDER BY start_time, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        map_rows(rows)
    }

    async fn fetch_overlapping(
        &self,
        range: &TimeRange,
        room_ids: Option<&[String]>,
        user_id: Option<&str>,
    ) -> AppResult<Vec<Reservation>> {
        // Room filter travels as a JSON array and is expanded with json_each.
        let room_filter = match room_ids {
            Some(ids) if !ids.is_empty() => Some(
                serde_json::to_string(ids).map_err(|e| AppError::Internal(e.into()))?,
            ),
            _ => None,
        };

        let rows = sqlx::query(&format!(
            r#"{SELECT_COLUMNS}
            WHERE start_time < ? AND end_time > ?
            AND (? IS NULL OR room_id IN (SELECT value FROM json_each(?)))
            AND (? IS NULL OR user_id = ?)
            ORDER BY start_time, id"#
        ))
        .bind(range.end)
        .bind(range.start)
        .bind(&room_filter)
        .bind(&room_filter)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        map_rows(rows)
    }

    async fn insert(&self, reservation: Reservation) -> AppResult<Reservation> {
        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, room_id, user_id, start_time, end_time,
                purpose, notes, status, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&reservation.id)
        .bind(&reservation.room_id)
        .bind(&reservation.user_id)
        .bind(reservation.range.start)
        .bind(reservation.range.end)
        .bind(&reservation.purpose)
        .bind(&reservation.notes)
        .bind(reservation.status.as_str())
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(reservation)
    }

    async fn replace(&self, mut reservation: Reservation) -> AppResult<Reservation> {
        let now = Utc::now().naive_utc();
        reservation.updated_at = Some(now);

        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET room_id = ?,
                user_id = ?,
                start_time = ?,
                end_time = ?,
                purpose = ?,
                notes = ?,
                status = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&reservation.room_id)
        .bind(&reservation.user_id)
        .bind(reservation.range.start)
        .bind(reservation.range.end)
        .bind(&reservation.purpose)
        .bind(&reservation.notes)
        .bind(reservation.status.as_str())
        .bind(now)
        .bind(&reservation.id)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Reservation {} not found",
                reservation.id
            )));
        }

        Ok(reservation)
    }

    async fn remove(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> AppResult<()> {
        sqlx::query("DELETE FROM reservations")
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
