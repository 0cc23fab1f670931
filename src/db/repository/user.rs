use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::models::{CreateUser, User};
use crate::db::repository::UserStore;
use crate::error::{AppError, AppResult};

fn map_row(r: &SqliteRow) -> User {
    User {
        id: r.get("id"),
        name: r.get("name"),
        email: r.get("email"),
        department: r.get("department"),
    }
}

/// Repository for the `users` table.
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for SqliteUserRepository {
    async fn fetch_all(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query("SELECT id, name, email, department FROM users ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(rows.iter().map(map_row).collect())
    }

    async fn fetch_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT id, name, email, department FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row.as_ref().map(map_row))
    }

    async fn fetch_by_email(&self, email: &str) -> AppResult<Option<User>> {
        // Emails are not unique at this layer; the earliest-named match wins.
        let row = sqlx::query(
            "SELECT id, name, email, department FROM users WHERE email = ? ORDER BY name LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.as_ref().map(map_row))
    }

    async fn insert(&self, user: CreateUser) -> AppResult<User> {
        let id = Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO users (id, name, email, department) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.department)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(User {
            id,
            name: user.name,
            email: user.email,
            department: user.department,
        })
    }

    async fn clear(&self) -> AppResult<()> {
        sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
