use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::routes::reservations::{describe, ReservationResponse};
use crate::services::reservations::ReservationService;
use crate::AppState;

/// Router for user lookups
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users))
        .route("/by-email", get(get_user_by_email))
        .route("/:id", get(get_user))
        .route("/:id/reservations", get(get_user_reservations))
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

async fn list_users(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.users.fetch_all().await?))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    state
        .users
        .fetch_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
}

async fn get_user_by_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EmailQuery>,
) -> AppResult<Json<User>> {
    let email = query
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("Email is required.".to_string()))?;

    state
        .users
        .fetch_by_email(&email)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User with email {} not found", email)))
}

/// Every reservation owned by the user, any status.
async fn get_user_reservations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<ReservationResponse>>> {
    let reservations = ReservationService::list_for_user(&state, &id).await?;
    Ok(Json(describe(&state, reservations).await?))
}
