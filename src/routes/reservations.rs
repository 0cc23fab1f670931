use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::models::{CreateReservation, Reservation, ReservationStatus};
use crate::error::{AppError, AppResult};
use crate::routes::{deserialize_instant, ApiJson};
use crate::scheduling::TimeRange;
use crate::services::names::NameDirectory;
use crate::services::reservations::ReservationService;
use crate::AppState;

/// Read-only reservation endpoints.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_reservations))
        .route("/:id", get(get_reservation))
}

/// Reservation writes. Kept separate so the rate limiter can be layered on
/// these routes only.
pub fn write_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_reservation))
        .route("/:id", put(update_reservation).delete(delete_reservation))
        .route("/:id/cancel", patch(cancel_reservation))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(deserialize_with = "deserialize_instant")]
    pub start_time: NaiveDateTime,
    #[serde(deserialize_with = "deserialize_instant")]
    pub end_time: NaiveDateTime,
    pub purpose: Option<String>,
    pub notes: Option<String>,
}

impl From<ReservationRequest> for CreateReservation {
    fn from(req: ReservationRequest) -> Self {
        CreateReservation {
            room_id: req.room_id,
            user_id: req.user_id,
            range: TimeRange::new(req.start_time, req.end_time),
            purpose: req.purpose,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub id: String,
    pub room_id: String,
    pub room_name: Option<String>,
    pub user_id: String,
    pub user_name: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub status: ReservationStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl ReservationResponse {
    fn new(r: Reservation, names: &NameDirectory) -> Self {
        Self {
            room_name: names.room_name(&r.room_id).map(str::to_string),
            user_name: names.user_name(&r.user_id).map(str::to_string),
            id: r.id,
            room_id: r.room_id,
            user_id: r.user_id,
            start_time: r.range.start,
            end_time: r.range.end,
            purpose: r.purpose,
            notes: r.notes,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Resolve names for a batch and convert it for the wire.
pub async fn describe(
    state: &AppState,
    reservations: Vec<Reservation>,
) -> AppResult<Vec<ReservationResponse>> {
    let names = NameDirectory::load(state, &reservations).await?;
    Ok(reservations
        .into_iter()
        .map(|r| ReservationResponse::new(r, &names))
        .collect())
}

async fn describe_one(state: &AppState, reservation: Reservation) -> AppResult<ReservationResponse> {
    let names = NameDirectory::load(state, std::slice::from_ref(&reservation)).await?;
    Ok(ReservationResponse::new(reservation, &names))
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_reservations(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<ReservationResponse>>> {
    let reservations = ReservationService::list(&state).await?;
    Ok(Json(describe(&state, reservations).await?))
}

async fn get_reservation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ReservationResponse>> {
    let reservation = ReservationService::get(&state, &id).await?;
    Ok(Json(describe_one(&state, reservation).await?))
}

async fn create_reservation(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<ReservationRequest>,
) -> AppResult<(StatusCode, Json<ReservationResponse>)> {
    let created = ReservationService::create(&state, body.into()).await?;
    Ok((StatusCode::CREATED, Json(describe_one(&state, created).await?)))
}

async fn update_reservation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ReservationRequest>,
) -> AppResult<Json<ReservationResponse>> {
    let updated = ReservationService::update(&state, &id, body.into()).await?;
    Ok(Json(describe_one(&state, updated).await?))
}

async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<CancelQuery>,
) -> AppResult<Json<ReservationResponse>> {
    let user_id = query
        .user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::Validation("User ID is required.".to_string()))?;

    let cancelled = ReservationService::cancel(&state, &id, &user_id).await?;
    Ok(Json(describe_one(&state, cancelled).await?))
}

async fn delete_reservation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if ReservationService::delete(&state, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Reservation {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::models::{CreateRoom, CreateUser};
    use axum::body::Body;
    use http::Request;
    use crate::routes::test_support::{app, empty, get, json, send, state_with};
    use chrono::{Duration, Utc};
    use serde_json::json;

    struct Ids {
        room: String,
        alice: String,
        bob: String,
    }

    async fn setup(state: &AppState) -> Ids {
        let room = state
            .rooms
            .insert(CreateRoom {
                name: "Focus".to_string(),
                capacity: 4,
                description: None,
                floor: 1,
                features: Vec::new(),
            })
            .await
            .unwrap();
        let mut users = Vec::new();
        for name in ["Alice", "Bob"] {
            users.push(
                state
                    .users
                    .insert(CreateUser {
                        name: name.to_string(),
                        email: format!("{}@example.com", name.to_lowercase()),
                        department: None,
                    })
                    .await
                    .unwrap(),
            );
        }
        Ids {
            room: room.id,
            alice: users[0].id.clone(),
            bob: users[1].id.clone(),
        }
    }

    fn slot(hour: i64, hours: i64) -> (String, String) {
        let base = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap() + Duration::days(1);
        let start = base + Duration::hours(hour);
        let end = start + Duration::hours(hours);
        (
            start.format("%Y-%m-%dT%H:%M:%S").to_string(),
            end.format("%Y-%m-%dT%H:%M:%S").to_string(),
        )
    }

    fn body(room: &str, user: &str, hour: i64, hours: i64) -> serde_json::Value {
        let (start, end) = slot(hour, hours);
        json!({
            "roomId": room,
            "userId": user,
            "startTime": start,
            "endTime": end,
            "purpose": "Retro"
        })
    }

    #[tokio::test]
    async fn create_returns_201_with_resolved_names() {
        let state = state_with(Config::default());
        let ids = setup(&state).await;

        let (status, created) = send(
            app(state.clone()),
            json("POST", "/api/reservations", body(&ids.room, &ids.alice, 10, 1)),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "Pending");
        assert_eq!(created["roomName"], "Focus");
        assert_eq!(created["userName"], "Alice");

        let id = created["id"].as_str().unwrap().to_string();
        let (status, fetched) = send(app(state), get(&format!("/api/reservations/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["purpose"], "Retro");
    }

    #[tokio::test]
    async fn overlap_is_409_with_conflicting_reservation() {
        let state = state_with(Config::default());
        let ids = setup(&state).await;

        let (_, first) = send(
            app(state.clone()),
            json("POST", "/api/reservations", body(&ids.room, &ids.alice, 10, 2)),
        )
        .await;
        let (status, err) = send(
            app(state),
            json("POST", "/api/reservations", body(&ids.room, &ids.bob, 11, 1)),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["error"]["code"], "CONFLICT");
        assert_eq!(
            err["error"]["details"]["conflictingReservation"]["id"],
            first["id"]
        );
    }

    #[tokio::test]
    async fn invalid_payloads() {
        let state = state_with(Config::default());
        let ids = setup(&state).await;

        let (status, _) = send(
            app(state.clone()),
            json("POST", "/api/reservations", body(&ids.room, &ids.alice, 10, 0)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, err) = send(
            app(state.clone()),
            json("POST", "/api/reservations", body("", &ids.alice, 10, 1)),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = send(
            app(state),
            json("POST", "/api/reservations", body("missing-room", &ids.alice, 10, 1)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_bodies_use_the_error_envelope() {
        let state = state_with(Config::default());
        let ids = setup(&state).await;

        let mut bad_instant = body(&ids.room, &ids.alice, 10, 1);
        bad_instant["startTime"] = json!("not-a-date");
        let mut missing_end = body(&ids.room, &ids.alice, 10, 1);
        missing_end.as_object_mut().unwrap().remove("endTime");

        for payload in [bad_instant, missing_end] {
            let (status, err) = send(
                app(state.clone()),
                json("POST", "/api/reservations", payload),
            )
            .await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(err["error"]["code"], "VALIDATION_ERROR");
            assert!(err["error"]["message"].is_string());
        }

        let broken = Request::builder()
            .method("POST")
            .uri("/api/reservations")
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"roomId\":"))
            .unwrap();
        let (status, err) = send(app(state.clone()), broken).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err["error"]["code"], "VALIDATION_ERROR");
        assert!(ReservationService::list(&state).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_flow() {
        let state = state_with(Config::default());
        let ids = setup(&state).await;

        let (_, created) = send(
            app(state.clone()),
            json("POST", "/api/reservations", body(&ids.room, &ids.alice, 10, 1)),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();
        let cancel = |user: &str| empty("PATCH", &format!("/api/reservations/{}/cancel?userId={}", id, user));

        let (status, _) = send(app(state.clone()), cancel(&ids.bob)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, cancelled) = send(app(state.clone()), cancel(&ids.alice)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cancelled["status"], "Cancelled");
        assert!(cancelled["updatedAt"].is_string());

        let (status, _) = send(app(state.clone()), cancel(&ids.alice)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            app(state),
            empty("PATCH", &format!("/api/reservations/{}/cancel", id)),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let state = state_with(Config::default());
        let ids = setup(&state).await;

        let (_, created) = send(
            app(state.clone()),
            json("POST", "/api/reservations", body(&ids.room, &ids.alice, 10, 1)),
        )
        .await;
        let uri = format!("/api/reservations/{}", created["id"].as_str().unwrap());

        let (status, updated) = send(
            app(state.clone()),
            json("PUT", &uri, body(&ids.room, &ids.alice, 13, 2)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["endTime"], slot(13, 2).1);

        let (status, _) = send(app(state.clone()), empty("DELETE", &uri)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(app(state.clone()), empty("DELETE", &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(app(state), get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
