use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::Room;
use crate::error::{AppError, AppResult};
use crate::routes::parse_instant;
use crate::scheduling::TimeRange;
use crate::services::rooms::RoomService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_rooms))
        .route("/available", get(available_rooms))
        .route("/:id", get(get_room))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

async fn list_rooms(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Room>>> {
    Ok(Json(RoomService::list(&state).await?))
}

async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Room>> {
    Ok(Json(RoomService::get(&state, &id).await?))
}

/// Rooms free for the whole `[startTime, endTime)` slot.
async fn available_rooms(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<Vec<Room>>> {
    let parse = |raw: Option<&str>, name: &str| {
        raw.and_then(parse_instant)
            .ok_or_else(|| AppError::BadRequest(format!("{} must be a valid date/time", name)))
    };
    let start = parse(query.start_time.as_deref(), "startTime")?;
    let end = parse(query.end_time.as_deref(), "endTime")?;

    let rooms = RoomService::available(&state, TimeRange::new(start, end)).await?;
    Ok(Json(rooms))
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::routes::test_support::{app, get, send, state_with};
    use crate::services::init::seed_demo_data;
    use http::StatusCode;

    #[tokio::test]
    async fn list_and_fetch_rooms() {
        let state = state_with(Config::default());
        seed_demo_data(&state).await.unwrap();

        let (status, rooms) = send(app(state.clone()), get("/api/rooms")).await;
        assert_eq!(status, StatusCode::OK);
        let rooms = rooms.as_array().unwrap().clone();
        assert_eq!(rooms.len(), 4);
        // Ordered by floor, then name.
        assert_eq!(rooms[0]["name"], "Executive Meeting Room");
        assert_eq!(rooms[0]["features"][4], "TVScreen");

        let id = rooms[1]["id"].as_str().unwrap();
        let (status, room) = send(app(state.clone()), get(&format!("/api/rooms/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(room["id"], id);

        let (status, err) = send(app(state), get("/api/rooms/unknown")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn availability_window_must_be_ordered() {
        let state = state_with(Config::default());
        seed_demo_data(&state).await.unwrap();

        let (status, _) = send(
            app(state.clone()),
            get("/api/rooms/available?startTime=2030-06-12T10:00:00&endTime=2030-06-12T10:00:00"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(app(state.clone()), get("/api/rooms/available?startTime=soon")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, rooms) = send(
            app(state),
            get("/api/rooms/available?startTime=2030-06-12T10:00:00&endTime=2030-06-12T11:00:00"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rooms.as_array().unwrap().len(), 4);
    }
}
