use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::routes::{parse_instant, require_instant};
use crate::scheduling::CalendarViewType;
use crate::services::calendar::{CalendarQuery, CalendarService, CalendarView};
use crate::services::init::seed_demo_data;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_calendar))
        .route("/current-week", get(get_current_week))
        .route("/current-month", get(get_current_month))
        .route("/room/:room_id", get(get_room_calendar))
        .route("/debug/reset-data", post(reset_data))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub view_type: Option<String>,
    /// Comma-separated room ids
    pub room_ids: Option<String>,
    pub user_id: Option<String>,
    pub current_user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCalendarParams {
    pub start_date: Option<String>,
    pub view_type: Option<String>,
    pub current_user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerParams {
    pub current_user_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_view_type(raw: Option<&str>) -> AppResult<CalendarViewType> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(CalendarViewType::default()),
        Some(v) => CalendarViewType::from_str(v)
            .ok_or_else(|| AppError::Validation("Invalid view type.".to_string())),
    }
}

fn parse_room_ids(raw: Option<String>) -> Option<Vec<String>> {
    let ids: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    (!ids.is_empty()).then_some(ids)
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CalendarParams>,
) -> AppResult<Json<CalendarView>> {
    let query = CalendarQuery {
        start: require_instant(params.start_date.as_deref(), "Start date")?,
        end: require_instant(params.end_date.as_deref(), "End date")?,
        view_type: parse_view_type(params.view_type.as_deref())?,
        room_ids: parse_room_ids(params.room_ids),
        user_id: non_empty(params.user_id),
    };
    CalendarService::validate_query(&query, state.config.calendar.max_range_days)?;

    tracing::info!(
        "Getting calendar data from {} to {}",
        query.start.date(),
        query.end.date()
    );

    let current_user_id = non_empty(params.current_user_id);
    let view = CalendarService::view(&state, query, current_user_id.as_deref()).await?;
    Ok(Json(view))
}

async fn get_current_week(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ViewerParams>,
) -> AppResult<Json<CalendarView>> {
    let current_user_id = non_empty(params.current_user_id);
    let view = CalendarService::current_week(&state, current_user_id.as_deref()).await?;
    Ok(Json(view))
}

async fn get_current_month(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ViewerParams>,
) -> AppResult<Json<CalendarView>> {
    let current_user_id = non_empty(params.current_user_id);
    let view = CalendarService::current_month(&state, current_user_id.as_deref()).await?;
    Ok(Json(view))
}

async fn get_room_calendar(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(params): Query<RoomCalendarParams>,
) -> AppResult<Json<CalendarView>> {
    let start_date = match non_empty(params.start_date) {
        Some(raw) => Some(
            parse_instant(&raw)
                .ok_or_else(|| AppError::Validation("Start date is not valid.".to_string()))?
                .date(),
        ),
        None => None,
    };
    let view_type = parse_view_type(params.view_type.as_deref())?;
    let current_user_id = non_empty(params.current_user_id);

    tracing::info!("Getting {} calendar for room {}", view_type.as_str(), room_id);

    let view = CalendarService::room(
        &state,
        &room_id,
        start_date,
        view_type,
        current_user_id.as_deref(),
    )
    .await?;
    Ok(Json(view))
}

/// Wipe and re-seed the demo dataset. Only reachable from loopback clients
/// with debug endpoints enabled.
async fn reset_data(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> AppResult<Json<serde_json::Value>> {
    if !state.config.server.debug_endpoints {
        return Err(AppError::NotFound("Debug endpoints are disabled".to_string()));
    }
    if !addr.ip().is_loopback() {
        return Err(AppError::Forbidden(
            "This endpoint is only available from localhost".to_string(),
        ));
    }

    tracing::warn!("Data reset initiated from debug endpoint by {}", addr);
    seed_demo_data(&state).await?;

    Ok(Json(json!({ "message": "Database has been reset successfully!" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::routes::test_support::{app, empty, get, send, state_with};
    use axum::extract::connect_info::MockConnectInfo;
    use chrono::{Datelike, Utc};
    use http::StatusCode;

    #[test]
    fn room_id_lists() {
        assert_eq!(
            parse_room_ids(Some(" a, b ,,c ".to_string())),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(parse_room_ids(Some(" , ".to_string())), None);
        assert_eq!(parse_room_ids(None), None);
    }

    #[test]
    fn view_types_default_to_week() {
        assert_eq!(parse_view_type(None).unwrap(), CalendarViewType::Week);
        assert_eq!(parse_view_type(Some("MONTH")).unwrap(), CalendarViewType::Month);
        assert!(parse_view_type(Some("fortnight")).is_err());
    }

    #[tokio::test]
    async fn calendar_query_is_normalized_and_validated() {
        let state = state_with(Config::default());

        let (status, view) = send(
            app(state.clone()),
            get("/api/calendar?startDate=2031-03-16&endDate=2031-03-17&viewType=week"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["startDate"], "2031-03-10T00:00:00");
        assert_eq!(view["endDate"], "2031-03-17T00:00:00");
        assert_eq!(view["viewType"], "Week");
        assert_eq!(view["reservations"], serde_json::json!([]));

        let (status, err) = send(
            app(state.clone()),
            get("/api/calendar?startDate=2031-01-01&endDate=2031-03-01&viewType=Month"),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = send(app(state.clone()), get("/api/calendar?endDate=2031-03-01")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            app(state),
            get("/api/calendar?startDate=2031-03-01&endDate=2031-03-02&viewType=Year"),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn current_windows_cover_seeded_data() {
        let state = state_with(Config::default());
        seed_demo_data(&state).await.unwrap();

        let (status, week) = send(app(state.clone()), get("/api/calendar/current-week")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(week["viewType"], "Week");
        // Today's three meetings always fall inside the current week.
        assert!(week["reservations"].as_array().unwrap().len() >= 3);

        let (status, month) = send(app(state), get("/api/calendar/current-month")).await;
        assert_eq!(status, StatusCode::OK);
        let first = Utc::now().date_naive().with_day(1).unwrap();
        assert_eq!(
            month["startDate"],
            first.and_hms_opt(0, 0, 0).unwrap().format("%Y-%m-%dT%H:%M:%S").to_string()
        );
    }

    #[tokio::test]
    async fn room_calendar_day_view() {
        let state = state_with(Config::default());
        seed_demo_data(&state).await.unwrap();
        let room = state.rooms.fetch_all().await.unwrap().remove(0);
        let today = Utc::now().date_naive();

        let (status, view) = send(
            app(state.clone()),
            get(&format!(
                "/api/calendar/room/{}?startDate={}&viewType=Day",
                room.id, today
            )),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let entries = view["reservations"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["title"], "Daily Stand-up");
        assert_eq!(entries[0]["roomName"], room.name);
        assert_eq!(view["roomNames"][&room.id], room.name);

        let (status, _) = send(app(state), get("/api/calendar/room/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reset_requires_debug_flag_and_loopback() {
        let disabled = state_with(Config::default());
        let (status, _) = send(app(disabled), empty("POST", "/api/calendar/debug/reset-data")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let mut config = Config::default();
        config.server.debug_endpoints = true;
        let state = state_with(config);

        let (status, body) = send(app(state.clone()), empty("POST", "/api/calendar/debug/reset-data")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Database has been reset successfully!");
        assert_eq!(state.rooms.fetch_all().await.unwrap().len(), 4);

        let remote = crate::app_router(state, crate::routes::reservations::write_router())
            .layer(MockConnectInfo(SocketAddr::from(([10, 1, 2, 3], 5000))));
        let (status, _) = send(remote, empty("POST", "/api/calendar/debug/reset-data")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
