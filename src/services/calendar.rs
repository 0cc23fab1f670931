//! Calendar views over reservations: a requested range is snapped to the
//! canonical day/week/month window, then every reservation overlapping it is
//! returned with room and user names resolved.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::db::models::{Reservation, ReservationStatus};
use crate::error::{AppError, AppResult};
use crate::scheduling::window::{day_window, month_window, week_window};
use crate::scheduling::{CalendarViewType, CalendarWindow, TimeRange};
use crate::services::names::NameDirectory;
use crate::AppState;

const UNTITLED: &str = "Untitled Reservation";
const UNKNOWN_ROOM: &str = "Unknown Room";
const UNKNOWN_USER: &str = "Unknown User";

const SECONDS_PER_DAY: i64 = 24 * 3600;

/// A calendar request as received, before normalization.
#[derive(Debug, Clone)]
pub struct CalendarQuery {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub view_type: CalendarViewType,
    pub room_ids: Option<Vec<String>>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub id: String,
    pub title: String,
    pub purpose: Option<String>,
    pub description: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub room_id: String,
    pub room_name: String,
    pub user_id: String,
    pub user_name: String,
    pub status: ReservationStatus,
    pub is_current_user_reservation: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarView {
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub view_type: CalendarViewType,
    pub reservations: Vec<CalendarEntry>,
    /// Distinct rooms appearing in `reservations`, in order of first appearance.
    pub room_ids: Vec<String>,
    pub room_names: BTreeMap<String, String>,
}

fn earliest_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

fn latest_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2100, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MAX)
}

pub struct CalendarService;

impl CalendarService {
    /// Bounds on a client-supplied query. Both dates must fall strictly
    /// between 2000-01-01 and 2100-01-01 and span at most `max_range_days`.
    pub fn validate_query(query: &CalendarQuery, max_range_days: i64) -> AppResult<()> {
        let valid = |d: NaiveDateTime| d > earliest_date() && d < latest_date();
        if !valid(query.start) {
            return Err(AppError::Validation("Start date is not valid.".to_string()));
        }
        if !valid(query.end) {
            return Err(AppError::Validation("End date is not valid.".to_string()));
        }
        // A limit too large to represent in seconds never rejects.
        let too_wide = max_range_days
            .checked_mul(SECONDS_PER_DAY)
            .map_or(false, |limit| (query.end - query.start).num_seconds().abs() > limit);
        if too_wide {
            return Err(AppError::Validation(format!(
                "Date range too large. Maximum range is {} days.",
                max_range_days
            )));
        }
        Ok(())
    }

    /// Build the view for an already validated query.
    pub async fn view(
        state: &AppState,
        query: CalendarQuery,
        current_user_id: Option<&str>,
    ) -> AppResult<CalendarView> {
        let window = CalendarWindow::new(query.start, query.end, query.view_type);
        tracing::debug!(
            "Calendar {} window {} - {} (requested {} - {})",
            window.view_type.as_str(),
            window.range.start,
            window.range.end,
            query.start,
            query.end
        );

        let reservations = state
            .reservations
            .fetch_overlapping(
                &window.range,
                query.room_ids.as_deref(),
                query.user_id.as_deref(),
            )
            .await?;

        let names = NameDirectory::load(state, &reservations).await?;

        let mut room_ids: Vec<String> = Vec::new();
        let mut room_names = BTreeMap::new();
        for r in &reservations {
            if !room_ids.contains(&r.room_id) {
                room_ids.push(r.room_id.clone());
                if let Some(name) = names.room_name(&r.room_id) {
                    room_names.insert(r.room_id.clone(), name.to_string());
                }
            }
        }

        let entries: Vec<CalendarEntry> = reservations
            .into_iter()
            .map(|r| Self::entry(r, &names, current_user_id))
            .collect();

        tracing::info!(
            "Found {} reservations in the {} calendar view",
            entries.len(),
            window.view_type.as_str()
        );

        Ok(CalendarView {
            start_date: window.range.start,
            end_date: window.range.end,
            view_type: window.view_type,
            reservations: entries,
            room_ids,
            room_names,
        })
    }

    fn entry(r: Reservation, names: &NameDirectory, current_user_id: Option<&str>) -> CalendarEntry {
        CalendarEntry {
            title: r.purpose.clone().unwrap_or_else(|| UNTITLED.to_string()),
            room_name: names.room_name(&r.room_id).unwrap_or(UNKNOWN_ROOM).to_string(),
            user_name: names.user_name(&r.user_id).unwrap_or(UNKNOWN_USER).to_string(),
            is_current_user_reservation: current_user_id == Some(r.user_id.as_str()),
            id: r.id,
            purpose: r.purpose,
            description: r.notes,
            start_time: r.range.start,
            end_time: r.range.end,
            room_id: r.room_id,
            user_id: r.user_id,
            status: r.status,
        }
    }

    fn anchored(range: TimeRange, view_type: CalendarViewType) -> CalendarQuery {
        CalendarQuery {
            start: range.start,
            end: range.end,
            view_type,
            room_ids: None,
            user_id: None,
        }
    }

    pub async fn current_week(state: &AppState, current_user_id: Option<&str>) -> AppResult<CalendarView> {
        let today = Utc::now().date_naive();
        let query = Self::anchored(week_window(today), CalendarViewType::Week);
        Self::view(state, query, current_user_id).await
    }

    pub async fn current_month(state: &AppState, current_user_id: Option<&str>) -> AppResult<CalendarView> {
        let today = Utc::now().date_naive();
        let query = Self::anchored(month_window(today), CalendarViewType::Month);
        Self::view(state, query, current_user_id).await
    }

    /// One room's calendar for the day/week/month containing `start_date`
    /// (today when absent).
    pub async fn room(
        state: &AppState,
        room_id: &str,
        start_date: Option<NaiveDate>,
        view_type: CalendarViewType,
        current_user_id: Option<&str>,
    ) -> AppResult<CalendarView> {
        if state.rooms.fetch_by_id(room_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Room {} not found", room_id)));
        }

        let date = start_date.unwrap_or_else(|| Utc::now().date_naive());
        let range = match view_type {
            CalendarViewType::Day => day_window(date),
            CalendarViewType::Week => week_window(date),
            CalendarViewType::Month => month_window(date),
        };

        let mut query = Self::anchored(range, view_type);
        query.room_ids = Some(vec![room_id.to_string()]);
        Self::view(state, query, current_user_id).await
    }
}
