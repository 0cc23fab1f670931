use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::TimeRange;

/// Granularity of a calendar view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CalendarViewType {
    Day,
    #[default]
    Week,
    Month,
}

impl CalendarViewType {
    /// Convert from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "day" => Some(CalendarViewType::Day),
            "week" => Some(CalendarViewType::Week),
            "month" => Some(CalendarViewType::Month),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CalendarViewType::Day => "Day",
            CalendarViewType::Week => "Week",
            CalendarViewType::Month => "Month",
        }
    }
}

impl From<CalendarViewType> for String {
    fn from(view: CalendarViewType) -> Self {
        view.as_str().to_string()
    }
}

impl TryFrom<String> for CalendarViewType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value).ok_or_else(|| format!("Invalid view type: {}", value))
    }
}

/// A normalized calendar query boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarWindow {
    pub range: TimeRange,
    pub view_type: CalendarViewType,
}

impl CalendarWindow {
    pub fn new(requested_start: NaiveDateTime, requested_end: NaiveDateTime, view_type: CalendarViewType) -> Self {
        Self {
            range: normalize(requested_start, requested_end, view_type),
            view_type,
        }
    }
}

// Accepted widths, in hours, for a week / month view before snapping kicks in.
const WEEK_TOLERANCE_HOURS: (i64, i64) = (6 * 24 + 12, 7 * 24 + 12);
const MONTH_TOLERANCE_HOURS: (i64, i64) = (28 * 24, 32 * 24);

fn within(width: Duration, (min, max): (i64, i64)) -> bool {
    width >= Duration::hours(min) && width <= Duration::hours(max)
}

/// Adapt a requested range to the canonical window of `view_type`.
///
/// An inverted range is swapped first. A range whose width is already right
/// for the view (exactly one day; 6.5 to 7.5 days; 28 to 32 days) is returned
/// as is. Anything else is replaced by the calendar-aligned window containing
/// the start: the day, the Monday-to-Monday week (a Sunday closes its week),
/// or the calendar month. Never fails and is idempotent.
pub fn normalize(
    requested_start: NaiveDateTime,
    requested_end: NaiveDateTime,
    view_type: CalendarViewType,
) -> TimeRange {
    let (start, end) = if requested_end < requested_start {
        (requested_end, requested_start)
    } else {
        (requested_start, requested_end)
    };
    let width = TimeRange::new(start, end).duration();

    match view_type {
        CalendarViewType::Day if width != Duration::days(1) => day_window(start.date()),
        CalendarViewType::Week if !within(width, WEEK_TOLERANCE_HOURS) => {
            week_window(start.date())
        }
        CalendarViewType::Month if !within(width, MONTH_TOLERANCE_HOURS) => {
            month_window(start.date())
        }
        _ => TimeRange::new(start, end),
    }
}

/// Monday of the ISO week containing `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    let back = i64::from(date.weekday().num_days_from_monday());
    date.checked_sub_signed(Duration::days(back))
        .unwrap_or(NaiveDate::MIN)
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn day_window(date: NaiveDate) -> TimeRange {
    let start = midnight(date);
    TimeRange::new(start, add_days(start, 1))
}

pub fn week_window(date: NaiveDate) -> TimeRange {
    let start = midnight(monday_of(date));
    TimeRange::new(start, add_days(start, 7))
}

pub fn month_window(date: NaiveDate) -> TimeRange {
    let first = first_of_month(date);
    let next = first
        .checked_add_months(Months::new(1))
        .unwrap_or(NaiveDate::MAX);
    TimeRange::new(midnight(first), midnight(next))
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

// Saturates instead of panicking at the end of the representable calendar.
fn add_days(instant: NaiveDateTime, days: i64) -> NaiveDateTime {
    instant
        .checked_add_signed(Duration::days(days))
        .unwrap_or(NaiveDateTime::MAX)
}
