use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{trace, warn};

use crate::datetime::{AsCalendarDay, WeekStart, days_in_month, today};
use crate::event::CalendarEvent;

pub const WEEK_LEN: usize = 7;
pub const MAX_WEEKS: usize = 6;

pub const TODAY_CLASS: &str = "today";
pub const HAS_EVENTS_CLASS: &str = "has-events";

/// One real day in the month grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDate {
    pub date: NaiveDate,
    pub is_current_month: bool,
    pub is_today: bool,
    pub has_events: bool,
    pub events: Vec<CalendarEvent>,
}

/// A grid row; `None` cells pad days outside the month.
pub type CalendarWeek = [Option<CalendarDate>; WEEK_LEN];

pub type CalendarGrid = Vec<CalendarWeek>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PopupPosition {
    #[serde(rename = "popup-left")]
    Left,
    #[serde(rename = "popup-right")]
    Right,
    #[serde(rename = "popup-center-bottom")]
    CenterBottom,
    #[serde(rename = "popup-center-top")]
    CenterTop,
}

impl PopupPosition {
    pub fn as_class(self) -> &'static str {
        match self {
            PopupPosition::Left => "popup-left",
            PopupPosition::Right => "popup-right",
            PopupPosition::CenterBottom => "popup-center-bottom",
            PopupPosition::CenterTop => "popup-center-top",
        }
    }
}

impl fmt::Display for PopupPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_class())
    }
}

fn matching_events<'a>(
    events: &'a [CalendarEvent],
    day: NaiveDate,
) -> impl Iterator<Item = &'a CalendarEvent> + 'a {
    events.iter().filter(move |event| event.falls_on(day))
}

/// Events scheduled on the same calendar day as `date`, in input order.
pub fn events_for_date(events: &[CalendarEvent], date: impl AsCalendarDay) -> Vec<CalendarEvent> {
    matching_events(events, date.calendar_day())
        .cloned()
        .collect()
}

pub fn has_events(events: &[CalendarEvent], date: impl AsCalendarDay) -> bool {
    matching_events(events, date.calendar_day())
        .next()
        .is_some()
}

/// Month grid for a zero-based `month`, with `today` taken from the local clock.
pub fn generate_calendar_dates(
    year: i32,
    month: u32,
    events: &[CalendarEvent],
    week_start: WeekStart,
) -> CalendarGrid {
    generate_calendar_dates_at(year, month, events, week_start, today())
}

/// Lays out the month in rows of seven. Row 0 is padded up to the column of
/// the 1st and the last row is padded after the final day; rows holding only
/// padding are never produced.
#[tracing::instrument(skip(events, today), fields(event_count = events.len()))]
pub fn generate_calendar_dates_at(
    year: i32,
    month: u32,
    events: &[CalendarEvent],
    week_start: WeekStart,
    today: NaiveDate,
) -> CalendarGrid {
    let Some(first) = NaiveDate::from_ymd_opt(year, month.saturating_add(1), 1) else {
        warn!(year, month, "cannot lay out grid for invalid month");
        return Vec::new();
    };

    let total_days = days_in_month(year, first.month());
    let lead = week_start.column_of(first.weekday()) as usize;

    let mut grid = CalendarGrid::with_capacity(MAX_WEEKS);
    let mut next_day = 1_u32;

    for week in 0..MAX_WEEKS {
        if next_day > total_days {
            break;
        }

        let row: CalendarWeek = std::array::from_fn(|col| {
            if (week == 0 && col < lead) || next_day > total_days {
                return None;
            }
            let cell = first
                .with_day(next_day)
                .map(|date| build_cell(date, events, today));
            next_day += 1;
            cell
        });
        grid.push(row);
    }

    trace!(rows = grid.len(), lead, total_days, "calendar grid generated");
    grid
}

fn build_cell(date: NaiveDate, events: &[CalendarEvent], today: NaiveDate) -> CalendarDate {
    let events = events_for_date(events, date);
    CalendarDate {
        date,
        is_current_month: true,
        is_today: date == today,
        has_events: !events.is_empty(),
        events,
    }
}

/// Placement of the day popup relative to the clicked column.
pub fn popup_position_class(day_index: Option<usize>) -> PopupPosition {
    match day_index {
        None => PopupPosition::CenterBottom,
        Some(idx) if idx < 3 => PopupPosition::Right,
        Some(idx) if idx > 4 => PopupPosition::Left,
        Some(_) => PopupPosition::CenterBottom,
    }
}

pub fn cell_classes(cell: Option<&CalendarDate>) -> Vec<&'static str> {
    let Some(cell) = cell else {
        return Vec::new();
    };

    let mut classes = Vec::with_capacity(2);
    if cell.is_today {
        classes.push(TODAY_CLASS);
    }
    if cell.has_events {
        classes.push(HAS_EVENTS_CLASS);
    }
    classes
}
