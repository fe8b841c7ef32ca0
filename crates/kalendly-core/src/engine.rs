use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::action::CalendarAction;
use crate::datetime::{
    AsCalendarDay, DAYS, MONTHS, WeekStart, format_date_for_display, generate_years_at,
    month_year_text, today,
};
use crate::event::CalendarEvent;
use crate::grid::{
    CalendarGrid, PopupPosition, events_for_date, generate_calendar_dates_at, has_events,
    popup_position_class,
};
use crate::notify::{Listeners, Subscription};

#[derive(Debug, Clone, Default)]
pub struct CalendarConfig {
    pub events: Vec<CalendarEvent>,
    pub initial_date: Option<NaiveDate>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub week_starts_on: WeekStart,
}

impl CalendarConfig {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn with_initial_date(mut self, date: NaiveDate) -> Self {
        self.initial_date = Some(date);
        self
    }

    pub fn with_year_range(mut self, min_year: Option<i32>, max_year: Option<i32>) -> Self {
        self.min_year = min_year;
        self.max_year = max_year;
        self
    }

    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_starts_on = week_start;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarState {
    pub current_year: i32,
    /// Zero-based.
    pub current_month: u32,
    pub current_date: u32,
    pub selected_date: Option<NaiveDate>,
    pub selected_day_index: Option<usize>,
    pub tasks: Vec<CalendarEvent>,
}

impl CalendarState {
    fn starting_at(date: NaiveDate) -> Self {
        Self {
            current_year: date.year(),
            current_month: date.month0(),
            current_date: date.day(),
            selected_date: None,
            selected_day_index: None,
            tasks: Vec::new(),
        }
    }

    pub fn has_selection(&self) -> bool {
        self.selected_date.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarViewModel {
    #[serde(flatten)]
    pub state: CalendarState,
    pub months: [&'static str; 12],
    pub days: [&'static str; 7],
    pub years: Vec<i32>,
    pub month_and_year_text: String,
    pub schedule_day: String,
    pub calendar_dates: CalendarGrid,
    pub popup_position_class: PopupPosition,
}

/// Navigation and selection state for one calendar widget.
///
/// Every mutating call finishes its update and then notifies listeners before
/// returning. Listeners get a shared reference to the engine, which lets them
/// read the state or build a view model but not mutate the engine mid-round.
#[derive(Debug)]
pub struct CalendarEngine {
    config: CalendarConfig,
    state: CalendarState,
    listeners: Listeners<CalendarEngine>,
}

impl CalendarEngine {
    #[instrument(skip(config), fields(events = config.events.len()))]
    pub fn new(config: CalendarConfig) -> Self {
        let initial = config.initial_date.unwrap_or_else(today);
        debug!(
            initial = %initial,
            week_start = %config.week_starts_on,
            min_year = ?config.min_year,
            max_year = ?config.max_year,
            "calendar engine created"
        );
        Self {
            state: CalendarState::starting_at(initial),
            config,
            listeners: Listeners::new(),
        }
    }

    /// Registers `listener` to run after every state change.
    pub fn subscribe(&self, listener: impl Fn(&CalendarEngine) + 'static) -> Subscription {
        let subscription = self.listeners.add(listener);
        debug!(id = subscription.id(), total = self.listeners.len(), "listener subscribed");
        subscription
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn state(&self) -> CalendarState {
        self.state.clone()
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.config.events
    }

    pub fn week_start(&self) -> WeekStart {
        self.config.week_starts_on
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.state.selected_date
    }

    pub fn view_model(&self) -> CalendarViewModel {
        self.view_model_at(today())
    }

    /// View model as seen on `today`, which drives the `is_today` flags and
    /// the default year range.
    pub fn view_model_at(&self, today: NaiveDate) -> CalendarViewModel {
        let state = self.state.clone();
        let calendar_dates = generate_calendar_dates_at(
            state.current_year,
            state.current_month,
            &self.config.events,
            self.config.week_starts_on,
            today,
        );
        let schedule_day = state
            .selected_date
            .map(format_date_for_display)
            .unwrap_or_default();

        CalendarViewModel {
            months: MONTHS,
            days: DAYS,
            years: generate_years_at(self.config.min_year, self.config.max_year, today.year()),
            month_and_year_text: month_year_text(state.current_year, state.current_month),
            schedule_day,
            calendar_dates,
            popup_position_class: popup_position_class(state.selected_day_index),
            state,
        }
    }

    #[instrument(skip(self))]
    pub fn next(&mut self) {
        if self.state.current_month >= 11 {
            self.state.current_month = 0;
            self.state.current_year += 1;
        } else {
            self.state.current_month += 1;
        }
        self.reset_selection();
        self.notify();
    }

    #[instrument(skip(self))]
    pub fn previous(&mut self) {
        if self.state.current_month == 0 {
            self.state.current_month = 11;
            self.state.current_year -= 1;
        } else {
            self.state.current_month -= 1;
        }
        self.reset_selection();
        self.notify();
    }

    /// Moves to `year`/`month` (zero-based). The month is not range checked.
    #[instrument(skip(self))]
    pub fn jump(&mut self, year: i32, month: u32) {
        if month > 11 {
            warn!(year, month, "jump to out-of-range month");
        }
        self.state.current_year = year;
        self.state.current_month = month;
        self.reset_selection();
        self.notify();
    }

    /// Selects the day of `date` and moves the view to its month.
    #[instrument(skip(self, date), fields(day = %date.calendar_day()))]
    pub fn select_date(&mut self, date: impl AsCalendarDay, day_index: Option<usize>) {
        let day = date.calendar_day();
        self.state.selected_date = Some(day);
        self.state.selected_day_index = day_index;
        self.state.current_year = day.year();
        self.state.current_month = day.month0();
        self.state.current_date = day.day();
        self.refresh_tasks();
        debug!(tasks = self.state.tasks.len(), "date selected");
        self.notify();
    }

    /// Cell click from a rendered grid; same as [`CalendarEngine::select_date`].
    pub fn handle_date_click(&mut self, date: impl AsCalendarDay, day_index: Option<usize>) {
        self.select_date(date, day_index);
    }

    /// Shows the month containing `date` without selecting it.
    pub fn go_to_date(&mut self, date: impl AsCalendarDay) {
        let day = date.calendar_day();
        self.jump(day.year(), day.month0());
    }

    #[instrument(skip(self))]
    pub fn clear_selection(&mut self) {
        self.state.selected_date = None;
        self.state.selected_day_index = None;
        self.state.tasks.clear();
        self.notify();
    }

    #[instrument(skip(self, events), fields(count = events.len()))]
    pub fn update_events(&mut self, events: Vec<CalendarEvent>) {
        self.config.events = events;
        self.refresh_tasks();
        self.notify();
    }

    pub fn dispatch(&mut self, action: CalendarAction) {
        debug!(%action, "dispatching calendar action");
        match action {
            CalendarAction::Next => self.next(),
            CalendarAction::Previous => self.previous(),
            CalendarAction::Jump { year, month } => self.jump(year, month),
            CalendarAction::Select { date, day_index } => self.select_date(date, day_index),
            CalendarAction::ClearSelection => self.clear_selection(),
            CalendarAction::GoToDate(date) => self.go_to_date(date),
        }
    }

    pub fn events_for_date(&self, date: impl AsCalendarDay) -> Vec<CalendarEvent> {
        events_for_date(&self.config.events, date)
    }

    pub fn has_events_for_date(&self, date: impl AsCalendarDay) -> bool {
        has_events(&self.config.events, date)
    }

    /// Detaches every listener. Safe to call repeatedly; the engine keeps
    /// working and accepts new subscriptions afterwards.
    #[instrument(skip(self))]
    pub fn destroy(&self) {
        let removed = self.listeners.clear();
        debug!(removed, "calendar engine listeners detached");
    }

    fn reset_selection(&mut self) {
        self.state.selected_date = None;
        self.state.selected_day_index = None;
        self.refresh_tasks();
    }

    fn refresh_tasks(&mut self) {
        self.state.tasks = match self.state.selected_date {
            Some(day) => events_for_date(&self.config.events, day),
            None => Vec::new(),
        };
    }

    fn notify(&self) {
        let notified = self.listeners.notify(self);
        debug!(
            notified,
            year = self.state.current_year,
            month = self.state.current_month,
            selected = ?self.state.selected_date,
            "calendar state changed"
        );
    }
}
