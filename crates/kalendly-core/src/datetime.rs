use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  DateTime,
  Datelike,
  Local,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone,
  Weekday
};
use serde::{
  Deserialize,
  Serialize
};

pub const MONTHS: [&str; 12] = [
  "Jan", "Feb", "Mar", "Apr", "May",
  "Jun", "Jul", "Aug", "Sep", "Oct",
  "Nov", "Dec"
];

/// Weekday names, always Sunday first.
pub const DAYS: [&str; 7] = [
  "Sunday",
  "Monday",
  "Tuesday",
  "Wednesday",
  "Thursday",
  "Friday",
  "Saturday"
];

const YEARS_BEFORE: i32 = 30;
const YEARS_AFTER: i32 = 10;

/// Anything that sits on a single
/// calendar day.
pub trait AsCalendarDay {
  fn calendar_day(&self) -> NaiveDate;
}

impl AsCalendarDay for NaiveDate {
  fn calendar_day(&self) -> NaiveDate {
    *self
  }
}

impl AsCalendarDay for NaiveDateTime {
  fn calendar_day(&self) -> NaiveDate {
    self.date()
  }
}

/// Instants land on their local
/// calendar day, like RFC 3339 event
/// dates.
impl<Tz: TimeZone> AsCalendarDay
  for DateTime<Tz>
{
  fn calendar_day(&self) -> NaiveDate {
    self
      .with_timezone(&Local)
      .date_naive()
  }
}

impl<T: AsCalendarDay + ?Sized>
  AsCalendarDay for &T
{
  fn calendar_day(&self) -> NaiveDate {
    (**self).calendar_day()
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize
)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
  #[default]
  Sunday,
  Monday
}

impl WeekStart {
  /// Grid column (0..=6) that `day`
  /// occupies under this week start.
  #[must_use]
  pub fn column_of(
    self,
    day: Weekday
  ) -> u32 {
    match self {
      | WeekStart::Sunday => {
        day.num_days_from_sunday()
      }
      | WeekStart::Monday => {
        day.num_days_from_monday()
      }
    }
  }

  /// Weekday names in grid column
  /// order.
  #[must_use]
  pub fn ordered_days(
    self
  ) -> [&'static str; 7] {
    let offset = match self {
      | WeekStart::Sunday => 0,
      | WeekStart::Monday => 1
    };
    std::array::from_fn(|col| {
      DAYS[(col + offset) % 7]
    })
  }
}

impl fmt::Display for WeekStart {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | WeekStart::Sunday => {
        f.write_str("sunday")
      }
      | WeekStart::Monday => {
        f.write_str("monday")
      }
    }
  }
}

impl FromStr for WeekStart {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "sunday" | "sun" | "0" => {
        Ok(WeekStart::Sunday)
      }
      | "monday" | "mon" | "1" => {
        Ok(WeekStart::Monday)
      }
      | other => {
        Err(anyhow!(
          "invalid week start: \
           {other} (expected sunday \
           or monday)"
        ))
      }
    }
  }
}

#[must_use]
pub fn today() -> NaiveDate {
  Local::now().date_naive()
}

/// Same calendar day at midnight.
#[must_use]
pub fn normalize_date(
  dt: NaiveDateTime
) -> NaiveDateTime {
  dt.date().and_time(NaiveTime::MIN)
}

pub fn is_same_day(
  a: impl AsCalendarDay,
  b: impl AsCalendarDay
) -> bool {
  a.calendar_day() == b.calendar_day()
}

pub fn is_today(
  d: impl AsCalendarDay
) -> bool {
  is_same_day(d, today())
}

#[must_use]
pub fn is_leap_year(year: i32) -> bool {
  (year % 4 == 0 && year % 100 != 0)
    || year % 400 == 0
}

/// Day count of a one-based `month`;
/// zero for months outside 1..=12.
#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  match month {
    | 1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
    | 4 | 6 | 9 | 11 => 30,
    | 2 if is_leap_year(year) => 29,
    | 2 => 28,
    | _ => 0
  }
}

#[must_use]
pub fn generate_years(
  min_year: Option<i32>,
  max_year: Option<i32>
) -> Vec<i32> {
  generate_years_at(
    min_year,
    max_year,
    today().year()
  )
}

/// Inclusive ascending year range,
/// empty when `min > max`.
#[must_use]
pub fn generate_years_at(
  min_year: Option<i32>,
  max_year: Option<i32>,
  current_year: i32
) -> Vec<i32> {
  let min = min_year.unwrap_or(
    current_year - YEARS_BEFORE
  );
  let max = max_year.unwrap_or(
    current_year + YEARS_AFTER
  );
  (min..=max).collect()
}

/// `"Monday 15"`.
#[must_use]
pub fn format_date_for_display(
  d: NaiveDate
) -> String {
  let name = DAYS[d
    .weekday()
    .num_days_from_sunday()
    as usize];
  format!("{name} {}", d.day())
}

/// `"Jan 2024"` for a zero-based
/// `month`; an out-of-range month
/// yields just the year.
#[must_use]
pub fn month_year_text(
  year: i32,
  month: u32
) -> String {
  match MONTHS.get(month as usize) {
    | Some(abbrev) => {
      format!("{abbrev} {year}")
    }
    | None => {
      tracing::warn!(
        year,
        month,
        "month index out of range"
      );
      year.to_string()
    }
  }
}
